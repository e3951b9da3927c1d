// Transcript Booster - Viewport-driven virtualization for long chat transcripts
// Copyright (C) 2025  Simon Peter Rothgang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("Page fixture could not be loaded")]
    PageLoad,
    #[error("Invalid booster configuration")]
    InvalidConfig,
    #[error("No transcript blocks found")]
    NoBlocksFound,
    #[error("Export file could not be written")]
    ExportWrite,
}

impl AppError {
    pub const PAGE_LOAD_EXIT_CODE: i32 = 20;
    pub const INVALID_CONFIG_EXIT_CODE: i32 = 21;
    pub const NO_BLOCKS_FOUND_EXIT_CODE: i32 = 22;
    pub const EXPORT_WRITE_EXIT_CODE: i32 = 23;

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::PageLoad => Self::PAGE_LOAD_EXIT_CODE,
            Self::InvalidConfig => Self::INVALID_CONFIG_EXIT_CODE,
            Self::NoBlocksFound => Self::NO_BLOCKS_FOUND_EXIT_CODE,
            Self::ExportWrite => Self::EXPORT_WRITE_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PageLoad => "Failed to load the page fixture. Check the --page path and its JSON.",
            Self::InvalidConfig => {
                "The booster configuration is invalid. Run with --log-file for details."
            }
            Self::NoBlocksFound => {
                "Export aborted: no transcript blocks were found on the page. Nothing was written."
            }
            Self::ExportWrite => "Failed to write the export file.",
        }
    }
}
