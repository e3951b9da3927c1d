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

pub mod capture;
pub mod collapse;
pub mod config;
pub mod context;
pub mod deep_query;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod export;
pub mod hud;
pub mod intersection;
pub mod locator;
pub mod markup;
pub mod panel;
pub mod runtime;
pub mod scanner;
pub mod style;
pub mod virtualize;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "booster", about = "Viewport-driven virtualization for long chat transcripts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (defaults to <config dir>/transcript-booster/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Freeze/thaw buffer above and below the viewport, in pixels
    #[arg(long, global = true)]
    pub viewport_margin: Option<f64>,

    /// Discovery scan period in milliseconds
    #[arg(long, global = true)]
    pub scan_interval: Option<u64>,

    /// Never fold tall off-screen sections
    #[arg(long, global = true)]
    pub no_auto_collapse: bool,

    /// Write tracing diagnostics to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Tracing filter directives (defaults to RUST_LOG, then `info`)
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    /// Append to the log file instead of truncating it
    #[arg(long, global = true)]
    pub log_append: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the booster over a page fixture and print the status every cycle
    Simulate {
        /// Page fixture (JSON)
        #[arg(long)]
        page: PathBuf,
        /// Scheduled host events (JSON list)
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Export the transcript of a page fixture as Markdown
    Export {
        #[arg(long)]
        page: PathBuf,
        /// Captured response body to prefer over the page text
        #[arg(long)]
        capture: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Show or store the control panel position
    Panel {
        #[arg(long, requires = "top")]
        left: Option<f64>,
        #[arg(long, requires = "left")]
        top: Option<f64>,
    },
}
