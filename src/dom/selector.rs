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

//! The subset of CSS selectors the booster and its configuration use.
//!
//! Supported: selector lists, descendant (` `) and child (`>`) combinators,
//! type and universal selectors, `#id`, `.class`, and attribute selectors
//! `[a]`, `[a=v]`, `[a^=v]`, `[a*=v]`. Matching never crosses a shadow
//! boundary; crossing is the job of [`crate::deep_query`].

use super::{Document, NodeId};
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unexpected `{found}` in selector `{selector}`")]
    Unexpected { selector: String, found: char },
    #[error("unterminated attribute selector in `{0}`")]
    UnterminatedAttribute(String),
    #[error("dangling combinator in selector `{0}`")]
    DanglingCombinator(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Contains(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatch {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
}

/// One complex selector; each part carries the combinator linking it to
/// the part on its left (`None` for the leftmost).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    parts: Vec<(Option<Combinator>, Compound)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    alternatives: Vec<Complex>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let alternatives = split_top_level(source)
            .into_iter()
            .map(|part| parse_complex(part, source))
            .collect::<Result<Vec<_>, _>>()?;
        if alternatives.is_empty() {
            return Err(SelectorError::Empty);
        }
        Ok(Self { source: source.trim().to_owned(), alternatives })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether element `id` matches any alternative.
    #[must_use]
    pub fn matches(&self, doc: &Document, id: NodeId) -> bool {
        doc.is_element(id)
            && self.alternatives.iter().any(|complex| match_at(complex, doc, id, complex.parts.len() - 1))
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn match_at(complex: &Complex, doc: &Document, id: NodeId, index: usize) -> bool {
    let (combinator, compound) = &complex.parts[index];
    if !compound.matches(doc, id) {
        return false;
    }
    if index == 0 {
        return true;
    }
    match combinator.unwrap_or(Combinator::Descendant) {
        Combinator::Child => {
            doc.parent_element(id).is_some_and(|parent| match_at(complex, doc, parent, index - 1))
        }
        Combinator::Descendant => {
            let mut current = doc.parent_element(id);
            while let Some(ancestor) = current {
                if match_at(complex, doc, ancestor, index - 1) {
                    return true;
                }
                current = doc.parent_element(ancestor);
            }
            false
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, doc: &Document, id: NodeId) -> bool {
        let Some(tag) = doc.tag(id) else {
            return false;
        };
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(wanted) = &self.id
            && doc.attribute(id, "id") != Some(wanted.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(id, c)) {
            return false;
        }
        self.attrs.iter().all(|attr| {
            let Some(value) = doc.attribute(id, &attr.name) else {
                return false;
            };
            match &attr.op {
                AttrOp::Exists => true,
                AttrOp::Equals(v) => value == v,
                AttrOp::Prefix(v) => value.starts_with(v.as_str()),
                AttrOp::Contains(v) => value.contains(v.as_str()),
            }
        })
    }
}

/// Split on commas that are not inside an attribute selector.
fn split_top_level(source: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in source.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&source[start..]);
    parts
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
}

fn parse_complex(part: &str, whole: &str) -> Result<Complex, SelectorError> {
    let part = part.trim();
    if part.is_empty() {
        return Err(SelectorError::Empty);
    }
    let mut chars = part.chars().peekable();
    let mut parts: Vec<(Option<Combinator>, Compound)> = Vec::new();
    let mut pending: Option<Combinator> = None;

    loop {
        let mut saw_space = false;
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
            saw_space = true;
        }
        if saw_space && !parts.is_empty() && pending.is_none() {
            pending = Some(Combinator::Descendant);
        }
        match chars.peek() {
            None => break,
            Some('>') => {
                chars.next();
                if parts.is_empty() || pending == Some(Combinator::Child) {
                    return Err(SelectorError::DanglingCombinator(whole.trim().to_owned()));
                }
                pending = Some(Combinator::Child);
            }
            Some(_) => {
                let compound = parse_compound(&mut chars, whole)?;
                let link = if parts.is_empty() {
                    None
                } else {
                    Some(pending.take().unwrap_or(Combinator::Descendant))
                };
                parts.push((link, compound));
            }
        }
    }

    if pending == Some(Combinator::Child) {
        return Err(SelectorError::DanglingCombinator(whole.trim().to_owned()));
    }
    Ok(Complex { parts })
}

fn parse_compound(chars: &mut Peekable<Chars<'_>>, whole: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let mut universal = false;

    match chars.peek() {
        Some('*') => {
            chars.next();
            universal = true;
        }
        Some(c) if is_ident_char(*c) => {
            compound.tag = Some(read_ident(chars).to_ascii_lowercase());
        }
        _ => {}
    }

    loop {
        match chars.peek().copied() {
            Some('#') => {
                chars.next();
                compound.id = Some(read_non_empty_ident(chars, whole, '#')?);
            }
            Some('.') => {
                chars.next();
                compound.classes.push(read_non_empty_ident(chars, whole, '.')?);
            }
            Some('[') => {
                chars.next();
                compound.attrs.push(parse_attr(chars, whole)?);
            }
            Some(c) if c.is_whitespace() || c == '>' => break,
            None => break,
            Some(found) => {
                return Err(SelectorError::Unexpected { selector: whole.trim().to_owned(), found });
            }
        }
    }

    if compound.is_empty() && !universal {
        let found = chars.peek().copied().unwrap_or(' ');
        return Err(SelectorError::Unexpected { selector: whole.trim().to_owned(), found });
    }
    Ok(compound)
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut out = String::new();
    while let Some(c) = chars.peek().copied() {
        if !is_ident_char(c) {
            break;
        }
        out.push(c);
        chars.next();
    }
    out
}

fn read_non_empty_ident(
    chars: &mut Peekable<Chars<'_>>,
    whole: &str,
    after: char,
) -> Result<String, SelectorError> {
    let ident = read_ident(chars);
    if ident.is_empty() {
        return Err(SelectorError::Unexpected { selector: whole.trim().to_owned(), found: after });
    }
    Ok(ident)
}

fn parse_attr(chars: &mut Peekable<Chars<'_>>, whole: &str) -> Result<AttrMatch, SelectorError> {
    let unterminated = || SelectorError::UnterminatedAttribute(whole.trim().to_owned());
    let name = read_ident(chars);
    if name.is_empty() {
        return Err(unterminated());
    }
    let op_prefix = match chars.next() {
        Some(']') => return Ok(AttrMatch { name, op: AttrOp::Exists }),
        Some('=') => None,
        Some(c @ ('^' | '*')) => {
            if chars.next() != Some('=') {
                return Err(unterminated());
            }
            Some(c)
        }
        Some(found) => {
            return Err(SelectorError::Unexpected { selector: whole.trim().to_owned(), found });
        }
        None => return Err(unterminated()),
    };

    let value = match chars.peek().copied() {
        Some(q @ ('"' | '\'')) => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some(c) if c == q => break,
                    Some(c) => value.push(c),
                    None => return Err(unterminated()),
                }
            }
            value
        }
        _ => read_ident(chars),
    };
    if chars.next() != Some(']') {
        return Err(unterminated());
    }

    let op = match op_prefix {
        None => AttrOp::Equals(value),
        Some('^') => AttrOp::Prefix(value),
        Some(_) => AttrOp::Contains(value),
    };
    Ok(AttrMatch { name, op })
}
