//! Data model: entries, language variants and search hits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HmoKbError, Result};

/// Parallel corpus a search or build targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Source-language documents as published (Hebrew).
    Original,
    /// Machine-translated copy of every document.
    Translated,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Original, Variant::Translated];

    /// Directory name under the index root.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Original => "original",
            Variant::Translated => "translated",
        }
    }

    /// Resolve the corpus for a user-facing language code.
    ///
    /// `he` reads the original documents, `en` the translated ones.
    pub fn from_lang(lang: &str) -> Result<Self> {
        match lang.trim().to_lowercase().as_str() {
            "he" | "heb" | "hebrew" => Ok(Variant::Original),
            "en" | "eng" | "english" => Ok(Variant::Translated),
            other => Err(HmoKbError::Config(format!("Unsupported language: '{other}'"))),
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Variant {
    type Err = HmoKbError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "original" => Ok(Variant::Original),
            "translated" => Ok(Variant::Translated),
            other => Err(HmoKbError::Config(format!("Unknown index variant: '{other}'"))),
        }
    }
}

/// Structural origin of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Paragraph,
    List,
    TableCell,
}

impl EntryKind {
    /// Literal context tag stored for non-table entries.
    pub fn context_tag(&self) -> &'static str {
        match self {
            EntryKind::Paragraph => "description",
            EntryKind::List => "list",
            EntryKind::TableCell => "table_cell",
        }
    }
}

/// Provenance of one table cell: row subject, column label (the
/// organization) and the tier sub-label, empty when the cell had none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellContext {
    pub row: String,
    pub column: String,
    #[serde(default)]
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryContext {
    Cell(CellContext),
    Tag(String),
}

/// One retrievable unit with structural provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Document id: path relative to the document root.
    pub source: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// Nearest preceding top-level heading, possibly empty.
    #[serde(default)]
    pub title: String,
    /// Sub-heading directly above a list.
    #[serde(default)]
    pub subtitle: Option<String>,
    pub content: String,
    pub context: EntryContext,
}

impl Entry {
    pub fn paragraph(source: &str, title: &str, content: String) -> Self {
        Self {
            source: source.to_string(),
            kind: EntryKind::Paragraph,
            title: title.to_string(),
            subtitle: None,
            content,
            context: EntryContext::Tag(EntryKind::Paragraph.context_tag().into()),
        }
    }

    pub fn list(source: &str, title: &str, subtitle: Option<String>, content: String) -> Self {
        Self {
            source: source.to_string(),
            kind: EntryKind::List,
            title: title.to_string(),
            subtitle,
            content,
            context: EntryContext::Tag(EntryKind::List.context_tag().into()),
        }
    }

    pub fn table_cell(source: &str, title: &str, cell: CellContext, content: String) -> Self {
        Self {
            source: source.to_string(),
            kind: EntryKind::TableCell,
            title: title.to_string(),
            subtitle: None,
            content,
            context: EntryContext::Cell(cell),
        }
    }

    /// Cell provenance, `None` for paragraphs and lists.
    pub fn cell(&self) -> Option<&CellContext> {
        match &self.context {
            EntryContext::Cell(cell) if self.kind == EntryKind::TableCell => Some(cell),
            _ => None,
        }
    }
}

/// A ranked entry. Serialized flat: entry fields plus `score`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    #[serde(flatten)]
    pub entry: Entry,
    pub score: f32,
}

impl Hit {
    /// Render the hit the way the answer composer receives it: a provenance
    /// line followed by the content.
    pub fn snippet(&self) -> String {
        let entry = &self.entry;
        let header: Vec<&str> = match entry.cell() {
            Some(cell) => vec![
                entry.title.as_str(),
                cell.row.as_str(),
                cell.column.as_str(),
                cell.level.as_str(),
            ],
            None => vec![
                entry.title.as_str(),
                entry.subtitle.as_deref().unwrap_or(""),
            ],
        };
        let header: Vec<&str> = header.into_iter().filter(|s| !s.is_empty()).collect();
        if header.is_empty() {
            entry.content.clone()
        } else {
            format!("{}\n{}", header.join(" | "), entry.content)
        }
    }
}
