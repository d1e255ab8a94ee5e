//! Data structures for a single open document.
//!
//! [`DocumentInfo`] is an owned, COM-free snapshot.  It is fully `Send` and
//! `Serialize`; no host references are held, and a fresh list is built on
//! every enumeration.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Document category derived from the file extension or the host type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Part,
    Assembly,
    Draft,
    Unknown,
}

impl DocumentType {
    /// Map a file extension (without the dot, any case).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "par" | "psm" => Some(DocumentType::Part),
            "asm" => Some(DocumentType::Assembly),
            "dft" => Some(DocumentType::Draft),
            _ => None,
        }
    }

    /// Map the host's raw numeric document type.
    pub fn from_type_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(DocumentType::Part),
            2 => Some(DocumentType::Assembly),
            3 => Some(DocumentType::Draft),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Part => "Part",
            DocumentType::Assembly => "Assembly",
            DocumentType::Draft => "Draft",
            DocumentType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One open document as seen during a single enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub full_name: String,
    pub document_type: DocumentType,
    pub is_active: bool,
}

impl DocumentInfo {
    /// Identity that survives re-ordering between enumerations.
    pub fn selection_key(&self) -> String {
        format!(
            "{}|{}",
            self.full_name.trim().to_lowercase(),
            self.name.trim().to_lowercase()
        )
    }

    /// Label used by list views: `[Draft] Sheet1.dft (Active)`.
    pub fn list_label(&self) -> String {
        let suffix = if self.is_active { " (Active)" } else { "" };
        format!("[{}] {}{suffix}", self.document_type, self.name)
    }
}
