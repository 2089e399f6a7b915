//! Result types: extracted records and the generated document.

use serde::{Deserialize, Serialize};

/// One roster entry discovered on the page.
///
/// Constructed once during extraction and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Trimmed display name.
    pub name: String,
    /// Numeric user identifier captured from the entry's link.
    pub identifier: String,
    /// `"{name} ({identifier})"`: the payload encoded into the QR symbol.
    pub display_text: String,
}

impl Record {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        let name = name.into();
        let identifier = identifier.into();
        let display_text = format!("{name} ({identifier})");
        Self {
            name,
            identifier,
            display_text,
        }
    }
}

/// Everything extraction learned from one document snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterSnapshot {
    /// Unique, name-sorted records.
    pub records: Vec<Record>,
    /// The document `<title>`, used to derive the output file name.
    pub title: Option<String>,
    /// The selector strategy that produced the records, if any matched.
    pub pattern: Option<String>,
}

impl RosterSnapshot {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Timing and size figures for one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationStats {
    pub record_count: usize,
    pub page_count: usize,
    pub byte_len: usize,
    pub load_duration_ms: u64,
    pub layout_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// A finished PDF held in memory, ready to be saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// File name without extension, e.g. `Biology_101_QR_Codes_2024-03-15`.
    pub file_stem: String,
    /// Raw PDF bytes.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub stats: GenerationStats,
}

impl GeneratedDocument {
    /// `file_stem` with the `.pdf` extension.
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.file_stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_text_combines_name_and_id() {
        let r = Record::new("Ada Lovelace", "1815");
        assert_eq!(r.display_text, "Ada Lovelace (1815)");
    }

    #[test]
    fn snapshot_serialises_to_json() {
        let snap = RosterSnapshot {
            records: vec![Record::new("Ada Lovelace", "1815")],
            title: Some("Math 1 - People".into()),
            pattern: Some(".user_name a".into()),
        };
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"display_text\":\"Ada Lovelace (1815)\""));
        assert!(json.contains("\"title\":\"Math 1 - People\""));
    }

    #[test]
    fn file_name_appends_pdf() {
        let doc = GeneratedDocument {
            file_stem: "Course_QR_Codes_2024-01-02".into(),
            bytes: vec![],
            stats: GenerationStats::default(),
        };
        assert_eq!(doc.file_name(), "Course_QR_Codes_2024-01-02.pdf");
    }
}
