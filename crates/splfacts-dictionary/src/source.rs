//! Vocabulary sources
//!
//! The bundled reader takes JSON lines, one [`ConceptRecord`] per line.

use std::convert::Infallible;
use std::path::{Path, PathBuf};

use splfacts_domain::traits::VocabularySource;
use splfacts_domain::ConceptRecord;
use tracing::debug;

use crate::error::DictionaryError;

/// Reads concept records from a JSON-lines file
#[derive(Debug, Clone)]
pub struct JsonLinesVocabulary {
    path: PathBuf,
}

impl JsonLinesVocabulary {
    /// Create a reader for a file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path being read
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse JSON-lines content. Blank lines are ignored; a line that fails to
/// parse becomes an inner error naming its line number.
pub fn parse_json_lines(content: &str) -> Vec<Result<ConceptRecord, String>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<ConceptRecord>(line)
                .map_err(|e| format!("line {}: {}", i + 1, e))
        })
        .collect()
}

impl VocabularySource for JsonLinesVocabulary {
    type Error = DictionaryError;

    fn records(&mut self) -> Result<Vec<Result<ConceptRecord, String>>, Self::Error> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            DictionaryError::SourceUnreadable(format!("{}: {}", self.path.display(), e))
        })?;
        let records = parse_json_lines(&content);
        debug!("Read {} vocabulary lines from {}", records.len(), self.path.display());
        Ok(records)
    }
}

/// In-memory vocabulary, mostly for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct VecVocabulary {
    records: Vec<ConceptRecord>,
}

impl VecVocabulary {
    /// Wrap a list of records
    pub fn new(records: Vec<ConceptRecord>) -> Self {
        Self { records }
    }
}

impl VocabularySource for VecVocabulary {
    type Error = Infallible;

    fn records(&mut self) -> Result<Vec<Result<ConceptRecord, String>>, Self::Error> {
        Ok(self.records.iter().cloned().map(Ok).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_lines_reports_bad_lines() {
        let content = concat!(
            r#"{"cui":"C1","aui":"A1","tty":"PT","term":"Rash"}"#,
            "\n\n",
            "not json\n",
        );
        let records = parse_json_lines(content);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].as_ref().unwrap().term, "Rash");
        assert!(records[1].as_ref().unwrap_err().starts_with("line 3:"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let mut source = JsonLinesVocabulary::new("/nonexistent/vocabulary.jsonl");
        assert!(matches!(
            source.records(),
            Err(DictionaryError::SourceUnreadable(_))
        ));
    }
}
