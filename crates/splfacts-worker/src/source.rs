//! Document sources
//!
//! The bundled readers take JSON lines: one [`SourceDocument`] per line for
//! labels, one [`SafetyLabelChange`] per line for label changes.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use splfacts_domain::traits::{DocumentGroup, DocumentSource};
use splfacts_domain::{SafetyLabelChange, SourceDocument};
use tracing::{debug, warn};

use crate::error::{Result, WorkerError};

/// Cut `text` to at most `max_chars` characters
pub fn truncate_chars(text: &mut String, max_chars: usize) -> bool {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => {
            text.truncate(end);
            true
        }
        None => false,
    }
}

/// Documents loaded from a JSON-lines file.
///
/// The file is parsed once on open. Lines that fail to parse are logged and
/// skipped; later lines with an already seen document id replace earlier
/// ones. Section text longer than the configured bound is truncated.
#[derive(Debug, Clone)]
pub struct JsonLinesDocuments {
    path: PathBuf,
    documents: BTreeMap<String, SourceDocument>,
    skipped: usize,
}

impl JsonLinesDocuments {
    /// Read and parse a JSON-lines document file
    pub fn open<P: AsRef<Path>>(path: P, max_section_chars: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| WorkerError::Source(format!("{}: {}", path.display(), e)))?;
        let mut source = Self::parse(&content, max_section_chars);
        source.path = path;
        debug!(
            "Read {} documents from {} ({} lines skipped)",
            source.documents.len(),
            source.path.display(),
            source.skipped
        );
        Ok(source)
    }

    /// Parse JSON-lines content held in memory
    pub fn parse(content: &str, max_section_chars: usize) -> Self {
        let mut documents = BTreeMap::new();
        let mut skipped = 0;

        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut doc = match serde_json::from_str::<SourceDocument>(line) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!("Skipping document line {}: {}", i + 1, e);
                    skipped += 1;
                    continue;
                }
            };
            if doc.document_id.trim().is_empty() {
                warn!("Skipping document line {}: blank document id", i + 1);
                skipped += 1;
                continue;
            }
            for section in &mut doc.sections {
                if truncate_chars(&mut section.text, max_section_chars) {
                    warn!(
                        document = %doc.document_id,
                        section = %section.kind,
                        max_section_chars,
                        "Section text truncated"
                    );
                }
            }
            documents.insert(doc.document_id.clone(), doc);
        }

        Self {
            path: PathBuf::new(),
            documents,
            skipped,
        }
    }

    /// Path the documents were read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of documents loaded
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether nothing was loaded
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Lines that could not be used
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

/// Read safety label changes from a JSON-lines file.
///
/// Unparseable lines are logged and skipped; section text is truncated like
/// document text.
pub fn read_label_changes<P: AsRef<Path>>(path: P, max_section_chars: usize) -> Result<Vec<SafetyLabelChange>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| WorkerError::Source(format!("{}: {}", path.display(), e)))?;
    let changes = parse_label_changes(&content, max_section_chars);
    debug!("Read {} label changes from {}", changes.len(), path.display());
    Ok(changes)
}

/// Parse safety label changes held in memory
pub fn parse_label_changes(content: &str, max_section_chars: usize) -> Vec<SafetyLabelChange> {
    let mut changes = Vec::new();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<SafetyLabelChange>(line) {
            Ok(mut change) => {
                for section in &mut change.sections {
                    truncate_chars(&mut section.text, max_section_chars);
                }
                changes.push(change);
            }
            Err(e) => warn!("Skipping label change line {}: {}", i + 1, e),
        }
    }
    changes
}

impl DocumentSource for JsonLinesDocuments {
    type Error = WorkerError;

    fn groups(&self) -> Result<Vec<DocumentGroup>> {
        let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for doc in self.documents.values() {
            groups.entry(doc.guid.as_str()).or_default().push(doc.document_id.clone());
        }
        Ok(groups
            .into_iter()
            .map(|(guid, document_ids)| DocumentGroup {
                guid: guid.to_string(),
                document_ids,
            })
            .collect())
    }

    fn read(&self, document_id: &str) -> Result<SourceDocument> {
        self.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| WorkerError::Source(format!("unknown document: {}", document_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DOCS: &str = r#"{"document_id": "d2", "guid": "g1", "file": "prescription/d2.xml", "sections": []}
{"document_id": "d1", "guid": "g1", "file": "prescription/d1.xml", "sections": []}

not json
{"document_id": "d3", "guid": "g0", "sections": [{"kind": "adverse_event", "text": "rash"}]}
"#;

    #[test]
    fn test_groups_by_guid_in_order() {
        let source = JsonLinesDocuments::parse(DOCS, 100);
        assert_eq!(source.len(), 3);
        assert_eq!(source.skipped(), 1);

        let groups = source.groups().unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].guid, "g0");
        assert_eq!(groups[1].guid, "g1");
        assert_eq!(groups[1].document_ids, vec!["d1", "d2"]);
    }

    #[test]
    fn test_read_unknown_document() {
        let source = JsonLinesDocuments::parse(DOCS, 100);
        assert_eq!(source.read("d3").unwrap().sections[0].text, "rash");
        assert!(matches!(source.read("nope"), Err(WorkerError::Source(_))));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let mut text = "naïve café".to_string();
        assert!(truncate_chars(&mut text, 4));
        assert_eq!(text, "naïv");

        let mut short = "rash".to_string();
        assert!(!truncate_chars(&mut short, 4));
        assert_eq!(short, "rash");

        let source = JsonLinesDocuments::parse(DOCS, 2);
        assert_eq!(source.read("d3").unwrap().sections[0].text, "ra");
    }

    #[test]
    fn test_blank_document_id_is_skipped() {
        let source = JsonLinesDocuments::parse(r#"{"document_id": " ", "guid": "g"}"#, 10);
        assert!(source.is_empty());
        assert_eq!(source.skipped(), 1);
    }

    #[test]
    fn test_parse_label_changes() {
        let content = r#"{"application_number": 20262, "supplement_date": "2018-07-01", "sections": [{"kind": "boxed_warning", "text": "Anaphylaxis and severe hypersensitivity"}]}

{"drug_name": "missing number"}
{"application_number": 50001}
"#;
        let changes = parse_label_changes(content, 11);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].sections[0].text, "Anaphylaxis");
        assert!(changes[1].sections.is_empty());

        assert!(read_label_changes("/definitely/missing.jsonl", 100).is_err());
    }

    #[test]
    fn test_open_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DOCS.as_bytes()).unwrap();

        let source = JsonLinesDocuments::open(file.path(), 100).unwrap();
        assert_eq!(source.path(), file.path());
        assert_eq!(source.len(), 3);

        assert!(JsonLinesDocuments::open("/definitely/missing.jsonl", 100).is_err());
    }
}
