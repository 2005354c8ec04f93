//! Atom module - one vocabulary term bound to a concept

use serde::{Deserialize, Serialize};

use crate::ConceptType;

/// Database id of an atom that has not been written out yet
pub const UNASSIGNED_ID: i64 = -1;

/// Raw concept record as yielded by a vocabulary source
///
/// Records are untrusted: the concept type is kept as a string and
/// validation happens when converting into an [`Atom`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRecord {
    /// Concept-unique id
    pub cui: String,

    /// Atom-unique id
    pub aui: String,

    /// Concept code in the source vocabulary
    #[serde(default)]
    pub code: String,

    /// Code of the preferred term this atom rolls up to
    #[serde(default)]
    pub pt_code: Option<String>,

    /// Concept-type code (e.g. "PT", "LLT")
    pub tty: String,

    /// Display term
    pub term: String,

    /// Source vocabulary abbreviation
    #[serde(default)]
    pub sab: String,

    /// Preferred-atom flag
    #[serde(default)]
    pub is_pref: bool,

    /// Hierarchy path (dot-separated AUIs), if known
    #[serde(default)]
    pub ptr: Option<String>,

    /// Parent concept ids
    #[serde(default)]
    pub parents: Vec<i64>,

    /// Child concept ids
    #[serde(default)]
    pub children: Vec<i64>,
}

/// A vocabulary atom
///
/// Immutable after load. The database id is late-bound: it stays at
/// [`UNASSIGNED_ID`] until an output writer allocates one on its own copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Atom {
    /// Concept-unique id
    pub cui: String,

    /// Atom-unique id
    pub aui: String,

    /// Concept code
    pub code: String,

    /// Code of the preferred term this atom rolls up to
    pub pt_code: Option<String>,

    /// Concept type
    pub tty: ConceptType,

    /// Display term
    pub term: String,

    /// Source vocabulary abbreviation
    pub sab: String,

    /// Preferred-atom flag
    pub is_pref: bool,

    /// Hierarchy path
    pub ptr: Option<String>,

    /// Parent concept ids
    pub parents: Vec<i64>,

    /// Child concept ids
    pub children: Vec<i64>,

    /// Late-bound numeric database id
    #[serde(default = "unassigned")]
    pub database_id: i64,
}

fn unassigned() -> i64 {
    UNASSIGNED_ID
}

impl Atom {
    /// Create an atom with the required fields; optional fields start empty
    pub fn new(
        cui: impl Into<String>,
        aui: impl Into<String>,
        code: impl Into<String>,
        tty: ConceptType,
        term: impl Into<String>,
    ) -> Self {
        Self {
            cui: cui.into(),
            aui: aui.into(),
            code: code.into(),
            pt_code: None,
            tty,
            term: term.into(),
            sab: String::new(),
            is_pref: false,
            ptr: None,
            parents: Vec::new(),
            children: Vec::new(),
            database_id: UNASSIGNED_ID,
        }
    }

    /// Set the preferred-term code
    pub fn with_pt_code(mut self, pt_code: impl Into<String>) -> Self {
        self.pt_code = Some(pt_code.into());
        self
    }

    /// Copy of this atom carrying a database id
    pub fn with_database_id(&self, id: i64) -> Self {
        let mut copy = self.clone();
        copy.database_id = id;
        copy
    }

    /// Whether a database id has been bound
    pub fn has_database_id(&self) -> bool {
        self.database_id != UNASSIGNED_ID
    }

    /// Key grouping this atom with its preferred term: the PT code when
    /// present, else the atom's own code
    pub fn pt_key(&self) -> Option<&str> {
        match self.pt_code.as_deref() {
            Some(code) if !code.is_empty() => Some(code),
            _ if !self.code.is_empty() => Some(self.code.as_str()),
            _ => None,
        }
    }

    /// Whether this atom denotes the given cui, type and term.
    ///
    /// Terms are compared trimmed and case-folded.
    pub fn is_match(&self, cui: &str, tty: ConceptType, term: &str) -> bool {
        self.tty == tty
            && self.cui == cui
            && self.term.trim().to_lowercase() == term.trim().to_lowercase()
    }
}

impl TryFrom<ConceptRecord> for Atom {
    type Error = String;

    fn try_from(record: ConceptRecord) -> Result<Self, Self::Error> {
        if record.aui.trim().is_empty() {
            return Err("record has no aui".to_string());
        }
        if record.cui.trim().is_empty() {
            return Err(format!("record {} has no cui", record.aui));
        }
        if record.term.trim().is_empty() {
            return Err(format!("record {} has no term", record.aui));
        }
        let tty = ConceptType::parse(&record.tty)
            .ok_or_else(|| format!("record {} has unknown type {}", record.aui, record.tty))?;

        Ok(Self {
            cui: record.cui,
            aui: record.aui,
            code: record.code,
            pt_code: record.pt_code.filter(|c| !c.trim().is_empty()),
            tty,
            term: record.term,
            sab: record.sab,
            is_pref: record.is_pref,
            ptr: record.ptr,
            parents: record.parents,
            children: record.children,
            database_id: UNASSIGNED_ID,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tty: &str, term: &str) -> ConceptRecord {
        ConceptRecord {
            cui: "C0015967".to_string(),
            aui: "A0001".to_string(),
            code: "10016558".to_string(),
            pt_code: Some("10037660".to_string()),
            tty: tty.to_string(),
            term: term.to_string(),
            sab: "MDR".to_string(),
            is_pref: true,
            ptr: None,
            parents: vec![],
            children: vec![],
        }
    }

    #[test]
    fn test_record_conversion() {
        let atom = Atom::try_from(record("LLT", "Fever")).unwrap();
        assert_eq!(atom.tty, ConceptType::LowerLevel);
        assert_eq!(atom.database_id, UNASSIGNED_ID);
        assert_eq!(atom.pt_key(), Some("10037660"));
    }

    #[test]
    fn test_malformed_records_are_rejected() {
        assert!(Atom::try_from(record("XX", "Fever")).is_err());
        assert!(Atom::try_from(record("PT", "   ")).is_err());

        let mut r = record("PT", "Fever");
        r.aui = String::new();
        assert!(Atom::try_from(r).is_err());
    }

    #[test]
    fn test_is_match_folds_case_and_whitespace() {
        let atom = Atom::new("C1", "A1", "100", ConceptType::Preferred, "Headache");
        assert!(atom.is_match("C1", ConceptType::Preferred, "  headache "));
        assert!(!atom.is_match("C1", ConceptType::LowerLevel, "headache"));
        assert!(!atom.is_match("C2", ConceptType::Preferred, "headache"));
    }

    #[test]
    fn test_pt_key_falls_back_to_code() {
        let atom = Atom::new("C1", "A1", "100", ConceptType::Preferred, "Headache");
        assert_eq!(atom.pt_key(), Some("100"));

        let atom = atom.with_pt_code("");
        assert_eq!(atom.pt_key(), Some("100"));
    }

    #[test]
    fn test_database_id_binds_on_copy() {
        let atom = Atom::new("C1", "A1", "100", ConceptType::Preferred, "Headache");
        let bound = atom.with_database_id(42);
        assert!(bound.has_database_id());
        assert!(!atom.has_database_id());
    }
}
