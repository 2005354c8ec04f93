//! Source documents and product grouping metadata

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{LabelDate, SectionKind};

/// Which archive a label was published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// Prescription labels
    Prescription,

    /// Over-the-counter labels
    Otc,

    /// Everything else (vaccines, devices, ...)
    Other,

    /// Not determinable from the file path
    Unknown,
}

impl SourceType {
    /// Derive the source type from an archive path cue
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        if lower.contains("prescription") {
            SourceType::Prescription
        } else if lower.contains("otc") {
            SourceType::Otc
        } else if lower.contains("other") {
            SourceType::Other
        } else {
            SourceType::Unknown
        }
    }

    /// Get the source type name
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Prescription => "prescription",
            SourceType::Otc => "otc",
            SourceType::Other => "other",
            SourceType::Unknown => "unknown",
        }
    }
}

impl Default for SourceType {
    fn default() -> Self {
        SourceType::Unknown
    }
}

/// A code from a product vocabulary (RxNorm, SNOMED, ATC, product listings)
///
/// Product vocabularies use their own term types (`IN`, `PIN`, `BPCK`,
/// `SBD`, ...), so the type stays a plain string here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CodeRef {
    /// Atom-unique id
    pub aui: String,

    /// Concept-unique id
    pub cui: String,

    /// Code in the source vocabulary
    #[serde(default)]
    pub code: String,

    /// Term type in the source vocabulary
    #[serde(default)]
    pub tty: String,

    /// Display term
    #[serde(default)]
    pub term: String,
}

impl CodeRef {
    /// Create a code reference
    pub fn new(
        aui: impl Into<String>,
        cui: impl Into<String>,
        code: impl Into<String>,
        tty: impl Into<String>,
        term: impl Into<String>,
    ) -> Self {
        Self {
            aui: aui.into(),
            cui: cui.into(),
            code: code.into(),
            tty: tty.into(),
            term: term.into(),
        }
    }

    /// Branded pack (co-pack) entry
    pub fn is_copack(&self) -> bool {
        self.tty == "BPCK"
    }

    /// Ingredient or precise ingredient entry
    pub fn is_ingredient(&self) -> bool {
        self.tty == "IN" || self.tty == "PIN"
    }
}

/// External code references that identify a product
///
/// Every map is keyed by AUI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCodes {
    /// Product listing entries (their codes are NDCs)
    #[serde(default)]
    pub products: BTreeMap<String, CodeRef>,

    /// SNOMED preferred terms
    #[serde(default)]
    pub snomed: BTreeMap<String, CodeRef>,

    /// Active ingredients
    #[serde(default)]
    pub ingredients: BTreeMap<String, CodeRef>,

    /// RxNorm entries
    #[serde(default)]
    pub rxnorm: BTreeMap<String, CodeRef>,

    /// ATC classes
    #[serde(default)]
    pub atc: BTreeMap<String, CodeRef>,

    /// NDC codes as printed on the label
    #[serde(default)]
    pub raw_ndc_codes: Vec<String>,

    /// Product concept ids
    #[serde(default)]
    pub product_cuis: Vec<String>,

    /// SNOMED parent AUIs
    #[serde(default)]
    pub snomed_parent_auis: Vec<String>,
}

/// Text of one label section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionText {
    /// Section the text belongs to
    pub kind: SectionKind,

    /// Raw section text
    pub text: String,

    /// Section-level effective date, if the label carries one
    #[serde(default)]
    pub effective_date: Option<LabelDate>,
}

/// One label document version as yielded by a document source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Source-document id (file name or archive entry)
    pub document_id: String,

    /// Product grouping key
    pub guid: String,

    /// Archive path of the document
    #[serde(default)]
    pub file: String,

    /// Archive the document came from
    #[serde(default)]
    pub source_type: SourceType,

    /// Document-level effective date
    #[serde(default)]
    pub label_date: Option<LabelDate>,

    /// Approval date printed on the label
    #[serde(default)]
    pub approval_date: Option<LabelDate>,

    /// Application number (NDA/ANDA/BLA)
    #[serde(default)]
    pub nda: Option<u32>,

    /// Labeler / sponsor name
    #[serde(default)]
    pub sponsor: Option<String>,

    /// Brand or product name printed on the label
    #[serde(default)]
    pub brand: Option<String>,

    /// Product code references
    #[serde(default)]
    pub codes: ProductCodes,

    /// Section texts
    #[serde(default)]
    pub sections: Vec<SectionText>,
}

impl SourceDocument {
    /// Date a section's facts are observed on: the section's own effective
    /// date, else the document's label date
    pub fn section_date(&self, section: &SectionText) -> Option<LabelDate> {
        section.effective_date.or(self.label_date)
    }

    /// Source type, falling back to the file path cue
    pub fn resolved_source_type(&self) -> SourceType {
        match self.source_type {
            SourceType::Unknown => SourceType::from_path(&self.file),
            known => known,
        }
    }
}
