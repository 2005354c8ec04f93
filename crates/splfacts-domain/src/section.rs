//! Label sections and the context a match runs under

use serde::{Deserialize, Serialize};

/// Label section a piece of text was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Indications and usage
    Indication,

    /// Adverse reactions
    AdverseEvent,

    /// Boxed warning
    BoxedWarning,
}

impl SectionKind {
    /// Every section, in extraction order
    pub const ALL: [SectionKind; 3] = [
        SectionKind::Indication,
        SectionKind::AdverseEvent,
        SectionKind::BoxedWarning,
    ];

    /// Short code used in logs and pass counters
    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::Indication => "IND",
            SectionKind::AdverseEvent => "AE",
            SectionKind::BoxedWarning => "BLACKBOX",
        }
    }

    /// LOINC code identifying the section in a label document
    pub fn loinc_code(&self) -> &'static str {
        match self {
            SectionKind::Indication => "34067-9",
            SectionKind::AdverseEvent => "34084-4",
            SectionKind::BoxedWarning => "34066-1",
        }
    }

    /// Parse a short code or LOINC code
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "IND" | "INDICATION" | "34067-9" => Some(SectionKind::Indication),
            "AE" | "ADVERSE_EVENT" | "34084-4" => Some(SectionKind::AdverseEvent),
            "BLACKBOX" | "BOX" | "BOXED_WARNING" | "34066-1" => Some(SectionKind::BoxedWarning),
            _ => None,
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid section: {}", s))
    }
}

/// How a match was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchClass {
    /// Literal hit against the surface-normalized index
    Exact,

    /// Hit against the stemmed, stopword-filtered index
    Algorithmic,
}

impl MatchClass {
    /// Whether this class reads the exact index
    pub fn is_exact(&self) -> bool {
        matches!(self, MatchClass::Exact)
    }

    /// Map the `exact` flag of a match call onto a class
    pub fn from_exact(exact: bool) -> Self {
        if exact {
            MatchClass::Exact
        } else {
            MatchClass::Algorithmic
        }
    }

    /// Name used in logs and output rows
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchClass::Exact => "exact",
            MatchClass::Algorithmic => "algorithmic",
        }
    }
}

/// Context a piece of text is matched under
///
/// The section selects the gate and the suppression rules. The optional
/// brand name is only used to suppress matches that coincide with it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectionContext {
    /// Section the text belongs to
    pub section: SectionKind,

    /// Product or brand name printed on the label, if known
    #[serde(default)]
    pub brand: Option<String>,
}

impl SectionContext {
    /// Context for a section with no brand information
    pub fn new(section: SectionKind) -> Self {
        Self { section, brand: None }
    }

    /// Indication context
    pub fn indication() -> Self {
        Self::new(SectionKind::Indication)
    }

    /// Adverse-event context
    pub fn adverse_event() -> Self {
        Self::new(SectionKind::AdverseEvent)
    }

    /// Boxed-warning context
    pub fn boxed_warning() -> Self {
        Self::new(SectionKind::BoxedWarning)
    }

    /// Attach a brand name; blank names are ignored
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        let brand = brand.into();
        let trimmed = brand.trim();
        self.brand = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_lowercase())
        };
        self
    }
}

impl From<SectionKind> for SectionContext {
    fn from(section: SectionKind) -> Self {
        Self::new(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_parse() {
        assert_eq!(SectionKind::parse("ind"), Some(SectionKind::Indication));
        assert_eq!(SectionKind::parse("34084-4"), Some(SectionKind::AdverseEvent));
        assert_eq!(SectionKind::parse("box"), Some(SectionKind::BoxedWarning));
        assert_eq!(SectionKind::parse("dosage"), None);
    }

    #[test]
    fn test_brand_is_normalized() {
        let ctx = SectionContext::indication().with_brand("  TAXOL ");
        assert_eq!(ctx.brand.as_deref(), Some("taxol"));

        let ctx = SectionContext::indication().with_brand("   ");
        assert_eq!(ctx.brand, None);
    }

    #[test]
    fn test_match_class_from_flag() {
        assert_eq!(MatchClass::from_exact(true), MatchClass::Exact);
        assert!(!MatchClass::from_exact(false).is_exact());
    }
}
