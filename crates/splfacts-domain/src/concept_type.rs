//! Concept types - the role a vocabulary entry plays in the hierarchy

use serde::{Deserialize, Serialize};

use crate::SectionKind;

/// Concept-type code (TTY) of a vocabulary atom
///
/// The hierarchy runs from organ system at the top down to lower-level
/// synonyms at the leaves:
/// - OrganSystem (OS) → HighLevelGroup (HG) → HighLevel (HT) → Preferred (PT)
/// - LowerLevel (LLT) and MthLowerLevel (MTH_LT) roll up to a PT
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConceptType {
    /// Preferred term
    #[serde(rename = "PT")]
    Preferred,

    /// Lower-level term, a synonym of one preferred term
    #[serde(rename = "LLT")]
    LowerLevel,

    /// Lower-level term contributed by the metathesaurus
    #[serde(rename = "MTH_LT")]
    MthLowerLevel,

    /// High-level term, groups preferred terms
    #[serde(rename = "HT")]
    HighLevel,

    /// High-level group term, groups high-level terms
    #[serde(rename = "HG")]
    HighLevelGroup,

    /// System organ class
    #[serde(rename = "OS")]
    OrganSystem,
}

impl ConceptType {
    /// Every concept type, leaves first
    pub const ALL: [ConceptType; 6] = [
        ConceptType::Preferred,
        ConceptType::LowerLevel,
        ConceptType::MthLowerLevel,
        ConceptType::HighLevel,
        ConceptType::HighLevelGroup,
        ConceptType::OrganSystem,
    ];

    /// Get the vocabulary code for this type
    pub fn as_str(&self) -> &'static str {
        match self {
            ConceptType::Preferred => "PT",
            ConceptType::LowerLevel => "LLT",
            ConceptType::MthLowerLevel => "MTH_LT",
            ConceptType::HighLevel => "HT",
            ConceptType::HighLevelGroup => "HG",
            ConceptType::OrganSystem => "OS",
        }
    }

    /// Parse a vocabulary code (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PT" => Some(ConceptType::Preferred),
            "LLT" => Some(ConceptType::LowerLevel),
            "MTH_LT" => Some(ConceptType::MthLowerLevel),
            "HT" => Some(ConceptType::HighLevel),
            "HG" => Some(ConceptType::HighLevelGroup),
            "OS" => Some(ConceptType::OrganSystem),
            _ => None,
        }
    }

    /// Grouping-level types aggregate other concepts rather than naming
    /// a single clinical finding
    pub fn is_groupable(&self) -> bool {
        matches!(
            self,
            ConceptType::HighLevel | ConceptType::HighLevelGroup | ConceptType::OrganSystem
        )
    }

    /// Lower-level synonyms that expand to their preferred term
    pub fn rolls_up_to_preferred(&self) -> bool {
        matches!(self, ConceptType::LowerLevel | ConceptType::MthLowerLevel)
    }

    /// Whether a match of this type may be reported for a section.
    ///
    /// Adverse-event text only surfaces leaf-level types.
    pub fn surfaces_in(&self, section: SectionKind) -> bool {
        match section {
            SectionKind::AdverseEvent => !self.is_groupable(),
            SectionKind::Indication | SectionKind::BoxedWarning => true,
        }
    }

    /// Lookup priority: leaf types first so their ids win deduplication
    pub fn priority(&self) -> u8 {
        match self {
            ConceptType::Preferred => 0,
            ConceptType::LowerLevel => 1,
            ConceptType::MthLowerLevel => 2,
            ConceptType::HighLevel => 3,
            ConceptType::HighLevelGroup => 4,
            ConceptType::OrganSystem => 5,
        }
    }
}

impl std::fmt::Display for ConceptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConceptType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Invalid concept type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for tty in ConceptType::ALL {
            assert_eq!(ConceptType::parse(tty.as_str()), Some(tty));
        }
        assert_eq!(ConceptType::parse(" llt "), Some(ConceptType::LowerLevel));
        assert_eq!(ConceptType::parse("SY"), None);
    }

    #[test]
    fn test_grouping_types_never_surface_for_adverse_events() {
        assert!(!ConceptType::HighLevel.surfaces_in(SectionKind::AdverseEvent));
        assert!(!ConceptType::HighLevelGroup.surfaces_in(SectionKind::AdverseEvent));
        assert!(!ConceptType::OrganSystem.surfaces_in(SectionKind::AdverseEvent));
        assert!(ConceptType::Preferred.surfaces_in(SectionKind::AdverseEvent));
        assert!(ConceptType::HighLevel.surfaces_in(SectionKind::Indication));
    }

    #[test]
    fn test_priority_orders_leaves_first() {
        let mut all = ConceptType::ALL.to_vec();
        all.reverse();
        all.sort_by_key(|t| t.priority());
        assert_eq!(all[0], ConceptType::Preferred);
        assert_eq!(all[1], ConceptType::LowerLevel);
    }

    #[test]
    fn test_serde_uses_vocabulary_codes() {
        let json = serde_json::to_string(&ConceptType::LowerLevel).unwrap();
        assert_eq!(json, "\"LLT\"");
    }
}
