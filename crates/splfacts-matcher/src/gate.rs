//! Sentence-level gate: section cue screen and whole-sentence exclusions

use regex::Regex;
use splfacts_domain::SectionKind;

use crate::error::{compile, Result};
use crate::lexicon::MatchLexicon;

/// Outcome of gating one folded sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// The sentence goes on to candidate generation
    Pass,
    /// An indication sentence with a population lead-in and no cue
    NoCue,
    /// The sentence contains a negating phrase
    Negated,
    /// A section exclusion pattern matched
    Excluded,
    /// A trial eligibility pattern matched
    StudyExclusion,
    /// A baseline or history pattern matched
    BaselineHistory,
}

impl GateOutcome {
    /// Whether the sentence passed
    pub fn passed(&self) -> bool {
        matches!(self, GateOutcome::Pass)
    }
}

/// Compiled sentence gate
#[derive(Debug, Clone)]
pub struct SentenceGate {
    indication_cues: Vec<String>,
    population_lead_ins: Vec<String>,
    negation_phrases: Vec<String>,
    indication_exclusions: Vec<Regex>,
    adverse_event_exclusions: Vec<Regex>,
    study_exclusions: Vec<Regex>,
    baseline_history: Vec<Regex>,
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(p)).collect()
}

impl SentenceGate {
    /// Compile the gate from a lexicon
    pub fn new(lexicon: &MatchLexicon) -> Result<Self> {
        Ok(Self {
            indication_cues: lexicon.indication_cues.clone(),
            population_lead_ins: lexicon.population_lead_ins.clone(),
            negation_phrases: lexicon.negation_phrases.clone(),
            indication_exclusions: compile_all(&lexicon.indication_exclusions)?,
            adverse_event_exclusions: compile_all(&lexicon.adverse_event_exclusions)?,
            study_exclusions: compile_all(&lexicon.study_exclusions)?,
            baseline_history: compile_all(&lexicon.baseline_history)?,
        })
    }

    /// Whether an indication-style sentence states an indication.
    ///
    /// A cue passes outright; without one the sentence passes unless it
    /// describes a population instead.
    pub fn has_section_cue(&self, section: SectionKind, sentence: &str) -> bool {
        match section {
            SectionKind::Indication => {
                contains_any(sentence, &self.indication_cues)
                    || !contains_any(sentence, &self.population_lead_ins)
            }
            SectionKind::AdverseEvent | SectionKind::BoxedWarning => true,
        }
    }

    /// Gate a folded sentence
    pub fn check(&self, section: SectionKind, sentence: &str) -> GateOutcome {
        if !self.has_section_cue(section, sentence) {
            return GateOutcome::NoCue;
        }
        if contains_any(sentence, &self.negation_phrases) {
            return GateOutcome::Negated;
        }

        let exclusions = match section {
            SectionKind::Indication => &self.indication_exclusions,
            SectionKind::AdverseEvent | SectionKind::BoxedWarning => &self.adverse_event_exclusions,
        };
        if any_match(exclusions, sentence) {
            return GateOutcome::Excluded;
        }

        if section != SectionKind::Indication {
            if any_match(&self.study_exclusions, sentence) {
                return GateOutcome::StudyExclusion;
            }
            if any_match(&self.baseline_history, sentence) {
                return GateOutcome::BaselineHistory;
            }
        }
        GateOutcome::Pass
    }
}

pub(crate) fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| !n.is_empty() && haystack.contains(n.as_str()))
}

pub(crate) fn any_match(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> SentenceGate {
        SentenceGate::new(&MatchLexicon::default()).unwrap()
    }

    #[test]
    fn test_indication_cue() {
        let gate = gate();
        assert_eq!(
            gate.check(SectionKind::Indication, "indicated for the treatment of psoriasis."),
            GateOutcome::Pass
        );
        assert_eq!(
            gate.check(SectionKind::Indication, "in patients with psoriasis, use caution."),
            GateOutcome::NoCue
        );
        assert_eq!(
            gate.check(SectionKind::Indication, "used for psoriasis in patients with mild disease."),
            GateOutcome::Pass
        );
        assert_eq!(gate.check(SectionKind::Indication, "psoriasis."), GateOutcome::Pass);
    }

    #[test]
    fn test_negation_rejects_any_section() {
        let gate = gate();
        for section in SectionKind::ALL {
            assert_eq!(
                gate.check(section, "there is no evidence of rash or headache pain."),
                GateOutcome::Negated
            );
        }
    }

    #[test]
    fn test_section_exclusions() {
        let gate = gate();
        assert_eq!(
            gate.check(SectionKind::Indication, "limitations of use: not for migraine."),
            GateOutcome::Excluded
        );
        assert_eq!(
            gate.check(SectionKind::AdverseEvent, "hepatotoxicity is suspected."),
            GateOutcome::Excluded
        );
        assert_eq!(
            gate.check(SectionKind::AdverseEvent, "patients were ineligible if they had asthma."),
            GateOutcome::StudyExclusion
        );
        assert_eq!(
            gate.check(SectionKind::BoxedWarning, "in patients with heart failure, edema occurred."),
            GateOutcome::BaselineHistory
        );
        assert!(gate.check(SectionKind::AdverseEvent, "rash and nausea were reported.").passed());
    }

    #[test]
    fn test_permissive_keeps_baseline_sentences() {
        let gate = SentenceGate::new(&MatchLexicon::permissive()).unwrap();
        assert!(gate
            .check(SectionKind::AdverseEvent, "in patients with heart failure, edema occurred.")
            .passed());
    }
}
