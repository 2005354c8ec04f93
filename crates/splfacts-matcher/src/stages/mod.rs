//! Candidate filter stages
//!
//! A stage is a function from the full candidate list of one sentence to
//! the surviving list. Stages run in a fixed order:
//!
//! ```text
//! occurrence stages (per sentence text)       resolution stages (per sentence)
//! trademark → branding → functional_usage     antonym → composite_absorption
//! → hiv_status → negation_window              → specificity → lab_trigger
//! → local_context → population → polarity
//! → concept_type
//! ```
//!
//! Occurrence stages narrow each candidate's live spans; a candidate
//! survives while at least one span is live. Resolution stages compare
//! candidates with each other.

mod occurrence;
mod resolution;

use splfacts_dictionary::normalize::normalize_term;
use splfacts_dictionary::{stem_phrase, TermDictionary};
use splfacts_domain::traits::Stemmer;
use splfacts_domain::{MatchClass, SectionContext, SectionKind};
use tracing::trace;

use crate::antonyms::AntonymLexicon;
use crate::candidate::{Candidate, Span};
use crate::error::Result;
use crate::lexicon::MatchLexicon;

pub use occurrence::{
    BrandingStage, ConceptTypeStage, ContextTemplate, FunctionalUsageStage, HivStatusStage,
    NegationWindowStage, TemplateStage, TrademarkStage,
};
pub use resolution::{AntonymStage, CompositeAbsorptionStage, LabTriggerStage, SpecificityStage};

/// A term in both index spellings
#[derive(Debug, Clone)]
pub(crate) struct KeyForms {
    pub(crate) exact: String,
    pub(crate) stemmed: String,
}

impl KeyForms {
    pub(crate) fn new<S: Stemmer + ?Sized>(term: &str, stemmer: &S) -> Self {
        let exact = normalize_term(term);
        let stemmed = stem_phrase(stemmer, &exact);
        Self { exact, stemmed }
    }

    pub(crate) fn for_class(&self, class: MatchClass) -> &str {
        match class {
            MatchClass::Exact => &self.exact,
            MatchClass::Algorithmic => &self.stemmed,
        }
    }
}

/// What a stage sees besides the candidates
pub struct StageContext<'a> {
    /// Section and brand the text is matched under
    pub section: &'a SectionContext,
    /// Folded sentence the spans point into
    pub sentence: &'a str,
    /// Index the candidates came from
    pub class: MatchClass,
    /// Dictionary being matched against
    pub dictionary: &'a TermDictionary,
}

impl StageContext<'_> {
    /// Section kind shortcut
    pub fn kind(&self) -> SectionKind {
        self.section.section
    }
}

/// One step of the candidate pipeline
pub trait CandidateStage: Send + Sync {
    /// Stable stage name, used in logs and ordering tests
    fn name(&self) -> &'static str;

    /// Filter, rewrite or extend the candidate list
    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate>;
}

/// Drop every span the predicate flags; drop a located candidate once no
/// span is left
pub(crate) fn retain_occurrences<F>(candidates: Vec<Candidate>, mut suppressed: F) -> Vec<Candidate>
where
    F: FnMut(&Candidate, Span) -> bool,
{
    candidates
        .into_iter()
        .filter_map(|mut candidate| {
            let live: Vec<Span> = candidate
                .spans
                .iter()
                .copied()
                .filter(|span| !suppressed(&candidate, *span))
                .collect();
            candidate.spans = live;
            candidate.is_live().then_some(candidate)
        })
        .collect()
}

/// Ordered stage lists
pub struct Pipeline {
    occurrence: Vec<Box<dyn CandidateStage>>,
    resolution: Vec<Box<dyn CandidateStage>>,
}

impl Pipeline {
    /// Empty pipeline
    pub fn empty() -> Self {
        Self {
            occurrence: Vec::new(),
            resolution: Vec::new(),
        }
    }

    /// The standard stage order, compiled from a lexicon
    pub fn standard(
        lexicon: &MatchLexicon,
        dictionary: &TermDictionary,
        antonyms: AntonymLexicon,
    ) -> Result<Self> {
        let stemmer = dictionary.stemmer();
        let window = lexicon.negation_window;

        let mut pipeline = Self::empty();
        pipeline
            .push_occurrence(TrademarkStage::new(&lexicon.trademark_markers))
            .push_occurrence(BrandingStage::new(lexicon)?)
            .push_occurrence(FunctionalUsageStage::new(lexicon, stemmer)?)
            .push_occurrence(HivStatusStage::new(lexicon, stemmer)?)
            .push_occurrence(NegationWindowStage::new(&lexicon.negation_phrases, window))
            .push_occurrence(TemplateStage::local_context(&lexicon.local_exclusions, window)?)
            .push_occurrence(TemplateStage::population(&lexicon.population_templates, window)?)
            .push_occurrence(TemplateStage::polarity(&lexicon.polarity_templates, window)?)
            .push_occurrence(ConceptTypeStage)
            .push_resolution(AntonymStage::new(antonyms, &lexicon.negated_prefixes, stemmer))
            .push_resolution(CompositeAbsorptionStage::new(&lexicon.composites, stemmer))
            .push_resolution(SpecificityStage)
            .push_resolution(LabTriggerStage::new(&lexicon.lab_triggers, stemmer)?);
        Ok(pipeline)
    }

    /// Append an occurrence stage
    pub fn push_occurrence<S: CandidateStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.occurrence.push(Box::new(stage));
        self
    }

    /// Append a resolution stage
    pub fn push_resolution<S: CandidateStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.resolution.push(Box::new(stage));
        self
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.occurrence
            .iter()
            .chain(&self.resolution)
            .map(|s| s.name())
            .collect()
    }

    /// Run the occurrence stages
    pub fn run_occurrence(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        run(&self.occurrence, ctx, candidates)
    }

    /// Run the resolution stages
    pub fn run_resolution(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        run(&self.resolution, ctx, candidates)
    }
}

fn run(
    stages: &[Box<dyn CandidateStage>],
    ctx: &StageContext<'_>,
    mut candidates: Vec<Candidate>,
) -> Vec<Candidate> {
    for stage in stages {
        let before = candidates.len();
        candidates = stage.apply(ctx, candidates);
        if candidates.len() != before {
            trace!(
                stage = stage.name(),
                before,
                after = candidates.len(),
                "Stage changed candidates"
            );
        }
    }
    candidates
}
