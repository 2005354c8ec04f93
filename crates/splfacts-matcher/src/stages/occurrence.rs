//! Stages that judge each occurrence of a candidate on its own

use std::collections::HashSet;

use regex::Regex;
use splfacts_dictionary::normalize::normalize_term;
use splfacts_domain::traits::Stemmer;
use splfacts_domain::{MatchClass, SectionKind};

use super::{retain_occurrences, CandidateStage, KeyForms, StageContext};
use crate::candidate::{Candidate, Span};
use crate::error::{compile, MatchError, Result};
use crate::gate::{any_match, contains_any};
use crate::lexicon::{MatchLexicon, TERM_PLACEHOLDER};

/// Suppresses product names: occurrences touching a trademark marker and
/// keys that coincide with the brand given in the section context
pub struct TrademarkStage {
    markers: Vec<String>,
}

impl TrademarkStage {
    /// Create from marker strings ("®", "(tm)", ...)
    pub fn new(markers: &[String]) -> Self {
        Self {
            markers: markers
                .iter()
                .map(|m| m.to_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    fn touches_marker(&self, sentence: &str, span: Span) -> bool {
        let after = sentence[span.end..].trim_start_matches(' ');
        let before = sentence[..span.start].trim_end_matches(' ');
        self.markers
            .iter()
            .any(|m| after.starts_with(m.as_str()) || before.ends_with(m.as_str()))
    }

    fn is_brand(ctx: &StageContext<'_>, candidate: &Candidate) -> bool {
        let Some(brand) = ctx.section.brand.as_deref() else {
            return false;
        };
        let brand = normalize_term(brand);
        let brand = match ctx.class {
            MatchClass::Exact => brand,
            MatchClass::Algorithmic => ctx.dictionary.stem_phrase(&brand),
        };
        !brand.is_empty()
            && (candidate.key == brand || brand.split_whitespace().any(|t| t == candidate.key))
    }
}

impl CandidateStage for TrademarkStage {
    fn name(&self) -> &'static str {
        "trademark"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !Self::is_brand(ctx, c))
            .collect();
        retain_occurrences(candidates, |_, span| self.touches_marker(ctx.sentence, span))
    }
}

/// Suppresses occurrences inside product descriptions ("X is a topical
/// cream") and application instructions without a clinical cue
pub struct BrandingStage {
    product_cue: Regex,
    instruction: Regex,
    clinical_cue: Regex,
    window: usize,
}

impl BrandingStage {
    /// Compile from a lexicon
    pub fn new(lexicon: &MatchLexicon) -> Result<Self> {
        Ok(Self {
            product_cue: compile(&lexicon.product_cue)?,
            instruction: compile(&lexicon.product_instruction)?,
            clinical_cue: compile(&lexicon.clinical_cue)?,
            window: lexicon.branding_window,
        })
    }
}

impl CandidateStage for BrandingStage {
    fn name(&self) -> &'static str {
        "branding"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        retain_occurrences(candidates, |_, span| {
            let around = span.around(ctx.sentence, self.window);
            self.product_cue.is_match(around)
                || (self.instruction.is_match(around) && !self.clinical_cue.is_match(around))
        })
    }
}

/// Drops ambiguous terms ("aids") in sentences that use them as ordinary
/// words ("aids in the prevention of")
pub struct FunctionalUsageStage {
    terms: HashSet<String>,
    usage: Vec<Regex>,
}

impl FunctionalUsageStage {
    /// Compile from a lexicon
    pub fn new<S: Stemmer + ?Sized>(lexicon: &MatchLexicon, stemmer: &S) -> Result<Self> {
        let mut terms = HashSet::new();
        for term in &lexicon.functional_terms {
            let forms = KeyForms::new(term, stemmer);
            terms.insert(forms.exact);
            terms.insert(forms.stemmed);
        }
        let usage = lexicon
            .functional_usage
            .iter()
            .map(|p| compile(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { terms, usage })
    }
}

impl CandidateStage for FunctionalUsageStage {
    fn name(&self) -> &'static str {
        "functional_usage"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if !any_match(&self.usage, ctx.sentence) {
            return candidates;
        }
        retain_occurrences(candidates, |c, _| self.terms.contains(&c.key))
    }
}

/// Indication only: HIV serostatus descriptions and the
/// "immunodeficiency" inside the virus name are not diseases
pub struct HivStatusStage {
    status: Vec<Regex>,
    virus_name: Regex,
    hiv_window: usize,
    immunodeficiency: KeyForms,
    immunodeficiency_window: usize,
}

impl HivStatusStage {
    /// Compile from a lexicon
    pub fn new<S: Stemmer + ?Sized>(lexicon: &MatchLexicon, stemmer: &S) -> Result<Self> {
        Ok(Self {
            status: lexicon
                .hiv_status
                .iter()
                .map(|p| compile(p))
                .collect::<Result<Vec<_>>>()?,
            virus_name: compile(&lexicon.virus_name)?,
            hiv_window: lexicon.hiv_window,
            immunodeficiency: KeyForms::new("immunodeficiency", stemmer),
            immunodeficiency_window: lexicon.immunodeficiency_window,
        })
    }
}

impl CandidateStage for HivStatusStage {
    fn name(&self) -> &'static str {
        "hiv_status"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if ctx.kind() != SectionKind::Indication {
            return candidates;
        }
        let immunodeficiency = self.immunodeficiency.for_class(ctx.class);
        retain_occurrences(candidates, |c, span| {
            if c.tokens().any(|t| t.contains("hiv"))
                && any_match(&self.status, span.around(ctx.sentence, self.hiv_window))
            {
                return true;
            }
            c.key == immunodeficiency
                && self
                    .virus_name
                    .is_match(span.around(ctx.sentence, self.immunodeficiency_window))
        })
    }
}

/// Suppresses occurrences preceded by a negating phrase
pub struct NegationWindowStage {
    phrases: Vec<String>,
    window: usize,
}

impl NegationWindowStage {
    /// Create from phrases and a window width in bytes
    pub fn new(phrases: &[String], window: usize) -> Self {
        Self {
            phrases: phrases.to_vec(),
            window,
        }
    }
}

impl CandidateStage for NegationWindowStage {
    fn name(&self) -> &'static str {
        "negation_window"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        retain_occurrences(candidates, |_, span| {
            contains_any(span.before(ctx.sentence, self.window), &self.phrases)
        })
    }
}

/// A context template split around its `{term}` placeholder
#[derive(Debug, Clone)]
pub struct ContextTemplate {
    before: Option<Regex>,
    after: Option<Regex>,
}

impl ContextTemplate {
    /// Compile a template. The text before the placeholder must match the
    /// end of the preceding window, the text after it the start of the
    /// following window.
    pub fn compile(template: &str) -> Result<Self> {
        let (before, after) = template.split_once(TERM_PLACEHOLDER).ok_or_else(|| {
            MatchError::Config(format!("template '{}' has no {}", template, TERM_PLACEHOLDER))
        })?;
        let before = (!before.is_empty())
            .then(|| compile(&format!("(?:{})$", before)))
            .transpose()?;
        let after = (!after.is_empty())
            .then(|| compile(&format!("^(?:{})", after)))
            .transpose()?;
        if before.is_none() && after.is_none() {
            return Err(MatchError::Config(format!("template '{}' has no context", template)));
        }
        Ok(Self { before, after })
    }

    /// Whether the template matches around a span
    pub fn matches(&self, sentence: &str, span: Span, window: usize) -> bool {
        let before_ok = self
            .before
            .as_ref()
            .is_none_or(|re| re.is_match(span.before(sentence, window)));
        let after_ok = self
            .after
            .as_ref()
            .is_none_or(|re| re.is_match(span.after(sentence, window)));
        before_ok && after_ok
    }
}

/// Suppresses occurrences matching any of a set of context templates
pub struct TemplateStage {
    name: &'static str,
    only: Option<SectionKind>,
    templates: Vec<ContextTemplate>,
    window: usize,
}

impl TemplateStage {
    fn build(
        name: &'static str,
        only: Option<SectionKind>,
        templates: &[String],
        window: usize,
    ) -> Result<Self> {
        Ok(Self {
            name,
            only,
            templates: templates
                .iter()
                .map(|t| ContextTemplate::compile(t))
                .collect::<Result<Vec<_>>>()?,
            window,
        })
    }

    /// History, known, baseline and eligibility templates; every section
    pub fn local_context(templates: &[String], window: usize) -> Result<Self> {
        Self::build("local_context", None, templates, window)
    }

    /// "in patients with X" templates; adverse events only
    pub fn population(templates: &[String], window: usize) -> Result<Self> {
        Self::build("population", Some(SectionKind::AdverseEvent), templates, window)
    }

    /// "X was normal" templates; adverse events only
    pub fn polarity(templates: &[String], window: usize) -> Result<Self> {
        Self::build("polarity", Some(SectionKind::AdverseEvent), templates, window)
    }
}

impl CandidateStage for TemplateStage {
    fn name(&self) -> &'static str {
        self.name
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.only.is_some_and(|kind| kind != ctx.kind()) || self.templates.is_empty() {
            return candidates;
        }
        retain_occurrences(candidates, |_, span| {
            self.templates
                .iter()
                .any(|t| t.matches(ctx.sentence, span, self.window))
        })
    }
}

/// Adverse events never surface grouping-level concept types
pub struct ConceptTypeStage;

impl CandidateStage for ConceptTypeStage {
    fn name(&self) -> &'static str {
        "concept_type"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let section = ctx.kind();
        candidates
            .into_iter()
            .filter_map(|mut c| {
                c.hits.retain(|hit| hit.tty.surfaces_in(section));
                (!c.hits.is_empty()).then_some(c)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::locate_spans;

    #[test]
    fn test_template_split() {
        let template = ContextTemplate::compile(r"\bhistory of\s+{term}").unwrap();
        let sentence = "a history of seizures and new seizures";
        let spans = locate_spans(sentence, "seizures");
        assert!(template.matches(sentence, spans[0], 60));
        assert!(!template.matches(sentence, spans[1], 60));
    }

    #[test]
    fn test_template_after_part() {
        let template =
            ContextTemplate::compile(r"{term}\s+(was|were|is|are|remained)\s+(normal|unremarkable|negative)\b")
                .unwrap();
        let sentence = "ecg was normal but ecg changes occurred";
        let spans = locate_spans(sentence, "ecg");
        assert!(template.matches(sentence, spans[0], 60));
        assert!(!template.matches(sentence, spans[1], 60));
    }

    #[test]
    fn test_template_without_context_is_rejected() {
        assert!(ContextTemplate::compile("{term}").is_err());
        assert!(ContextTemplate::compile(r"\bknown").is_err());
        assert!(matches!(
            ContextTemplate::compile(r"(unclosed {term}"),
            Err(MatchError::InvalidPattern(_, _))
        ));
    }

    #[test]
    fn test_trademark_adjacency() {
        let stage = TrademarkStage::new(&MatchLexicon::default().trademark_markers);
        let sentence = "taxol\u{00AE} (paclitaxel) and taxol (r) and plain taxol";
        let spans = locate_spans(sentence, "taxol");
        assert!(stage.touches_marker(sentence, spans[0]));
        assert!(stage.touches_marker(sentence, spans[1]));
        assert!(!stage.touches_marker(sentence, spans[2]));
    }
}
