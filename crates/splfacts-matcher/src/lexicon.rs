//! Match lexicon - every phrase list, pattern and window the engine uses
//!
//! The defaults were tuned against adverse-reaction and indication text;
//! none of the window widths mean anything beyond that. Patterns are
//! written against folded sentences, so they are lowercase.
//!
//! Context templates contain a single `{term}` placeholder. The part before
//! it is matched against the text just before an occurrence and the part
//! after it against the text just after.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MatchError, Result};

/// Placeholder for the matched term inside a context template
pub const TERM_PLACEHOLDER: &str = "{term}";

/// A regex rewrite applied to adverse-event sentences before lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    /// Pattern to find
    pub pattern: String,

    /// Replacement, may use `$1`-style groups
    pub replacement: String,
}

/// Two terms with opposite meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermPair {
    /// First term
    pub term: String,

    /// Its opposite
    pub opposite: String,
}

/// A composite term and the component terms it absorbs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Composite {
    /// Composite term
    pub term: String,

    /// Terms dropped when the composite matched
    pub absorbs: Vec<String>,
}

/// Lab-value inference: analyte plus direction in one sentence implies a term
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabTrigger {
    /// Pattern for the analyte
    pub analyte: String,

    /// Pattern for the direction word
    pub direction: String,

    /// Dictionary term added when both match
    pub term: String,
}

/// Configuration of the match engine
///
/// # Examples
///
/// ```
/// use splfacts_matcher::MatchLexicon;
///
/// let lexicon = MatchLexicon::default();
/// assert_eq!(lexicon.negation_window, 60);
/// assert!(lexicon.validate().is_ok());
///
/// let permissive = MatchLexicon::permissive();
/// assert!(permissive.study_exclusions.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchLexicon {
    /// Cues that make an indication sentence pass the gate outright
    #[serde(default = "default_indication_cues")]
    pub indication_cues: Vec<String>,

    /// Lead-ins that fail an indication sentence lacking a cue
    #[serde(default = "default_population_lead_ins")]
    pub population_lead_ins: Vec<String>,

    /// Negating phrases; a sentence containing one is skipped and an
    /// occurrence preceded by one is suppressed
    #[serde(default = "default_negation_phrases")]
    pub negation_phrases: Vec<String>,

    /// Sentence exclusion patterns for indication sections
    #[serde(default = "default_indication_exclusions")]
    pub indication_exclusions: Vec<String>,

    /// Sentence exclusion patterns for adverse-event and boxed sections
    #[serde(default = "default_adverse_event_exclusions")]
    pub adverse_event_exclusions: Vec<String>,

    /// Trial eligibility patterns (non-indication sentences)
    #[serde(default = "default_study_exclusions")]
    pub study_exclusions: Vec<String>,

    /// Baseline and history patterns (non-indication sentences)
    #[serde(default = "default_baseline_history")]
    pub baseline_history: Vec<String>,

    /// Characters before an occurrence searched for negating phrases, and
    /// on either side for context templates
    /// Default: 60
    #[serde(default = "default_negation_window")]
    pub negation_window: usize,

    /// Characters around an occurrence searched for product cues
    /// Default: 70
    #[serde(default = "default_branding_window")]
    pub branding_window: usize,

    /// Characters around an HIV occurrence searched for serostatus
    /// Default: 80
    #[serde(default = "default_hiv_window")]
    pub hiv_window: usize,

    /// Characters around "immunodeficiency" searched for the virus name
    /// Default: 40
    #[serde(default = "default_immunodeficiency_window")]
    pub immunodeficiency_window: usize,

    /// Trademark markers; an occurrence touching one is a product name
    #[serde(default = "default_trademark_markers")]
    pub trademark_markers: Vec<String>,

    /// "is a ... tablet"-style product description
    #[serde(default = "default_product_cue")]
    pub product_cue: String,

    /// Application instruction ("apply", "for external use")
    #[serde(default = "default_product_instruction")]
    pub product_instruction: String,

    /// Clinical cue that overrides an application instruction
    #[serde(default = "default_clinical_cue")]
    pub clinical_cue: String,

    /// Terms that double as ordinary words
    #[serde(default = "default_functional_terms")]
    pub functional_terms: Vec<String>,

    /// Sentence patterns showing the functional reading of those terms
    #[serde(default = "default_functional_usage")]
    pub functional_usage: Vec<String>,

    /// Patterns describing HIV serostatus
    #[serde(default = "default_hiv_status")]
    pub hiv_status: Vec<String>,

    /// Pattern naming the virus around "immunodeficiency"
    #[serde(default = "default_virus_name")]
    pub virus_name: String,

    /// Context templates that suppress an occurrence in every section
    #[serde(default = "default_local_exclusions")]
    pub local_exclusions: Vec<String>,

    /// Population templates (adverse events only)
    #[serde(default = "default_population_templates")]
    pub population_templates: Vec<String>,

    /// Negative-finding templates (adverse events only)
    #[serde(default = "default_polarity_templates")]
    pub polarity_templates: Vec<String>,

    /// Optional antonym table (pipe separated, antonyms in columns 1 and 3)
    #[serde(default)]
    pub antonym_file: Option<PathBuf>,

    /// Negating prefixes; "non X" drops a bare "X"
    #[serde(default = "default_negated_prefixes")]
    pub negated_prefixes: Vec<String>,

    /// Rewrites of lay phrasing into vocabulary phrasing (adverse events only)
    #[serde(default = "default_synonym_rewrites")]
    pub synonym_rewrites: Vec<RewriteRule>,

    /// Antonym pairs; when both match the shorter one is dropped
    #[serde(default = "default_antonym_pairs")]
    pub antonym_pairs: Vec<TermPair>,

    /// Composite terms and what they absorb
    #[serde(default = "default_composites")]
    pub composites: Vec<Composite>,

    /// Lab-value inferences (non-indication sections)
    #[serde(default = "default_lab_triggers")]
    pub lab_triggers: Vec<LabTrigger>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_indication_cues() -> Vec<String> {
    strings(&["indicated for", "treatment of", "prevention of", "used for"])
}

fn default_population_lead_ins() -> Vec<String> {
    strings(&["in patients with"])
}

fn default_negation_phrases() -> Vec<String> {
    strings(&[
        "not indicated for",
        "not indicative of",
        "no evidence of",
        "not suggestive of",
        "no signs of",
        "does not indicate",
        "without evidence of",
        "free from",
        "absence of",
        "rule out",
        "secondary to",
        "due to an underlying",
        "because of an underlying",
        "resulting from a pre-existing",
        "caused by a pre-existing",
        "have not been",
        "exclusion criteria",
        "were excluded if",
        "patients were excluded",
        "trial excluded patients",
        "history of",
        "at baseline",
        "baseline",
        "pre-existing",
        "preexisting",
        "known",
    ])
}

fn default_indication_exclusions() -> Vec<String> {
    strings(&[
        r"\b(were|is|may be|not) ([^ ]+ )?(associated|observed|reported|impaired|demonstrated|shown)\b",
        r"\b(may|might|can|could) occur\b",
        r"\bhas caused\b",
        r"\bcauses\b",
        r"\bincreased incidence\b",
        r"\blimitations of use\b",
        r"\b(not|was|were)\s+not\s+studied\b",
        r"\bwas\s+not\s+studied\s+in\s+patients\b",
        r"\bsee (contraind|overdos|abuse|dosage|warnings|precautions|interactions|symptoms and treatment of overdos|(description of)?clinical studies|posology)\b",
        r"\b(receptive|insertive)?\s*(anal|oral|vaginal)\s+(sex|intercourse|coitus)\b",
    ])
}

fn default_adverse_event_exclusions() -> Vec<String> {
    strings(&[
        r"\bnot (been )?(associated|observed|reported|recommended)\b",
        r"\b(may be|not) ([^ ]+ )?(associated|impaired|demonstrated|shown)\b",
        r"\bis suspected\b",
        r"\bdisease[- ]related\b",
        r"\bfrom causes other\b",
        r"\bfrom other causes\b",
        r"\bno evidence\b",
        r"\bnot (accompanied|indicated|expected|suspected)\b",
        r"\bno( significant)? difference\b",
        r"\b(single|case) report\b",
    ])
}

fn default_study_exclusions() -> Vec<String> {
    strings(&[
        r"\b(exclusion criteria|were excluded if|patients? (were )?excluded (if|for)|the trial excluded patients? with)\b",
        r"\b(ineligible|ineligibility criteria)\b",
    ])
}

fn default_baseline_history() -> Vec<String> {
    strings(&[
        r"\bhistory of\b",
        r"\b(known|pre-existing|preexisting)\b",
        r"\bat baseline\b",
        r"\b(baseline|screening) (abnormal|elevated|low|reduced)\b",
        r"\bin patients? with\b",
    ])
}

fn default_negation_window() -> usize {
    60
}

fn default_branding_window() -> usize {
    70
}

fn default_hiv_window() -> usize {
    80
}

fn default_immunodeficiency_window() -> usize {
    40
}

fn default_trademark_markers() -> Vec<String> {
    strings(&["\u{00AE}", "\u{2122}", "(r)", "(tm)"])
}

fn default_product_cue() -> String {
    concat!(
        r"\b(is|are|was|were)\b.{0,48}\b(",
        "cream|ointment|gel|lotion|spray|solution|suspension|tablet|capsule|injection|patch|kit|device|",
        "topical|pre[- ]?radiation|brand|product|dose|dosage|mg|mcg|ml",
        r")\b"
    )
    .to_string()
}

fn default_product_instruction() -> String {
    r"\b(apply|applied)\b|\bfor\s+external\s+use\b".to_string()
}

fn default_clinical_cue() -> String {
    r"\b(treat|treatment\s+of|prevent|prevention\s+of|manage|management\s+of|indicated\s+for)\b".to_string()
}

fn default_functional_terms() -> Vec<String> {
    strings(&["aids", "hiv"])
}

fn default_functional_usage() -> Vec<String> {
    strings(&[r"\baids in the prevention of\b", r"\b(use|uses)\s+aids\b"])
}

fn default_hiv_status() -> Vec<String> {
    strings(&[
        r"\bwho\s+are\b.*?\bhiv\s+(test\s+)?(negative|positive)\b",
        r"\bhiv\s+(test\s+)?(negative|positive)\b",
    ])
}

fn default_virus_name() -> String {
    r"\bhuman\s+immunodeficiency\s+virus\b".to_string()
}

fn default_local_exclusions() -> Vec<String> {
    strings(&[
        r"\bhistory of\s+{term}",
        r"\bknown\s+{term}",
        r"\bat baseline\s+{term}",
        r"{term}\s+at baseline\b",
        r"\b(exclusion criteria|were excluded if|patients? (were )?excluded (if|for))\s+.*?{term}",
        r"{term}\s+.*?\b(exclusion criteria|were excluded if|patients? (were )?excluded (if|for))\b",
    ])
}

fn default_population_templates() -> Vec<String> {
    strings(&[r"\bin patients? with\s+([a-z0-9-]+\s+){0,3}{term}"])
}

fn default_polarity_templates() -> Vec<String> {
    strings(&[
        r"{term}\s+(was|were|is|are|remained)\s+(normal|unremarkable|negative)\b",
        r"{term}\s+(was|were|is|are|remained)\s+within\s+(the\s+)?normal\s+(limits|range)\b",
    ])
}

fn default_synonym_rewrites() -> Vec<RewriteRule> {
    vec![
        RewriteRule {
            pattern: r"\b(elevated|raised|high) ([a-z0-9-]+)\b".to_string(),
            replacement: "$2 increased".to_string(),
        },
        RewriteRule {
            pattern: r"\b(reduced|lowered|low) ([a-z0-9-]+)\b".to_string(),
            replacement: "$2 decreased".to_string(),
        },
    ]
}

fn default_antonym_pairs() -> Vec<TermPair> {
    [
        ("hypertension", "hypotension"),
        ("hyperglycaemia", "hypoglycaemia"),
        ("hyperkalaemia", "hypokalaemia"),
        ("hyperthyroidism", "hypothyroidism"),
        ("blood pressure increased", "hypotension"),
        ("blood pressure decreased", "hypertension"),
    ]
    .into_iter()
    .map(|(term, opposite)| TermPair {
        term: term.to_string(),
        opposite: opposite.to_string(),
    })
    .collect()
}

fn default_negated_prefixes() -> Vec<String> {
    strings(&["non"])
}

fn default_composites() -> Vec<Composite> {
    vec![
        Composite {
            term: "aids related kaposi's sarcoma".to_string(),
            absorbs: strings(&["aids"]),
        },
        Composite {
            term: "kaposi's sarcoma".to_string(),
            absorbs: strings(&["sarcoma"]),
        },
    ]
}

fn default_lab_triggers() -> Vec<LabTrigger> {
    let direction = r"\b(elevated|increase|increased|rise|raised|high)\b";
    [
        (r"\bbilirubin\b", "blood bilirubin increased"),
        (r"\balkaline\s+phosphatase\b", "alkaline phosphatase increased"),
        (r"\b(ast|aspartate\s+aminotransferase)\b", "aspartate aminotransferase increased"),
    ]
    .into_iter()
    .map(|(analyte, term)| LabTrigger {
        analyte: analyte.to_string(),
        direction: direction.to_string(),
        term: term.to_string(),
    })
    .collect()
}

impl Default for MatchLexicon {
    /// The tuned lexicon: every sentence-level and occurrence-level rule on
    fn default() -> Self {
        Self {
            indication_cues: default_indication_cues(),
            population_lead_ins: default_population_lead_ins(),
            negation_phrases: default_negation_phrases(),
            indication_exclusions: default_indication_exclusions(),
            adverse_event_exclusions: default_adverse_event_exclusions(),
            study_exclusions: default_study_exclusions(),
            baseline_history: default_baseline_history(),
            negation_window: default_negation_window(),
            branding_window: default_branding_window(),
            hiv_window: default_hiv_window(),
            immunodeficiency_window: default_immunodeficiency_window(),
            trademark_markers: default_trademark_markers(),
            product_cue: default_product_cue(),
            product_instruction: default_product_instruction(),
            clinical_cue: default_clinical_cue(),
            functional_terms: default_functional_terms(),
            functional_usage: default_functional_usage(),
            hiv_status: default_hiv_status(),
            virus_name: default_virus_name(),
            local_exclusions: default_local_exclusions(),
            population_templates: default_population_templates(),
            polarity_templates: default_polarity_templates(),
            synonym_rewrites: default_synonym_rewrites(),
            antonym_pairs: default_antonym_pairs(),
            antonym_file: None,
            negated_prefixes: default_negated_prefixes(),
            composites: default_composites(),
            lab_triggers: default_lab_triggers(),
        }
    }
}

impl MatchLexicon {
    /// Same as the default; named for symmetry with [`Self::permissive`]
    pub fn strict() -> Self {
        Self::default()
    }

    /// Recall-oriented lexicon
    ///
    /// Keeps negation and exclusion regexes but drops the trial-eligibility
    /// and baseline sentence filters, so those rules only act through the
    /// occurrence-level templates.
    pub fn permissive() -> Self {
        Self {
            study_exclusions: Vec::new(),
            baseline_history: Vec::new(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.negation_window == 0 {
            return Err("negation_window must be greater than 0".to_string());
        }
        if self.branding_window == 0 || self.hiv_window == 0 || self.immunodeficiency_window == 0 {
            return Err("context windows must be greater than 0".to_string());
        }
        let templates = self
            .local_exclusions
            .iter()
            .chain(&self.population_templates)
            .chain(&self.polarity_templates);
        for template in templates {
            if template.matches(TERM_PLACEHOLDER).count() != 1 {
                return Err(format!(
                    "template '{}' must contain {} exactly once",
                    template, TERM_PLACEHOLDER
                ));
            }
        }
        if let Some(composite) = self.composites.iter().find(|c| c.absorbs.is_empty()) {
            return Err(format!("composite '{}' absorbs nothing", composite.term));
        }
        if self.negated_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err("negated_prefixes must not contain blank entries".to_string());
        }
        Ok(())
    }

    /// Load from TOML string
    pub fn from_toml(toml_str: &str) -> std::result::Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize to TOML string
    pub fn to_toml(&self) -> std::result::Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize TOML: {}", e))
    }

    /// Load and validate from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let lexicon = Self::from_toml(&content).map_err(MatchError::Config)?;
        lexicon.validate().map_err(MatchError::Config)?;
        Ok(lexicon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lexicon() {
        let lexicon = MatchLexicon::default();
        assert_eq!(lexicon.negation_window, 60);
        assert_eq!(lexicon.branding_window, 70);
        assert!(lexicon.negation_phrases.contains(&"no evidence of".to_string()));
        assert!(lexicon.indication_cues.contains(&"used for".to_string()));
        assert_eq!(lexicon.composites.len(), 2);
        assert!(lexicon.validate().is_ok());
    }

    #[test]
    fn test_permissive_drops_sentence_filters() {
        let lexicon = MatchLexicon::permissive();
        assert!(lexicon.study_exclusions.is_empty());
        assert!(lexicon.baseline_history.is_empty());
        assert_eq!(lexicon.negation_phrases, MatchLexicon::strict().negation_phrases);
    }

    #[test]
    fn test_validation() {
        let mut lexicon = MatchLexicon::default();
        lexicon.negation_window = 0;
        assert!(lexicon.validate().is_err());

        let mut lexicon = MatchLexicon::default();
        lexicon.polarity_templates.push(r"\bwas normal\b".to_string());
        assert!(lexicon.validate().is_err());

        let mut lexicon = MatchLexicon::default();
        lexicon.composites.push(Composite {
            term: "rash".to_string(),
            absorbs: vec![],
        });
        assert!(lexicon.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let lexicon = MatchLexicon::default();
        let toml = lexicon.to_toml().unwrap();
        let parsed = MatchLexicon::from_toml(&toml).unwrap();
        assert_eq!(parsed, lexicon);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed = MatchLexicon::from_toml("negation_window = 30\n").unwrap();
        assert_eq!(parsed.negation_window, 30);
        assert_eq!(parsed.indication_cues, default_indication_cues());
    }
}
