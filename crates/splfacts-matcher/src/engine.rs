//! Match engine: sentences in, dictionary terms out

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use regex::Regex;
use splfacts_dictionary::normalize::{clean_text, fold_sentence};
use splfacts_dictionary::TermDictionary;
use splfacts_domain::traits::Segmenter;
use splfacts_domain::{MatchClass, SectionContext, SectionKind};
use tracing::{debug, info};

use crate::antonyms::AntonymLexicon;
use crate::candidate::Candidate;
use crate::error::{compile, MatchError, Result};
use crate::gate::SentenceGate;
use crate::lexicon::MatchLexicon;
use crate::segment::RuleSegmenter;
use crate::stages::{Pipeline, StageContext};

/// Matched key mapped to its atom ids
pub type TermMatches = BTreeMap<String, Vec<String>>;

/// Contextual matcher over a built dictionary
///
/// The engine is immutable once built and can be shared between threads;
/// every call to [`MatchEngine::match_text`] is independent.
pub struct MatchEngine {
    dictionary: Arc<TermDictionary>,
    lexicon: MatchLexicon,
    gate: SentenceGate,
    rewrites: Vec<(Regex, String)>,
    pipeline: Pipeline,
    segmenter: Box<dyn Segmenter + Send + Sync>,
}

impl MatchEngine {
    /// Compile an engine.
    ///
    /// Fails on an invalid lexicon, a pattern that does not compile or an
    /// unreadable antonym table.
    pub fn new(dictionary: Arc<TermDictionary>, lexicon: MatchLexicon) -> Result<Self> {
        lexicon.validate().map_err(MatchError::Config)?;

        let mut antonyms = AntonymLexicon::from_pairs(&lexicon.antonym_pairs, dictionary.stemmer());
        if let Some(path) = &lexicon.antonym_file {
            antonyms.load_table(path, dictionary.stemmer())?;
        }
        let antonym_terms = antonyms.len();

        let gate = SentenceGate::new(&lexicon)?;
        let rewrites = lexicon
            .synonym_rewrites
            .iter()
            .map(|rule| Ok((compile(&rule.pattern)?, rule.replacement.clone())))
            .collect::<Result<Vec<_>>>()?;
        let pipeline = Pipeline::standard(&lexicon, &dictionary, antonyms)?;

        info!(
            stages = pipeline.stage_names().len(),
            antonym_terms,
            max_tokens = dictionary.max_token_match_length(),
            "Match engine ready"
        );

        Ok(Self {
            dictionary,
            lexicon,
            gate,
            rewrites,
            pipeline,
            segmenter: Box::new(RuleSegmenter),
        })
    }

    /// Replace the sentence segmenter
    pub fn with_segmenter<S: Segmenter + Send + Sync + 'static>(mut self, segmenter: S) -> Self {
        self.segmenter = Box::new(segmenter);
        self
    }

    /// Dictionary being matched against
    pub fn dictionary(&self) -> &Arc<TermDictionary> {
        &self.dictionary
    }

    /// Lexicon the engine was compiled from
    pub fn lexicon(&self) -> &MatchLexicon {
        &self.lexicon
    }

    /// Stage names in execution order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.pipeline.stage_names()
    }

    /// Match section text.
    ///
    /// `exact` selects the exact index; otherwise stopwords are removed and
    /// the stemmed index is used. Blank text gives an empty map.
    pub fn match_text(&self, ctx: &SectionContext, text: &str, exact: bool) -> TermMatches {
        let mut out = TermMatches::new();
        if text.trim().is_empty() {
            return out;
        }
        let class = MatchClass::from_exact(exact);

        for sentence in self.segmenter.sentences(text) {
            for candidate in self.match_sentence(ctx, &sentence, class) {
                let ids = out.entry(candidate.key.clone()).or_default();
                for aui in candidate.atom_ids() {
                    if !ids.contains(&aui) {
                        ids.push(aui);
                    }
                }
            }
        }
        out
    }

    /// Match a single sentence and return the surviving candidates
    pub fn match_sentence(&self, ctx: &SectionContext, sentence: &str, class: MatchClass) -> Vec<Candidate> {
        let folded = fold_sentence(sentence);
        if folded.is_empty() {
            return Vec::new();
        }

        let outcome = self.gate.check(ctx.section, &folded);
        if !outcome.passed() {
            debug!(section = ctx.section.as_str(), ?outcome, "Sentence rejected");
            return Vec::new();
        }

        let mut texts = vec![folded.clone()];
        if ctx.section == SectionKind::AdverseEvent {
            if let Some(rewritten) = self.rewrite(&folded) {
                texts.push(rewritten);
            }
        }

        let mut merged: Vec<Candidate> = Vec::new();
        for text in &texts {
            let stage_ctx = StageContext {
                section: ctx,
                sentence: text,
                class,
                dictionary: &self.dictionary,
            };
            let survivors = self.pipeline.run_occurrence(&stage_ctx, self.generate(text, class));
            for candidate in survivors {
                match merged.iter_mut().find(|m| m.key == candidate.key) {
                    Some(existing) => {
                        for hit in &candidate.hits {
                            existing.add_hit(hit.tty, &hit.auis);
                        }
                    }
                    None if *text == folded => merged.push(candidate),
                    // spans must point into the folded sentence
                    None => {
                        let mut relocated = Candidate::new(candidate.key.clone(), class, &folded);
                        relocated.hits = candidate.hits;
                        merged.push(relocated);
                    }
                }
            }
        }

        let stage_ctx = StageContext {
            section: ctx,
            sentence: &folded,
            class,
            dictionary: &self.dictionary,
        };
        self.pipeline.run_resolution(&stage_ctx, merged)
    }

    /// Apply synonym rewrites; `None` when nothing changed
    fn rewrite(&self, folded: &str) -> Option<String> {
        let mut text = folded.to_string();
        for (pattern, replacement) in &self.rewrites {
            text = pattern.replace_all(&text, replacement.as_str()).into_owned();
        }
        (text != folded).then_some(text)
    }

    /// Look up every n-gram, longest first
    fn generate(&self, text: &str, class: MatchClass) -> Vec<Candidate> {
        let dictionary = &self.dictionary;
        let normalized = match class {
            MatchClass::Exact => clean_text(text),
            MatchClass::Algorithmic => {
                dictionary.stem_phrase(&dictionary.stopwords().remove_stopwords(text))
            }
        };
        let tokens: Vec<&str> = normalized.split_whitespace().collect();
        let longest = dictionary.max_token_match_length().min(tokens.len());
        let index = dictionary.index(class);

        let mut found: Vec<Candidate> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for n in (1..=longest).rev() {
            for window in tokens.windows(n) {
                let key = window.join(" ");
                for &tty in dictionary.valid_types() {
                    let Some(auis) = index.get(tty, n, &key) else {
                        continue;
                    };
                    let at = *positions.entry(key.clone()).or_insert_with(|| {
                        found.push(Candidate::new(key.clone(), class, text));
                        found.len() - 1
                    });
                    found[at].add_hit(tty, auis);
                }
            }
        }
        found
    }
}

impl std::fmt::Debug for MatchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchEngine")
            .field("stages", &self.pipeline.stage_names())
            .field("rewrites", &self.rewrites.len())
            .finish_non_exhaustive()
    }
}
