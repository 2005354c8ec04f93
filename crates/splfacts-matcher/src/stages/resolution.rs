//! Stages that resolve candidates against each other

use std::collections::HashSet;

use regex::Regex;
use splfacts_domain::traits::Stemmer;
use splfacts_domain::SectionKind;

use super::{retain_occurrences, CandidateStage, KeyForms, StageContext};
use crate::antonyms::AntonymLexicon;
use crate::candidate::Candidate;
use crate::error::{compile, Result};
use crate::lexicon::{Composite, LabTrigger};

/// Opposite-meaning candidates.
///
/// A key that another candidate spells with a negating prefix ("non small
/// cell lung cancer" over "small cell lung cancer") is dropped, as is any
/// occurrence written right after such a prefix. For antonym pairs the
/// candidate with fewer tokens is dropped; equal lengths keep both.
pub struct AntonymStage {
    antonyms: AntonymLexicon,
    prefixes: Vec<KeyForms>,
}

impl AntonymStage {
    /// Create from an antonym lexicon and negating prefixes
    pub fn new<S: Stemmer + ?Sized>(antonyms: AntonymLexicon, prefixes: &[String], stemmer: &S) -> Self {
        Self {
            antonyms,
            prefixes: prefixes
                .iter()
                .map(|p| KeyForms::new(p, stemmer))
                .filter(|p| !p.exact.is_empty())
                .collect(),
        }
    }

    fn drop_prefixed(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        if self.prefixes.is_empty() {
            return candidates;
        }
        let keys: HashSet<&str> = candidates.iter().map(|c| c.key.as_str()).collect();
        let negated: HashSet<String> = candidates
            .iter()
            .filter(|c| {
                self.prefixes
                    .iter()
                    .any(|p| keys.contains(format!("{} {}", p.for_class(ctx.class), c.key).as_str()))
            })
            .map(|c| c.key.clone())
            .collect();

        let candidates: Vec<Candidate> = candidates
            .into_iter()
            .filter(|c| !negated.contains(&c.key))
            .collect();

        retain_occurrences(candidates, |_, span| {
            let before = ctx.sentence[..span.start].trim_end_matches([' ', '-']);
            let had_joiner = before.len() < span.start;
            had_joiner
                && self.prefixes.iter().any(|p| {
                    before.ends_with(p.exact.as_str())
                        && before[..before.len() - p.exact.len()]
                            .chars()
                            .next_back()
                            .is_none_or(|c| !c.is_alphanumeric())
                })
        })
    }
}

impl CandidateStage for AntonymStage {
    fn name(&self) -> &'static str {
        "antonym"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let candidates = self.drop_prefixed(ctx, candidates);
        if self.antonyms.is_empty() {
            return candidates;
        }

        let mut dropped = vec![false; candidates.len()];
        for i in 0..candidates.len() {
            if dropped[i] {
                continue;
            }
            for j in (i + 1)..candidates.len() {
                if dropped[j] || !self.antonyms.are_antonyms(&candidates[i].key, &candidates[j].key) {
                    continue;
                }
                let (ti, tj) = (candidates[i].token_len(), candidates[j].token_len());
                if ti > tj {
                    dropped[j] = true;
                } else if tj > ti {
                    dropped[i] = true;
                    break;
                }
            }
        }

        candidates
            .into_iter()
            .zip(dropped)
            .filter_map(|(c, drop)| (!drop).then_some(c))
            .collect()
    }
}

/// A matched composite absorbs its component terms
pub struct CompositeAbsorptionStage {
    composites: Vec<(KeyForms, Vec<KeyForms>)>,
}

impl CompositeAbsorptionStage {
    /// Create from configured composites
    pub fn new<S: Stemmer + ?Sized>(composites: &[Composite], stemmer: &S) -> Self {
        Self {
            composites: composites
                .iter()
                .map(|c| {
                    (
                        KeyForms::new(&c.term, stemmer),
                        c.absorbs.iter().map(|a| KeyForms::new(a, stemmer)).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl CandidateStage for CompositeAbsorptionStage {
    fn name(&self) -> &'static str {
        "composite_absorption"
    }

    fn apply(&self, ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let keys: HashSet<&str> = candidates.iter().map(|c| c.key.as_str()).collect();
        let absorbed: HashSet<String> = self
            .composites
            .iter()
            .filter(|(composite, _)| keys.contains(composite.for_class(ctx.class)))
            .flat_map(|(_, parts)| parts.iter().map(|p| p.for_class(ctx.class).to_string()))
            .collect();
        if absorbed.is_empty() {
            return candidates;
        }
        candidates
            .into_iter()
            .filter(|c| !absorbed.contains(&c.key))
            .collect()
    }
}

/// Drops a candidate whose tokens all appear in a longer candidate
pub struct SpecificityStage;

impl CandidateStage for SpecificityStage {
    fn name(&self) -> &'static str {
        "specificity"
    }

    fn apply(&self, _ctx: &StageContext<'_>, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let token_sets: Vec<HashSet<&str>> = candidates.iter().map(|c| c.tokens().collect()).collect();
        let generic: Vec<bool> = candidates
            .iter()
            .enumerate()
            .map(|(i, a)| {
                candidates.iter().enumerate().any(|(j, b)| {
                    i != j && b.token_len() > a.token_len() && token_sets[i].is_subset(&token_sets[j])
                })
            })
            .collect();

        candidates
            .into_iter()
            .zip(generic)
            .filter_map(|(c, drop)| (!drop).then_some(c))
            .collect()
    }
}

struct CompiledTrigger {
    analyte: Regex,
    direction: Regex,
    term: KeyForms,
}

/// Lab-value inference outside indication sections: an analyte and a
/// direction word in one sentence add the implied dictionary term
pub struct LabTriggerStage {
    triggers: Vec<CompiledTrigger>,
}

impl LabTriggerStage {
    /// Compile configured triggers
    pub fn new<S: Stemmer + ?Sized>(triggers: &[LabTrigger], stemmer: &S) -> Result<Self> {
        let triggers = triggers
            .iter()
            .map(|t| {
                Ok(CompiledTrigger {
                    analyte: compile(&t.analyte)?,
                    direction: compile(&t.direction)?,
                    term: KeyForms::new(&t.term, stemmer),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { triggers })
    }
}

impl CandidateStage for LabTriggerStage {
    fn name(&self) -> &'static str {
        "lab_trigger"
    }

    fn apply(&self, ctx: &StageContext<'_>, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        let section = ctx.kind();
        if section == SectionKind::Indication {
            return candidates;
        }
        for trigger in &self.triggers {
            if !trigger.analyte.is_match(ctx.sentence) || !trigger.direction.is_match(ctx.sentence) {
                continue;
            }
            let key = trigger.term.for_class(ctx.class);
            if key.is_empty() || candidates.iter().any(|c| c.key == key) {
                continue;
            }
            let mut inferred = Candidate::new(key, ctx.class, ctx.sentence);
            for &tty in ctx.dictionary.valid_types() {
                if !tty.surfaces_in(section) {
                    continue;
                }
                if let Some(auis) = ctx.dictionary.lookup(ctx.class, tty, key) {
                    inferred.add_hit(tty, auis);
                }
            }
            if !inferred.hits.is_empty() {
                candidates.push(inferred);
            }
        }
        candidates
    }
}
