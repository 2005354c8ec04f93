//! Engine behavior across gate, stages and lookup

use std::sync::Arc;

use splfacts_dictionary::{DictionaryBuilder, DictionaryConfig, TermDictionary, VecVocabulary};
use splfacts_domain::{ConceptRecord, MatchClass, SectionContext, SectionKind};

use crate::candidate::Candidate;
use crate::stages::{NegationWindowStage, Pipeline, StageContext};
use crate::{MatchEngine, MatchLexicon};

fn record(aui: &str, code: &str, tty: &str, term: &str) -> ConceptRecord {
    ConceptRecord {
        cui: format!("C{}", code),
        aui: aui.to_string(),
        code: code.to_string(),
        pt_code: None,
        tty: tty.to_string(),
        term: term.to_string(),
        sab: "MDR".to_string(),
        is_pref: true,
        ptr: None,
        parents: vec![],
        children: vec![],
    }
}

fn dictionary(records: Vec<ConceptRecord>) -> Arc<TermDictionary> {
    Arc::new(
        DictionaryBuilder::new(DictionaryConfig::default())
            .build(&mut VecVocabulary::new(records))
            .unwrap(),
    )
}

fn engine_with(records: Vec<ConceptRecord>, lexicon: MatchLexicon) -> MatchEngine {
    MatchEngine::new(dictionary(records), lexicon).unwrap()
}

fn engine(records: Vec<ConceptRecord>) -> MatchEngine {
    engine_with(records, MatchLexicon::default())
}

fn keys(found: &crate::TermMatches) -> Vec<&str> {
    found.keys().map(String::as_str).collect()
}

#[test]
fn test_stage_order_is_fixed() {
    let engine = engine(vec![record("A1", "1", "PT", "Rash")]);
    assert_eq!(
        engine.stage_names(),
        vec![
            "trademark",
            "branding",
            "functional_usage",
            "hiv_status",
            "negation_window",
            "local_context",
            "population",
            "polarity",
            "concept_type",
            "antonym",
            "composite_absorption",
            "specificity",
            "lab_trigger",
        ]
    );
}

#[test]
fn test_blank_text_matches_nothing() {
    let engine = engine(vec![record("A1", "1", "PT", "Rash")]);
    assert!(engine.match_text(&SectionContext::adverse_event(), "", true).is_empty());
    assert!(engine.match_text(&SectionContext::adverse_event(), "  \n ", false).is_empty());
}

#[test]
fn test_negated_sentence_matches_nothing() {
    let engine = engine(vec![
        record("A1", "1", "PT", "Rash"),
        record("A2", "2", "PT", "Headache"),
    ]);
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "There is no evidence of rash or headache pain.",
        true,
    );
    assert!(found.is_empty());

    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "There is no evidence of rash. Headache was common.",
        true,
    );
    assert_eq!(keys(&found), vec!["headache"]);
}

#[test]
fn test_negation_covers_multi_token_terms() {
    let engine = engine(vec![
        record("A1", "1", "PT", "rash"),
        record("A2", "2", "PT", "headache pain"),
    ]);
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "There is no evidence of rash or headache pain.",
        true,
    );
    assert!(found.is_empty());

    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "There is no evidence of rash. Headache pain was common.",
        true,
    );
    assert_eq!(keys(&found), vec!["headache pain"]);
    assert_eq!(found["headache pain"], vec!["A2"]);
}

#[test]
fn test_indication_keeps_the_negated_prefix_term() {
    let engine = engine(vec![
        record("A_NSCLC", "10", "PT", "Non-small cell lung cancer"),
        record("A_SCLC", "11", "PT", "Small cell lung cancer"),
    ]);
    let found = engine.match_text(
        &SectionContext::indication(),
        "TAXOL, in combination with cisplatin, is indicated for the first-line treatment of \
         non\u{2013}small cell lung cancer.",
        true,
    );
    assert_eq!(keys(&found), vec!["non small cell lung cancer"]);
    assert_eq!(found["non small cell lung cancer"], vec!["A_NSCLC"]);
}

#[test]
fn test_composite_absorbs_its_parts() {
    let engine = engine(vec![
        record("A_KS_AIDS", "20", "PT", "AIDS related Kaposi's sarcoma"),
        record("A_KS", "21", "PT", "Kaposi's sarcoma"),
        record("A_SARC", "22", "PT", "Sarcoma"),
        record("A_AIDS", "23", "PT", "AIDS"),
    ]);
    let found = engine.match_text(
        &SectionContext::indication(),
        "TAXOL is indicated for the second-line treatment of AIDS\u{2013}related Kaposi\u{2019}s sarcoma.",
        true,
    );
    assert_eq!(keys(&found), vec!["aids related kaposi s sarcoma"]);
}

#[test]
fn test_adverse_events_skip_grouping_types() {
    let engine = engine(vec![
        record("A_HT", "30", "HT", "Cardiac arrhythmias"),
        record("A_PT", "31", "PT", "Palpitations"),
    ]);
    let text = "Cardiac arrhythmias and palpitations occurred.";

    let found = engine.match_text(&SectionContext::adverse_event(), text, true);
    assert_eq!(keys(&found), vec!["palpitations"]);

    let found = engine.match_text(&SectionContext::boxed_warning(), text, true);
    assert_eq!(keys(&found), vec!["cardiac arrhythmias", "palpitations"]);
}

#[test]
fn test_ids_follow_type_priority() {
    let mut lower = record("A2", "101", "LLT", "Rash");
    lower.pt_code = Some("100".to_string());
    let engine = engine(vec![lower, record("A1", "100", "PT", "Rash")]);

    let found = engine.match_text(&SectionContext::adverse_event(), "Rash occurred.", true);
    assert_eq!(found["rash"], vec!["A1", "A2"]);
}

#[test]
fn test_algorithmic_pass_uses_stems() {
    let engine = engine(vec![record("A1", "1", "PT", "Headache")]);
    let text = "Patients experienced headaches.";

    assert!(engine.match_text(&SectionContext::adverse_event(), text, true).is_empty());
    let found = engine.match_text(&SectionContext::adverse_event(), text, false);
    assert_eq!(found.get("headach"), Some(&vec!["A1".to_string()]));
}

#[test]
fn test_synonym_rewrite_in_adverse_events() {
    let engine = engine(vec![record("A1", "1", "PT", "ALT increased")]);
    let text = "Elevated ALT was observed in 3 patients.";

    let found = engine.match_text(&SectionContext::adverse_event(), text, true);
    assert_eq!(keys(&found), vec!["alt increased"]);

    let found = engine.match_text(&SectionContext::boxed_warning(), text, true);
    assert!(found.is_empty());
}

#[test]
fn test_lab_trigger_outside_indications() {
    let engine = engine(vec![record("A1", "1", "PT", "Blood bilirubin increased")]);

    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Bilirubin was elevated in two patients.",
        true,
    );
    assert_eq!(keys(&found), vec!["blood bilirubin increased"]);

    let found = engine.match_text(
        &SectionContext::indication(),
        "Indicated for patients whose bilirubin was elevated.",
        true,
    );
    assert!(found.is_empty());
}

#[test]
fn test_lab_trigger_needs_dictionary_entry() {
    let engine = engine(vec![record("A1", "1", "PT", "Rash")]);
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Bilirubin was elevated and rash occurred.",
        true,
    );
    assert_eq!(keys(&found), vec!["rash"]);
}

#[test]
fn test_antonym_pair_keeps_the_longer_term() {
    let engine = engine(vec![
        record("A1", "1", "PT", "Blood pressure increased"),
        record("A2", "2", "PT", "Hypotension"),
        record("A3", "3", "PT", "Hypertension"),
    ]);
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Blood pressure increased and hypotension were seen.",
        true,
    );
    assert_eq!(keys(&found), vec!["blood pressure increased"]);

    // equal token counts keep both
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Hypertension and hypotension were seen.",
        true,
    );
    assert_eq!(keys(&found), vec!["hypertension", "hypotension"]);
}

#[test]
fn test_trademark_and_brand_suppression() {
    let engine = engine(vec![
        record("A1", "1", "PT", "Migraine"),
        record("A2", "2", "PT", "Nausea"),
        record("A3", "3", "PT", "Rash"),
    ]);

    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Subjects took Migraine\u{00AE} daily and reported nausea.",
        true,
    );
    assert_eq!(keys(&found), vec!["nausea"]);

    let text = "Rash was reported.";
    let plain = engine.match_text(&SectionContext::adverse_event(), text, true);
    assert_eq!(keys(&plain), vec!["rash"]);
    let branded = engine.match_text(&SectionContext::adverse_event().with_brand("Rash Guard"), text, true);
    assert!(branded.is_empty());
}

#[test]
fn test_functional_usage_guard() {
    let engine = engine(vec![
        record("A1", "1", "PT", "AIDS"),
        record("A2", "2", "PT", "Nausea"),
    ]);
    let found = engine.match_text(
        &SectionContext::indication(),
        "This product aids in the prevention of nausea.",
        true,
    );
    assert_eq!(keys(&found), vec!["nausea"]);
}

#[test]
fn test_hiv_status_in_indications() {
    let engine = engine(vec![
        record("A1", "1", "PT", "HIV"),
        record("A2", "2", "PT", "Hepatitis B"),
        record("A3", "3", "PT", "Immunodeficiency"),
        record("A4", "4", "PT", "Infection"),
    ]);

    let found = engine.match_text(
        &SectionContext::indication(),
        "Indicated for the treatment of hepatitis B in adults who are HIV negative.",
        true,
    );
    assert_eq!(keys(&found), vec!["hepatitis b"]);

    let found = engine.match_text(
        &SectionContext::indication(),
        "Indicated for the treatment of human immunodeficiency virus infection.",
        true,
    );
    assert_eq!(keys(&found), vec!["infection"]);
}

#[test]
fn test_polarity_filter() {
    let engine = engine(vec![
        record("A1", "1", "PT", "Electrocardiogram"),
        record("A2", "2", "PT", "Rash"),
    ]);
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Electrocardiogram was normal and rash occurred.",
        true,
    );
    assert_eq!(keys(&found), vec!["rash"]);
}

#[test]
fn test_permissive_lexicon_filters_by_occurrence() {
    let records = vec![
        record("A1", "1", "PT", "Heart failure"),
        record("A2", "2", "PT", "Edema"),
    ];
    let text = "In patients with heart failure, edema occurred.";

    let strict = engine(records.clone());
    assert!(strict.match_text(&SectionContext::adverse_event(), text, true).is_empty());

    let permissive = engine_with(records, MatchLexicon::permissive());
    let found = permissive.match_text(&SectionContext::adverse_event(), text, true);
    assert_eq!(keys(&found), vec!["edema"]);
}

#[test]
fn test_indication_population_lead_in_needs_a_cue() {
    let engine = engine(vec![record("A1", "1", "PT", "Psoriasis")]);
    assert!(engine
        .match_text(&SectionContext::indication(), "In patients with psoriasis, use caution.", true)
        .is_empty());
    assert_eq!(
        keys(&engine.match_text(&SectionContext::indication(), "Used for psoriasis.", true)),
        vec!["psoriasis"]
    );
}

#[test]
fn test_matching_is_deterministic() {
    let records = vec![
        record("A1", "1", "PT", "Rash"),
        record("A2", "2", "PT", "Pruritus"),
        record("A3", "3", "PT", "Nausea"),
    ];
    let text = "Rash, pruritus and nausea occurred. Nausea resolved. Rash persisted.";
    let first = engine(records.clone());
    let second = engine(records);

    let a = first.match_text(&SectionContext::adverse_event(), text, true);
    let b = first.match_text(&SectionContext::adverse_event(), text, true);
    let c = second.match_text(&SectionContext::adverse_event(), text, true);
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(keys(&a), vec!["nausea", "pruritus", "rash"]);
}

#[test]
fn test_negation_window_stage_judges_each_occurrence() {
    let dictionary = dictionary(vec![record("A1", "1", "PT", "Rash")]);
    let mut pipeline = Pipeline::empty();
    pipeline.push_occurrence(NegationWindowStage::new(&["ruled out".to_string()], 20));

    let sentence = "mild rash, ruled out rash, and later a rash";
    let section = SectionContext::new(SectionKind::AdverseEvent);
    let ctx = StageContext {
        section: &section,
        sentence,
        class: MatchClass::Exact,
        dictionary: &dictionary,
    };

    let survivors = pipeline.run_occurrence(&ctx, vec![Candidate::new("rash", MatchClass::Exact, sentence)]);
    assert_eq!(survivors.len(), 1);
    // only the occurrence right after "ruled out" is dropped
    assert_eq!(survivors[0].spans[0].start, 5);
    assert_eq!(survivors[0].spans.len(), 2);
}

#[test]
fn test_invalid_lexicon_is_rejected() {
    let mut lexicon = MatchLexicon::default();
    lexicon.negation_window = 0;
    let result = MatchEngine::new(dictionary(vec![record("A1", "1", "PT", "Rash")]), lexicon);
    assert!(matches!(result, Err(crate::MatchError::Config(_))));

    let mut lexicon = MatchLexicon::default();
    lexicon.product_cue = "(unclosed".to_string();
    let result = MatchEngine::new(dictionary(vec![record("A1", "1", "PT", "Rash")]), lexicon);
    assert!(matches!(result, Err(crate::MatchError::InvalidPattern(_, _))));
}
