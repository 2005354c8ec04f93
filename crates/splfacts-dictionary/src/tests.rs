//! Builder behavior across normalization, variants and indexing

use splfacts_domain::{ConceptRecord, ConceptType, MatchClass};

use crate::normalize::token_count;
use crate::{DictionaryBuilder, DictionaryConfig, DictionaryError, StopwordList, VecVocabulary};

fn record(aui: &str, cui: &str, code: &str, tty: &str, term: &str) -> ConceptRecord {
    ConceptRecord {
        cui: cui.to_string(),
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

fn lower_level(aui: &str, cui: &str, code: &str, pt_code: &str, term: &str) -> ConceptRecord {
    ConceptRecord {
        pt_code: Some(pt_code.to_string()),
        ..record(aui, cui, code, "LLT", term)
    }
}

fn build(records: Vec<ConceptRecord>) -> crate::TermDictionary {
    DictionaryBuilder::new(DictionaryConfig::default())
        .build(&mut VecVocabulary::new(records))
        .unwrap()
}

#[test]
fn test_identical_keys_accumulate_ids_in_order() {
    let dictionary = build(vec![
        record("A1", "C1", "100", "PT", "Headache"),
        record("A2", "C2", "200", "PT", "HEADACHE"),
    ]);

    assert_eq!(
        dictionary.lookup(MatchClass::Exact, ConceptType::Preferred, "headache"),
        Some(&["A1".to_string(), "A2".to_string()][..])
    );
}

#[test]
fn test_stemmed_index_holds_stemmed_keys() {
    let dictionary = build(vec![record("A1", "C1", "100", "PT", "Blood bilirubin increased")]);

    let stemmed = dictionary.stem_phrase("blood bilirubin increased");
    assert!(dictionary
        .lookup(MatchClass::Algorithmic, ConceptType::Preferred, &stemmed)
        .is_some());
    assert!(dictionary
        .lookup(MatchClass::Exact, ConceptType::Preferred, &stemmed)
        .is_none());
}

#[test]
fn test_variants_are_indexed_under_their_own_length() {
    let dictionary = build(vec![
        record("A1", "C1", "100", "PT", "Blood bilirubin increased"),
        record("A2", "C2", "200", "PT", "Kaposi's sarcoma AIDS related"),
        record("A3", "C3", "300", "PT", "Cancer of the ovary"),
    ]);

    let exact = dictionary.index(MatchClass::Exact);
    assert!(exact.lookup(ConceptType::Preferred, "increased blood bilirubin").is_some());
    assert!(exact.lookup(ConceptType::Preferred, "aids related kaposi s sarcoma").is_some());
    assert_eq!(
        exact.get(ConceptType::Preferred, 2, "ovarian cancer"),
        Some(&["A3".to_string()][..])
    );
    for (_, len, key, _) in exact.iter() {
        assert_eq!(len, token_count(key));
    }
    assert_eq!(dictionary.stats().variant_keys, 3);
}

#[test]
fn test_invalid_types_and_stop_phrases_are_skipped() {
    let config = DictionaryConfig {
        valid_types: vec![ConceptType::Preferred],
        ..DictionaryConfig::default()
    };
    let dictionary = DictionaryBuilder::new(config)
        .with_stopwords(StopwordList::new(["other"], true))
        .build(&mut VecVocabulary::new(vec![
            record("A1", "C1", "100", "PT", "Rash"),
            record("A2", "C2", "200", "HT", "Skin disorders"),
            record("A3", "C3", "300", "PT", "Other"),
        ]))
        .unwrap();

    assert_eq!(dictionary.atom_count(), 1);
    assert_eq!(dictionary.stats().skipped_type, 1);
    assert_eq!(dictionary.stats().skipped_stopword, 1);
    assert_eq!(dictionary.valid_types(), &[ConceptType::Preferred]);
}

#[test]
fn test_malformed_records_are_skipped_not_fatal() {
    let dictionary = DictionaryBuilder::new(DictionaryConfig::default())
        .build_from_records(vec![
            Err("line 1: expected value".to_string()),
            Ok(record("A1", "C1", "100", "XX", "Rash")),
            Ok(record("", "C1", "100", "PT", "Rash")),
            Ok(record("A2", "C2", "200", "PT", "Nausea")),
            Ok(record("A2", "C2", "200", "PT", "Nausea")),
        ])
        .unwrap();

    assert_eq!(dictionary.atom_count(), 1);
    assert_eq!(dictionary.stats().skipped_malformed, 4);
}

#[test]
fn test_empty_vocabulary_is_an_error() {
    let result = DictionaryBuilder::new(DictionaryConfig::default())
        .build_from_records(vec![Err("garbage".to_string())]);
    assert!(matches!(result, Err(DictionaryError::EmptyVocabulary(1))));

    let result = DictionaryBuilder::new(DictionaryConfig::default())
        .build(&mut VecVocabulary::default());
    assert!(matches!(result, Err(DictionaryError::EmptyVocabulary(0))));
}

#[test]
fn test_invalid_config_is_an_error() {
    let config = DictionaryConfig {
        valid_types: vec![],
        ..DictionaryConfig::default()
    };
    let result = DictionaryBuilder::new(config)
        .build(&mut VecVocabulary::new(vec![record("A1", "C1", "100", "PT", "Rash")]));
    assert!(matches!(result, Err(DictionaryError::Config(_))));
}

#[test]
fn test_duplicate_lower_level_is_pruned() {
    let dictionary = build(vec![
        record("A1", "C1", "10019211", "PT", "Headache"),
        lower_level("A2", "C1", "10019211", "10019211", "Headache"),
        lower_level("A3", "C1", "10019198", "10019211", "Head pain"),
    ]);

    assert!(dictionary.atom("A2").is_none());
    assert_eq!(dictionary.stats().pruned_duplicates, 1);
    assert_eq!(
        dictionary.lookup(MatchClass::Exact, ConceptType::Preferred, "headache"),
        Some(&["A1".to_string()][..])
    );
}

#[test]
fn test_lower_level_resolves_to_preferred() {
    let dictionary = build(vec![
        record("A1", "C1", "10019211", "PT", "Headache"),
        lower_level("A3", "C1", "10019198", "10019211", "Head pain"),
    ]);

    let llt = dictionary.atom("A3").unwrap();
    assert_eq!(dictionary.preferred_for(llt).map(|a| a.aui.as_str()), Some("A1"));

    let pt = dictionary.atom("A1").unwrap();
    assert_eq!(dictionary.preferred_for(pt).map(|a| a.aui.as_str()), Some("A1"));
}

#[test]
fn test_max_token_match_length() {
    let dictionary = build(vec![
        record("A1", "C1", "100", "PT", "Rash"),
        record("A2", "C2", "200", "PT", "Non-small cell lung cancer"),
    ]);
    assert_eq!(dictionary.max_token_match_length(), 5);
}
