//! Building a dictionary from a JSON-lines vocabulary on disk

use std::io::Write;

use splfacts_dictionary::{
    build_dictionary, DictionaryConfig, DictionaryError, JsonLinesVocabulary,
};
use splfacts_domain::{ConceptType, MatchClass};

const VOCABULARY: &str = r#"{"cui":"C0007131","aui":"A1","code":"10029514","tty":"PT","term":"Non-small cell lung cancer","sab":"MDR"}
{"cui":"C0149925","aui":"A2","code":"10041067","tty":"PT","term":"Small cell lung cancer","sab":"MDR"}
{"cui":"C0036202","aui":"A3","code":"10039491","tty":"PT","term":"Sarcoma","sab":"MDR"}
{"cui":"C0036202","aui":"A4","code":"10039492","pt_code":"10039491","tty":"LLT","term":"Sarcomas","sab":"MDR"}
this line is not json
{"cui":"C0000001","aui":"A5","code":"1","tty":"SY","term":"Unknown type","sab":"MDR"}
"#;

#[test]
fn test_build_from_file_skips_bad_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(VOCABULARY.as_bytes()).unwrap();

    let mut source = JsonLinesVocabulary::new(file.path());
    let dictionary = build_dictionary(&mut source, DictionaryConfig::default()).unwrap();

    assert_eq!(dictionary.atom_count(), 4);
    assert_eq!(dictionary.stats().records_read, 6);
    assert_eq!(dictionary.stats().skipped_malformed, 2);

    let exact = dictionary.index(MatchClass::Exact);
    assert!(exact
        .get(ConceptType::Preferred, 5, "non small cell lung cancer")
        .is_some());
    assert!(exact
        .get(ConceptType::LowerLevel, 1, "sarcomas")
        .is_some());

    // plural and singular collapse in the stemmed index
    let stemmed = dictionary.stem_phrase("sarcomas");
    assert_eq!(
        dictionary.lookup(MatchClass::Algorithmic, ConceptType::Preferred, &stemmed),
        Some(&["A3".to_string()][..])
    );
}

#[test]
fn test_unreadable_source_fails_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = JsonLinesVocabulary::new(dir.path().join("missing.jsonl"));

    let result = build_dictionary(&mut source, DictionaryConfig::default());
    assert!(matches!(result, Err(DictionaryError::SourceUnreadable(_))));
}

#[test]
fn test_file_with_only_garbage_is_empty() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{}\nnot json\n").unwrap();

    let mut source = JsonLinesVocabulary::new(file.path());
    let result = build_dictionary(&mut source, DictionaryConfig::default());
    assert!(matches!(result, Err(DictionaryError::EmptyVocabulary(2))));
}
