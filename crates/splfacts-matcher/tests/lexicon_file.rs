//! Engine built from a vocabulary file, a lexicon file and an antonym table

use std::sync::Arc;

use splfacts_dictionary::{build_dictionary, DictionaryConfig, JsonLinesVocabulary};
use splfacts_domain::SectionContext;
use splfacts_matcher::{MatchEngine, MatchError, MatchLexicon};

const VOCABULARY: &str = r#"{"cui":"C1","aui":"A1","code":"1","tty":"PT","term":"Tachycardia","sab":"MDR"}
{"cui":"C2","aui":"A2","code":"2","tty":"PT","term":"Sinus tachycardia","sab":"MDR"}
{"cui":"C3","aui":"A3","code":"3","tty":"PT","term":"Bradycardia","sab":"MDR"}
{"cui":"C4","aui":"A4","code":"4","tty":"PT","term":"Marked bradycardia","sab":"MDR"}
"#;

const ANTONYMS: &str = "\
ANT-1|EUI-1|ANT-2|EUI-2|CAT-1|CAT-2|TYPE|DOMAIN|SOURCE|NOTE
sinus tachycardia|E1|bradycardia|E2|noun|noun|NA|BIO|MANUAL|x
";

fn write(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_engine_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let vocabulary = write(&dir, "vocabulary.jsonl", VOCABULARY);
    let antonyms = write(&dir, "AM.DB", ANTONYMS);
    let lexicon_path = write(
        &dir,
        "lexicon.toml",
        &format!("negation_window = 40\nantonym_file = {:?}\n", antonyms.display().to_string()),
    );

    let lexicon = MatchLexicon::from_file(&lexicon_path).unwrap();
    assert_eq!(lexicon.negation_window, 40);

    let mut source = JsonLinesVocabulary::new(&vocabulary);
    let dictionary = Arc::new(build_dictionary(&mut source, DictionaryConfig::default()).unwrap());
    let engine = MatchEngine::new(dictionary, lexicon).unwrap();

    // the table pair drops the shorter member
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Sinus tachycardia and bradycardia were reported.",
        true,
    );
    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["sinus tachycardia"]);
    assert_eq!(found["sinus tachycardia"], vec!["A2"]);

    // specificity alone drops "bradycardia" here
    let found = engine.match_text(
        &SectionContext::adverse_event(),
        "Marked bradycardia occurred.",
        true,
    );
    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["marked bradycardia"]);
}

#[test]
fn test_missing_antonym_table_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let vocabulary = write(&dir, "vocabulary.jsonl", VOCABULARY);
    let mut source = JsonLinesVocabulary::new(&vocabulary);
    let dictionary = Arc::new(build_dictionary(&mut source, DictionaryConfig::default()).unwrap());

    let lexicon = MatchLexicon {
        antonym_file: Some(dir.path().join("missing.db")),
        ..MatchLexicon::default()
    };
    assert!(matches!(MatchEngine::new(dictionary, lexicon), Err(MatchError::Io(_))));
}

#[test]
fn test_bad_lexicon_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "lexicon.toml", "negation_window = \"wide\"\n");
    assert!(matches!(MatchLexicon::from_file(&path), Err(MatchError::Config(_))));
}
