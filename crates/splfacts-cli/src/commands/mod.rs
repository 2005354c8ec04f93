//! Command implementations.

pub mod dictionary;
pub mod match_text;
pub mod run;
pub mod show_config;

use std::sync::Arc;

use splfacts_dictionary::{DictionaryBuilder, JsonLinesVocabulary, TermDictionary};
use splfacts_matcher::MatchEngine;
use tracing::info;

use crate::config::Config;
use crate::error::Result;

pub use self::dictionary::execute_dictionary;
pub use self::match_text::execute_match;
pub use self::run::execute_run;
pub use self::show_config::execute_show_config;

/// Build the dictionary from the configured vocabulary file.
pub fn load_dictionary(config: &Config) -> Result<TermDictionary> {
    let path = config.vocabulary()?;
    let mut vocabulary = JsonLinesVocabulary::new(path);
    let dictionary = DictionaryBuilder::new(config.dictionary.clone()).build(&mut vocabulary)?;
    info!("Dictionary built from {}: {}", path.display(), dictionary.stats().summary());
    Ok(dictionary)
}

/// Build the dictionary and compile the match engine over it.
pub fn load_engine(config: &Config) -> Result<Arc<MatchEngine>> {
    let dictionary = load_dictionary(config)?;
    let engine = MatchEngine::new(Arc::new(dictionary), config.lexicon.clone())?;
    Ok(Arc::new(engine))
}
