//! Dictionary command implementation.

use splfacts_dictionary::normalize_term;
use splfacts_domain::MatchClass;

use crate::cli::DictionaryArgs;
use crate::commands::load_dictionary;
use crate::config::Config;
use crate::error::Result;
use crate::output::{DictionaryReport, Formatter, MatchRow};

/// Execute the dictionary command.
pub fn execute_dictionary(args: DictionaryArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let dictionary = load_dictionary(config)?;

    let Some(term) = args.lookup else {
        println!("{}", formatter.format_dictionary(&DictionaryReport::new(&dictionary))?);
        return Ok(());
    };

    let key = normalize_term(&term);
    let rows: Vec<MatchRow> = dictionary
        .valid_types()
        .iter()
        .filter_map(|tty| dictionary.lookup(MatchClass::Exact, *tty, &key))
        .flatten()
        .filter_map(|aui| dictionary.atom(aui))
        .map(|atom| MatchRow {
            key: key.clone(),
            aui: atom.aui.clone(),
            cui: atom.cui.clone(),
            tty: atom.tty.as_str().to_string(),
            term: atom.term.clone(),
        })
        .collect();

    println!("{}", formatter.format_matches(&rows)?);
    Ok(())
}
