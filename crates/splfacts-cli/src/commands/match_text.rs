//! Match command implementation.

use std::io::{self, Read};

use splfacts_domain::{SectionContext, SectionKind};

use crate::cli::MatchArgs;
use crate::commands::load_engine;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{Formatter, MatchRow};

/// Execute the match command.
pub fn execute_match(args: MatchArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let text = if args.stdin {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else if let Some(text) = args.text {
        text
    } else {
        return Err(CliError::InvalidInput(
            "Must specify either text or --stdin".to_string(),
        ));
    };

    let engine = load_engine(config)?;
    let mut ctx = SectionContext::new(SectionKind::from(args.section));
    if let Some(brand) = args.brand {
        ctx = ctx.with_brand(brand);
    }

    let found = engine.match_text(&ctx, &text, !args.algorithmic);
    let rows = MatchRow::from_matches(&found, engine.dictionary());
    println!("{}", formatter.format_matches(&rows)?);
    Ok(())
}
