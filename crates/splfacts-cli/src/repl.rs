//! Interactive REPL (Read-Eval-Print Loop) mode.
//!
//! The dictionary is built once on entry; every non-command line is then
//! matched against it with the current section, brand and index settings.

use std::path::PathBuf;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use splfacts_domain::{SectionContext, SectionKind};

use crate::commands::load_engine;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{Formatter, MatchRow};

/// Match settings carried between lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplState {
    /// Section lines are matched as
    pub section: SectionKind,
    /// Use the exact index rather than the stemmed one
    pub exact: bool,
    /// Brand name to suppress
    pub brand: Option<String>,
}

impl Default for ReplState {
    fn default() -> Self {
        Self {
            section: SectionKind::AdverseEvent,
            exact: true,
            brand: None,
        }
    }
}

impl ReplState {
    fn context(&self) -> SectionContext {
        let ctx = SectionContext::new(self.section);
        match &self.brand {
            Some(brand) => ctx.with_brand(brand.as_str()),
            None => ctx,
        }
    }

    fn prompt(&self) -> String {
        let class = if self.exact { "exact" } else { "algorithmic" };
        format!("splfacts [{} {}]> ", self.section, class)
    }
}

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Leave the REPL
    Exit,
    /// Print the command list
    Help,
    /// Switch section
    Section(SectionKind),
    /// Switch to the exact index
    Exact,
    /// Switch to the stemmed index
    Algorithmic,
    /// Set or clear the brand name
    Brand(Option<String>),
    /// Match the line as label text
    Match(String),
}

/// Parse a REPL line. Lines starting with `:` are settings commands.
pub fn parse_repl_line(line: &str) -> Result<ReplCommand> {
    let line = line.trim();
    if line.is_empty() {
        return Err(CliError::InvalidInput("Empty command".to_string()));
    }

    match line {
        "exit" | "quit" | "q" => return Ok(ReplCommand::Exit),
        "help" | "?" => return Ok(ReplCommand::Help),
        _ => {}
    }

    let Some(rest) = line.strip_prefix(':') else {
        return Ok(ReplCommand::Match(line.to_string()));
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name {
        "section" => SectionKind::parse(arg).map(ReplCommand::Section).ok_or_else(|| {
            CliError::InvalidInput(format!("Unknown section: '{}'. Use ind, ae or blackbox.", arg))
        }),
        "exact" => Ok(ReplCommand::Exact),
        "algorithmic" => Ok(ReplCommand::Algorithmic),
        "brand" if arg.is_empty() => Ok(ReplCommand::Brand(None)),
        "brand" => Ok(ReplCommand::Brand(Some(arg.to_string()))),
        _ => Err(CliError::InvalidInput(format!(
            "Unknown command: :{}. Type 'help' for available commands.",
            name
        ))),
    }
}

/// Run the interactive REPL.
pub fn run_repl(config: &Config, formatter: &Formatter) -> Result<()> {
    let engine = load_engine(config)?;
    println!(
        "{}",
        formatter.info(&format!(
            "splfacts REPL - {} atoms loaded. Type 'help' for commands, 'exit' to quit",
            engine.dictionary().atom_count()
        ))
    );
    println!();

    let mut editor = DefaultEditor::new().map_err(|e| {
        CliError::Io(std::io::Error::other(format!("Failed to initialize editor: {}", e)))
    })?;

    let history_path = get_history_path()?;
    let _ = editor.load_history(&history_path);

    let mut state = ReplState::default();

    loop {
        match editor.readline(&state.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();

                match parse_repl_line(line) {
                    Ok(ReplCommand::Exit) => {
                        println!("{}", formatter.info("Goodbye!"));
                        break;
                    }
                    Ok(ReplCommand::Help) => print_help(formatter),
                    Ok(ReplCommand::Match(text)) => {
                        let found = engine.match_text(&state.context(), &text, state.exact);
                        let rows = MatchRow::from_matches(&found, engine.dictionary());
                        match formatter.format_matches(&rows) {
                            Ok(out) => println!("{}", out),
                            Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                        }
                    }
                    Ok(command) => apply(&mut state, command),
                    Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.info("Use 'exit' to quit"));
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();
    Ok(())
}

fn apply(state: &mut ReplState, command: ReplCommand) {
    match command {
        ReplCommand::Section(section) => state.section = section,
        ReplCommand::Exact => state.exact = true,
        ReplCommand::Algorithmic => state.exact = false,
        ReplCommand::Brand(brand) => state.brand = brand,
        ReplCommand::Exit | ReplCommand::Help | ReplCommand::Match(_) => {}
    }
}

fn get_history_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(dirs::home_dir)
        .ok_or_else(|| CliError::Config("Could not find a data directory".into()))?;
    let dir = base.join("splfacts");
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("history.txt"))
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Available commands:"));
    println!();
    println!("  <text>                      - Match label text");
    println!("  :section ind|ae|blackbox    - Section to match as (default: ae)");
    println!("  :exact                      - Use the exact index (default)");
    println!("  :algorithmic                - Use the stemmed index");
    println!("  :brand [name]               - Set or clear the brand name");
    println!("  help, ?                     - Show this help");
    println!("  exit, quit, q               - Exit REPL");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_and_help() {
        assert_eq!(parse_repl_line("quit").unwrap(), ReplCommand::Exit);
        assert_eq!(parse_repl_line(" ? ").unwrap(), ReplCommand::Help);
        assert!(parse_repl_line("   ").is_err());
    }

    #[test]
    fn test_plain_text_is_matched() {
        assert_eq!(
            parse_repl_line("Rash occurred in 5% of patients.").unwrap(),
            ReplCommand::Match("Rash occurred in 5% of patients.".to_string())
        );
    }

    #[test]
    fn test_settings_commands() {
        assert_eq!(
            parse_repl_line(":section blackbox").unwrap(),
            ReplCommand::Section(SectionKind::BoxedWarning)
        );
        assert_eq!(parse_repl_line(":algorithmic").unwrap(), ReplCommand::Algorithmic);
        assert_eq!(
            parse_repl_line(":brand  Taxol ").unwrap(),
            ReplCommand::Brand(Some("Taxol".to_string()))
        );
        assert_eq!(parse_repl_line(":brand").unwrap(), ReplCommand::Brand(None));
        assert!(parse_repl_line(":section dosage").is_err());
        assert!(parse_repl_line(":unknown").is_err());
    }

    #[test]
    fn test_apply_updates_state() {
        let mut state = ReplState::default();
        apply(&mut state, ReplCommand::Section(SectionKind::Indication));
        apply(&mut state, ReplCommand::Algorithmic);
        apply(&mut state, ReplCommand::Brand(Some("Taxol".to_string())));

        assert_eq!(state.prompt(), "splfacts [IND algorithmic]> ");
        assert_eq!(state.context().brand.as_deref(), Some("Taxol"));
    }
}
