//! Output formatting for the CLI.

use colored::*;
use serde::Serialize;
use splfacts_aggregate::ProductAggregate;
use splfacts_dictionary::{BuildStats, TermDictionary};
use splfacts_domain::{MatchClass, SectionKind};
use splfacts_matcher::TermMatches;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

use crate::config::OutputFormat;
use crate::error::Result;

/// One matched atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRow {
    /// Matched key
    pub key: String,
    /// Atom id
    pub aui: String,
    /// Concept id
    pub cui: String,
    /// Concept type code
    pub tty: String,
    /// Display term
    pub term: String,
}

impl MatchRow {
    /// Flatten engine output into rows, resolving atoms in the dictionary.
    pub fn from_matches(found: &TermMatches, dictionary: &TermDictionary) -> Vec<MatchRow> {
        found
            .iter()
            .flat_map(|(key, auis)| auis.iter().map(move |aui| (key, aui)))
            .filter_map(|(key, aui)| {
                dictionary.atom(aui).map(|atom| MatchRow {
                    key: key.clone(),
                    aui: atom.aui.clone(),
                    cui: atom.cui.clone(),
                    tty: atom.tty.as_str().to_string(),
                    term: atom.term.clone(),
                })
            })
            .collect()
    }
}

/// Dictionary build summary.
#[derive(Debug, Clone, Serialize)]
pub struct DictionaryReport {
    /// Indexed atoms
    pub atoms: usize,
    /// Longest key in tokens
    pub max_token_match_length: usize,
    /// Concept types indexed
    pub valid_types: Vec<String>,
    /// Build counters
    pub stats: BuildStats,
}

impl DictionaryReport {
    /// Summarize a built dictionary.
    pub fn new(dictionary: &TermDictionary) -> Self {
        Self {
            atoms: dictionary.atom_count(),
            max_token_match_length: dictionary.max_token_match_length(),
            valid_types: dictionary
                .valid_types()
                .iter()
                .map(|tty| tty.as_str().to_string())
                .collect(),
            stats: dictionary.stats().clone(),
        }
    }
}

/// One product line of a run report.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    /// Product id
    pub id: i64,
    /// Grouping key
    pub guid: String,
    /// Prescription, OTC or other
    pub source_type: String,
    /// GUIDs merged into the product
    pub guids: usize,
    /// Indication atoms (both passes)
    pub indications: usize,
    /// Adverse-event atoms (both passes)
    pub adverse_events: usize,
    /// Boxed-warning atoms (both passes)
    pub boxed_warnings: usize,
}

impl ProductRow {
    /// Summarize a merged product.
    pub fn new(product: &ProductAggregate) -> Self {
        let count = |section: SectionKind| -> usize {
            [MatchClass::Exact, MatchClass::Algorithmic]
                .into_iter()
                .map(|class| product.labels.get(section, class).len())
                .sum()
        };
        Self {
            id: product.id,
            guid: product.guid.clone(),
            source_type: product.source_type.as_str().to_string(),
            guids: product.all_guids().len(),
            indications: count(SectionKind::Indication),
            adverse_events: count(SectionKind::AdverseEvent),
            boxed_warnings: count(SectionKind::BoxedWarning),
        }
    }
}

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Selected output format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format matched atoms.
    pub fn format_matches(&self, rows: &[MatchRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
            OutputFormat::Quiet => Ok(rows.iter().map(|r| r.aui.as_str()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No terms matched.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Key", "AUI", "CUI", "TTY", "Term"]);
                for row in rows {
                    builder.push_record([&row.key, &row.aui, &row.cui, &row.tty, &row.term]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a dictionary summary.
    pub fn format_dictionary(&self, report: &DictionaryReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Quiet => Ok(report.atoms.to_string()),
            OutputFormat::Table => {
                let stats = &report.stats;
                let mut builder = Builder::default();
                builder.push_record(["Metric", "Value"]);
                let lines = [
                    ("Atoms indexed", report.atoms.to_string()),
                    ("Concept types", report.valid_types.join(", ")),
                    ("Longest key (tokens)", report.max_token_match_length.to_string()),
                    ("Records read", stats.records_read.to_string()),
                    ("Variant keys", stats.variant_keys.to_string()),
                    ("Skipped: malformed", stats.skipped_malformed.to_string()),
                    ("Skipped: type", stats.skipped_type.to_string()),
                    ("Skipped: stop phrase", stats.skipped_stopword.to_string()),
                    ("Pruned duplicates", stats.pruned_duplicates.to_string()),
                ];
                for (metric, value) in lines {
                    builder.push_record([metric.to_string(), value]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format the products of a run.
    pub fn format_products(&self, rows: &[ProductRow]) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(rows)?),
            OutputFormat::Quiet => Ok(rows.iter().map(|r| r.id.to_string()).collect::<Vec<_>>().join("\n")),
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No products extracted.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["ID", "GUID", "Source", "GUIDs", "IND", "AE", "BLACKBOX"]);
                for row in rows {
                    builder.push_record([
                        row.id.to_string(),
                        row.guid.clone(),
                        row.source_type.clone(),
                        row.guids.to_string(),
                        row.indications.to_string(),
                        row.adverse_events.to_string(),
                        row.boxed_warnings.to_string(),
                    ]);
                }
                Ok(self.render(builder))
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
