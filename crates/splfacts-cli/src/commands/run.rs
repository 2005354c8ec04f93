//! Run command implementation.

use std::fs;
use std::sync::Arc;

use serde::Serialize;
use splfacts_aggregate::ProductAggregate;
use splfacts_registry::{IdentityRegistry, RegistryStats};
use splfacts_worker::{read_label_changes, ExtractionPool, JsonLinesDocuments, LabelRow, RunOutput, WorkerMetrics};

use crate::cli::RunArgs;
use crate::commands::load_engine;
use crate::config::{Config, OutputFormat};
use crate::error::{CliError, Result};
use crate::output::{Formatter, ProductRow};

/// JSON report of a run.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    /// Run id
    pub run_id: String,
    /// Merged products
    pub products: &'a [ProductAggregate],
    /// Product-to-term rows
    pub rows: &'a [LabelRow],
    /// Extraction counts
    pub metrics: &'a WorkerMetrics,
    /// Registry entry counts
    pub registry: &'a RegistryStats,
}

impl<'a> RunReport<'a> {
    /// Borrow a run's output for serialization.
    pub fn new(output: &'a RunOutput) -> Self {
        Self {
            run_id: output.run_id.to_string(),
            products: &output.products,
            rows: &output.rows,
            metrics: &output.metrics,
            registry: &output.registry,
        }
    }
}

/// Execute the run command.
pub async fn execute_run(args: RunArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    let mut worker = config.worker.clone();
    if let Some(pool_size) = args.pool_size {
        worker.pool_size = pool_size;
    }
    if args.reconcile {
        worker.reconcile_across_sections = true;
    }
    worker.validate().map_err(CliError::Config)?;

    let engine = load_engine(config)?;
    let documents = JsonLinesDocuments::open(&args.documents, worker.max_section_chars)?;
    if documents.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "No documents in {}",
            args.documents.display()
        )));
    }

    let registry = Arc::new(IdentityRegistry::new());
    registry.ids().bootstrap(&config.ids)?;

    let label_changes = match &args.label_changes {
        Some(path) => read_label_changes(path, worker.max_section_chars)?,
        None => Vec::new(),
    };

    let pool = ExtractionPool::new(worker, engine, registry)?.with_label_changes(label_changes);
    let output = pool.run(documents).await?;

    let report = serde_json::to_string_pretty(&RunReport::new(&output))?;
    match &args.output {
        Some(path) => {
            fs::write(path, report)?;
            eprintln!("{}", formatter.success(&format!("Report written to {}", path.display())));
        }
        None if formatter.format() == OutputFormat::Json => println!("{}", report),
        None => {}
    }

    if formatter.format() != OutputFormat::Json || args.output.is_some() {
        let rows: Vec<ProductRow> = output.products.iter().map(ProductRow::new).collect();
        println!("{}", formatter.format_products(&rows)?);
    }
    if formatter.format() == OutputFormat::Table {
        eprintln!("{}", output.metrics.summary());
        eprintln!("{}", output.merge_report.summary());
    }
    if output.metrics.documents_failed > 0 {
        eprintln!(
            "{}",
            formatter.warning(&format!("{} document(s) could not be read", output.metrics.documents_failed))
        );
    }

    Ok(())
}
