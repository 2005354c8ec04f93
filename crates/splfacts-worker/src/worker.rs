//! Bounded worker pool for extraction runs

use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use splfacts_aggregate::{
    apply_label_changes, normalize_ndc, LabelChange, MergeReference, MergeReport, ProductAggregate, ProductMerger,
};
use splfacts_domain::traits::{DocumentGroup, DocumentSource};
use splfacts_domain::{LabelDate, MatchClass, SafetyLabelChange, SectionKind, SourceDocument};
use splfacts_matcher::MatchEngine;
use splfacts_registry::{composite_key, IdKind, IdentityRegistry, KeyKind, RegistryStats};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::WorkerConfig;
use crate::error::{Result, WorkerError};
use crate::extract::LabelExtractor;
use crate::metrics::WorkerMetrics;

type SharedProducts = Arc<DashMap<String, Arc<Mutex<ProductAggregate>>>>;

/// A document group with every readable document loaded
#[derive(Debug, Clone)]
struct LoadedGroup {
    guid: String,
    documents: Vec<SourceDocument>,
}

/// One product-to-term row, emitted once per distinct key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRow {
    /// Row id from the adverse-event or indication counter
    pub id: i64,
    /// Product the term belongs to
    pub product_id: i64,
    /// Section the term was found in
    pub section: SectionKind,
    /// Pass that found it
    pub class: MatchClass,
    /// Atom id
    pub aui: String,
    /// Concept id
    pub cui: String,
    /// Display term
    pub term: String,
    /// Earliest label date the term was seen on
    pub first_observed: Option<LabelDate>,
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Run id (UUIDv7)
    pub run_id: Uuid,
    /// Merged products with ids assigned, ordered by id
    pub products: Vec<ProductAggregate>,
    /// Product-to-term rows
    pub rows: Vec<LabelRow>,
    /// Extraction counts
    pub metrics: WorkerMetrics,
    /// Cross-product merge counts
    pub merge_report: MergeReport,
    /// Registry entry counts at the end of the run
    pub registry: RegistryStats,
}

/// Extraction pool: reads document groups, matches them in parallel and
/// merges the results into products.
///
/// Reading runs on its own task and feeds a bounded channel; each group is
/// matched on the blocking pool under a semaphore sized by
/// [`WorkerConfig::effective_pool_size`].
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use splfacts_dictionary::{build_dictionary, DictionaryConfig, JsonLinesVocabulary};
/// use splfacts_matcher::{MatchEngine, MatchLexicon};
/// use splfacts_registry::IdentityRegistry;
/// use splfacts_worker::{ExtractionPool, JsonLinesDocuments, WorkerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut vocabulary = JsonLinesVocabulary::new("vocabulary.jsonl");
///     let dictionary = build_dictionary(&mut vocabulary, DictionaryConfig::default())?;
///     let engine = MatchEngine::new(Arc::new(dictionary), MatchLexicon::default())?;
///
///     let config = WorkerConfig::default();
///     let documents = JsonLinesDocuments::open("labels.jsonl", config.max_section_chars)?;
///     let pool = ExtractionPool::new(config, Arc::new(engine), Arc::new(IdentityRegistry::new()))?;
///
///     let output = pool.run(documents).await?;
///     println!("{}", output.metrics.summary());
///     Ok(())
/// }
/// ```
pub struct ExtractionPool {
    config: WorkerConfig,
    extractor: Arc<LabelExtractor>,
    registry: Arc<IdentityRegistry>,
    reference: MergeReference,
    label_changes: Arc<Vec<SafetyLabelChange>>,
}

impl ExtractionPool {
    /// Create a pool; fails on an invalid configuration
    pub fn new(config: WorkerConfig, engine: Arc<MatchEngine>, registry: Arc<IdentityRegistry>) -> Result<Self> {
        config.validate().map_err(WorkerError::Config)?;
        let extractor = Arc::new(LabelExtractor::new(engine, &config));
        Ok(Self {
            config,
            extractor,
            registry,
            reference: MergeReference::default(),
            label_changes: Arc::new(Vec::new()),
        })
    }

    /// Safety label changes folded into the merged products of every run
    pub fn with_label_changes(mut self, changes: Vec<SafetyLabelChange>) -> Self {
        self.label_changes = Arc::new(changes);
        self
    }

    /// Reference data applied during cross-product merging
    pub fn with_reference(mut self, reference: MergeReference) -> Self {
        self.reference = reference;
        self
    }

    /// Pool configuration
    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Registry shared with the pool tasks
    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    /// Process every group of a document source.
    ///
    /// Only a source that cannot list its groups fails the run; unreadable
    /// documents and rejected merges are logged and counted.
    pub async fn run<S>(&self, source: S) -> Result<RunOutput>
    where
        S: DocumentSource + Send + Sync + 'static,
        S::Error: Display + Send,
    {
        let run_id = Uuid::now_v7();
        let span = info_span!("run", run_id = %run_id);
        self.run_inner(run_id, Arc::new(source)).instrument(span).await
    }

    async fn run_inner<S>(&self, run_id: Uuid, source: Arc<S>) -> Result<RunOutput>
    where
        S: DocumentSource + Send + Sync + 'static,
        S::Error: Display + Send,
    {
        let started = Instant::now();
        let pool_size = self.config.effective_pool_size();
        info!(pool_size, channel_capacity = self.config.channel_capacity, "Extraction run started");

        let (tx, mut rx) = mpsc::channel(self.config.channel_capacity);
        let producer = tokio::spawn(load_groups(Arc::clone(&source), tx, self.config.clone()));

        let semaphore = Arc::new(Semaphore::new(pool_size));
        let products: SharedProducts = Arc::new(DashMap::new());
        let mut tasks = JoinSet::new();
        let mut metrics = WorkerMetrics::new();

        while let Some(group) = rx.recv().await {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| WorkerError::Join(e.to_string()))?;
            let extractor = Arc::clone(&self.extractor);
            let registry = Arc::clone(&self.registry);
            let products = Arc::clone(&products);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                process_group(group, &extractor, &registry, &products)
            });

            while let Some(done) = tasks.try_join_next() {
                metrics.absorb(&done.map_err(|e| WorkerError::Join(e.to_string()))?);
            }
        }
        while let Some(done) = tasks.join_next().await {
            metrics.absorb(&done.map_err(|e| WorkerError::Join(e.to_string()))?);
        }

        let read_metrics = producer.await.map_err(|e| WorkerError::Join(e.to_string()))??;
        metrics.absorb(&read_metrics);

        let mut collected: Vec<ProductAggregate> = products
            .iter()
            .map(|entry| lock(entry.value()).clone())
            .collect();
        collected.sort_by(|a, b| a.guid.cmp(&b.guid));

        let (mut merged, merge_report) = ProductMerger::new(self.reference.clone()).merge_all(collected);
        if !self.label_changes.is_empty() {
            let (changes, change_metrics) = self.match_label_changes().await?;
            metrics.absorb(&change_metrics);
            metrics.label_changes_applied += apply_label_changes(&mut merged, &changes);
        }
        if self.config.reconcile_across_sections {
            for product in &mut merged {
                product.reconcile_across_sections(self.config.reconcile_by_pt_key);
            }
        }

        self.assign_product_ids(&mut merged);
        let rows = self.label_rows(&merged);
        metrics.total_runtime_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            products = merged.len(),
            rows = rows.len(),
            documents = metrics.documents_processed,
            failed = metrics.documents_failed,
            "Extraction run finished"
        );
        debug!("Run metrics:\n{}", metrics.summary());

        Ok(RunOutput {
            run_id,
            products: merged,
            rows,
            metrics,
            merge_report,
            registry: self.registry.stats(),
        })
    }

    async fn match_label_changes(&self) -> Result<(Vec<LabelChange>, WorkerMetrics)> {
        let extractor = Arc::clone(&self.extractor);
        let registry = Arc::clone(&self.registry);
        let records = Arc::clone(&self.label_changes);
        tokio::task::spawn_blocking(move || {
            let mut metrics = WorkerMetrics::new();
            let changes: Vec<LabelChange> = records
                .iter()
                .filter_map(|record| extractor.extract_label_change(record, &registry, &mut metrics))
                .collect();
            metrics.label_changes_matched = changes.len();
            (changes, metrics)
        })
        .await
        .map_err(|e| WorkerError::Join(e.to_string()))
    }

    fn assign_product_ids(&self, products: &mut [ProductAggregate]) {
        let ids = self.registry.ids();
        for product in products.iter() {
            if let Some(prior) = product.prior_id {
                self.registry.register(KeyKind::Product, &product.guid, prior);
                ids.bump_to_at_least(IdKind::Product, prior + 1);
            }
        }
        for product in products.iter_mut() {
            let (id, _) = self.registry.get_or_allocate(KeyKind::Product, &product.guid, IdKind::Product);
            product.id = id;
        }
        products.sort_by_key(|product| product.id);
    }

    fn label_rows(&self, products: &[ProductAggregate]) -> Vec<LabelRow> {
        let mut rows = Vec::new();
        for product in products {
            let product_id = product.id.to_string();
            for bucket in product.labels.iter() {
                for atom in bucket.iter() {
                    let key = composite_key(&[
                        product_id.as_str(),
                        bucket.section().as_str(),
                        bucket.class().as_str(),
                        atom.aui.as_str(),
                    ]);
                    if !self.registry.mark_written(&key) {
                        continue;
                    }
                    let id = if bucket.is_indication() {
                        self.registry.ids().next_product_indication_id()
                    } else {
                        self.registry.ids().next_product_adverse_event_id()
                    };
                    rows.push(LabelRow {
                        id,
                        product_id: product.id,
                        section: bucket.section(),
                        class: bucket.class(),
                        aui: atom.aui.clone(),
                        cui: atom.cui.clone(),
                        term: atom.term.clone(),
                        first_observed: bucket.date_of(&atom.aui),
                    });
                }
            }
        }
        rows
    }
}

fn lock(product: &Mutex<ProductAggregate>) -> MutexGuard<'_, ProductAggregate> {
    product.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// List groups and load their documents, feeding the pool channel
async fn load_groups<S>(source: Arc<S>, tx: mpsc::Sender<LoadedGroup>, config: WorkerConfig) -> Result<WorkerMetrics>
where
    S: DocumentSource + Send + Sync + 'static,
    S::Error: Display + Send,
{
    let mut metrics = WorkerMetrics::new();
    let lister = Arc::clone(&source);
    let groups: Vec<DocumentGroup> = tokio::task::spawn_blocking(move || lister.groups().map_err(|e| e.to_string()))
        .await
        .map_err(|e| WorkerError::Join(e.to_string()))?
        .map_err(WorkerError::Source)?;
    info!(groups = groups.len(), "Document groups discovered");

    for group in groups {
        let mut documents = Vec::with_capacity(group.document_ids.len());
        for document_id in &group.document_ids {
            match read_with_retries(&source, document_id, &config, &mut metrics).await {
                Some(doc) => documents.push(doc),
                None => metrics.record_failure(),
            }
        }
        let loaded = LoadedGroup {
            guid: group.guid,
            documents,
        };
        if tx.send(loaded).await.is_err() {
            warn!("Pool stopped receiving; remaining groups dropped");
            break;
        }
    }
    Ok(metrics)
}

async fn read_with_retries<S>(
    source: &Arc<S>,
    document_id: &str,
    config: &WorkerConfig,
    metrics: &mut WorkerMetrics,
) -> Option<SourceDocument>
where
    S: DocumentSource + Send + Sync + 'static,
    S::Error: Display + Send,
{
    let mut attempt = 0;
    loop {
        let reader = Arc::clone(source);
        let id = document_id.to_string();
        let outcome = tokio::task::spawn_blocking(move || reader.read(&id).map_err(|e| e.to_string())).await;
        let message = match outcome {
            Ok(Ok(doc)) => return Some(doc),
            Ok(Err(message)) => message,
            Err(join) => join.to_string(),
        };

        if attempt >= config.max_read_retries {
            error!(document = %document_id, attempts = attempt + 1, "Document unreadable: {}", message);
            return None;
        }
        attempt += 1;
        metrics.record_retry();
        warn!(document = %document_id, attempt, "Document read failed, retrying: {}", message);
        tokio::time::sleep(config.retry_backoff(attempt)).await;
    }
}

/// Intern the natural keys a document references
fn register_references(doc: &SourceDocument, registry: &IdentityRegistry) {
    let file_key = if doc.file.is_empty() { &doc.document_id } else { &doc.file };
    registry.get_or_allocate(KeyKind::SourceFile, file_key, IdKind::SourceFile);
    for code in doc.codes.products.values() {
        registry.get_or_allocate(KeyKind::Code, &composite_key(&[code.code.as_str(), code.term.as_str()]), IdKind::Code);
    }
    for aui in doc.codes.ingredients.keys() {
        registry.intern(KeyKind::Ingredient, aui);
    }
    for aui in doc.codes.rxnorm.keys() {
        registry.intern(KeyKind::RxNorm, aui);
    }
    for raw in &doc.codes.raw_ndc_codes {
        match normalize_ndc(raw) {
            Some(ndc) => {
                registry.intern(KeyKind::Ndc, &ndc);
            }
            None => debug!(document = %doc.document_id, ndc = %raw, "Unparseable NDC not registered"),
        }
    }
}

/// Match every document of a group and merge it into the group's product
fn process_group(
    group: LoadedGroup,
    extractor: &LabelExtractor,
    registry: &IdentityRegistry,
    products: &DashMap<String, Arc<Mutex<ProductAggregate>>>,
) -> WorkerMetrics {
    let mut metrics = WorkerMetrics::new();

    for doc in &group.documents {
        register_references(doc, registry);

        let incoming = extractor.extract(doc, registry, &mut metrics);
        let product = products
            .entry(group.guid.clone())
            .or_insert_with(|| Arc::new(Mutex::new(incoming.copy_template())))
            .clone();

        let mut product = lock(&product);
        match product.merge_product_group(&incoming) {
            Ok(()) => {
                product.mark_processed(&doc.file);
                metrics.record_document();
            }
            Err(rejection) => {
                error!(
                    guid = %group.guid,
                    document = %doc.document_id,
                    "Document not merged into its product: {}",
                    rejection
                );
                metrics.record_rejection();
            }
        }
    }

    metrics.record_group();
    debug!(guid = %group.guid, documents = group.documents.len(), "Group processed");
    metrics
}
