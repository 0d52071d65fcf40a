use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::retry::RetryPolicy;
use crate::summary::{RunSummary, ServerOutcome};
use atlas_classifier::{Classifier, ClassifierInput};
use atlas_extractor::{Extractor, ServerExtraction};
use atlas_graph::{GraphIngestor, GraphStore, IngestError, IngestRequest};
use atlas_model::{RepositorySnapshot, ServerProfile};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// One server as handed over by the crawler.
#[derive(Debug, Clone)]
pub struct ServerInput {
    pub profile: ServerProfile,
    pub snapshot: RepositorySnapshot,
}

impl ServerInput {
    pub fn new(profile: ServerProfile, snapshot: RepositorySnapshot) -> Self {
        Self { profile, snapshot }
    }
}

/// Shared, read-only state every worker task holds a copy of.
#[derive(Clone)]
struct Worker {
    extractor: Arc<Extractor>,
    classifier: Arc<Classifier>,
    ingestor: Arc<GraphIngestor>,
    retry: RetryPolicy,
    extraction_enabled: bool,
    classification_enabled: bool,
}

/// Extraction, classification and ingestion over many servers.
///
/// Servers run in parallel up to `concurrency`; the stages of one server run
/// in order. A server's failure is recorded in its [`ServerOutcome`] and
/// never stops the others.
pub struct Pipeline {
    config: PipelineConfig,
    worker: Worker,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: Arc<dyn GraphStore>) -> Result<Self> {
        config.validate()?;
        let extractor =
            Extractor::new(config.discovery.clone()).map_err(|e| PipelineError::config(e.to_string()))?;
        let worker = Worker {
            extractor: Arc::new(extractor),
            classifier: Arc::new(Classifier::default()),
            ingestor: Arc::new(GraphIngestor::new(store)),
            retry: config.retry,
            extraction_enabled: config.extraction_enabled,
            classification_enabled: config.classification_enabled,
        };
        Ok(Self { config, worker })
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.worker.classifier = Arc::new(classifier);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ingestor(&self) -> &GraphIngestor {
        &self.worker.ingestor
    }

    /// Process `inputs` in order of scheduling; at most `max_servers` are
    /// scheduled and every scheduled server runs to completion.
    pub async fn run(&self, inputs: Vec<ServerInput>) -> Result<RunSummary> {
        self.worker.ingestor.prepare().await?;

        let limit = self.config.max_servers.unwrap_or(inputs.len());
        let skipped = inputs.len().saturating_sub(limit);
        if skipped > 0 {
            log::info!("max_servers={limit}: {skipped} servers left unscheduled");
        }

        let permits = Arc::new(Semaphore::new(self.config.concurrency));
        let mut tasks = JoinSet::new();
        for input in inputs.into_iter().take(limit) {
            let worker = self.worker.clone();
            let permits = Arc::clone(&permits);
            let server = input.profile.identity.clone();
            tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = permits.acquire_owned().await.ok();
                // a panicking worker fails its own server, not the run
                match tokio::spawn(worker.process(input)).await {
                    Ok(outcome) => outcome,
                    Err(err) => {
                        log::warn!("{server}: worker task failed: {err}");
                        let mut outcome = ServerOutcome::new(server);
                        outcome.state = outcome
                            .state
                            .begin()
                            .finish(Err(format!("worker task failed: {err}")));
                        outcome.error = Some(format!("worker task failed: {err}"));
                        outcome
                    }
                }
            });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(joined?);
        }

        let graph = match self.worker.ingestor.store().statistics().await {
            Ok(stats) => Some(stats),
            Err(err) => {
                log::warn!("graph statistics unavailable: {err}");
                None
            }
        };
        let summary = RunSummary::collect(outcomes, skipped, graph);
        log::info!(
            "run finished: {} servers committed, {} failed, {} records",
            summary.succeeded,
            summary.failed,
            summary.records
        );
        Ok(summary)
    }
}

impl Worker {
    async fn process(self, input: ServerInput) -> ServerOutcome {
        let ServerInput { profile, snapshot } = input;
        let mut outcome = ServerOutcome::new(profile.identity.clone());

        let extraction = if self.extraction_enabled {
            let extractor = Arc::clone(&self.extractor);
            let identity = profile.identity.clone();
            let extracted =
                tokio::task::spawn_blocking(move || extractor.extract(&identity, &snapshot)).await;
            match extracted {
                Ok(extraction) => extraction,
                Err(err) => {
                    log::warn!("{}: extraction task failed: {err}", profile.identity);
                    outcome.error = Some(format!("extraction task failed: {err}"));
                    return outcome;
                }
            }
        } else {
            ServerExtraction::default()
        };

        if self.classification_enabled {
            let names: Vec<String> = extraction.capability_names().map(String::from).collect();
            let classification = self.classifier.classify(ClassifierInput {
                description: profile.description.as_deref().unwrap_or_default(),
                topics: &profile.topics,
                capability_names: &names,
            });
            if classification.categories.is_empty() {
                log::debug!("{}: no category cleared the threshold", profile.identity);
            }
            outcome.categories = classification.categories;
            outcome.domains = classification.domains;
        }

        let request = IngestRequest::new(&profile, &extraction.records)
            .categories(&outcome.categories)
            .domains(&outcome.domains)
            .languages(&extraction.languages)
            .frameworks(&extraction.frameworks);

        outcome.state = outcome.state.begin();
        let ingestor = &self.ingestor;
        let attempted = self
            .retry
            .run(|| ingestor.ingest(request), IngestError::is_retryable)
            .await;
        outcome.attempts = attempted.attempts;

        match attempted.result {
            Ok(result) => {
                outcome.state = outcome.state.finish(Ok(()));
                outcome.ingest = Some(result);
                log::info!(
                    "{}: {} records, {} categories, committed after {} attempt(s)",
                    profile.identity,
                    extraction.records.len(),
                    outcome.categories.len(),
                    outcome.attempts
                );
            }
            Err(err) => {
                outcome.state = outcome.state.finish(Err(err.source.to_string()));
                outcome.error = Some(err.to_string());
            }
        }

        outcome.records = extraction.records;
        outcome.stats = extraction.stats;
        outcome
    }
}
