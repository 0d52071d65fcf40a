use atlas_extractor::ExtractionStats;
use atlas_graph::{GraphStatistics, IngestResult, IngestState};
use atlas_model::{CapabilityRecord, CategoryAssignment, ExportRow, ServerIdentity};
use serde::Serialize;

/// What happened to one server.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerOutcome {
    pub server: ServerIdentity,
    pub state: IngestState,
    pub records: Vec<CapabilityRecord>,
    pub categories: Vec<CategoryAssignment>,
    pub domains: Vec<CategoryAssignment>,
    /// `None` unless the server's batch was committed
    pub ingest: Option<IngestResult>,
    pub stats: ExtractionStats,
    /// Commit attempts, retries included
    pub attempts: u32,
    pub error: Option<String>,
}

impl ServerOutcome {
    pub(crate) fn new(server: ServerIdentity) -> Self {
        Self {
            server,
            state: IngestState::Pending,
            records: Vec::new(),
            categories: Vec::new(),
            domains: Vec::new(),
            ingest: None,
            stats: ExtractionStats::default(),
            attempts: 0,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.state == IngestState::Committed
    }

    pub fn export_rows(&self) -> impl Iterator<Item = ExportRow> + '_ {
        self.records.iter().map(CapabilityRecord::export_row)
    }
}

/// Per-server breakdown of a run plus its totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    /// Sorted by server name
    pub outcomes: Vec<ServerOutcome>,
    /// Inputs left unscheduled by `max_servers`
    pub servers_skipped: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub records: usize,
    pub totals: IngestResult,
    pub stats: ExtractionStats,
    pub graph: Option<GraphStatistics>,
}

impl RunSummary {
    pub(crate) fn collect(
        mut outcomes: Vec<ServerOutcome>,
        servers_skipped: usize,
        graph: Option<GraphStatistics>,
    ) -> Self {
        outcomes.sort_by(|a, b| a.server.cmp(&b.server));

        let mut summary = Self {
            servers_skipped,
            graph,
            ..Default::default()
        };
        for outcome in &outcomes {
            if outcome.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            summary.records += outcome.records.len();
            if let Some(result) = &outcome.ingest {
                summary.totals.merge(result);
            }
            summary.stats.merge(&outcome.stats);
        }
        summary.outcomes = outcomes;
        summary
    }

    pub fn outcome(&self, server: &str) -> Option<&ServerOutcome> {
        self.outcomes.iter().find(|o| o.server.as_str() == server)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ServerOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Every record of the run in export form, grouped by server
    pub fn export_rows(&self) -> Vec<ExportRow> {
        self.outcomes.iter().flat_map(ServerOutcome::export_rows).collect()
    }
}
