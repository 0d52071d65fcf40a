use async_trait::async_trait;
use atlas_graph::{
    Constraint, GraphStatistics, GraphStore, IngestResult, IngestState, MemoryGraphStore, NodeKey,
    NodeLabel, RelType, WriteBatch,
};
use atlas_model::{
    CapabilityKind, RepositoryInfo, RepositorySnapshot, ServerIdentity, ServerProfile,
};
use atlas_pipeline::{Pipeline, PipelineConfig, RetryPolicy, ServerInput};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> PipelineConfig {
    PipelineConfig {
        concurrency: 4,
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        ..Default::default()
    }
}

fn memory_server() -> ServerInput {
    ServerInput::new(
        ServerProfile::new("memory")
            .with_description("Knowledge graph based persistent memory")
            .with_topics(["knowledge-graph", "memory"]),
        RepositorySnapshot::from_files([(
            "src/index.ts",
            r#"
import { McpServer } from "@modelcontextprotocol/sdk/server/mcp.js";
server.tool("create_entities", "Create multiple new entities in the knowledge graph", { entities: z.array(Entity) }, h);
server.tool("read_graph", "Read the entire knowledge graph", {}, h);
"#,
        )]),
    )
}

fn postgres_server() -> ServerInput {
    ServerInput::new(
        ServerProfile::new("postgres")
            .with_description("Read-only database access: run SQL query against PostgreSQL"),
        RepositorySnapshot::from_files([(
            "server.py",
            r#"
from mcp.server.fastmcp import FastMCP
mcp = FastMCP("postgres")

@mcp.tool()
def query(sql: str) -> str:
    """Run a read-only SQL query."""
    return ""
"#,
        )]),
    )
}

fn helper_server() -> ServerInput {
    ServerInput::new(
        ServerProfile::new("helper").with_description("A friendly little helper"),
        RepositorySnapshot::new(),
    )
}

fn inputs() -> Vec<ServerInput> {
    vec![memory_server(), postgres_server(), helper_server()]
}

fn pipeline(config: PipelineConfig) -> (Arc<MemoryGraphStore>, Pipeline) {
    let store = Arc::new(MemoryGraphStore::new());
    let pipeline = Pipeline::new(config, store.clone()).expect("valid config");
    (store, pipeline)
}

#[tokio::test]
async fn end_to_end_run() {
    init_logging();
    let (store, pipeline) = pipeline(config());
    let summary = pipeline.run(inputs()).await.unwrap();

    let servers: Vec<&str> = summary.outcomes.iter().map(|o| o.server.as_str()).collect();
    assert_eq!(servers, vec!["helper", "memory", "postgres"]);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.records, 3);

    let memory = summary.outcome("memory").unwrap();
    assert_eq!(memory.state, IngestState::Committed);
    assert_eq!(memory.records.len(), 2);
    assert_eq!(memory.categories[0].category, "memory");

    let postgres = summary.outcome("postgres").unwrap();
    assert_eq!(postgres.categories[0].category, "database");
    assert!(postgres.categories[0].confidence > 0.0 && postgres.categories[0].confidence <= 1.0);

    // zero capabilities and no category is still a success
    let helper = summary.outcome("helper").unwrap();
    assert!(helper.is_success());
    assert!(helper.records.is_empty());
    assert!(helper.categories.is_empty());

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.node_count(NodeLabel::McpServer), 3);
    assert_eq!(stats.node_count(NodeLabel::Tool), 3);
    assert_eq!(stats.relationship_count(RelType::ProvidesTool), 3);
    assert_eq!(stats.node_count(NodeLabel::Framework), 3);
    assert_eq!(summary.graph.as_ref(), Some(&stats));

    let server = NodeKey::server(&ServerIdentity::new("postgres"));
    let python = NodeKey::named(NodeLabel::Language, "Python");
    let implemented = store.edge(&server, RelType::ImplementedIn, &python).unwrap();
    assert_eq!(implemented["percentage"], 100.0);

    let rows = summary.export_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].server_name, "memory");
    assert_eq!(rows[0].kind, CapabilityKind::Tool);
}

#[tokio::test]
async fn graph_state_is_independent_of_input_order() {
    let (forward_store, forward) = pipeline(config());
    forward.run(inputs()).await.unwrap();

    let (backward_store, backward) = pipeline(PipelineConfig {
        concurrency: 1,
        ..config()
    });
    backward
        .run(inputs().into_iter().rev().collect())
        .await
        .unwrap();

    assert_eq!(forward_store.node_keys(), backward_store.node_keys());
    assert_eq!(forward_store.edge_triples(), backward_store.edge_triples());
}

#[tokio::test]
async fn rerunning_is_idempotent() {
    let (store, pipeline) = pipeline(config());
    pipeline.run(inputs()).await.unwrap();
    let first = (store.node_count(), store.edge_count());

    let summary = pipeline.run(inputs()).await.unwrap();
    assert_eq!((store.node_count(), store.edge_count()), first);
    assert_eq!(summary.totals.nodes_created, 0);
    assert_eq!(summary.totals.edges_created, 0);
}

#[tokio::test]
async fn max_servers_bounds_scheduling() {
    let (store, pipeline) = pipeline(PipelineConfig {
        max_servers: Some(2),
        ..config()
    });
    let summary = pipeline.run(inputs()).await.unwrap();

    assert_eq!(summary.outcomes.len(), 2);
    assert_eq!(summary.servers_skipped, 1);
    assert!(summary.outcome("helper").is_none());
    assert_eq!(store.statistics().await.unwrap().node_count(NodeLabel::McpServer), 2);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let (store, pipeline) = pipeline(config());
    store.fail_transiently(&ServerIdentity::new("memory"), 2);

    let summary = pipeline.run(inputs()).await.unwrap();
    let memory = summary.outcome("memory").unwrap();
    assert!(memory.is_success());
    assert_eq!(memory.attempts, 3);
    assert_eq!(summary.outcome("postgres").unwrap().attempts, 1);
}

#[tokio::test]
async fn exhausted_retries_fail_only_that_server() {
    let (store, pipeline) = pipeline(config());
    store.fail_transiently(&ServerIdentity::new("memory"), 10);

    let summary = pipeline.run(inputs()).await.unwrap();
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let memory = summary.outcome("memory").unwrap();
    assert!(matches!(memory.state, IngestState::RolledBack(_)));
    assert_eq!(memory.attempts, 3);
    assert!(memory.ingest.is_none());
    assert!(store
        .node(&NodeKey::server(&ServerIdentity::new("memory")))
        .is_none());
}

/// Panics while committing one server's batch, delegates everything else.
struct PanickingStore {
    inner: MemoryGraphStore,
    server: ServerIdentity,
}

#[async_trait]
impl GraphStore for PanickingStore {
    async fn ensure_constraints(&self, constraints: &[Constraint]) -> atlas_graph::Result<()> {
        self.inner.ensure_constraints(constraints).await
    }

    async fn commit(&self, batch: &WriteBatch) -> atlas_graph::Result<IngestResult> {
        if batch.server == self.server {
            panic!("store blew up on {}", batch.server);
        }
        self.inner.commit(batch).await
    }

    async fn statistics(&self) -> atlas_graph::Result<GraphStatistics> {
        self.inner.statistics().await
    }
}

#[tokio::test]
async fn panicking_commit_fails_only_that_server() {
    init_logging();
    let store = Arc::new(PanickingStore {
        inner: MemoryGraphStore::new(),
        server: ServerIdentity::new("postgres"),
    });
    let pipeline = Pipeline::new(config(), store.clone()).expect("valid config");

    let summary = pipeline.run(inputs()).await.unwrap();
    assert_eq!(summary.outcomes.len(), 3);
    assert_eq!(summary.succeeded, 2);
    assert_eq!(summary.failed, 1);

    let postgres = summary.outcome("postgres").unwrap();
    assert!(matches!(postgres.state, IngestState::RolledBack(_)));
    assert!(postgres.error.as_deref().unwrap().contains("worker task failed"));
    assert!(postgres.ingest.is_none());

    assert!(summary.outcome("memory").unwrap().is_success());
    assert!(summary.outcome("helper").unwrap().is_success());
    assert!(store
        .inner
        .node(&NodeKey::server(&ServerIdentity::new("memory")))
        .is_some());
    assert!(store
        .inner
        .node(&NodeKey::server(&ServerIdentity::new("postgres")))
        .is_none());
}

#[tokio::test]
async fn repository_conflict_is_reported_per_server() {
    let repo = |owner: &str| RepositoryInfo {
        url: "https://github.com/example/servers".into(),
        owner: owner.into(),
        name: "servers".into(),
        ..Default::default()
    };
    let first = ServerInput::new(
        ServerProfile::new("a").with_repository(repo("example")),
        RepositorySnapshot::new(),
    );
    let second = ServerInput::new(
        ServerProfile::new("b").with_repository(repo("impostor")),
        RepositorySnapshot::new(),
    );

    let (_, pipeline) = pipeline(config());
    assert_eq!(pipeline.run(vec![first]).await.unwrap().succeeded, 1);
    let summary = pipeline.run(vec![second, helper_server()]).await.unwrap();

    assert_eq!(summary.succeeded, 1);
    let failed: Vec<&str> = summary.failures().map(|o| o.server.as_str()).collect();
    assert_eq!(failed, vec!["b"]);
    let b = summary.outcome("b").unwrap();
    assert!(b.error.as_deref().unwrap_or_default().contains("constraint conflict"));
    // conflicts are not retried
    assert_eq!(b.attempts, 1);
}

#[tokio::test]
async fn disabled_stages_still_ingest_the_server() {
    let (store, pipeline) = pipeline(PipelineConfig {
        extraction_enabled: false,
        classification_enabled: false,
        ..config()
    });
    let summary = pipeline.run(inputs()).await.unwrap();

    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.records, 0);
    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.node_count(NodeLabel::McpServer), 3);
    assert_eq!(stats.node_count(NodeLabel::Tool), 0);
    assert_eq!(stats.relationship_count(RelType::BelongsToCategory), 0);
}

#[tokio::test]
async fn snapshot_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(
        dir.path().join("src/main.go"),
        "package main\n\nvar t = mcp.NewTool(\"get_time\", mcp.WithDescription(\"Current time\"), mcp.WithString(\"zone\"))\n",
    )
    .unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/x")).unwrap();
    std::fs::write(
        dir.path().join("node_modules/x/index.js"),
        "server.tool(\"ignored\", \"Vendored\", {}, h);",
    )
    .unwrap();

    let snapshot = RepositorySnapshot::from_dir(dir.path()).unwrap();
    let (_, pipeline) = pipeline(config());
    let summary = pipeline
        .run(vec![ServerInput::new(ServerProfile::new("clock"), snapshot)])
        .await
        .unwrap();

    let clock = summary.outcome("clock").unwrap();
    let names: Vec<(&str, usize)> = clock
        .records
        .iter()
        .map(|r| (r.name.as_str(), r.parameters_count))
        .collect();
    assert_eq!(names, vec![("get_time", 1)]);
    assert_eq!(clock.categories[0].category, "time");
}
