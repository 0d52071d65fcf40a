use crate::error::{Result, StoreError};
use crate::schema::{Constraint, NodeLabel, RelType};
use crate::store::GraphStore;
use crate::types::{GraphStatistics, IngestResult, NodeKey, NodeUpsert, Properties, WriteBatch};
use atlas_model::ServerIdentity;
use async_trait::async_trait;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct StoredNode {
    key: NodeKey,
    properties: Properties,
}

#[derive(Debug, Clone)]
struct StoredEdge {
    rel: RelType,
    properties: Properties,
}

#[derive(Debug, Default)]
struct MemoryGraph {
    graph: DiGraph<StoredNode, StoredEdge>,
    index: HashMap<NodeKey, NodeIndex>,
    constraints: BTreeSet<NodeLabel>,
}

/// In-process [`GraphStore`] over a petgraph directed graph.
///
/// Nodes are indexed by [`NodeKey`], so the uniqueness constraints hold by
/// construction. A batch is fully validated before anything is applied.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    inner: Mutex<MemoryGraph>,
    injected_failures: Mutex<HashMap<ServerIdentity, usize>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` commits for `server` with a transient error
    #[cfg(any(test, feature = "testing"))]
    pub fn fail_transiently(&self, server: &ServerIdentity, times: usize) {
        if let Ok(mut failures) = self.injected_failures.lock() {
            failures.insert(server.clone(), times);
        }
    }

    pub fn node(&self, key: &NodeKey) -> Option<Properties> {
        let graph = self.graph().ok()?;
        let idx = graph.index.get(key)?;
        Some(graph.graph[*idx].properties.clone())
    }

    pub fn node_count(&self) -> usize {
        self.graph().map(|g| g.graph.node_count()).unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.graph().map(|g| g.graph.edge_count()).unwrap_or(0)
    }

    /// Every node key, sorted
    pub fn node_keys(&self) -> Vec<NodeKey> {
        let Ok(graph) = self.graph() else {
            return Vec::new();
        };
        let mut keys: Vec<NodeKey> = graph.index.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Every `(from, rel, to)` triple, sorted
    pub fn edge_triples(&self) -> Vec<(NodeKey, RelType, NodeKey)> {
        let Ok(graph) = self.graph() else {
            return Vec::new();
        };
        let mut triples: Vec<_> = graph
            .graph
            .edge_references()
            .map(|e| {
                (
                    graph.graph[e.source()].key.clone(),
                    e.weight().rel,
                    graph.graph[e.target()].key.clone(),
                )
            })
            .collect();
        triples.sort();
        triples
    }

    /// Targets of outgoing `rel` edges from `key`, sorted
    pub fn outgoing(&self, key: &NodeKey, rel: RelType) -> Vec<NodeKey> {
        let Ok(graph) = self.graph() else {
            return Vec::new();
        };
        let Some(&idx) = graph.index.get(key) else {
            return Vec::new();
        };
        let mut targets: Vec<NodeKey> = graph
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .filter(|e| e.weight().rel == rel)
            .map(|e| graph.graph[e.target()].key.clone())
            .collect();
        targets.sort();
        targets
    }

    /// Properties of the `rel` edge between two nodes
    pub fn edge(&self, from: &NodeKey, rel: RelType, to: &NodeKey) -> Option<Properties> {
        let graph = self.graph().ok()?;
        let a = *graph.index.get(from)?;
        let b = *graph.index.get(to)?;
        graph
            .graph
            .edges_connecting(a, b)
            .find(|e| e.weight().rel == rel)
            .map(|e| e.weight().properties.clone())
    }

    pub fn constrained_labels(&self) -> Vec<NodeLabel> {
        self.graph()
            .map(|g| g.constraints.iter().copied().collect())
            .unwrap_or_default()
    }

    fn graph(&self) -> Result<MutexGuard<'_, MemoryGraph>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory graph lock poisoned".into()))
    }

    fn take_injected_failure(&self, server: &ServerIdentity) -> bool {
        let Ok(mut failures) = self.injected_failures.lock() else {
            return false;
        };
        match failures.get_mut(server) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl MemoryGraph {
    fn validate(&self, batch: &WriteBatch) -> Result<()> {
        for node in &batch.nodes {
            if let Some(&idx) = self.index.get(&node.key) {
                check_identity(&self.graph[idx], node)?;
            }
        }
        for edge in &batch.edges {
            for endpoint in [&edge.from, &edge.to] {
                let known = self.index.contains_key(endpoint)
                    || batch.nodes.iter().any(|n| &n.key == endpoint);
                if !known {
                    return Err(StoreError::MissingEndpoint {
                        rel: edge.rel.to_string(),
                        key: endpoint.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Infallible once `validate` has passed
    fn apply(&mut self, batch: &WriteBatch) -> IngestResult {
        let mut result = IngestResult::default();

        for node in &batch.nodes {
            match self.index.get(&node.key) {
                Some(&idx) => {
                    let stored = &mut self.graph[idx];
                    stored.properties.extend(node.properties.clone());
                    for (name, value) in &node.identity {
                        stored
                            .properties
                            .entry(name.clone())
                            .or_insert_with(|| value.clone());
                    }
                    result.nodes_updated += 1;
                }
                None => {
                    let mut properties = node.key.properties();
                    properties.extend(node.identity.clone());
                    properties.extend(node.properties.clone());
                    let idx = self.graph.add_node(StoredNode {
                        key: node.key.clone(),
                        properties,
                    });
                    self.index.insert(node.key.clone(), idx);
                    result.nodes_created += 1;
                }
            }
        }

        for edge in &batch.edges {
            let (Some(&a), Some(&b)) = (self.index.get(&edge.from), self.index.get(&edge.to))
            else {
                continue;
            };
            let existing = self
                .graph
                .edges_connecting(a, b)
                .find(|e| e.weight().rel == edge.rel)
                .map(|e| e.id());
            match existing {
                Some(id) => {
                    self.graph[id].properties.extend(edge.properties.clone());
                    result.edges_updated += 1;
                }
                None => {
                    self.graph.add_edge(
                        a,
                        b,
                        StoredEdge {
                            rel: edge.rel,
                            properties: edge.properties.clone(),
                        },
                    );
                    result.edges_created += 1;
                }
            }
        }

        result
    }
}

fn check_identity(stored: &StoredNode, upsert: &NodeUpsert) -> Result<()> {
    for (name, value) in &upsert.identity {
        if let Some(current) = stored.properties.get(name) {
            if current != value {
                return Err(StoreError::ConstraintConflict {
                    key: upsert.key.to_string(),
                    reason: format!("{name} is {current}, write claims {value}"),
                });
            }
        }
    }
    Ok(())
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn ensure_constraints(&self, constraints: &[Constraint]) -> Result<()> {
        let mut graph = self.graph()?;
        graph.constraints.extend(constraints.iter().map(|c| c.label));
        Ok(())
    }

    async fn commit(&self, batch: &WriteBatch) -> Result<IngestResult> {
        if self.take_injected_failure(&batch.server) {
            return Err(StoreError::Transient(format!(
                "injected failure for {}",
                batch.server
            )));
        }
        let mut graph = self.graph()?;
        graph.validate(batch)?;
        Ok(graph.apply(batch))
    }

    async fn statistics(&self) -> Result<GraphStatistics> {
        let graph = self.graph()?;
        let mut stats = GraphStatistics::default();
        for node in graph.graph.node_weights() {
            *stats
                .nodes
                .entry(node.key.label.as_str().to_string())
                .or_insert(0) += 1;
        }
        for edge in graph.graph.edge_weights() {
            *stats
                .relationships
                .entry(edge.rel.as_str().to_string())
                .or_insert(0) += 1;
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EdgeUpsert;
    use pretty_assertions::assert_eq;

    fn server_batch(name: &str) -> WriteBatch {
        let server = ServerIdentity::new(name);
        let mut batch = WriteBatch::new(server.clone());
        batch.upsert_node(NodeUpsert::new(NodeKey::server(&server)).set("description", "x"));
        batch
    }

    #[tokio::test]
    async fn missing_endpoint_rejects_whole_batch() {
        let store = MemoryGraphStore::new();
        let mut batch = server_batch("a");
        batch.upsert_edge(EdgeUpsert::new(
            NodeKey::server(&batch.server),
            RelType::UsesFramework,
            NodeKey::named(NodeLabel::Framework, "FastMCP"),
        ));

        let err = store.commit(&batch).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingEndpoint { .. }));
        assert_eq!(store.node_count(), 0);
    }

    #[tokio::test]
    async fn update_keeps_absent_properties() {
        let store = MemoryGraphStore::new();
        store.commit(&server_batch("a")).await.unwrap();

        let key = NodeKey::server(&ServerIdentity::new("a"));
        let mut second = WriteBatch::new(ServerIdentity::new("a"));
        second.upsert_node(NodeUpsert::new(key.clone()).set("tools_count", 3));
        let result = store.commit(&second).await.unwrap();

        assert_eq!(result.nodes_updated, 1);
        let props = store.node(&key).unwrap();
        assert_eq!(props["description"], "x");
        assert_eq!(props["tools_count"], 3);
        assert_eq!(props["name"], "a");
    }

    #[tokio::test]
    async fn injected_failures_are_transient_and_run_out() {
        let store = MemoryGraphStore::new();
        let batch = server_batch("flaky");
        store.fail_transiently(&batch.server, 1);

        assert!(store.commit(&batch).await.unwrap_err().is_retryable());
        assert_eq!(store.commit(&batch).await.unwrap().nodes_created, 1);
    }
}
