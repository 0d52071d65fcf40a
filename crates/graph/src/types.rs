use crate::schema::{NodeLabel, RelType};
use atlas_model::{CapabilityKind, ServerIdentity};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub type Properties = BTreeMap<String, Value>;

/// Identity of one graph node: its label plus the values of the label's key
/// properties, in [`NodeLabel::key_properties`] order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub values: Vec<String>,
}

impl NodeKey {
    pub fn new<I, S>(label: NodeLabel, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            label,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Key of a single-property label (`Category`, `Language`, ...)
    pub fn named(label: NodeLabel, name: impl Into<String>) -> Self {
        Self::new(label, [name.into()])
    }

    pub fn server(server: &ServerIdentity) -> Self {
        Self::named(NodeLabel::McpServer, server.as_str())
    }

    pub fn capability(kind: CapabilityKind, name: &str, server: &ServerIdentity) -> Self {
        Self::new(NodeLabel::for_kind(kind), [name, server.as_str()])
    }

    /// Key properties as a property map
    pub fn properties(&self) -> Properties {
        self.label
            .key_properties()
            .iter()
            .zip(&self.values)
            .map(|(k, v)| ((*k).to_string(), Value::String(v.clone())))
            .collect()
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.values.join(", "))
    }
}

/// Conditional create-or-update of one node.
///
/// `properties` overwrite what is stored; keys missing here are left alone.
/// `identity` properties must agree with an existing node's values, else the
/// write is a constraint conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeUpsert {
    pub key: NodeKey,
    pub properties: Properties,
    pub identity: Properties,
}

impl NodeUpsert {
    pub fn new(key: NodeKey) -> Self {
        Self {
            key,
            properties: Properties::new(),
            identity: Properties::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }

    /// Set only when a value is present
    #[must_use]
    pub fn set_opt<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(name, value),
            None => self,
        }
    }

    #[must_use]
    pub fn identity(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.identity.insert(name.to_string(), value.into());
        self
    }
}

/// Conditional create-or-update of one typed edge between two keyed nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeUpsert {
    pub from: NodeKey,
    pub rel: RelType,
    pub to: NodeKey,
    pub properties: Properties,
}

impl EdgeUpsert {
    pub fn new(from: NodeKey, rel: RelType, to: NodeKey) -> Self {
        Self {
            from,
            rel,
            to,
            properties: Properties::new(),
        }
    }

    #[must_use]
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.properties.insert(name.to_string(), value.into());
        self
    }
}

/// Every write belonging to one server; committed as a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch {
    pub server: ServerIdentity,
    pub nodes: Vec<NodeUpsert>,
    pub edges: Vec<EdgeUpsert>,
}

impl WriteBatch {
    pub fn new(server: ServerIdentity) -> Self {
        Self {
            server,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node; a second upsert of the same key folds into the first
    pub fn upsert_node(&mut self, node: NodeUpsert) {
        match self.nodes.iter_mut().find(|n| n.key == node.key) {
            Some(existing) => {
                existing.properties.extend(node.properties);
                existing.identity.extend(node.identity);
            }
            None => self.nodes.push(node),
        }
    }

    /// Add an edge; a repeated `(from, rel, to)` refreshes its properties
    pub fn upsert_edge(&mut self, edge: EdgeUpsert) {
        match self
            .edges
            .iter_mut()
            .find(|e| e.rel == edge.rel && e.from == edge.from && e.to == edge.to)
        {
            Some(existing) => existing.properties.extend(edge.properties),
            None => self.edges.push(edge),
        }
    }

    /// Every node key the batch touches, sorted and deduplicated; the
    /// acquisition order for per-key locks
    pub fn lock_keys(&self) -> Vec<NodeKey> {
        let mut keys: Vec<NodeKey> = self
            .nodes
            .iter()
            .map(|n| n.key.clone())
            .chain(
                self.edges
                    .iter()
                    .flat_map(|e| [e.from.clone(), e.to.clone()]),
            )
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestResult {
    pub nodes_created: usize,
    pub nodes_updated: usize,
    pub edges_created: usize,
    pub edges_updated: usize,
}

impl IngestResult {
    pub fn merge(&mut self, other: &IngestResult) {
        self.nodes_created += other.nodes_created;
        self.nodes_updated += other.nodes_updated;
        self.edges_created += other.edges_created;
        self.edges_updated += other.edges_updated;
    }
}

/// Cumulative graph statistics: node counts per label and relationship
/// counts per type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub nodes: BTreeMap<String, usize>,
    pub relationships: BTreeMap<String, usize>,
}

impl GraphStatistics {
    pub fn node_count(&self, label: NodeLabel) -> usize {
        self.nodes.get(label.as_str()).copied().unwrap_or(0)
    }

    pub fn relationship_count(&self, rel: RelType) -> usize {
        self.relationships.get(rel.as_str()).copied().unwrap_or(0)
    }

    pub fn total_nodes(&self) -> usize {
        self.nodes.values().sum()
    }

    pub fn total_relationships(&self) -> usize {
        self.relationships.values().sum()
    }
}

/// Lifecycle of one server's ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum IngestState {
    Pending,
    InProgress,
    Committed,
    RolledBack(String),
}

impl IngestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack(_))
    }

    /// `Pending -> InProgress`; any other state is kept
    #[must_use]
    pub fn begin(self) -> Self {
        match self {
            Self::Pending => Self::InProgress,
            other => other,
        }
    }

    /// `InProgress -> Committed | RolledBack`
    #[must_use]
    pub fn finish(self, outcome: std::result::Result<(), String>) -> Self {
        match (self, outcome) {
            (Self::InProgress, Ok(())) => Self::Committed,
            (Self::InProgress, Err(reason)) => Self::RolledBack(reason),
            (other, _) => other,
        }
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::InProgress => f.write_str("in progress"),
            Self::Committed => f.write_str("committed"),
            Self::RolledBack(reason) => write!(f, "rolled back: {reason}"),
        }
    }
}
