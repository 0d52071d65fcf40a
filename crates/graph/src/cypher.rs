//! Rendering of write batches as parameterised Cypher, for executing
//! against a Neo4j-compatible store outside this crate.

use crate::schema::{constraints, NodeLabel};
use crate::types::{EdgeUpsert, NodeKey, NodeUpsert, WriteBatch};
use serde::Serialize;
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CypherStatement {
    pub query: String,
    pub params: Value,
}

/// `CREATE CONSTRAINT ... IF NOT EXISTS` for every label
pub fn constraint_statements() -> Vec<String> {
    constraints().iter().map(|c| c.to_cypher()).collect()
}

/// Nodes first, then edges; run inside one transaction per batch.
pub fn render_batch(batch: &WriteBatch) -> Vec<CypherStatement> {
    batch
        .nodes
        .iter()
        .map(render_node)
        .chain(batch.edges.iter().map(render_edge))
        .collect()
}

fn key_pattern(var: &str, label: NodeLabel, param: &str) -> String {
    let fields = label
        .key_properties()
        .iter()
        .map(|p| format!("{p}: ${param}.{p}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("({var}:{label} {{{fields}}})")
}

fn key_params(key: &NodeKey) -> Value {
    Value::Object(key.properties().into_iter().collect())
}

fn render_node(node: &NodeUpsert) -> CypherStatement {
    let mut query = format!("MERGE {}", key_pattern("n", node.key.label, "key"));
    if !node.identity.is_empty() {
        query.push_str(" ON CREATE SET n += $identity");
    }
    query.push_str(" SET n += $props");
    CypherStatement {
        query,
        params: json!({
            "key": key_params(&node.key),
            "identity": node.identity,
            "props": node.properties,
        }),
    }
}

fn render_edge(edge: &EdgeUpsert) -> CypherStatement {
    let query = format!(
        "MATCH {} MATCH {} MERGE (a)-[r:{}]->(b) SET r += $props",
        key_pattern("a", edge.from.label, "from"),
        key_pattern("b", edge.to.label, "to"),
        edge.rel
    );
    CypherStatement {
        query,
        params: json!({
            "from": key_params(&edge.from),
            "to": key_params(&edge.to),
            "props": edge.properties,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RelType;
    use atlas_model::{CapabilityKind, ServerIdentity};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_merge_statements() {
        let server = ServerIdentity::new("memory");
        let tool = NodeKey::capability(CapabilityKind::Tool, "read_graph", &server);
        let mut batch = WriteBatch::new(server.clone());
        batch.upsert_node(NodeUpsert::new(NodeKey::server(&server)));
        batch.upsert_node(NodeUpsert::new(tool.clone()).set("parameters_count", 0));
        batch.upsert_edge(EdgeUpsert::new(
            NodeKey::server(&server),
            RelType::ProvidesTool,
            tool,
        ));

        let statements = render_batch(&batch);
        assert_eq!(statements.len(), 3);
        assert_eq!(
            statements[1].query,
            "MERGE (n:Tool {name: $key.name, server_name: $key.server_name}) SET n += $props"
        );
        assert_eq!(statements[1].params["key"]["server_name"], "memory");
        assert_eq!(
            statements[2].query,
            "MATCH (a:MCPServer {name: $from.name}) \
             MATCH (b:Tool {name: $to.name, server_name: $to.server_name}) \
             MERGE (a)-[r:PROVIDES_TOOL]->(b) SET r += $props"
        );
    }

    #[test]
    fn identity_only_set_on_create() {
        let repo = NodeUpsert::new(NodeKey::named(NodeLabel::Repository, "https://x/y"))
            .identity("owner", "x");
        let statement = render_node(&repo);
        assert!(statement.query.contains("ON CREATE SET n += $identity"));
        assert_eq!(statement.params["identity"]["owner"], "x");
        assert_eq!(constraint_statements().len(), NodeLabel::ALL.len());
    }
}
