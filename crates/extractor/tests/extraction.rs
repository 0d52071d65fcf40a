use atlas_extractor::{DiscoveryConfig, Extractor};
use atlas_model::{CapabilityKind, RepositorySnapshot, ServerIdentity, SnapshotEntry};
use pretty_assertions::assert_eq;

fn extractor() -> Extractor {
    Extractor::new(DiscoveryConfig::default()).expect("default config is valid")
}

fn names(snapshot: &RepositorySnapshot) -> Vec<(CapabilityKind, String)> {
    extractor()
        .extract(&ServerIdentity::new("test-server"), snapshot)
        .records
        .into_iter()
        .map(|r| (r.kind, r.name))
        .collect()
}

#[test]
fn registration_call_yields_one_tool() {
    let snapshot = RepositorySnapshot::from_files([(
        "src/index.ts",
        r#"
import { McpServer } from "@modelcontextprotocol/sdk/server/mcp.js";
const server = new McpServer({ name: "memory", version: "1.0.0" });

server.tool(
  "create_entities",
  "Create multiple new entities in the knowledge graph",
  { entities: z.array(EntitySchema) },
  async ({ entities }) => ({ content: [] }),
);
"#,
    )]);

    let found = extractor().extract(&ServerIdentity::new("memory"), &snapshot);
    assert_eq!(found.records.len(), 1);
    let record = &found.records[0];
    assert_eq!(record.kind, CapabilityKind::Tool);
    assert_eq!(record.name, "create_entities");
    assert_eq!(
        record.description,
        "Create multiple new entities in the knowledge graph"
    );
    assert_eq!(record.parameters_count, 1);
    assert_eq!(found.stats.candidates, 1);
    assert_eq!(found.frameworks, vec!["MCP TypeScript SDK"]);
}

#[test]
fn constant_array_of_nine_objects_yields_nine_tools() {
    let elements: String = (1..=9)
        .map(|i| format!("  {{ name: \"tool_{i}\", description: \"Tool number {i}\" }},\n"))
        .collect();
    let source = format!("const TOOLS = [\n{elements}];\n");
    let snapshot = RepositorySnapshot::from_files([("src/tools.js", source)]);

    let found = extractor().extract(&ServerIdentity::new("nine"), &snapshot);
    assert_eq!(found.stats.candidates, 9);
    assert_eq!(found.records.len(), 9);
    assert!(found
        .records
        .iter()
        .all(|r| r.kind == CapabilityKind::Tool && r.source_matcher == "constant_table"));
    assert_eq!(found.records[8].description, "Tool number 9");
}

#[test]
fn strongest_matcher_wins_the_merge() {
    let snapshot = RepositorySnapshot::from_files([(
        "src/index.ts",
        r#"
export const memoryTools = [
  { name: "create_entities", description: "Exported definition with a much longer description text" },
];

server.tool("create_entities", "Create multiple new entities in the knowledge graph", {}, handler);
"#,
    )]);

    let found = extractor().extract(&ServerIdentity::new("memory"), &snapshot);
    assert_eq!(found.records.len(), 1);
    assert_eq!(found.records[0].confidence, 0.9);
    assert_eq!(
        found.records[0].description,
        "Create multiple new entities in the knowledge graph"
    );
    assert!(found.stats.per_matcher.contains_key("export_pattern"));
}

#[test]
fn unterminated_call_does_not_block_the_rest_of_the_file() {
    let snapshot = RepositorySnapshot::from_files([(
        "src/index.ts",
        r#"
server.tool("read_graph", "Read the entire knowledge graph", {}, readGraph);
server.tool("search_nodes", "Search for nodes", { query: z.string() }, searchNodes);
server.tool("broken", "Never closed", {
"#,
    )]);

    let found = extractor().extract(&ServerIdentity::new("memory"), &snapshot);
    assert_eq!(
        found
            .records
            .iter()
            .map(|r| r.name.as_str())
            .collect::<Vec<_>>(),
        vec!["read_graph", "search_nodes"]
    );
    assert_eq!(found.stats.malformed_candidates, 1);
}

#[test]
fn empty_and_unmatched_snapshots_are_not_errors() {
    assert!(names(&RepositorySnapshot::new()).is_empty());

    let plain = RepositorySnapshot::from_files([
        ("src/util.ts", "export function add(a: number, b: number) { return a + b; }"),
        ("README.md", "# Utilities\n\nNothing to see here.\n"),
    ]);
    assert!(names(&plain).is_empty());
}

#[test]
fn mixed_ecosystems() {
    let snapshot = RepositorySnapshot::from_files([
        (
            "server.py",
            r#"
from mcp.server.fastmcp import FastMCP

mcp = FastMCP("weather")

@mcp.tool()
async def get_forecast(latitude: float, longitude: float) -> str:
    """Get weather forecast for a location."""
    return ""

@mcp.prompt()
def summarize(text: str) -> str:
    """Summarize text."""
    return text
"#,
        ),
        (
            "main.go",
            r#"
package main

func main() {
	s := server.NewMCPServer("k8s", "1.0.0")
	listPods := mcp.NewTool("list_pods",
		mcp.WithDescription("List pods in a namespace"),
		mcp.WithString("namespace", mcp.Required()),
	)
	s.AddTool(listPods, handleListPods)
}
"#,
        ),
    ]);

    let found = extractor().extract(&ServerIdentity::new("mixed"), &snapshot);
    let rows: Vec<_> = found
        .records
        .iter()
        .map(|r| (r.kind, r.name.as_str(), r.parameters_count))
        .collect();
    assert_eq!(
        rows,
        vec![
            (CapabilityKind::Tool, "get_forecast", 2),
            (CapabilityKind::Tool, "list_pods", 1),
            (CapabilityKind::Prompt, "summarize", 1),
        ]
    );
    assert_eq!(found.frameworks, vec!["FastMCP", "MCP Python SDK"]);
}

#[test]
fn extraction_is_deterministic_across_entry_order() {
    let files = vec![
        SnapshotEntry::new(
            "src/a.ts",
            "server.tool(\"shared\", \"From a\", {}, h);\nserver.prompt(\"p\", \"A prompt\", {}, h);",
        ),
        SnapshotEntry::new("src/b.ts", "server.tool(\"shared\", \"From b\", {}, h);"),
        SnapshotEntry::new(
            "lib/c.py",
            "@mcp.resource(\"config://app\")\ndef app_config() -> str:\n    \"\"\"App config.\"\"\"\n",
        ),
    ];
    let forward = RepositorySnapshot::from_entries(files.clone());
    let backward = RepositorySnapshot::from_entries(files.into_iter().rev().collect());

    let server = ServerIdentity::new("det");
    let a = extractor().extract(&server, &forward);
    let b = extractor().extract(&server, &backward);

    assert_eq!(
        serde_json::to_string(&a.records).unwrap(),
        serde_json::to_string(&b.records).unwrap()
    );
    let shared = a.records.iter().find(|r| r.name == "shared").unwrap();
    assert_eq!(shared.source_file, "src/a.ts");
    assert_eq!(
        a.records
            .iter()
            .find(|r| r.kind == CapabilityKind::Resource)
            .and_then(|r| r.uri.as_deref()),
        Some("config://app")
    );
}
