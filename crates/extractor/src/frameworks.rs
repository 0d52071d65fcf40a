use atlas_model::RepositorySnapshot;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Manifests read in addition to discovered source files
const MANIFESTS: [&str; 9] = [
    "package.json",
    "pyproject.toml",
    "requirements.txt",
    "setup.py",
    "go.mod",
    "Cargo.toml",
    "pom.xml",
    "build.gradle",
    "build.gradle.kts",
];

static MARKERS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("MCP TypeScript SDK", r"@modelcontextprotocol/sdk"),
        ("FastMCP", r"\bfastmcp\b|\bFastMCP\b"),
        ("MCP Python SDK", r"\bmcp\.server\b|^\s*mcp\s*[>=~]|from\s+mcp\s+import"),
        ("mcp-go", r"mark3labs/mcp-go"),
        ("mcp-golang", r"metoro-io/mcp-golang"),
        ("rmcp", r"\brmcp\b"),
        ("MCP C# SDK", r"\bModelContextProtocol\b"),
        ("MCP Java SDK", r"io\.modelcontextprotocol"),
    ]
    .into_iter()
    .map(|(name, pattern)| {
        let re = Regex::new(&format!("(?m){pattern}")).expect("valid regex");
        (name, re)
    })
    .collect()
});

/// Names of the SDKs a source tree depends on, sorted
pub fn detect_frameworks<'t>(
    snapshot: &RepositorySnapshot,
    sources: impl IntoIterator<Item = &'t str>,
) -> Vec<String> {
    let manifests = snapshot.entries().iter().filter_map(|entry| {
        let file_name = entry.path.rsplit('/').next().unwrap_or(&entry.path);
        let is_manifest = MANIFESTS.contains(&file_name) || file_name.ends_with(".csproj");
        is_manifest.then(|| entry.text().ok()).flatten()
    });

    let mut found = BTreeSet::new();
    let mut scan = |text: &str| {
        for (name, re) in MARKERS.iter() {
            if !found.contains(*name) && re.is_match(text) {
                found.insert(*name);
            }
        }
    };
    manifests.for_each(&mut scan);
    sources.into_iter().for_each(&mut scan);
    found.into_iter().map(String::from).collect()
}
