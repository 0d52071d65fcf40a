use super::decl::{constructor_call, constructor_info, object_span, read_object};
use super::{CapabilityMatcher, Extraction, SourceFile};
use crate::ecosystem::Ecosystem;
use crate::lexer::Piece;
use crate::resolve::is_path;
use atlas_model::{CapabilityKind, Confidence};
use once_cell::sync::Lazy;
use regex::Regex;

static TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:(?P<ident>[A-Za-z_$][\w$]*)\s*(?::\s*(?P<ty>[A-Za-z_$][\w$.<>\[\] ]*?))?\s*[=:]|\breturn)\s*\[",
    )
    .expect("valid regex")
});

const TABLE_SUFFIXES: [&str; 4] = ["tools", "prompts", "resources", "templates"];

/// Literal arrays of capability definitions: `const TOOLS: Tool[] = [...]`,
/// `tools: [...]` inside a list handler, Python `return [types.Tool(...)]`
pub struct ConstantTableMatcher;

impl ConstantTableMatcher {
    pub const ID: &'static str = "constant_table";
}

/// Kind of the table, from its identifier or element type
fn table_kind(ident: Option<&str>, ty: Option<&str>) -> Option<CapabilityKind> {
    let from_ident = ident.filter(|i| {
        let lowered = i.to_ascii_lowercase();
        TABLE_SUFFIXES.iter().any(|s| lowered.ends_with(s))
    });
    from_ident
        .and_then(CapabilityKind::from_identifier)
        .or_else(|| ty.and_then(CapabilityKind::from_identifier))
}

impl CapabilityMatcher for ConstantTableMatcher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn ecosystems(&self) -> &'static [Ecosystem] {
        &[Ecosystem::TypeScript, Ecosystem::JavaScript, Ecosystem::Python]
    }

    fn confidence(&self) -> Confidence {
        0.8
    }

    fn extract(&self, file: &SourceFile<'_>) -> Extraction {
        let mut out = Extraction::default();
        for caps in TABLE.captures_iter(file.text) {
            let Some(whole) = caps.get(0) else { continue };
            if !file.is_code(whole.start()) {
                continue;
            }
            let ident = caps.name("ident").map(|m| m.as_str());
            let ty = caps.name("ty").map(|m| m.as_str());
            let kind = table_kind(ident, ty);
            // `return [...]` tables only count when elements name their type
            if kind.is_none() && ident.is_some() {
                continue;
            }

            let open = whole.end() - 1;
            let Some(close) = file.lexer().find_closing(open) else {
                if kind.is_some() {
                    out.malformed(file, self.id(), whole.start(), "unterminated capability table");
                }
                continue;
            };
            let base = open + 1;
            for element in file.slice(base, close).split_top_level(b',') {
                self.read_element(file, &mut out, kind, base, element);
            }
        }
        out
    }
}

impl ConstantTableMatcher {
    fn read_element(
        &self,
        file: &SourceFile<'_>,
        out: &mut Extraction,
        table_kind: Option<CapabilityKind>,
        base: usize,
        element: Piece<'_>,
    ) {
        let offset = base + element.offset;
        let (kind, info) = if let Some((o, c)) = object_span(file, base, element) {
            (table_kind, read_object(file, o, c, b':'))
        } else if let Some((ctor, o, c)) = constructor_call(file, base, element) {
            let kind = table_kind.or_else(|| CapabilityKind::from_identifier(ctor));
            (kind, constructor_info(file, o, c))
        } else if is_path(element.text) && table_kind.is_some() {
            match file.resolver().object_definition(element.text) {
                Some((o, c)) => (table_kind, read_object(file, o, c, b':')),
                None => return,
            }
        } else {
            return;
        };

        let Some(kind) = kind else { return };
        if !info.has_name_key {
            out.malformed(file, self.id(), offset, "table entry without a name");
            return;
        }
        let Some(name) = info.name.filter(|n| !n.trim().is_empty()) else {
            out.malformed(file, self.id(), offset, "table entry name does not resolve");
            return;
        };

        let mut candidate = self
            .candidate(file, kind, &name, offset)
            .description(info.description.unwrap_or_default())
            .parameters(info.parameters);
        if let Some(uri) = info.uri {
            candidate = candidate.uri(uri);
        }
        out.candidates.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(ecosystem: Ecosystem, text: &str) -> Extraction {
        ConstantTableMatcher.extract(&SourceFile::new("src/tools.ts", ecosystem, text))
    }

    fn names(out: &Extraction) -> Vec<(CapabilityKind, &str, usize)> {
        out.candidates
            .iter()
            .map(|c| (c.kind, c.name.as_str(), c.parameter_count))
            .collect()
    }

    #[test]
    fn typed_tool_table() {
        let src = r#"
enum ToolName { ECHO = "echo", ADD = "add" }
const TOOLS: Tool[] = [
  { name: ToolName.ECHO, description: "Echoes back the input", inputSchema: zodToJsonSchema(EchoSchema) },
  {
    name: ToolName.ADD,
    description: "Adds two numbers",
    inputSchema: { type: "object", properties: { a: { type: "number" }, b: { type: "number" } } },
  },
];
"#;
        let out = run(Ecosystem::TypeScript, src);
        assert_eq!(
            names(&out),
            vec![(CapabilityKind::Tool, "echo", 0), (CapabilityKind::Tool, "add", 2)]
        );
        assert_eq!(out.candidates[1].description, "Adds two numbers");
        assert!(out.candidates.iter().all(|c| c.source_matcher == "constant_table"));
    }

    #[test]
    fn handler_return_tables() {
        let src = r#"
server.setRequestHandler(ListPromptsRequestSchema, async () => ({
  prompts: [
    { name: "simple_prompt", description: "A prompt without arguments" },
    { name: "complex_prompt", arguments: [{ name: "temperature" }, { name: "style" }] },
  ],
}));
server.setRequestHandler(ListResourcesRequestSchema, async () => ({ resources: [{ uri: "test://static/1", name: "Resource 1" }] }));
"#;
        let out = run(Ecosystem::TypeScript, src);
        assert_eq!(
            names(&out),
            vec![
                (CapabilityKind::Prompt, "simple_prompt", 0),
                (CapabilityKind::Prompt, "complex_prompt", 2),
                (CapabilityKind::Resource, "Resource 1", 0),
            ]
        );
        assert_eq!(out.candidates[2].uri.as_deref(), Some("test://static/1"));
    }

    #[test]
    fn identifiers_resolve_to_object_definitions() {
        let src = "const readFile = { name: 'read_file', description: 'Read a file' };\nexport const allTools = [readFile, unknownTool, ...extraTools];";
        let out = run(Ecosystem::TypeScript, src);
        assert_eq!(names(&out), vec![(CapabilityKind::Tool, "read_file", 0)]);
    }

    #[test]
    fn python_list_tools_return() {
        let src = r#"
@server.list_tools()
async def handle_list_tools() -> list[types.Tool]:
    return [
        types.Tool(
            name="get_forecast",
            description="Get weather forecast",
            inputSchema={"type": "object", "properties": {"latitude": {}, "longitude": {}}},
        ),
        types.Tool(name="get_alerts", description="Get alerts", inputSchema={"type": "object", "properties": {"state": {}}}),
    ]
"#;
        let out = run(Ecosystem::Python, src);
        assert_eq!(
            names(&out),
            vec![(CapabilityKind::Tool, "get_forecast", 2), (CapabilityKind::Tool, "get_alerts", 1)]
        );
    }

    #[test]
    fn element_without_name_is_malformed() {
        let src = "const tools = [{ description: 'orphan' }, { name: 'ok' }];";
        let out = run(Ecosystem::JavaScript, src);
        assert_eq!(names(&out), vec![(CapabilityKind::Tool, "ok", 0)]);
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn unrelated_arrays_are_ignored() {
        let src = "const required = ['a'];\nconst items = [{ name: 'x' }];\nreturn [{ name: 'y' }];";
        let out = run(Ecosystem::JavaScript, src);
        assert!(out.candidates.is_empty());
        assert!(out.issues.is_empty());
    }
}
