use super::decl::{constructor_call, constructor_info, read_object, trailing_object, ObjectInfo};
use super::{CapabilityMatcher, Extraction, SourceFile};
use crate::ecosystem::Ecosystem;
use crate::lexer::Piece;
use crate::resolve::is_path;
use crate::values::loose_string;
use atlas_model::{CapabilityKind, Confidence};
use once_cell::sync::Lazy;
use regex::Regex;

static JS_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:\bexport\s+(?:const|let|var)\s+|\bmodule\.exports\.|(?:^|[^.\w$])exports\.)(?P<ident>[\w$]+)\s*(?::[^=\n]+?)?=\s*(?P<open>[\[{])",
    )
    .expect("valid regex")
});

static JS_MODULE_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmodule\.exports\s*=\s*\{").expect("valid regex"));

static PYTHON_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?P<ident>[A-Za-z_]\w*)\s*(?::[^=\n]+)?=\s*(?P<open>[\[{])").expect("valid regex")
});

static GO_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^var\s+(?P<ident>[A-Z]\w*)\s*=\s*(?P<ty>\[\][\w.*]+|map\[[^\]]+\][\w.*]+)\s*(?P<open>\{)")
        .expect("valid regex")
});

static RUST_EXPORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*pub\s+(?:static|const)\s+(?P<ident>[A-Z_][A-Z0-9_]*)\s*:[^=]+=\s*&?(?P<open>\[)")
        .expect("valid regex")
});

const EXPORT_SUFFIXES: [&str; 4] = ["tools", "prompts", "resources", "templates"];

/// Exported collections named after capabilities: `export const fooTools = [...]`,
/// `module.exports = { tools: [...] }`, Python `MY_TOOLS = [...]`,
/// Go `var Tools = []mcp.Tool{...}`, Rust `pub static TOOLS: &[..] = &[...]`
pub struct ExportPatternMatcher;

impl ExportPatternMatcher {
    pub const ID: &'static str = "export_pattern";
}

fn export_kind(ident: &str) -> Option<CapabilityKind> {
    let lowered = ident.to_ascii_lowercase();
    if !EXPORT_SUFFIXES.iter().any(|s| lowered.ends_with(s)) {
        return None;
    }
    CapabilityKind::from_identifier(ident)
}

/// A collection found by one of the export anchors
struct Collection {
    kind: CapabilityKind,
    open: usize,
    /// Go `map[...]` bodies are keyed by name
    keyed: bool,
    offset: usize,
}

impl CapabilityMatcher for ExportPatternMatcher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn ecosystems(&self) -> &'static [Ecosystem] {
        &[
            Ecosystem::TypeScript,
            Ecosystem::JavaScript,
            Ecosystem::Python,
            Ecosystem::Go,
            Ecosystem::Rust,
        ]
    }

    fn confidence(&self) -> Confidence {
        0.4
    }

    fn extract(&self, file: &SourceFile<'_>) -> Extraction {
        let mut out = Extraction::default();
        for collection in self.collections(file) {
            let Some(close) = file.lexer().find_closing(collection.open) else {
                out.malformed(file, self.id(), collection.offset, "unterminated exported collection");
                continue;
            };
            let base = collection.open + 1;
            let body = file.slice(base, close);
            let is_object = file.text.as_bytes()[collection.open] == b'{';
            let go_slice = file.ecosystem == Ecosystem::Go && !collection.keyed;

            if is_object && !go_slice {
                for field in body.fields(b':') {
                    self.read_entry(file, &mut out, collection.kind, base, field.value, Some(&field.key));
                }
            } else {
                for element in body.split_top_level(b',') {
                    self.read_entry(file, &mut out, collection.kind, base, element, None);
                }
            }
        }
        out
    }
}

impl ExportPatternMatcher {
    fn collections(&self, file: &SourceFile<'_>) -> Vec<Collection> {
        let re: &Regex = match file.ecosystem {
            Ecosystem::TypeScript | Ecosystem::JavaScript => &JS_EXPORT,
            Ecosystem::Python => &PYTHON_EXPORT,
            Ecosystem::Go => &GO_EXPORT,
            Ecosystem::Rust => &RUST_EXPORT,
            _ => return Vec::new(),
        };
        let mut found = Vec::new();
        let mut push = |ident: &str, open: usize, keyed: bool, offset: usize| {
            if let Some(kind) = export_kind(ident) {
                if file.is_code(offset) {
                    found.push(Collection {
                        kind,
                        open,
                        keyed,
                        offset,
                    });
                }
            }
        };

        for caps in re.captures_iter(file.text) {
            let (Some(ident), Some(open)) = (caps.name("ident"), caps.name("open")) else {
                continue;
            };
            let keyed = caps.name("ty").is_some_and(|t| t.as_str().starts_with("map"));
            push(ident.as_str(), open.start(), keyed, ident.start());
        }

        // module.exports = { fooTools: [...], barPrompts: {...} }
        if matches!(file.ecosystem, Ecosystem::TypeScript | Ecosystem::JavaScript) {
            for m in JS_MODULE_OBJECT.find_iter(file.text) {
                let open = m.end() - 1;
                let Some(close) = file.lexer().find_closing(open) else {
                    continue;
                };
                for field in file.slice(open + 1, close).fields(b':') {
                    let start = open + 1 + field.value.offset;
                    if field.value.text.starts_with(['[', '{']) {
                        push(&field.key, start, false, start);
                    }
                }
            }
        }
        found
    }

    fn read_entry(
        &self,
        file: &SourceFile<'_>,
        out: &mut Extraction,
        kind: CapabilityKind,
        base: usize,
        entry: Piece<'_>,
        key: Option<&str>,
    ) {
        let offset = base + entry.offset;
        let resolver = file.resolver();

        let info = if let Some((o, c)) = trailing_object(file, base, entry) {
            Some(read_object(file, o, c, b':'))
        } else if let Some((_, o, c)) = constructor_call(file, base, entry) {
            Some(constructor_info(file, o, c))
        } else if let Some(name) = loose_string(file.at(base, entry)) {
            Some(ObjectInfo {
                has_name_key: true,
                name: Some(name),
                ..Default::default()
            })
        } else if is_path(entry.text) {
            resolver
                .object_definition(entry.text)
                .map(|(o, c)| read_object(file, o, c, b':'))
                .or_else(|| {
                    resolver.string_constant(entry.text).map(|name| ObjectInfo {
                        has_name_key: true,
                        name: Some(name),
                        ..Default::default()
                    })
                })
        } else {
            None
        };

        // a keyed entry is named by its key unless it names itself
        let (name, info) = match (info, key) {
            (Some(info), Some(key)) => (info.name.clone().or_else(|| Some(key.to_string())), info),
            (None, Some(key)) => (Some(key.to_string()), ObjectInfo::default()),
            (Some(info), None) => {
                if !info.has_name_key {
                    out.malformed(file, self.id(), offset, "exported entry without a name");
                    return;
                }
                (info.name.clone(), info)
            }
            (None, None) => return,
        };
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
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

    fn run(path: &str, ecosystem: Ecosystem, text: &str) -> Vec<(CapabilityKind, String, String)> {
        ExportPatternMatcher
            .extract(&SourceFile::new(path, ecosystem, text))
            .candidates
            .into_iter()
            .map(|c| (c.kind, c.name, c.description))
            .collect()
    }

    #[test]
    fn exported_arrays_and_maps() {
        let src = r#"
const helper = { name: "helper_tool", description: "Helps" };
export const githubTools = [
  { name: "create_issue", description: "Open an issue" },
  helper,
  "list_repos",
];
export const searchPrompts = {
  summarize: { description: "Summarize results" },
  rank: rankPrompt,
};
export const config = [{ name: "not_a_tool" }];
"#;
        assert_eq!(
            run("src/index.ts", Ecosystem::TypeScript, src),
            vec![
                (CapabilityKind::Tool, "create_issue".into(), "Open an issue".into()),
                (CapabilityKind::Tool, "helper_tool".into(), "Helps".into()),
                (CapabilityKind::Tool, "list_repos".into(), String::new()),
                (CapabilityKind::Prompt, "summarize".into(), "Summarize results".into()),
                (CapabilityKind::Prompt, "rank".into(), String::new()),
            ]
        );
    }

    #[test]
    fn commonjs_exports() {
        let src = "module.exports = {\n  tools: [{ name: 'ping', description: 'Ping' }],\n  handler,\n};";
        assert_eq!(
            run("index.js", Ecosystem::JavaScript, src),
            vec![(CapabilityKind::Tool, "ping".into(), "Ping".into())]
        );
    }

    #[test]
    fn python_module_constants() {
        let src = "AVAILABLE_TOOLS = [\n    {\"name\": \"query\", \"description\": \"Run SQL\"},\n]\n\ndef f():\n    local_tools = [{\"name\": \"hidden\"}]\n";
        assert_eq!(
            run("server.py", Ecosystem::Python, src),
            vec![(CapabilityKind::Tool, "query".into(), "Run SQL".into())]
        );
    }

    #[test]
    fn go_exported_slices_and_maps() {
        let src = r#"
var Tools = []mcp.Tool{
	{Name: "list_pods", Description: "List pods"},
	mcp.Tool{Name: "get_logs"},
}

var Prompts = map[string]PromptFunc{
	"triage": triagePrompt,
}
"#;
        assert_eq!(
            run("tools.go", Ecosystem::Go, src),
            vec![
                (CapabilityKind::Tool, "list_pods".into(), "List pods".into()),
                (CapabilityKind::Tool, "get_logs".into(), String::new()),
                (CapabilityKind::Prompt, "triage".into(), String::new()),
            ]
        );
    }

    #[test]
    fn entries_without_names_are_malformed() {
        let file = SourceFile::new(
            "src/index.ts",
            Ecosystem::TypeScript,
            "export const tools = [{ description: 'orphan' }];",
        );
        let out = ExportPatternMatcher.extract(&file);
        assert!(out.candidates.is_empty());
        assert_eq!(out.issues.len(), 1);
    }
}
