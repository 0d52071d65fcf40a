use super::decl::{object_span, read_object};
use super::{looks_like_uri, CapabilityMatcher, Extraction, SourceFile};
use crate::ecosystem::Ecosystem;
use crate::lexer::{is_assignment, is_ident_byte, Piece};
use crate::resolve::is_path;
use crate::values::{count_parameters, loose_string};
use atlas_model::{CapabilityKind, Confidence};
use once_cell::sync::Lazy;
use regex::Regex;

static REGISTRATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\.\s*(?:(?P<coll>tools|prompts|resources)\s*\.\s*register|(?P<method>registerTool|registerPrompt|registerResource|addTool|addPrompt|addResource|add_tool|add_prompt|add_resource|AddTool|AddPrompt|AddResourceTemplate|AddResource|NewTool|NewPrompt|NewResourceTemplate|NewResource|tool|prompt|resource))\s*\(",
    )
    .expect("valid regex")
});

static GO_OPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\w+\.)?With(?P<opt>\w+)\s*\(").expect("valid regex"));

/// `server.tool("name", ...)`, `server.registerTool(...)`, `mcp.add_tool(...)`,
/// `s.AddTool(...)` and `mcp.NewTool("name", mcp.WithDescription(..), ...)`
pub struct RegistrationCallMatcher;

impl RegistrationCallMatcher {
    pub const ID: &'static str = "registration_call";
}

impl CapabilityMatcher for RegistrationCallMatcher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn ecosystems(&self) -> &'static [Ecosystem] {
        &[
            Ecosystem::TypeScript,
            Ecosystem::JavaScript,
            Ecosystem::Python,
            Ecosystem::Go,
        ]
    }

    fn confidence(&self) -> Confidence {
        0.9
    }

    fn extract(&self, file: &SourceFile<'_>) -> Extraction {
        let mut out = Extraction::default();
        for caps in REGISTRATION.captures_iter(file.text) {
            let Some(whole) = caps.get(0) else { continue };
            let dot = whole.start();
            if !file.is_code(dot) || is_decorator(file.text, dot) {
                continue;
            }
            let method = caps
                .name("coll")
                .or_else(|| caps.name("method"))
                .map(|m| m.as_str())
                .unwrap_or_default();
            let Some(kind) = CapabilityKind::from_identifier(method) else {
                continue;
            };

            let open = whole.end() - 1;
            let Some(close) = file.lexer().find_closing(open) else {
                out.malformed(file, self.id(), dot, format!("unterminated `{method}` call"));
                continue;
            };
            self.read_call(file, &mut out, kind, method, dot, open, close);
        }
        out
    }
}

impl RegistrationCallMatcher {
    #[allow(clippy::too_many_arguments)]
    fn read_call(
        &self,
        file: &SourceFile<'_>,
        out: &mut Extraction,
        kind: CapabilityKind,
        method: &str,
        offset: usize,
        open: usize,
        close: usize,
    ) {
        let base = open + 1;
        let args_lexer = file.slice(base, close);
        let args = args_lexer.split_top_level(b',');
        let python = file.ecosystem == Ecosystem::Python;

        let (positional, keywords): (Vec<Piece<'_>>, Vec<Piece<'_>>) =
            args.into_iter().partition(|arg| {
                !(python && args_lexer.piece(*arg).find_top_level(is_assignment).is_some())
            });
        let keyword = |key: &str| {
            keywords.iter().find_map(|arg| {
                let (k, v) = arg.text.split_once('=')?;
                (k.trim() == key).then(|| {
                    let lead = arg.text.len() - arg.text[k.len() + 1..].trim_start().len();
                    Piece {
                        offset: arg.offset + lead,
                        text: v.trim(),
                    }
                })
            })
        };

        let resolver = file.resolver();
        let mut description: Option<String> = None;
        let mut parameters = 0;
        let mut uri: Option<String> = None;

        let name = if let Some(value) = keyword("name") {
            resolver.name_of(file.at(base, value))
        } else {
            let Some(first) = positional.first() else {
                return;
            };
            if let Some((o, c)) = object_span(file, base, *first) {
                let info = read_object(file, o, c, b':');
                if !info.has_name_key {
                    out.malformed(file, self.id(), offset, "registration object without a name");
                    return;
                }
                description = info.description;
                parameters = info.parameters;
                uri = info.uri;
                if info.name.is_none() {
                    out.malformed(file, self.id(), offset, "registration name does not resolve");
                    return;
                }
                info.name
            } else if let Some(name) = resolver.name_of(file.at(base, *first)) {
                Some(name)
            } else if python && method.starts_with("add_") && is_plain_ident(first.text) {
                // FastMCP names a registered function after itself
                Some(first.text.to_string())
            } else {
                // a variable or nested constructor; the nested call is matched on its own
                return;
            }
        };

        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            out.malformed(file, self.id(), offset, "empty capability name");
            return;
        };

        if let Some(value) = keyword("description") {
            description = resolver.name_of(file.at(base, value));
        }
        if let Some(value) = keyword("uri") {
            uri = loose_string(file.at(base, value));
        }

        let rest = if keyword("name").is_some() {
            &positional[..]
        } else {
            positional.get(1..).unwrap_or(&[])
        };

        if file.ecosystem == Ecosystem::Go {
            let (desc, count) = go_options(file, base, rest);
            description = description.or(desc);
            parameters = parameters.max(count);
        } else {
            let mut seen_shape = parameters > 0;
            for (i, arg) in rest.iter().enumerate() {
                let lexer = file.at(base, *arg);
                let literal = loose_string(lexer).or_else(|| {
                    (i == 0 && is_path(arg.text))
                        .then(|| resolver.string_constant(arg.text))
                        .flatten()
                });
                if let Some(text) = literal {
                    if kind == CapabilityKind::Resource && uri.is_none() && looks_like_uri(&text) {
                        uri = Some(text);
                    } else if description.is_none() {
                        description = Some(text);
                    }
                    continue;
                }
                if seen_shape {
                    continue;
                }
                if let Some((o, c)) = object_span(file, base, *arg) {
                    let info = read_object(file, o, c, b':');
                    let is_metadata =
                        info.description.is_some() || info.parameters > 0 || info.uri.is_some();
                    if is_metadata {
                        description = description.or(info.description);
                        uri = uri.or(info.uri);
                        parameters = info.parameters;
                    } else {
                        parameters = count_parameters(lexer);
                    }
                    seen_shape = true;
                } else if arg.text.starts_with("z.object(") {
                    parameters = count_parameters(lexer);
                    seen_shape = true;
                }
            }
        }

        let mut candidate = self
            .candidate(file, kind, &name, offset)
            .description(description.unwrap_or_default())
            .parameters(parameters);
        if let Some(uri) = uri {
            candidate = candidate.uri(uri);
        }
        out.candidates.push(candidate);
    }
}

/// The call is part of `@mcp.tool(...)`
fn is_decorator(text: &str, dot: usize) -> bool {
    let bytes = text.as_bytes();
    let mut i = dot;
    while i > 0 && (is_ident_byte(bytes[i - 1]) || bytes[i - 1] == b'.') {
        i -= 1;
    }
    i > 0 && bytes[i - 1] == b'@'
}

fn is_plain_ident(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(is_ident_byte)
}

/// Description and input count from `mcp.With*` options
fn go_options(file: &SourceFile<'_>, base: usize, args: &[Piece<'_>]) -> (Option<String>, usize) {
    let mut description = None;
    let mut count = 0;
    for arg in args {
        let Some(caps) = GO_OPTION.captures(arg.text) else {
            continue;
        };
        let option = caps.name("opt").map(|m| m.as_str()).unwrap_or_default();
        if option.ends_with("Description") {
            description = file.at(base, *arg).first_string().map(|(_, s)| s);
        } else if !option.contains("Annotation") && !option.contains("Hint") && option != "MIMEType" {
            count += 1;
        }
    }
    (description, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(path: &str, ecosystem: Ecosystem, text: &str) -> Extraction {
        RegistrationCallMatcher.extract(&SourceFile::new(path, ecosystem, text))
    }

    fn summary(out: &Extraction) -> Vec<(CapabilityKind, String, String, usize)> {
        out.candidates
            .iter()
            .map(|c| (c.kind, c.name.clone(), c.description.clone(), c.parameter_count))
            .collect()
    }

    #[test]
    fn typescript_tool_and_prompt_calls() {
        let src = r#"
server.tool("add", "Add two numbers", { a: z.number(), b: z.number() }, async ({ a, b }) => ({}));
server.prompt('review', 'Review code', { code: z.string() }, () => ({}));
server.resource("config", "config://app", async (uri) => ({}));
"#;
        let out = run("src/index.ts", Ecosystem::TypeScript, src);
        assert_eq!(
            summary(&out),
            vec![
                (CapabilityKind::Tool, "add".into(), "Add two numbers".into(), 2),
                (CapabilityKind::Prompt, "review".into(), "Review code".into(), 1),
                (CapabilityKind::Resource, "config".into(), String::new(), 0),
            ]
        );
        assert_eq!(out.candidates[2].uri.as_deref(), Some("config://app"));
        assert!(out.candidates.iter().all(|c| c.confidence == 0.9));
        assert!(out.issues.is_empty());
    }

    #[test]
    fn register_tool_with_metadata_object() {
        let src = r#"server.registerTool("search", { title: "Search", description: "Full text search", inputSchema: { query: z.string(), limit: z.number() } }, handler);"#;
        let out = run("src/a.ts", Ecosystem::TypeScript, src);
        assert_eq!(
            summary(&out),
            vec![(CapabilityKind::Tool, "search".into(), "Full text search".into(), 2)]
        );
    }

    #[test]
    fn resolves_identifier_names() {
        let src = "const ECHO = 'echo';\nserver.tool(ECHO, 'Echo input', {}, handler);\nserver.tool(dynamicName, handler);";
        let out = run("src/a.js", Ecosystem::JavaScript, src);
        assert_eq!(out.candidates.len(), 1);
        assert_eq!(out.candidates[0].name, "echo");
    }

    #[test]
    fn unterminated_call_is_malformed() {
        let src = "server.tool(\"broken\", \"never closed\", {\n";
        let out = run("src/a.ts", Ecosystem::TypeScript, src);
        assert!(out.candidates.is_empty());
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn object_without_name_is_malformed() {
        let src = "server.tools.register({ description: 'x' });";
        let out = run("src/a.js", Ecosystem::JavaScript, src);
        assert!(out.candidates.is_empty());
        assert_eq!(out.issues.len(), 1);
    }

    #[test]
    fn calls_in_comments_and_decorators_are_ignored() {
        let src = "# server.tool('ghost', 'x')\n@mcp.tool()\ndef real(): pass\n";
        let out = run("server.py", Ecosystem::Python, src);
        assert!(out.candidates.is_empty());
        assert!(out.issues.is_empty());
    }

    #[test]
    fn python_add_tool_keywords() {
        let src = "mcp.add_tool(fetch_page, name=\"fetch\", description=\"Fetch a page\")\nmcp.add_tool(summarize)";
        let out = run("server.py", Ecosystem::Python, src);
        let names: Vec<&str> = out.candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["fetch", "summarize"]);
        assert_eq!(out.candidates[0].description, "Fetch a page");
    }

    #[test]
    fn go_new_tool_builder() {
        let src = r#"
tool := mcp.NewTool("calculate",
    mcp.WithDescription("Perform arithmetic"),
    mcp.WithString("operation", mcp.Required()),
    mcp.WithNumber("x"),
    mcp.WithNumber("y"),
    mcp.WithReadOnlyHintAnnotation(true),
)
s.AddTool(tool, handler)
"#;
        let out = run("main.go", Ecosystem::Go, src);
        assert_eq!(
            summary(&out),
            vec![(CapabilityKind::Tool, "calculate".into(), "Perform arithmetic".into(), 3)]
        );
    }
}
