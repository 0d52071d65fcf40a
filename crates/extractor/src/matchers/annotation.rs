use super::decl::{
    doc_before, docstring_after, read_object, signature_at, signature_parameters, skip_prelude,
};
use super::{looks_like_uri, CapabilityMatcher, Extraction, SourceFile};
use crate::ecosystem::Ecosystem;
use crate::lexer::{is_assignment, Lexer};
use crate::values::loose_string;
use atlas_model::{CapabilityKind, Confidence};
use once_cell::sync::Lazy;
use regex::Regex;

static PYTHON_DECORATOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*@(?:[A-Za-z_]\w*\.)*(?P<kind>tool|prompt|resource)\b[ \t]*(?P<args>\()?")
        .expect("valid regex")
});

static RUST_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#\[\s*(?:\w+::)*(?P<kind>tool|prompt|resource)\b\s*(?P<args>\()?").expect("valid regex")
});

static CSHARP_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\s*(?P<kind>McpServerTool|McpServerPrompt|McpServerResource|McpTool|McpPrompt|McpResource|Tool|Prompt)\b\s*(?P<args>\()?")
        .expect("valid regex")
});

static JAVA_ANNOTATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(?P<kind>McpTool|McpPrompt|McpResource|Tool|Prompt)\b[ \t]*(?P<args>\()?")
        .expect("valid regex")
});

static CSHARP_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bDescription\s*\(").expect("valid regex"));

/// Decorated or attributed functions: Python `@mcp.tool()`, Rust
/// `#[tool(...)]`, C# `[McpServerTool]` and Java `@Tool(...)`
pub struct AnnotationMatcher;

impl AnnotationMatcher {
    pub const ID: &'static str = "annotation";
}

/// What the annotation itself declares
#[derive(Debug, Default)]
struct Declared {
    name: Option<String>,
    description: Option<String>,
    uri: Option<String>,
}

impl CapabilityMatcher for AnnotationMatcher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn ecosystems(&self) -> &'static [Ecosystem] {
        &[
            Ecosystem::Python,
            Ecosystem::Rust,
            Ecosystem::CSharp,
            Ecosystem::Java,
        ]
    }

    fn confidence(&self) -> Confidence {
        0.85
    }

    fn extract(&self, file: &SourceFile<'_>) -> Extraction {
        let mut out = Extraction::default();
        let re: &Regex = match file.ecosystem {
            Ecosystem::Python => &PYTHON_DECORATOR,
            Ecosystem::Rust => &RUST_ATTRIBUTE,
            Ecosystem::CSharp => &CSHARP_ATTRIBUTE,
            Ecosystem::Java => &JAVA_ANNOTATION,
            _ => return out,
        };

        for caps in re.captures_iter(file.text) {
            let (Some(whole), Some(kind_match)) = (caps.get(0), caps.name("kind")) else {
                continue;
            };
            let start = kind_match.start();
            if !file.is_code(start) {
                continue;
            }
            let Some(kind) = CapabilityKind::from_identifier(kind_match.as_str()) else {
                continue;
            };

            // span of the annotation's own arguments, if any
            let (declared, annotation_end) = match file.ecosystem {
                Ecosystem::Rust | Ecosystem::CSharp => {
                    let bracket = file.text[..start].rfind('[').unwrap_or(start);
                    let Some(close) = file.lexer().find_closing(bracket) else {
                        out.malformed(file, self.id(), start, "unterminated attribute");
                        continue;
                    };
                    let args = caps.name("args").map(|m| m.start());
                    (self.declared(file, kind, bracket, args, close), close + 1)
                }
                _ => match caps.name("args") {
                    Some(paren) => {
                        let Some(close) = file.lexer().find_closing(paren.start()) else {
                            out.malformed(file, self.id(), start, "unterminated decorator arguments");
                            continue;
                        };
                        (self.declared(file, kind, paren.start(), Some(paren.start()), close), close + 1)
                    }
                    None => (Declared::default(), whole.end()),
                },
            };

            let decl_start = skip_prelude(file, annotation_end);
            let Some(signature) = signature_at(file, decl_start) else {
                // parameter-level attributes and stray annotations
                continue;
            };

            let doc = match file.ecosystem {
                Ecosystem::Python => docstring_after(file, signature.params_close),
                _ => doc_before(file, whole.start()),
            };

            let name = declared
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| signature.name.clone());
            let mut candidate = self
                .candidate(file, kind, &name, start)
                .description(declared.description.or(doc).unwrap_or_default())
                .parameters(signature_parameters(file, &signature));
            if let Some(uri) = declared.uri {
                candidate = candidate.uri(uri);
            }
            out.candidates.push(candidate);
        }
        out
    }
}

impl AnnotationMatcher {
    /// Read `name`/`description`/`uri` declared on the annotation.
    ///
    /// `args_open` is the opening parenthesis of the annotation's argument
    /// list; `outer_close` bounds the whole attribute for C# where a
    /// `Description(...)` may sit beside the marker.
    fn declared(
        &self,
        file: &SourceFile<'_>,
        kind: CapabilityKind,
        outer_open: usize,
        args_open: Option<usize>,
        outer_close: usize,
    ) -> Declared {
        let mut declared = Declared::default();

        if let Some(open) = args_open {
            if let Some(close) = file.lexer().find_closing(open) {
                let info = read_object(file, open, close, b'=');
                declared.name = info.name;
                declared.description = info.description;
                declared.uri = info.uri;

                let args_lexer = file.slice(open + 1, close);
                let positional: Vec<String> = args_lexer
                    .split_top_level(b',')
                    .into_iter()
                    .filter(|a| args_lexer.piece(*a).find_top_level(is_assignment).is_none())
                    .filter_map(|a| loose_string(args_lexer.piece(a)))
                    .collect();
                for value in positional {
                    if kind == CapabilityKind::Resource && declared.uri.is_none() && looks_like_uri(&value) {
                        declared.uri = Some(value);
                    } else if file.ecosystem == Ecosystem::Python && declared.name.is_none() {
                        declared.name = Some(value);
                    } else if declared.description.is_none() {
                        // `@Tool("Looks up the weather")`
                        declared.description = Some(value);
                    }
                }
            }
        }

        if file.ecosystem == Ecosystem::CSharp && declared.description.is_none() {
            declared.description = csharp_description(file, outer_open, outer_close);
        }
        declared
    }
}

/// `Description("...")` inside the attribute list or in the attribute that
/// directly follows it
fn csharp_description(file: &SourceFile<'_>, open: usize, close: usize) -> Option<String> {
    let within = |from: usize, to: usize| -> Option<String> {
        let m = CSHARP_DESCRIPTION.find(file.text.get(from..to)?)?;
        let paren = from + m.end() - 1;
        let end = file.lexer().find_closing(paren)?;
        let lexer: Lexer<'_> = file.slice(paren + 1, end);
        loose_string(lexer)
    };
    if let Some(found) = within(open, close + 1) {
        return Some(found);
    }
    let next = close + 1 + file.text[close + 1..].len() - file.text[close + 1..].trim_start().len();
    if file.text.as_bytes().get(next) == Some(&b'[') {
        let next_close = file.lexer().find_closing(next)?;
        return within(next, next_close + 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(path: &str, ecosystem: Ecosystem, text: &str) -> Extraction {
        AnnotationMatcher.extract(&SourceFile::new(path, ecosystem, text))
    }

    fn rows(out: &Extraction) -> Vec<(CapabilityKind, String, String, usize)> {
        out.candidates
            .iter()
            .map(|c| (c.kind, c.name.clone(), c.description.clone(), c.parameter_count))
            .collect()
    }

    #[test]
    fn fastmcp_decorators() {
        let src = r#"
from mcp.server.fastmcp import FastMCP, Context

mcp = FastMCP("weather")

@mcp.tool()
async def get_forecast(latitude: float, longitude: float, ctx: Context) -> str:
    """Get weather forecast for a location.

    Args:
        latitude: Latitude
    """
    return ""

@mcp.tool(name="alerts", description="Active alerts for a state")
def get_alerts(state: str) -> str:
    return ""

@mcp.resource("config://settings")
def settings() -> str:
    """Application settings"""
    return "{}"

@mcp.prompt
def review(code: str, style: str = "terse") -> str:
    return ""
"#;
        let out = run("server.py", Ecosystem::Python, src);
        assert_eq!(
            rows(&out),
            vec![
                (CapabilityKind::Tool, "get_forecast".into(), "Get weather forecast for a location.".into(), 2),
                (CapabilityKind::Tool, "alerts".into(), "Active alerts for a state".into(), 1),
                (CapabilityKind::Resource, "settings".into(), "Application settings".into(), 0),
                (CapabilityKind::Prompt, "review".into(), String::new(), 2),
            ]
        );
        assert_eq!(out.candidates[2].uri.as_deref(), Some("config://settings"));
        assert!(out.candidates.iter().all(|c| c.confidence == 0.85));
    }

    #[test]
    fn list_handlers_are_not_capabilities() {
        let src = "@server.list_tools()\nasync def handle_list_tools():\n    return []\n\n@app.call_tool()\nasync def call(name, arguments):\n    pass\n";
        assert!(run("server.py", Ecosystem::Python, src).candidates.is_empty());
    }

    #[test]
    fn rmcp_tool_attributes() {
        let src = r#"
#[tool_router]
impl Counter {
    /// Increment the counter by one
    #[tool(description = "Increment the counter")]
    async fn increment(&self) -> Result<CallToolResult, McpError> { todo!() }

    /// Add two numbers together
    #[tool]
    fn sum(&self, Parameters(SumRequest { a, b }): Parameters<SumRequest>) -> String { todo!() }

    #[tool(name = "get_value")]
    pub fn value(&self) -> String { todo!() }
}
"#;
        let out = run("src/counter.rs", Ecosystem::Rust, src);
        assert_eq!(
            rows(&out),
            vec![
                (CapabilityKind::Tool, "increment".into(), "Increment the counter".into(), 0),
                (CapabilityKind::Tool, "sum".into(), "Add two numbers together".into(), 1),
                (CapabilityKind::Tool, "get_value".into(), String::new(), 0),
            ]
        );
    }

    #[test]
    fn csharp_server_tools() {
        let src = r#"
[McpServerToolType]
public static class EchoTool
{
    [McpServerTool, Description("Echoes the message back to the client.")]
    public static string Echo(string message) => $"hello {message}";

    [McpServerTool(Name = "reverse")]
    [Description("Reverses a string")]
    public static string ReverseEcho(IMcpServer server, string message, int times) => message;
}
"#;
        let out = run("Tools/EchoTool.cs", Ecosystem::CSharp, src);
        assert_eq!(
            rows(&out),
            vec![
                (CapabilityKind::Tool, "Echo".into(), "Echoes the message back to the client.".into(), 1),
                (CapabilityKind::Tool, "reverse".into(), "Reverses a string".into(), 2),
            ]
        );
    }

    #[test]
    fn java_spring_tools() {
        let src = r#"
@Service
public class WeatherService {
    /**
     * Forecast lookup.
     */
    @Tool(description = "Get weather forecast for a specific latitude/longitude")
    public String getWeatherForecastByLocation(double latitude, double longitude) { return ""; }

    @Tool(name = "alerts")
    public String getAlerts(@ToolParam(description = "Two-letter US state code") String state) { return ""; }
}
"#;
        let out = run("src/main/java/WeatherService.java", Ecosystem::Java, src);
        assert_eq!(
            rows(&out),
            vec![
                (
                    CapabilityKind::Tool,
                    "getWeatherForecastByLocation".into(),
                    "Get weather forecast for a specific latitude/longitude".into(),
                    2
                ),
                (CapabilityKind::Tool, "alerts".into(), String::new(), 1),
            ]
        );
    }

    #[test]
    fn unterminated_decorator_is_malformed() {
        let src = "@mcp.tool(name=\"x\"\ndef x():\n    pass\n";
        let out = run("server.py", Ecosystem::Python, src);
        assert!(out.candidates.is_empty());
        assert_eq!(out.issues.len(), 1);
    }
}
