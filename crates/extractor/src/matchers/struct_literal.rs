use super::decl::{object_span, read_object};
use super::{CapabilityMatcher, Extraction, SourceFile};
use crate::ecosystem::Ecosystem;
use crate::lexer::is_ident_byte;
use atlas_model::{CapabilityKind, Confidence};
use once_cell::sync::Lazy;
use regex::Regex;

static COMPOSITE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<slice>\[\]\s*)?&?\b(?P<ty>(?:[A-Za-z_]\w*(?:\.|::))*(?P<base>[A-Z]\w*))\s*\{")
        .expect("valid regex")
});

/// Type names that mention a capability but describe something else
const SUPPORTING_SUFFIXES: [&str; 20] = [
    "Argument",
    "Arguments",
    "Arg",
    "Args",
    "Annotation",
    "Annotations",
    "Schema",
    "Result",
    "Request",
    "Response",
    "Content",
    "Contents",
    "Message",
    "Messages",
    "Handler",
    "Param",
    "Params",
    "Options",
    "Error",
    "Capabilities",
];

/// Keywords after which `Name {` opens a declaration, not a literal
const DECLARATION_KEYWORDS: [&str; 13] = [
    "struct", "enum", "impl", "for", "trait", "type", "union", "mod", "fn", "where", "interface",
    "class", "dyn",
];

/// Go and Rust composite literals of capability types:
/// `mcp.Tool{Name: "x", ...}`, `[]mcp.Prompt{{Name: ...}}`,
/// `Tool { name: "x".into(), ... }`
pub struct StructLiteralMatcher;

impl StructLiteralMatcher {
    pub const ID: &'static str = "struct_literal";
}

fn capability_type(base: &str) -> Option<CapabilityKind> {
    if SUPPORTING_SUFFIXES.iter().any(|s| base.ends_with(s)) {
        return None;
    }
    CapabilityKind::from_identifier(base)
}

/// `struct Tool {`, `impl Tool {` and `-> Tool {` are not literals
fn opens_declaration(text: &str, start: usize) -> bool {
    let before = text[..start].trim_end();
    if before.ends_with("->") || before.ends_with(')') {
        return true;
    }
    let word_start = before
        .bytes()
        .rposition(|b| !is_ident_byte(b))
        .map(|p| p + 1)
        .unwrap_or(0);
    DECLARATION_KEYWORDS.contains(&&before[word_start..])
}

impl CapabilityMatcher for StructLiteralMatcher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn ecosystems(&self) -> &'static [Ecosystem] {
        &[Ecosystem::Go, Ecosystem::Rust]
    }

    fn confidence(&self) -> Confidence {
        0.7
    }

    fn extract(&self, file: &SourceFile<'_>) -> Extraction {
        let mut out = Extraction::default();
        for caps in COMPOSITE.captures_iter(file.text) {
            let (Some(whole), Some(ty), Some(base)) = (caps.get(0), caps.name("ty"), caps.name("base"))
            else {
                continue;
            };
            if !file.is_code(ty.start()) {
                continue;
            }
            let Some(kind) = capability_type(base.as_str()) else {
                continue;
            };
            if opens_declaration(file.text, whole.start()) {
                continue;
            }

            let open = whole.end() - 1;
            let Some(close) = file.lexer().find_closing(open) else {
                out.malformed(file, self.id(), ty.start(), "unterminated composite literal");
                continue;
            };

            if caps.name("slice").is_some() {
                // element types may be elided: []mcp.Tool{{Name: "a"}, {Name: "b"}}
                let body_start = open + 1;
                for element in file.slice(body_start, close).split_top_level(b',') {
                    if let Some((o, c)) = object_span(file, body_start, element) {
                        self.read_literal(file, &mut out, kind, o, c);
                    }
                }
            } else {
                self.read_literal(file, &mut out, kind, open, close);
            }
        }
        out
    }
}

impl StructLiteralMatcher {
    fn read_literal(
        &self,
        file: &SourceFile<'_>,
        out: &mut Extraction,
        kind: CapabilityKind,
        open: usize,
        close: usize,
    ) {
        let info = read_object(file, open, close, b':');
        // patterns (`Tool { name, .. }`) and runtime names are not definitions
        let Some(name) = info.name.filter(|n| !n.trim().is_empty()) else {
            return;
        };
        let mut candidate = self
            .candidate(file, kind, &name, open)
            .description(info.description.unwrap_or_default())
            .parameters(info.parameters);
        if let Some(uri) = info.uri {
            candidate = candidate.uri(uri);
        }
        out.candidates.push(candidate);
    }
}
