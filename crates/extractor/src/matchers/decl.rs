//! Helpers shared by matchers: object bodies, declaration signatures and
//! doc comments.

use super::{SourceFile, DESCRIPTION_KEYS, SCHEMA_FIELDS, URI_KEYS};
use crate::ecosystem::Ecosystem;
use crate::lexer::{is_ident_byte, Lexer, Piece};
use crate::values::{count_parameters, loose_string};
use once_cell::sync::Lazy;
use regex::Regex;

/// Capability metadata read from an object-like body
#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct ObjectInfo {
    /// A `name` key exists, resolvable or not
    pub has_name_key: bool,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parameters: usize,
    pub uri: Option<String>,
}

/// Read the entries between `open` and `close` (exclusive braces or parens).
///
/// `sep` is `b':'` for object literals and `b'='` for keyword arguments.
pub(crate) fn read_object(file: &SourceFile<'_>, open: usize, close: usize, sep: u8) -> ObjectInfo {
    let body = file.slice(open + 1, close);
    let base = open + 1;
    let fields = body.fields(sep);
    let resolver = file.resolver();
    let mut info = ObjectInfo::default();

    for field in &fields {
        let key = field.key.as_str();
        let value = file.at(base, field.value);
        if key.eq_ignore_ascii_case("name") {
            info.has_name_key = true;
            info.name = resolver.name_of(value);
        } else if DESCRIPTION_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)) {
            info.description = resolver.name_of(value);
        } else if URI_KEYS.iter().any(|k| key.eq_ignore_ascii_case(k)) {
            info.uri = loose_string(value);
        }
    }

    if let Some(schema) = SCHEMA_FIELDS.iter().find_map(|name| {
        fields
            .iter()
            .find(|f| f.key.eq_ignore_ascii_case(name))
    }) {
        info.parameters = count_parameters(file.at(base, schema.value));
    }

    info
}

/// Open and close positions when `piece` (relative to `base`) is exactly
/// one braced object literal
pub(crate) fn object_span(file: &SourceFile<'_>, base: usize, piece: Piece<'_>) -> Option<(usize, usize)> {
    let start = base + piece.offset;
    if piece.text.starts_with('{') {
        let close = file.lexer().find_closing(start)?;
        return (close + 1 == start + piece.text.len()).then_some((start, close));
    }
    None
}

/// A `Ctor(k=v, ...)` call such as Python's `types.Tool(name=...)`:
/// returns the constructor's last segment and the parenthesis positions.
pub(crate) fn constructor_call<'t>(
    file: &SourceFile<'_>,
    base: usize,
    piece: Piece<'t>,
) -> Option<(&'t str, usize, usize)> {
    let text = piece.text.strip_prefix("new ").unwrap_or(piece.text).trim_start();
    let skipped = piece.text.len() - text.len();
    let paren = text.find('(')?;
    let head = &text[..paren];
    if head.is_empty() || !head.bytes().all(|b| is_ident_byte(b) || b == b'.') {
        return None;
    }
    let open = base + piece.offset + skipped + paren;
    let close = file.lexer().find_closing(open)?;
    if close + 1 != base + piece.offset + piece.text.len() {
        return None;
    }
    let ctor = head.rsplit('.').next().unwrap_or(head);
    Some((ctor, open, close))
}

/// Keyword arguments (`Tool(name=...)`) or a single object (`new Tool({...})`)
pub(crate) fn constructor_info(file: &SourceFile<'_>, open: usize, close: usize) -> ObjectInfo {
    let args = file.slice(open + 1, close).split_top_level(b',');
    if let [only] = args.as_slice() {
        if let Some((o, c)) = object_span(file, open + 1, *only) {
            return read_object(file, o, c, b':');
        }
    }
    read_object(file, open, close, b'=')
}

/// Braces of a piece that ends in an object body: `{...}`, `mcp.Tool{...}`
/// or `&Tool{...}`
pub(crate) fn trailing_object(file: &SourceFile<'_>, base: usize, piece: Piece<'_>) -> Option<(usize, usize)> {
    if !piece.text.ends_with('}') {
        return None;
    }
    let brace = piece.text.find('{')?;
    let head = &piece.text[..brace];
    if !head
        .bytes()
        .all(|b| is_ident_byte(b) || matches!(b, b'.' | b':' | b'&' | b' '))
    {
        return None;
    }
    let open = base + piece.offset + brace;
    let close = file.lexer().find_closing(open)?;
    (close + 1 == base + piece.offset + piece.text.len()).then_some((open, close))
}

/// Skip whitespace, comments and attribute or decorator lines starting at `pos`
pub(crate) fn skip_prelude(file: &SourceFile<'_>, mut pos: usize) -> usize {
    let bytes = file.text.as_bytes();
    let lexer = file.lexer();
    while pos < bytes.len() {
        let b = bytes[pos];
        if b.is_ascii_whitespace() || !file.is_code(pos) {
            pos += 1;
            continue;
        }
        let attribute_open = match (file.ecosystem, b) {
            (Ecosystem::Rust, b'#') if bytes.get(pos + 1) == Some(&b'[') => Some(pos + 1),
            (Ecosystem::CSharp, b'[') => Some(pos),
            (Ecosystem::Python | Ecosystem::Java, b'@') => {
                let mut end = pos + 1;
                while end < bytes.len() && (is_ident_byte(bytes[end]) || bytes[end] == b'.') {
                    end += 1;
                }
                let after = end + count_spaces(&bytes[end..]);
                if bytes.get(after) == Some(&b'(') {
                    Some(after)
                } else {
                    pos = end;
                    continue;
                }
            }
            _ => None,
        };
        match attribute_open.and_then(|open| lexer.find_closing(open)) {
            Some(close) => pos = close + 1,
            None => break,
        }
    }
    pos
}

fn count_spaces(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|b| **b == b' ' || **b == b'\t').count()
}

/// A function or method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Signature {
    pub name: String,
    pub params_open: usize,
    pub params_close: usize,
}

static PYTHON_DEF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:async\s+)?def\s+(?P<name>\w+)\s*\(").expect("valid regex"));

static RUST_FN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^(?:pub(?:\([^)]*\))?\s+)?(?:(?:const|async|unsafe|extern(?:\s+"[^"]*")?)\s+)*fn\s+(?P<name>\w+)\s*(?:<[^>(]*>)?\s*\("#,
    )
    .expect("valid regex")
});

static METHOD_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?:public|private|protected|internal|static|final|async|override|virtual|sealed|abstract|synchronized|default|partial|extern|new)\s+)*(?:<[^>]*>\s*)?[\w<>\[\],.?]+(?:\s*<[^>(]*>)?\s+(?P<name>\w+)\s*\(",
    )
    .expect("valid regex")
});

/// Signature of the declaration starting at `pos`, if any
pub(crate) fn signature_at(file: &SourceFile<'_>, pos: usize) -> Option<Signature> {
    let re: &Regex = match file.ecosystem {
        Ecosystem::Python => &PYTHON_DEF,
        Ecosystem::Rust => &RUST_FN,
        Ecosystem::CSharp | Ecosystem::Java => &METHOD_DECL,
        _ => return None,
    };
    let rest = file.text.get(pos..)?;
    let caps = re.captures(rest)?;
    let whole = caps.get(0)?;
    let params_open = pos + whole.end() - 1;
    let params_close = file.lexer().find_closing(params_open)?;
    Some(Signature {
        name: caps.name("name")?.as_str().to_string(),
        params_open,
        params_close,
    })
}

/// Parameter names treated as injected context rather than inputs
const CONTEXT_NAMES: [&str; 4] = ["self", "cls", "ctx", "context"];

/// Parameter types treated as injected context rather than inputs
const CONTEXT_TYPES: [&str; 8] = [
    "Context",
    "RequestContext",
    "CancellationToken",
    "IMcpServer",
    "McpServer",
    "ToolContext",
    "Peer",
    "IProgress",
];

/// Number of caller-supplied parameters in a signature
pub(crate) fn signature_parameters(file: &SourceFile<'_>, sig: &Signature) -> usize {
    let params = file.slice(sig.params_open + 1, sig.params_close);
    merge_generic_pieces(params.split_top_level(b','))
        .iter()
        .filter(|param| is_input_parameter(file.ecosystem, param))
        .count()
}

/// Re-join pieces split inside `<...>`, which the lexer does not track
fn merge_generic_pieces(pieces: Vec<Piece<'_>>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut depth = 0i32;
    for piece in pieces {
        let opens = piece.text.matches('<').count() as i32;
        let closes = piece.text.matches('>').count() as i32 - piece.text.matches("->").count() as i32
            - piece.text.matches("=>").count() as i32;
        if depth > 0 {
            if let Some(last) = merged.last_mut() {
                last.push(',');
                last.push_str(piece.text);
            }
        } else {
            merged.push(piece.text.to_string());
        }
        depth = (depth + opens - closes).max(0);
    }
    merged
}

fn is_input_parameter(ecosystem: Ecosystem, param: &str) -> bool {
    let param = param.trim();
    if matches!(param, "*" | "/" | "") {
        return false;
    }
    let (name, ty) = match ecosystem {
        Ecosystem::Python | Ecosystem::Rust => {
            let cut = param.find(['=']).unwrap_or(param.len());
            let decl = &param[..cut];
            match decl.split_once(':') {
                Some((name, ty)) => (name.trim(), ty.trim()),
                None => (decl.trim(), ""),
            }
        }
        _ => {
            // `final Type name`, `[Description("..")] string name = null`
            let decl = strip_leading_attributes(param);
            let decl = decl.split('=').next().unwrap_or(decl).trim();
            match decl.rsplit_once(char::is_whitespace) {
                Some((ty, name)) => (name.trim(), ty.trim()),
                None => (decl, ""),
            }
        }
    };
    let name = name
        .trim_start_matches(['*', '&'])
        .trim_start_matches("mut ")
        .trim();
    if CONTEXT_NAMES.contains(&name) || name.ends_with("self") {
        return false;
    }
    let ty_base = ty
        .trim_start_matches(['&', '@'])
        .split(['<', '[', '?'])
        .next()
        .unwrap_or("")
        .rsplit(['.', ':'])
        .next()
        .unwrap_or("")
        .trim();
    !CONTEXT_TYPES.contains(&ty_base)
}

fn strip_leading_attributes(mut decl: &str) -> &str {
    loop {
        decl = decl.trim_start();
        if decl.starts_with('[') {
            match decl.find(']') {
                Some(end) => decl = &decl[end + 1..],
                None => return decl,
            }
        } else if decl.starts_with('@') {
            // java parameter annotations: `@ToolParam(description = "x") String q`
            let rest = &decl[1..];
            let ident_end = rest
                .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
                .unwrap_or(rest.len());
            let after = rest[ident_end..].trim_start();
            if after.starts_with('(') {
                let lexer = Lexer::new(after, crate::lexer::Syntax::C_LIKE);
                match lexer.find_closing(0) {
                    Some(close) => decl = &after[close + 1..],
                    None => return decl,
                }
            } else {
                decl = after;
            }
        } else if let Some(rest) = decl.strip_prefix("final ") {
            decl = rest;
        } else {
            return decl;
        }
    }
}

/// First line of the `///`, `/** */` or `<summary>` doc block directly
/// above the line containing `pos`. Attribute lines between the doc block
/// and `pos` are passed over.
pub(crate) fn doc_before(file: &SourceFile<'_>, pos: usize) -> Option<String> {
    let line_start = file.text[..pos].rfind('\n').map(|p| p + 1).unwrap_or(0);
    let mut doc_lines: Vec<&str> = Vec::new();
    for line in file.text[..line_start].lines().rev() {
        let trimmed = line.trim();
        let is_doc = trimmed.starts_with("///")
            || trimmed.starts_with("/**")
            || trimmed.starts_with('*')
            || trimmed.starts_with("*/");
        if is_doc {
            doc_lines.push(trimmed);
            if trimmed.starts_with("/**") {
                break;
            }
            continue;
        }
        let is_attribute = trimmed.starts_with("#[") || trimmed.starts_with('@') || trimmed.starts_with('[');
        if is_attribute && doc_lines.is_empty() {
            continue;
        }
        break;
    }
    doc_lines.reverse();
    doc_lines
        .into_iter()
        .map(clean_doc_line)
        .take_while(|l| !l.starts_with('@') && !l.starts_with("<param") && !l.starts_with("<returns"))
        .find(|l| !l.is_empty())
}

fn clean_doc_line(line: &str) -> String {
    let line = line
        .trim_start_matches("///")
        .trim_start_matches("/**")
        .trim_end_matches("*/")
        .trim_start_matches('*')
        .trim();
    let line = line.replace("<summary>", "").replace("</summary>", "");
    line.trim().to_string()
}

/// First line of the docstring in the body of the Python def whose
/// parameter list closes at `params_close`
pub(crate) fn docstring_after(file: &SourceFile<'_>, params_close: usize) -> Option<String> {
    let after = file.slice(params_close + 1, file.text.len());
    let colon = after.find_top_level(|bytes, i| bytes[i] == b':')?;
    let body_start = params_close + 1 + colon + 1;
    let rest = &file.text[body_start..];
    let lead = rest.len() - rest.trim_start().len();
    let start = body_start + lead;
    let (offset, doc) = file.slice(start, file.text.len()).first_string()?;
    if offset != 0 {
        return None;
    }
    first_line(&doc)
}

pub(crate) fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
