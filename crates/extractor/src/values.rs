//! Interpretation of matched expressions: lenient string values and
//! parameter counts of input schemas.

use crate::lexer::{is_ident_byte, Lexer};

const MAX_UNWRAP: usize = 4;

/// Keys whose value is itself a schema to descend into
const SCHEMA_KEYS: [&str; 8] = [
    "inputschema",
    "input_schema",
    "argsschema",
    "paramsschema",
    "parameters",
    "arguments",
    "schema",
    "args_schema",
];

/// String value of an expression, looking through conversion wrappers such
/// as `"x".to_string()`, `String::from("x")` or `Some("x".into())`.
pub fn loose_string(lexer: Lexer<'_>) -> Option<String> {
    loose_string_at_depth(lexer, 0)
}

fn loose_string_at_depth(lexer: Lexer<'_>, depth: usize) -> Option<String> {
    if let Some(value) = lexer.string_expr() {
        return Some(value);
    }
    if depth >= MAX_UNWRAP {
        return None;
    }
    let piece = lexer.whole()?;
    let text = piece.text;

    for suffix in [".to_string()", ".into()", ".to_owned()", ".as_str()"] {
        if let Some(stripped) = text.strip_suffix(suffix) {
            let inner = lexer.sub(piece.offset, piece.offset + stripped.len());
            return loose_string_at_depth(inner, depth + 1);
        }
    }

    // `Wrapper(<one argument>)` or `path::to::ctor(...)`
    let open = text.find('(')?;
    let head = &text[..open];
    if head.is_empty()
        || !head
            .bytes()
            .all(|b| is_ident_byte(b) || b == b':' || b == b'.' || b == b'!')
    {
        return None;
    }
    let close = lexer.find_closing(piece.offset + open)?;
    if close + 1 != piece.offset + text.len() {
        return None;
    }
    let args = lexer.sub(piece.offset + open + 1, close);
    let parts = args.split_top_level(b',');
    if parts.len() != 1 {
        return None;
    }
    loose_string_at_depth(args.piece(parts[0]), depth + 1)
}

/// Number of parameters declared by a schema-ish expression.
///
/// Understands JSON schema objects (`properties`), zod-style shapes
/// (`{ a: z.string() }` or `z.object({...})`), argument arrays and Go
/// composite literals. Anything else, such as a reference to a schema
/// defined elsewhere, counts as zero.
pub fn count_parameters(lexer: Lexer<'_>) -> usize {
    count_at_depth(lexer, 0)
}

fn count_at_depth(lexer: Lexer<'_>, depth: usize) -> usize {
    if depth > MAX_UNWRAP {
        return 0;
    }
    let Some(piece) = lexer.whole() else {
        return 0;
    };
    let text = piece.text;

    if text.starts_with('[') && !text.starts_with("[]") {
        let Some(close) = lexer.find_closing(piece.offset) else {
            return 0;
        };
        return lexer
            .sub(piece.offset + 1, close)
            .split_top_level(b',')
            .len();
    }

    let Some((open, close)) = braced_body(lexer, piece.offset) else {
        return 0;
    };
    let body = lexer.sub(open + 1, close);

    // []Type{ {...}, {...} }
    if text.starts_with("[]") {
        return body.split_top_level(b',').len();
    }

    let fields = body.fields(b':');
    let find = |names: &[&str]| {
        fields
            .iter()
            .find(|f| names.iter().any(|n| f.key.eq_ignore_ascii_case(n)))
    };

    if let Some(props) = find(&["properties"]) {
        let props = lexer.sub(
            open + 1 + props.value.offset,
            open + 1 + props.value.offset + props.value.text.len(),
        );
        return match props.whole().and_then(|p| braced_body(props, p.offset)) {
            Some((o, c)) => props.sub(o + 1, c).fields(b':').len(),
            None => 0,
        };
    }

    for key in SCHEMA_KEYS {
        if let Some(field) = find(&[key]) {
            if field.value.text.contains(['{', '[']) {
                let inner = body.piece(field.value);
                return count_at_depth(inner, depth + 1);
            }
        }
    }

    if let Some(ty) = find(&["type"]) {
        if body.piece(ty.value).string_expr().is_some() {
            return 0;
        }
    }

    fields.len()
}

/// Positions of the first `{` in the expression and its closer, hopping
/// over empty type braces (`map[string]interface{}{ ... }`).
fn braced_body(lexer: Lexer<'_>, from: usize) -> Option<(usize, usize)> {
    let text = lexer.text();
    let mut open = from + text.get(from..)?.find('{')?;
    loop {
        let close = lexer.find_closing(open)?;
        let next = close + 1;
        if close == open + 1 && text.as_bytes().get(next) == Some(&b'{') {
            open = next;
            continue;
        }
        return Some((open, close));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Syntax;

    fn count(text: &str, syntax: Syntax) -> usize {
        count_parameters(Lexer::new(text, syntax))
    }

    #[test]
    fn json_schema_properties() {
        let schema = r#"{ type: "object", properties: { a: { type: "number" }, b: { type: "number" } }, required: ["a", "b"] }"#;
        assert_eq!(count(schema, Syntax::JS), 2);
    }

    #[test]
    fn zod_shapes() {
        assert_eq!(count("{ message: z.string(), times: z.number().optional() }", Syntax::JS), 2);
        assert_eq!(count("z.object({ query: z.string() })", Syntax::JS), 1);
        assert_eq!(count("{ type: z.enum(['a']), id: z.string() }", Syntax::JS), 2);
    }

    #[test]
    fn nested_input_schema() {
        let def = r#"{ inputSchema: { type: "object", properties: { path: {}, mode: {}, depth: {} } } }"#;
        assert_eq!(count(def, Syntax::JS), 3);
    }

    #[test]
    fn schema_without_properties_counts_zero() {
        assert_eq!(count(r#"{ type: "object" }"#, Syntax::JS), 0);
        assert_eq!(count("EchoSchema", Syntax::JS), 0);
    }

    #[test]
    fn python_dict_schema() {
        let schema = r#"{"type": "object", "properties": {"url": {"type": "string"}}}"#;
        assert_eq!(count(schema, Syntax::PYTHON), 1);
    }

    #[test]
    fn argument_arrays() {
        assert_eq!(count(r#"[{ name: "a" }, { name: "b" }]"#, Syntax::JS), 2);
        assert_eq!(
            count(r#"[]mcp.PromptArgument{ {Name: "a"}, {Name: "b"}, }"#, Syntax::GO),
            2
        );
    }

    #[test]
    fn go_map_properties() {
        let schema = r#"mcp.ToolInputSchema{ Type: "object", Properties: map[string]interface{}{ "a": map[string]string{}, "b": nil } }"#;
        assert_eq!(count(schema, Syntax::GO), 2);
    }

    #[test]
    fn loose_strings_unwrap_conversions() {
        let rust = |t: &str| loose_string(Lexer::new(t, Syntax::RUST));
        assert_eq!(rust(r#""x".to_string()"#).as_deref(), Some("x"));
        assert_eq!(rust(r#"Some("x".into())"#).as_deref(), Some("x"));
        assert_eq!(rust(r#"Cow::Borrowed("x")"#).as_deref(), Some("x"));
        assert_eq!(rust(r#"format!("{}", x)"#), None);
        assert_eq!(rust("name"), None);
    }
}
