//! Same-file resolution of identifiers used where a literal was expected.
//!
//! `server.tool(ECHO_TOOL, ...)`, `name: ToolName.ECHO` and tables listing
//! `const` tool objects by name are all resolved against definitions found
//! in the same file. Nothing crosses file boundaries.

use crate::lexer::{is_ident_byte, CodeMask, Lexer};
use crate::values::loose_string;
use regex::Regex;

pub struct Resolver<'s, 'a> {
    lexer: Lexer<'a>,
    mask: &'s CodeMask,
}

impl<'s, 'a> Resolver<'s, 'a> {
    pub fn new(lexer: Lexer<'a>, mask: &'s CodeMask) -> Self {
        Self { lexer, mask }
    }

    /// Name an expression stands for: a literal, a string constant or an
    /// enum member.
    pub fn name_of(&self, expr: Lexer<'_>) -> Option<String> {
        if let Some(value) = loose_string(expr) {
            return Some(value);
        }
        let text = expr.whole()?.text;
        if !is_path(text) {
            return None;
        }
        let segments: Vec<&str> = text
            .split(['.', ':'])
            .filter(|s| !s.is_empty())
            .collect();
        match segments.as_slice() {
            [ident] => self.string_constant(ident),
            [.., owner, member] => self
                .enum_member(owner, member)
                .or_else(|| self.string_constant(member)),
            [] => None,
        }
    }

    /// Value of `IDENT = "..."` style definitions (`const`, `let`, `var`,
    /// Go const blocks, Python module constants, Rust `const`).
    pub fn string_constant(&self, ident: &str) -> Option<String> {
        let pattern = format!(
            r"(?m)(?:^|[^\w$.]){}\s*(?::[^=\n;]*)?=",
            regex::escape(ident)
        );
        let re = Regex::new(&pattern).ok()?;
        let text = self.lexer.text();
        for m in re.find_iter(text) {
            let eq = m.end() - 1;
            if !self.mask.is_code(eq) || matches!(text.as_bytes().get(eq + 1), Some(b'=' | b'>')) {
                continue;
            }
            let line_end = text[eq..].find('\n').map(|p| eq + p).unwrap_or(text.len());
            let value = text[eq + 1..line_end]
                .trim()
                .trim_end_matches([';', ','])
                .trim_end();
            let start = eq + 1 + (text[eq + 1..].len() - text[eq + 1..].trim_start().len());
            if let Some(found) = loose_string(self.lexer.sub(start, start + value.len())) {
                return Some(found);
            }
        }
        None
    }

    /// `enum Owner { MEMBER = "value" }`
    pub fn enum_member(&self, owner: &str, member: &str) -> Option<String> {
        let pattern = format!(r"\benum\s+{}\s*\{{", regex::escape(owner));
        let re = Regex::new(&pattern).ok()?;
        let m = re.find(self.lexer.text())?;
        let open = m.end() - 1;
        let close = self.lexer.find_closing(open)?;
        let body = self.lexer.sub(open + 1, close);
        body.fields(b'=')
            .into_iter()
            .find(|f| f.key == member)
            .and_then(|f| body.piece(f.value).string_expr())
    }

    /// Byte range of the braces of `IDENT = { ... }`
    pub fn object_definition(&self, ident: &str) -> Option<(usize, usize)> {
        let pattern = format!(
            r"(?m)(?:^|[^\w$.]){}\s*(?::[^=\n;]*)?=\s*\{{",
            regex::escape(ident)
        );
        let re = Regex::new(&pattern).ok()?;
        let found = re
            .find_iter(self.lexer.text())
            .map(|m| m.end() - 1)
            .filter(|open| self.mask.is_code(*open))
            .find_map(|open| self.lexer.find_closing(open).map(|close| (open, close)));
        found
    }
}

/// `ident`, `a.b.c` or `a::b`
pub(crate) fn is_path(text: &str) -> bool {
    !text.is_empty()
        && text
            .bytes()
            .all(|b| is_ident_byte(b) || b == b'.' || b == b':')
        && text
            .bytes()
            .next()
            .is_some_and(|b| !b.is_ascii_digit() && b != b'.' && b != b':')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Syntax;

    fn resolve(source: &str, syntax: Syntax, expr: &str) -> Option<String> {
        let lexer = Lexer::new(source, syntax);
        let mask = lexer.mask();
        Resolver::new(lexer, &mask).name_of(Lexer::new(expr, syntax))
    }

    #[test]
    fn resolves_string_constants() {
        let src = "const ECHO_TOOL = \"echo\";\nlet other: string = 'x';";
        assert_eq!(resolve(src, Syntax::JS, "ECHO_TOOL").as_deref(), Some("echo"));
        assert_eq!(resolve(src, Syntax::JS, "other").as_deref(), Some("x"));
        assert_eq!(resolve(src, Syntax::JS, "missing"), None);
    }

    #[test]
    fn ignores_comparisons_and_comments() {
        let src = "// NAME = \"commented\"\nif (NAME == \"b\") {}\nNAME = \"real\"";
        assert_eq!(resolve(src, Syntax::JS, "NAME").as_deref(), Some("real"));
    }

    #[test]
    fn resolves_enum_members() {
        let src = "enum ToolName {\n  ECHO = \"echo\",\n  ADD = \"add\",\n}";
        assert_eq!(resolve(src, Syntax::JS, "ToolName.ADD").as_deref(), Some("add"));
    }

    #[test]
    fn resolves_go_const_blocks_and_python_classes() {
        let go = "const (\n\tToolFetch = \"fetch\"\n)";
        assert_eq!(resolve(go, Syntax::GO, "ToolFetch").as_deref(), Some("fetch"));

        let py = "class Tools(str, Enum):\n    LIST = \"list_files\"\n";
        assert_eq!(resolve(py, Syntax::PYTHON, "Tools.LIST").as_deref(), Some("list_files"));
    }

    #[test]
    fn rust_const_with_type() {
        let src = "pub const TOOL: &str = \"scan\";";
        assert_eq!(resolve(src, Syntax::RUST, "TOOL").as_deref(), Some("scan"));
    }

    #[test]
    fn finds_object_definitions() {
        let src = "const EchoTool: Tool = {\n  name: \"echo\",\n};";
        let lexer = Lexer::new(src, Syntax::JS);
        let mask = lexer.mask();
        let (open, close) = Resolver::new(lexer, &mask)
            .object_definition("EchoTool")
            .unwrap();
        assert_eq!(&src[open..=close], "{\n  name: \"echo\",\n}");
    }
}
