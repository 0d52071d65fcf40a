//! Delimiter-aware scanning over source text.
//!
//! Matchers never parse a full grammar. They anchor on a regex hit and then
//! use this module to find the end of a call or literal, split arguments at
//! the top level and read string literals. Comments and string contents are
//! skipped so that a `)` inside `"a)b"` does not end a call early.

/// Comment and literal rules for one ecosystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Syntax {
    /// Line comment introducer
    pub line_comment: Option<&'static str>,
    /// `/* ... */`
    pub block_comments: bool,
    /// `'...'` is a string (or rune) literal
    pub single_quotes: bool,
    /// `` `...` `` is a literal
    pub backticks: bool,
    /// Backslash escapes apply inside backtick literals
    pub backtick_escapes: bool,
    /// `"""..."""` and `'''...'''`
    pub triple_quotes: bool,
    /// `'x'` char literals, with `'a` lifetimes left alone
    pub char_literals: bool,
    /// `r"..."` and `r#"..."#`
    pub raw_strings: bool,
}

impl Syntax {
    pub const JS: Syntax = Syntax {
        line_comment: Some("//"),
        block_comments: true,
        single_quotes: true,
        backticks: true,
        backtick_escapes: true,
        triple_quotes: false,
        char_literals: false,
        raw_strings: false,
    };

    pub const GO: Syntax = Syntax {
        line_comment: Some("//"),
        block_comments: true,
        single_quotes: true,
        backticks: true,
        backtick_escapes: false,
        triple_quotes: false,
        char_literals: false,
        raw_strings: false,
    };

    pub const PYTHON: Syntax = Syntax {
        line_comment: Some("#"),
        block_comments: false,
        single_quotes: true,
        backticks: false,
        backtick_escapes: false,
        triple_quotes: true,
        char_literals: false,
        raw_strings: false,
    };

    pub const RUST: Syntax = Syntax {
        line_comment: Some("//"),
        block_comments: true,
        single_quotes: false,
        backticks: false,
        backtick_escapes: false,
        triple_quotes: false,
        char_literals: true,
        raw_strings: true,
    };

    pub const C_LIKE: Syntax = Syntax {
        line_comment: Some("//"),
        block_comments: true,
        single_quotes: true,
        backticks: false,
        backtick_escapes: false,
        triple_quotes: false,
        char_literals: false,
        raw_strings: false,
    };

    pub const PLAIN: Syntax = Syntax {
        line_comment: None,
        block_comments: false,
        single_quotes: false,
        backticks: false,
        backtick_escapes: false,
        triple_quotes: false,
        char_literals: false,
        raw_strings: false,
    };
}

/// What starts at a given byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Code,
    Comment(usize),
    Literal(Literal),
    Unterminated,
}

/// A literal's extent and the part that holds its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Literal {
    end: usize,
    content_start: usize,
    content_end: usize,
    escapes: bool,
}

/// A trimmed sub-slice together with its offset in the lexer's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece<'a> {
    pub offset: usize,
    pub text: &'a str,
}

/// A `key: value` (or `key = value`) entry of an object-like body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field<'a> {
    pub key: String,
    pub value: Piece<'a>,
}

/// Byte ranges occupied by comments and literals
#[derive(Debug, Clone, Default)]
pub struct CodeMask {
    ranges: Vec<(usize, usize)>,
}

impl CodeMask {
    /// True when `pos` is outside every comment and literal
    pub fn is_code(&self, pos: usize) -> bool {
        let idx = self.ranges.partition_point(|(start, _)| *start <= pos);
        if idx == 0 {
            return true;
        }
        let (_, end) = self.ranges[idx - 1];
        pos >= end
    }
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

fn closer_for(b: u8) -> Option<u8> {
    match b {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Scanner over one text
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'a> {
    text: &'a str,
    syntax: Syntax,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, syntax: Syntax) -> Self {
        Self { text, syntax }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn syntax(&self) -> Syntax {
        self.syntax
    }

    /// Lexer over `start..end` of this text
    pub fn sub(&self, start: usize, end: usize) -> Lexer<'a> {
        let end = end.min(self.text.len());
        let start = start.min(end);
        Lexer {
            text: self.text.get(start..end).unwrap_or(""),
            syntax: self.syntax,
        }
    }

    /// Lexer over a piece previously produced by this lexer
    pub fn piece(&self, piece: Piece<'a>) -> Lexer<'a> {
        Lexer {
            text: piece.text,
            syntax: self.syntax,
        }
    }

    fn skip_at(&self, pos: usize) -> Skip {
        let bytes = self.text.as_bytes();
        let Some(&b) = bytes.get(pos) else {
            return Skip::Code;
        };
        let rest = &bytes[pos..];

        if let Some(lc) = self.syntax.line_comment {
            if rest.starts_with(lc.as_bytes()) {
                let end = rest
                    .iter()
                    .position(|&c| c == b'\n')
                    .map(|p| pos + p)
                    .unwrap_or(bytes.len());
                return Skip::Comment(end);
            }
        }

        if self.syntax.block_comments && rest.starts_with(b"/*") {
            let end = find_subslice(&bytes[pos + 2..], b"*/")
                .map(|p| pos + 2 + p + 2)
                .unwrap_or(bytes.len());
            return Skip::Comment(end);
        }

        if self.syntax.raw_strings && b == b'r' {
            let starts_token = pos == 0 || !is_ident_byte(bytes[pos - 1]);
            if starts_token {
                let hashes = rest[1..].iter().take_while(|&&c| c == b'#').count();
                if rest.get(1 + hashes) == Some(&b'"') {
                    let content_start = pos + 2 + hashes;
                    let mut closing = Vec::with_capacity(hashes + 1);
                    closing.push(b'"');
                    closing.extend(std::iter::repeat(b'#').take(hashes));
                    return match find_subslice(&bytes[content_start..], &closing) {
                        Some(p) => Skip::Literal(Literal {
                            end: content_start + p + closing.len(),
                            content_start,
                            content_end: content_start + p,
                            escapes: false,
                        }),
                        None => Skip::Unterminated,
                    };
                }
            }
        }

        if self.syntax.triple_quotes && (rest.starts_with(b"\"\"\"") || rest.starts_with(b"'''"))
        {
            let delim = &rest[..3];
            let mut i = pos + 3;
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    i += 2;
                    continue;
                }
                if bytes[i..].starts_with(delim) {
                    return Skip::Literal(Literal {
                        end: i + 3,
                        content_start: pos + 3,
                        content_end: i,
                        escapes: true,
                    });
                }
                i += 1;
            }
            return Skip::Unterminated;
        }

        if self.syntax.char_literals && b == b'\'' {
            return self.char_literal(pos);
        }

        let quoted = b == b'"'
            || (b == b'\'' && self.syntax.single_quotes)
            || (b == b'`' && self.syntax.backticks);
        if !quoted {
            return Skip::Code;
        }

        let multiline = b == b'`';
        let escapes = b != b'`' || self.syntax.backtick_escapes;
        let mut i = pos + 1;
        while i < bytes.len() {
            let c = bytes[i];
            if escapes && c == b'\\' {
                i += 2;
                continue;
            }
            if c == b {
                return Skip::Literal(Literal {
                    end: i + 1,
                    content_start: pos + 1,
                    content_end: i,
                    escapes,
                });
            }
            if c == b'\n' && !multiline {
                return Skip::Unterminated;
            }
            i += 1;
        }
        Skip::Unterminated
    }

    /// `'x'` and `'\n'` are literals; `'a` in `&'a str` is not
    fn char_literal(&self, pos: usize) -> Skip {
        let bytes = self.text.as_bytes();
        if bytes.get(pos + 1) == Some(&b'\\') {
            let close = bytes[pos + 2..]
                .iter()
                .take(10)
                .position(|&c| c == b'\'')
                .map(|p| pos + 2 + p);
            return match close {
                Some(end) => Skip::Literal(Literal {
                    end: end + 1,
                    content_start: pos + 1,
                    content_end: end,
                    escapes: true,
                }),
                None => Skip::Code,
            };
        }
        let Some(ch) = self.text.get(pos + 1..).and_then(|s| s.chars().next()) else {
            return Skip::Code;
        };
        let close = pos + 1 + ch.len_utf8();
        if bytes.get(close) == Some(&b'\'') {
            Skip::Literal(Literal {
                end: close + 1,
                content_start: pos + 1,
                content_end: close,
                escapes: false,
            })
        } else {
            Skip::Code
        }
    }

    /// Index of the delimiter closing the one at `open`.
    ///
    /// `None` when `open` is not an opener, the text ends first, a literal
    /// is unterminated or closers are mismatched.
    pub fn find_closing(&self, open: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut stack = vec![closer_for(*bytes.get(open)?)?];
        let mut i = open + 1;
        while i < bytes.len() {
            match self.skip_at(i) {
                Skip::Comment(end) => {
                    i = end;
                    continue;
                }
                Skip::Literal(lit) => {
                    i = lit.end;
                    continue;
                }
                Skip::Unterminated => return None,
                Skip::Code => {}
            }
            let b = bytes[i];
            if let Some(closer) = closer_for(b) {
                stack.push(closer);
            } else if matches!(b, b')' | b']' | b'}') {
                if stack.pop() != Some(b) {
                    return None;
                }
                if stack.is_empty() {
                    return Some(i);
                }
            }
            i += 1;
        }
        None
    }

    /// Byte ranges of comments and literals in the whole text
    pub fn mask(&self) -> CodeMask {
        let bytes = self.text.as_bytes();
        let mut ranges = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match self.skip_at(i) {
                Skip::Comment(end) => {
                    ranges.push((i, end));
                    i = end.max(i + 1);
                }
                Skip::Literal(lit) => {
                    ranges.push((i, lit.end));
                    i = lit.end;
                }
                Skip::Unterminated => {
                    let end = bytes[i..]
                        .iter()
                        .position(|&c| c == b'\n')
                        .map(|p| i + p)
                        .unwrap_or(bytes.len());
                    ranges.push((i, end));
                    i = end.max(i + 1);
                }
                Skip::Code => i += 1,
            }
        }
        CodeMask { ranges }
    }

    /// First position at bracket depth zero, outside literals, where `pred` holds
    pub fn find_top_level(&self, mut pred: impl FnMut(&[u8], usize) -> bool) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut depth = 0usize;
        let mut i = 0;
        while i < bytes.len() {
            match self.skip_at(i) {
                Skip::Comment(end) => {
                    i = end.max(i + 1);
                    continue;
                }
                Skip::Literal(lit) => {
                    i = lit.end;
                    continue;
                }
                Skip::Unterminated => return None,
                Skip::Code => {}
            }
            let b = bytes[i];
            if depth == 0 && pred(bytes, i) {
                return Some(i);
            }
            if closer_for(b).is_some() {
                depth += 1;
            } else if matches!(b, b')' | b']' | b'}') {
                depth = depth.saturating_sub(1);
            }
            i += 1;
        }
        None
    }

    /// Split on `sep` at depth zero; pieces are trimmed and empty ones dropped
    pub fn split_top_level(&self, sep: u8) -> Vec<Piece<'a>> {
        let mut pieces = Vec::new();
        let mut start = 0;
        let mut rest = *self;
        loop {
            match rest.find_top_level(|bytes, i| bytes[i] == sep) {
                Some(rel) => {
                    self.push_trimmed(&mut pieces, start, start + rel);
                    start += rel + 1;
                    rest = self.sub(start, self.text.len());
                }
                None => {
                    self.push_trimmed(&mut pieces, start, self.text.len());
                    break;
                }
            }
        }
        pieces
    }

    fn push_trimmed(&self, pieces: &mut Vec<Piece<'a>>, start: usize, end: usize) {
        if let Some(piece) = self.trimmed(start, end) {
            pieces.push(piece);
        }
    }

    /// Trimmed piece for `start..end`, or `None` when only whitespace remains
    pub fn trimmed(&self, start: usize, end: usize) -> Option<Piece<'a>> {
        let raw = self.text.get(start..end)?;
        let lead = raw.len() - raw.trim_start().len();
        let text = raw.trim();
        (!text.is_empty()).then_some(Piece {
            offset: start + lead,
            text,
        })
    }

    /// Whole text as a trimmed piece
    pub fn whole(&self) -> Option<Piece<'a>> {
        self.trimmed(0, self.text.len())
    }

    /// Entries of an object-like body (the text between the braces).
    ///
    /// `sep` is `b':'` for JS objects, Go and Rust struct literals and Python
    /// dicts, `b'='` for keyword arguments. With `b':'`, shorthand entries
    /// (`{ name }`) produce a field whose value is the key itself. Spreads and
    /// positional items are ignored.
    pub fn fields(&self, sep: u8) -> Vec<Field<'a>> {
        let mut fields = Vec::new();
        for item in self.split_top_level(b',') {
            let item_lexer = self.piece(item);
            let split = if sep == b'=' {
                item_lexer.find_top_level(is_assignment)
            } else {
                item_lexer.find_top_level(|bytes, i| {
                    bytes[i] == sep && bytes.get(i + 1) != Some(&sep) && (i == 0 || bytes[i - 1] != sep)
                })
            };
            match split {
                Some(at) => {
                    let Some(key) = item_lexer.key_at(0, at) else {
                        continue;
                    };
                    if let Some(value) = item_lexer.trimmed(at + 1, item.text.len()) {
                        fields.push(Field {
                            key,
                            value: Piece {
                                offset: item.offset + value.offset,
                                text: value.text,
                            },
                        });
                    }
                }
                None => {
                    if sep == b':' && item.text.bytes().all(is_ident_byte) {
                        fields.push(Field {
                            key: item.text.to_string(),
                            value: item,
                        });
                    }
                }
            }
        }
        fields
    }

    fn key_at(&self, start: usize, end: usize) -> Option<String> {
        let piece = self.trimmed(start, end)?;
        if piece.text.starts_with("...") {
            return None;
        }
        if let Some(key) = self.piece(piece).string_expr() {
            return Some(key);
        }
        piece
            .text
            .bytes()
            .all(is_ident_byte)
            .then(|| piece.text.to_string())
    }

    fn literal_at(&self, pos: usize) -> Option<(Literal, usize)> {
        let bytes = self.text.as_bytes();
        // python string prefixes (f"", r"", rb"")
        let mut quote = pos;
        if self.syntax.triple_quotes {
            while quote < bytes.len()
                && quote - pos < 2
                && matches!(bytes[quote], b'r' | b'R' | b'b' | b'B' | b'u' | b'U' | b'f' | b'F')
            {
                quote += 1;
            }
        }
        match self.skip_at(quote) {
            Skip::Literal(lit) => {
                let raw_prefix = bytes[pos..quote]
                    .iter()
                    .any(|&c| c == b'r' || c == b'R');
                let lit = Literal {
                    escapes: lit.escapes && !raw_prefix,
                    ..lit
                };
                Some((lit, lit.end))
            }
            _ => None,
        }
    }

    fn literal_value(&self, lit: Literal) -> String {
        let raw = &self.text[lit.content_start..lit.content_end];
        if lit.escapes {
            unescape(raw)
        } else {
            raw.to_string()
        }
    }

    /// Value of a text made only of string literals, joined by `+` or
    /// juxtaposition and optionally wrapped in one pair of parentheses.
    pub fn string_expr(&self) -> Option<String> {
        let text = self.text.trim();
        let lead = self.text.len() - self.text.trim_start().len();
        if text.starts_with('(') {
            let close = self.find_closing(lead)?;
            if self.text[close + 1..].trim().is_empty() {
                return self.sub(lead + 1, close).string_expr();
            }
            return None;
        }

        let bytes = self.text.as_bytes();
        let mut value = String::new();
        let mut i = lead;
        let mut parts = 0;
        loop {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() {
                break;
            }
            if parts > 0 && bytes[i] == b'+' {
                i += 1;
                continue;
            }
            let (lit, end) = self.literal_at(i)?;
            value.push_str(&self.literal_value(lit));
            parts += 1;
            i = end;
        }
        (parts > 0).then_some(value)
    }

    /// First string literal anywhere in the text, with its offset
    pub fn first_string(&self) -> Option<(usize, String)> {
        let bytes = self.text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match self.skip_at(i) {
                Skip::Comment(end) => i = end.max(i + 1),
                Skip::Literal(lit) => return Some((i, self.literal_value(lit))),
                Skip::Unterminated => return None,
                Skip::Code => i += 1,
            }
        }
        None
    }
}

/// `=` that is an assignment rather than part of `==`, `=>`, `<=`, `>=` or `!=`
pub(crate) fn is_assignment(bytes: &[u8], i: usize) -> bool {
    if bytes[i] != b'=' {
        return false;
    }
    let next = bytes.get(i + 1).copied();
    let prev = if i > 0 { Some(bytes[i - 1]) } else { None };
    !matches!(next, Some(b'=') | Some(b'>'))
        && !matches!(prev, Some(b'=') | Some(b'!') | Some(b'<') | Some(b'>'))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            // line continuation
            Some('\n') => {}
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
