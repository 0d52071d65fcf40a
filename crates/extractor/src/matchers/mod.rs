//! Capability matchers.
//!
//! Each matcher recognises one family of code shapes and emits
//! [`CapabilityCandidate`]s carrying its fixed confidence:
//!
//! | matcher             | shapes                                          | confidence |
//! |---------------------|-------------------------------------------------|------------|
//! | `registration_call` | `server.tool("x", ...)`, `mcp.NewTool("x", ..)` | 0.90       |
//! | `annotation`        | `@mcp.tool()`, `#[tool]`, `[McpServerTool]`     | 0.85       |
//! | `constant_table`    | `const TOOLS: Tool[] = [...]`, `tools: [...]`   | 0.80       |
//! | `struct_literal`    | `mcp.Tool{Name: "x"}`, `Tool { name: .. }`      | 0.70       |
//! | `export_pattern`    | `export const fooTools = ...`                   | 0.40       |
//! | `readme_fallback`   | `## Tools` sections of a README                 | 0.30       |

mod annotation;
mod decl;
mod export;
mod readme;
mod registration;
mod struct_literal;
mod table;

pub use annotation::AnnotationMatcher;
pub use export::ExportPatternMatcher;
pub use readme::ReadmeFallbackMatcher;
pub use registration::RegistrationCallMatcher;
pub use struct_literal::StructLiteralMatcher;
pub use table::ConstantTableMatcher;

use crate::ecosystem::Ecosystem;
use crate::error::ExtractIssue;
use crate::lexer::{CodeMask, Lexer, Piece};
use crate::resolve::Resolver;
use atlas_model::{CapabilityCandidate, CapabilityKind, Confidence};

/// One decoded file handed to matchers
pub struct SourceFile<'a> {
    pub path: &'a str,
    pub ecosystem: Ecosystem,
    pub text: &'a str,
    lexer: Lexer<'a>,
    mask: CodeMask,
}

impl<'a> SourceFile<'a> {
    pub fn new(path: &'a str, ecosystem: Ecosystem, text: &'a str) -> Self {
        let lexer = Lexer::new(text, ecosystem.syntax());
        let mask = lexer.mask();
        Self {
            path,
            ecosystem,
            text,
            lexer,
            mask,
        }
    }

    pub fn lexer(&self) -> Lexer<'a> {
        self.lexer
    }

    /// Lexer over `start..end` of the file
    pub fn slice(&self, start: usize, end: usize) -> Lexer<'a> {
        self.lexer.sub(start, end)
    }

    /// Lexer over a piece whose offset is relative to `base`
    pub fn at(&self, base: usize, piece: Piece<'_>) -> Lexer<'a> {
        let start = base + piece.offset;
        self.lexer.sub(start, start + piece.text.len())
    }

    pub fn is_code(&self, pos: usize) -> bool {
        self.mask.is_code(pos)
    }

    pub fn resolver(&self) -> Resolver<'_, 'a> {
        Resolver::new(self.lexer, &self.mask)
    }
}

/// Output of one matcher over one file
#[derive(Debug, Default)]
pub struct Extraction {
    pub candidates: Vec<CapabilityCandidate>,
    pub issues: Vec<ExtractIssue>,
}

impl Extraction {
    pub(crate) fn malformed(
        &mut self,
        file: &SourceFile<'_>,
        matcher: &str,
        offset: usize,
        reason: impl Into<String>,
    ) {
        self.issues
            .push(ExtractIssue::malformed(file.path, matcher, offset, reason));
    }
}

/// A pattern family that turns source text into candidates
pub trait CapabilityMatcher: Send + Sync {
    /// Stable identifier recorded as `source_matcher`
    fn id(&self) -> &'static str;

    /// Ecosystems this matcher understands
    fn ecosystems(&self) -> &'static [Ecosystem];

    /// Confidence assigned to every candidate this matcher emits
    fn confidence(&self) -> Confidence;

    /// Scan one file
    fn extract(&self, file: &SourceFile<'_>) -> Extraction;

    fn applies_to(&self, ecosystem: Ecosystem) -> bool {
        self.ecosystems().contains(&ecosystem)
    }

    /// Fresh candidate stamped with this matcher's identity
    fn candidate(
        &self,
        file: &SourceFile<'_>,
        kind: CapabilityKind,
        name: &str,
        offset: usize,
    ) -> CapabilityCandidate {
        CapabilityCandidate::new(kind, name, file.path, self.id(), self.confidence()).at(offset)
    }
}

/// Description fields across the supported conventions
pub(crate) const DESCRIPTION_KEYS: [&str; 2] = ["description", "desc"];

/// Schema fields across the supported conventions
pub(crate) const SCHEMA_FIELDS: [&str; 7] = [
    "inputSchema",
    "input_schema",
    "argsSchema",
    "parameters",
    "arguments",
    "paramsSchema",
    "schema",
];

/// URI fields of resources
pub(crate) const URI_KEYS: [&str; 3] = ["uri", "uriTemplate", "uri_template"];

pub(crate) fn looks_like_uri(value: &str) -> bool {
    value.contains("://")
}
