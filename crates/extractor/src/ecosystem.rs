use crate::lexer::Syntax;
use std::path::Path;

/// Source ecosystem a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ecosystem {
    TypeScript,
    JavaScript,
    Python,
    Go,
    Rust,
    CSharp,
    Java,
    Markdown,
    Unknown,
}

impl Ecosystem {
    /// Code ecosystems the matchers understand
    pub const CODE: [Ecosystem; 7] = [
        Ecosystem::TypeScript,
        Ecosystem::JavaScript,
        Ecosystem::Python,
        Ecosystem::Go,
        Ecosystem::Rust,
        Ecosystem::CSharp,
        Ecosystem::Java,
    ];

    /// Detect ecosystem from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Ecosystem::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Ecosystem::JavaScript,
            "py" => Ecosystem::Python,
            "go" => Ecosystem::Go,
            "rs" => Ecosystem::Rust,
            "cs" | "csx" => Ecosystem::CSharp,
            "java" => Ecosystem::Java,
            "md" | "markdown" => Ecosystem::Markdown,
            _ => Ecosystem::Unknown,
        }
    }

    /// Detect ecosystem from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Ecosystem::Unknown)
    }

    /// Interpret a producer-supplied language hint ("TypeScript", "c#", "golang")
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().to_lowercase().as_str() {
            "typescript" | "ts" => Ecosystem::TypeScript,
            "javascript" | "js" | "node" => Ecosystem::JavaScript,
            "python" | "py" => Ecosystem::Python,
            "go" | "golang" => Ecosystem::Go,
            "rust" | "rs" => Ecosystem::Rust,
            "c#" | "csharp" | "cs" => Ecosystem::CSharp,
            "java" => Ecosystem::Java,
            "markdown" | "md" => Ecosystem::Markdown,
            _ => Ecosystem::Unknown,
        }
    }

    /// Get ecosystem name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Ecosystem::TypeScript => "typescript",
            Ecosystem::JavaScript => "javascript",
            Ecosystem::Python => "python",
            Ecosystem::Go => "go",
            Ecosystem::Rust => "rust",
            Ecosystem::CSharp => "csharp",
            Ecosystem::Java => "java",
            Ecosystem::Markdown => "markdown",
            Ecosystem::Unknown => "unknown",
        }
    }

    /// Display name used for `Language` graph nodes
    pub fn display_name(self) -> &'static str {
        match self {
            Ecosystem::TypeScript => "TypeScript",
            Ecosystem::JavaScript => "JavaScript",
            Ecosystem::Python => "Python",
            Ecosystem::Go => "Go",
            Ecosystem::Rust => "Rust",
            Ecosystem::CSharp => "C#",
            Ecosystem::Java => "Java",
            Ecosystem::Markdown => "Markdown",
            Ecosystem::Unknown => "Unknown",
        }
    }

    pub fn is_code(self) -> bool {
        Self::CODE.contains(&self)
    }

    /// Comment and literal rules used by the lexer
    pub fn syntax(self) -> Syntax {
        match self {
            Ecosystem::Python => Syntax::PYTHON,
            Ecosystem::Rust => Syntax::RUST,
            Ecosystem::Go => Syntax::GO,
            Ecosystem::TypeScript | Ecosystem::JavaScript => Syntax::JS,
            Ecosystem::CSharp | Ecosystem::Java => Syntax::C_LIKE,
            Ecosystem::Markdown | Ecosystem::Unknown => Syntax::PLAIN,
        }
    }
}
