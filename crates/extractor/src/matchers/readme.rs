use super::{CapabilityMatcher, Extraction, SourceFile};
use crate::ecosystem::Ecosystem;
use atlas_model::{CapabilityKind, Confidence};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<level>#{1,6})\s+(?P<title>.+?)\s*#*\s*$").expect("valid regex"));

static ENTRY_FORMS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        // - tool_name: description
        Regex::new(r"^\s*[-*+]\s+`?(?P<name>[\w-]+)`?\s*(?:[:\-–]\s*|\s+)(?P<desc>\S.*)$").expect("valid regex"),
        // 1. tool_name - description
        Regex::new(r"^\s*\d+[.)]\s+`?(?P<name>[\w-]+)`?\s*(?:[:\-–]\s*|\s+)(?P<desc>\S.*)$").expect("valid regex"),
        // `tool_name`: description
        Regex::new(r"^\s*`(?P<name>[\w-]+)`\s*[:\-–]\s*(?P<desc>\S.*)$").expect("valid regex"),
    ]
});

const GENERIC_NAMES: [&str; 4] = ["tool", "tools", "function", "method"];

/// Bullet lists under `## Tools`, `## Prompts` and `## Resources` headings
/// of a README. Only consulted when code yields nothing.
pub struct ReadmeFallbackMatcher;

impl ReadmeFallbackMatcher {
    pub const ID: &'static str = "readme_fallback";
}

fn section_kind(title: &str) -> Option<CapabilityKind> {
    let lowered = title.trim().trim_matches(['*', '_', '`', ':']).to_ascii_lowercase();
    let first = lowered.split_whitespace().next().unwrap_or("");
    match first {
        "tool" | "tools" => Some(CapabilityKind::Tool),
        "prompt" | "prompts" => Some(CapabilityKind::Prompt),
        "resource" | "resources" => Some(CapabilityKind::Resource),
        _ => match lowered.as_str() {
            "available tools" => Some(CapabilityKind::Tool),
            "available prompts" => Some(CapabilityKind::Prompt),
            "available resources" => Some(CapabilityKind::Resource),
            _ => None,
        },
    }
}

fn usable_name(name: &str) -> bool {
    name.chars().count() >= 3 && !GENERIC_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

impl CapabilityMatcher for ReadmeFallbackMatcher {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn ecosystems(&self) -> &'static [Ecosystem] {
        &[Ecosystem::Markdown]
    }

    fn confidence(&self) -> Confidence {
        0.3
    }

    fn extract(&self, file: &SourceFile<'_>) -> Extraction {
        let mut out = Extraction::default();
        // (kind, heading level) of the section being read
        let mut section: Option<(CapabilityKind, usize)> = None;
        let mut in_fence = false;
        let mut offset = 0;

        for line in file.text.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                continue;
            }
            if in_fence {
                continue;
            }

            if let Some(caps) = HEADING.captures(line) {
                let level = caps.name("level").map_or(1, |m| m.as_str().len());
                let title = caps.name("title").map_or("", |m| m.as_str());
                match section_kind(title) {
                    Some(kind) => section = Some((kind, level)),
                    None => {
                        if section.is_some_and(|(_, open)| level <= open) {
                            section = None;
                        }
                    }
                }
                continue;
            }

            let Some((kind, _)) = section else { continue };
            let Some(caps) = ENTRY_FORMS.iter().find_map(|re| re.captures(line)) else {
                continue;
            };
            let (Some(name), Some(desc)) = (caps.name("name"), caps.name("desc")) else {
                continue;
            };
            if !usable_name(name.as_str()) {
                continue;
            }
            out.candidates.push(
                self.candidate(file, kind, name.as_str(), line_start + name.start())
                    .description(desc.as_str().trim()),
            );
        }
        out
    }
}
