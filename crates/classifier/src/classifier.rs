use crate::error::{ClassifierError, Result};
use crate::taxonomy::{Dictionary, Taxonomy};
use atlas_model::{clamp_confidence, CategoryAssignment};
use serde::{Deserialize, Serialize};

/// Minimum normalised score a label needs to be assigned
pub const DEFAULT_THRESHOLD: f64 = 0.15;

/// What the classifier reads about one server
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierInput<'a> {
    pub description: &'a str,
    pub topics: &'a [String],
    pub capability_names: &'a [String],
}

/// Category and domain assignments of one server, each sorted by
/// descending confidence then name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub categories: Vec<CategoryAssignment>,
    pub domains: Vec<CategoryAssignment>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.domains.is_empty()
    }
}

/// Keyword-weighted classifier over a category and a domain taxonomy.
///
/// Each keyword counts at most once per field (description, topics,
/// capability names). A label's score is the matched weight, summed over all
/// three fields, divided by its dictionary's total weight and clamped to
/// `1.0`. One full dictionary match is the ceiling, so a label whose keywords
/// recur across fields saturates at `1.0` rather than scoring higher.
#[derive(Debug, Clone)]
pub struct Classifier {
    categories: Vec<CompiledLabel>,
    domains: Vec<CompiledLabel>,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct CompiledLabel {
    name: String,
    /// Space-padded keyword phrases with their weights
    terms: Vec<(String, f64)>,
    total: f64,
}

impl CompiledLabel {
    fn compile(name: &str, dictionary: &Dictionary) -> Self {
        let terms = dictionary
            .keywords()
            .filter_map(|(keyword, weight)| {
                let words = plain_words(keyword);
                (!words.is_empty()).then(|| (format!(" {} ", words.join(" ")), weight))
            })
            .collect();
        Self {
            name: name.to_string(),
            terms,
            total: dictionary.total_weight(),
        }
    }

    fn score(&self, fields: &[String]) -> f64 {
        if self.total <= 0.0 {
            return 0.0;
        }
        let raw: f64 = fields
            .iter()
            .map(|field| {
                self.terms
                    .iter()
                    .filter(|(term, _)| contains_term(field, term))
                    .map(|(_, weight)| weight)
                    .sum::<f64>()
            })
            .sum();
        clamp_confidence(raw / self.total)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::compile(&Taxonomy::categories(), &Taxonomy::domains(), DEFAULT_THRESHOLD)
    }
}

impl Classifier {
    pub fn new(categories: &Taxonomy, domains: &Taxonomy, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ClassifierError::invalid(format!(
                "threshold {threshold} is outside [0, 1]"
            )));
        }
        categories.validate()?;
        domains.validate()?;
        Ok(Self::compile(categories, domains, threshold))
    }

    fn compile(categories: &Taxonomy, domains: &Taxonomy, threshold: f64) -> Self {
        let compile = |taxonomy: &Taxonomy| -> Vec<CompiledLabel> {
            taxonomy
                .labels()
                .map(|(name, dictionary)| CompiledLabel::compile(name, dictionary))
                .collect()
        };
        Self {
            categories: compile(categories),
            domains: compile(domains),
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Assign categories and domains to one server
    pub fn classify(&self, input: ClassifierInput<'_>) -> Classification {
        let fields = fields_of(input);
        Classification {
            categories: self.assign(&self.categories, &fields),
            domains: self.assign(&self.domains, &fields),
        }
    }

    /// Categories only; empty when nothing clears the threshold
    pub fn categorize(&self, input: ClassifierInput<'_>) -> Vec<CategoryAssignment> {
        self.assign(&self.categories, &fields_of(input))
    }

    fn assign(&self, labels: &[CompiledLabel], fields: &[String]) -> Vec<CategoryAssignment> {
        let mut assignments: Vec<CategoryAssignment> = labels
            .iter()
            .filter_map(|label| {
                let score = label.score(fields);
                (score > 0.0 && score >= self.threshold)
                    .then(|| CategoryAssignment::new(label.name.clone(), score))
            })
            .collect();
        assignments.sort_by(CategoryAssignment::ordering);
        assignments
    }
}

/// Normalised, space-padded word streams, one per source field
fn fields_of(input: ClassifierInput<'_>) -> Vec<String> {
    let description = plain_words(input.description);
    let topics: Vec<String> = input.topics.iter().flat_map(|t| plain_words(t)).collect();
    let names: Vec<String> = input
        .capability_names
        .iter()
        .flat_map(|n| identifier_words(n))
        .collect();
    [description, topics, names]
        .into_iter()
        .filter(|words| !words.is_empty())
        .map(|words| format!(" {} ", words.join(" ")))
        .collect()
}

/// A padded term matches a whole word run, or its plural
fn contains_term(field: &str, term: &str) -> bool {
    if field.contains(term) {
        return true;
    }
    let stem = term.trim_end();
    field.contains(&format!("{stem}s "))
}

/// Lower-case words split on anything that is not alphanumeric
fn plain_words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Words of an identifier: `_`, `-`, `.` and camel-case humps separate words
/// (`getHTTPResponse` -> `get http response`)
fn identifier_words(ident: &str) -> Vec<String> {
    let mut words = Vec::new();
    for part in ident.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = part.chars().collect();
        let mut current = String::new();
        for (i, &ch) in chars.iter().enumerate() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1);
            let hump = ch.is_uppercase()
                && prev.is_some_and(|p| {
                    p.is_lowercase() || p.is_numeric() || (p.is_uppercase() && next.is_some_and(|n| n.is_lowercase()))
                });
            if hump && !current.is_empty() {
                words.push(current.to_lowercase());
                current.clear();
            }
            current.push(ch);
        }
        if !current.is_empty() {
            words.push(current.to_lowercase());
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn identifier_splitting() {
        assert_eq!(identifier_words("create_entities"), vec!["create", "entities"]);
        assert_eq!(identifier_words("listPullRequests"), vec!["list", "pull", "requests"]);
        assert_eq!(identifier_words("getHTTPResponse"), vec!["get", "http", "response"]);
        assert_eq!(identifier_words("s3-upload"), vec!["s3", "upload"]);
    }

    #[test]
    fn terms_match_whole_words_only() {
        let field = " read the dataset files ";
        assert!(contains_term(field, " dataset "));
        assert!(contains_term(field, " file "));
        assert!(!contains_term(field, " data "));
        assert!(!contains_term(field, " set "));
    }

    #[test]
    fn keyword_counted_once_per_field() {
        let taxonomy = {
            let mut t = Taxonomy::new();
            t.insert("db", Dictionary::new().with("sql", 1.0).with("table", 3.0));
            t
        };
        let classifier = Classifier::new(&taxonomy, &Taxonomy::new(), 0.1).unwrap();
        let topics = vec!["sql".to_string()];
        let input = ClassifierInput {
            description: "sql sql sql sql",
            topics: &topics,
            ..Default::default()
        };
        // once in the description, once in topics: 2 of 4
        assert_eq!(classifier.categorize(input), vec![CategoryAssignment::new("db", 0.5)]);
    }

    #[test]
    fn repeated_evidence_across_fields_saturates() {
        let taxonomy = {
            let mut t = Taxonomy::new();
            t.insert("db", Dictionary::new().with("sql", 1.0).with("table", 1.0));
            t
        };
        let classifier = Classifier::new(&taxonomy, &Taxonomy::new(), 0.1).unwrap();
        let topics = vec!["sql".to_string(), "table".to_string()];
        let names = vec!["sql_table".to_string()];
        let input = ClassifierInput {
            description: "sql table",
            topics: &topics,
            capability_names: &names,
        };
        // 6 of 2 matched, capped
        assert_eq!(classifier.categorize(input), vec![CategoryAssignment::new("db", 1.0)]);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        assert!(Classifier::new(&Taxonomy::categories(), &Taxonomy::domains(), 1.5).is_err());
    }
}
