use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Weighted keywords and phrases of one label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dictionary {
    keywords: BTreeMap<String, f64>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, keyword: &str, weight: f64) -> Self {
        self.insert(keyword, weight);
        self
    }

    pub fn insert(&mut self, keyword: &str, weight: f64) {
        self.keywords.insert(keyword.to_lowercase(), weight);
    }

    pub fn keywords(&self) -> impl Iterator<Item = (&str, f64)> {
        self.keywords.iter().map(|(k, w)| (k.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// Highest score a single field can contribute
    pub fn total_weight(&self) -> f64 {
        self.keywords.values().sum()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut dictionary = Dictionary::new();
        for (keyword, weight) in iter {
            dictionary.insert(keyword, weight);
        }
        dictionary
    }
}

/// A set of labels (categories or domains), each with its dictionary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy {
    labels: BTreeMap<String, Dictionary>,
}

impl Taxonomy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, dictionary: Dictionary) {
        self.labels.insert(label.into(), dictionary);
    }

    pub fn get(&self, label: &str) -> Option<&Dictionary> {
        self.labels.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &Dictionary)> {
        self.labels.iter().map(|(l, d)| (l.as_str(), d))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Parse `[label]` tables of `keyword = weight` pairs
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: Taxonomy = toml::from_str(content)?;
        let taxonomy = raw.normalized();
        taxonomy.validate()?;
        log::debug!("loaded taxonomy with {} labels", taxonomy.len());
        Ok(taxonomy)
    }

    /// Lower-cased keywords, as matching expects
    pub(crate) fn normalized(self) -> Self {
        let labels = self
            .labels
            .into_iter()
            .map(|(label, dictionary)| {
                let dictionary: Dictionary = dictionary
                    .keywords
                    .iter()
                    .map(|(k, w)| (k.as_str(), *w))
                    .collect();
                (label, dictionary)
            })
            .collect();
        Self { labels }
    }

    /// Every label needs at least one keyword, and weights must be positive
    pub fn validate(&self) -> Result<()> {
        for (label, dictionary) in &self.labels {
            if label.trim().is_empty() {
                return Err(ClassifierError::invalid("empty label name"));
            }
            if dictionary.is_empty() {
                return Err(ClassifierError::invalid(format!(
                    "label '{label}' has no keywords"
                )));
            }
            if let Some((keyword, weight)) = dictionary
                .keywords()
                .find(|(k, w)| k.trim().is_empty() || !w.is_finite() || *w <= 0.0)
            {
                return Err(ClassifierError::invalid(format!(
                    "label '{label}': keyword '{keyword}' has invalid weight {weight}"
                )));
            }
        }
        Ok(())
    }

    /// Built-in functional categories
    pub fn categories() -> Self {
        let mut t = Taxonomy::new();
        t.insert(
            "database",
            Dictionary::from_iter([
                ("database", 3.0),
                ("sql", 3.0),
                ("query", 2.0),
                ("postgres", 2.0),
                ("postgresql", 2.0),
                ("mysql", 2.0),
                ("sqlite", 2.0),
                ("mongodb", 2.0),
                ("redis", 1.5),
                ("table", 1.0),
                ("schema", 1.0),
            ]),
        );
        t.insert(
            "web",
            Dictionary::from_iter([
                ("web", 2.0),
                ("http", 2.0),
                ("url", 2.0),
                ("browser", 2.5),
                ("scrape", 2.5),
                ("fetch", 1.5),
                ("html", 1.5),
                ("website", 2.0),
                ("crawl", 2.0),
                ("api", 1.0),
            ]),
        );
        t.insert(
            "filesystem",
            Dictionary::from_iter([
                ("file", 2.5),
                ("filesystem", 3.0),
                ("directory", 2.5),
                ("folder", 2.0),
                ("path", 1.0),
                ("read file", 1.5),
                ("write file", 1.5),
            ]),
        );
        t.insert(
            "git",
            Dictionary::from_iter([
                ("git", 3.0),
                ("github", 3.0),
                ("gitlab", 3.0),
                ("commit", 2.0),
                ("branch", 2.0),
                ("pull request", 2.0),
                ("repository", 1.5),
                ("issue", 1.0),
            ]),
        );
        t.insert(
            "ai",
            Dictionary::from_iter([
                ("ai", 2.5),
                ("llm", 3.0),
                ("model", 1.5),
                ("openai", 2.5),
                ("anthropic", 2.5),
                ("embedding", 2.0),
                ("machine learning", 2.5),
                ("agent", 1.5),
                ("prompt", 1.0),
            ]),
        );
        t.insert(
            "data",
            Dictionary::from_iter([
                ("data", 2.0),
                ("csv", 2.0),
                ("json", 1.0),
                ("analytics", 2.5),
                ("dataset", 2.5),
                ("spreadsheet", 2.0),
                ("transform", 1.0),
                ("visualization", 2.0),
            ]),
        );
        t.insert(
            "cloud",
            Dictionary::from_iter([
                ("cloud", 3.0),
                ("aws", 3.0),
                ("azure", 3.0),
                ("gcp", 3.0),
                ("kubernetes", 2.5),
                ("docker", 2.0),
                ("s3", 2.0),
                ("lambda", 1.5),
                ("deploy", 1.5),
            ]),
        );
        t.insert(
            "development",
            Dictionary::from_iter([
                ("code", 2.0),
                ("developer", 2.0),
                ("debug", 2.0),
                ("test", 1.5),
                ("build", 1.5),
                ("lint", 2.0),
                ("compile", 1.5),
                ("ide", 1.5),
                ("refactor", 2.0),
            ]),
        );
        t.insert(
            "communication",
            Dictionary::from_iter([
                ("slack", 3.0),
                ("email", 3.0),
                ("message", 2.0),
                ("chat", 2.0),
                ("discord", 3.0),
                ("notification", 1.5),
                ("send", 1.0),
                ("channel", 1.5),
            ]),
        );
        t.insert(
            "productivity",
            Dictionary::from_iter([
                ("task", 2.0),
                ("todo", 2.0),
                ("calendar", 2.5),
                ("notion", 3.0),
                ("note", 2.0),
                ("document", 1.5),
                ("project", 1.0),
                ("workflow", 1.5),
            ]),
        );
        t.insert(
            "time",
            Dictionary::from_iter([
                ("time", 3.0),
                ("timezone", 3.0),
                ("date", 2.0),
                ("clock", 2.0),
                ("schedule", 1.5),
                ("convert time", 1.0),
            ]),
        );
        t.insert(
            "memory",
            Dictionary::from_iter([
                ("memory", 3.0),
                ("knowledge graph", 3.0),
                ("remember", 2.0),
                ("entity", 1.5),
                ("entities", 1.5),
                ("relation", 1.5),
                ("observation", 1.5),
                ("persistent", 1.0),
            ]),
        );
        t.insert(
            "search",
            Dictionary::from_iter([
                ("search", 3.0),
                ("find", 1.5),
                ("lookup", 1.5),
                ("index", 1.5),
                ("retrieve", 1.5),
                ("semantic search", 2.0),
                ("brave", 2.0),
            ]),
        );
        t.insert(
            "security",
            Dictionary::from_iter([
                ("security", 3.0),
                ("vulnerability", 3.0),
                ("auth", 2.0),
                ("authentication", 2.0),
                ("secret", 2.0),
                ("encryption", 2.0),
                ("scan", 1.0),
                ("permission", 1.5),
            ]),
        );
        t
    }

    /// Built-in business domains
    pub fn domains() -> Self {
        let mut t = Taxonomy::new();
        t.insert(
            "software-engineering",
            Dictionary::from_iter([
                ("code", 2.0),
                ("git", 2.0),
                ("github", 2.0),
                ("developer", 2.0),
                ("ci", 1.5),
                ("pull request", 2.0),
                ("debug", 1.5),
                ("deploy", 1.0),
            ]),
        );
        t.insert(
            "data-analytics",
            Dictionary::from_iter([
                ("analytics", 3.0),
                ("data", 2.0),
                ("sql", 2.0),
                ("query", 1.5),
                ("dashboard", 2.0),
                ("metrics", 2.0),
                ("report", 1.5),
            ]),
        );
        t.insert(
            "knowledge-management",
            Dictionary::from_iter([
                ("knowledge", 3.0),
                ("note", 2.0),
                ("wiki", 2.5),
                ("document", 1.5),
                ("memory", 2.0),
                ("notion", 2.0),
                ("obsidian", 2.5),
            ]),
        );
        t.insert(
            "finance",
            Dictionary::from_iter([
                ("finance", 3.0),
                ("stock", 2.5),
                ("payment", 2.5),
                ("crypto", 2.5),
                ("bank", 2.5),
                ("invoice", 2.0),
                ("trading", 2.0),
                ("price", 1.0),
            ]),
        );
        t.insert(
            "commerce",
            Dictionary::from_iter([
                ("shop", 2.5),
                ("ecommerce", 3.0),
                ("order", 1.5),
                ("product", 1.5),
                ("cart", 2.5),
                ("shopify", 3.0),
                ("customer", 1.5),
            ]),
        );
        t.insert(
            "media",
            Dictionary::from_iter([
                ("video", 2.5),
                ("image", 2.5),
                ("audio", 2.5),
                ("youtube", 3.0),
                ("music", 2.5),
                ("spotify", 3.0),
                ("podcast", 2.0),
            ]),
        );
        t.insert(
            "infrastructure",
            Dictionary::from_iter([
                ("infrastructure", 3.0),
                ("kubernetes", 2.5),
                ("docker", 2.0),
                ("server", 1.0),
                ("cloud", 2.0),
                ("monitoring", 2.0),
                ("terraform", 2.5),
                ("network", 1.5),
            ]),
        );
        t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_taxonomies_are_valid() {
        let categories = Taxonomy::categories();
        assert!(categories.validate().is_ok());
        assert_eq!(categories.len(), 14);

        let domains = Taxonomy::domains();
        assert!(domains.validate().is_ok());
        assert_eq!(domains.len(), 7);
    }

    #[test]
    fn loads_from_toml() {
        let taxonomy = Taxonomy::from_toml_str(
            r#"
[weather]
forecast = 3.0
"air quality" = 1.5

[maps]
Geocode = 2
"#,
        )
        .unwrap();

        assert_eq!(taxonomy.len(), 2);
        let maps = taxonomy.get("maps").unwrap();
        assert_eq!(maps.keywords().collect::<Vec<_>>(), vec![("geocode", 2.0)]);
        assert_eq!(taxonomy.get("weather").unwrap().total_weight(), 4.5);
    }

    #[test]
    fn rejects_bad_weights_and_empty_labels() {
        assert!(Taxonomy::from_toml_str("[x]\nfoo = -1.0\n").is_err());
        assert!(Taxonomy::from_toml_str("[x]\n").is_err());
        assert!(matches!(
            Taxonomy::from_toml_str("[x]\nfoo = \"heavy\"\n"),
            Err(ClassifierError::Toml(_))
        ));
    }
}
