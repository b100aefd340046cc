//! Facet ontology loading.
//!
//! The ontology maps each facet name to a set of keywords. A facet applies
//! to a chunk when *any* of its keywords occurs in the chunk text (see
//! [`crate::tagger`]).
//!
//! # Source Format
//!
//! ```yaml
//! facets:
//!   Technological_Uncertainty:
//!     any: [unknown, unstable, failed]
//!   Evidence:
//!     any: [logs, dataset]
//! ```
//!
//! A facet without an `any` list is kept but never matches. Keywords are
//! lower-cased at load time; empty keywords are dropped.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct OntologyFile {
    #[serde(default)]
    facets: BTreeMap<String, Option<FacetSpec>>,
}

#[derive(Debug, Default, Deserialize)]
struct FacetSpec {
    #[serde(default)]
    any: Vec<String>,
}

/// Read-only facet → keyword-set lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ontology {
    facets: BTreeMap<String, BTreeSet<String>>,
}

impl Ontology {
    /// Load an ontology from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read ontology file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_yaml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse an ontology from YAML text.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let file: OntologyFile = serde_yaml::from_str(source)
            .map_err(|e| Error::Config(format!("malformed ontology: {}", e)))?;

        Ok(Self::from_facets(file.facets.into_iter().map(|(facet, body)| {
            (facet, body.unwrap_or_default().any)
        })))
    }

    /// Build an ontology from `(facet, keywords)` pairs.
    pub fn from_facets<F, K, I>(facets: F) -> Self
    where
        F: IntoIterator<Item = (String, I)>,
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let facets = facets
            .into_iter()
            .map(|(facet, keywords)| {
                let keywords = keywords
                    .into_iter()
                    .map(|k| k.as_ref().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (facet, keywords)
            })
            .collect();
        Self { facets }
    }

    /// Lower-cased keywords for `facet`, if the facet exists.
    pub fn keywords(&self, facet: &str) -> Option<&BTreeSet<String>> {
        self.facets.get(facet)
    }

    /// Iterate `(facet, keywords)` in facet-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.facets.iter().map(|(f, k)| (f.as_str(), k))
    }

    /// Facet names in order.
    pub fn facet_names(&self) -> impl Iterator<Item = &str> {
        self.facets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
facets:
  Technological_Uncertainty:
    any: [Unknown, unstable, failed]
  Evidence:
    any:
      - logs
      - dataset
  Placeholder:
"#;

    #[test]
    fn test_parse_facets_and_keywords() {
        let ontology = Ontology::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(ontology.len(), 3);
        let kws = ontology.keywords("Technological_Uncertainty").unwrap();
        assert!(kws.contains("unknown"), "keywords are lower-cased");
        assert!(kws.contains("failed"));
        assert_eq!(ontology.keywords("Evidence").unwrap().len(), 2);
    }

    #[test]
    fn test_missing_keyword_list_is_empty() {
        let ontology = Ontology::from_yaml_str(SAMPLE).unwrap();
        assert!(ontology.keywords("Placeholder").unwrap().is_empty());
        let body_without_any = "facets:\n  Advancement: {}\n";
        let ontology = Ontology::from_yaml_str(body_without_any).unwrap();
        assert!(ontology.keywords("Advancement").unwrap().is_empty());
    }

    #[test]
    fn test_missing_facets_section() {
        let ontology = Ontology::from_yaml_str("version: 1\n").unwrap();
        assert!(ontology.is_empty());
    }

    #[test]
    fn test_empty_keywords_dropped() {
        let ontology = Ontology::from_yaml_str("facets:\n  A:\n    any: ['', x]\n").unwrap();
        let kws = ontology.keywords("A").unwrap();
        assert_eq!(kws.len(), 1);
        assert!(kws.contains("x"));
    }

    #[test]
    fn test_malformed_source_is_config_error() {
        let err = Ontology::from_yaml_str("facets: [unterminated").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = Ontology::from_yaml_str("facets:\n  A:\n    any: 12\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let ontology = Ontology::load(file.path()).unwrap();
        let names: Vec<&str> = ontology.facet_names().collect();
        assert_eq!(
            names,
            vec!["Evidence", "Placeholder", "Technological_Uncertainty"]
        );
    }

    #[test]
    fn test_load_missing_file_is_config_error() {
        let err = Ontology::load(Path::new("/nonexistent/ontology.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
