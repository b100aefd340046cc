//! Keyword-driven facet tagging.
//!
//! A facet is assigned to a chunk iff at least one of its keywords occurs
//! anywhere in the chunk text, compared case-insensitively. There is no
//! tokenization or stemming: `"fail"` matches `"failed"` and `"unfailing"`.

use std::collections::BTreeSet;

use crate::ontology::Ontology;

/// Return the facets of `ontology` whose keywords appear in `text`.
pub fn tag(text: &str, ontology: &Ontology) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    ontology
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k.as_str())))
        .map(|(facet, _)| facet.to_string())
        .collect()
}
