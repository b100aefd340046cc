//! Prior-art scouting over a seed patent list.
//!
//! Patents are read from a CSV file with `number` and `abstract` columns
//! (other columns are ignored). A query is ranked against the abstracts in
//! a TF-IDF space fit on the whole list, and a claim skeleton is rendered
//! from the query so the user has a starting point for drafting.
//!
//! ```text
//! number,abstract
//! US2019000001,"An adaptive beamforming system ..."
//! ```

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::tfidf::VectorSpace;

/// One row of the seed patent list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Patent {
    pub number: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

/// A patent number and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatentHit {
    pub number: String,
    pub score: f64,
}

/// Ranked patents plus the claim skeleton for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoutReport {
    pub results: Vec<PatentHit>,
    pub claim: String,
}

/// Parse patents from CSV text with a header row.
pub fn parse_patents<R: Read>(reader: R) -> Result<Vec<Patent>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    rdr.deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.map_err(|e| Error::Config(format!("malformed patent row {}: {}", i + 1, e)))
        })
        .collect()
}

/// Load the seed patent list from `path`.
pub fn load_patents(path: &Path) -> Result<Vec<Patent>> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Config(format!(
            "failed to read patent list {}: {}",
            path.display(),
            e
        ))
    })?;
    parse_patents(file).map_err(|e| match e {
        Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    })
}

/// Rank `patents` by similarity of their abstracts to `query`.
///
/// Patents sharing no term with the query are dropped. Equal scores keep
/// list order, and `top_k <= 0` yields nothing.
pub fn search_patents(patents: &[Patent], query: &str, top_k: i64) -> Vec<PatentHit> {
    if top_k <= 0 || patents.is_empty() {
        return Vec::new();
    }

    let space = VectorSpace::fit(patents.iter().map(|p| p.abstract_text.as_str()));
    let q = space.transform(query);
    if q.is_zero() {
        return Vec::new();
    }

    let mut hits: Vec<PatentHit> = patents
        .iter()
        .map(|p| PatentHit {
            number: p.number.clone(),
            score: space.transform(&p.abstract_text).dot(&q),
        })
        .filter(|h| h.score > 0.0)
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k as usize);
    hits
}

/// Render a first independent claim from the words of `query`.
///
/// The claim's domain is the first purely alphabetic word of the query, or
/// `technology` when there is none.
pub fn render_claim_skeleton(query: &str) -> String {
    let domain = query
        .split_whitespace()
        .find(|w| w.chars().all(char::is_alphabetic))
        .unwrap_or("technology");
    let step = query.trim();

    format!(
        "1. A {domain} system, comprising:\n\
         \x20  a receiver configured to obtain {inputs};\n\
         \x20  a processor configured to perform {step}; and\n\
         \x20  an output stage configured to provide {outputs};\n\
         \x20  wherein the system is distinguished by {differentiator}.\n",
        domain = domain,
        inputs = "inputs",
        step = step,
        outputs = "outputs",
        differentiator = "unique aspect",
    )
}

/// Rank and render in one step.
pub fn scout(patents: &[Patent], query: &str, top_k: i64) -> ScoutReport {
    let results = search_patents(patents, query, top_k);
    debug!(query, patents = patents.len(), hits = results.len(), "ip scout");
    ScoutReport {
        results,
        claim: render_claim_skeleton(query),
    }
}

/// CLI entry point for `sred ip-scout <query>`.
pub fn run_ip_scout(
    config: &Config,
    query: &str,
    limit: Option<i64>,
    json: bool,
) -> anyhow::Result<()> {
    let patents = load_patents(&config.ip_scout.patents_path)?;
    let report = scout(&patents, query, limit.unwrap_or(config.ip_scout.top_k));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.results.is_empty() {
        println!("No matching patents.");
    }
    for (i, hit) in report.results.iter().enumerate() {
        println!("{}. {}  {:.4}", i + 1, hit.number, hit.score);
    }
    println!();
    println!("Claim skeleton:");
    print!("{}", report.claim);
    Ok(())
}
