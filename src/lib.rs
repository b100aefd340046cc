//! # SR&ED Harness
//!
//! Evidence ingestion, facet tagging, and TF-IDF retrieval for drafting
//! SR&ED (Scientific Research & Experimental Development) reports.
//!
//! A project archive is split into offset-addressable chunks, each chunk is
//! tagged with the evidentiary facets whose keywords it mentions, and the
//! draft assembler retrieves the best-matching chunks for each report
//! section with citations back to the source text.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────────┐   ┌──────────┐
//! │ zip      │──▶│ Chunk + Tag     │──▶│ SQLite   │
//! │ archive  │   │ (ontology.yaml) │   │ store    │
//! └──────────┘   └─────────────────┘   └────┬─────┘
//!                                           │
//!                          ┌────────────────┤
//!                          ▼                ▼
//!                    ┌───────────┐    ┌───────────┐
//!                    │ TF-IDF    │───▶│ Draft +   │
//!                    │ retrieval │    │ report    │
//!                    └───────────┘    └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! sred init                          # create database
//! sred ingest project.zip            # chunk, tag, store
//! sred evidence --facet Evidence     # list tagged chunks
//! sred search "calibration drift"    # ranked chunks
//! sred export --output draft.md      # Markdown report
//! sred serve                         # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sliding-window chunking |
//! | [`ontology`] | Facet → keyword definitions |
//! | [`tagger`] | Keyword facet tagging |
//! | [`tfidf`] | TF-IDF vector space |
//! | [`retrieval`] | Corpus-relative ranking |
//! | [`draft`] | Section and citation assembly |
//! | [`ip_scout`] | Seed patent search and claim skeletons |
//! | [`export`] | Markdown report rendering |
//! | [`store`] | Record-store trait and in-memory backend |
//! | [`sqlite_store`] | SQLite record store |
//! | [`ingest`] | Archive ingestion pipeline |
//! | [`search`] | Resolved search results |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk;
pub mod config;
pub mod db;
pub mod draft;
pub mod error;
pub mod evidence;
pub mod export;
pub mod ingest;
pub mod ip_scout;
pub mod migrate;
pub mod models;
pub mod ontology;
pub mod retrieval;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod stats;
pub mod store;
pub mod tagger;
pub mod tfidf;
