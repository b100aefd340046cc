//! HTTP surface tests: a real listener on an ephemeral port, an in-memory
//! store, and `reqwest` as the client.

use std::io::{Cursor, Write};
use std::sync::Arc;

use serde_json::{json, Value};
use sred_harness::config::parse_config;
use sred_harness::server::{serve, AppState};
use sred_harness::store::memory::InMemoryStore;
use tempfile::TempDir;
use tokio::net::TcpListener;
use zip::write::SimpleFileOptions;

struct TestServer {
    base: String,
    _tmp: TempDir,
}

async fn start_server() -> TestServer {
    let tmp = TempDir::new().unwrap();
    let ontology = tmp.path().join("ontology.yaml");
    std::fs::write(
        &ontology,
        "facets:\n  Uncertainty:\n    any: [failed, unknown]\n  Evidence:\n    any: [logs]\n",
    )
    .unwrap();
    let patents = tmp.path().join("patents.csv");
    std::fs::write(
        &patents,
        "number,abstract\n\
         US2019000001,An adaptive beamforming system steers antenna weights.\n\
         US2019000002,A battery state of charge estimator.\n",
    )
    .unwrap();

    let config = parse_config(&format!(
        "[db]\npath = \"{}\"\n[ontology]\npath = \"{}\"\n[server]\nmax_upload_bytes = 4096\n\
         [ip_scout]\npatents_path = \"{}\"\n",
        tmp.path().join("unused.sqlite").display(),
        ontology.display(),
        patents.display()
    ))
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = AppState::new(config, Arc::new(InMemoryStore::new()));
    tokio::spawn(async move {
        serve(listener, state).await.unwrap();
    });

    TestServer {
        base: format!("http://{}", addr),
        _tmp: tmp,
    }
}

fn sample_zip() -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, body) in [
        ("a.md", "The first calibration attempt failed."),
        ("b.txt", "Raw logs from the second run."),
        ("c.md", "Agenda for the offsite."),
        ("commits.json", "[]"),
    ] {
        writer
            .start_file(name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(body.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

async fn upload(client: &reqwest::Client, base: &str, body: Vec<u8>) -> reqwest::Response {
    client
        .post(format!("{}/upload", base))
        .header("content-type", "application/zip")
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let server = start_server().await;
    let body: Value = reqwest::get(format!("{}/health", server.base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_upload_then_evidence() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = upload(&client, &server.base, sample_zip()).await;
    assert_eq!(resp.status(), 200);
    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["documents"], 3);
    assert_eq!(report["chunks"], 3);
    assert_eq!(report["unchanged"], 0);

    let evidence: Value = client
        .get(format!("{}/evidence?facet=Uncertainty", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let evidence = evidence.as_array().unwrap();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0]["source_path"], "a.md");

    let all: Value = client
        .get(format!("{}/evidence", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_upload_corrupt_archive() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = upload(&client, &server.base, b"garbage".to_vec()).await;
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "archive_error");
}

#[tokio::test]
async fn test_upload_too_large() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = upload(&client, &server.base, vec![0u8; 8192]).await;
    assert_eq!(resp.status(), 413);
}

#[tokio::test]
async fn test_search_with_facets() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    upload(&client, &server.base, sample_zip()).await;

    let resp: Value = client
        .post(format!("{}/search", server.base))
        .json(&json!({ "query": "the run", "facets": ["Evidence"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let results = resp["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["path"], "b.txt");
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);

    let none: Value = client
        .post(format!("{}/search", server.base))
        .json(&json!({ "query": "calibration", "top_k": 0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(none["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_search_bad_request() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/search", server.base))
        .json(&json!({ "facets": ["Evidence"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_draft_and_export() {
    let server = start_server().await;
    let client = reqwest::Client::new();
    upload(&client, &server.base, sample_zip()).await;

    let draft: Value = client
        .post(format!("{}/draft", server.base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let sections = draft["sections"].as_array().unwrap();
    assert_eq!(sections.len(), 4);
    assert_eq!(sections[1]["section"], "Uncertainty");
    assert!(draft["citations"]
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["source_path"] == "a.md"));

    let resp = client
        .get(format!("{}/export", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let disposition = resp
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("sred_draft.md"));
    let report = resp.text().await.unwrap();
    assert!(report.starts_with("# SR&ED Draft"));
    assert!(report.contains("## Evidence Appendix"));
}

#[tokio::test]
async fn test_ip_scout_search() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/ip_scout/search", server.base))
        .query(&[("query", "adaptive beamforming")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["number"], "US2019000001");
    assert!(results[0]["score"].as_f64().unwrap() > 0.0);
    assert!(body["claim"].as_str().unwrap().contains("adaptive"));
}

#[tokio::test]
async fn test_ip_scout_requires_query() {
    let server = start_server().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/ip_scout/search", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "bad_request");
}
