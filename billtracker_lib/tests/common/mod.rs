//! Shared wiremock scaffolding for sync and ingestion tests.
#![allow(dead_code)]

use std::time::Duration;

use billtracker_lib::{CachedClient, SyncOptions};
use serde_json::{json, Map, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_ID: i64 = 2121;

pub const BILL_BODY: &str = "SECTION 1. The Legislature finds that access to clean drinking water is a \
    basic need. SECTION 2. The department shall administer grants to small community water systems.";

/// One master-list row: (bill_id, change_hash).
pub type Row<'a> = (i64, &'a str);

pub fn number(bill_id: i64) -> String {
    format!("AB{}", bill_id)
}

/// Later ids have later action dates, so the engine visits them first.
pub fn action_date(bill_id: i64) -> String {
    format!("2025-03-{:02}", bill_id % 28 + 1)
}

pub fn sessions_body() -> Value {
    json!({
        "status": "OK",
        "sessions": [
            {
                "session_id": 2150,
                "year_start": 2025,
                "year_end": 2025,
                "prior": 0,
                "special": 1,
                "session_name": "2025 1st Extraordinary Session"
            },
            {
                "session_id": SESSION_ID,
                "year_start": 2025,
                "year_end": 2026,
                "prior": 0,
                "special": 0,
                "session_name": "2025-2026 Regular Session"
            }
        ]
    })
}

pub fn master_list_body(rows: &[Row<'_>]) -> Value {
    let mut list = Map::new();
    list.insert(
        "session".to_string(),
        json!({ "session_id": SESSION_ID, "session_name": "2025-2026 Regular Session" }),
    );
    for (i, (bill_id, hash)) in rows.iter().enumerate() {
        list.insert(
            i.to_string(),
            json!({
                "bill_id": bill_id,
                "number": number(*bill_id),
                "change_hash": hash,
                "url": format!("https://legiscan.com/CA/bill/{}/2025", number(*bill_id)),
                "status_date": "2025-01-15",
                "status": 1,
                "last_action_date": action_date(*bill_id),
                "last_action": "Referred to Com. on N.R. & W.",
                "title": format!("Water quality act {}", bill_id)
            }),
        );
    }
    json!({ "status": "OK", "masterlist": list })
}

pub fn bill_body(bill_id: i64, hash: &str) -> Value {
    json!({
        "status": "OK",
        "bill": {
            "bill_id": bill_id,
            "change_hash": hash,
            "url": format!("https://legiscan.com/CA/bill/{}/2025", number(bill_id)),
            "state_link": format!("https://leginfo.legislature.ca.gov/{}", number(bill_id)),
            "status": 1,
            "status_date": "2025-01-15",
            "bill_number": number(bill_id),
            "title": format!("Water quality act {}", bill_id),
            "description": "An act to add Section 116275 to the Health and Safety Code.",
            "history": [
                { "date": "2025-01-15", "action": "Introduced.", "chamber": "A" },
                { "date": action_date(bill_id), "action": "Referred to Com. on N.R. & W.", "chamber": "A" }
            ],
            "sponsors": [
                { "people_id": 1, "name": "Ana Ruiz", "role": "Asm", "sponsor_type_id": 1 }
            ],
            "texts": [
                { "doc_id": 1000 + bill_id, "date": "2025-01-15", "type": "Introduced", "url": "https://legiscan.com/text" }
            ]
        }
    })
}

pub fn text_body(doc_id: i64) -> Value {
    json!({
        "status": "OK",
        "text": {
            "doc_id": doc_id,
            "bill_id": doc_id - 1000,
            "date": "2025-01-15",
            "type": "Introduced",
            "mime": "text/plain",
            "text": BILL_BODY
        }
    })
}

pub async fn mount_sessions(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("op", "getSessionList"))
        .respond_with(ResponseTemplate::new(200).set_body_json(sessions_body()))
        .mount(server)
        .await;
}

pub async fn mount_master_list(server: &MockServer, rows: &[Row<'_>]) {
    Mock::given(method("GET"))
        .and(query_param("op", "getMasterListRaw"))
        .and(query_param("id", SESSION_ID.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(master_list_body(rows)))
        .mount(server)
        .await;
}

pub async fn mount_bills(server: &MockServer, rows: &[Row<'_>]) {
    for (bill_id, hash) in rows {
        Mock::given(method("GET"))
            .and(query_param("op", "getBill"))
            .and(query_param("id", bill_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(bill_body(*bill_id, hash)))
            .mount(server)
            .await;
    }
}

pub async fn mount_texts(server: &MockServer, rows: &[Row<'_>]) {
    for (bill_id, _) in rows {
        let doc_id = 1000 + bill_id;
        Mock::given(method("GET"))
            .and(query_param("op", "getBillText"))
            .and(query_param("id", doc_id.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(text_body(doc_id)))
            .mount(server)
            .await;
    }
}

/// Mounts a full, healthy jurisdiction.
pub async fn mount_jurisdiction(server: &MockServer, rows: &[Row<'_>]) {
    mount_sessions(server).await;
    mount_master_list(server, rows).await;
    mount_bills(server, rows).await;
    mount_texts(server, rows).await;
}

/// Requests received so far for one LegiScan operation.
pub async fn count_op(server: &MockServer, op: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|req| req.url.query_pairs().any(|(k, v)| k == "op" && v == op))
        .count()
}

pub async fn count_all(server: &MockServer) -> usize {
    server.received_requests().await.unwrap_or_default().len()
}

pub fn test_client(server: &MockServer) -> CachedClient {
    CachedClient::with_base_url(&server.uri(), "test-key")
        .unwrap()
        .with_min_interval(Duration::ZERO)
}

pub fn fast_options() -> SyncOptions {
    SyncOptions {
        bill_delay: Duration::ZERO,
        ..SyncOptions::default()
    }
}
