use legiscan_api::types::{BillDetail, BillText, Envelope, Session};

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}

fn payload<T: serde::de::DeserializeOwned>(fixture: &str, member: &str) -> T {
    let envelope: Envelope = serde_json::from_str(&load_fixture(fixture)).unwrap();
    serde_json::from_value(envelope.payload[member].clone()).unwrap()
}

#[test]
fn deserialize_sessions_with_integer_flags() {
    let sessions: Vec<Session> = payload("sessions.json", "sessions");
    assert_eq!(sessions.len(), 3);

    assert_eq!(sessions[0].session_id, 2150);
    assert!(sessions[0].special);
    assert!(!sessions[0].prior);

    assert_eq!(sessions[1].session_name, "2025-2026 Regular Session");
    assert!(!sessions[1].special);

    assert!(sessions[2].prior);
    assert_eq!(sessions[2].year_end, 2024);
}

#[test]
fn session_round_trips_through_serialized_form() {
    let sessions: Vec<Session> = payload("sessions.json", "sessions");
    let json = serde_json::to_string(&sessions).unwrap();
    let back: Vec<Session> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sessions);
}

#[test]
fn deserialize_bill_detail() {
    let bill: BillDetail = payload("bill.json", "bill");
    assert_eq!(bill.bill_id, 1890002);
    assert_eq!(bill.bill_number, "AB2");
    assert_eq!(bill.change_hash, "b2d0f3a1c8e45d6fa02b3c4d5e6f7081");
    assert_eq!(bill.sponsors.len(), 2);
    assert_eq!(bill.texts[0].doc_id, 3100002);
    assert_eq!(bill.texts[0].doc_type, "Amended");
    assert_eq!(bill.history.len(), 2);
}

#[test]
fn primary_sponsor_uses_sponsor_type_when_role_is_a_title() {
    let bill: BillDetail = payload("bill.json", "bill");
    assert_eq!(bill.primary_sponsor(), Some("Tom Okafor"));
}

#[test]
fn latest_action_falls_back_to_history() {
    let bill: BillDetail = payload("bill.json", "bill");
    assert!(bill.last_action.is_none());
    let (date, action) = bill.latest_action();
    assert_eq!(date, Some("2025-04-02"));
    assert_eq!(action, Some("Read third time. Passed."));
}

#[test]
fn deserialize_bill_text() {
    let text: BillText = payload("bill_text.json", "text");
    assert_eq!(text.doc_id, 3100002);
    assert_eq!(text.mime.as_deref(), Some("text/html"));
    assert!(text.doc.is_some());
    assert!(text.text.is_none());
    assert!(text.alt_doc.is_none());
}

#[test]
fn error_envelope_exposes_alert_message() {
    let envelope: Envelope = serde_json::from_str(&load_fixture("error.json")).unwrap();
    assert!(envelope.is_error());
    assert_eq!(envelope.error_message(), "Unknown session id");
}

#[test]
fn null_string_fields_deserialize_as_empty() {
    let bill: BillDetail = serde_json::from_value(serde_json::json!({
        "bill_id": 77,
        "bill_number": "SB9",
        "title": null,
        "description": null,
        "url": null,
        "change_hash": "h9",
        "sponsors": [{"people_id": 1, "name": null, "role": null}],
        "texts": [{"doc_id": 5, "type": null, "url": null}],
        "history": [{"date": "2025-01-02", "action": null}]
    }))
    .unwrap();
    assert_eq!(bill.bill_number, "SB9");
    assert_eq!(bill.title, "");
    assert_eq!(bill.description, "");
    assert_eq!(bill.url, "");
    assert_eq!(bill.sponsors[0].name, "");
    assert_eq!(bill.texts[0].doc_type, "");
    assert_eq!(bill.history[0].action, "");

    let entry: legiscan_api::types::MasterListEntry = serde_json::from_value(serde_json::json!({
        "bill_id": 77,
        "number": "SB9",
        "title": null,
        "url": null,
        "change_hash": "h9"
    }))
    .unwrap();
    assert_eq!(entry.title, "");
}
