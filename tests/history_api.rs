mod common;

use axum::http::StatusCode;
use chrono::{DateTime, Duration, TimeZone, Utc};

use checkin_server::models::ScanStatus;
use checkin_server::store::memory::NewTicket;

use common::TestApp;

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Three tickets with events spread over 2024-01-04 .. 2024-01-11.
fn seeded() -> TestApp {
    let app = TestApp::new();
    let store = &app.store;

    let vip = store
        .insert_ticket(NewTicket::new("QR-1", "A123", "VIP", 5))
        .unwrap();
    let standard = store
        .insert_ticket(NewTicket::new("QR-2", "xa1234", "Standard", 5))
        .unwrap();
    let other = store
        .insert_ticket(NewTicket::new("QR-3", "B999", "VIP", 5))
        .unwrap();

    store
        .insert_scan_at(Some(vip), ScanStatus::Success, at(2024, 1, 4, 12, 0, 0))
        .unwrap();
    store
        .insert_scan_at(Some(vip), ScanStatus::Success, at(2024, 1, 5, 0, 0, 0))
        .unwrap();
    store
        .insert_scan_at(Some(other), ScanStatus::Success, at(2024, 1, 7, 8, 0, 0))
        .unwrap();
    store
        .insert_scan_at(
            Some(standard),
            ScanStatus::Success,
            at(2024, 1, 10, 23, 59, 59) + Duration::milliseconds(500),
        )
        .unwrap();
    store
        .insert_scan_at(None, ScanStatus::Failed, at(2024, 1, 11, 0, 0, 0))
        .unwrap();

    app
}

fn numeros(body: &serde_json::Value) -> Vec<String> {
    body["scans"]
        .as_array()
        .unwrap()
        .iter()
        .map(|scan| scan["numero"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_history_requires_session() {
    let app = seeded();

    let (status, body) = app.get("/history", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = app.get("/history", Some("made-up-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_history_newest_first_with_placeholders() {
    let app = seeded();
    let token = app.staff_token().await;

    let (status, body) = app.get("/history", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        numeros(&body),
        vec!["Unknown", "xa1234", "B999", "A123", "A123"]
    );

    let newest = &body["scans"][0];
    assert_eq!(newest["type"], "Unknown");
    assert_eq!(newest["status"], "failed");
    assert_eq!(newest["createdAt"], "2024-01-11T00:00:00.000Z");
}

#[tokio::test]
async fn test_history_window_is_inclusive() {
    let app = seeded();
    let token = app.staff_token().await;

    let (status, body) = app
        .get("/history?start=2024-01-05&end=2024-01-10", Some(&token))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(numeros(&body), vec!["xa1234", "B999", "A123"]);
    assert_eq!(body["scans"][0]["createdAt"], "2024-01-10T23:59:59.500Z");
    assert_eq!(body["scans"][2]["createdAt"], "2024-01-05T00:00:00.000Z");
}

#[tokio::test]
async fn test_history_numero_filter_is_case_insensitive() {
    let app = seeded();
    let token = app.staff_token().await;

    let (status, body) = app.get("/history?q=A123", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let found = numeros(&body);
    assert_eq!(found, vec!["xa1234", "A123", "A123"]);
    assert!(found.iter().all(|n| n.to_lowercase().contains("a123")));
}

#[tokio::test]
async fn test_history_rejects_bad_dates() {
    let app = seeded();
    let token = app.staff_token().await;

    let (status, body) = app
        .get("/history?start=2024-01-10&end=2024-01-05", Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Start date must not be after end date");

    let (status, body) = app.get("/history?start=2024-02-30", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid start date: expected YYYY-MM-DD");

    let (status, _) = app.get("/history?end=10-01-2024", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_caps_at_one_hundred() {
    let app = TestApp::new();
    let id = app
        .store
        .insert_ticket(NewTicket::new("QR-1", "A1", "VIP", 500))
        .unwrap();
    let base = at(2024, 3, 1, 9, 0, 0);
    for i in 0..120 {
        app.store
            .insert_scan_at(Some(id), ScanStatus::Success, base + Duration::seconds(i))
            .unwrap();
    }
    let token = app.staff_token().await;

    let (status, body) = app.get("/history", Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    let scans = body["scans"].as_array().unwrap();
    assert_eq!(scans.len(), 100);
    assert_eq!(scans[0]["createdAt"], "2024-03-01T09:01:59.000Z");
}

#[tokio::test]
async fn test_stats_count_distinct_admitted_tickets() {
    let app = seeded();
    // A Standard ticket with only a failed attempt must not be counted.
    let never_admitted = app
        .store
        .insert_ticket(NewTicket::new("QR-4", "C1", "Standard", 1))
        .unwrap();
    app.store
        .insert_scan_at(Some(never_admitted), ScanStatus::Failed, Utc::now())
        .unwrap();

    let (status, body) = app.get("/stats", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "scans": [
                { "type": "Standard", "total": 1 },
                { "type": "VIP", "total": 2 }
            ]
        })
    );
}

#[tokio::test]
async fn test_tickets_listing_most_used_first() {
    let app = TestApp::new();
    app.store
        .insert_ticket(NewTicket::new("QR-1", "A1", "VIP", 5))
        .unwrap();
    app.store
        .insert_ticket(NewTicket::new("QR-2", "A2", "VIP", 5))
        .unwrap();
    app.scan("QR-2").await;
    app.scan("QR-2").await;
    let token = app.staff_token().await;

    let (status, _) = app.get("/tickets", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.get("/tickets", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let tickets = body["tickets"].as_array().unwrap();
    assert_eq!(tickets[0]["numero"], "A2");
    assert_eq!(tickets[0]["scans_used"], 2);
    assert_eq!(tickets[0]["scans"].as_array().unwrap().len(), 2);
    assert_eq!(tickets[0]["code"], "QR-2");
    assert_eq!(tickets[1]["numero"], "A1");
    assert_eq!(tickets[1]["scans_used"], 0);
}
