use axum::http::StatusCode;

use super::{Harness, assert_status, survey_form};
use crate::report::NO_DATA;

#[tokio::test]
async fn empty_report_shows_a_placeholder() {
    let harness = Harness::new();
    let admin = harness.staff("admin").await;

    let res = admin.get("/report").await;
    assert_status(&res, StatusCode::OK);
    let body = res.text();
    assert!(body.contains(NO_DATA));
    assert!(!body.contains("data:image/svg+xml"));
}

#[tokio::test]
async fn report_lists_and_export_cover_every_response() {
    let harness = Harness::new();
    let admin = harness.staff("admin").await;

    for (name, answer) in [("alice", 2), ("bob", -1)] {
        let client = harness.member(name).await;
        client.get("/profile").await;
        for phase in ["before", "after"] {
            client.post("/survey").form(&survey_form(phase, answer)).await;
        }
    }
    assert_eq!(harness.response_count(), 4);

    let dashboard = admin.get("/admin-dashboard").await;
    assert_status(&dashboard, StatusCode::OK);
    assert!(dashboard.text().contains("/report"));

    let report = admin.get("/report").await;
    assert_status(&report, StatusCode::OK);
    let body = report.text();
    assert!(!body.contains(NO_DATA));
    assert_eq!(body.matches("data:image/svg+xml;base64,").count(), 9);

    let participants = admin.get("/participants").await;
    assert_status(&participants, StatusCode::OK);
    assert!(participants.text().contains("alice"));
    assert!(participants.text().contains("bob"));

    let all = admin.get("/responses").await;
    assert_status(&all, StatusCode::OK);
    assert!(all.text().contains("4 responses"));

    let before = admin.get("/responses?phase=before").await;
    assert_status(&before, StatusCode::OK);
    assert!(before.text().contains("2 responses"));
    assert!(before.text().contains("/responses/export.csv?phase=before"));

    let csv = admin.get("/responses/export.csv?phase=before").await;
    assert_status(&csv, StatusCode::OK);
    assert_eq!(csv.text().lines().count(), 3);

    let csv = admin.get("/responses/export.csv").await;
    assert_status(&csv, StatusCode::OK);
    assert!(
        csv.header("content-type")
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    let text = csv.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 5);
    assert!(lines[0].starts_with("name,gender,birth_date,phase,created_at,q1"));
}
