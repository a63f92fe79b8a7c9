use axum::http::StatusCode;

use super::{Harness, assert_redirect, assert_status, survey_form};

#[tokio::test]
async fn members_cannot_touch_other_participants() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;
    let bob = harness.member("bob").await;
    bob.get("/profile").await;
    let bobs = harness.participants_of("bob").remove(0);

    let res = alice.get(&format!("/survey/{bobs}")).await;
    assert_status(&res, StatusCode::FORBIDDEN);

    let res = alice
        .post(&format!("/survey/{bobs}"))
        .form(&survey_form("before", 1))
        .await;
    assert_status(&res, StatusCode::FORBIDDEN);
    assert_eq!(harness.response_count(), 0);

    // Same answer whether or not the record exists.
    let res = alice.get("/survey/no-such-participant").await;
    assert_status(&res, StatusCode::FORBIDDEN);

    // Their own record is fine.
    alice.get("/profile").await;
    let alices = harness.participants_of("alice").remove(0);
    let res = alice.get(&format!("/survey/{alices}")).await;
    assert_status(&res, StatusCode::OK);
}

#[tokio::test]
async fn members_are_kept_out_of_staff_pages() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;

    for path in [
        "/admin-dashboard",
        "/participants",
        "/responses",
        "/responses/export.csv",
        "/report",
    ] {
        let res = alice.get(path).await;
        assert_status(&res, StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_log_in() {
    let harness = Harness::new();
    let client = harness.client();

    assert_redirect!(client.get("/").await, "/login");
    assert_redirect!(client.get("/report").await, "/login?next=%2Freport");
    assert_redirect!(client.get("/survey").await, "/login?next=%2Fsurvey");
    assert_status(&client.get("/login").await, StatusCode::OK);
    assert_status(&client.get("/register").await, StatusCode::OK);
}

#[tokio::test]
async fn staff_have_no_survey_of_their_own() {
    let harness = Harness::new();
    let admin = harness.staff("admin").await;
    let alice = harness.member("alice").await;
    alice.get("/profile").await;
    let alices = harness.participants_of("alice").remove(0);

    for path in [
        "/profile".to_string(),
        "/survey".to_string(),
        "/new_participant".to_string(),
        format!("/survey/{alices}"),
    ] {
        assert_redirect!(admin.get(&path).await, "/admin-dashboard");
    }
    assert_redirect!(
        admin.post("/survey").form(&survey_form("before", 0)).await,
        "/admin-dashboard"
    );

    assert!(harness.participants_of("admin").is_empty());
    assert_eq!(harness.response_count(), 0);
}

#[tokio::test]
async fn home_routes_by_role() {
    let harness = Harness::new();
    let admin = harness.staff("admin").await;
    let alice = harness.member("alice").await;

    assert_redirect!(admin.get("/").await, "/admin-dashboard");
    assert_redirect!(alice.get("/").await, "/profile");
    assert_redirect!(alice.get("/login").await, "/profile");
}

#[tokio::test]
async fn registration_is_validated() {
    let harness = Harness::new();
    harness.member("alice").await;
    let client = harness.client();

    let res = client
        .post("/register")
        .form(&[
            ("username", "alice"),
            ("email", "other@example.com"),
            ("password", "secret1"),
            ("password2", "secret1"),
        ])
        .await;
    assert_status(&res, StatusCode::BAD_REQUEST);

    let res = client
        .post("/register")
        .form(&[
            ("username", "carol"),
            ("email", "carol@example.com"),
            ("password", "secret1"),
            ("password2", "secret2"),
        ])
        .await;
    assert_status(&res, StatusCode::BAD_REQUEST);

    assert_redirect!(client.get("/profile").await, "/login?next=%2Fprofile");
}
