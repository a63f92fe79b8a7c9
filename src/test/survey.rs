use axum::http::StatusCode;

use super::{Harness, assert_redirect, assert_status, survey_form};

#[tokio::test]
async fn profile_provisions_one_participant() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;
    assert!(harness.participants_of("alice").is_empty());

    let first = alice.get("/profile").await;
    assert_status(&first, StatusCode::OK);
    assert!(first.text().contains("alice"));
    assert_eq!(harness.participants_of("alice").len(), 1);

    let second = alice.get("/profile").await;
    assert_status(&second, StatusCode::OK);
    assert_eq!(harness.participants_of("alice").len(), 1);
    assert_eq!(harness.participant_count(), 1);
}

#[tokio::test]
async fn submitted_survey_is_stored_and_listed_on_the_profile() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;

    let form = alice.get("/survey").await;
    assert_status(&form, StatusCode::OK);
    assert!(form.text().contains("name=\"q30\""));

    let res = alice.post("/survey").form(&survey_form("before", 0)).await;
    assert_redirect!(res, "/profile");
    assert_eq!(harness.response_count(), 1);

    let profile = alice.get("/profile").await;
    assert_status(&profile, StatusCode::OK);
    let body = profile.text();
    assert!(body.contains("Before the session"));
    // All-neutral answers score 4 on every scale.
    assert!(body.contains("4.00"));
}

#[tokio::test]
async fn invalid_surveys_are_rejected_without_a_record() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;

    let mut missing = survey_form("after", 1);
    missing.retain(|(k, _)| k != "q12");
    let res = alice.post("/survey").form(&missing).await;
    assert_status(&res, StatusCode::BAD_REQUEST);
    assert!(res.text().contains("please answer question 12"));

    let res = alice.post("/survey").form(&survey_form("after", 4)).await;
    assert_status(&res, StatusCode::BAD_REQUEST);

    let res = alice.post("/survey").form(&survey_form("during", 1)).await;
    assert_status(&res, StatusCode::BAD_REQUEST);

    assert_eq!(harness.response_count(), 0);
}

#[tokio::test]
async fn profile_can_be_edited() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;
    alice.get("/profile").await;

    let res = alice
        .post("/profile")
        .form(&[
            ("name", "Smith, A."),
            ("gender", "F"),
            ("birth_date", "1994-03-02"),
        ])
        .await;
    assert_redirect!(res, "/profile");

    let body = alice.get("/profile").await.text();
    assert!(body.contains("Smith, A."));
    assert!(body.contains("1994-03-02"));

    let res = alice
        .post("/profile")
        .form(&[("name", "Smith, A."), ("gender", "F"), ("birth_date", "soon")])
        .await;
    assert_status(&res, StatusCode::BAD_REQUEST);
    assert_eq!(harness.participants_of("alice").len(), 1);

    let res = alice
        .post("/profile")
        .form(&[("name", "Smith, A."), ("birth_date", "1994-03-02")])
        .await;
    assert_status(&res, StatusCode::BAD_REQUEST);
    assert!(res.text().contains("please choose a gender"));

    let res = alice.post("/profile").form(&[("name", "Smith, A.")]).await;
    assert_status(&res, StatusCode::BAD_REQUEST);
    assert!(res.text().contains("<form"));
}

#[tokio::test]
async fn new_participant_form_creates_then_defers_to_the_profile() {
    let harness = Harness::new();
    let bob = harness.member("bob").await;

    let res = bob.get("/new_participant").await;
    assert_status(&res, StatusCode::OK);

    let res = bob
        .post("/new_participant")
        .form(&[
            ("name", "Jones, B."),
            ("gender", "M"),
            ("birth_date", "1980-12-24"),
        ])
        .await;
    let ids = harness.participants_of("bob");
    assert_eq!(ids.len(), 1);
    assert_redirect!(res, format!("/survey/{}", ids[0]));

    let res = bob
        .post(&format!("/survey/{}", ids[0]))
        .form(&survey_form("after", -2))
        .await;
    assert_redirect!(res, "/profile");
    assert_eq!(harness.response_count(), 1);

    let res = bob.get("/new_participant").await;
    assert_redirect!(res, "/profile");
    assert_eq!(harness.participants_of("bob").len(), 1);
}

#[tokio::test]
async fn logging_out_ends_the_session() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;

    let res = alice.post("/logout").await;
    assert_redirect!(res, "/login");

    let res = alice.get("/profile").await;
    assert_redirect!(res, "/login?next=%2Fprofile");

    let res = alice
        .post("/login?next=%2Fsurvey")
        .form(&[("id", "alice@example.com"), ("password", super::PASSWORD)])
        .await;
    assert_redirect!(res, "/survey");

    let res = alice
        .post("/login")
        .form(&[("id", "alice"), ("password", "wrong password")])
        .await;
    assert_status(&res, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn login_ignores_next_pointing_off_site_or_unusable() {
    let harness = Harness::new();
    let alice = harness.member("alice").await;

    for next in [
        "%2F%5Cevil.example",
        "%2F%2Fevil.example",
        "https%3A%2F%2Fevil.example",
        "%2Fprofile%0Ax",
        "%2F%D0%BF%D1%80%D0%BE%D1%84%D0%B8%D0%BB%D1%8C",
    ] {
        alice.post("/logout").await;
        let res = alice
            .post(&format!("/login?next={next}"))
            .form(&[("id", "alice"), ("password", super::PASSWORD)])
            .await;
        assert_redirect!(res, "/profile");
    }
}
