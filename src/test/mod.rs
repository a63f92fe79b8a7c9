//! End-to-end tests which drive the whole application over HTTP.

use axum::http::StatusCode;
use axum_extra::extract::cookie::Key;
use axum_test::{TestResponse, TestServer};
use diesel::prelude::*;

use crate::{
    auth::create_user,
    config::{create_app, run_migrations},
    questionnaire::QUESTION_COUNT,
    schema::{participants, responses, users},
    state::{DbPool, make_pool},
};

pub const PASSWORD: &str = "correct horse";

// A macro so that a failing assertion points at the call site.
macro_rules! assert_redirect {
    ($response:expr, $location:expr) => {{
        let response = &$response;
        assert_eq!(
            response.status_code(),
            axum::http::StatusCode::SEE_OTHER,
            "body = {}",
            response.text()
        );
        assert_eq!(response.header("location"), $location);
    }};
}
pub(crate) use assert_redirect;

mod access;
mod staff;
mod survey;

/// One application instance over a fresh in-memory database. Every client
/// handed out talks to the same database but keeps its own cookies.
pub struct Harness {
    pub pool: DbPool,
    key: Key,
}

impl Harness {
    pub fn new() -> Harness {
        let pool = make_pool(":memory:").unwrap();
        run_migrations(&pool).unwrap();
        Harness {
            pool,
            key: Key::generate(),
        }
    }

    pub fn client(&self) -> TestServer {
        let mut server =
            TestServer::new(create_app(self.pool.clone(), self.key.clone()))
                .unwrap();
        server.do_save_cookies();
        server
    }

    /// Registers an ordinary user and returns a client logged in as them.
    pub async fn member(&self, username: &str) -> TestServer {
        let client = self.client();
        let email = format!("{username}@example.com");
        let res = client
            .post("/register")
            .form(&[
                ("username", username),
                ("email", email.as_str()),
                ("password", PASSWORD),
                ("password2", PASSWORD),
            ])
            .await;
        assert_redirect!(res, "/profile");
        client
    }

    /// Creates a staff account directly and logs in as it.
    pub async fn staff(&self, username: &str) -> TestServer {
        {
            let mut conn = self.pool.get().unwrap();
            create_user(
                username,
                &format!("{username}@example.com"),
                PASSWORD,
                true,
                &mut conn,
            )
            .unwrap();
        }

        let client = self.client();
        let res = client
            .post("/login")
            .form(&[("id", username), ("password", PASSWORD)])
            .await;
        assert_redirect!(res, "/admin-dashboard");
        client
    }

    pub fn user_id(&self, username: &str) -> String {
        let mut conn = self.pool.get().unwrap();
        users::table
            .filter(users::username.eq(username))
            .select(users::id)
            .first(&mut conn)
            .unwrap()
    }

    /// Ids of the participants owned by `username`.
    pub fn participants_of(&self, username: &str) -> Vec<String> {
        let user_id = self.user_id(username);
        let mut conn = self.pool.get().unwrap();
        participants::table
            .filter(participants::user_id.eq(user_id))
            .select(participants::id)
            .load(&mut conn)
            .unwrap()
    }

    pub fn participant_count(&self) -> i64 {
        let mut conn = self.pool.get().unwrap();
        participants::table.count().get_result(&mut conn).unwrap()
    }

    pub fn response_count(&self) -> i64 {
        let mut conn = self.pool.get().unwrap();
        responses::table.count().get_result(&mut conn).unwrap()
    }
}

/// A complete survey submission with every question answered `answer`.
pub fn survey_form(phase: &str, answer: i8) -> Vec<(String, String)> {
    let mut form = vec![("phase".to_string(), phase.to_string())];
    form.extend(
        (1..=QUESTION_COUNT).map(|i| (format!("q{i}"), answer.to_string())),
    );
    form
}

pub fn assert_status(res: &TestResponse, status: StatusCode) {
    assert_eq!(res.status_code(), status, "body = {}", res.text());
}
