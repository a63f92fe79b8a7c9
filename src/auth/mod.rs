use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use chrono::{Days, NaiveDateTime, Utc};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    permission::{Identity, Role},
    schema::users,
    state::{DbPool, ThreadSafeConn},
};

pub mod login;
pub mod register;

pub const LOGIN_COOKIE: &str = "san_session";

#[derive(Debug, Queryable, Serialize, Deserialize, Clone)]
pub struct User<const TX: bool> {
    pub id: String,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub created_at: NaiveDateTime,
}

impl<const TX: bool> User<TX> {
    pub fn role(&self) -> Role {
        if self.is_staff { Role::Staff } else { Role::Member }
    }

    pub fn identity(&self) -> Identity<'_> {
        Identity {
            id: &self.id,
            role: self.role(),
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    CookieMissingOrMalformed,
    NoDatabase,
    /// Not logged in. Holds the path the user was trying to reach.
    Unauthorized(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::CookieMissingOrMalformed => {
                (StatusCode::UNAUTHORIZED, "Cookie missing or malformed")
                    .into_response()
            }
            AuthError::NoDatabase => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error")
                    .into_response()
            }
            AuthError::Unauthorized(next) => {
                Redirect::to(&login_url(&next)).into_response()
            }
        }
    }
}

pub fn login_url(next: &str) -> String {
    match serde_urlencoded::to_string([("next", next)]) {
        Ok(query) => format!("/login?{query}"),
        Err(_) => "/login".to_string(),
    }
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: String,
    expiry: NaiveDateTime,
}

#[async_trait]
impl<const TX: bool, S> FromRequestParts<S> for User<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    axum_extra::extract::cookie::Key: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let jar: PrivateCookieJar<Key> =
            PrivateCookieJar::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::CookieMissingOrMalformed)?;

        let next = parts.uri.path().to_string();

        let login_cookie = match jar.get(LOGIN_COOKIE) {
            Some(cookie) => cookie,
            None => return Err(AuthError::Unauthorized(next)),
        };

        let login: LoginSession =
            match serde_json::from_str::<LoginSession>(login_cookie.value()) {
                Ok(t) if chrono::Utc::now().naive_utc() < t.expiry => t,
                _ => {
                    return Err(AuthError::Unauthorized(next));
                }
            };

        let conn_wrapper =
            ThreadSafeConn::<TX>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::NoDatabase)?;

        let mut conn = conn_wrapper.inner.lock().await;

        let user = users::table
            .filter(users::id.eq(login.id))
            .first(&mut *conn)
            .optional()
            .map_err(|_| AuthError::NoDatabase)?;

        match user {
            Some(user) => Ok(user),
            None => Err(AuthError::Unauthorized(next)),
        }
    }
}

pub fn set_login_cookie(id: String, jar: PrivateCookieJar) -> PrivateCookieJar {
    let expiry = Utc::now()
        .naive_utc()
        .checked_add_days(Days::new(7))
        .unwrap_or(NaiveDateTime::MAX);

    let session = LoginSession { id, expiry };
    match serde_json::to_string(&session) {
        Ok(value) => jar.add(
            Cookie::build((LOGIN_COOKIE, value))
                .path("/")
                .http_only(true),
        ),
        Err(e) => {
            tracing::error!("could not serialise login session: {e}");
            jar
        }
    }
}

pub fn clear_login_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(LOGIN_COOKIE).path("/"))
}

#[derive(thiserror::Error, Debug)]
pub enum CreateUserError {
    #[error("that username is already taken")]
    UsernameTaken,
    #[error("that email is already taken")]
    EmailTaken,
    #[error("could not hash password: {0}")]
    Hash(argon2::password_hash::Error),
    #[error(transparent)]
    Database(#[from] diesel::result::Error),
}

/// Inserts a new user, returning its id.
pub fn create_user(
    username: &str,
    email: &str,
    password: &str,
    is_staff: bool,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<String, CreateUserError> {
    let existing = users::table
        .filter(users::username.eq(username).or(users::email.eq(email)))
        .select((users::username, users::email))
        .first::<(String, String)>(&mut *conn)
        .optional()?;

    if let Some((existing_username, _)) = existing {
        return Err(if existing_username == username {
            CreateUserError::UsernameTaken
        } else {
            CreateUserError::EmailTaken
        });
    }

    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(CreateUserError::Hash)?
        .to_string();

    let id = Uuid::now_v7().to_string();
    diesel::insert_into(users::table)
        .values((
            users::id.eq(&id),
            users::email.eq(email),
            users::username.eq(username),
            users::password_hash.eq(password_hash),
            users::is_staff.eq(is_staff),
            users::created_at.eq(Utc::now().naive_utc()),
        ))
        .execute(&mut *conn)?;

    tracing::info!(username, is_staff, "created user");

    Ok(id)
}
