use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::{
    extract::{Form, Query},
    http::{HeaderValue, Uri},
    response::Redirect,
};
use axum_extra::extract::PrivateCookieJar;
use diesel::prelude::*;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::{User, clear_login_cookie, login_url, set_login_cookie},
    permission::landing_for,
    schema::users,
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, see_other_ok, success},
    widgets::alert::ErrorAlert,
};

#[derive(Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

fn login_form(next: Option<&str>) -> impl Renderable {
    let action = match next {
        Some(next) => login_url(next),
        None => "/login".to_string(),
    };

    maud! {
        h1 { "Log in" }
        form method="post" action=(action) {
            div class="mb-3" {
                label for="id" class="form-label" { "Username or email" }
                input type="text" class="form-control" id="id" name="id" required;
            }
            div class="mb-3" {
                label for="password" class="form-label" { "Password" }
                input type="password" class="form-control" id="password" name="password" required;
            }
            button type="submit" class="btn btn-primary" { "Log in" }
        }
        p class="mt-3" {
            "No account yet? " a href="/register" { "Register" }
        }
    }
}

pub async fn login_page(
    user: Option<User<true>>,
    Query(query): Query<NextQuery>,
) -> StandardResponse {
    if let Some(user) = user {
        return see_other_ok(Redirect::to(landing_for(user.role())));
    }

    success(
        Page::new()
            .body(login_form(query.next.as_deref()))
            .render(),
    )
}

#[derive(Deserialize)]
pub struct LoginForm {
    id: String,
    password: String,
}

fn login_failed(msg: &'static str, next: Option<&str>) -> FailureResponse {
    FailureResponse::BadRequest(
        Page::new()
            .body(maud! {
                ErrorAlert msg=(msg);
                (login_form(next))
            })
            .render(),
    )
}

#[tracing::instrument(skip_all)]
pub async fn do_login(
    Query(query): Query<NextQuery>,
    mut conn: Conn<true>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(PrivateCookieJar, Redirect), FailureResponse> {
    let next = query.next.as_deref();

    let user = users::table
        .filter(users::email.eq(&form.id).or(users::username.eq(&form.id)))
        .first::<User<true>>(&mut *conn)
        .optional()?;

    let Some(user) = user else {
        return Err(login_failed("No such user exists.", next));
    };

    let verified = PasswordHash::new(&user.password_hash)
        .map(|hash| {
            Argon2::default()
                .verify_password(form.password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false);
    if !verified {
        tracing::info!(username = %user.username, "failed login attempt");
        return Err(login_failed("Incorrect password.", next));
    }

    let redirect_to = next
        .and_then(local_path)
        .unwrap_or(landing_for(user.role()));

    Ok((set_login_cookie(user.id, jar), Redirect::to(redirect_to)))
}

/// Returns `next` if it is a path on this site that can be sent back in a
/// `Location` header.
///
/// Browsers read `/\host` like `//host`, so a backslash is rejected in the
/// same position as a second slash.
fn local_path(next: &str) -> Option<&str> {
    let uri: Uri = next.parse().ok()?;
    if uri.scheme().is_some() || uri.authority().is_some() {
        return None;
    }
    HeaderValue::from_str(next).ok()?;

    let mut chars = next.chars();
    match (chars.next(), chars.next()) {
        (Some('/'), Some('/' | '\\')) => None,
        (Some('/'), _) => Some(next),
        _ => None,
    }
}

pub async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (clear_login_cookie(jar), Redirect::to("/login"))
}
