use axum::{extract::Form, response::Redirect};
use axum_extra::extract::PrivateCookieJar;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    auth::{CreateUserError, User, create_user, set_login_cookie},
    permission::{Role, landing_for},
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, see_other_ok, success},
    validation::*,
    widgets::alert::ErrorAlert,
};

fn register_form() -> impl Renderable {
    maud! {
        h1 {"Register"}
        form method="post" class="mt-4" {
            div class="mb-3" {
                label for="username" class="form-label" { "Username" }
                input type="text" class="form-control" id="username" name="username" required;
            }
            div class="mb-3" {
                label for="email" class="form-label" { "Email" }
                input type="email" class="form-control" id="email" name="email" required;
            }
            div class="mb-3" {
                label for="password" class="form-label" { "Password" }
                input type="password" class="form-control" id="password" name="password" minlength="6" required;
            }
            div class="mb-3" {
                label for="password2" class="form-label" { "Confirm Password" }
                input type="password" class="form-control" id="password2" name="password2" minlength="6" required;
            }
            button type="submit" class="btn btn-primary" { "Register" }
        }
    }
}

pub async fn register_page(user: Option<User<true>>) -> StandardResponse {
    if let Some(user) = user {
        return see_other_ok(Redirect::to(landing_for(user.role())));
    }

    success(Page::new().body(register_form()).render())
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
}

impl RegisterForm {
    fn validate(&self) -> Result<(), String> {
        is_valid_username(&self.username)?;
        is_valid_email(&self.email)?;
        if self.password.len() < 6 {
            return Err("password must be at least 6 characters".to_string());
        }
        if self.password != self.password2 {
            return Err("passwords do not match".to_string());
        }
        Ok(())
    }
}

fn try_again(msg: &str) -> FailureResponse {
    FailureResponse::BadRequest(
        Page::new()
            .body(maud! {
                ErrorAlert msg=(msg);
                (register_form())
            })
            .render(),
    )
}

#[tracing::instrument(skip_all)]
pub async fn do_register(
    user: Option<User<true>>,
    mut conn: Conn<true>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<(PrivateCookieJar, Redirect), FailureResponse> {
    if let Some(user) = user {
        return Ok((jar, Redirect::to(landing_for(user.role()))));
    }

    if let Err(e) = form.validate() {
        return Err(try_again(&e));
    }

    match create_user(
        &form.username,
        &form.email,
        &form.password,
        false,
        &mut *conn,
    ) {
        Ok(id) => Ok((
            set_login_cookie(id, jar),
            Redirect::to(landing_for(Role::Member)),
        )),
        Err(
            e @ (CreateUserError::UsernameTaken | CreateUserError::EmailTaken),
        ) => Err(try_again(&e.to_string())),
        Err(CreateUserError::Database(e)) => Err(e.into()),
        Err(e) => {
            tracing::error!("could not register user: {e}");
            Err(FailureResponse::ServerError(()))
        }
    }
}
