//! The `/new_participant` flow: an explicit creation form for users who have
//! not got a participant yet. Users who already have one are sent to their
//! profile instead.

use axum::{extract::Form, response::Redirect};
use chrono::Utc;
use hypertext::prelude::*;

use crate::{
    auth::User,
    participants::{Participant, ParticipantFields, ParticipantForm},
    permission::{Operation, PROFILE, authorize},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, bad_request, see_other_ok, success},
    widgets::alert::ErrorAlert,
};

fn create_page(
    user: &User<true>,
    fields: ParticipantFields,
    error: Option<&str>,
) -> Rendered<String> {
    Page::new()
        .user(user)
        .body(maud! {
            h1 { "Tell us about yourself" }
            @if let Some(error) = error {
                ErrorAlert msg=(error);
            }
            form method="post" {
                (fields)
                button type="submit" class="btn btn-primary" { "Continue to the survey" }
            }
        })
        .render()
}

/// Staff are redirected away; users with a participant go to their profile.
fn precheck(
    user: &User<true>,
    conn: &mut Conn<true>,
) -> Result<(), StandardResponse> {
    let identity = user.identity();
    if let Some(stop) =
        authorize(identity, Operation::ManageParticipant, Some(identity.id))
            .enforce()
    {
        return Err(stop);
    }

    match Participant::of_user(&user.id, &mut **conn) {
        Ok(Some(_)) => Err(see_other_ok(Redirect::to(PROFILE))),
        Ok(None) => Ok(()),
        Err(e) => Err(Err(e.into())),
    }
}

pub async fn create_participant_page(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    if let Err(stop) = precheck(&user, &mut conn) {
        return stop;
    }

    success(create_page(&user, ParticipantFields::default(), None))
}

#[tracing::instrument(skip_all, fields(user = %user.username))]
pub async fn do_create_participant(
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<ParticipantForm>,
) -> StandardResponse {
    if let Err(stop) = precheck(&user, &mut conn) {
        return stop;
    }

    let details = match form.validate(Utc::now().date_naive()) {
        Ok(details) => details,
        Err(e) => {
            return bad_request(create_page(
                &user,
                ParticipantFields::from_form(&form),
                Some(&e),
            ));
        }
    };

    let participant = Participant::create(Some(&user.id), &details, &mut *conn)?;
    tracing::info!(participant = %participant.id, "created participant");

    see_other_ok(Redirect::to(&format!("/survey/{}", participant.id)))
}
