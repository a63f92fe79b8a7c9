use axum::{extract::Form, response::Redirect};
use chrono::Utc;
use hypertext::prelude::*;

use crate::{
    auth::User,
    participants::{
        Participant, ParticipantFields, ParticipantForm, get_or_provision,
    },
    permission::{Operation, PROFILE, authorize},
    responses::{SurveyResponse, fmt_date, fmt_score, fmt_timestamp},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, bad_request, see_other_ok, success},
    widgets::{
        actions::Actions,
        alert::{ErrorAlert, InfoAlert},
    },
};

fn profile_page(
    user: &User<true>,
    participant: &Participant,
    fields: ParticipantFields,
    responses: &[SurveyResponse],
    error: Option<&str>,
) -> Rendered<String> {
    let age = participant.age_on(Utc::now().date_naive());

    Page::new()
        .user(user)
        .body(maud! {
            h1 { "Your profile" }
            dl class="row" {
                dt class="col-sm-3" { "Name" }
                dd class="col-sm-9" { (participant.name) }
                dt class="col-sm-3" { "Gender" }
                dd class="col-sm-9" { (participant.gender.label()) }
                dt class="col-sm-3" { "Date of birth" }
                dd class="col-sm-9" { (fmt_date(participant.birth_date)) }
                dt class="col-sm-3" { "Age" }
                dd class="col-sm-9" { (age) }
            }

            Actions options=(&[("/survey", "Take the survey")]);

            h2 class="mt-4" { "Edit your details" }
            @if let Some(error) = error {
                ErrorAlert msg=(error);
            }
            form method="post" {
                (fields)
                button type="submit" class="btn btn-primary" { "Save" }
            }

            h2 class="mt-4" { "Your responses" }
            @if responses.is_empty() {
                InfoAlert msg="You have not taken the survey yet.";
            } @else {
                table class="table table-striped" {
                    thead {
                        tr {
                            th { "Date" }
                            th { "Phase" }
                            th { "Well-being" }
                            th { "Activity" }
                            th { "Mood" }
                            th { "Overall" }
                        }
                    }
                    tbody {
                        @for response in responses {
                            @let scores = response.scores();
                            tr {
                                td { (fmt_timestamp(response.created_at)) }
                                td { (response.phase.label()) }
                                td { (fmt_score(scores.wellbeing)) }
                                td { (fmt_score(scores.activity)) }
                                td { (fmt_score(scores.mood)) }
                                td { (fmt_score(scores.overall)) }
                            }
                        }
                    }
                }
            }
        })
        .render()
}

/// Loads (or provisions) the user's participant, checking they may manage
/// it. Staff get redirected before anything is created.
fn own_participant(
    user: &User<true>,
    conn: &mut Conn<true>,
) -> Result<Participant, StandardResponse> {
    let identity = user.identity();
    if let Some(stop) =
        authorize(identity, Operation::ManageParticipant, Some(identity.id))
            .enforce()
    {
        return Err(stop);
    }

    let participant = get_or_provision(user, Utc::now().date_naive(), &mut **conn)
        .map_err(|e| Err(e.into()))?;

    match authorize(
        identity,
        Operation::ManageParticipant,
        participant.user_id.as_deref(),
    )
    .enforce()
    {
        Some(stop) => Err(stop),
        None => Ok(participant),
    }
}

pub async fn profile_page_route(
    user: User<true>,
    mut conn: Conn<true>,
) -> StandardResponse {
    let participant = match own_participant(&user, &mut conn) {
        Ok(p) => p,
        Err(stop) => return stop,
    };
    let responses = SurveyResponse::of_participant(&participant.id, &mut *conn)?;

    success(profile_page(
        &user,
        &participant,
        ParticipantFields::from_details(&participant.details()),
        &responses,
        None,
    ))
}

#[tracing::instrument(skip_all, fields(user = %user.username))]
pub async fn do_edit_profile(
    user: User<true>,
    mut conn: Conn<true>,
    Form(form): Form<ParticipantForm>,
) -> StandardResponse {
    let mut participant = match own_participant(&user, &mut conn) {
        Ok(p) => p,
        Err(stop) => return stop,
    };

    let details = match form.validate(Utc::now().date_naive()) {
        Ok(details) => details,
        Err(e) => {
            let responses =
                SurveyResponse::of_participant(&participant.id, &mut *conn)?;
            return bad_request(profile_page(
                &user,
                &participant,
                ParticipantFields::from_form(&form),
                &responses,
                Some(&e),
            ));
        }
    };

    participant.update(details, &mut *conn)?;
    tracing::info!(participant = %participant.id, "updated profile");

    see_other_ok(Redirect::to(PROFILE))
}
