//! The landing page for staff.

use diesel::prelude::*;
use hypertext::prelude::*;

use crate::{
    permission::IsStaff,
    responses::SurveyResponse,
    schema::{participants, users},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::actions::Actions,
};

pub async fn admin_dashboard(
    IsStaff(user): IsStaff<false>,
    mut conn: Conn<false>,
) -> StandardResponse {
    let participant_count: i64 =
        participants::table.count().get_result(&mut *conn)?;
    let response_count = SurveyResponse::count(&mut *conn)?;
    let member_count: i64 = users::table
        .filter(users::is_staff.eq(false))
        .count()
        .get_result(&mut *conn)?;

    success(
        Page::new()
            .user(&user)
            .body(maud! {
                h1 { "Dashboard" }
                div class="row g-3 my-3" {
                    div class="col-md-4" {
                        div class="card" {
                            div class="card-body" {
                                h2 class="card-title h6 text-muted" { "Participants" }
                                p class="card-text display-6" { (participant_count) }
                            }
                        }
                    }
                    div class="col-md-4" {
                        div class="card" {
                            div class="card-body" {
                                h2 class="card-title h6 text-muted" { "Responses" }
                                p class="card-text display-6" { (response_count) }
                            }
                        }
                    }
                    div class="col-md-4" {
                        div class="card" {
                            div class="card-body" {
                                h2 class="card-title h6 text-muted" { "Registered users" }
                                p class="card-text display-6" { (member_count) }
                            }
                        }
                    }
                }
                Actions options=(&[
                    ("/report", "View report"),
                    ("/participants", "Participants"),
                    ("/responses", "Responses"),
                    ("/responses/export.csv", "Export CSV"),
                ]);
            })
            .render(),
    )
}
