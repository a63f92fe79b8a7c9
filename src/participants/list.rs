use chrono::Utc;
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;

use crate::{
    participants::{Participant, ParticipantRow},
    permission::{IsStaff, Operation, authorize},
    responses::fmt_date,
    schema::{participants, users},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::alert::InfoAlert,
};

/// Every participant along with the username of its owner (if any), sorted
/// by name.
pub fn all_with_owners(
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Vec<(Participant, Option<String>)>, diesel::result::Error> {
    participants::table
        .left_join(users::table)
        .order_by((participants::name.asc(), participants::id.asc()))
        .select((participants::all_columns, users::username.nullable()))
        .load::<(ParticipantRow, Option<String>)>(conn)?
        .into_iter()
        .map(|(row, owner)| Ok((Participant::try_from(row)?, owner)))
        .collect()
}

pub async fn participants_list(
    IsStaff(user): IsStaff<false>,
    mut conn: Conn<false>,
) -> StandardResponse {
    if let Some(stop) =
        authorize(user.identity(), Operation::ListParticipants, None).enforce()
    {
        return stop;
    }

    let participants = all_with_owners(&mut *conn)?;
    let today = Utc::now().date_naive();

    success(
        Page::new()
            .user(&user)
            .body(maud! {
                h1 { "Participants" }
                @if participants.is_empty() {
                    InfoAlert msg="Nobody has signed up yet.";
                } @else {
                    table class="table table-striped" {
                        thead {
                            tr {
                                th { "Name" }
                                th { "Gender" }
                                th { "Date of birth" }
                                th { "Age" }
                                th { "Account" }
                            }
                        }
                        tbody {
                            @for (participant, owner) in &participants {
                                tr {
                                    td { (participant.name) }
                                    td { (participant.gender.label()) }
                                    td { (fmt_date(participant.birth_date)) }
                                    td { (participant.age_on(today)) }
                                    td {
                                        @match owner {
                                            Some(owner) => { (owner) }
                                            None => { span class="text-muted" { "none" } }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            })
            .render(),
    )
}
