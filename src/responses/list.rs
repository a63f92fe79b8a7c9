use axum::extract::Query;
use hypertext::prelude::*;
use serde::Deserialize;

use crate::{
    participants::Gender,
    permission::{IsStaff, Operation, authorize},
    responses::{Phase, ResponseFilter, SurveyResponse, fmt_score, fmt_timestamp},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, success},
    widgets::{actions::Actions, alert::InfoAlert},
};

/// The `?phase=&gender=` query of the responses list and the export. Empty
/// or unknown values mean "any".
#[derive(Deserialize, Debug, Default)]
pub struct FilterQuery {
    pub phase: Option<String>,
    pub gender: Option<String>,
}

impl FilterQuery {
    pub fn filter(&self) -> ResponseFilter {
        ResponseFilter {
            phase: self.phase.as_deref().and_then(Phase::from_code),
            gender: self.gender.as_deref().and_then(Gender::from_code),
        }
    }
}

const EXPORT: &str = "/responses/export.csv";

/// Link to the CSV export of the responses `filter` selects.
fn export_url(filter: ResponseFilter) -> String {
    let mut pairs = Vec::new();
    if let Some(phase) = filter.phase {
        pairs.push(("phase", phase.code()));
    }
    if let Some(gender) = filter.gender {
        pairs.push(("gender", gender.code()));
    }
    match serde_urlencoded::to_string(&pairs) {
        Ok(query) if !query.is_empty() => format!("{EXPORT}?{query}"),
        _ => EXPORT.to_string(),
    }
}

struct FilterForm {
    filter: ResponseFilter,
}

impl Renderable for FilterForm {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            form method="get" class="row g-2 align-items-end mb-3" {
                div class="col-auto" {
                    label for="phase" class="form-label" { "Phase" }
                    select class="form-select" id="phase" name="phase" {
                        option value="" { "Any" }
                        @for p in Phase::ALL {
                            option value=(p.code()) selected[self.filter.phase == Some(p)] {
                                (p.label())
                            }
                        }
                    }
                }
                div class="col-auto" {
                    label for="gender" class="form-label" { "Gender" }
                    select class="form-select" id="gender" name="gender" {
                        option value="" { "Any" }
                        @for g in Gender::ALL {
                            option value=(g.code()) selected[self.filter.gender == Some(g)] {
                                (g.label())
                            }
                        }
                    }
                }
                div class="col-auto" {
                    button type="submit" class="btn btn-secondary" { "Filter" }
                }
            }
        }
        .render_to(buffer);
    }
}

pub async fn responses_list(
    IsStaff(user): IsStaff<false>,
    mut conn: Conn<false>,
    Query(query): Query<FilterQuery>,
) -> StandardResponse {
    if let Some(stop) =
        authorize(user.identity(), Operation::ListResponses, None).enforce()
    {
        return stop;
    }

    let filter = query.filter();
    let rows = SurveyResponse::all_with_participants(filter, &mut *conn)?;
    let export = export_url(filter);

    success(
        Page::new()
            .user(&user)
            .body(maud! {
                h1 { "Responses" }
                Actions options=(&[(export.as_str(), "Download as CSV")]);
                FilterForm filter=(filter);
                @if rows.is_empty() {
                    InfoAlert msg="No responses match.";
                } @else {
                    p class="text-muted" { (rows.len()) " responses" }
                    table class="table table-striped" {
                        thead {
                            tr {
                                th { "Participant" }
                                th { "Phase" }
                                th { "Submitted" }
                                th { "Well-being" }
                                th { "Activity" }
                                th { "Mood" }
                                th { "Overall" }
                            }
                        }
                        tbody {
                            @for (response, participant) in &rows {
                                @let scores = response.scores();
                                tr {
                                    td { (participant.name) }
                                    td { (response.phase.label()) }
                                    td { (fmt_timestamp(response.created_at)) }
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
            .render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_unknown_filters_mean_any() {
        let query = FilterQuery {
            phase: Some(String::new()),
            gender: Some("X".to_string()),
        };
        assert_eq!(query.filter(), ResponseFilter::default());

        let query = FilterQuery {
            phase: Some("after".to_string()),
            gender: Some("F".to_string()),
        };
        assert_eq!(
            query.filter(),
            ResponseFilter {
                phase: Some(Phase::After),
                gender: Some(Gender::Female),
            }
        );
    }

    #[test]
    fn export_link_keeps_the_filter() {
        assert_eq!(export_url(ResponseFilter::default()), EXPORT);
        assert_eq!(
            export_url(ResponseFilter {
                phase: Some(Phase::After),
                gender: None,
            }),
            "/responses/export.csv?phase=after"
        );
        assert_eq!(
            export_url(ResponseFilter {
                phase: Some(Phase::Before),
                gender: Some(Gender::Male),
            }),
            "/responses/export.csv?phase=before&gender=M"
        );
    }
}
