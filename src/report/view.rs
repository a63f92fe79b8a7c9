use chrono::Utc;
use hypertext::prelude::*;

use crate::{
    permission::{IsStaff, Operation, authorize},
    report::{Report, ReportRow, generate, stats::GroupMeans},
    responses::{ResponseFilter, SurveyResponse, fmt_score},
    state::Conn,
    template::Page,
    util_resp::{FailureResponse, StandardResponse, success},
    widgets::alert::{ErrorAlert, InfoAlert},
};

/// Mean scores per gender×phase group.
struct MeansTable<'r> {
    means: &'r [GroupMeans],
}

impl Renderable for MeansTable<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            table class="table table-sm table-bordered w-auto" {
                thead {
                    tr {
                        th { "Gender" }
                        th { "Phase" }
                        th { "Responses" }
                        th { "Well-being" }
                        th { "Activity" }
                        th { "Mood" }
                        th { "Overall" }
                    }
                }
                tbody {
                    @for group in self.means {
                        tr {
                            td { (group.gender.label()) }
                            td { (group.phase.code()) }
                            td { (group.count) }
                            td { (fmt_score(group.scores.wellbeing)) }
                            td { (fmt_score(group.scores.activity)) }
                            td { (fmt_score(group.scores.mood)) }
                            td { (fmt_score(group.scores.overall)) }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

struct ReportBody<'r> {
    report: &'r Report,
}

impl Renderable for ReportBody<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let report = self.report;
        maud! {
            h1 { "Report" }
            @if let Some(placeholder) = report.placeholder {
                InfoAlert msg=(placeholder);
            } @else {
                h2 class="h4" { "Mean scores" }
                MeansTable means=(&report.means);

                @if !report.failures.is_empty() {
                    ErrorAlert msg=(format!(
                        "Some charts could not be drawn: {}",
                        report.failures.join(", ")
                    ));
                }
                div class="row g-4" {
                    @for chart in &report.charts {
                        div class="col-12 col-xl-6" {
                            figure class="figure" {
                                img class="figure-img img-fluid"
                                    src=(chart.data_uri())
                                    alt=(chart.title);
                                figcaption class="figure-caption" { (chart.title) }
                            }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

pub async fn report_page(
    IsStaff(user): IsStaff<false>,
    mut conn: Conn<false>,
) -> StandardResponse {
    if let Some(stop) =
        authorize(user.identity(), Operation::ViewReport, None).enforce()
    {
        return stop;
    }

    let rows: Vec<ReportRow> =
        SurveyResponse::all_with_participants(ResponseFilter::default(), &mut *conn)?
            .iter()
            .map(|(response, participant)| ReportRow::new(response, participant))
            .collect();

    // Drawing is CPU-bound; keep it off the async workers.
    let today = Utc::now().date_naive();
    let report = tokio::task::spawn_blocking(move || generate(&rows, today))
        .await
        .map_err(|e| {
            tracing::error!("report generation failed: {e}");
            FailureResponse::ServerError(())
        })?;
    tracing::debug!(
        charts = report.charts.len(),
        failed = report.failures.len(),
        "generated report"
    );

    success(
        Page::new()
            .user(&user)
            .body(ReportBody { report: &report })
            .render(),
    )
}
