//! Aggregate charts and tables over every recorded response.
//!
//! [`generate`] is pure: it takes the rows to summarise and the date to
//! compute ages on, and draws each chart independently. A chart which fails
//! to draw is logged and left out; the rest of the report is unaffected.

use std::panic::{AssertUnwindSafe, catch_unwind};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{NaiveDate, NaiveDateTime};

use crate::{
    participants::{Gender, Participant},
    questionnaire::Scores,
    responses::{Phase, SurveyResponse},
};

pub mod charts;
pub mod stats;
pub mod view;

use charts::ChartError;
use stats::GroupMeans;

/// Shown instead of the report when there is nothing to aggregate.
pub const NO_DATA: &str =
    "No responses have been recorded yet, so there is nothing to report.";

/// One response, reduced to what the report looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub gender: Gender,
    pub phase: Phase,
    pub scores: Scores,
    pub birth_date: NaiveDate,
    pub created_at: NaiveDateTime,
}

impl ReportRow {
    pub fn new(response: &SurveyResponse, participant: &Participant) -> Self {
        ReportRow {
            gender: participant.gender,
            phase: response.phase,
            scores: response.scores(),
            birth_date: participant.birth_date,
            created_at: response.created_at,
        }
    }

    /// Fractional age in years on `today`, counting a year as 365.25 days.
    pub fn age_years(&self, today: NaiveDate) -> f64 {
        (today - self.birth_date).num_days() as f64 / 365.25
    }
}

/// A rendered chart, as SVG markup.
#[derive(Debug, Clone)]
pub struct Chart {
    pub title: String,
    pub svg: String,
}

impl Chart {
    /// The chart as a `data:` URI, for use in an `<img src>`.
    pub fn data_uri(&self) -> String {
        format!("data:image/svg+xml;base64,{}", STANDARD.encode(&self.svg))
    }
}

#[derive(Debug, Clone)]
pub struct Report {
    pub charts: Vec<Chart>,
    pub means: Vec<GroupMeans>,
    /// Set instead of charts and means when there was no data.
    pub placeholder: Option<&'static str>,
    /// Titles of charts which could not be drawn.
    pub failures: Vec<String>,
}

type DrawFn<'a> = Box<dyn FnOnce() -> Result<Chart, ChartError> + 'a>;

fn job<'a>(
    title: impl Into<String>,
    draw: impl FnOnce() -> Result<Chart, ChartError> + 'a,
) -> (String, DrawFn<'a>) {
    let draw: DrawFn<'a> = Box::new(draw);
    (title.into(), draw)
}

/// Runs one chart job, turning both errors and panics from the drawing code
/// into an `Err` carrying a description.
fn run_job(draw: DrawFn<'_>) -> Result<Chart, String> {
    match catch_unwind(AssertUnwindSafe(draw)) {
        Ok(Ok(chart)) => Ok(chart),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("the chart code panicked".to_string()),
    }
}

/// Draws every chart in order. Returns the charts that were drawn and the
/// titles of those that were not.
fn draw_all(jobs: Vec<(String, DrawFn<'_>)>) -> (Vec<Chart>, Vec<String>) {
    let mut drawn = Vec::with_capacity(jobs.len());
    let mut failures = Vec::new();
    for (title, draw) in jobs {
        match run_job(draw) {
            Ok(chart) => drawn.push(chart),
            Err(e) => {
                tracing::warn!(chart = %title, "skipping chart: {e}");
                failures.push(title);
            }
        }
    }
    (drawn, failures)
}

pub fn generate(rows: &[ReportRow], today: NaiveDate) -> Report {
    if rows.is_empty() {
        return Report {
            charts: Vec::new(),
            means: Vec::new(),
            placeholder: Some(NO_DATA),
            failures: Vec::new(),
        };
    }

    let means = stats::grouped_means(rows);

    let mut jobs = vec![
        job("Mean scores by gender and phase", || charts::grouped_bars(&means)),
        job("Change in mean scores by phase", || charts::trend_lines(&means)),
    ];
    for gender in Gender::ALL {
        for phase in Phase::ALL {
            jobs.push(job(
                format!("Well-being: {} / {}", gender.label(), phase.code()),
                move || charts::wellbeing_pie(rows, gender, phase),
            ));
        }
    }
    jobs.push(job("Overall score vs age", move || {
        charts::overall_vs_age(rows, today)
    }));
    jobs.push(job("Score distribution by phase", || charts::box_plots(rows)));
    jobs.push(job("Correlation between scores and age", move || {
        charts::correlation_heatmap(rows, today)
    }));

    let (drawn, failures) = draw_all(jobs);

    Report {
        charts: drawn,
        means,
        placeholder: None,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::Answers;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(gender: Gender, phase: Phase, answer: i64, born: NaiveDate) -> ReportRow {
        let participant = Participant {
            id: "p".to_string(),
            user_id: None,
            name: "P".to_string(),
            gender,
            birth_date: born,
        };
        let response = SurveyResponse {
            id: "r".to_string(),
            participant_id: "p".to_string(),
            created_at: date(2025, 10, 1).and_hms_opt(9, 0, 0).unwrap(),
            phase,
            answers: Answers::new([answer; 30]).unwrap(),
        };
        ReportRow::new(&response, &participant)
    }

    #[test]
    fn no_rows_gives_a_placeholder_and_no_charts() {
        let report = generate(&[], date(2025, 10, 26));
        assert!(report.charts.is_empty());
        assert!(report.means.is_empty());
        assert!(!report.placeholder.unwrap().is_empty());
    }

    #[test]
    fn every_chart_is_drawn_for_ordinary_data() {
        let rows = vec![
            row(Gender::Male, Phase::Before, -1, date(1990, 5, 1)),
            row(Gender::Male, Phase::After, 2, date(1990, 5, 1)),
            row(Gender::Female, Phase::Before, 0, date(2001, 1, 20)),
            row(Gender::Female, Phase::After, 3, date(1985, 7, 9)),
        ];
        let report = generate(&rows, date(2025, 10, 26));

        assert!(report.placeholder.is_none());
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        // bars, trends, four pies, scatter, box plots, heatmap
        assert_eq!(report.charts.len(), 9);
        assert!(report.charts.iter().all(|c| c.svg.contains("<svg")));
        assert_eq!(report.means.len(), 4);
    }

    #[test]
    fn missing_groups_and_constant_series_do_not_break_the_report() {
        // One group only: three pies are empty and every correlation with a
        // constant series is undefined.
        let rows = vec![
            row(Gender::Female, Phase::After, 0, date(2000, 1, 1)),
            row(Gender::Female, Phase::After, 0, date(2000, 1, 1)),
        ];
        let report = generate(&rows, date(2025, 10, 26));
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        assert_eq!(report.charts.len(), 9);
        assert_eq!(report.means.len(), 1);
        assert_eq!(report.means[0].scores.wellbeing, 4.0);
    }

    #[test]
    fn a_failing_chart_does_not_take_the_others_down() {
        let ok = |title: &str| {
            let chart = Chart {
                title: title.to_string(),
                svg: "<svg/>".to_string(),
            };
            move || Ok::<_, ChartError>(chart)
        };
        let jobs = vec![
            job("first", ok("first")),
            job("broken", || Err(ChartError::Draw("backend gave up".into()))),
            job("middle", ok("middle")),
            job("panics", || -> Result<Chart, ChartError> {
                panic!("index out of bounds")
            }),
            job("last", ok("last")),
        ];

        let (drawn, failures) = draw_all(jobs);

        let titles: Vec<_> = drawn.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["first", "middle", "last"]);
        assert_eq!(failures, ["broken", "panics"]);
    }

    #[test]
    fn age_uses_average_year_length() {
        let r = row(Gender::Male, Phase::Before, 0, date(2000, 1, 1));
        let age = r.age_years(date(2025, 1, 1));
        assert!((age - 9132.0 / 365.25).abs() < 1e-9);
        assert!(Chart {
            title: "t".to_string(),
            svg: "<svg/>".to_string()
        }
        .data_uri()
        .starts_with("data:image/svg+xml;base64,"));
    }
}
