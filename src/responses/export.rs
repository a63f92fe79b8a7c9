use axum::extract::Query;
use chrono::Utc;

use crate::{
    participants::Participant,
    permission::{IsStaff, Operation, authorize},
    questionnaire::QUESTION_COUNT,
    responses::{SurveyResponse, fmt_date, fmt_score, list::FilterQuery},
    state::Conn,
    util_resp::{FailureResponse, StandardResponse, SuccessResponse},
};

fn header() -> Vec<String> {
    let mut header = vec![
        "name".to_string(),
        "gender".to_string(),
        "birth_date".to_string(),
        "phase".to_string(),
        "created_at".to_string(),
    ];
    header.extend((1..=QUESTION_COUNT).map(|i| format!("q{i}")));
    header.extend(
        ["wellbeing", "activity", "mood", "overall"].map(ToString::to_string),
    );
    header
}

fn record(response: &SurveyResponse, participant: &Participant) -> Vec<String> {
    let scores = response.scores();
    let mut record = vec![
        participant.name.clone(),
        participant.gender.code().to_string(),
        fmt_date(participant.birth_date),
        response.phase.code().to_string(),
        response.created_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
    ];
    record.extend(response.answers.as_array().iter().map(ToString::to_string));
    record.extend(
        [scores.wellbeing, scores.activity, scores.mood, scores.overall]
            .map(fmt_score),
    );
    record
}

/// Writes one CSV row per response, preceded by a header row.
pub fn write_csv(
    rows: &[(SurveyResponse, Participant)],
) -> Result<Vec<u8>, csv::Error> {
    let mut wtr = csv::WriterBuilder::new().from_writer(Vec::new());
    wtr.write_record(header())?;
    for (response, participant) in rows {
        wtr.write_record(record(response, participant))?;
    }
    wtr.into_inner().map_err(|e| e.into_error().into())
}

pub async fn export_responses(
    IsStaff(user): IsStaff<false>,
    mut conn: Conn<false>,
    Query(query): Query<FilterQuery>,
) -> StandardResponse {
    if let Some(stop) =
        authorize(user.identity(), Operation::ListResponses, None).enforce()
    {
        return stop;
    }

    let rows = SurveyResponse::all_with_participants(query.filter(), &mut *conn)?;
    let body = write_csv(&rows).map_err(|e| {
        tracing::error!("could not write CSV export: {e}");
        FailureResponse::ServerError(())
    })?;
    tracing::info!(rows = rows.len(), "exported responses");

    Ok(SuccessResponse::File {
        content_type: "text/csv; charset=utf-8",
        filename: format!("san-responses-{}.csv", Utc::now().format("%Y%m%d")),
        body,
    })
}
