use chrono::{NaiveDate, NaiveDateTime};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    participants::{Gender, Participant, ParticipantRow},
    questionnaire::{Answers, QUESTION_COUNT, Scores},
    schema::{participants, responses},
};

pub mod export;
pub mod list;
pub mod survey;

/// Expands to the thirty answer columns of `responses`, in question order.
macro_rules! answer_columns {
    () => {
        (
            responses::q1,
            responses::q2,
            responses::q3,
            responses::q4,
            responses::q5,
            responses::q6,
            responses::q7,
            responses::q8,
            responses::q9,
            responses::q10,
            responses::q11,
            responses::q12,
            responses::q13,
            responses::q14,
            responses::q15,
            responses::q16,
            responses::q17,
            responses::q18,
            responses::q19,
            responses::q20,
            responses::q21,
            responses::q22,
            responses::q23,
            responses::q24,
            responses::q25,
            responses::q26,
            responses::q27,
            responses::q28,
            responses::q29,
            responses::q30,
        )
    };
}

type AnswerRow = (i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32, i32);

type RawResponse = (String, String, NaiveDateTime, String, AnswerRow);

/// Whether a response was given before or after the measured session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "before")]
    Before,
    #[serde(rename = "after")]
    After,
}

impl Phase {
    pub const ALL: [Phase; 2] = [Phase::Before, Phase::After];

    pub fn code(self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "before" => Some(Phase::Before),
            "after" => Some(Phase::After),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Before => "Before the session",
            Phase::After => "After the session",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyResponse {
    pub id: String,
    pub participant_id: String,
    pub created_at: NaiveDateTime,
    pub phase: Phase,
    pub answers: Answers,
}

fn corrupt(msg: String) -> diesel::result::Error {
    diesel::result::Error::DeserializationError(msg.into())
}

impl TryFrom<RawResponse> for SurveyResponse {
    type Error = diesel::result::Error;

    fn try_from(
        (id, participant_id, created_at, phase, row): RawResponse,
    ) -> Result<Self, Self::Error> {
        let phase = Phase::from_code(&phase)
            .ok_or_else(|| corrupt(format!("unknown phase {phase:?}")))?;

        let (q1, q2, q3, q4, q5, q6, q7, q8, q9, q10, q11, q12, q13, q14, q15, q16, q17, q18, q19, q20, q21, q22, q23, q24, q25, q26, q27, q28, q29, q30) = row;
        let raw: [i64; QUESTION_COUNT] = [q1, q2, q3, q4, q5, q6, q7, q8, q9, q10, q11, q12, q13, q14, q15, q16, q17, q18, q19, q20, q21, q22, q23, q24, q25, q26, q27, q28, q29, q30].map(i64::from);
        let answers = Answers::new(raw).map_err(|e| corrupt(e.to_string()))?;

        Ok(SurveyResponse {
            id,
            participant_id,
            created_at,
            phase,
            answers,
        })
    }
}

/// Narrows down the responses shown to staff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    pub phase: Option<Phase>,
    pub gender: Option<Gender>,
}

impl SurveyResponse {
    pub fn scores(&self) -> Scores {
        self.answers.scores()
    }

    /// Records one submission of the questionnaire. Responses are never
    /// modified afterwards.
    pub fn insert(
        participant_id: &str,
        phase: Phase,
        answers: Answers,
        created_at: NaiveDateTime,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<SurveyResponse, diesel::result::Error> {
        let id = Uuid::now_v7().to_string();
        let [a1, a2, a3, a4, a5, a6, a7, a8, a9, a10, a11, a12, a13, a14, a15, a16, a17, a18, a19, a20, a21, a22, a23, a24, a25, a26, a27, a28, a29, a30] = answers.as_array().map(i32::from);

        diesel::insert_into(responses::table)
            .values((
                responses::id.eq(&id),
                responses::participant_id.eq(participant_id),
                responses::created_at.eq(created_at),
                responses::phase.eq(phase.code()),
                (
                    responses::q1.eq(a1),
                    responses::q2.eq(a2),
                    responses::q3.eq(a3),
                    responses::q4.eq(a4),
                    responses::q5.eq(a5),
                    responses::q6.eq(a6),
                    responses::q7.eq(a7),
                    responses::q8.eq(a8),
                    responses::q9.eq(a9),
                    responses::q10.eq(a10),
                    responses::q11.eq(a11),
                    responses::q12.eq(a12),
                    responses::q13.eq(a13),
                    responses::q14.eq(a14),
                    responses::q15.eq(a15),
                    responses::q16.eq(a16),
                    responses::q17.eq(a17),
                    responses::q18.eq(a18),
                    responses::q19.eq(a19),
                    responses::q20.eq(a20),
                    responses::q21.eq(a21),
                    responses::q22.eq(a22),
                    responses::q23.eq(a23),
                    responses::q24.eq(a24),
                    responses::q25.eq(a25),
                    responses::q26.eq(a26),
                    responses::q27.eq(a27),
                    responses::q28.eq(a28),
                    responses::q29.eq(a29),
                    responses::q30.eq(a30),
                ),
            ))
            .execute(conn)?;

        Ok(SurveyResponse {
            id,
            participant_id: participant_id.to_string(),
            created_at,
            phase,
            answers,
        })
    }

    /// Responses of one participant, newest first.
    pub fn of_participant(
        participant_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<SurveyResponse>, diesel::result::Error> {
        responses::table
            .filter(responses::participant_id.eq(participant_id))
            .order_by(responses::created_at.desc())
            .select((
                responses::id,
                responses::participant_id,
                responses::created_at,
                responses::phase,
                answer_columns!(),
            ))
            .load::<RawResponse>(conn)?
            .into_iter()
            .map(SurveyResponse::try_from)
            .collect()
    }

    /// Every response matching `filter`, with its participant, newest first.
    pub fn all_with_participants(
        filter: ResponseFilter,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Vec<(SurveyResponse, Participant)>, diesel::result::Error> {
        let mut query = responses::table
            .inner_join(participants::table)
            .order_by(responses::created_at.desc())
            .select((
                (
                    responses::id,
                    responses::participant_id,
                    responses::created_at,
                    responses::phase,
                    answer_columns!(),
                ),
                participants::all_columns,
            ))
            .into_boxed();

        if let Some(phase) = filter.phase {
            query = query.filter(responses::phase.eq(phase.code()));
        }
        if let Some(gender) = filter.gender {
            query = query.filter(participants::gender.eq(gender.code()));
        }

        query
            .load::<(RawResponse, ParticipantRow)>(conn)?
            .into_iter()
            .map(|(response, participant)| {
                Ok((
                    SurveyResponse::try_from(response)?,
                    Participant::try_from(participant)?,
                ))
            })
            .collect()
    }

    pub fn count(
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<i64, diesel::result::Error> {
        responses::table.count().get_result(conn)
    }
}

/// Formats a score for display.
pub fn fmt_score(score: f64) -> String {
    format!("{score:.2}")
}

pub fn fmt_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
