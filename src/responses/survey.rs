use std::collections::HashMap;

use axum::{
    extract::{Form, Path},
    response::Redirect,
};
use chrono::Utc;
use hypertext::prelude::*;

use crate::{
    auth::User,
    participants::{Participant, get_or_provision},
    permission::{Operation, PROFILE, authorize},
    questionnaire::{Answers, MAX_ANSWER, MIN_ANSWER, QUESTION_COUNT, QUESTIONS},
    responses::{Phase, SurveyResponse},
    state::Conn,
    template::Page,
    util_resp::{StandardResponse, bad_request, forbidden, see_other_ok, success},
    widgets::alert::ErrorAlert,
};

/// A questionnaire submission: a phase and one answer per question.
#[derive(Debug, Default)]
pub struct SurveyForm {
    pub phase: Option<String>,
    /// Answers keyed by zero-based question index, as posted.
    pub answers: HashMap<usize, String>,
}

impl SurveyForm {
    /// Collects the `phase` and `q1`..`q30` fields, ignoring anything else.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = SurveyForm::default();
        for (key, value) in pairs {
            if key == "phase" {
                form.phase = Some(value);
            } else if let Some(n) = key
                .strip_prefix('q')
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|n| (1..=QUESTION_COUNT).contains(n))
            {
                form.answers.insert(n - 1, value);
            }
        }
        form
    }

    pub fn validate(&self) -> Result<(Phase, Answers), String> {
        let phase = self
            .phase
            .as_deref()
            .and_then(Phase::from_code)
            .ok_or_else(|| "please choose whether this is before or after the session".to_string())?;

        let mut raw = [0i64; QUESTION_COUNT];
        for (i, slot) in raw.iter_mut().enumerate() {
            let value = self
                .answers
                .get(&i)
                .ok_or_else(|| format!("please answer question {}", i + 1))?;
            *slot = value
                .trim()
                .parse::<i64>()
                .map_err(|_| format!("answer to question {} is not a number", i + 1))?;
        }
        let answers = Answers::new(raw).map_err(|e| e.to_string())?;

        Ok((phase, answers))
    }

    fn selected(&self, question: usize, value: i8) -> bool {
        self.answers
            .get(&question)
            .and_then(|v| v.trim().parse::<i8>().ok())
            == Some(value)
    }
}

struct SurveyFields<'r> {
    form: &'r SurveyForm,
}

impl Renderable for SurveyFields<'_> {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        let phase = self.form.phase.as_deref().and_then(Phase::from_code);
        // Left-most radio is the strongest agreement with the left pole.
        let values: Vec<i8> = (MIN_ANSWER..=MAX_ANSWER).rev().collect();

        maud! {
            div class="mb-4" {
                label for="phase" class="form-label" { "When are you filling this in?" }
                select class="form-select" id="phase" name="phase" required {
                    @for p in Phase::ALL {
                        option value=(p.code()) selected[phase == Some(p)] {
                            (p.label())
                        }
                    }
                }
            }
            table class="table align-middle" {
                tbody {
                    @for (i, question) in QUESTIONS.iter().enumerate() {
                        tr {
                            td class="text-muted" { (i + 1) }
                            td class="text-end" { (question.left) }
                            @for value in &values {
                                td class="text-center" {
                                    label class="d-block" {
                                        input type="radio" class="form-check-input"
                                            name=(format!("q{}", i + 1))
                                            value=(*value)
                                            checked[self.form.selected(i, *value)]
                                            required;
                                        div class="small" { (value.abs()) }
                                    }
                                }
                            }
                            td { (question.right) }
                        }
                    }
                }
            }
        }
        .render_to(buffer);
    }
}

fn survey_page<const TX: bool>(
    user: &User<TX>,
    participant: &Participant,
    form: &SurveyForm,
    error: Option<&str>,
) -> Rendered<String> {
    Page::new()
        .user(user)
        .body(maud! {
            h1 { "How do you feel right now?" }
            p class="text-muted" {
                "Participant: " (participant.name) ". For each pair, pick the \
                 number closest to the word that describes your state best."
            }
            @if let Some(error) = error {
                ErrorAlert msg=(error);
            }
            form method="post" {
                SurveyFields form=(form);
                button type="submit" class="btn btn-primary" { "Submit" }
            }
        })
        .render()
}

/// Finds the participant the survey is for and checks the user may answer
/// on their behalf.
fn survey_target<const TX: bool>(
    user: &User<TX>,
    participant_id: Option<&str>,
    conn: &mut Conn<true>,
) -> Result<Participant, StandardResponse> {
    let identity = user.identity();

    match participant_id {
        None => {
            // Staff have no survey of their own; bail before provisioning.
            if let Some(stop) =
                authorize(identity, Operation::SubmitResponse, Some(identity.id))
                    .enforce()
            {
                return Err(stop);
            }
            let today = Utc::now().date_naive();
            get_or_provision(user, today, &mut **conn).map_err(|e| Err(e.into()))
        }
        Some(id) => {
            let participant =
                Participant::fetch(id, &mut **conn).map_err(|e| Err(e.into()))?;
            let owner = participant.as_ref().and_then(|p| p.user_id.as_deref());

            if let Some(stop) =
                authorize(identity, Operation::SubmitResponse, owner).enforce()
            {
                return Err(stop);
            }
            // Access is only ever granted to the owner of an existing record.
            participant.ok_or(forbidden())
        }
    }
}

async fn show_survey(
    user: User<true>,
    mut conn: Conn<true>,
    participant_id: Option<String>,
) -> StandardResponse {
    let participant =
        match survey_target(&user, participant_id.as_deref(), &mut conn) {
            Ok(p) => p,
            Err(stop) => return stop,
        };

    success(survey_page(&user, &participant, &SurveyForm::default(), None))
}

#[tracing::instrument(skip_all, fields(user = %user.username))]
async fn submit_survey(
    user: User<true>,
    mut conn: Conn<true>,
    participant_id: Option<String>,
    pairs: Vec<(String, String)>,
) -> StandardResponse {
    let participant =
        match survey_target(&user, participant_id.as_deref(), &mut conn) {
            Ok(p) => p,
            Err(stop) => return stop,
        };

    let form = SurveyForm::from_pairs(pairs);
    let (phase, answers) = match form.validate() {
        Ok(valid) => valid,
        Err(e) => {
            return bad_request(survey_page(&user, &participant, &form, Some(&e)));
        }
    };

    let response = SurveyResponse::insert(
        &participant.id,
        phase,
        answers,
        Utc::now().naive_utc(),
        &mut *conn,
    )?;
    tracing::info!(response = %response.id, phase = phase.code(), "recorded response");

    see_other_ok(Redirect::to(PROFILE))
}

pub async fn own_survey_page(
    user: User<true>,
    conn: Conn<true>,
) -> StandardResponse {
    show_survey(user, conn, None).await
}

pub async fn do_own_survey(
    user: User<true>,
    conn: Conn<true>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> StandardResponse {
    submit_survey(user, conn, None, pairs).await
}

pub async fn participant_survey_page(
    Path(participant_id): Path<String>,
    user: User<true>,
    conn: Conn<true>,
) -> StandardResponse {
    show_survey(user, conn, Some(participant_id)).await
}

pub async fn do_participant_survey(
    Path(participant_id): Path<String>,
    user: User<true>,
    conn: Conn<true>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> StandardResponse {
    submit_survey(user, conn, Some(participant_id), pairs).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(phase: &str, answer: &str) -> Vec<(String, String)> {
        let mut pairs = vec![("phase".to_string(), phase.to_string())];
        for i in 1..=QUESTION_COUNT {
            pairs.push((format!("q{i}"), answer.to_string()));
        }
        pairs
    }

    #[test]
    fn complete_submission_is_accepted() {
        let (phase, answers) =
            SurveyForm::from_pairs(pairs("after", "-2")).validate().unwrap();
        assert_eq!(phase, Phase::After);
        assert!(answers.as_array().iter().all(|a| *a == -2));
    }

    #[test]
    fn incomplete_or_invalid_submissions_are_rejected() {
        let mut missing = pairs("before", "1");
        missing.retain(|(k, _)| k != "q17");
        assert_eq!(
            SurveyForm::from_pairs(missing).validate().unwrap_err(),
            "please answer question 17"
        );

        assert!(SurveyForm::from_pairs(pairs("during", "1")).validate().is_err());
        assert!(SurveyForm::from_pairs(pairs("before", "5")).validate().is_err());
        assert!(SurveyForm::from_pairs(pairs("before", "x")).validate().is_err());
    }

    #[test]
    fn unrelated_fields_are_ignored() {
        let mut extra = pairs("before", "0");
        extra.push(("q31".to_string(), "3".to_string()));
        extra.push(("csrf".to_string(), "abc".to_string()));
        let form = SurveyForm::from_pairs(extra);
        assert_eq!(form.answers.len(), QUESTION_COUNT);
        assert!(form.validate().is_ok());
    }
}
