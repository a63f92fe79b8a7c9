//! The SAN questionnaire: thirty bipolar adjective pairs, each rated on a
//! seven point scale, which are collapsed into three composite scores
//! (well-being, activity and mood) plus an overall score.
//!
//! Raw answers run from `-3` to `3`. A positive answer leans towards the
//! left-hand pole of the question. Because the instrument deliberately mixes
//! the direction of its pairs, every answer is first normalised onto a common
//! `1..=7` scale (see [`item_score`]) before any averaging takes place.

use serde::{Deserialize, Serialize};

pub const QUESTION_COUNT: usize = 30;
pub const ITEMS_PER_SCALE: usize = 10;

pub const MIN_ANSWER: i8 = -3;
pub const MAX_ANSWER: i8 = 3;

pub struct Question {
    pub left: &'static str,
    pub right: &'static str,
    /// Whether the left-hand pole is the "good" end of the pair.
    pub left_positive: bool,
}

const fn q(left: &'static str, right: &'static str, left_positive: bool) -> Question {
    Question {
        left,
        right,
        left_positive,
    }
}

pub const QUESTIONS: [Question; QUESTION_COUNT] = [
    q("Feeling well", "Feeling unwell", true),
    q("Strong", "Weak", true),
    q("Passive", "Active", false),
    q("Sluggish", "Mobile", false),
    q("Cheerful", "Sad", true),
    q("Good mood", "Bad mood", true),
    q("Able to work", "Worn out", true),
    q("Full of strength", "Exhausted", true),
    q("Slow", "Quick", false),
    q("Idle", "Busy", false),
    q("Happy", "Unhappy", true),
    q("Lively", "Gloomy", true),
    q("Tense", "Relaxed", false),
    q("Healthy", "Ill", true),
    q("Indifferent", "Absorbed", false),
    q("Unconcerned", "Excited", false),
    q("Enthusiastic", "Dejected", true),
    q("Joyful", "Sorrowful", true),
    q("Rested", "Tired", true),
    q("Fresh", "Drained", true),
    q("Sleepy", "Aroused", false),
    q("Wanting to rest", "Wanting to work", false),
    q("Calm", "Worried", true),
    q("Optimistic", "Pessimistic", true),
    q("Enduring", "Easily tired", true),
    q("Vigorous", "Lethargic", true),
    q("Thinking is hard", "Thinking is easy", false),
    q("Absent-minded", "Attentive", false),
    q("Full of hope", "Disappointed", true),
    q("Satisfied", "Dissatisfied", true),
];

/// The three composite scales of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scale {
    Wellbeing,
    Activity,
    Mood,
}

impl Scale {
    pub const ALL: [Scale; 3] = [Scale::Wellbeing, Scale::Activity, Scale::Mood];

    /// Zero-based indices of the questions which make up this scale.
    ///
    /// The three scales partition the questionnaire: every question belongs
    /// to exactly one of them.
    pub const fn items(self) -> [usize; ITEMS_PER_SCALE] {
        match self {
            Scale::Wellbeing => [0, 1, 6, 7, 12, 13, 18, 19, 24, 25],
            Scale::Activity => [2, 3, 8, 9, 14, 15, 20, 21, 26, 27],
            Scale::Mood => [4, 5, 10, 11, 16, 17, 22, 23, 28, 29],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Scale::Wellbeing => "Well-being",
            Scale::Activity => "Activity",
            Scale::Mood => "Mood",
        }
    }
}

/// Maps a raw answer onto the normalised `1..=7` scale, where 7 is always the
/// positive extreme.
pub fn item_score(answer: i8, left_positive: bool) -> u8 {
    debug_assert!((MIN_ANSWER..=MAX_ANSWER).contains(&answer));
    if left_positive {
        (4 + answer) as u8
    } else {
        (4 - answer) as u8
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum AnswerError {
    #[error("answer to question {question} must lie in -3..=3 (got {value})")]
    OutOfRange { question: usize, value: i64 },
    #[error("expected 30 answers, got {0}")]
    WrongCount(usize),
}

/// A complete, validated set of answers to the questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answers([i8; QUESTION_COUNT]);

impl Default for Answers {
    fn default() -> Self {
        Self([0; QUESTION_COUNT])
    }
}

impl Answers {
    pub fn new(raw: [i64; QUESTION_COUNT]) -> Result<Self, AnswerError> {
        let mut answers = [0i8; QUESTION_COUNT];
        for (i, value) in raw.into_iter().enumerate() {
            answers[i] = match i8::try_from(value) {
                Ok(v) if (MIN_ANSWER..=MAX_ANSWER).contains(&v) => v,
                _ => {
                    return Err(AnswerError::OutOfRange {
                        question: i + 1,
                        value,
                    });
                }
            };
        }
        Ok(Self(answers))
    }

    pub fn from_slice(raw: &[i64]) -> Result<Self, AnswerError> {
        let raw: [i64; QUESTION_COUNT] = raw
            .try_into()
            .map_err(|_| AnswerError::WrongCount(raw.len()))?;
        Self::new(raw)
    }

    pub fn as_array(&self) -> &[i8; QUESTION_COUNT] {
        &self.0
    }

    /// Normalised score of every question, in questionnaire order.
    pub fn item_scores(&self) -> [u8; QUESTION_COUNT] {
        let mut out = [0u8; QUESTION_COUNT];
        for (i, (answer, question)) in self.0.iter().zip(&QUESTIONS).enumerate() {
            out[i] = item_score(*answer, question.left_positive);
        }
        out
    }

    pub fn scale_score(&self, scale: Scale) -> f64 {
        let items = self.item_scores();
        let total: u32 = scale.items().iter().map(|i| items[*i] as u32).sum();
        total as f64 / ITEMS_PER_SCALE as f64
    }

    pub fn scores(&self) -> Scores {
        let items = self.item_scores();
        let total: u32 = items.iter().map(|s| *s as u32).sum();

        Scores {
            wellbeing: self.scale_score(Scale::Wellbeing),
            activity: self.scale_score(Scale::Activity),
            mood: self.scale_score(Scale::Mood),
            overall: total as f64 / QUESTION_COUNT as f64,
        }
    }
}

/// Composite scores for one response. Each lies in `1.0..=7.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scores {
    pub wellbeing: f64,
    pub activity: f64,
    pub mood: f64,
    pub overall: f64,
}

impl Scores {
    pub fn get(&self, scale: Scale) -> f64 {
        match scale {
            Scale::Wellbeing => self.wellbeing,
            Scale::Activity => self.activity,
            Scale::Mood => self.mood,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn item_score_stays_on_the_seven_point_scale() {
        for v in MIN_ANSWER..=MAX_ANSWER {
            for p in [true, false] {
                assert!((1..=7).contains(&item_score(v, p)));
            }
        }
        assert_eq!(item_score(3, true), 7);
        assert_eq!(item_score(-3, true), 1);
        assert_eq!(item_score(3, false), 1);
        assert_eq!(item_score(-3, false), 7);
    }

    #[test]
    fn neutral_answers_score_four_everywhere() {
        let scores = Answers::default().scores();
        assert_eq!(scores.wellbeing, 4.0);
        assert_eq!(scores.activity, 4.0);
        assert_eq!(scores.mood, 4.0);
        assert_eq!(scores.overall, 4.0);
    }

    #[test]
    fn scales_partition_the_questionnaire() {
        let mut seen = HashSet::new();
        for scale in Scale::ALL {
            for item in scale.items() {
                assert!(seen.insert(item), "question {item} is in two scales");
            }
        }
        assert_eq!(seen, (0..QUESTION_COUNT).collect::<HashSet<_>>());
    }

    #[test]
    fn positive_extremes_max_out_wellbeing() {
        let mut raw = [0i64; QUESTION_COUNT];
        for i in Scale::Wellbeing.items() {
            raw[i] = if QUESTIONS[i].left_positive { 3 } else { -3 };
        }
        let answers = Answers::new(raw).unwrap();
        assert_eq!(answers.scale_score(Scale::Wellbeing), 7.0);
        assert_eq!(answers.scale_score(Scale::Activity), 4.0);
    }

    #[test]
    fn polarity_is_respected_per_question() {
        let mut raw = [0i64; QUESTION_COUNT];
        raw[0] = 3;
        raw[2] = 3;
        let items = Answers::new(raw).unwrap().item_scores();
        assert_eq!(items[0], 7);
        assert_eq!(items[2], 1);
    }

    #[test]
    fn overall_agrees_with_mean_of_scales() {
        let raw: [i64; QUESTION_COUNT] =
            std::array::from_fn(|i| (i as i64 % 7) - 3);
        let scores = Answers::new(raw).unwrap().scores();

        let items = Answers::new(raw).unwrap().item_scores();
        let direct =
            items.iter().map(|s| *s as f64).sum::<f64>() / QUESTION_COUNT as f64;
        assert!((scores.overall - direct).abs() < 1e-12);

        let via_scales = (scores.wellbeing + scores.activity + scores.mood) / 3.0;
        assert!((scores.overall - via_scales).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_answers_are_rejected() {
        let mut raw = [0i64; QUESTION_COUNT];
        raw[12] = 4;
        assert_eq!(
            Answers::new(raw),
            Err(AnswerError::OutOfRange {
                question: 13,
                value: 4
            })
        );
        assert_eq!(
            Answers::from_slice(&[0; 29]),
            Err(AnswerError::WrongCount(29))
        );
    }
}
