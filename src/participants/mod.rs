use chrono::{Datelike, NaiveDate};
use diesel::{connection::LoadConnection, prelude::*, sqlite::Sqlite};
use hypertext::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{auth::User, schema::participants, validation::is_valid_display_name};

pub mod create;
pub mod list;
pub mod profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    /// The value stored in the database and posted by forms.
    pub fn code(self) -> &'static str {
        match self {
            Gender::Male => "M",
            Gender::Female => "F",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "M" => Some(Gender::Male),
            "F" => Some(Gender::Female),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

#[derive(Queryable, Debug, Clone)]
pub struct ParticipantRow {
    pub id: String,
    pub user_id: Option<String>,
    pub name: String,
    pub gender: String,
    pub birth_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    /// The user who owns this record, if any.
    pub user_id: Option<String>,
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = diesel::result::Error;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        let gender = Gender::from_code(&row.gender).ok_or_else(|| {
            diesel::result::Error::DeserializationError(
                format!("unknown gender code {:?}", row.gender).into(),
            )
        })?;
        Ok(Participant {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            gender,
            birth_date: row.birth_date,
        })
    }
}

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

/// The fields a user may set on a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantDetails {
    pub name: String,
    pub gender: Gender,
    pub birth_date: NaiveDate,
}

/// The participant form, as posted. Missing fields are left blank so that
/// [`ParticipantForm::validate`] can say which one is wrong.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ParticipantForm {
    pub name: String,
    pub gender: String,
    pub birth_date: String,
}

impl ParticipantForm {
    pub fn validate(&self, today: NaiveDate) -> Result<ParticipantDetails, String> {
        is_valid_display_name(&self.name)?;
        let gender = Gender::from_code(&self.gender)
            .ok_or_else(|| "please choose a gender".to_string())?;
        let birth_date = NaiveDate::parse_from_str(&self.birth_date, "%Y-%m-%d")
            .map_err(|_| "birth date must be a date (YYYY-MM-DD)".to_string())?;
        if birth_date > today {
            return Err("birth date cannot be in the future".to_string());
        }

        Ok(ParticipantDetails {
            name: self.name.trim().to_string(),
            gender,
            birth_date,
        })
    }
}

impl Participant {
    pub fn details(&self) -> ParticipantDetails {
        ParticipantDetails {
            name: self.name.clone(),
            gender: self.gender,
            birth_date: self.birth_date,
        }
    }

    pub fn age_on(&self, today: NaiveDate) -> i32 {
        age_on(self.birth_date, today)
    }

    pub fn fetch(
        id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<Participant>, diesel::result::Error> {
        participants::table
            .filter(participants::id.eq(id))
            .first::<ParticipantRow>(conn)
            .optional()?
            .map(Participant::try_from)
            .transpose()
    }

    /// The participant owned by `user_id`. Should several exist, the oldest
    /// one wins.
    pub fn of_user(
        user_id: &str,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Option<Participant>, diesel::result::Error> {
        participants::table
            .filter(participants::user_id.eq(user_id))
            .order_by(participants::id.asc())
            .first::<ParticipantRow>(conn)
            .optional()?
            .map(Participant::try_from)
            .transpose()
    }

    pub fn create(
        user_id: Option<&str>,
        details: &ParticipantDetails,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<Participant, diesel::result::Error> {
        let id = Uuid::now_v7().to_string();
        diesel::insert_into(participants::table)
            .values((
                participants::id.eq(&id),
                participants::user_id.eq(user_id),
                participants::name.eq(&details.name),
                participants::gender.eq(details.gender.code()),
                participants::birth_date.eq(details.birth_date),
            ))
            .execute(conn)?;

        Ok(Participant {
            id,
            user_id: user_id.map(ToString::to_string),
            name: details.name.clone(),
            gender: details.gender,
            birth_date: details.birth_date,
        })
    }

    pub fn update(
        &mut self,
        details: ParticipantDetails,
        conn: &mut impl LoadConnection<Backend = Sqlite>,
    ) -> Result<(), diesel::result::Error> {
        diesel::update(participants::table.filter(participants::id.eq(&self.id)))
            .set((
                participants::name.eq(&details.name),
                participants::gender.eq(details.gender.code()),
                participants::birth_date.eq(details.birth_date),
            ))
            .execute(conn)?;

        self.name = details.name;
        self.gender = details.gender;
        self.birth_date = details.birth_date;
        Ok(())
    }
}

/// Returns the participant owned by `user`, creating one with placeholder
/// details if there is none yet.
///
/// The placeholder uses the username as the name, [`Gender::Male`] and
/// `today` as the birth date, and stands in until the user edits their
/// profile. Calling this again returns the same record.
pub fn get_or_provision<const TX: bool>(
    user: &User<TX>,
    today: NaiveDate,
    conn: &mut impl LoadConnection<Backend = Sqlite>,
) -> Result<Participant, diesel::result::Error> {
    if let Some(existing) = Participant::of_user(&user.id, &mut *conn)? {
        return Ok(existing);
    }

    let participant = Participant::create(
        Some(&user.id),
        &ParticipantDetails {
            name: user.username.clone(),
            gender: Gender::Male,
            birth_date: today,
        },
        conn,
    )?;
    tracing::info!(
        user = %user.username,
        participant = %participant.id,
        "provisioned participant"
    );

    Ok(participant)
}

/// The name/gender/birth date inputs, pre-filled with whatever is known.
#[derive(Default)]
pub struct ParticipantFields {
    pub name: String,
    pub gender: Option<Gender>,
    pub birth_date: String,
}

impl ParticipantFields {
    pub fn from_details(details: &ParticipantDetails) -> Self {
        Self {
            name: details.name.clone(),
            gender: Some(details.gender),
            birth_date: details.birth_date.format("%Y-%m-%d").to_string(),
        }
    }

    /// Echoes a submitted (possibly invalid) form back to the user.
    pub fn from_form(form: &ParticipantForm) -> Self {
        Self {
            name: form.name.clone(),
            gender: Gender::from_code(&form.gender),
            birth_date: form.birth_date.clone(),
        }
    }
}

impl Renderable for ParticipantFields {
    fn render_to(
        &self,
        buffer: &mut hypertext::Buffer<hypertext::context::Node>,
    ) {
        maud! {
            div class="mb-3" {
                label for="name" class="form-label" { "Surname and initials" }
                input type="text" class="form-control" id="name" name="name"
                    maxlength="100" required value=(self.name);
            }
            div class="mb-3" {
                label for="gender" class="form-label" { "Gender" }
                select class="form-select" id="gender" name="gender" required {
                    @for g in Gender::ALL {
                        option value=(g.code()) selected[self.gender == Some(g)] {
                            (g.label())
                        }
                    }
                }
            }
            div class="mb-3" {
                label for="birth_date" class="form-label" { "Date of birth" }
                input type="date" class="form-control" id="birth_date" name="birth_date"
                    required value=(self.birth_date);
            }
        }
        .render_to(buffer);
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_completed_years() {
        let born = date(2000, 6, 15);
        assert_eq!(age_on(born, date(2025, 6, 14)), 24);
        assert_eq!(age_on(born, date(2025, 6, 15)), 25);
        assert_eq!(age_on(born, date(2025, 12, 1)), 25);
        assert_eq!(age_on(born, born), 0);
    }

    #[test]
    fn participant_form_is_validated() {
        let today = date(2025, 10, 26);
        let ok = ParticipantForm {
            name: " Petrov P. P. ".to_string(),
            gender: "F".to_string(),
            birth_date: "1999-02-03".to_string(),
        }
        .validate(today)
        .unwrap();
        assert_eq!(ok.name, "Petrov P. P.");
        assert_eq!(ok.gender, Gender::Female);
        assert_eq!(ok.birth_date, date(1999, 2, 3));

        let bad_gender = ParticipantForm {
            name: "A".to_string(),
            gender: "X".to_string(),
            birth_date: "1999-02-03".to_string(),
        };
        assert!(bad_gender.validate(today).is_err());

        let future = ParticipantForm {
            name: "A".to_string(),
            gender: "M".to_string(),
            birth_date: "2030-01-01".to_string(),
        };
        assert!(future.validate(today).is_err());
    }
}
