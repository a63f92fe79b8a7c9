//! Who may do what.
//!
//! The policy is deliberately free of any request or session state: callers
//! pass the [`Identity`] making the request and, where relevant, the owner of
//! the record being touched, and get back an [`Access`] decision.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::Key;

use crate::{
    auth::User,
    state::DbPool,
    util_resp::{FailureResponse, StandardResponse, forbidden, see_other_ok},
};

pub const ADMIN_DASHBOARD: &str = "/admin-dashboard";
pub const PROFILE: &str = "/profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Administrators: see everything, take no surveys.
    Staff,
    Member,
}

#[derive(Debug, Clone, Copy)]
pub struct Identity<'a> {
    pub id: &'a str,
    pub role: Role,
}

/// Where a user is sent once they have logged in.
pub fn landing_for(role: Role) -> &'static str {
    match role {
        Role::Staff => ADMIN_DASHBOARD,
        Role::Member => PROFILE,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create, view or edit a participant record.
    ManageParticipant,
    SubmitResponse,
    ListParticipants,
    ListResponses,
    ViewReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    Denied,
    /// Not an error, but this user has no business here.
    Redirect(&'static str),
}

impl Access {
    /// Returns the response to send if the request must not proceed.
    pub fn enforce(self) -> Option<StandardResponse> {
        match self {
            Access::Granted => None,
            Access::Denied => Some(forbidden()),
            Access::Redirect(to) => Some(see_other_ok(Redirect::to(to))),
        }
    }
}

/// Decides whether `identity` may perform `op`.
///
/// `owner` is the id of the user owning the participant the operation
/// targets. `None` covers both unowned and non-existent records, which are
/// treated identically so that a denial never reveals whether a record exists.
pub fn authorize(
    identity: Identity<'_>,
    op: Operation,
    owner: Option<&str>,
) -> Access {
    let owns = owner == Some(identity.id);

    match (identity.role, op) {
        (
            Role::Staff,
            Operation::ListParticipants
            | Operation::ListResponses
            | Operation::ViewReport,
        ) => Access::Granted,
        (Role::Staff, Operation::ManageParticipant | Operation::SubmitResponse) => {
            Access::Redirect(ADMIN_DASHBOARD)
        }
        (
            Role::Member,
            Operation::ListParticipants
            | Operation::ListResponses
            | Operation::ViewReport,
        ) => Access::Denied,
        (
            Role::Member,
            Operation::ManageParticipant | Operation::SubmitResponse,
        ) => {
            if owns {
                Access::Granted
            } else {
                Access::Denied
            }
        }
    }
}

/// Extracts the current user, rejecting the request with a 403 unless they
/// are staff.
pub struct IsStaff<const TX: bool>(pub User<TX>);

#[async_trait]
impl<S, const TX: bool> FromRequestParts<S> for IsStaff<TX>
where
    S: Send + Sync,
    DbPool: FromRef<S>,
    Key: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let user = User::<TX>::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if user.is_staff {
            Ok(IsStaff(user))
        } else {
            tracing::debug!(user = %user.username, "non-staff user denied");
            Err(FailureResponse::Forbidden(()).into_response())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Identity = Identity {
        id: "alice",
        role: Role::Member,
    };
    const ADMIN: Identity = Identity {
        id: "admin",
        role: Role::Staff,
    };

    #[test]
    fn members_only_reach_their_own_records() {
        for op in [Operation::ManageParticipant, Operation::SubmitResponse] {
            assert_eq!(authorize(ALICE, op, Some("alice")), Access::Granted);
            assert_eq!(authorize(ALICE, op, Some("bob")), Access::Denied);
            assert_eq!(authorize(ALICE, op, None), Access::Denied);
        }
    }

    #[test]
    fn members_cannot_see_aggregates() {
        for op in [
            Operation::ListParticipants,
            Operation::ListResponses,
            Operation::ViewReport,
        ] {
            assert_eq!(authorize(ALICE, op, None), Access::Denied);
            assert_eq!(authorize(ADMIN, op, None), Access::Granted);
        }
    }

    #[test]
    fn staff_are_sent_away_from_the_survey_flow() {
        assert_eq!(
            authorize(ADMIN, Operation::SubmitResponse, Some("alice")),
            Access::Redirect(ADMIN_DASHBOARD)
        );
        assert_eq!(
            authorize(ADMIN, Operation::ManageParticipant, Some("admin")),
            Access::Redirect(ADMIN_DASHBOARD)
        );
    }

    #[test]
    fn landing_depends_on_role() {
        assert_eq!(landing_for(Role::Staff), ADMIN_DASHBOARD);
        assert_eq!(landing_for(Role::Member), PROFILE);
    }
}
