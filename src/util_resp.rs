use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use hypertext::Rendered;

pub fn see_other_ok(r: Redirect) -> StandardResponse {
    Ok(SuccessResponse::SeeOther(r))
}

pub fn bad_request(html: Rendered<String>) -> StandardResponse {
    Err(FailureResponse::BadRequest(html))
}

pub fn success(html: Rendered<String>) -> StandardResponse {
    Ok(SuccessResponse::Success(html))
}

pub fn forbidden() -> StandardResponse {
    Err(FailureResponse::Forbidden(()))
}

pub type StandardResponse = Result<SuccessResponse, FailureResponse>;

pub enum SuccessResponse {
    Success(Rendered<String>),
    SeeOther(Redirect),
    /// A non-HTML payload (e.g. a CSV download).
    File {
        content_type: &'static str,
        filename: String,
        body: Vec<u8>,
    },
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        match self {
            SuccessResponse::Success(html) => {
                Html(html.into_inner()).into_response()
            }
            SuccessResponse::SeeOther(redirect) => redirect.into_response(),
            SuccessResponse::File {
                content_type,
                filename,
                body,
            } => (
                [
                    (axum::http::header::CONTENT_TYPE, content_type.to_string()),
                    (
                        axum::http::header::CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{filename}\""),
                    ),
                ],
                body,
            )
                .into_response(),
        }
    }
}

#[derive(Debug)]
pub enum FailureResponse {
    BadRequest(Rendered<String>),
    Forbidden(()),
    ServerError(()),
}

impl IntoResponse for FailureResponse {
    fn into_response(self) -> Response {
        match self {
            FailureResponse::BadRequest(html) => {
                (StatusCode::BAD_REQUEST, Html(html.into_inner()))
                    .into_response()
            }
            FailureResponse::Forbidden(()) => {
                (StatusCode::FORBIDDEN, "You do not have access to this page")
                    .into_response()
            }
            FailureResponse::ServerError(()) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                    .into_response()
            }
        }
    }
}

impl From<diesel::result::Error> for FailureResponse {
    fn from(e: diesel::result::Error) -> Self {
        tracing::error!("database error: {e}");
        FailureResponse::ServerError(())
    }
}
