use axum::{Json, http::StatusCode, response::IntoResponse};
use thiserror::Error;

use crate::{
    auth::CryptError,
    error::log_error,
    model::{DatabaseError, ResourceType},
    web::UserRole,
};

pub type WebResult<T> = std::result::Result<T, WebError>;

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("RegistrationUserConflict")]
    RegistrationUserConflict,
}

#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("AuthenticationTokenInvalid, source: {source_name}. Error: {error}")]
    AuthenticationTokenInvalid {
        source_name: String,
        error: jsonwebtoken::errors::Error,
    },

    #[error("AuthenticationRequired")]
    AuthenticationRequired,

    #[error("AuthenticationInvalidCredentials")]
    AuthenticationInvalidCredentials,

    #[error("AuthenticationAccountLocked")]
    AuthenticationAccountLocked,

    #[error("AuthenticationRoleRequired: {role}")]
    AuthenticationRoleRequired { role: UserRole },
}

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("ResourceNotFound: {resource_type:?}")]
    ResourceNotFound { resource_type: ResourceType },

    #[error("ResourceForbidden: {resource_type:?}")]
    ResourceForbidden { resource_type: ResourceType },

    #[error("ResourceFetchError: {resource_type:?}. Error: {error}")]
    ResourceFetchError {
        resource_type: ResourceType,
        error: DatabaseError,
    },

    #[error("ResourceBadRequest: {resource_type:?}, {message}")]
    ResourceBadRequest {
        resource_type: ResourceType,
        message: String,
    },

    #[error("ResourceConflict: {resource_type:?}, {message}")]
    ResourceConflict {
        resource_type: ResourceType,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("RequestPaymentRequired")]
    RequestPaymentRequired,
}

#[derive(Debug, Error)]
pub enum ExamError {
    #[error("ExamNotEnrolled")]
    ExamNotEnrolled,

    #[error("ExamLessonsIncomplete")]
    ExamLessonsIncomplete,

    #[error("ExamCooldown: {seconds}s left")]
    ExamCooldown { seconds: i64 },

    #[error("ExamNoQuestions")]
    ExamNoQuestions,

    #[error("ExamAttemptMismatch")]
    ExamAttemptMismatch,

    #[error("ExamAlreadySubmitted")]
    ExamAlreadySubmitted,

    #[error("ExamTimeLimitExceeded")]
    ExamTimeLimitExceeded,

    #[error("ExamNotSubmitted")]
    ExamNotSubmitted,

    #[error("ExamCourseNotEnrolled")]
    ExamCourseNotEnrolled,
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("ServerCryptError: {0}")]
    ServerCryptError(#[from] crate::auth::CryptError),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn client_display(&self) -> String {
        String::from("Internal server error.")
    }
}

impl RegistrationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RegistrationUserConflict => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RegistrationUserConflict => {
                String::from("Registration error, user already exists.")
            }
        }
    }
}

impl AuthenticationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired => StatusCode::UNAUTHORIZED,
            Self::AuthenticationInvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::AuthenticationTokenInvalid { .. } => StatusCode::UNAUTHORIZED,
            Self::AuthenticationAccountLocked => StatusCode::FORBIDDEN,
            Self::AuthenticationRoleRequired { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::AuthenticationTokenInvalid { .. } => {
                String::from("Authentication error, token invalid or expired.")
            }
            Self::AuthenticationRequired => String::from("Authentication required."),
            Self::AuthenticationInvalidCredentials => {
                String::from("Authentication error, user not found or password is invalid.")
            }
            Self::AuthenticationAccountLocked => String::from("Account is locked."),
            Self::AuthenticationRoleRequired { role } => format!("Access denied, {role} role required."),
        }
    }
}

impl ResourceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ResourceForbidden { .. } => StatusCode::FORBIDDEN,
            Self::ResourceFetchError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ResourceBadRequest { .. } => StatusCode::BAD_REQUEST,
            Self::ResourceConflict { .. } => StatusCode::CONFLICT,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceNotFound { .. } => String::from("Resource error, resource not found."),
            Self::ResourceForbidden { .. } => String::from("Resource error, resource forbidden."),
            Self::ResourceFetchError { .. } => {
                String::from("Resource error, unable to fetch resource.")
            }
            Self::ResourceBadRequest { message, .. } => message.clone(),
            Self::ResourceConflict { message, .. } => message.clone(),
        }
    }
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RequestPaymentRequired => StatusCode::PAYMENT_REQUIRED,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::RequestPaymentRequired => {
                String::from("Payment required, use checkout to enroll in this course.")
            }
        }
    }
}

impl ExamError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ExamNotEnrolled => StatusCode::FORBIDDEN,
            Self::ExamNoQuestions | Self::ExamCourseNotEnrolled => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ExamNotEnrolled => String::from("You must be enrolled in this course"),
            Self::ExamLessonsIncomplete => {
                String::from("Must complete all lessons before taking exam")
            }
            Self::ExamCooldown { seconds } => {
                format!("Please wait {seconds} seconds before retrying")
            }
            Self::ExamNoQuestions => String::from("No questions available for this exam"),
            Self::ExamAttemptMismatch => String::from("Attempt does not belong to this exam"),
            Self::ExamAlreadySubmitted => String::from("Exam already submitted"),
            Self::ExamTimeLimitExceeded => String::from("Time limit exceeded"),
            Self::ExamNotSubmitted => String::from("Exam not yet submitted"),
            Self::ExamCourseNotEnrolled => String::from("Not enrolled in this course"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("ResourceError - {0}")]
    ResourceError(#[from] ResourceError),
    #[error("AuthenticationError - {0}")]
    AuthenticationError(#[from] AuthenticationError),
    #[error("RegistrationError - {0}")]
    RegistrationError(#[from] RegistrationError),
    #[error("RequestError - {0}")]
    RequestError(#[from] RequestError),
    #[error("ExamError - {0}")]
    ExamError(#[from] ExamError),
    #[error("ServerError - {0}")]
    ServerError(#[from] ServerError),
}

impl WebError {
    pub fn resource_not_found(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceNotFound {
            resource_type: r#type,
        })
    }

    pub fn resource_forbidden(r#type: ResourceType) -> Self {
        Self::ResourceError(ResourceError::ResourceForbidden {
            resource_type: r#type,
        })
    }

    pub fn resource_fetch_error(r#type: ResourceType, error: DatabaseError) -> Self {
        Self::ResourceError(ResourceError::ResourceFetchError {
            resource_type: r#type,
            error,
        })
    }

    /// Maps `DatabaseError::Forbidden` from access checks to 403, anything
    /// else to a fetch error.
    pub fn resource_access_error(r#type: ResourceType, error: DatabaseError) -> Self {
        if let DatabaseError::Forbidden = error {
            Self::resource_forbidden(r#type)
        } else {
            Self::resource_fetch_error(r#type, error)
        }
    }

    pub fn resource_bad_request<S: Into<String>>(r#type: ResourceType, message: S) -> Self {
        Self::ResourceError(ResourceError::ResourceBadRequest {
            resource_type: r#type,
            message: message.into(),
        })
    }

    pub fn resource_conflict<S: Into<String>>(r#type: ResourceType, message: S) -> Self {
        Self::ResourceError(ResourceError::ResourceConflict {
            resource_type: r#type,
            message: message.into(),
        })
    }

    pub fn auth_token_invalid<S: Into<String>>(
        source_name: S,
        error: jsonwebtoken::errors::Error,
    ) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationTokenInvalid {
            source_name: source_name.into(),
            error,
        })
    }

    pub fn auth_required() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRequired)
    }

    pub fn auth_invalid_credentials() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationInvalidCredentials)
    }

    pub fn auth_account_locked() -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationAccountLocked)
    }

    pub fn role_required(role: UserRole) -> Self {
        Self::AuthenticationError(AuthenticationError::AuthenticationRoleRequired { role })
    }

    pub fn registration_conflict() -> Self {
        Self::RegistrationError(RegistrationError::RegistrationUserConflict)
    }

    pub fn payment_required() -> Self {
        Self::RequestError(RequestError::RequestPaymentRequired)
    }

    pub fn server_crypt_error(e: CryptError) -> Self {
        Self::ServerError(ServerError::ServerCryptError(e))
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            Self::ResourceError(e) => e.status_code(),
            Self::RegistrationError(e) => e.status_code(),
            Self::AuthenticationError(e) => e.status_code(),
            Self::RequestError(e) => e.status_code(),
            Self::ExamError(e) => e.status_code(),
            Self::ServerError(e) => e.status_code(),
        }
    }

    pub fn client_display(&self) -> String {
        match self {
            Self::ResourceError(e) => e.client_display(),
            Self::RegistrationError(e) => e.client_display(),
            Self::AuthenticationError(e) => e.client_display(),
            Self::RequestError(e) => e.client_display(),
            Self::ExamError(e) => e.client_display(),
            Self::ServerError(e) => e.client_display(),
        }
    }

    /// Broad category reported to clients alongside the message.
    pub fn error_type(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "VALIDATION_ERROR",
            StatusCode::UNAUTHORIZED => "AUTHENTICATION_ERROR",
            StatusCode::PAYMENT_REQUIRED => "PAYMENT_REQUIRED",
            StatusCode::FORBIDDEN => "AUTHORIZATION_ERROR",
            StatusCode::NOT_FOUND => "NOT_FOUND_ERROR",
            StatusCode::CONFLICT => "CONFLICT_ERROR",
            _ => "INTERNAL_SERVER_ERROR",
        }
    }
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Human-readable message for the client
    pub error: String,
    /// Broad error category, e.g. `VALIDATION_ERROR`
    pub error_type: String,
    /// HTTP status code (stringified)
    pub status_code: String,
    /// Optional debug details (only in debug mode)
    pub details: Option<String>,
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        log_error(&self);

        let status_code = self.status_code();

        let body = ErrorResponse {
            success: false,
            error: self.client_display(),
            error_type: self.error_type().to_string(),
            status_code: status_code.as_str().to_string(),
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        };

        (status_code, Json(body)).into_response()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn exam_errors_map_to_statuses() {
        let cases = [
            (ExamError::ExamNotEnrolled, StatusCode::FORBIDDEN),
            (ExamError::ExamLessonsIncomplete, StatusCode::BAD_REQUEST),
            (ExamError::ExamCooldown { seconds: 5 }, StatusCode::BAD_REQUEST),
            (ExamError::ExamNoQuestions, StatusCode::NOT_FOUND),
            (ExamError::ExamAlreadySubmitted, StatusCode::BAD_REQUEST),
            (ExamError::ExamTimeLimitExceeded, StatusCode::BAD_REQUEST),
            (ExamError::ExamNotSubmitted, StatusCode::BAD_REQUEST),
            (ExamError::ExamCourseNotEnrolled, StatusCode::NOT_FOUND),
        ];

        for (error, status) in cases {
            assert_eq!(WebError::from(error).status_code(), status);
        }
    }

    #[test]
    fn cooldown_message_carries_seconds() {
        let error = WebError::from(ExamError::ExamCooldown { seconds: 42 });
        assert_eq!(error.client_display(), "Please wait 42 seconds before retrying");
        assert_eq!(error.error_type(), "VALIDATION_ERROR");
    }

    #[test]
    fn error_types_follow_status() {
        assert_eq!(WebError::auth_required().error_type(), "AUTHENTICATION_ERROR");
        assert_eq!(WebError::registration_conflict().error_type(), "CONFLICT_ERROR");
        assert_eq!(
            WebError::resource_not_found(ResourceType::Course).error_type(),
            "NOT_FOUND_ERROR"
        );
        assert_eq!(WebError::payment_required().status_code(), StatusCode::PAYMENT_REQUIRED);
    }
}
