use std::{error::Error, fmt::Display};

/// # CommonError
///
/// All errors in this project should be divided into four categories:
/// - `InternalError` - errors that occur if the algorithms of this project do not work correctly,
///   or if local storage cannot be read or decoded.
/// - `GatewayError` - errors that occur when the upstream timetable API is unavailable
///   or answers with a non-2xx status.
/// - `NotFoundError` - the upstream answered, but nothing matches the request
///   (for example, a search term that resolves to no group).
/// - `UserError` - errors that occur due to the fact that the user sent incorrect data.
///
/// All low-level project components should wrap their root/leaf errors with `CommonError`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    InternalError(String),
    GatewayError(String),
    NotFoundError(String),
    UserError(String),
}

impl CommonError {
    /// Alias for [CommonError::InternalError], immediately convert argument to string.
    pub fn internal<E: Display>(e: E) -> CommonError {
        CommonError::InternalError(e.to_string())
    }

    /// Alias for [CommonError::GatewayError], immediately convert argument to string.
    pub fn gateway<E: Display>(e: E) -> CommonError {
        CommonError::GatewayError(e.to_string())
    }

    /// Alias for [CommonError::NotFoundError], immediately convert argument to string.
    pub fn not_found<E: Display>(e: E) -> CommonError {
        CommonError::NotFoundError(e.to_string())
    }

    /// Alias for [CommonError::UserError], immediately convert argument to string.
    pub fn user<E: Display>(e: E) -> CommonError {
        CommonError::UserError(e.to_string())
    }

    fn with_message(&self, message: String) -> CommonError {
        match self {
            CommonError::InternalError(_) => CommonError::InternalError(message),
            CommonError::GatewayError(_) => CommonError::GatewayError(message),
            CommonError::NotFoundError(_) => CommonError::NotFoundError(message),
            CommonError::UserError(_) => CommonError::UserError(message),
        }
    }
}

impl Display for CommonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommonError::InternalError(s) => write!(f, "Internal error: {s}"),
            CommonError::GatewayError(s) => write!(f, "Gateway error: {s}"),
            CommonError::NotFoundError(s) => write!(f, "Not found: {s}"),
            CommonError::UserError(s) => write!(f, "User error: {s}"),
        }
    }
}

impl Error for CommonError {}

pub trait CommonErrorExt {
    fn as_common_error(&self) -> Option<&CommonError>;

    /// Flatten the whole error chain into a single [CommonError].
    ///
    /// The category is taken from the first [CommonError] found in the chain
    /// (`InternalError` if there is none), the message is the full chain description.
    fn to_common_error(&self) -> CommonError;
}

impl CommonErrorExt for anyhow::Error {
    fn as_common_error(&self) -> Option<&CommonError> {
        self.chain()
            .find_map(|err| err.downcast_ref::<CommonError>())
    }

    fn to_common_error(&self) -> CommonError {
        let message = format!("{self:#}");
        match self.as_common_error() {
            Some(common_error) => common_error.with_message(message),
            None => CommonError::InternalError(message),
        }
    }
}
