use common_rust::env;
use log::info;

/// Initialize `env_logger`. The filter is taken from `RUST_LOG`, `info` if it is not set.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Get address tuple (Host, Port) from environment variables `HOST` and `PORT`.
/// Default host in prod builds is `0.0.0.0`, in debug builds is `127.0.0.1`.
/// Default port is 8080 for all types of build.
pub fn get_address() -> (String, u16) {
    let host = env::get_or(
        "HOST",
        if cfg!(debug_assertions) {
            "127.0.0.1"
        } else {
            "0.0.0.0"
        },
    );
    let port = env::get_parsed_or::<u16>("PORT", 8080);
    info!("Starting server on {}:{}", host, port);
    (host, port)
}

/// Create struct for app scope Error and implement all necessary standard
/// and actix-web traits for further use as `Responder`.
///
/// The HTTP status is picked by the first `CommonError` in the error chain:
/// `GatewayError` → 502, `NotFoundError` → 404, `UserError` → 400, anything else → 500.
/// Client errors carry their message in the body, server errors only the status.
///
/// Following traits will be implemented:
/// - [std::fmt::Debug]
/// - [std::fmt::Display]
/// - From<[anyhow::Error]>
/// - [actix_web::ResponseError]
#[macro_export]
macro_rules! define_app_error {
    ($name:tt) => {
        use actix_web::{
            http::{header::ContentType, StatusCode},
            HttpResponse,
        };
        use common_errors::errors::CommonError;
        use std::fmt::{Debug, Display};

        pub struct $name(anyhow::Error);

        impl Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:?}", self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<anyhow::Error> for $name {
            fn from(value: anyhow::Error) -> Self {
                Self(value)
            }
        }

        impl $name {
            fn common_error(&self) -> Option<&CommonError> {
                self.0
                    .chain()
                    .find_map(|err| err.downcast_ref::<CommonError>())
            }
        }

        impl actix_web::ResponseError for $name {
            fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
                let status_code = self.status_code();
                let body = match self.common_error() {
                    Some(err) if status_code.is_client_error() => err.to_string(),
                    _ => format!("Error code: {}", status_code),
                };
                HttpResponse::build(status_code)
                    .insert_header(ContentType::plaintext())
                    .body(body)
            }

            fn status_code(&self) -> StatusCode {
                match self.common_error() {
                    Some(CommonError::GatewayError(_)) => StatusCode::BAD_GATEWAY,
                    Some(CommonError::NotFoundError(_)) => StatusCode::NOT_FOUND,
                    Some(CommonError::UserError(_)) => StatusCode::BAD_REQUEST,
                    Some(CommonError::InternalError(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
                }
            }
        }
    };
}
