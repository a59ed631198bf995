use reqwest::StatusCode;
use snafu::{Location, Snafu};

use crate::Located;

pub type Result<T, E = ApiError> = ::std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("`{endpoint}` rejected the session token (401)"))]
    Unauthorized {
        endpoint: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{endpoint}` requires an active subscription (403)"))]
    Forbidden {
        endpoint: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("`{endpoint}` responded with {status}: {body}"))]
    Status {
        endpoint: String,
        status: StatusCode,
        body: String,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("request to `{endpoint}` failed: {source}"))]
    Request {
        endpoint: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("malformed response from `{endpoint}`: {source}"))]
    Decode {
        endpoint: String,
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot build the url for `{path}`: {source}"))]
    Endpoint {
        path: String,
        source: url::ParseError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("cannot read `{path}` for upload: {source}"))]
    ReadFile {
        path: String,
        source: std::io::Error,
        #[snafu(implicit)]
        location: Location,
    },
}

impl ApiError {
    /// The session is gone and the user has to log in again.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The member lacks the subscription the resource requires.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, ApiError::Forbidden { .. })
    }
}

impl Located for ApiError {
    fn location(&self) -> Location {
        match self {
            ApiError::Unauthorized { location, .. }
            | ApiError::Forbidden { location, .. }
            | ApiError::Status { location, .. }
            | ApiError::Request { location, .. }
            | ApiError::Decode { location, .. }
            | ApiError::Endpoint { location, .. }
            | ApiError::ReadFile { location, .. } => *location,
        }
    }
}
