use snafu::{Location, Snafu};

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::repl::ReplError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ApplicationError {
    /// could not parse the configuration
    #[snafu(transparent)]
    Config { source: ConfigError },

    /// Could not build the HTTP client
    HttpClient {
        source: reqwest::Error,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not load the signed-in member, check `CLUB_API_TOKEN`
    SignIn {
        source: ApiError,
        #[snafu(implicit)]
        location: Location,
    },

    /// Could not initialize the logger
    InitializeLogger {
        source: tracing::subscriber::SetGlobalDefaultError,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(transparent)]
    Repl { source: ReplError },
}
