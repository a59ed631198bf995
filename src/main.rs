use dotenvy::dotenv;
use snafu::ResultExt;

use club::api::{CourseBackend, HttpBackend};
use club::config::Config;
use club::error::{ApplicationError, HttpClientSnafu, SignInSnafu};
use club::{logger, repl};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    dotenv().ok();

    let config = Config::from_env()?;

    let _guard = logger::init(&config)?;

    let backend = HttpBackend::new(config.api_url.clone(), config.api_token.clone())
        .context(HttpClientSnafu)?;
    let member = backend.me().await.context(SignInSnafu)?;
    tracing::info!(member.id = %member.id, role = ?member.role, "signed in");

    let mut repl = repl::Repl::new()?;
    repl::start(&mut repl, &config, backend, member).await;

    Ok(())
}
