use thiserror::Error;

/// Failures surfaced to callers of [`crate::client::BotClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("discord rejected the bot token: {0}")]
    Authentication(String),

    #[error("discord request failed: {0}")]
    Discord(#[from] serenity::Error),

    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Failures from the outbound side of the chat platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("discord request failed: {0}")]
    Discord(#[from] serenity::Error),

    #[error("{0}")]
    Other(String),
}

/// HTTP status of a failed Discord REST call, if the error carries one.
pub(crate) fn http_status(error: &serenity::Error) -> Option<u16> {
    match error {
        serenity::Error::Http(http) => http.status_code().map(|status| status.as_u16()),
        _ => None,
    }
}
