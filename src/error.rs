use serenity::all::HttpError;
use thiserror::Error;

/// Discord JSON error codes that mean the target no longer exists.
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_MEMBER: isize = 10007;
/// Discord JSON error codes that mean the bot lacks access.
const MISSING_ACCESS: isize = 50001;
const MISSING_PERMISSIONS: isize = 50013;

/// Failure of a call made to the chat platform.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform refused the operation.
    #[error("missing permissions")]
    Forbidden,
    /// The channel or member vanished between read and act.
    #[error("not found")]
    NotFound,
    /// Any other HTTP or gateway failure.
    #[error(transparent)]
    Transport(Box<serenity::Error>),
}

impl PlatformError {
    /// Short description shown to whoever invoked a command.
    pub fn user_message(&self) -> &'static str {
        match self {
            PlatformError::Forbidden => "I don't have permission to do that.",
            PlatformError::NotFound => "That channel or member no longer exists.",
            PlatformError::Transport(_) => "Discord did not accept the request, try again later.",
        }
    }
}

impl From<serenity::Error> for PlatformError {
    fn from(err: serenity::Error) -> Self {
        if let serenity::Error::Http(HttpError::UnsuccessfulRequest(ref response)) = err {
            match response.error.code {
                UNKNOWN_CHANNEL | UNKNOWN_MEMBER => return PlatformError::NotFound,
                MISSING_ACCESS | MISSING_PERMISSIONS => return PlatformError::Forbidden,
                _ => {}
            }
            match response.status_code.as_u16() {
                403 => return PlatformError::Forbidden,
                404 => return PlatformError::NotFound,
                _ => {}
            }
        }
        PlatformError::Transport(Box::new(err))
    }
}
