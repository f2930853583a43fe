/// Result alias that carries the custom [`PlayerError`] type.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Common error type for the core crate.
///
/// The pure geometry and playlist state machines are infallible by design;
/// this type exists for the genuinely fallible surface around them (file IO
/// in the application crate, malformed inputs at the boundary).
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// Free-form message wrapper for errors surfaced to the user.
    #[error("{0}")]
    Message(String),
    /// A caller handed the core something it cannot work with.
    #[error("{0}")]
    InvalidInput(&'static str),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl PlayerError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for PlayerError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for PlayerError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
