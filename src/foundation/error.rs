pub type CliplaneResult<T> = Result<T, CliplaneError>;

#[derive(thiserror::Error, Debug)]
pub enum CliplaneError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("load error: {0}")]
    Load(String),

    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliplaneError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load(msg.into())
    }

    pub fn invalid_mutation(msg: impl Into<String>) -> Self {
        Self::InvalidMutation(msg.into())
    }

    pub fn unknown_event(msg: impl Into<String>) -> Self {
        Self::UnknownEvent(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for CliplaneError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
