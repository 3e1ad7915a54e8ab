use thiserror::Error;

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Channel error: {0}")]
    ChannelError(String),
}
