pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed graph payload: {message}")]
    MalformedGraph { message: String },

    #[error("Invalid layout config: {message}")]
    InvalidConfig { message: String },
}
