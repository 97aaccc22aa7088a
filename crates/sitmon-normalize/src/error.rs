#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("record missing required field `{0}`")]
    MissingField(&'static str),
    #[error("record field `{0}` had an unexpected shape")]
    BadShape(&'static str),
}

pub type Result<T> = std::result::Result<T, NormalizeError>;
