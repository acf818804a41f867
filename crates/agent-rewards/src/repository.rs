/// Storage failure shared by every repository trait in the crate.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A uniqueness rule enforced by the store rejected the write.
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
