use thiserror::Error;

#[derive(Error, Debug)]
pub enum SQLError {
    #[error("query error: {0}")]
    Query(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("connection error: {0}")]
    Connection(String),

    /// A batch was rolled back because statement `{0}` (zero-based)
    /// matched no rows — a conditional write's precondition failed.
    #[error("batch aborted: statement {0} matched no rows")]
    Aborted(usize),
}
