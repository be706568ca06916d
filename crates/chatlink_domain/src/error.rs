use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The caller's cancellation token fired while the response was being
    /// linkified. No partial output is returned.
    #[error("Linkification was cancelled")]
    Cancelled,

    #[error("Response linkifier was used after it was flushed")]
    AlreadyFlushed,
}

pub type Result<A> = std::result::Result<A, Error>;
