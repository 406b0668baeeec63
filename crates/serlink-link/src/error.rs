/// Errors that can occur on the link's write path.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// An I/O error occurred while writing to the transport.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport reported end-of-stream while writing.
    #[error("transport closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, LinkError>;
