/// Result alias carrying the crate's [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by buffer creation and control operations
///
/// Nothing here is ever produced on the real-time path; underruns are counted, not raised.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Sample storage could not be allocated
    #[error("failed to allocate {bytes} bytes of sample storage")]
    Alloc {
        /// Size of the rejected allocation
        bytes: usize,
    },
    /// The sample converter could not be initialized for a format
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    /// An argument was outside the range an operation accepts
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Both halves of a streamed buffer still hold audio the mixer has not consumed
    #[error("no sub-buffer is available for refill")]
    NotReady,
}
