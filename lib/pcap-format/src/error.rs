use std::io;

use snafu::Snafu;

/// Error taxonomy shared by every crate in the workspace.
///
/// Mirrors the kinds enumerated in the container format specification: the
/// format/codec layer only ever produces [`PcapError::InvalidArgument`],
/// [`PcapError::InvalidFormat`], and [`PcapError::IntegrityError`] directly;
/// the remaining variants exist here because `pcap-store` and `pcap-replay`
/// both need to hand back the same error type and there is no benefit to
/// three parallel enums that all wrap `io::Error` the same way.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum PcapError {
    /// A caller-supplied argument violated a documented precondition: a null
    /// or empty path, a zero-length or oversized payload, or a negative
    /// position.
    #[snafu(display("invalid argument: {message}"))]
    InvalidArgument { message: String },

    /// A project or data file was expected to exist and did not.
    #[snafu(display("not found: {message}"))]
    NotFound { message: String },

    /// A header or record failed to parse: bad magic, unsupported version,
    /// a truncated buffer, or a length field outside its legal range.
    #[snafu(display("invalid format: {message}"))]
    InvalidFormat { message: String },

    /// A stored CRC-32 did not match the recomputed checksum of the bytes it
    /// covers.
    #[snafu(display("integrity error: {message}"))]
    IntegrityError { message: String },

    /// An underlying filesystem or network operation failed.
    #[snafu(display("I/O error: {source}"))]
    Io { source: io::Error },

    /// An operation was attempted on a project/reader/writer that is not in
    /// a state that permits it (e.g. a write after `close`).
    #[snafu(display("invalid state: {message}"))]
    InvalidState { message: String },

    /// An async operation observed cancellation before completing.
    #[snafu(display("cancelled"))]
    Cancelled,
}

impl From<io::Error> for PcapError {
    fn from(source: io::Error) -> Self {
        PcapError::Io { source }
    }
}

impl PcapError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        PcapError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        PcapError::NotFound {
            message: message.into(),
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        PcapError::InvalidFormat {
            message: message.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        PcapError::IntegrityError {
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        PcapError::InvalidState {
            message: message.into(),
        }
    }
}

pub type Result<T, E = PcapError> = std::result::Result<T, E>;
