use thiserror::Error;

macro_rules! invariant_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::InvariantViolation {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::InvariantViolation {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// The decoder distinguishes fatal conditions (a file that is not a Burp project at all) from
/// the per-record failures that a heuristic scan over an undocumented container is expected to
/// hit. The latter are recovered locally by the scanners: the offending record is skipped and
/// the scan continues.
///
/// # Error Categories
///
/// ## Fatal at open
/// - [`Error::InvalidFile`] - Empty or unusable input
/// - [`Error::InvalidMagic`] - First four bytes are not the project-file magic
/// - [`Error::FileError`] - Filesystem I/O errors
///
/// ## Per-record failures (recovered during scans)
/// - [`Error::InvalidOffset`] - Read attempted at or beyond the end of the file
/// - [`Error::ShortRead`] - Fewer bytes available than a record layout requires
/// - [`Error::SignatureMismatch`] - Expected constant prefix not present
/// - [`Error::InvariantViolation`] - A length/offset relationship did not hold
/// - [`Error::LimitExceeded`] - Capacity, field count, depth, or size bound hit
/// - [`Error::MissingField`] - Expected typed-record field id absent
///
/// ## Streaming
/// - [`Error::Cancelled`] - Cooperative cancellation during streaming
#[derive(Error, Debug)]
pub enum Error {
    /// The input cannot be used as a project file at all.
    ///
    /// Raised for empty input or input too small to carry the fixed file header.
    #[error("Invalid project file: {0}")]
    InvalidFile(String),

    /// The first four bytes are not the project-file magic.
    ///
    /// Project files start with the big-endian constant `0x66858280`; anything
    /// else is rejected before any scanning takes place.
    #[error("Invalid magic bytes: 0x{found:08x}")]
    InvalidMagic {
        /// The four bytes actually found at offset 0
        found: u32,
    },

    /// File I/O error.
    ///
    /// Wraps standard I/O errors that can occur while opening or mapping the
    /// project file.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A read was attempted at or beyond the end of the file.
    #[error("Invalid offset 0x{offset:x}: beyond end of file")]
    InvalidOffset {
        /// The offending absolute file offset
        offset: u64,
    },

    /// A record layout required more bytes than the file could provide.
    #[error("Short read at 0x{offset:x}: wanted {wanted} bytes, got {got}")]
    ShortRead {
        /// Absolute file offset of the read
        offset: u64,
        /// Bytes the record layout requires
        wanted: usize,
        /// Bytes actually available
        got: usize,
    },

    /// A constant byte prefix expected at this offset was not present.
    ///
    /// Signature scans use this to reject false-positive hits; it is never
    /// fatal during a scan.
    #[error("Signature mismatch at 0x{offset:x}")]
    SignatureMismatch {
        /// Absolute file offset of the candidate record
        offset: u64,
    },

    /// A length or offset relationship of a record layout did not hold.
    ///
    /// The error carries the source location where the violation was detected,
    /// mirroring how malformed input is reported throughout the crate.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of the violated relationship
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Invariant violation - {file}:{line}: {message}")]
    InvariantViolation {
        /// The message to be printed for the violation
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A structural bound was hit while decoding.
    ///
    /// All bounds in the decoder are structural (list capacity, field count,
    /// traversal depth, record size); none are time-based.
    #[error("Limit exceeded for {what}: {value} > {limit}")]
    LimitExceeded {
        /// Which bound was hit
        what: &'static str,
        /// The value encountered
        value: u64,
        /// The configured structural limit
        limit: u64,
    },

    /// A typed record did not carry a field id the decoder requires.
    #[error("Missing typed-record field 0x{id:02x}")]
    MissingField {
        /// The absent field id
        id: u8,
    },

    /// The consumer cancelled a streaming operation.
    ///
    /// Reported exactly once on the terminal error channel of
    /// [`crate::ProjectReader::stream_http_history`].
    #[error("Operation cancelled")]
    Cancelled,
}
