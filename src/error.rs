// src/error.rs
//! Error types for buffer operations with advanced conversion support

use std::fmt;

/// Errors that can occur during buffer operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// Position exceeds buffer length
    PositionOutOfBounds,
    /// Increment would exceed buffer size
    IncrementTooLarge,
    /// Buffer size exceeds maximum allowed
    SizeTooBig,
    /// Attempted to read/write beyond buffer bounds
    BufferOverflow,
    /// Invalid buffer state
    InvalidState(String),
    /// Write would exceed available space
    InsufficientSpace,
    /// Invalid string encoding
    InvalidString,
    /// Invalid data format
    InvalidData(String),
    /// I/O error (for compatibility)
    Io(String),
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionOutOfBounds => write!(f, "Position out of bounds"),
            Self::IncrementTooLarge => write!(f, "Increment too large"),
            Self::SizeTooBig => write!(f, "Buffer size too big"),
            Self::BufferOverflow => write!(f, "Buffer overflow"),
            Self::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Self::InsufficientSpace => write!(f, "Insufficient space in buffer"),
            Self::InvalidString => write!(f, "Invalid string encoding"),
            Self::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for BufferError {}

// ============================================================================
// ADVANCED ERROR CONVERSION - Makes buffer library compatible with any error type
// ============================================================================

/// Convert BufferError to std::io::Error
impl From<BufferError> for std::io::Error {
    fn from(err: BufferError) -> Self {
        use std::io::ErrorKind;
        match err {
            BufferError::BufferOverflow | BufferError::InsufficientSpace => {
                std::io::Error::new(ErrorKind::WriteZero, err)
            }
            BufferError::Io(msg) => {
                std::io::Error::new(ErrorKind::Other, msg)
            }
            _ => std::io::Error::new(ErrorKind::Other, err),
        }
    }
}

/// Convert std::io::Error to BufferError
impl From<std::io::Error> for BufferError {
    fn from(err: std::io::Error) -> Self {
        BufferError::Io(err.to_string())
    }
}

// ============================================================================
// RESULT TYPE ALIASES
// ============================================================================

/// Result type alias for buffer operations
///
/// Note: When using with other Result types (like anyhow::Result),
/// either qualify the type (`buffer::Result<T>`) or use the conversion traits.
pub type Result<T> = std::result::Result<T, BufferError>;

// ============================================================================
// EXTENSION TRAIT FOR EASY CONVERSION
// ============================================================================

/// Extension trait for converting Results between different error types
pub trait ResultExt<T> {
    /// Convert to io::Result
    fn into_io(self) -> std::io::Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_io(self) -> std::io::Result<T> {
        self.map_err(|e| e.into())
    }
}

// ============================================================================
// HELPER MACROS FOR ERROR HANDLING
// ============================================================================

/// Convenience macro for converting buffer operations to any Result type.
///
/// Requires an explicit target error type as the second argument so the
/// conversion is unambiguous: error types like
/// `anyhow::Error` have multiple overlapping `From` impls.
///
/// # Example
/// ```ignore
/// use msgreactor::prelude::*;
/// use msgreactor::buffer_op;
///
/// fn handler_function() -> std::io::Result<()> {
///     let mut buf = Buffer::new(1024);
///     buffer_op!(buf.put_u32(42), std::io::Error)?;
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! buffer_op {
    // Two-arg form: explicit target type (use this with anyhow, Box<dyn Error>, etc.)
    ($expr:expr, $target:ty) => {
        $expr.map_err(|e: $crate::BufferError| -> $target { e.into() })
    };
    // One-arg form: defaults to std::io::Error (unambiguous, no overlapping impls)
    ($expr:expr) => {
        $expr.map_err(|e: $crate::BufferError| -> std::io::Error { e.into() })
    };
}

/// Try a buffer operation with automatic error conversion
#[macro_export]
macro_rules! buffer_try {
    ($expr:expr) => {
        match $expr {
            Ok(val) => val,
            Err(e) => return Err(e.into()),
        }
    };
}

// ============================================================================
// SERVER-LEVEL ERRORS
// ============================================================================

/// Errors surfaced by the reactor server, distinct from the buffer-level
/// [`BufferError`]. Startup errors are fatal and propagate out of
/// [`crate::reactor::Reactor::start`]; every other kind is contained to a
/// single connection or operation and only ever logged.
#[derive(Debug)]
pub enum ServerError {
    /// Binding the listening socket failed.
    Bind(std::io::Error),
    /// `listen()` on the bound socket failed.
    Listen(std::io::Error),
    /// Creating the readiness facility (`mio::Poll`) failed.
    PollInit(std::io::Error),
    /// Accepting a new connection failed with a non-transient error.
    Accept(std::io::Error),
    /// A per-connection I/O operation failed; contained to that connection.
    Io(std::io::Error),
    /// The configured capacity (buffer pool, accumulator, memory ceiling)
    /// was exceeded for a single operation.
    CapacityExceeded(String),
    /// The configuration file or CLI overrides could not be parsed.
    Config(String),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind(e) => write!(f, "failed to bind listening socket: {e}"),
            Self::Listen(e) => write!(f, "failed to listen on socket: {e}"),
            Self::PollInit(e) => write!(f, "failed to create readiness facility: {e}"),
            Self::Accept(e) => write!(f, "failed to accept connection: {e}"),
            Self::Io(e) => write!(f, "connection I/O error: {e}"),
            Self::CapacityExceeded(msg) => write!(f, "capacity exceeded: {msg}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(err)
    }
}

/// Result type alias for server-level operations.
pub type ServerResult<T> = std::result::Result<T, ServerError>;
