//! Error types surfaced by the decoder and by command application.

use thiserror::Error;

/// Errors produced while cutting the input byte stream into commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input ended in the middle of an escape sequence or a multi-byte
    /// UTF-8 character. The unconsumed tail should be retained and retried
    /// once more input arrives.
    #[error("incomplete sequence, more input required")]
    Incomplete,
    /// A byte that cannot begin or continue a valid UTF-8 encoding.
    #[error("invalid utf-8 byte in input stream")]
    InvalidUtf8,
}

/// Errors produced while applying a decoded command.
///
/// `Unsupported` is recoverable: the command was well-formed but this
/// terminal has no handler for it. `Malformed` means the parameter shape was
/// invalid; only the faulty command is aborted, never the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unsupported command: {0}")]
    Unsupported(String),
    #[error("malformed parameters: {0}")]
    Malformed(String),
    /// The requested cursor target was outside the grid. The move has
    /// already been applied with clamped coordinates.
    #[error("cursor target out of bounds ({y}, {x})")]
    OutOfBounds { y: isize, x: isize },
}
