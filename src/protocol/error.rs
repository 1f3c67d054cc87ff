//! Protocol error types
//!
//! Every failure the protocol engine can report. Grammar failures carry the
//! expected and received tokens so the offending exchange can be read straight
//! from the log.

use std::fmt;
use std::io;

/// Protocol error type
#[derive(Debug)]
pub enum ProtocolError {
	/// I/O error from the underlying stream
	Io(io::Error),

	/// A received line did not match the expected grammar
	Violation { expected: String, received: String },

	/// A tagged record line carried the wrong number of fields or an unparsable value
	Malformed { record: &'static str, detail: String, line: String },

	/// The stream ended before the response was complete
	ConnectionClosed,

	/// An incoming line exceeded the configured bound
	LineTooLong { limit: usize },

	/// The engine stopped after an earlier fatal error
	Halted { reason: String },

	/// A call was refused before reaching the wire
	InvalidArgument { detail: String },
}

impl ProtocolError {
	/// Build a violation from the expected alternatives and the received tokens
	pub fn violation(expected: &[&str], received: &[&str]) -> Self {
		ProtocolError::Violation { expected: expected.join(" or "), received: received.join(" ") }
	}

	/// Whether the engine must stop after this error
	///
	/// Grammar failures leave the stream at an unknown position, so no later
	/// response can be attributed to its command.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, ProtocolError::Halted { .. } | ProtocolError::InvalidArgument { .. })
	}
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::Violation { expected, received } => {
				write!(f, "Unexpected response: expected '{}', received '{}'", expected, received)
			}
			ProtocolError::Malformed { record, detail, line } => {
				write!(f, "Malformed {} record ({}): '{}'", record, detail, line)
			}
			ProtocolError::ConnectionClosed => write!(f, "Connection closed by server"),
			ProtocolError::LineTooLong { limit } => {
				write!(f, "Incoming line exceeds {} bytes", limit)
			}
			ProtocolError::Halted { reason } => {
				write!(f, "Protocol engine halted after earlier error: {}", reason)
			}
			ProtocolError::InvalidArgument { detail } => write!(f, "Invalid argument: {}", detail),
		}
	}
}

impl std::error::Error for ProtocolError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ProtocolError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		match e.kind() {
			io::ErrorKind::BrokenPipe
			| io::ErrorKind::ConnectionReset
			| io::ErrorKind::UnexpectedEof => ProtocolError::ConnectionClosed,
			_ => ProtocolError::Io(e),
		}
	}
}


// vim: ts=4
