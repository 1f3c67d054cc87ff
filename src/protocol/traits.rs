//! Core protocol traits
//!
//! Decoders only ever see a [`LineChannel`]: the live connection in production,
//! a scripted transcript in tests.

use async_trait::async_trait;

use super::error::ProtocolError;
use super::records::Fields;

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Line-level access to the server
#[async_trait]
pub trait LineChannel: Send {
	/// Take the next complete line, suspending until one arrives
	async fn next_line(&mut self) -> ProtocolResult<String>;

	/// Write one command line (the newline is appended)
	async fn send_line(&mut self, line: &str) -> ProtocolResult<()>;

	/// Whether the server side has gone away
	fn is_closed(&self) -> bool;
}

/// One response grammar
///
/// A decoder consumes exactly the lines of one response and nothing more.
#[async_trait]
pub trait Decoder: Send + Sync + 'static {
	type Output: Send + 'static;

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<Self::Output>;
}

/// A record carried on a tagged line inside a `begin`/`end` list
pub trait Record: Sized + Send + 'static {
	/// Leading token of the record line
	const TAG: &'static str;

	/// Parse the tokens following the tag
	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self>;
}

// vim: ts=4
