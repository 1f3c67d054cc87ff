//! Incremental line framing for the inbound byte stream
//!
//! The server gives no message boundaries other than `\n`. Raw reads are fed
//! into a [`LineFramer`], which splits them into lines in arrival order and
//! hands each line to exactly one reader. A reader that asks for a line before
//! one is buffered registers a waiter and is resumed, oldest first, as soon as
//! a newline arrives.

use std::collections::VecDeque;
use tokio::sync::{oneshot, Mutex};
use tracing::trace;

use super::error::ProtocolError;
use super::traits::ProtocolResult;

/// Why the framer stopped accepting bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseReason {
	Eof,
	LineTooLong(usize),
}

impl CloseReason {
	fn to_error(self) -> ProtocolError {
		match self {
			CloseReason::Eof => ProtocolError::ConnectionClosed,
			CloseReason::LineTooLong(limit) => ProtocolError::LineTooLong { limit },
		}
	}
}

#[derive(Debug, Default)]
struct LineBuffer {
	/// Bytes after the last newline seen
	partial: Vec<u8>,
	/// Complete lines not yet taken by a reader
	ready: VecDeque<String>,
	/// Readers suspended until a line arrives
	waiters: VecDeque<oneshot::Sender<String>>,
	closed: Option<CloseReason>,
	max_line_bytes: Option<usize>,
}

impl LineBuffer {
	fn within_bound(&self, len: usize) -> Result<(), CloseReason> {
		match self.max_line_bytes {
			Some(limit) if len > limit => Err(CloseReason::LineTooLong(limit)),
			_ => Ok(()),
		}
	}

	/// Move complete lines to `ready`, stopping at the first over-long one
	fn extract_lines(&mut self) -> Result<(), CloseReason> {
		while let Some(pos) = self.partial.iter().position(|&b| b == b'\n') {
			let rest = self.partial.split_off(pos + 1);
			let mut raw = std::mem::replace(&mut self.partial, rest);
			raw.pop();
			if raw.last() == Some(&b'\r') {
				raw.pop();
			}
			self.within_bound(raw.len())?;
			let line = String::from_utf8_lossy(&raw).into_owned();
			trace!("recv: {}", line);
			self.ready.push_back(line);
		}
		// An unterminated tail may not grow past the bound either
		self.within_bound(self.partial.len())
	}

	/// Hand buffered lines to waiting readers in registration order
	fn wake_waiters(&mut self) {
		while !self.waiters.is_empty() {
			let mut line = match self.ready.pop_front() {
				Some(line) => line,
				None => break,
			};
			loop {
				match self.waiters.pop_front() {
					Some(waiter) => match waiter.send(line) {
						Ok(()) => break,
						// Reader went away; the line goes to the next one
						Err(unsent) => line = unsent,
					},
					None => {
						self.ready.push_front(line);
						return;
					}
				}
			}
		}
	}

	fn close(&mut self, reason: CloseReason) {
		if self.closed.is_none() {
			self.closed = Some(reason);
		}
		self.waiters.clear();
	}
}

/// Splits an inbound byte stream into lines and serves them to readers
#[derive(Debug, Default)]
pub struct LineFramer {
	inner: Mutex<LineBuffer>,
}

impl LineFramer {
	/// Create an unbounded framer
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a framer that rejects lines longer than `limit` bytes
	pub fn with_max_line_bytes(limit: Option<usize>) -> Self {
		Self { inner: Mutex::new(LineBuffer { max_line_bytes: limit, ..LineBuffer::default() }) }
	}

	/// Append raw bytes and resume any readers that now have a line
	pub async fn feed(&self, bytes: &[u8]) -> ProtocolResult<()> {
		let mut buf = self.inner.lock().await;
		if let Some(reason) = buf.closed {
			return Err(reason.to_error());
		}
		buf.partial.extend_from_slice(bytes);
		let checked = buf.extract_lines();
		buf.wake_waiters();

		if let Err(reason) = checked {
			buf.partial.clear();
			buf.close(reason);
			return Err(reason.to_error());
		}
		Ok(())
	}

	/// Take the next line, suspending until one is available
	///
	/// Lines that arrived before the stream closed are still delivered; once
	/// they are exhausted every call fails with the close reason.
	pub async fn next_line(&self) -> ProtocolResult<String> {
		let waiter = {
			let mut buf = self.inner.lock().await;
			if let Some(line) = buf.ready.pop_front() {
				return Ok(line);
			}
			if let Some(reason) = buf.closed {
				return Err(reason.to_error());
			}
			let (tx, rx) = oneshot::channel();
			buf.waiters.push_back(tx);
			rx
		};

		match waiter.await {
			Ok(line) => Ok(line),
			Err(_) => Err(self.close_error().await),
		}
	}

	/// Stop accepting bytes and fail every suspended reader
	pub async fn close(&self) {
		self.inner.lock().await.close(CloseReason::Eof);
	}

	#[cfg(test)]
	async fn is_closed(&self) -> bool {
		self.inner.lock().await.closed.is_some()
	}

	#[cfg(test)]
	async fn buffered_lines(&self) -> usize {
		self.inner.lock().await.ready.len()
	}

	async fn close_error(&self) -> ProtocolError {
		let buf = self.inner.lock().await;
		buf.closed.unwrap_or(CloseReason::Eof).to_error()
	}
}


// vim: ts=4
