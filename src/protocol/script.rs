//! Scripted line channel for decoder tests

use async_trait::async_trait;
use std::collections::VecDeque;

use super::error::ProtocolError;
use super::traits::{LineChannel, ProtocolResult};

/// Serves canned server lines and records what the client sent
#[derive(Debug, Default)]
pub struct ScriptedChannel {
	pub incoming: VecDeque<String>,
	pub sent: Vec<String>,
}

impl ScriptedChannel {
	/// Build from a server transcript, one line per `\n`
	pub fn new(transcript: &str) -> Self {
		Self { incoming: transcript.lines().map(String::from).collect(), sent: Vec::new() }
	}

	pub fn remaining(&self) -> usize {
		self.incoming.len()
	}
}

#[async_trait]
impl LineChannel for ScriptedChannel {
	async fn next_line(&mut self) -> ProtocolResult<String> {
		self.incoming.pop_front().ok_or(ProtocolError::ConnectionClosed)
	}

	async fn send_line(&mut self, line: &str) -> ProtocolResult<()> {
		self.sent.push(line.to_string());
		Ok(())
	}

	fn is_closed(&self) -> bool {
		self.incoming.is_empty()
	}
}

// vim: ts=4
