//! Token-level expectations shared by every response reader
//!
//! A line is split on runs of whitespace and compared against an expected
//! token sequence, either in full (same tokens, same count) or as a prefix
//! (the remaining tokens are the payload). Any mismatch is a violation; there
//! is no skipping ahead to resynchronize.

use tracing::error;

use super::error::ProtocolError;
use super::traits::{LineChannel, ProtocolResult};

/// How a line is compared against the expected tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
	/// Exact content and token count
	Full,
	/// Leading tokens only; the rest is returned to the caller
	Prefix,
}

/// A line that matched one of several alternatives
#[derive(Debug, Clone, PartialEq)]
pub struct Matched {
	/// Position of the matching alternative
	pub index: usize,
	/// Tokens after the matched ones
	pub rest: Vec<String>,
	/// The line as received
	pub line: String,
}

pub fn tokenize(line: &str) -> Vec<&str> {
	line.split_whitespace().collect()
}

fn matches(expected: &[&str], received: &[&str], mode: MatchMode) -> bool {
	if mode == MatchMode::Full && expected.len() != received.len() {
		return false;
	}
	received.len() >= expected.len() && expected.iter().zip(received).all(|(e, r)| e == r)
}

/// Build a violation and log it
pub fn violation(expected: &[&str], received: &[&str]) -> ProtocolError {
	let err = ProtocolError::violation(expected, received);
	error!("{}", err);
	err
}

/// Match one line against `expected`, returning the trailing tokens
pub fn match_line(expected: &[&str], line: &str, mode: MatchMode) -> ProtocolResult<Vec<String>> {
	let received = tokenize(line);
	if !matches(expected, &received, mode) {
		return Err(violation(&[expected.join(" ").as_str()], &received));
	}
	Ok(received[expected.len()..].iter().map(|t| t.to_string()).collect())
}

/// Match one line against several alternatives, first match wins
///
/// Each alternative may hold several space-separated tokens.
pub fn match_alternatives(
	alternatives: &[&str],
	line: &str,
	mode: MatchMode,
) -> ProtocolResult<Matched> {
	let received = tokenize(line);
	for (index, alternative) in alternatives.iter().enumerate() {
		let expected = tokenize(alternative);
		if matches(&expected, &received, mode) {
			return Ok(Matched {
				index,
				rest: received[expected.len()..].iter().map(|t| t.to_string()).collect(),
				line: line.to_string(),
			});
		}
	}
	Err(violation(alternatives, &received))
}

/// Read the next line and match it against `expected`
pub async fn expect(
	channel: &mut dyn LineChannel,
	expected: &[&str],
	mode: MatchMode,
) -> ProtocolResult<Vec<String>> {
	let line = channel.next_line().await?;
	match_line(expected, &line, mode)
}

/// Read the next line and match it against several alternatives
pub async fn expect_one_of(
	channel: &mut dyn LineChannel,
	alternatives: &[&str],
	mode: MatchMode,
) -> ProtocolResult<Matched> {
	let line = channel.next_line().await?;
	match_alternatives(alternatives, &line, mode)
}


// vim: ts=4
