//! Response grammars, one per remote command
//!
//! Actions answer `ack ...` then `ok` or `fail`. Queries answer
//! `ack <timestamp> ...` followed by the command's payload: a `begin`/`end`
//! delimited record list, or the occupancy grid.

use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::{debug, info};

use super::grammar::{expect, expect_one_of, match_line, tokenize, violation, MatchMode};
use super::records::{Constant, Fields};
use super::traits::{Decoder, LineChannel, ProtocolResult, Record};
use super::types::{Constants, OccupancyGrid, Point};

/// Server greeting expected on connect
pub const SERVER_GREETING: &[&str] = &["bzrobots", "1"];

/// Client reply to the greeting
pub const AGENT_GREETING: &str = "agent 1";

/// Connection handshake: `bzrobots 1` from the server, `agent 1` back
#[derive(Debug, Clone, Copy, Default)]
pub struct Handshake;

#[async_trait]
impl Decoder for Handshake {
	type Output = ();

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<()> {
		expect(channel, SERVER_GREETING, MatchMode::Full).await?;
		channel.send_line(AGENT_GREETING).await?;
		info!("Handshake complete");
		Ok(())
	}
}

/// Movement and weapon commands: acknowledgement then `ok` or `fail`
#[derive(Debug, Clone, Copy, Default)]
pub struct Action;

#[async_trait]
impl Decoder for Action {
	type Output = bool;

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<bool> {
		expect(channel, &["ack"], MatchMode::Prefix).await?;
		let outcome = expect_one_of(channel, &["ok", "fail"], MatchMode::Prefix).await?;
		if !outcome.rest.is_empty() {
			debug!("Action result detail: {}", outcome.rest.join(" "));
		}
		Ok(outcome.index == 0)
	}
}

/// State queries: timestamped acknowledgement then the payload
#[derive(Debug, Clone, Copy, Default)]
pub struct Query<D> {
	payload: D,
}

impl<D: Decoder> Query<D> {
	pub fn new(payload: D) -> Self {
		Self { payload }
	}
}

#[async_trait]
impl<D: Decoder> Decoder for Query<D> {
	type Output = (D::Output, f64);

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<Self::Output> {
		let rest = expect(channel, &["ack"], MatchMode::Prefix).await?;
		let timestamp = match rest.first().map(|t| t.parse::<f64>()) {
			Some(Ok(timestamp)) => timestamp,
			_ => {
				let mut received = vec!["ack"];
				received.extend(rest.iter().map(String::as_str));
				return Err(violation(&["ack <timestamp>"], &received));
			}
		};
		let value = self.payload.decode(channel).await?;
		Ok((value, timestamp))
	}
}

/// `begin`, any number of `<tag> ...` lines, `end`
pub struct RecordList<R> {
	_record: PhantomData<fn() -> R>,
}

impl<R: Record> RecordList<R> {
	pub fn new() -> Self {
		Self { _record: PhantomData }
	}
}

impl<R: Record> Default for RecordList<R> {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl<R: Record> Decoder for RecordList<R> {
	type Output = Vec<R>;

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<Vec<R>> {
		expect(channel, &["begin"], MatchMode::Full).await?;

		let mut records = Vec::new();
		loop {
			let matched = expect_one_of(channel, &[R::TAG, "end"], MatchMode::Prefix).await?;
			if matched.index == 1 {
				debug!("Decoded {} {} record(s)", records.len(), R::TAG);
				return Ok(records);
			}
			let mut fields = Fields::new(R::TAG, &matched.rest, &matched.line);
			let record = R::parse(&mut fields)?;
			fields.finish()?;
			records.push(record);
		}
	}
}

/// Constants list folded into a name → raw value map
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantTable;

#[async_trait]
impl Decoder for ConstantTable {
	type Output = Constants;

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<Constants> {
		let constants = RecordList::<Constant>::new().decode(channel).await?;
		Ok(constants.into_iter().map(|c| (c.name, c.value)).collect())
	}
}

/// The `occgrid` payload
///
/// A line containing `fail` means no grid is available (`None`) and nothing
/// more is read. Otherwise the header is `at <x>,<y>` and `size <w>x<h>`,
/// on one line or two, followed by `w` rows of `h` characters each. When
/// the server wraps the grid in `begin`/`end` the markers are consumed too.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccupancyGridReader;

fn parse_pair<T: std::str::FromStr>(token: &str, separator: char) -> Option<(T, T)> {
	let (a, b) = token.split_once(separator)?;
	Some((a.parse().ok()?, b.parse().ok()?))
}

#[async_trait]
impl Decoder for OccupancyGridReader {
	type Output = Option<OccupancyGrid>;

	async fn decode(&self, channel: &mut dyn LineChannel) -> ProtocolResult<Self::Output> {
		let mut line = channel.next_line().await?;
		if tokenize(&line).contains(&"fail") {
			debug!("Occupancy grid unavailable: {}", line);
			return Ok(None);
		}

		let framed = tokenize(&line) == ["begin"];
		if framed {
			line = channel.next_line().await?;
		}

		let rest = match_line(&["at"], &line, MatchMode::Prefix)?;
		let origin = match rest.first().and_then(|t| parse_pair::<f64>(t, ',')) {
			Some((x, y)) => Point::new(x, y),
			None => return Err(violation(&["at <x>,<y>"], &tokenize(&line))),
		};

		let size_line = if rest.len() > 1 { rest[1..].join(" ") } else { channel.next_line().await? };
		let size = match_line(&["size"], &size_line, MatchMode::Prefix)?;
		let (width, height) = match size.as_slice() {
			[dims] => match parse_pair::<usize>(dims, 'x') {
				Some(dims) => dims,
				None => return Err(violation(&["size <w>x<h>"], &tokenize(&size_line))),
			},
			_ => return Err(violation(&["size <w>x<h>"], &tokenize(&size_line))),
		};

		let mut grid = OccupancyGrid { origin, width, height, cells: Default::default() };
		for row in 0..width {
			let line = channel.next_line().await?;
			let cells = line.trim();
			if cells.len() != height {
				return Err(violation(&[format!("{} cells", height).as_str()], &[cells]));
			}
			for (col, cell) in cells.chars().enumerate() {
				let occupied = match cell {
					'0' => false,
					'1' => true,
					_ => return Err(violation(&["0 or 1"], &[cells])),
				};
				grid.cells.insert((row, col), occupied);
			}
		}

		if framed {
			expect(channel, &["end"], MatchMode::Full).await?;
		}
		debug!("Decoded {}x{} occupancy grid at ({}, {})", width, height, origin.x, origin.y);
		Ok(Some(grid))
	}
}


// vim: ts=4
