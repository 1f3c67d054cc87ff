//! Field layouts of the tagged record lines

use std::str::FromStr;

use super::error::ProtocolError;
use super::traits::{ProtocolResult, Record};
use super::types::*;

/// Cursor over the tokens following a record tag
#[derive(Debug)]
pub struct Fields<'a> {
	record: &'static str,
	tokens: &'a [String],
	line: &'a str,
	pos: usize,
}

impl<'a> Fields<'a> {
	pub fn new(record: &'static str, tokens: &'a [String], line: &'a str) -> Self {
		Self { record, tokens, line, pos: 0 }
	}

	fn malformed(&self, detail: String) -> ProtocolError {
		ProtocolError::Malformed { record: self.record, detail, line: self.line.to_string() }
	}

	fn next_token(&mut self, name: &str) -> ProtocolResult<&'a str> {
		let tokens = self.tokens;
		match tokens.get(self.pos) {
			Some(token) => {
				self.pos += 1;
				Ok(token.as_str())
			}
			None => Err(self.malformed(format!("missing field '{}'", name))),
		}
	}

	pub fn text(&mut self, name: &str) -> ProtocolResult<String> {
		self.next_token(name).map(str::to_string)
	}

	pub fn number<T: FromStr>(&mut self, name: &str) -> ProtocolResult<T> {
		let token = self.next_token(name)?;
		token
			.parse()
			.map_err(|_| self.malformed(format!("field '{}' is not a number: '{}'", name, token)))
	}

	pub fn point(&mut self, name: &str) -> ProtocolResult<Point> {
		Ok(Point { x: self.number(name)?, y: self.number(name)? })
	}

	pub fn remaining(&self) -> usize {
		self.tokens.len() - self.pos
	}

	/// Fail if tokens are left over
	pub fn finish(&self) -> ProtocolResult<()> {
		match self.remaining() {
			0 => Ok(()),
			n => Err(self.malformed(format!("{} unexpected trailing field(s)", n))),
		}
	}
}

/// One `constant <name> <value>` line
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
	pub name: String,
	pub value: String,
}

impl Record for Constant {
	const TAG: &'static str = "constant";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(Constant { name: fields.text("name")?, value: fields.text("value")? })
	}
}

impl Record for Team {
	const TAG: &'static str = "team";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(Team { color: fields.text("color")?, count: fields.number("count")? })
	}
}

impl Record for Obstacle {
	const TAG: &'static str = "obstacle";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		let n = fields.remaining();
		if n == 0 || n % 2 != 0 {
			return Err(fields.malformed(format!("expected coordinate pairs, got {} values", n)));
		}
		let mut points = Vec::with_capacity(n / 2);
		while fields.remaining() > 0 {
			points.push(fields.point("vertex")?);
		}
		Ok(Obstacle { points })
	}
}

impl Record for Flag {
	const TAG: &'static str = "flag";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(Flag {
			color: fields.text("color")?,
			possession_color: fields.text("possession color")?,
			location: fields.point("location")?,
		})
	}
}

impl Record for Shot {
	const TAG: &'static str = "shot";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(Shot {
			x: fields.number("x")?,
			y: fields.number("y")?,
			vx: fields.number("vx")?,
			vy: fields.number("vy")?,
		})
	}
}

impl Record for MyTank {
	const TAG: &'static str = "mytank";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(MyTank {
			index: fields.number("index")?,
			callsign: fields.text("callsign")?,
			status: fields.text("status")?,
			shots_available: fields.number("shots available")?,
			time_to_reload: fields.number("time to reload")?,
			flag: fields.text("flag")?,
			location: fields.point("location")?,
			angle: fields.number("angle")?,
			vx: fields.number("vx")?,
			vy: fields.number("vy")?,
			angvel: fields.number("angvel")?,
		})
	}
}

impl Record for OtherTank {
	const TAG: &'static str = "othertank";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(OtherTank {
			callsign: fields.text("callsign")?,
			color: fields.text("color")?,
			status: fields.text("status")?,
			flag: fields.text("flag")?,
			location: fields.point("location")?,
			angle: fields.number("angle")?,
		})
	}
}

impl Record for Base {
	const TAG: &'static str = "base";

	fn parse(fields: &mut Fields<'_>) -> ProtocolResult<Self> {
		Ok(Base {
			color: fields.text("color")?,
			corners: [
				fields.point("corner")?,
				fields.point("corner")?,
				fields.point("corner")?,
				fields.point("corner")?,
			],
		})
	}
}


// vim: ts=4
