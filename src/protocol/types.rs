//! Records decoded from server responses
//!
//! Each value is a snapshot built while decoding one response; nothing here is
//! cached by the client.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Game constants (`constant <name> <value>`), values kept as sent
pub type Constants = BTreeMap<String, String>;

/// A point on the playing field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
	pub x: f64,
	pub y: f64,
}

impl Point {
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Team {
	pub color: String,
	pub count: u32,
}

/// Obstacle polygon, vertices in server order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Obstacle {
	pub points: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
	pub color: String,
	/// Color of the team carrying the flag, `none` when it lies free
	pub possession_color: String,
	pub location: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Shot {
	pub x: f64,
	pub y: f64,
	pub vx: f64,
	pub vy: f64,
}

/// A tank controlled by this agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MyTank {
	pub index: u32,
	pub callsign: String,
	pub status: String,
	pub shots_available: u32,
	pub time_to_reload: f64,
	/// Color of the flag carried, `-` when none
	pub flag: String,
	pub location: Point,
	pub angle: f64,
	pub vx: f64,
	pub vy: f64,
	pub angvel: f64,
}

/// Key owned tanks by their index
pub fn index_tanks(tanks: Vec<MyTank>) -> BTreeMap<u32, MyTank> {
	tanks.into_iter().map(|tank| (tank.index, tank)).collect()
}

/// A tank seen on the field, friend or enemy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtherTank {
	pub callsign: String,
	pub color: String,
	pub status: String,
	pub flag: String,
	pub location: Point,
	pub angle: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Base {
	pub color: String,
	pub corners: [Point; 4],
}

/// Occupancy around a tank, as reported by `occgrid`
///
/// Rows run along x (there are `width` of them), columns along y.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
	pub origin: Point,
	pub width: usize,
	pub height: usize,
	pub cells: BTreeMap<(usize, usize), bool>,
}

impl OccupancyGrid {
	pub fn is_occupied(&self, row: usize, col: usize) -> Option<bool> {
		self.cells.get(&(row, col)).copied()
	}

	/// Rows in wire form, one `0`/`1` character per column
	pub fn rows(&self) -> Vec<String> {
		(0..self.width)
			.map(|row| {
				(0..self.height)
					.map(|col| if self.is_occupied(row, col) == Some(true) { '1' } else { '0' })
					.collect()
			})
			.collect()
	}
}

// Tuple keys have no JSON form, so the grid goes out as wire rows.
impl Serialize for OccupancyGrid {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut state = serializer.serialize_struct("OccupancyGrid", 4)?;
		state.serialize_field("origin", &self.origin)?;
		state.serialize_field("width", &self.width)?;
		state.serialize_field("height", &self.height)?;
		state.serialize_field("rows", &self.rows())?;
		state.end()
	}
}


// vim: ts=4
