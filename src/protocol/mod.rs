//! BZRobots wire protocol engine
//!
//! Incoming bytes are framed into lines, commands are serialized so that only
//! one is in flight, and each response is decoded by the grammar of its
//! command.
//!
//! # Example Usage
//!
//! ```ignore
//! use bzrc::protocol::{Operation, Query, RecordList, Team};
//!
//! let (op, reply) = Operation::new(Some("teams".to_string()), Query::new(RecordList::<Team>::new()));
//! outbox.send(op)?;
//! let (teams, timestamp) = reply.await?;
//! ```

pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod framer;
pub mod grammar;
pub mod records;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod script;

// Re-export public API
pub use decoder::{Action, ConstantTable, Handshake, OccupancyGridReader, Query, RecordList};
pub use dispatcher::{Dispatcher, Operation, PendingQueue, Reply};
pub use error::ProtocolError;
pub use framer::LineFramer;
pub use grammar::MatchMode;
pub use traits::{Decoder, LineChannel, ProtocolResult, Record};
pub use types::{
	index_tanks, Base, Constants, Flag, MyTank, Obstacle, OccupancyGrid, OtherTank, Point, Shot,
	Team,
};

// vim: ts=4
