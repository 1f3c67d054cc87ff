//! Client facade: one call per remote command
//!
//! Every call queues its operation immediately and returns a [`Reply`]; the
//! order of calls is the order of commands on the wire, whenever the replies
//! are awaited.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{self, Connection};
use crate::error::ClientError;
use crate::protocol::decoder::{
	Action, ConstantTable, Handshake, OccupancyGridReader, Query, RecordList,
};
use crate::protocol::dispatcher::{Dispatcher, Operation, Reply};
use crate::protocol::traits::{Decoder, ProtocolResult};
use crate::protocol::types::*;
use crate::protocol::ProtocolError;

/// Connected protocol client
pub struct BzrClient {
	outbox: mpsc::UnboundedSender<Operation>,
	closed: watch::Receiver<bool>,
	driver: JoinHandle<Connection>,
}

impl std::fmt::Debug for BzrClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BzrClient").field("closed", &*self.closed.borrow()).finish()
	}
}

impl BzrClient {
	/// Connect using `config` and complete the handshake
	pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
		let port = config.validate()?;
		let conn = connection::connect(&config.host, port, config.max_line_bytes).await?;
		Self::start(conn).await
	}

	/// Run the protocol over an established connection
	///
	/// The handshake is the first queued operation; this returns once it has
	/// completed.
	pub async fn start(conn: Connection) -> Result<Self, ClientError> {
		let peer = conn.peer().to_string();
		let closed = conn.closed_watch();
		let (outbox, inbox) = mpsc::unbounded_channel();
		let driver = tokio::spawn(Dispatcher::new(conn, inbox).run());

		let client = BzrClient { outbox, closed, driver };
		client.enqueue(None, Handshake).await?;
		info!("Agent registered with {}", peer);
		Ok(client)
	}

	fn enqueue<D: Decoder>(&self, command: Option<String>, decoder: D) -> Reply<D::Output> {
		let (op, reply) = Operation::new(command, decoder);
		if self.outbox.send(op).is_err() {
			// The dropped operation resolves its reply as closed
			debug!("Dispatcher gone; operation dropped");
		}
		reply
	}

	fn action(&self, command: String) -> Reply<bool> {
		self.enqueue(Some(command), Action)
	}

	/// Movement commands carry a fraction of the maximum; NaN and infinities
	/// are refused before anything is queued.
	fn motion(&self, verb: &str, tank: u32, value: f64) -> Reply<bool> {
		if !value.is_finite() {
			warn!("Refusing {} for tank {}: {} is not finite", verb, tank, value);
			return Reply::failed(ProtocolError::InvalidArgument {
				detail: format!("{} {}: value {} is not finite", verb, tank, value),
			});
		}
		self.action(format!("{} {} {}", verb, tank, value))
	}

	fn query<D: Decoder>(&self, command: &str, payload: D) -> Reply<(D::Output, f64)> {
		self.enqueue(Some(command.to_string()), Query::new(payload))
	}

	/// Fire the tank's gun
	pub fn shoot(&self, tank: u32) -> Reply<bool> {
		self.action(format!("shoot {}", tank))
	}

	/// Set the tank's target speed (-1.0 ..= 1.0 of maximum)
	pub fn set_speed(&self, tank: u32, speed: f64) -> Reply<bool> {
		self.motion("speed", tank, speed)
	}

	/// Set the tank's target angular velocity (-1.0 ..= 1.0 of maximum)
	pub fn set_angular_velocity(&self, tank: u32, angvel: f64) -> Reply<bool> {
		self.motion("angvel", tank, angvel)
	}

	pub fn teams(&self) -> Reply<(Vec<Team>, f64)> {
		self.query("teams", RecordList::new())
	}

	pub fn obstacles(&self) -> Reply<(Vec<Obstacle>, f64)> {
		self.query("obstacles", RecordList::new())
	}

	/// Occupancy grid, `None` when the server refuses it
	pub fn occupancy_grid(&self) -> Reply<(Option<OccupancyGrid>, f64)> {
		self.query("occgrid", OccupancyGridReader)
	}

	pub fn flags(&self) -> Reply<(Vec<Flag>, f64)> {
		self.query("flags", RecordList::new())
	}

	pub fn shots(&self) -> Reply<(Vec<Shot>, f64)> {
		self.query("shots", RecordList::new())
	}

	pub fn my_tanks(&self) -> Reply<(Vec<MyTank>, f64)> {
		self.query("mytanks", RecordList::new())
	}

	pub fn other_tanks(&self) -> Reply<(Vec<OtherTank>, f64)> {
		self.query("othertanks", RecordList::new())
	}

	pub fn bases(&self) -> Reply<(Vec<Base>, f64)> {
		self.query("bases", RecordList::new())
	}

	pub fn constants(&self) -> Reply<(Constants, f64)> {
		self.query("constants", ConstantTable)
	}

	/// Whether the server has closed the connection
	pub fn is_closed(&self) -> bool {
		*self.closed.borrow()
	}

	/// Resolve once the server has closed the connection
	pub async fn closed(&self) {
		let mut closed = self.closed.clone();
		// An error means the connection is gone already
		let _ = closed.wait_for(|c| *c).await;
	}

	/// Finish queued operations, then close the write half
	pub async fn shutdown(self) -> ProtocolResult<()> {
		let BzrClient { outbox, driver, .. } = self;
		drop(outbox);
		let mut conn = driver
			.await
			.map_err(|e| ProtocolError::Halted { reason: format!("dispatcher task failed: {}", e) })?;
		conn.shutdown().await
	}
}

/// The calls a team strategy makes each tick
#[async_trait]
pub trait TankControl: Send + Sync {
	async fn constants(&self) -> ProtocolResult<(Constants, f64)>;
	async fn bases(&self) -> ProtocolResult<(Vec<Base>, f64)>;
	async fn my_tanks(&self) -> ProtocolResult<(Vec<MyTank>, f64)>;
	async fn other_tanks(&self) -> ProtocolResult<(Vec<OtherTank>, f64)>;
	async fn flags(&self) -> ProtocolResult<(Vec<Flag>, f64)>;
	async fn shots(&self) -> ProtocolResult<(Vec<Shot>, f64)>;

	async fn shoot(&self, tank: u32) -> ProtocolResult<bool>;
	async fn set_speed(&self, tank: u32, speed: f64) -> ProtocolResult<bool>;
	async fn set_angular_velocity(&self, tank: u32, angvel: f64) -> ProtocolResult<bool>;
}

#[async_trait]
impl TankControl for BzrClient {
	async fn constants(&self) -> ProtocolResult<(Constants, f64)> {
		BzrClient::constants(self).await
	}

	async fn bases(&self) -> ProtocolResult<(Vec<Base>, f64)> {
		BzrClient::bases(self).await
	}

	async fn my_tanks(&self) -> ProtocolResult<(Vec<MyTank>, f64)> {
		BzrClient::my_tanks(self).await
	}

	async fn other_tanks(&self) -> ProtocolResult<(Vec<OtherTank>, f64)> {
		BzrClient::other_tanks(self).await
	}

	async fn flags(&self) -> ProtocolResult<(Vec<Flag>, f64)> {
		BzrClient::flags(self).await
	}

	async fn shots(&self) -> ProtocolResult<(Vec<Shot>, f64)> {
		BzrClient::shots(self).await
	}

	async fn shoot(&self, tank: u32) -> ProtocolResult<bool> {
		BzrClient::shoot(self, tank).await
	}

	async fn set_speed(&self, tank: u32, speed: f64) -> ProtocolResult<bool> {
		BzrClient::set_speed(self, tank, speed).await
	}

	async fn set_angular_velocity(&self, tank: u32, angvel: f64) -> ProtocolResult<bool> {
		BzrClient::set_angular_velocity(self, tank, angvel).await
	}
}

/// Everything a strategy looks at in one tick
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
	/// Server time of the `mytanks` answer
	pub timestamp: f64,
	pub team: Option<String>,
	pub constants: Constants,
	pub bases: Vec<Base>,
	/// Our tanks keyed by index
	pub my_tanks: BTreeMap<u32, MyTank>,
	/// Other tanks not on our team
	pub enemies: Vec<OtherTank>,
	pub flags: Vec<Flag>,
	pub shots: Vec<Shot>,
}

impl Snapshot {
	/// Flags of other teams lying free on the field
	pub fn free_enemy_flags(&self) -> impl Iterator<Item = &Flag> {
		let team = self.team.clone();
		self.flags
			.iter()
			.filter(move |f| f.possession_color == "none" && Some(&f.color) != team.as_ref())
	}

	/// Our base, when the team is known
	pub fn home_base(&self) -> Option<&Base> {
		let team = self.team.as_ref()?;
		self.bases.iter().find(|b| &b.color == team)
	}
}

/// Gather one tick's worth of state
pub async fn snapshot(control: &dyn TankControl) -> ProtocolResult<Snapshot> {
	let (constants, _) = control.constants().await?;
	let (bases, _) = control.bases().await?;
	let (my_tanks, timestamp) = control.my_tanks().await?;
	let (other_tanks, _) = control.other_tanks().await?;
	let (flags, _) = control.flags().await?;
	let (shots, _) = control.shots().await?;

	let team = constants.get("team").cloned();
	let enemies =
		other_tanks.into_iter().filter(|t| Some(&t.color) != team.as_ref()).collect::<Vec<_>>();

	Ok(Snapshot {
		timestamp,
		team,
		constants,
		bases,
		my_tanks: index_tanks(my_tanks),
		enemies,
		flags,
		shots,
	})
}


// vim: ts=4
