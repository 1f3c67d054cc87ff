//! # bzrc - BZRobots tank control client
//!
//! Drives a team of tanks in the BZRFlag capture-the-flag simulator over its
//! line-oriented text protocol. One connection carries one command at a time;
//! calls are queued and answered in order.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bzrc::{BzrClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig { port: Some(50100), ..Default::default() };
//!     let client = BzrClient::connect(&config).await?;
//!
//!     let (tanks, time) = client.my_tanks().await?;
//!     for tank in &tanks {
//!         client.set_speed(tank.index, 1.0).await?;
//!     }
//!     println!("{} tanks at t={}", tanks.len(), time);
//!     Ok(())
//! }
//! ```
//!
//! ## Queuing Without Waiting
//!
//! Replies are futures for operations that are already queued, so several
//! commands can be issued back to back and collected later:
//!
//! ```rust,ignore
//! let speed = client.set_speed(0, 0.5);
//! let turn = client.set_angular_velocity(0, -0.2);
//! let fire = client.shoot(0);
//! let (speed, turn, fire) = tokio::join!(speed, turn, fire);
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod protocol;

// Re-export commonly used types and functions
pub use client::{snapshot, BzrClient, Snapshot, TankControl};
pub use config::ClientConfig;
pub use error::{ClientError, ConfigError};
pub use protocol::{
	Base, Constants, Flag, MyTank, Obstacle, OccupancyGrid, OtherTank, Point, ProtocolError,
	ProtocolResult, Shot, Team,
};

// vim: ts=4
