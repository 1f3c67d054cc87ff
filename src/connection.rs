//! Connection management for the simulation server

use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::ClientError;
use crate::protocol::framer::LineFramer;
use crate::protocol::traits::{LineChannel, ProtocolResult};

/// Size of a single socket read
const READ_CHUNK: usize = 4096;

/// Owns the stream to the server
///
/// Inbound bytes are pumped into the line framer by a background task; writes
/// go straight to the write half.
pub struct Connection {
	/// Peer description for log messages
	peer: String,

	framer: Arc<LineFramer>,

	send: Box<dyn AsyncWrite + Send + Unpin>,

	/// Flips to `true` once the inbound side has ended
	closed: watch::Receiver<bool>,

	reader: JoinHandle<()>,
}

impl std::fmt::Debug for Connection {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Connection")
			.field("peer", &self.peer)
			.field("closed", &*self.closed.borrow())
			.finish()
	}
}

/// Connect to the server at `host:port`
pub async fn connect(
	host: &str,
	port: u16,
	max_line_bytes: Option<usize>,
) -> Result<Connection, ClientError> {
	let address = format!("{}:{}", host, port);
	let stream = TcpStream::connect(&address)
		.await
		.map_err(|e| ClientError::Connect { address: address.clone(), source: e })?;
	if let Err(e) = stream.set_nodelay(true) {
		debug!("Could not disable Nagle on {}: {}", address, e);
	}
	info!("Connected to {}", address);

	let (recv, send) = stream.into_split();
	Ok(Connection::from_halves(recv, send, address, max_line_bytes))
}

impl Connection {
	/// Wrap an already established stream
	pub fn from_stream<S>(stream: S, peer: impl Into<String>, max_line_bytes: Option<usize>) -> Self
	where
		S: AsyncRead + AsyncWrite + Send + 'static,
	{
		let (recv, send) = tokio::io::split(stream);
		Self::from_halves(recv, send, peer.into(), max_line_bytes)
	}

	fn from_halves<R, W>(recv: R, send: W, peer: String, max_line_bytes: Option<usize>) -> Self
	where
		R: AsyncRead + Send + Unpin + 'static,
		W: AsyncWrite + Send + Unpin + 'static,
	{
		let framer = Arc::new(LineFramer::with_max_line_bytes(max_line_bytes));
		let (closed_tx, closed) = watch::channel(false);
		let reader = tokio::spawn(pump(recv, framer.clone(), closed_tx, peer.clone()));

		Connection { peer, framer, send: Box::new(send), closed, reader }
	}

	/// Peer description
	pub fn peer(&self) -> &str {
		&self.peer
	}

	/// Watch that flips to `true` when the server side ends
	pub fn closed_watch(&self) -> watch::Receiver<bool> {
		self.closed.clone()
	}

	/// Close the write half
	pub async fn shutdown(&mut self) -> ProtocolResult<()> {
		self.send.shutdown().await?;
		debug!("Write half to {} closed", self.peer);
		Ok(())
	}
}

impl Drop for Connection {
	fn drop(&mut self) {
		self.reader.abort();
	}
}

#[async_trait]
impl LineChannel for Connection {
	async fn next_line(&mut self) -> ProtocolResult<String> {
		self.framer.next_line().await
	}

	async fn send_line(&mut self, line: &str) -> ProtocolResult<()> {
		trace!("send: {}", line);
		let mut buf = Vec::with_capacity(line.len() + 1);
		buf.extend_from_slice(line.as_bytes());
		buf.push(b'\n');
		self.send.write_all(&buf).await?;
		self.send.flush().await?;
		Ok(())
	}

	fn is_closed(&self) -> bool {
		*self.closed.borrow()
	}
}

/// Forward inbound bytes to the framer until the stream ends
async fn pump<R>(mut recv: R, framer: Arc<LineFramer>, closed: watch::Sender<bool>, peer: String)
where
	R: AsyncRead + Unpin,
{
	let mut buf = vec![0u8; READ_CHUNK];
	loop {
		match recv.read(&mut buf).await {
			Ok(0) => {
				info!("{} disconnected", peer);
				break;
			}
			Ok(n) => {
				if let Err(e) = framer.feed(&buf[..n]).await {
					warn!("Dropping connection to {}: {}", peer, e);
					break;
				}
			}
			Err(e) => {
				warn!("Read from {} failed: {}", peer, e);
				break;
			}
		}
	}
	framer.close().await;
	let _ = closed.send(true);
}


// vim: ts=4
