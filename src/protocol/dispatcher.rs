//! Command serialization over the single connection
//!
//! The wire protocol has no correlation identifiers, so a response can only be
//! attributed to its command if exactly one command is in flight. Operations
//! wait in a FIFO [`PendingQueue`]; the [`Dispatcher`] activates the head,
//! writes its command line, runs its decoder to the end of the response and
//! only then activates the next one.

use async_trait::async_trait;
use futures::FutureExt;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use super::error::ProtocolError;
use super::traits::{Decoder, LineChannel, ProtocolResult};

/// FIFO of operations with at most one active at a time
#[derive(Debug)]
pub struct PendingQueue<T> {
	pending: VecDeque<T>,
	active: bool,
}

impl<T> Default for PendingQueue<T> {
	fn default() -> Self {
		Self { pending: VecDeque::new(), active: false }
	}
}

impl<T> PendingQueue<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn enqueue(&mut self, item: T) {
		self.pending.push_back(item);
	}

	/// Pop the head and mark it active, unless an item is already active
	pub fn activate(&mut self) -> Option<T> {
		if self.active {
			return None;
		}
		let item = self.pending.pop_front()?;
		self.active = true;
		Some(item)
	}

	/// Completion signal for the active item
	pub fn complete(&mut self) {
		self.active = false;
	}

	pub fn is_active(&self) -> bool {
		self.active
	}

	/// Items waiting behind the active one
	pub fn len(&self) -> usize {
		self.pending.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pending.is_empty()
	}
}

/// Why the engine stopped serving operations
#[derive(Debug, Clone)]
enum Halt {
	Closed,
	Failed(String),
}

impl Halt {
	fn from_error(err: &ProtocolError) -> Self {
		match err {
			ProtocolError::ConnectionClosed => Halt::Closed,
			other => Halt::Failed(other.to_string()),
		}
	}

	fn to_error(&self) -> ProtocolError {
		match self {
			Halt::Closed => ProtocolError::ConnectionClosed,
			Halt::Failed(reason) => ProtocolError::Halted { reason: reason.clone() },
		}
	}
}

#[async_trait]
trait Exchange: Send {
	fn command(&self) -> Option<&str>;

	/// Write the command, decode the response, deliver the result
	async fn run(self: Box<Self>, channel: &mut dyn LineChannel) -> Option<Halt>;

	/// Resolve without touching the wire
	fn fail(self: Box<Self>, err: ProtocolError);
}

struct Pending<D: Decoder> {
	command: Option<String>,
	decoder: D,
	reply: oneshot::Sender<ProtocolResult<D::Output>>,
}

impl<D: Decoder> Pending<D> {
	async fn exchange(&self, channel: &mut dyn LineChannel) -> ProtocolResult<D::Output> {
		if let Some(command) = &self.command {
			channel.send_line(command).await?;
		}
		self.decoder.decode(channel).await
	}
}

#[async_trait]
impl<D: Decoder> Exchange for Pending<D> {
	fn command(&self) -> Option<&str> {
		self.command.as_deref()
	}

	async fn run(self: Box<Self>, channel: &mut dyn LineChannel) -> Option<Halt> {
		let result = self.exchange(channel).await;
		let halt = match &result {
			Err(err) if err.is_fatal() => Some(Halt::from_error(err)),
			_ => None,
		};
		// The caller may have dropped its reply future
		let _ = self.reply.send(result);
		halt
	}

	fn fail(self: Box<Self>, err: ProtocolError) {
		let _ = self.reply.send(Err(err));
	}
}

/// One queued request/response exchange
pub struct Operation {
	exchange: Box<dyn Exchange>,
}

impl Operation {
	/// Pair a command line with the grammar of its response
	///
	/// `command` is `None` for exchanges the server opens, such as the
	/// handshake.
	pub fn new<D: Decoder>(command: Option<String>, decoder: D) -> (Self, Reply<D::Output>) {
		let (tx, rx) = oneshot::channel();
		let pending = Pending { command, decoder, reply: tx };
		(Operation { exchange: Box::new(pending) }, Reply { rx })
	}

	pub fn command(&self) -> Option<&str> {
		self.exchange.command()
	}
}

impl std::fmt::Debug for Operation {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Operation").field("command", &self.command()).finish()
	}
}

/// Result of a queued operation
///
/// The operation is already queued when this is returned; awaiting it only
/// waits for the decoded response.
#[derive(Debug)]
#[must_use = "the operation runs regardless, but its result is lost"]
pub struct Reply<T> {
	rx: oneshot::Receiver<ProtocolResult<T>>,
}

impl<T> Reply<T> {
	/// A reply resolved with `err` without queuing anything
	pub fn failed(err: ProtocolError) -> Self {
		let (tx, rx) = oneshot::channel();
		let _ = tx.send(Err(err));
		Reply { rx }
	}
}

impl<T> Future for Reply<T> {
	type Output = ProtocolResult<T>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
		match self.rx.poll_unpin(cx) {
			Poll::Ready(Ok(result)) => Poll::Ready(result),
			// Dispatcher gone before answering
			Poll::Ready(Err(_)) => Poll::Ready(Err(ProtocolError::ConnectionClosed)),
			Poll::Pending => Poll::Pending,
		}
	}
}

/// Drives queued operations over one line channel, strictly one at a time
pub struct Dispatcher<C: LineChannel> {
	queue: PendingQueue<Operation>,
	channel: C,
	inbox: mpsc::UnboundedReceiver<Operation>,
	halt: Option<Halt>,
}

impl<C: LineChannel> Dispatcher<C> {
	pub fn new(channel: C, inbox: mpsc::UnboundedReceiver<Operation>) -> Self {
		Self { queue: PendingQueue::new(), channel, inbox, halt: None }
	}

	/// Serve operations until every sender is dropped, then hand back the channel
	pub async fn run(mut self) -> C {
		loop {
			while let Ok(op) = self.inbox.try_recv() {
				self.queue.enqueue(op);
			}
			if let Some(op) = self.queue.activate() {
				self.execute(op).await;
				self.queue.complete();
				continue;
			}
			match self.inbox.recv().await {
				Some(op) => self.queue.enqueue(op),
				None => break,
			}
		}
		debug!("Dispatcher stopped");
		self.channel
	}

	async fn execute(&mut self, op: Operation) {
		if self.halt.is_none() && self.channel.is_closed() {
			self.halt = Some(Halt::Closed);
		}
		if let Some(halt) = &self.halt {
			debug!("Rejecting {:?}: engine halted", op.command());
			op.exchange.fail(halt.to_error());
			return;
		}

		match op.command() {
			Some(command) => debug!("send: {} ({} queued)", command, self.queue.len()),
			None => debug!("Awaiting server-initiated exchange"),
		}
		if let Some(halt) = op.exchange.run(&mut self.channel).await {
			match &halt {
				Halt::Closed => warn!("Connection closed; failing remaining operations"),
				Halt::Failed(reason) => error!("Protocol engine halted: {}", reason),
			}
			self.halt = Some(halt);
		}
	}
}


// vim: ts=4
