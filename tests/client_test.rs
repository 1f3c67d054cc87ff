//! Client integration tests
//!
//! Each test runs the client against a scripted server on a local TCP port.
//! The server checks every command line it receives and, before answering,
//! that no further command arrives while the current one is unanswered.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use bzrc::protocol::Point;
use bzrc::{BzrClient, ClientConfig, ClientError, ProtocolError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Quiet period used to detect a command written too early
const QUIET: Duration = Duration::from_millis(50);

/// Expected command line and the server's full answer
type Exchange = (&'static str, &'static str);

async fn listen() -> (TcpListener, ClientConfig) {
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let port = listener.local_addr().unwrap().port();
	let config = ClientConfig { host: "127.0.0.1".to_string(), port: Some(port), ..Default::default() };
	(listener, config)
}

/// Greet, then answer each exchange in order, in small fragments
fn serve(listener: TcpListener, greeting: &'static str, script: Vec<Exchange>) -> JoinHandle<Vec<String>> {
	tokio::spawn(async move {
		let (stream, _) = listener.accept().await.unwrap();
		let (read, mut write) = stream.into_split();
		let mut lines = BufReader::new(read).lines();
		let mut received = Vec::new();

		write.write_all(greeting.as_bytes()).await.unwrap();
		match lines.next_line().await.unwrap() {
			Some(line) => received.push(line),
			None => return received,
		}

		for (expected, answer) in script {
			let line = lines.next_line().await.unwrap().expect("client hung up early");
			assert_eq!(line, expected);
			received.push(line);

			let early = tokio::time::timeout(QUIET, lines.next_line()).await;
			assert!(early.is_err(), "command written before '{}' was answered", expected);

			for chunk in answer.as_bytes().chunks(5) {
				write.write_all(chunk).await.unwrap();
				write.flush().await.unwrap();
			}
		}

		// Anything after the script is a protocol bug unless it is EOF
		if let Ok(Ok(Some(extra))) = tokio::time::timeout(QUIET, lines.next_line()).await {
			received.push(extra);
		}
		received
	})
}

// ============================================================================
// Action Tests
// ============================================================================

#[tokio::test]
async fn test_shoot_end_to_end() {
	let (listener, config) = listen().await;
	let server = serve(listener, "bzrobots 1\n", vec![("shoot 3", "ack 1.25 shoot 3\nok\n")]);

	let client = BzrClient::connect(&config).await.unwrap();
	assert!(client.shoot(3).await.unwrap());
	client.shutdown().await.unwrap();

	assert_eq!(server.await.unwrap(), vec!["agent 1", "shoot 3"]);
}

#[tokio::test]
async fn test_speed_and_angvel_formatting() {
	let (listener, config) = listen().await;
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![("speed 0 0.5", "ack\nok\n"), ("angvel 1 -0.25", "ack\nfail\n")],
	);

	let client = BzrClient::connect(&config).await.unwrap();
	assert!(client.set_speed(0, 0.5).await.unwrap());
	assert!(!client.set_angular_velocity(1, -0.25).await.unwrap());
	client.shutdown().await.unwrap();
	server.await.unwrap();
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[tokio::test]
async fn test_queued_commands_keep_call_order() {
	let (listener, config) = listen().await;
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![
			("speed 0 1", "ack\nok\n"),
			("angvel 0 0.5", "ack\nok\n"),
			("shoot 0", "ack\nfail\n"),
			("teams", "ack 3.0\nbegin\nteam red 3\nteam blue 2\nend\n"),
		],
	);

	let client = BzrClient::connect(&config).await.unwrap();
	let speed = client.set_speed(0, 1.0);
	let angvel = client.set_angular_velocity(0, 0.5);
	let shoot = client.shoot(0);
	let teams = client.teams();

	// Awaiting out of order does not change the wire order
	let (teams, timestamp) = teams.await.unwrap();
	assert!(!shoot.await.unwrap());
	assert!(angvel.await.unwrap());
	assert!(speed.await.unwrap());

	assert_eq!(timestamp, 3.0);
	assert_eq!(teams.len(), 2);
	assert_eq!((teams[0].color.as_str(), teams[0].count), ("red", 3));
	assert_eq!((teams[1].color.as_str(), teams[1].count), ("blue", 2));

	client.shutdown().await.unwrap();
	assert_eq!(
		server.await.unwrap(),
		vec!["agent 1", "speed 0 1", "angvel 0 0.5", "shoot 0", "teams"]
	);
}

#[tokio::test]
async fn test_concurrent_callers_share_connection() {
	let (listener, config) = listen().await;
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![
			("flags", "ack 1\nbegin\nflag red none 1 2\nend\n"),
			("shots", "ack 2\nbegin\nshot 0 0 1 1\nend\n"),
		],
	);

	let client = BzrClient::connect(&config).await.unwrap();
	let flags = client.flags();
	let shots = client.shots();
	let (flags, shots) = tokio::join!(flags, shots);

	assert_eq!(flags.unwrap().0[0].location, Point::new(1.0, 2.0));
	assert_eq!(shots.unwrap().1, 2.0);
	client.shutdown().await.unwrap();
	server.await.unwrap();
}

// ============================================================================
// Query Tests
// ============================================================================

#[tokio::test]
async fn test_state_queries() {
	let (listener, config) = listen().await;
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![
			("constants", "ack 0.5\nbegin\nconstant team red\nconstant worldsize 800\nend\n"),
			("bases", "ack 0.6\nbegin\nbase red -400 -400 -300 -400 -300 -300 -400 -300\nend\n"),
			(
				"mytanks",
				"ack 0.7\nbegin\nmytank 0 red0 alive 5 0 - -350 -350 0.5 0 0 0\n\
				 mytank 1 red1 dead 0 2.5 blue 10 20 -1.5 1 -1 0.25\nend\n",
			),
			("othertanks", "ack 0.8\nbegin\nothertank blue0 blue alive - 100 200 3.1\nend\n"),
			("obstacles", "ack 0.9\nbegin\nobstacle 0 0 10 0 10 10 0 10\nend\n"),
		],
	);

	let client = BzrClient::connect(&config).await.unwrap();

	let (constants, t) = client.constants().await.unwrap();
	assert_eq!(t, 0.5);
	assert_eq!(constants["team"], "red");
	assert_eq!(constants["worldsize"], "800");

	let (bases, _) = client.bases().await.unwrap();
	assert_eq!(bases[0].corners[1], Point::new(-300.0, -400.0));

	let (tanks, t) = client.my_tanks().await.unwrap();
	assert_eq!(t, 0.7);
	assert_eq!(tanks.len(), 2);
	assert_eq!(tanks[1].status, "dead");
	assert_eq!(tanks[1].flag, "blue");
	assert_eq!(tanks[1].time_to_reload, 2.5);
	assert_eq!(tanks[1].angvel, 0.25);

	let (others, _) = client.other_tanks().await.unwrap();
	assert_eq!(others[0].callsign, "blue0");
	assert_eq!(others[0].location, Point::new(100.0, 200.0));

	let (obstacles, _) = client.obstacles().await.unwrap();
	assert_eq!(obstacles[0].points.len(), 4);

	client.shutdown().await.unwrap();
	server.await.unwrap();
}

#[tokio::test]
async fn test_occupancy_grid_paths() {
	let (listener, config) = listen().await;
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![
			("occgrid", "ack 1.0\noccgrid fail\n"),
			("occgrid", "ack 2.0\nat 1.0,2.0\nsize 2x3\n010\n101\n"),
		],
	);

	let client = BzrClient::connect(&config).await.unwrap();

	let (grid, _) = client.occupancy_grid().await.unwrap();
	assert!(grid.is_none());

	let (grid, t) = client.occupancy_grid().await.unwrap();
	let grid = grid.expect("grid");
	assert_eq!(t, 2.0);
	assert_eq!(grid.origin, Point::new(1.0, 2.0));
	assert_eq!((grid.width, grid.height), (2, 3));
	assert_eq!(grid.rows(), vec!["010", "101"]);

	client.shutdown().await.unwrap();
	server.await.unwrap();
}

#[tokio::test]
async fn test_snapshot_filters_enemies() {
	let (listener, config) = listen().await;
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![
			("constants", "ack 1\nbegin\nconstant team red\nend\n"),
			("bases", "ack 1\nbegin\nbase red 0 0 1 0 1 1 0 1\nbase blue 5 5 6 5 6 6 5 6\nend\n"),
			("mytanks", "ack 4.5\nbegin\nmytank 0 red0 alive 1 0 - 0 0 0 0 0 0\nend\n"),
			(
				"othertanks",
				"ack 1\nbegin\nothertank red1 red alive - 1 1 0\nothertank blue0 blue alive - 9 9 0\nend\n",
			),
			("flags", "ack 1\nbegin\nflag blue none 5 5\nflag red none 0 0\nend\n"),
			("shots", "ack 1\nbegin\nend\n"),
		],
	);

	let client = BzrClient::connect(&config).await.unwrap();
	let snapshot = bzrc::snapshot(&client).await.unwrap();

	assert_eq!(snapshot.timestamp, 4.5);
	assert_eq!(snapshot.team.as_deref(), Some("red"));
	assert_eq!(snapshot.my_tanks[&0].callsign, "red0");
	assert_eq!(snapshot.enemies.len(), 1);
	assert_eq!(snapshot.enemies[0].callsign, "blue0");
	assert_eq!(snapshot.home_base().map(|b| b.color.as_str()), Some("red"));
	assert_eq!(snapshot.free_enemy_flags().count(), 1);
	assert!(snapshot.shots.is_empty());

	client.shutdown().await.unwrap();
	server.await.unwrap();
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
async fn test_handshake_rejected() {
	let (listener, config) = listen().await;
	let server = serve(listener, "bzrobots 2\n", vec![]);

	let err = BzrClient::connect(&config).await.unwrap_err();
	match err {
		ClientError::Protocol(ProtocolError::Violation { expected, received }) => {
			assert_eq!(expected, "bzrobots 1");
			assert_eq!(received, "bzrobots 2");
		}
		other => panic!("unexpected error: {:?}", other),
	}

	// The client never answered the greeting
	assert!(server.await.unwrap().is_empty());
}

#[tokio::test]
async fn test_violation_stops_engine() {
	let (listener, config) = listen().await;
	let server = serve(listener, "bzrobots 1\n", vec![("shoot 1", "ack\nmaybe\n")]);

	let client = BzrClient::connect(&config).await.unwrap();
	let first = client.shoot(1);
	let second = client.teams();

	match first.await {
		Err(ProtocolError::Violation { expected, received }) => {
			assert_eq!(expected, "ok or fail");
			assert_eq!(received, "maybe");
		}
		other => panic!("unexpected result: {:?}", other),
	}
	assert!(matches!(second.await, Err(ProtocolError::Halted { .. })));

	client.shutdown().await.unwrap();
	// `teams` never reached the wire
	assert_eq!(server.await.unwrap(), vec!["agent 1", "shoot 1"]);
}

#[tokio::test]
async fn test_disconnect_fails_pending_operations() {
	let (listener, config) = listen().await;
	let server = tokio::spawn(async move {
		let (mut stream, _) = listener.accept().await.unwrap();
		stream.write_all(b"bzrobots 1\n").await.unwrap();
		let mut lines = BufReader::new(&mut stream).lines();
		assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("agent 1"));
		assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("mytanks"));
		drop(lines);
		// Half an answer, then hang up
		stream.write_all(b"ack 1.0\nbegin\nmytank 0 red0").await.unwrap();
	});

	let client = BzrClient::connect(&config).await.unwrap();
	let tanks = client.my_tanks();
	let flags = client.flags();

	assert!(matches!(tanks.await, Err(ProtocolError::ConnectionClosed)));
	assert!(matches!(flags.await, Err(ProtocolError::ConnectionClosed)));
	client.closed().await;
	assert!(client.is_closed());
	assert!(matches!(client.shoot(0).await, Err(ProtocolError::ConnectionClosed)));

	server.await.unwrap();
}

#[tokio::test]
async fn test_non_finite_motion_never_reaches_wire() {
	let (listener, config) = listen().await;
	let server = serve(listener, "bzrobots 1\n", vec![("speed 0 0.5", "ack\nok\n")]);

	let client = BzrClient::connect(&config).await.unwrap();
	let nan = client.set_speed(0, f64::NAN);
	let inf = client.set_angular_velocity(1, f64::INFINITY);
	let valid = client.set_speed(0, 0.5);

	assert!(matches!(nan.await, Err(ProtocolError::InvalidArgument { .. })));
	assert!(matches!(inf.await, Err(ProtocolError::InvalidArgument { .. })));
	// A refused call does not stop the engine
	assert!(valid.await.unwrap());

	client.shutdown().await.unwrap();
	assert_eq!(server.await.unwrap(), vec!["agent 1", "speed 0 0.5"]);
}

#[tokio::test]
async fn test_configured_line_bound_drops_connection() {
	let (listener, mut config) = listen().await;
	config.max_line_bytes = Some(40);
	let server = serve(
		listener,
		"bzrobots 1\n",
		vec![(
			"mytanks",
			"ack 1.0\nbegin\nmytank 0 red0 alive 5 0 - -350.125 -350.125 0.5 0 0 0\nend\n",
		)],
	);

	let client = BzrClient::connect(&config).await.unwrap();
	let tanks = client.my_tanks();
	let shoot = client.shoot(0);

	assert!(matches!(tanks.await, Err(ProtocolError::LineTooLong { limit: 40 })));
	match shoot.await {
		Err(ProtocolError::Halted { reason }) => assert!(reason.contains("40 bytes")),
		other => panic!("unexpected result: {:?}", other),
	}
	client.closed().await;
	assert!(client.is_closed());

	// `shoot` never reached the wire
	assert_eq!(server.await.unwrap(), vec!["agent 1", "mytanks"]);
}

#[tokio::test]
async fn test_connection_refused() {
	let (listener, config) = listen().await;
	drop(listener);

	match BzrClient::connect(&config).await {
		Err(ClientError::Connect { address, .. }) => {
			assert_eq!(address, format!("127.0.0.1:{}", config.port.unwrap()));
		}
		other => panic!("unexpected result: {:?}", other),
	}
}

#[tokio::test]
async fn test_missing_port_is_config_error() {
	let config = ClientConfig::default();
	assert!(matches!(BzrClient::connect(&config).await, Err(ClientError::Config(_))));
}

// vim: ts=4
