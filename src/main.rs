use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::error::Error;
use std::path::PathBuf;

use bzrc::config::{parse_port, ClientConfig};
use bzrc::{logging, snapshot, BzrClient};

const QUERIES: [&str; 9] = [
	"teams",
	"obstacles",
	"occgrid",
	"flags",
	"shots",
	"mytanks",
	"othertanks",
	"bases",
	"constants",
];

///////////////////////
// Utility functions //
///////////////////////

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
	println!("{}", serde_json::to_string_pretty(value)?);
	Ok(())
}

fn print_stamped<T: Serialize>(value: &T, timestamp: f64) -> Result<(), Box<dyn Error>> {
	print_json(&serde_json::json!({ "timestamp": timestamp, "value": value }))
}

fn tank_arg() -> Arg {
	Arg::new("tank").required(true).value_parser(value_parser!(u32)).help("Tank index")
}

fn value_arg() -> Arg {
	Arg::new("value")
		.required(true)
		.allow_negative_numbers(true)
		.value_parser(value_parser!(f64))
		.help("Fraction of the maximum, -1.0 to 1.0")
}

fn build_config(matches: &ArgMatches) -> Result<ClientConfig, Box<dyn Error>> {
	let mut config = ClientConfig::load(matches.get_one::<PathBuf>("config").map(|p| p.as_path()))?;
	if let Some(host) = matches.get_one::<String>("host") {
		config.host = host.clone();
	}
	if let Some(port) = matches.get_one::<String>("port") {
		config.port = Some(parse_port("--port", port)?);
	}
	Ok(config)
}

async fn run_query(client: &BzrClient, what: &str) -> Result<(), Box<dyn Error>> {
	match what {
		"teams" => {
			let (value, t) = client.teams().await?;
			print_stamped(&value, t)
		}
		"obstacles" => {
			let (value, t) = client.obstacles().await?;
			print_stamped(&value, t)
		}
		"occgrid" => {
			let (value, t) = client.occupancy_grid().await?;
			print_stamped(&value, t)
		}
		"flags" => {
			let (value, t) = client.flags().await?;
			print_stamped(&value, t)
		}
		"shots" => {
			let (value, t) = client.shots().await?;
			print_stamped(&value, t)
		}
		"mytanks" => {
			let (value, t) = client.my_tanks().await?;
			print_stamped(&value, t)
		}
		"othertanks" => {
			let (value, t) = client.other_tanks().await?;
			print_stamped(&value, t)
		}
		"bases" => {
			let (value, t) = client.bases().await?;
			print_stamped(&value, t)
		}
		"constants" => {
			let (value, t) = client.constants().await?;
			print_stamped(&value, t)
		}
		other => Err(format!("unknown query: {}", other).into()),
	}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = Command::new("bzrc")
		.version(env!("CARGO_PKG_VERSION"))
		.about("BZRobots tank control client")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.value_parser(value_parser!(PathBuf))
				.global(true)
				.help("Config file (TOML)"),
		)
		.arg(
			Arg::new("host")
				.long("host")
				.value_name("HOST")
				.global(true)
				.help("Server host"),
		)
		.arg(
			Arg::new("port")
				.short('p')
				.long("port")
				.value_name("PORT")
				.global(true)
				.help("Server port"),
		)
		.arg(
			Arg::new("verbose")
				.short('v')
				.long("verbose")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Log every line sent and received"),
		)
		.subcommand(
			Command::new("query")
				.about("Run one state query and print the result as JSON")
				.arg(Arg::new("what").required(true).value_parser(QUERIES)),
		)
		.subcommand(Command::new("shoot").about("Fire a tank's gun").arg(tank_arg()))
		.subcommand(
			Command::new("speed").about("Set a tank's speed").arg(tank_arg()).arg(value_arg()),
		)
		.subcommand(
			Command::new("angvel")
				.about("Set a tank's angular velocity")
				.arg(tank_arg())
				.arg(value_arg()),
		)
		.subcommand(Command::new("snapshot").about("Print everything a strategy sees in one tick"))
		.get_matches();

	logging::init_tracing(matches.get_flag("verbose"));

	let config = build_config(&matches)?;
	let client = BzrClient::connect(&config).await?;

	match matches.subcommand() {
		Some(("query", sub)) => {
			let what = sub.get_one::<String>("what").ok_or("query: kind argument required")?;
			run_query(&client, what).await?;
		}
		Some(("shoot", sub)) => {
			let tank = *sub.get_one::<u32>("tank").ok_or("shoot: tank argument required")?;
			print_json(&client.shoot(tank).await?)?;
		}
		Some((cmd @ ("speed" | "angvel"), sub)) => {
			let tank = *sub.get_one::<u32>("tank").ok_or("tank argument required")?;
			let value = *sub.get_one::<f64>("value").ok_or("value argument required")?;
			let result = if cmd == "speed" {
				client.set_speed(tank, value).await?
			} else {
				client.set_angular_velocity(tank, value).await?
			};
			print_json(&result)?;
		}
		Some(("snapshot", _)) => {
			print_json(&snapshot(&client).await?)?;
		}
		_ => unreachable!("subcommand_required"),
	}

	client.shutdown().await?;
	Ok(())
}

// vim: ts=4
