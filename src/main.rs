use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::Result;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use metlink::cache::{CacheResult, CachedRow, Collection, CollectionStore};
use metlink::config::Config;
use metlink::logging::{self, LogTarget};
use metlink::metlink::cache::{Services, Stops};
use metlink::metlink::types::{Service, Stop};
use metlink::metlink::CachedMetlinkClient;

#[derive(Parser, Debug)]
#[command(name = "metlink")]
#[command(about = "Cached command-line access to the Metlink transit API")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/metlink/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Log to stderr instead of the log directory
  #[arg(long)]
  log_stderr: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List parent stops, ordered by stop code
  Stops {
    /// Repopulate from the API even if the cache is fresh
    #[arg(long)]
    refresh: bool,
  },
  /// List services
  Services {
    /// Repopulate from the API even if the cache is fresh
    #[arg(long)]
    refresh: bool,
  },
  /// Live departures for a stop
  Departures { sms: String },
  /// Current disruptions and delays
  Notices,
  /// Route geometry for one direction of a service
  RouteMap {
    mode: String,
    code: String,
    direction: String,
  },
  /// Live vehicle positions for a service
  Locations { code: String },
  /// Mark a stop or service as a favourite
  Favourite { kind: Kind, key: String },
  /// Remove a favourite mark
  Unfavourite { kind: Kind, key: String },
  /// List favourite keys
  Favourites { kind: Kind },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
  Stop,
  Service,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn report<T: Serialize>(collection: &str, result: CacheResult<T>) -> Result<()> {
  info!(
    collection,
    source = ?result.source,
    refreshed_at = %result.refreshed_at,
    "Collection loaded"
  );
  print_json(&result.data)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let log_dir = dirs::data_dir().map(|d| d.join("metlink").join("logs"));
  let _log_guard = match (&log_dir, args.log_stderr) {
    (Some(dir), false) => logging::init(LogTarget::Directory(dir))?,
    _ => logging::init(LogTarget::Stderr)?,
  };

  let config = Config::load(args.config.as_deref())?;
  let client = CachedMetlinkClient::open(&config)?;

  match args.command {
    Command::Stops { refresh } => {
      if refresh {
        client.timestamps().remove(Stops::LAST_UPDATED_KEY)?;
      }
      report(Stop::COLLECTION, client.stops().await?)?;
    }
    Command::Services { refresh } => {
      if refresh {
        client.timestamps().remove(Services::LAST_UPDATED_KEY)?;
      }
      report(Service::COLLECTION, client.services().await?)?;
    }
    Command::Departures { sms } => print_json(&client.stop_departures(&sms).await?)?,
    Command::Notices => print_json(&client.service_notices().await?)?,
    Command::RouteMap {
      mode,
      code,
      direction,
    } => print_json(&client.route_map(&mode, &code, &direction).await?)?,
    Command::Locations { code } => print_json(&client.vehicle_locations(&code).await?)?,
    Command::Favourite { kind, key } => {
      match kind {
        Kind::Stop => client.store().mark_favourite::<Stop>(&key)?,
        Kind::Service => client.store().mark_favourite::<Service>(&key)?,
      }
      info!(?kind, key = %key, "Marked favourite");
    }
    Command::Unfavourite { kind, key } => {
      let removed = match kind {
        Kind::Stop => client.store().unmark_favourite::<Stop>(&key)?,
        Kind::Service => client.store().unmark_favourite::<Service>(&key)?,
      };
      if !removed {
        eprintln!("{} was not a favourite", key);
      }
    }
    Command::Favourites { kind } => {
      let mut keys: Vec<String> = match kind {
        Kind::Stop => client.store().favourite_keys::<Stop>()?,
        Kind::Service => client.store().favourite_keys::<Service>()?,
      }
      .into_iter()
      .collect();
      keys.sort();
      print_json(&keys)?;
    }
  }

  Ok(())
}
