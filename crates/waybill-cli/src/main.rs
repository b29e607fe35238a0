use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use waybill::config::{self, Config};
use waybill::types::{NewStep, TrackingRecord, normalize_code};
use waybill::{Reporter, SyncOutcome, Tracker};

mod output;

#[derive(Parser, Debug)]
#[command(name = "waybill", version)]
#[command(about = "Shipment tracking records with optional cloud sync and share links")]
struct Cli {
    /// Path to the config file (default: ./.waybill.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for local records (overrides config and WAYBILL_STORE_DIR)
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List local records.
    List,
    /// Print one local record.
    Show { code: String },
    /// Create a record, or edit the details of an existing one.
    Create {
        code: String,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        /// Current location
        #[arg(long, default_value = "")]
        location: String,
        /// Estimated delivery text
        #[arg(long, default_value = "")]
        eta: String,
        #[arg(long, default_value = "Postado")]
        status: String,
    },
    /// Append a step and make it the current one.
    Step {
        code: String,
        #[arg(long)]
        status: String,
        #[arg(long)]
        location: String,
        /// Step date (default: today, dd/mm/yyyy)
        #[arg(long)]
        date: Option<String>,
        /// Step time (default: now, HH:MM)
        #[arg(long)]
        time: Option<String>,
    },
    /// Delete a local record. The cloud copy is kept.
    Delete { code: String },
    /// Print a share link for a record.
    Share { code: String },
    /// Load the record a share link points at.
    Open { link: String },
    /// Print the encoded payload of a record.
    Encode { code: String },
    /// Decode a payload and print the record as JSON.
    Decode { payload: String },
    /// Fetch a record from the cloud into the local store.
    Pull { code: String },
    /// Send a local record to the cloud.
    Push { code: String },
    /// Inspect or change settings.
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration with secrets masked.
    Show,
    /// Persist a public base URL for share links.
    SetBaseUrl { url: String },
    /// Remove the persisted public base URL.
    ClearBaseUrl,
}

struct CliReporter;

impl Reporter for CliReporter {
    fn info(&mut self, msg: &str) {
        eprintln!("[info] {msg}");
    }

    fn warn(&mut self, msg: &str) {
        eprintln!("[warn] {msg}");
    }

    fn error(&mut self, msg: &str) {
        eprintln!("[error] {msg}");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_effective_config(cli.config.as_deref(), cli.store_dir.as_deref())?;
    let mut reporter = CliReporter;

    if let Commands::Config { cmd } = &cli.cmd {
        return run_config(cmd, &config, &mut reporter);
    }

    let tracker = Tracker::open(&config)?;

    match cli.cmd {
        Commands::List => {
            println!("{}", output::record_table(&tracker.list()?));
        }
        Commands::Show { code } => {
            let record = require(&tracker, &code)?;
            println!("{}", output::record_details(&record));
        }
        Commands::Create {
            code,
            origin,
            destination,
            location,
            eta,
            status,
        } => {
            let details = TrackingRecord::new(&code, origin, destination)
                .with_current_location(location)
                .with_estimated_delivery(eta)
                .with_status(status);
            let (record, outcome) = tracker.save_details(details, &mut reporter)?;
            println!("{}", output::sync_line(&record.code, outcome));
        }
        Commands::Step {
            code,
            status,
            location,
            date,
            time,
        } => {
            let mut step = NewStep::new(status, location);
            step.date = date;
            step.time = time;
            let (record, outcome) = tracker.add_step(&code, step, &mut reporter)?;
            println!("{}", output::sync_line(&record.code, outcome));
        }
        Commands::Delete { code } => {
            if !tracker.delete(&code)? {
                bail!("no local record for code {}", normalize_code(&code));
            }
            println!("{}: deleted", normalize_code(&code));
        }
        Commands::Share { code } => {
            println!("{}", tracker.share_link(&code)?);
        }
        Commands::Open { link } => {
            let record = tracker
                .open_link(&link, &mut reporter)?
                .context("link did not resolve to a tracking record")?;
            println!("{}", output::record_details(&record));
        }
        Commands::Encode { code } => {
            let record = require(&tracker, &code)?;
            println!("{}", waybill::codec::encode(&record));
        }
        Commands::Decode { payload } => {
            let record = waybill::codec::try_decode(&payload).context("invalid payload")?;
            println!(
                "{}",
                serde_json::to_string_pretty(&record).context("failed to render record")?
            );
        }
        Commands::Pull { code } => {
            let record = tracker
                .pull(&code, &mut reporter)?
                .with_context(|| format!("{}: nothing pulled", normalize_code(&code)))?;
            println!("{}", output::record_details(&record));
        }
        Commands::Push { code } => {
            let outcome = tracker.push(&code, &mut reporter)?;
            println!("{}: cloud {outcome}", normalize_code(&code));
            if outcome == SyncOutcome::Failed {
                bail!("{}: cloud save failed", normalize_code(&code));
            }
        }
        Commands::Config { .. } => {}
    }

    Ok(())
}

/// File config, then environment, then command-line flags.
fn load_effective_config(path: Option<&Path>, store_dir: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => {
            if !path.exists() {
                bail!("config file not found: {}", path.display());
            }
            config::load_config_file(path)?
        }
        None => config::load_config(Path::new("."))?,
    };
    config.apply_env();
    if let Some(dir) = store_dir {
        config.store.dir = Some(dir.to_path_buf());
    }
    Ok(config)
}

fn require<S: waybill::storage::RecordStore>(tracker: &Tracker<S>, code: &str) -> Result<TrackingRecord> {
    tracker
        .get(code)?
        .with_context(|| format!("no local record for code {}", normalize_code(code)))
}

fn run_config(cmd: &ConfigCommands, config: &Config, reporter: &mut dyn Reporter) -> Result<()> {
    let store_dir = config.store_dir();
    let mut settings = config::load_settings(&store_dir)?;

    match cmd {
        ConfigCommands::Show => {
            println!("{}", output::config_summary(config, &settings));
        }
        ConfigCommands::SetBaseUrl { url } => {
            settings.set_public_base_url(url)?;
            config::save_settings(&store_dir, &settings)?;
            reporter.info(&format!(
                "saved {}",
                config::settings_path(&store_dir).display()
            ));
            println!("public_base_url: {}", settings.public_base_url().unwrap_or_default());
        }
        ConfigCommands::ClearBaseUrl => {
            settings.clear_public_base_url();
            config::save_settings(&store_dir, &settings)?;
            println!("public_base_url: -");
        }
    }

    Ok(())
}
