use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scterc_tune::drives::{
    DeviceEnumerator, DiagnosticQuery, DriveDetector, DryRunActions, ExplicitDevices,
    SMARTMonitor, TimeoutSetter,
};
use scterc_tune::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scterc-tune")]
#[command(about = "Reconcile drive SCT ERC and host command timeouts for RAID members")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Registry file, overrides the config file
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// Skip the root privilege check
    #[arg(long, global = true)]
    no_root_check: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register new drives and fix timeouts on RAID members (default)
    Run {
        /// Only these devices (e.g., /dev/sda); default is every disk in /sys/block
        #[arg(short, long)]
        device: Vec<String>,

        /// Show what would be done without changing drives or the registry
        #[arg(long)]
        dry_run: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show serial and SCT ERC state of each drive without touching the registry
    Inspect {
        /// Only these devices
        #[arg(short, long)]
        device: Vec<String>,

        /// Print readings as JSON
        #[arg(long)]
        json: bool,
    },

    /// List registered drives and which ones are treated as RAID members
    Status,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug);

    let command = cli.command.unwrap_or(Commands::Run {
        device: Vec::new(),
        dry_run: false,
        json: false,
    });

    let needs_root = match &command {
        Commands::Run { dry_run, .. } => !dry_run,
        Commands::Inspect { .. } => true,
        Commands::Status => false,
    };

    // Check for root privileges
    if needs_root && !cli.no_root_check && !is_root() {
        eprintln!("Error: This program requires root privileges.");
        eprintln!("Please run with sudo or as root user.");
        std::process::exit(1);
    }

    let mut settings = Settings::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(registry) = cli.registry {
        settings.registry_path = registry;
    }

    match command {
        Commands::Run {
            device,
            dry_run,
            json,
        } => run(&settings, device, dry_run, json),
        Commands::Inspect { device, json } => inspect(&settings, device, json),
        Commands::Status => status(&settings),
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

fn enumerator_for(settings: &Settings, devices: Vec<String>) -> Box<dyn DeviceEnumerator> {
    if devices.is_empty() {
        Box::new(DriveDetector::new(&settings.sysfs_root, &settings.dev_root))
    } else {
        Box::new(ExplicitDevices::new(devices))
    }
}

fn run(settings: &Settings, devices: Vec<String>, dry_run: bool, json: bool) -> Result<()> {
    let registry_path = &settings.registry_path;
    let loaded = Registry::load(registry_path)
        .with_context(|| format!("loading registry {}", registry_path.display()))?;

    let enumerator = enumerator_for(settings, devices);
    let query = SMARTMonitor::new(&settings.smartctl_path);
    let reconciler = Reconciler::new(settings.erc_timeout, settings.host_timeout_secs);

    let print_outcome = |outcome: &DriveOutcome| {
        if json {
            return;
        }
        if dry_run && matches!(outcome, DriveOutcome::ActionIssued { .. }) {
            println!("[dry run] {}", outcome);
        } else {
            println!("{}", outcome);
        }
    };

    let report = if dry_run {
        // Work on a copy so nothing is appended to disk
        let mut registry = Registry::from_rows(loaded.rows().to_vec());
        let mut actions = DryRunActions::new();
        reconciler.run(
            enumerator.as_ref(),
            &query,
            &mut registry,
            &mut actions,
            print_outcome,
        )?
    } else {
        let mut registry = loaded;
        let mut actions = TimeoutSetter::new(&settings.smartctl_path, &settings.sysfs_root);
        reconciler
            .run(
                enumerator.as_ref(),
                &query,
                &mut registry,
                &mut actions,
                print_outcome,
            )
            .with_context(|| format!("updating registry {}", registry_path.display()))?
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.outcomes.is_empty() {
        println!("No drives with a readable serial number were found.");
    }

    if report.has_new_drives() {
        let count = report.new_drives().count();
        println!();
        println!("========================================");
        println!(
            "{} new drive(s) {} {}",
            count,
            if dry_run { "would be added to" } else { "added to" },
            registry_path.display()
        );
        println!("Set is_raid_disk to \"yes\" for every drive that is a RAID member,");
        println!("then run scterc-tune again to apply timeouts.");
        println!("========================================");
    }

    Ok(())
}

fn inspect(settings: &Settings, devices: Vec<String>, json: bool) -> Result<()> {
    let enumerator = enumerator_for(settings, devices);
    let query = SMARTMonitor::new(&settings.smartctl_path);

    let readings: Vec<DriveReading> = enumerator
        .devices()
        .iter()
        .filter_map(|device| query.query(device))
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&readings)?);
        return Ok(());
    }

    println!(
        "{:<14} {:<24} {:<8} {}",
        "DEVICE", "SERIAL", "SCT ERC", "TIMEOUT"
    );
    for reading in &readings {
        println!(
            "{:<14} {:<24} {:<8} {}",
            reading.device_id,
            if reading.serial.is_empty() { "-" } else { reading.serial.as_str() },
            if reading.supports_fast_recovery() { "yes" } else { "no" },
            reading.erc_display()
        );
    }

    Ok(())
}

fn status(settings: &Settings) -> Result<()> {
    let path = &settings.registry_path;
    let registry = Registry::load(path)
        .with_context(|| format!("loading registry {}", path.display()))?;

    if registry.is_empty() {
        println!("Registry {} has no drives yet.", path.display());
        return Ok(());
    }

    println!("Registry: {}", path.display());
    println!(
        "  {:<24} {:<8} {:<10} {}",
        "SERIAL", "SCT ERC", "RAID", "ACTION"
    );
    for row in registry.rows() {
        println!(
            "  {:<24} {:<8} {:<10} {}",
            row.serial,
            row.supports_fast_recovery,
            row.raid_membership,
            if row.is_raid_member() { "timeouts applied on run" } else { "-" }
        );
    }

    Ok(())
}
