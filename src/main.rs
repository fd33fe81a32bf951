//! ros3 -- fetch bytes from an object on S3-compatible storage.
//!
//! Opens the object read-only through the ros3 driver, prints its size to
//! stderr, and writes the requested byte range to stdout or a file.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use ros3::config::{load_settings, DriverSettings, Ros3Config};
use ros3::credentials::load_aws_profile;
use ros3::driver::MAX_ADDR;
use ros3::{AccessFlags, DriverConfig, FileDriver, ReadKind, Ros3File};

/// Largest chunk copied per driver read.
const CHUNK_BYTES: u64 = 8 * 1024 * 1024;

/// Command-line arguments for the ros3 tool.
#[derive(Parser, Debug)]
#[command(
    name = "ros3",
    version,
    about = "Read byte ranges from objects on S3-compatible storage"
)]
struct Cli {
    /// Object URL, e.g. https://bucket.s3.us-east-1.amazonaws.com/data.h5
    url: String,

    /// First byte to read.
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Bytes to read; 0 reads to the end of the object.
    #[arg(long, default_value_t = 0)]
    length: u64,

    /// Sign requests with this profile from ~/.aws/credentials.
    #[arg(long)]
    profile: Option<String>,

    /// Override the profile's region.
    #[arg(long)]
    region: Option<String>,

    /// Path to a YAML settings file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print read statistics at close.
    #[arg(long)]
    stats: bool,

    /// Write bytes here instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn init_tracing(settings: &DriverSettings) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if settings.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn access_config(cli: &Cli) -> anyhow::Result<Ros3Config> {
    let Some(profile) = &cli.profile else {
        return Ok(Ros3Config::anonymous());
    };
    let creds = load_aws_profile(profile)
        .with_context(|| format!("loading credentials for profile {profile:?}"))?;
    let mut config = Ros3Config::from_profile(&creds);
    if let Some(region) = &cli.region {
        config.aws_region = region.clone();
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => load_settings(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => DriverSettings::default(),
    };
    if cli.stats {
        settings.stats.enabled = true;
    }
    init_tracing(&settings);

    let fapl = access_config(&cli)?;
    let config = DriverConfig::new(fapl, settings);
    let mut file = Ros3File::open(&cli.url, AccessFlags::empty(), &config, MAX_ADDR)?;
    let eof = file.get_eof();
    eprintln!("{}: {} bytes", cli.url, eof);

    let end = if cli.length == 0 {
        eof
    } else {
        cli.offset.saturating_add(cli.length)
    };
    if cli.offset > eof || end > eof {
        anyhow::bail!(
            "range {}+{} exceeds object size {}",
            cli.offset,
            end.saturating_sub(cli.offset),
            eof
        );
    }

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let mut addr = cli.offset;
    let mut buf = Vec::new();
    while addr < end {
        let chunk = (end - addr).min(CHUNK_BYTES);
        buf.resize(usize::try_from(chunk)?, 0);
        file.read(ReadKind::Raw, addr, &mut buf)?;
        out.write_all(&buf)?;
        addr += chunk;
    }
    out.flush()?;
    info!(bytes = end - cli.offset, "range written");

    if let Some(report) = file.stats_report() {
        eprint!("{report}");
    }
    file.close();
    Ok(())
}
