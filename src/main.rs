use anyhow::{bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use drivetel::check::smart_check;
use drivetel::config::Config;
use drivetel::errlog::{read_error_log, render_error_log};
use drivetel::farm::{pull_combined_farm_to_dir, FarmFile};
use drivetel::models::device::VendorFamily;
use drivetel::models::farm::{CopySource, FarmSummary};
use drivetel::models::trip::CheckStatus;
use drivetel::smart::{read_smart, render_nvme, render_table, RenderMode, SmartData};
use drivetel::transport::replay::ReplayDevice;
use drivetel::transport::Device;
#[cfg(target_os = "linux")]
use drivetel::transport::linux::LinuxDevice;
use drivetel::util::human::fmt_bytes;

#[derive(Parser, Debug)]
#[command(name = "drivetel", about = "FARM log assembler and SMART diagnostics", version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Pull every FARM dataset and write a combined .frmc file
    Farm {
        /// Replay directory or /dev node
        dev: PathBuf,
        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Frame source for ATA drives: disc or flash
        #[arg(long)]
        copy: Option<CopySource>,
        /// Sectors per READ LOG EXT transfer
        #[arg(long)]
        xfer: Option<u32>,
    },
    /// Print the SMART attribute table (or NVMe health log)
    Attributes {
        dev: PathBuf,
        /// raw, hybrid or analyzed
        #[arg(long)]
        mode: Option<RenderMode>,
        /// Vendor family override, e.g. seagate-vendor-k
        #[arg(long)]
        family: Option<VendorFamily>,
    },
    /// Print the ATA SMART error log
    Errors {
        dev: PathBuf,
    },
    /// SMART health check: exit 0=PASS, 1=WARNING, 2=FAIL, 3=UNKNOWN
    Check {
        dev: PathBuf,
        #[arg(long)]
        family: Option<VendorFamily>,
    },
    /// Summarize an existing combined FARM file
    FarmInfo {
        file: PathBuf,
    },
    /// Print config file path and current values
    Config,
    /// Generate shell completions
    Completions {
        shell: Shell,
    },
}

// ── Device handles ────────────────────────────────────────────────────

enum Handle {
    Replay(ReplayDevice),
    #[cfg(target_os = "linux")]
    Linux(LinuxDevice),
}

impl Handle {
    fn open(path: &Path) -> Result<Self> {
        if path.is_dir() {
            let dev = ReplayDevice::open(path)
                .with_context(|| format!("loading replay capture {}", path.display()))?;
            return Ok(Handle::Replay(dev));
        }
        Self::open_node(path)
    }

    #[cfg(target_os = "linux")]
    fn open_node(path: &Path) -> Result<Self> {
        let dev = LinuxDevice::open(path).with_context(|| format!("opening {}", path.display()))?;
        Ok(Handle::Linux(dev))
    }

    #[cfg(not(target_os = "linux"))]
    fn open_node(path: &Path) -> Result<Self> {
        bail!("{} is not a replay directory", path.display())
    }

    fn set_family(&mut self, family: VendorFamily) {
        match self {
            Handle::Replay(d) => d.set_family(family),
            #[cfg(target_os = "linux")]
            Handle::Linux(d)  => d.set_family(family),
        }
    }

    fn device(&self) -> Device<'_> {
        match self {
            Handle::Replay(d) => d.as_device(),
            #[cfg(target_os = "linux")]
            Handle::Linux(d)  => d.as_device(),
        }
    }
}

fn open_device(path: &Path, family: Option<VendorFamily>) -> Result<Handle> {
    let mut handle = Handle::open(path)?;
    if let Some(f) = family {
        handle.set_family(f);
    }
    Ok(handle)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let cfg = Config::load();

    match cli.command {
        Cmd::Check { dev, family } => return run_check(&cfg, &dev, family, cli.json),
        Cmd::Farm { dev, out, copy, xfer } => run_farm(&cfg, &dev, out, copy, xfer, cli.json)?,
        Cmd::Attributes { dev, mode, family } => run_attributes(&cfg, &dev, mode, family, cli.json)?,
        Cmd::Errors { dev } => run_errors(&cfg, &dev, cli.json)?,
        Cmd::FarmInfo { file } => run_farm_info(&file, cli.json)?,
        Cmd::Config => run_config(&cfg)?,
        Cmd::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "drivetel", &mut io::stdout());
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ── Subcommands ───────────────────────────────────────────────────────

fn run_farm(
    cfg: &Config,
    dev: &Path,
    out: Option<PathBuf>,
    copy: Option<CopySource>,
    xfer: Option<u32>,
    json: bool,
) -> Result<()> {
    let handle = open_device(dev, cfg.smart.family)?;
    let mut opts = cfg.farm.options();
    if let Some(c) = copy {
        opts.copy_source = c;
    }
    if let Some(x) = xfer {
        opts.transfer_hint = x;
    }
    let dir = out.unwrap_or_else(|| cfg.farm.output_dir());

    let (path, summary) = pull_combined_farm_to_dir(handle.device(), &opts, &dir)
        .with_context(|| format!("collecting FARM from {}", dev.display()))?;
    if json {
        return print_json(&summary);
    }
    println!("Wrote {}", path.display());
    print_summary(&summary);
    Ok(())
}

fn run_attributes(
    cfg: &Config,
    dev: &Path,
    mode: Option<RenderMode>,
    family: Option<VendorFamily>,
    json: bool,
) -> Result<()> {
    let handle = open_device(dev, family.or(cfg.smart.family))?;
    let device = handle.device();
    let data = read_smart(device).context("reading SMART data")?;
    if json {
        return print_json(&data);
    }
    match &data {
        SmartData::Ata(table) => print!("{}", render_table(table, device.family(), mode.unwrap_or(cfg.smart.mode))),
        SmartData::Nvme(h)    => print!("{}", render_nvme(h)),
    }
    Ok(())
}

fn run_errors(cfg: &Config, dev: &Path, json: bool) -> Result<()> {
    let handle = open_device(dev, cfg.smart.family)?;
    let Device::Ata(ata) = handle.device() else {
        bail!("SMART error logs are only kept by ATA drives");
    };
    let log = read_error_log(ata).context("reading SMART error log")?;
    if json {
        return print_json(&log);
    }
    print!("{}", render_error_log(&log));
    Ok(())
}

/// Process exit status for a health verdict.
fn check_exit_status(status: CheckStatus) -> u8 {
    match status {
        CheckStatus::Pass                                => 0,
        CheckStatus::Warning                             => 1,
        CheckStatus::Fail                                => 2,
        CheckStatus::Unknown | CheckStatus::NotSupported => 3,
    }
}

fn run_check(cfg: &Config, dev: &Path, family: Option<VendorFamily>, json: bool) -> Result<ExitCode> {
    let handle = open_device(dev, family.or(cfg.smart.family))?;
    let result = match smart_check(handle.device(), &cfg.check.options()) {
        Ok(r)  => r,
        Err(e) => {
            println!("UNKNOWN: {}", e);
            return Ok(ExitCode::from(check_exit_status(CheckStatus::Unknown)));
        }
    };

    if json {
        print_json(&result)?;
    } else {
        match &result.trip {
            Some(t) => println!("{}: {}", result.status.label(), t.reason),
            None    => println!("{}", result.status.label()),
        }
    }
    Ok(ExitCode::from(check_exit_status(result.status)))
}

fn run_farm_info(file: &Path, json: bool) -> Result<()> {
    let farm = FarmFile::open(file).with_context(|| format!("reading {}", file.display()))?;
    if json {
        return print_json(&farm.summary);
    }
    print_summary(&farm.summary);
    Ok(())
}

fn run_config(cfg: &Config) -> Result<()> {
    match Config::config_path() {
        Some(p) => println!("Config file: {}", p.display()),
        None    => println!("Config file: (no config directory)"),
    }
    println!();
    print!("{}", toml::to_string_pretty(cfg)?);
    Ok(())
}

fn print_summary(s: &FarmSummary) {
    println!(
        "Combined FARM v{}.{}.{}  interface {}  {} bytes",
        s.version.0,
        s.version.1,
        s.version.2,
        s.interface.trim(),
        s.file_size
    );
    println!("  Model:    {}", s.model);
    println!("  Serial:   {}", s.serial);
    println!("  Firmware: {}", s.firmware);
    println!("  Datasets: bitmap {:#04x}", s.content_bitmap);
    for d in &s.descriptors {
        println!(
            "    {:<15} offset {:>9}  {:>10}  {} .. {} ms",
            d.kind.label(),
            d.offset,
            fmt_bytes(u64::from(d.length)),
            d.start_ms,
            d.end_ms
        );
    }
}
