use std::env;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ifmeter::device::{Device, DeviceConfig, NameSequence};
use ifmeter::run::RunPlan;
use ifmeter::sampler::{RateTracker, Sample};

fn init_logger() {
    let filter = env::var("LOG_LEVEL")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&filter))
        .with_target(false)
        .init();
}

#[derive(Parser)]
#[command(name = "ifmeter")]
#[command(about = "SNMP per-interface bandwidth meter", long_about = None)]
struct Args {
    /// Device address (IPv4 or IPv6 literal)
    #[arg(long, env = "IFMETER_ADDRESS")]
    address: String,

    /// SNMP community
    #[arg(
        long,
        env = "IFMETER_COMMUNITY",
        default_value = "public",
        hide_env_values = true
    )]
    community: String,

    /// SNMP version (1, 2c, or 3)
    #[arg(long, env = "IFMETER_VERSION", default_value = "2c")]
    snmp_version: String,

    /// Agent UDP port
    #[arg(long, default_value_t = 161)]
    port: u16,

    /// Device display name (defaults to a generated one)
    #[arg(long)]
    name: Option<String>,

    /// Interface index to sample
    #[arg(long)]
    interface: Option<u32>,

    /// Seconds between samples [default: 1]
    #[arg(long)]
    interval: Option<u64>,

    /// Number of samples to take [default: 50]
    #[arg(long)]
    samples: Option<u32>,

    /// SNMP timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// JSON run plan; individual flags override its fields
    #[arg(long)]
    plan: Option<PathBuf>,
}

/// Merge CLI flags over an optional run-plan file. Flags win field by
/// field; `None` when no interface index came from either side.
fn effective_plan(args: &Args, plan: Option<&RunPlan>) -> Option<RunPlan> {
    let interface = args.interface.or(plan.map(|p| p.interface))?;
    Some(RunPlan {
        interface,
        interval_secs: args.interval.or(plan.map(|p| p.interval_secs)).unwrap_or(1),
        samples: args.samples.or(plan.map(|p| p.samples)).unwrap_or(50),
    })
}

fn read_sample(device: &mut Device, interface: u32) -> Sample {
    Sample {
        in_octets: device.in_octets(interface),
        out_octets: device.out_octets(interface),
    }
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();

    let file_plan = match &args.plan {
        Some(path) => Some(RunPlan::load(path).context("loading the run plan")?),
        None => None,
    };
    let plan = effective_plan(&args, file_plan.as_ref())
        .context("an interface index is required (--interface or a run plan)")?;
    if plan.interval_secs == 0 {
        bail!("the sampling interval must be at least one second");
    }

    let names = NameSequence::new();
    let mut config = DeviceConfig::new(&args.address, &args.community, &args.snmp_version, &names)
        .with_port(args.port)
        .with_timeout(Duration::from_secs(args.timeout));
    if let Some(name) = &args.name {
        config = config.with_name(name);
    }

    let mut device = Device::new(config);
    if !device.connect() {
        bail!("could not connect to {}", device.config().address());
    }
    if !device.interface_numbers().contains(&plan.interface) {
        tracing::warn!(
            "{}: interface {} is not in the discovered set {:?}",
            device.config().name(),
            plan.interface,
            device.interface_numbers()
        );
    }

    let interval = Duration::from_secs(plan.interval_secs);
    let mut tracker = RateTracker::new();

    // Seed the baseline; the first reading comes one interval later.
    let mut last = Instant::now();
    tracker.update(read_sample(&mut device, plan.interface), Duration::ZERO);

    for _ in 0..plan.samples {
        thread::sleep(interval);
        let sample = read_sample(&mut device, plan.interface);
        let now = Instant::now();
        // `last` only advances on an accepted sample, so a reading after a
        // discarded one spans the whole gap since the last good baseline.
        if let Some(reading) = tracker.update(sample, now - last) {
            last = now;
            println!("IN: {} Mb/s OUT: {} Mb/s", reading.in_mbps, reading.out_mbps);
        }
    }

    Ok(())
}
