//! usbhost CLI
//!
//! Lists the USB devices visible through usbfs, optionally with their full
//! descriptor trees, and can exercise the open/poll/close path on each one.

use anyhow::{Context, Result};
use clap::Parser;
use common::setup_logging;
use std::path::PathBuf;
use tracing::{info, warn};
use usbhost::{Device, DeviceId, HostConfig, ScanReport, UsbContext};

#[derive(Parser, Debug)]
#[command(name = "usbhost")]
#[command(author, version, about = "List USB devices exposed through usbfs")]
#[command(long_about = "
Scans the usbfs device node hierarchy, reads every device's descriptors and
prints what it found. Devices that disappear or fail to read during the scan
are skipped and counted.

EXAMPLES:
    # List devices under /dev/bus/usb
    usbhost

    # Show configurations, interfaces and endpoints
    usbhost --verbose

    # Machine-readable output
    usbhost --json

    # Open every device and print the resulting poll set
    usbhost --open

CONFIGURATION:
    The configuration file is looked up in the following order:
    1. Path specified with --config
    2. ~/.config/usbhost/config.toml
    3. /etc/usbhost/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Override the usbfs root directory
    #[arg(long, value_name = "PATH")]
    root: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Print devices as JSON
    #[arg(long)]
    json: bool,

    /// Print the configuration/interface/endpoint tree of each device
    #[arg(short, long)]
    verbose: bool,

    /// Open every device, print the poll set, then close all handles
    #[arg(long)]
    open: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let config = HostConfig::default();
        let path = HostConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let mut config = if let Some(ref path) = args.config {
        HostConfig::load(Some(path.clone())).context("Failed to load configuration")?
    } else {
        HostConfig::load_or_default()
    };

    if let Some(root) = args.root {
        config.usbfs.root = root;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate().context("Invalid configuration")?;

    setup_logging(&config.logging.level, config.logging.format)
        .context("Failed to setup logging")?;
    info!("usbhost v{}", env!("CARGO_PKG_VERSION"));

    let mut ctx = UsbContext::new(&config);
    let report = ctx.scan_all().context("Failed to scan USB buses")?;

    if args.json {
        let devices: Vec<&Device> = ctx.devices().map(|(_, d)| d).collect();
        let output = serde_json::json!({ "report": report, "devices": devices });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_devices(&ctx, args.verbose);
        print_report(&report);
    }

    if args.open {
        open_all(&mut ctx)?;
    }

    Ok(())
}

fn print_devices(ctx: &UsbContext, verbose: bool) {
    if ctx.device_count() == 0 {
        println!("No USB devices found.");
        return;
    }

    let mut next = ctx.first();
    while let Some(id) = next {
        if let Some(device) = ctx.device(id) {
            print_device(device, verbose);
        }
        next = ctx.next(id);
    }
}

fn print_device(device: &Device, verbose: bool) {
    let desc = &device.descriptor;
    println!(
        "Bus {} Device {}: ID {:04x}:{:04x} {} ({} configuration{})",
        device.bus,
        device.name,
        desc.vendor_id,
        desc.product_id,
        desc.class_code(),
        device.configurations.len(),
        if device.configurations.len() == 1 { "" } else { "s" },
    );

    if !verbose {
        return;
    }

    println!(
        "  USB {:x}.{:02x}  bcdDevice {:x}.{:02x}  bMaxPacketSize0 {}",
        desc.usb_version >> 8,
        desc.usb_version & 0xff,
        desc.device_version >> 8,
        desc.device_version & 0xff,
        desc.max_packet_size0
    );
    for config in &device.configurations {
        println!(
            "  Configuration {}: {} interface(s), {} mA{}{}",
            config.configuration_value,
            config.num_interfaces,
            config.max_power_ma(),
            if config.self_powered() { ", self powered" } else { "" },
            if config.remote_wakeup() { ", remote wakeup" } else { "" },
        );
        for interface in &config.interfaces {
            for alt in &interface.altsettings {
                println!(
                    "    Interface {} alt {}: {} ({} endpoint(s))",
                    alt.interface_number,
                    alt.alternate_setting,
                    alt.class_code(),
                    alt.endpoints.len()
                );
                for ep in &alt.endpoints {
                    println!(
                        "      Endpoint {:#04x} {:?} {:?} maxpacket {} interval {}",
                        ep.address,
                        ep.direction(),
                        ep.transfer_type(),
                        ep.max_packet_size,
                        ep.interval
                    );
                }
            }
        }
    }
}

fn print_report(report: &ScanReport) {
    println!();
    println!(
        "Scanned {} bus(es): {} device(s) added, {} failed, {} bus(es) unreadable",
        report.buses_visited, report.devices_added, report.devices_failed, report.buses_failed
    );
}

/// Open every device, show the poll set, and close everything again
fn open_all(ctx: &mut UsbContext) -> Result<()> {
    let ids: Vec<DeviceId> = ctx.devices().map(|(id, _)| id).collect();
    let mut handles = Vec::new();

    for id in ids {
        match ctx.open(id) {
            Ok(handle) => handles.push(handle),
            Err(e) => warn!("Could not open {:?}: {}", id, e),
        }
    }

    println!();
    println!("Poll set ({} descriptor(s)):", handles.len());
    for entry in ctx.poll_fds() {
        println!("  fd {:>4}  {:?}", entry.fd, entry.events());
    }

    for handle in handles {
        ctx.close(handle)
            .with_context(|| format!("Failed to close {:?}", handle))?;
    }
    Ok(())
}
