use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use hidpnp_lib::backend::HidApiTransport;
use hidpnp_lib::{ConnectionStatus, DeviceSelector, HidSession, SessionEvent};
use std::io::{self, BufRead, Write};
use std::thread;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Console demo for the Microchip generic HID firmware: polls the ADC and
/// pushbutton state and toggles the board LEDs.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Vendor ID of the device to connect to (hex, e.g. 0x04D8).
    #[arg(long, value_parser = parse_hex_u16, default_value = "0x04D8")]
    vid: u16,
    /// Product ID of the device to connect to (hex, e.g. 0x0054).
    #[arg(long, value_parser = parse_hex_u16, default_value = "0x0054")]
    pid: u16,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

fn parse_hex_u16(input: &str) -> Result<u16, String> {
    let trimmed = input.trim().to_ascii_lowercase();
    let digits = trimmed.strip_prefix("0x").unwrap_or(&trimmed);
    u16::from_str_radix(digits, 16).map_err(|err| format!("invalid hex value {input:?}: {err}"))
}

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time();
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);

    println!("Welcome to the HID demo console");
    let transport = HidApiTransport::new()?;
    let session = HidSession::start(Box::new(transport), DeviceSelector::new(cli.vid, cli.pid));
    info!(selector = %session.selector(), "session started");

    // Print session events as they arrive, independently of the prompt.
    let events = session.subscribe();
    thread::spawn(move || {
        for event in events {
            match event {
                SessionEvent::DeviceAdded(dev) => println!("Device added: {dev}"),
                SessionEvent::DeviceRemoved(dev) => println!("Device removed: {dev}"),
                SessionEvent::ConnectionStatusChanged(status) => {
                    println!("Connection status changed to: {status}")
                }
            }
        }
    });

    println!("  Device: {}", session.selector());
    println!("  Connection status: {}", session.connection_status());
    println!("Available commands (case-insensitive):");
    println!("  v, vid <hex>: change vendor ID");
    println!("  p, pid <hex>: change product ID");
    println!("  d, devices: list available devices");
    println!("  s, status: print status information");
    println!("  r, read: read ADC value and pushbutton state");
    println!("  t, toggle: toggle LED");
    println!("  q, quit: exit the application");

    let stdin = io::stdin();
    loop {
        print!(">> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim().to_ascii_lowercase();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let argument = parts.next();
        match command {
            "q" | "quit" => break,
            "v" | "vid" => change_id(&session, argument, true),
            "p" | "pid" => change_id(&session, argument, false),
            "d" | "devices" => {
                let devices = session.device_list();
                println!("{} devices available:", devices.len());
                for dev in devices {
                    println!("  {dev}");
                }
            }
            "s" | "status" => print_status(&session),
            "r" | "read" => print_reading(&session),
            "t" | "toggle" => request_toggle(&session),
            _ => println!("Invalid command"),
        }
    }

    Ok(())
}

fn change_id(session: &HidSession, argument: Option<&str>, is_vid: bool) {
    let Some(argument) = argument else {
        println!("Missing hex argument");
        return;
    };
    let value = match parse_hex_u16(argument) {
        Ok(value) => value,
        Err(err) => {
            println!("{err}");
            return;
        }
    };
    let current = session.selector();
    let selector = if is_vid {
        DeviceSelector::new(value, current.product_id)
    } else {
        DeviceSelector::new(current.vendor_id, value)
    };
    if selector == current {
        println!("New value matches the current one");
    } else {
        println!("New device: {selector}");
        debug!(%selector, "selector changed");
        session.set_selector(selector.vendor_id, selector.product_id);
    }
}

fn print_status(session: &HidSession) {
    println!("Connection status: {}", session.connection_status());
    if session.connection_status() == ConnectionStatus::Connected {
        let counters = session.transfer_counters();
        let uptime = session.uptime();
        println!(
            "  Uptime: {:.1} s, TX: {} ({} failed), RX: {} ({} failed)",
            uptime.as_secs_f64(),
            counters.tx,
            counters.tx_failed,
            counters.rx,
            counters.rx_failed
        );
    }
}

fn print_reading(session: &HidSession) {
    if session.connection_status() != ConnectionStatus::Connected {
        println!("Command not valid when not connected");
        return;
    }
    let pressed = if session.is_pushbutton_pressed() {
        "pressed"
    } else {
        "not pressed"
    };
    println!(
        "ADC value: {}, pushbutton {}",
        session.current_adc_value(),
        pressed
    );
}

fn request_toggle(session: &HidSession) {
    if session.connection_status() != ConnectionStatus::Connected {
        println!("Command not valid when not connected");
        return;
    }
    if session.request_led_toggle() {
        println!("LED toggle requested");
    } else {
        println!("Operation already in progress");
    }
}
