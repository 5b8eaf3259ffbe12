//! # Tillprint CLI
//!
//! Command-line interface for receipt and label printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print a markup receipt on the default Epson TM-T20
//! tillprint print receipt.xml
//!
//! # Print a structured receipt or a label
//! tillprint receipt order.json
//! tillprint --printer gk420d label shelf.json
//!
//! # Any ESC/POS device by USB id
//! tillprint --printer escpos:1fc9:2016 selftest
//!
//! # Compile without a printer
//! tillprint render receipt.xml --out receipt.bin
//!
//! # What is plugged in, and how is it doing
//! tillprint devices
//! tillprint status --json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tillprint::{
    JobRequest, MarkupCompiler, PrinterConfig, PrinterService, TillprintError,
    label::LabelData,
    receipt::ReceiptData,
    service::{DeviceStatus, ServiceConfig},
    transport::{UsbTransport, usb},
};

const PRINTER_KEY: &str = "default";

/// Tillprint - receipt and label printer utility
#[derive(Parser, Debug)]
#[command(name = "tillprint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Printer profile: a built-in key (tm-t20, tm-t88v, tsp100, gk420d)
    /// or PROTOCOL:VVVV:PPPP
    #[arg(long, global = true, env = "TILLPRINT_PRINTER", default_value = "tm-t20")]
    printer: String,

    /// Log filter, e.g. `info` or `tillprint=debug`; RUST_LOG wins when set
    #[arg(long, global = true, env = "TILLPRINT_LOG", default_value = "warn")]
    log_level: String,

    /// Delay between driver iterations in milliseconds
    #[arg(long, global = true, env = "TILLPRINT_POLL_MS", default_value_t = 250)]
    poll_ms: u64,

    /// Seconds to wait for the printer before giving up
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,

    /// Homepage address printed on the self-test page (repeatable)
    #[arg(
        long = "address",
        global = true,
        env = "TILLPRINT_ADDRESSES",
        value_delimiter = ','
    )]
    addresses: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a markup receipt
    Print {
        /// Markup file
        file: PathBuf,
    },

    /// Print a structured receipt from JSON
    Receipt {
        /// Receipt JSON file
        file: PathBuf,
    },

    /// Print a label from JSON (ZPL printers)
    Label {
        /// Label JSON file
        file: PathBuf,
    },

    /// Open the cash drawer
    Cashdraw,

    /// Print the self-test page
    Selftest,

    /// Compile markup to printer bytes without printing
    Render {
        /// Markup file
        file: PathBuf,

        /// Output file for the ESC/POS bytes
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// List USB printers
    Devices,

    /// Probe the printer and show its status
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), TillprintError> {
    let timeout = Duration::from_secs(cli.timeout);

    let request = match &cli.command {
        Commands::Print { file } => JobRequest::MarkupReceipt(read(file)?),
        Commands::Receipt { file } => {
            JobRequest::Receipt(serde_json::from_str::<ReceiptData>(&read(file)?)?)
        }
        Commands::Label { file } => {
            JobRequest::Label(serde_json::from_str::<LabelData>(&read(file)?)?)
        }
        Commands::Cashdraw => JobRequest::CashDrawerOpen,
        Commands::Selftest => JobRequest::StatusPrint,
        Commands::Render { file, out } => return render(file, out),
        Commands::Devices => {
            list_devices();
            return Ok(());
        }
        Commands::Status { json } => {
            let service = service(&cli)?;
            let status = service.printer(PRINTER_KEY)?.refresh_status(timeout);
            show_status(&status, *json)?;
            service.shutdown();
            return Ok(());
        }
    };

    let service = service(&cli)?;
    let id = service.submit(PRINTER_KEY, request)?;
    info!(%id, "job submitted");

    let idle = service.wait_idle(timeout);
    show_status(&service.status(PRINTER_KEY)?, false)?;
    service.shutdown();
    if !idle {
        return Err(TillprintError::Timeout(timeout));
    }
    Ok(())
}

fn service(cli: &Cli) -> Result<PrinterService, TillprintError> {
    let config = PrinterConfig::parse(&cli.printer).map_err(TillprintError::Config)?;
    debug!(?config, "printer profile");

    let mut service = PrinterService::new(ServiceConfig {
        poll_interval: Duration::from_millis(cli.poll_ms),
        addresses: cli.addresses.clone(),
    });
    service.add_printer(PRINTER_KEY, config, Arc::new(UsbTransport::new()))?;
    Ok(service)
}

fn read(path: &Path) -> Result<String, TillprintError> {
    fs::read_to_string(path).map_err(|e| {
        TillprintError::Config(format!("Cannot read {}: {}", path.display(), e))
    })
}

/// Compile markup to a file. A failed compile still writes the error stub,
/// which is what the printer would have received.
fn render(file: &Path, out: &Path) -> Result<(), TillprintError> {
    let markup = read(file)?;
    let (bytes, result) = match MarkupCompiler::default().compile_str(&markup) {
        Ok(bytes) => (bytes, Ok(())),
        Err(failure) => (failure.stub, Err(TillprintError::Compile(failure.error))),
    };
    fs::write(out, &bytes)?;
    println!("Wrote {} bytes to {}", bytes.len(), out.display());
    result
}

fn list_devices() {
    let devices = usb::discover();
    if devices.is_empty() {
        println!("No USB printers found.");
        return;
    }
    for device in devices {
        let class = if device.printer_class {
            "printer class"
        } else {
            "vendor class"
        };
        println!("{}  {}  [{}]", device.location(), device.describe(), class);
    }
}

fn show_status(status: &DeviceStatus, json: bool) -> Result<(), TillprintError> {
    if json {
        println!("{}", serde_json::to_string_pretty(status)?);
        return Ok(());
    }
    println!("Printer: {}", status.state);
    for message in &status.messages {
        println!("  {}", message);
    }
    Ok(())
}
