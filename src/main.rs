//! Command-line interface for the etiqueta label printer driver.
//!
//! ## Usage
//!
//! ```bash
//! # Find printers nearby
//! etiqueta scan
//! etiqueta scan --all --timeout 20
//!
//! # Print a text label over TSPL
//! etiqueta print HM-A300 --text "SN-0042" --qr "https://example.com/0042"
//!
//! # CPCL variant with an image
//! etiqueta print AA:BB:CC:DD:EE:FF --dialect cpcl --image logo.png
//!
//! # Inspect the command stream without a printer
//! etiqueta transcript --text "SN-0042" --dialect cpcl
//! ```

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use etiqueta::transport::BridgeError;
use etiqueta::{
    BleTransport, BtleplugBridge, Cpcl, DeviceId, EtiquetaError, PixelBuffer, PrinterProfile, Tspl,
};

/// Etiqueta - Bluetooth label printer utility
#[derive(Parser, Debug)]
#[command(name = "etiqueta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan for nearby label printers
    Scan {
        /// Scan window in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,

        /// Report every BLE device, not just label printers
        #[arg(long)]
        all: bool,
    },

    /// Build a label and print it over BLE
    Print {
        /// Device id or advertised name from `etiqueta scan`
        device: String,

        /// Seconds to wait for the device to appear
        #[arg(long, default_value_t = 15)]
        timeout: u64,

        #[command(flatten)]
        job: JobArgs,
    },

    /// Build a label and dump its command transcript
    Transcript {
        #[command(flatten)]
        job: JobArgs,
    },
}

#[derive(Args, Debug)]
struct JobArgs {
    /// Text line for the label (repeatable)
    #[arg(long = "text", value_name = "TEXT")]
    text: Vec<String>,

    /// QR code payload
    #[arg(long, value_name = "DATA")]
    qr: Option<String>,

    /// PNG or JPEG image to rasterize onto the label
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Command dialect the printer firmware speaks
    #[arg(long, value_enum, default_value_t = DialectArg::Tspl)]
    dialect: DialectArg,

    /// Label width in millimeters
    #[arg(long, default_value_t = 40)]
    width_mm: u32,

    /// Label height in millimeters
    #[arg(long, default_value_t = 30)]
    height_mm: u32,

    /// Heat density level
    #[arg(long, default_value_t = 8)]
    density: u8,

    /// Number of copies
    #[arg(long, default_value_t = 1)]
    copies: u32,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DialectArg {
    Tspl,
    Cpcl,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<(), EtiquetaError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { timeout, all } => scan(timeout, all).await,
        Commands::Print {
            device,
            timeout,
            job,
        } => print(&device, timeout, &job).await,
        Commands::Transcript { job } => {
            let (data, transcript) = build_job(&job)?;
            for line in &transcript {
                println!("{}", line);
            }
            println!();
            println!("{} bytes on the wire", data.len());
            Ok(())
        }
    }
}

async fn scan(timeout: u64, all: bool) -> Result<(), EtiquetaError> {
    let profile = PrinterProfile::default();
    let bridge = BtleplugBridge::new()
        .await
        .map_err(EtiquetaError::AdapterUnavailable)?;
    let mut transport = BleTransport::new(bridge);

    let filter = if all {
        Vec::new()
    } else {
        vec![profile.advertised_service]
    };
    transport.open(&filter).await?;
    println!("Scanning for {} seconds...", timeout);

    let deadline = tokio::time::sleep(Duration::from_secs(timeout));
    tokio::pin!(deadline);
    let mut seen = HashSet::new();

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            found = transport.next_device() => {
                let Some(found) = found else { break };
                if seen.insert(found.id.clone()) {
                    let name = found.name.as_deref().unwrap_or("(unnamed)");
                    let rssi = found
                        .rssi
                        .map(|r| format!("{} dBm", r))
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {}  {:24}  {}", found.id, name, rssi);
                }
            }
        }
    }

    transport.stop_discovery().await?;
    println!("{} device(s) found", seen.len());
    Ok(())
}

async fn print(device: &str, timeout: u64, job: &JobArgs) -> Result<(), EtiquetaError> {
    let (data, _) = build_job(job)?;
    println!("Label job built: {} bytes", data.len());

    let profile = PrinterProfile::default();
    let bridge = BtleplugBridge::new()
        .await
        .map_err(EtiquetaError::AdapterUnavailable)?;
    let mut transport = BleTransport::new(bridge);

    transport.open(&[profile.advertised_service]).await?;
    println!("Scanning for {}...", device);
    let id = find_device(&mut transport, device, Duration::from_secs(timeout)).await?;

    println!("Connecting to {}...", id);
    transport
        .connect(&id, profile.write_service, profile.write_characteristic)
        .await?;

    println!("Writing {} bytes...", data.len());
    transport.write(&data).await?;
    transport.close().await?;

    println!("Printed successfully!");
    Ok(())
}

/// Watches the discovery stream until a device whose id or advertised name
/// matches `wanted` shows up.
async fn find_device(
    transport: &mut BleTransport<BtleplugBridge>,
    wanted: &str,
    timeout: Duration,
) -> Result<DeviceId, EtiquetaError> {
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                return Err(EtiquetaError::DiscoveryFailed(BridgeError::new(format!(
                    "Device {} not seen within {:?}",
                    wanted, timeout
                ))));
            }
            found = transport.next_device() => {
                let Some(found) = found else {
                    return Err(EtiquetaError::DiscoveryFailed(BridgeError::new(
                        "Discovery stream closed".to_string(),
                    )));
                };
                if found.id.as_str() == wanted || found.name.as_deref() == Some(wanted) {
                    return Ok(found.id);
                }
            }
        }
    }
}

/// Builds the label command stream for either dialect, returning the raw
/// bytes plus the human-readable transcript.
fn build_job(job: &JobArgs) -> Result<(Vec<u8>, Vec<String>), EtiquetaError> {
    match job.dialect {
        DialectArg::Tspl => build_tspl(job),
        DialectArg::Cpcl => build_cpcl(job),
    }
}

fn build_tspl(job: &JobArgs) -> Result<(Vec<u8>, Vec<String>), EtiquetaError> {
    let mut label = Tspl::new();
    label
        .size(job.width_mm, job.height_mm)
        .gap(2)
        .density(job.density)
        .cls();

    let mut y = 16;
    for line in &job.text {
        label.text(16, y, "TSS24.BF2", 1, 1, line)?;
        y += 32;
    }
    if let Some(data) = &job.qr {
        label.qrcode(16, y, "M", 4, "A", data)?;
        y += 120;
    }
    if let Some(path) = &job.image {
        let img = load_rgba(path)?;
        let pixels = PixelBuffer::from(&img);
        label.bitmap(0, y, 0, &pixels);
    }
    if job.copies > 1 {
        label.print_copies(job.copies, 1);
    } else {
        label.print();
    }

    Ok((label.data().to_vec(), label.transcript().to_vec()))
}

fn build_cpcl(job: &JobArgs) -> Result<(Vec<u8>, Vec<String>), EtiquetaError> {
    let profile = PrinterProfile::default();
    let height = profile.mm_to_dots(job.height_mm as f32);

    let mut label = Cpcl::new();
    label.init(0, 200, 200, height, job.copies);
    label.page_width(profile.mm_to_dots(job.width_mm as f32));

    let mut y = 8;
    for line in &job.text {
        label.text("4", 0, 8, y, line)?;
        y += 32;
    }
    if let Some(data) = &job.qr {
        label.qrcode(8, y, 2, 6, "M", data)?;
        y += 120;
    }
    if let Some(path) = &job.image {
        let img = load_rgba(path)?;
        let pixels = PixelBuffer::from(&img);
        label.bitmap(0, y, &pixels);
    }
    label.print();

    Ok((label.data().to_vec(), label.transcript().to_vec()))
}

fn load_rgba(path: &PathBuf) -> Result<image::RgbaImage, EtiquetaError> {
    let img = image::open(path).map_err(|e| EtiquetaError::Image(e.to_string()))?;
    Ok(img.to_rgba8())
}
