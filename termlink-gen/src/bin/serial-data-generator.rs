//! serial-data-generator - writes a payload to a serial port at a fixed rate.

use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use termlink_gen::{GenError, PayloadSpec, StopSignal};
use termlink_serial::{
    BaudRate, DataBits, ParityType, SerialDriver, SerialEvent, SerialListener, SerialSettings,
    StopBits,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "serial-data-generator")]
#[command(about = "Generates adjustable traffic on a serial port")]
#[command(version)]
struct Cli {
    /// Serial device to use
    #[arg(long, default_value = "/dev/ttyUSB0")]
    device: String,

    /// Baud rate (BR_1200 .. BR_115200)
    #[arg(long, default_value = "BR_115200")]
    baud: BaudRate,

    /// Parity (NONE, EVEN, ODD)
    #[arg(long, default_value = "NONE")]
    parity: ParityType,

    /// Stop bits (ONE, TWO)
    #[arg(long, default_value = "ONE")]
    stop: StopBits,

    /// Data bits (FIVE .. EIGHT)
    #[arg(long, default_value = "EIGHT")]
    data: DataBits,

    /// Send period in milliseconds [1-10000]
    #[arg(long = "payload_rate", default_value_t = 100)]
    payload_rate: u32,

    /// Payload size in bytes [1-4096], ignored when --payload is given
    #[arg(long = "payload_size", default_value_t = 100)]
    payload_size: usize,

    /// Payload text, defaults to '0' repeated payload_size times
    #[arg(long)]
    payload: Option<String>,
}

struct ErrorWatch {
    stop: Arc<StopSignal>,
}

impl SerialListener for ErrorWatch {
    fn on_serial_event(&self, event: SerialEvent, _data: &[u8]) {
        if event == SerialEvent::CommunicationError {
            tracing::error!("serial port reported a communication error");
            self.stop.trigger();
        }
    }
}

fn run(cli: Cli) -> Result<(), GenError> {
    let settings = SerialSettings::new(cli.device)
        .with_baud_rate(cli.baud)
        .with_parity(cli.parity)
        .with_stop_bits(cli.stop)
        .with_data_bits(cli.data);
    let mut spec = PayloadSpec::default()
        .with_rate(cli.payload_rate)
        .with_size(cli.payload_size);
    if let Some(text) = cli.payload {
        spec = spec.with_text(text);
    }
    let payload = spec.build_unbounded()?;

    println!("{}", "Starting serial data generator".bold());
    println!("  {} {}", "Port:".cyan(), settings);
    println!("  {} {}ms", "Payload rate:".cyan(), spec.rate_ms);
    println!("  {} {} bytes", "Payload size:".cyan(), payload.len());

    let stop = Arc::new(StopSignal::new());
    let watch = Arc::new(ErrorWatch { stop: stop.clone() });
    let driver = SerialDriver::new();
    driver.add_listener(&watch);
    driver.open(&settings)?;

    let mut sent: u64 = 0;
    while !stop.wait(spec.period()) {
        driver.write(&payload)?;
        sent += 1;
        tracing::debug!("sent payload #{}", sent);
    }

    driver.close();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
}
