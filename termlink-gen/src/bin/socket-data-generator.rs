//! socket-data-generator - writes a payload over TCP at a fixed rate, acting
//! as server or client.

use clap::{Parser, ValueEnum};
use colored::Colorize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use termlink_client::{ClientEvent, ClientListener, SocketClient};
use termlink_frame::DataMode;
use termlink_gen::{GenError, PayloadSpec, StopSignal};
use termlink_server::{ClientId, ServerError, ServerEvent, ServerListener, SocketServer};
use tracing_subscriber::EnvFilter;

const MAX_SERVER_CLIENTS: u8 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Role {
    Server,
    Client,
}

#[derive(Parser)]
#[command(name = "socket-data-generator")]
#[command(about = "Generates adjustable traffic on a TCP socket, acting as server or client")]
#[command(version)]
struct Cli {
    /// Socket role; a server waits for its first client before sending
    #[arg(long, value_enum, default_value = "client")]
    mode: Role,

    /// Parallel connections accepted in server mode [1-10]
    #[arg(long = "max_server_clients", default_value_t = 1)]
    max_server_clients: u8,

    /// IPv4 address of the server, client mode only
    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    #[arg(long, default_value_t = 1234)]
    port: u16,

    /// Send period in milliseconds [1-10000]
    #[arg(long = "payload_rate", default_value_t = 100)]
    payload_rate: u32,

    /// Payload size in bytes [1-4096], ignored when --payload is given
    #[arg(long = "payload_size", default_value_t = 100)]
    payload_size: usize,

    /// Payload text, defaults to '0' repeated payload_size times
    #[arg(long)]
    payload: Option<String>,

    /// Exit when the last client disconnects, server mode only [0-1]
    #[arg(
        long = "exit_on_last_client",
        default_value = "0",
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    exit_on_last_client: bool,

    /// NEW_LINE_DELIMITER or PAYLOAD_HEADER
    #[arg(long = "data_mode", default_value = "NEW_LINE_DELIMITER")]
    data_mode: DataMode,
}

struct ServerWatch {
    connected: AtomicUsize,
    first_client: StopSignal,
    stop: Arc<StopSignal>,
    exit_on_last_client: bool,
}

impl ServerListener for ServerWatch {
    fn on_server_event(&self, client: ClientId, event: ServerEvent, data: &[u8]) {
        match event {
            ServerEvent::ClientConnected => {
                let count = self.connected.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::info!("[{}] connected, {} clients", client, count);
                self.first_client.trigger();
            }
            ServerEvent::ClientDataRecv => {
                tracing::debug!("[{}] received {} bytes", client, data.len());
            }
            ServerEvent::ClientDisconnected => {
                let count = self
                    .connected
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(n.saturating_sub(1)))
                    .unwrap_or_else(|n| n)
                    .saturating_sub(1);
                tracing::info!("[{}] disconnected, {} clients", client, count);
                if count == 0 && self.exit_on_last_client {
                    self.stop.trigger();
                }
            }
        }
    }
}

struct ClientWatch {
    stop: Arc<StopSignal>,
}

impl ClientListener for ClientWatch {
    fn on_client_event(&self, event: ClientEvent, data: &[u8]) {
        match event {
            ClientEvent::ServerDataRecv => tracing::debug!("received {} bytes", data.len()),
            ClientEvent::ServerDisconnected => {
                tracing::info!("server closed the connection");
                self.stop.trigger();
            }
        }
    }
}

fn run_server(cli: &Cli, spec: &PayloadSpec, payload: &[u8]) -> Result<(), GenError> {
    if !(1..=MAX_SERVER_CLIENTS).contains(&cli.max_server_clients) {
        return Err(GenError::ClientsOutOfRange {
            count: cli.max_server_clients,
            max: MAX_SERVER_CLIENTS,
        });
    }

    let stop = Arc::new(StopSignal::new());
    let watch = Arc::new(ServerWatch {
        connected: AtomicUsize::new(0),
        first_client: StopSignal::new(),
        stop: stop.clone(),
        exit_on_last_client: cli.exit_on_last_client,
    });
    let server = SocketServer::new(cli.data_mode);
    server.add_listener(&watch);
    server.start(cli.port, cli.max_server_clients)?;

    println!("{} on port {}", "Waiting for the first client".yellow(), cli.port);
    while !watch.first_client.wait(spec.period()) {}

    while !stop.wait(spec.period()) {
        match server.write(payload) {
            Ok(_) => {}
            Err(ServerError::NoClientAccepted) => {
                tracing::debug!("no client to send to");
            }
            Err(e) => return Err(e.into()),
        }
    }

    server.stop();
    Ok(())
}

fn run_client(cli: &Cli, spec: &PayloadSpec, payload: &[u8]) -> Result<(), GenError> {
    let stop = Arc::new(StopSignal::new());
    let watch = Arc::new(ClientWatch { stop: stop.clone() });
    let client = SocketClient::new(cli.data_mode);
    client.add_listener(&watch);
    client.connect(&cli.address, cli.port)?;

    while !stop.wait(spec.period()) {
        if let Err(e) = client.write(payload) {
            if stop.is_triggered() {
                break;
            }
            return Err(e.into());
        }
    }

    client.disconnect();
    Ok(())
}

fn run(cli: Cli) -> Result<(), GenError> {
    let mut spec = PayloadSpec::default()
        .with_rate(cli.payload_rate)
        .with_size(cli.payload_size);
    if let Some(text) = cli.payload.clone() {
        spec = spec.with_text(text);
    }
    let payload = spec.build(cli.data_mode)?;

    println!("{}", "Starting socket data generator".bold());
    println!("  {} {:?}", "Role:".cyan(), cli.mode);
    match cli.mode {
        Role::Server => println!(
            "  {} {} (max {} clients)",
            "Port:".cyan(),
            cli.port,
            cli.max_server_clients
        ),
        Role::Client => println!("  {} {}:{}", "Server:".cyan(), cli.address, cli.port),
    }
    println!("  {} {}", "Data mode:".cyan(), cli.data_mode);
    println!("  {} {}ms", "Payload rate:".cyan(), spec.rate_ms);
    println!("  {} {} bytes", "Payload size:".cyan(), payload.len());

    match cli.mode {
        Role::Server => run_server(&cli, &spec, &payload),
        Role::Client => run_client(&cli, &spec, &payload),
    }
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
