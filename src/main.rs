//! # Yoke Bridge
//!
//! Use your phone as a wireless gamepad.
//!
//! Opens a virtual controller, listens for the phone client's UDP telemetry,
//! serves the client web assets and advertises itself on the local network.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration and apply command line overrides
//!    - Set up logging (console, optional daily log file)
//!    - Open the virtual controller (a name clash aborts here)
//!    - Bind the UDP endpoint on the default-route address
//!
//! 2. **Session Loop**
//!    - Serve client assets on the same port number over TCP
//!    - Advertise the endpoint via mDNS
//!    - Poll for telemetry until Ctrl+C
//!
//! 3. **Graceful Shutdown**
//!    - Close the controller, then the socket, then withdraw the advertisement
//!
//! # Examples
//!
//! ```bash
//! yoke-bridge --name Wheel --port 5005
//! ```
//!
//! Expected output:
//! ```text
//! INFO yoke_bridge: Yoke Bridge v0.1.0 starting...
//! INFO yoke_bridge::discovery: Registered desk-Wheel-1._yoke._udp.local.
//! INFO yoke_bridge::session: To connect select "desk-Wheel-1" on your device,
//! INFO yoke_bridge::session: or connect manually to "192.168.1.10:5005"
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use yoke_bridge::assets;
use yoke_bridge::config::{Config, LoggingConfig};
use yoke_bridge::controller::layout::LayoutMapper;
use yoke_bridge::discovery::{
    local_hostname, network_name, DisabledRegistrar, MdnsRegistrar, Registrar,
};
use yoke_bridge::output::{open_output_device, BackendKind};
use yoke_bridge::session::socket::{resolve_default_route_ip, UdpEndpoint};
use yoke_bridge::session::SessionManager;

/// Phone-as-gamepad bridge: UDP telemetry to a virtual controller.
#[derive(Parser, Debug)]
#[command(name = "yoke-bridge", version, about)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Device name shown by the OS and in discovery
    #[arg(long, short)]
    name: Option<String>,

    /// Device id, distinguishes several bridges on one host
    #[arg(long)]
    id: Option<u32>,

    /// UDP port (0 = any free port)
    #[arg(long, short)]
    port: Option<u16>,

    /// Directory with the phone client web assets
    #[arg(long)]
    client: Option<PathBuf>,

    /// Output backend: uinput, vigem or dry-run
    #[arg(long)]
    backend: Option<BackendKind>,

    /// Do not advertise via mDNS
    #[arg(long)]
    no_discovery: bool,

    /// Do not serve the client assets
    #[arg(long)]
    no_assets: bool,
}

impl Cli {
    /// Fold command line overrides into `config`
    fn apply(&self, config: &mut Config) {
        if let Some(name) = &self.name {
            config.device.name = name.clone();
        }
        if let Some(id) = self.id {
            config.device.id = id;
        }
        if let Some(port) = self.port {
            config.session.port = port;
        }
        if let Some(client) = &self.client {
            config.assets.root = client.clone();
        }
        if let Some(backend) = self.backend {
            config.device.backend = backend;
        }
        if self.no_discovery {
            config.discovery.enabled = false;
        }
        if self.no_assets {
            config.assets.enabled = false;
        }
    }
}

/// Install the tracing subscriber
///
/// The returned guard flushes the log file on drop and must live until exit.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if logging.directory.is_empty() {
        (None, None)
    } else {
        let appender = tracing_appender::rolling::daily(&logging.directory, &logging.file_prefix);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Address to bind when none is configured
fn default_bind_ip() -> IpAddr {
    match resolve_default_route_ip() {
        Ok(ip) => ip,
        Err(e) => {
            warn!("No default route ({}), listening on all interfaces", e);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        }
    }
}

/// Completes on Ctrl+C, or SIGTERM on Unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let _log_guard = init_logging(&config.logging);

    info!("Yoke Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    // Device first: a taken name must fail before anything is advertised
    let device = open_output_device(config.device.backend, &config.device_spec())?;
    info!(
        "Opened {:?} device \"{}\"",
        config.device.backend, config.device.name
    );

    let ip = config.session.bind_address.unwrap_or_else(default_bind_ip);
    let endpoint = UdpEndpoint::bind(
        SocketAddr::new(ip, config.session.port),
        config.session.recv_buffer_bytes,
        config.session.max_datagram_bytes,
    )
    .with_context(|| format!("Failed to bind UDP {}:{}", ip, config.session.port))?;

    let mapper = LayoutMapper::new(config.mapping.bindings.clone());
    let mut manager = SessionManager::new(
        Box::new(endpoint),
        device,
        Box::new(mapper),
        config.session_settings(),
    )?;
    let local = manager.endpoint();

    let asset_task = if config.assets.enabled {
        let root = config.assets.root.clone();
        Some(tokio::spawn(async move {
            let result = match assets::bind(local).await {
                Ok(listener) => assets::serve(listener, root).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!("Client asset server stopped: {}", e);
            }
        }))
    } else {
        None
    };

    let registrar: Box<dyn Registrar> = if config.discovery.enabled {
        match MdnsRegistrar::new(&config.discovery.service_type) {
            Ok(registrar) => Box::new(registrar),
            Err(e) => {
                warn!("{}", e);
                Box::new(DisabledRegistrar)
            }
        }
    } else {
        Box::new(DisabledRegistrar)
    };
    let name = network_name(&local_hostname(), &config.device.name, config.device.id);
    manager.advertise(registrar, &name, config.discovery.ttl_s);

    info!("Press Ctrl+C to exit");

    manager.run(shutdown_signal()).await;

    if let Some(task) = asset_task {
        task.abort();
    }

    let stats = manager.stats();
    info!(
        "Total frames delivered: {} ({} connections)",
        stats.delivered, stats.connections
    );

    Ok(())
}
