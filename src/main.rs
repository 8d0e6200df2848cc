//! xtouch-ardour - control Ardour from a Behringer X-Touch Mini

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::rc::Rc;
use tokio::net::UdpSocket;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use xtouch_ardour::config::AppConfig;
use xtouch_ardour::console::Console;
use xtouch_ardour::osc::{OscEndpoint, UdpOscOut};
use xtouch_ardour::ports::HardwarePort;
use xtouch_ardour::surface::Surface;
use xtouch_ardour::{osc, ports, queue};

/// Control Ardour from a Behringer X-Touch Mini
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    if args.list_ports {
        ports::print_ports()?;
        return Ok(());
    }

    info!("Starting xtouch-ardour...");
    let config = AppConfig::load(&args.config).await?;

    // Everything above the transports lives on one cooperative loop.
    tokio::task::LocalSet::new().run_until(run(config)).await
}

async fn run(config: AppConfig) -> Result<()> {
    // MIDI side: input callback feeds the queue, output goes to the device.
    let (sender, midi_queue) = queue::channel();
    // `midir`'s ALSA-backed handles are not `Send + Sync`, so `PortError`
    // cannot auto-convert into `anyhow::Error`; bridge via its `Display`.
    let _input = ports::open_input(&config.midi.input_port, sender)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let output = ports::open_output(&config.midi.output_port)
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let surface = Surface::new(Box::new(HardwarePort::new(output)));

    // OSC side: one UDP socket for both directions.
    let socket = Rc::new(
        UdpSocket::bind(&config.osc.bind_addr)
            .await
            .with_context(|| format!("failed to bind OSC socket on {}", config.osc.bind_addr))?,
    );
    let remote: SocketAddr = config
        .osc
        .remote_addr
        .parse()
        .with_context(|| format!("invalid OSC remote address {}", config.osc.remote_addr))?;
    let endpoint = OscEndpoint::new(Box::new(UdpOscOut::new(socket.clone(), remote)));

    let _console = Console::build(&surface, &endpoint, &config);
    info!(
        "Bridging {} strips to Ardour at {} (feedback on {})",
        config.strips, remote, config.osc.bind_addr
    );

    tokio::task::spawn_local(osc::run(endpoint, socket));
    tokio::task::spawn_local({
        let surface = surface.clone();
        async move { surface.run(midi_queue).await }
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install CTRL+C signal handler")?;
    info!("Shutdown signal received");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
