//! Circuitry — dataflow circuits over pub/sub topics

use circuitry_core::{BindMode, ServiceConfig};
use circuitry_gateway::{client, start_gateway, GatewayOptions};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_URL: &str = "ws://127.0.0.1:18883/ws";

#[derive(Parser)]
#[command(
    name = "circuitry",
    about = "Build and run gadget circuits over pub/sub topics"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the broker, circuit service and WebSocket gateway
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// loopback or lan
        #[arg(short, long)]
        bind: Option<String>,
        /// Topic namespace root
        #[arg(long)]
        prefix: Option<String>,
        #[arg(short, long, default_value = "circuitry.toml")]
        config: PathBuf,
        /// Skip the circuits listed in the config
        #[arg(long)]
        no_bootstrap: bool,
        /// Don't echo print gadget output to stdout
        #[arg(short, long)]
        quiet: bool,
    },
    /// Publish one message through a gateway
    Publish {
        #[arg(short, long, default_value = DEFAULT_URL)]
        url: String,
        topic: String,
        payload: String,
        #[arg(short, long)]
        retain: bool,
    },
    /// Print messages matching the given topic filters
    Subscribe {
        #[arg(short, long, default_value = DEFAULT_URL)]
        url: String,
        #[arg(required = true)]
        filters: Vec<String>,
    },
    /// List the built-in gadget kinds
    Kinds,
    /// Print the default config as TOML
    Config,
    /// Show version
    Version,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "circuitry=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            bind,
            prefix,
            config,
            no_bootstrap,
            quiet,
        } => {
            init_tracing();

            let mut service = ServiceConfig::load(&config);
            if let Some(port) = port {
                service.gateway.port = port;
            }
            if let Some(bind) = bind {
                service.gateway.bind = BindMode::parse(&bind);
            }
            if let Some(prefix) = prefix {
                service.prefix = prefix;
            }

            start_gateway(GatewayOptions {
                config: service,
                bootstrap: !no_bootstrap,
                echo_prints: !quiet,
            })
            .await?;
        }

        Commands::Publish {
            url,
            topic,
            payload,
            retain,
        } => {
            init_tracing();
            client::publish(&url, &topic, &payload, retain).await?;
        }

        Commands::Subscribe { url, filters } => {
            init_tracing();
            client::subscribe(&url, &filters, |topic, payload| {
                println!("{} {}", topic, payload);
            })
            .await?;
        }

        Commands::Kinds => {
            for kind in circuitry_gadgets::create_default_registry().list() {
                println!("{}", kind);
            }
        }

        Commands::Config => {
            print!("{}", ServiceConfig::default().to_toml());
        }

        Commands::Version => {
            println!("circuitry v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
