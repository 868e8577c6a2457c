//! ircprobe - connect to an IRC server, send a few lines, and wait for
//! expected replies. Exits non-zero on the first failed wait.

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use ircprobe::{HarnessConfig, TestClient};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// IRC smoke-test probe
#[derive(Parser, Debug)]
#[command(name = "ircprobe", version, about = "Probe an IRC server and wait for replies")]
struct Args {
    /// Config file (defaults + file + IRCPROBE_* env)
    #[arg(short, long, default_value = ircprobe::config::CONFIG_FILE)]
    config: String,

    /// Server host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Use TLS
    #[arg(long)]
    tls: bool,

    /// Nickname to register with
    #[arg(short, long, default_value = "ircprobe")]
    nick: String,

    /// Channels to join after registration (repeatable)
    #[arg(short, long = "join")]
    joins: Vec<String>,

    /// Raw lines to send after joining (repeatable)
    #[arg(short, long = "send")]
    sends: Vec<String>,

    /// Patterns to wait for, in order (repeatable)
    #[arg(short, long = "expect")]
    expects: Vec<String>,

    /// Per-wait timeout in milliseconds (defaults to config)
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Print matched lines as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ircprobe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut harness = HarnessConfig::load_from(&args.config)?;
    if let Some(host) = args.host {
        harness.host = host;
    }
    if let Some(port) = args.port {
        harness.port = port;
    }
    harness.tls |= args.tls;

    let timeout = args
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| harness.wait_timeout());

    let client = TestClient::connect(harness.client(&args.nick)).await?;
    info!(nick = %client.nick(), "registered with {}:{}", harness.host, harness.port);

    for channel in &args.joins {
        client.join(channel);
        client
            .wait_for_raw_timeout(format!("(?i)JOIN.*{}", regex::escape(channel)), timeout)
            .await?;
    }

    for line in &args.sends {
        client.raw(line.as_str());
    }

    let mut outcome = Ok(());
    for pattern in &args.expects {
        match client.wait_for_raw_timeout(pattern.as_str(), timeout).await {
            Ok(line) => {
                if args.json {
                    let record = serde_json::json!({ "pattern": pattern, "line": line });
                    println!("{}", record);
                } else {
                    println!("{}", line);
                }
            }
            Err(e) => {
                outcome = Err(e.into());
                break;
            }
        }
    }

    client.disconnect("ircprobe done").await;
    outcome
}
