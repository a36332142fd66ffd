use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use waypoint::proxy::{self, ProxyConfig};

#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(about = "Caching, filtering DNS forwarder", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0:53")]
    bind: String,

    /// Upstream DNS server (host:port)
    #[arg(short, long, default_value = "8.8.8.8:53")]
    upstream: String,

    /// Blocklist file, one domain per line
    #[arg(long, default_value = "block.txt")]
    blocklist: PathBuf,

    /// Upstream reply deadline in milliseconds
    #[arg(long = "timeout-ms", default_value_t = 2000)]
    timeout_ms: u64,

    /// Seconds between stats log lines (0 disables)
    #[arg(long = "stats-interval", default_value_t = 60)]
    stats_interval: u64,

    /// Log every query
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let bind_addr: SocketAddr = args.bind.parse().context("parse bind address")?;
    let upstream: SocketAddr = args.upstream.parse().context("parse upstream address")?;

    let config = ProxyConfig {
        bind_addr,
        upstream,
        blocklist_path: args.blocklist,
        upstream_timeout: Duration::from_millis(args.timeout_ms),
        stats_interval: Duration::from_secs(args.stats_interval),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build runtime")?;

    rt.block_on(proxy::run(config)).context("run forwarder")
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "info" } else { "warn,waypoint::proxy=info,waypoint::filter=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
