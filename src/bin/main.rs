use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

#[derive(Parser, Debug)]
#[command(name = "moviegate-server")]
#[command(about = "Authenticated movie search gateway", long_about = None)]
struct Args {
    /// YAML config file. Settings can also come from BACKEND_URL,
    /// NEXTAUTH_SECRET, PORT and NODE_ENV.
    #[arg(short, long)]
    config: Option<String>,

    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let default_filter = if args.debug {
        "moviegate=debug,tower_http=debug"
    } else {
        "moviegate=info,tower_http=info"
    };

    let fmt_layer = if args.json_logs {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(fmt_layer)
        .init();

    if let Err(e) = moviegate::run(args.config.as_deref(), args.debug).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
