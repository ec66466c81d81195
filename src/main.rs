use clap::Parser;
use tracing::{debug, info, warn};

use cloudrec::config::Config;

#[derive(Parser)]
#[command(version)]
struct Args {
    /// Set config file path
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let cfg = Config::parse(args.config);

    cloudrec::log::set(format!(
        "cloudrec={},tower_http={}",
        cfg.log.level, cfg.log.level
    ));
    warn!("set log level : {}", cfg.log.level);
    debug!("config : {:?}", cfg);

    cloudrec::metrics_register();

    let listener = tokio::net::TcpListener::bind(cfg.http.listen).await.unwrap();
    info!("Server listening on {}", listener.local_addr().unwrap());

    cloudrec::server_up(cfg, listener, shutdown_signal()).await;
    info!("Server shutdown");
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).unwrap();
    let mut interrupt = signal(SignalKind::interrupt()).unwrap();

    tokio::select! {
        _ = terminate.recv() => debug!("received SIGTERM"),
        _ = interrupt.recv() => debug!("received SIGINT"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.unwrap();
    debug!("received Ctrl-C");
}
