use std::net::SocketAddr;
use std::path::PathBuf;

use forge_core::SystemClock;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("forge.toml"));
    let data_dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".forge"));
    let default_addr: SocketAddr = ([127, 0, 0, 1], 8787).into();
    let addr: SocketAddr = match args.next() {
        Some(raw) => match raw.parse() {
            Ok(addr) => addr,
            Err(_) => {
                eprintln!("invalid bind address '{raw}', falling back to {default_addr}");
                default_addr
            }
        },
        None => default_addr,
    };

    if let Err(err) = forge_daemon::serve(&config_path, &data_dir, addr, SystemClock).await {
        eprintln!("forge-daemon: {err}");
        std::process::exit(1);
    }
}
