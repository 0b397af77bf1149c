//! Process entry point: parses CLI flags, builds the `AppContext`, and spawns
//! the receiver, worker pool, sweeper, and control plane threads.

use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use shieldns::context::AppContext;
use shieldns::control::http::ControlServer;
use shieldns::receiver::Receiver;
use shieldns::sweeper::Sweeper;
use shieldns::worker::WorkerPool;

#[derive(Parser)]
#[command(name = "shieldns")]
#[command(about = "Caching, ad-blocking recursive DNS forwarder", long_about = None)]
struct Cli {
    /// UDP port to listen for DNS queries on
    #[arg(long, env = "SHIELDNS_DNS_PORT", default_value_t = 53)]
    dns_port: u16,

    /// TCP port for the administrative HTTP API
    #[arg(long, env = "SHIELDNS_API_PORT", default_value_t = 5380)]
    api_port: u16,

    /// Directory holding metadata/ and listdata/
    #[arg(long, env = "SHIELDNS_DATA_DIR", default_value = "/opt/shieldns/adlists")]
    data_dir: String,

    /// Override the configured worker thread count
    #[arg(long, env = "SHIELDNS_THREADS")]
    threads: Option<usize>,

    /// Override the configured upstream resolver
    #[arg(long, env = "SHIELDNS_UPSTREAM")]
    upstream: Option<String>,
}

fn main() {
    simple_logger::init().expect("failed to initialize logger");

    let cli = Cli::parse();

    let context = match AppContext::new(&cli.data_dir, cli.dns_port, cli.api_port) {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("failed to initialize application state: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(threads) = cli.threads {
        context.threads.store(threads, Ordering::Release);
    }
    if let Some(upstream) = cli.upstream.as_deref() {
        match shieldns::context::parse_ipv4(upstream) {
            Some(addr) => *context.upstream.lock() = addr,
            None => log::warn!("--upstream {} is not a valid ipv4 address, ignoring", upstream),
        }
    }

    run(context);
}

fn run(context: Arc<AppContext>) {
    let socket = match UdpSocket::bind(("0.0.0.0", context.dns_port)) {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to bind udp port {}: {}", context.dns_port, e);
            std::process::exit(1);
        }
    };

    let thread_count = context.threads.load(Ordering::Acquire);
    let worker_socket = match socket.try_clone() {
        Ok(s) => s,
        Err(e) => {
            log::error!("failed to clone listening socket: {}", e);
            std::process::exit(1);
        }
    };

    let workers = WorkerPool::new(context.clone());
    if let Err(e) = workers.spawn(thread_count, &worker_socket) {
        log::error!("failed to start worker pool: {}", e);
        std::process::exit(1);
    }

    let receiver = Receiver::new(context.clone(), socket);
    let receiver_handle = match receiver.spawn() {
        Ok(h) => h,
        Err(e) => {
            log::error!("failed to start receiver thread: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = Sweeper::new(context.clone()).spawn() {
        log::error!("failed to start sweeper thread: {}", e);
        std::process::exit(1);
    }

    log::info!(
        "shieldns listening: dns=:{} api=:{} threads={}",
        context.dns_port,
        context.api_port,
        thread_count
    );

    ControlServer::new(context).run();
    let _ = receiver_handle.join();
}
