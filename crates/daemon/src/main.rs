// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! rccd - The remote client control server.
//!
//! Hosts one concrete client and exposes the client contract over TCP on
//! localhost. The first line written to stdout is the listening port; all
//! logging goes to stderr.
//!
//! Usage:
//!   rccd [--bind <addr>] [--inactivity-secs <n>] [--memory-send-delay-ms <n>]

use std::io::Write;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;

use rcc_core::{BindingsRegistry, MemoryBindings};
use rcc_ipc::{framing, Request, Response};

mod env;
mod server;
mod waiters;
mod watchdog;

use server::Server;
use watchdog::Activity;

/// rccd: remote client control server
#[derive(Parser, Debug)]
#[command(name = "rccd", version)]
#[command(about = "Control server hosting one client for remote test drivers")]
struct Args {
    /// Address to listen on; port 0 picks a free port
    #[arg(long, default_value = "127.0.0.1:0")]
    bind: SocketAddr,

    /// Exit after this many seconds without a request [env: RCCD_INACTIVITY_SECS]
    #[arg(long)]
    inactivity_secs: Option<u64>,

    /// Delay every sent message of the memory client [env: RCCD_MEMORY_SEND_DELAY_MS]
    #[arg(long)]
    memory_send_delay_ms: Option<u64>,
}

fn main() {
    let args = Args::parse();
    setup_logging();

    let inactivity = args
        .inactivity_secs
        .map(Duration::from_secs)
        .or_else(env::inactivity)
        .unwrap_or(watchdog::DEFAULT_INACTIVITY);
    let send_delay = args
        .memory_send_delay_ms
        .map(Duration::from_millis)
        .or_else(env::memory_send_delay)
        .unwrap_or_default();

    let listener = match TcpListener::bind(args.bind) {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("failed to bind {}: {}", args.bind, e);
            std::process::exit(1);
        }
    };
    let addr = match listener.local_addr() {
        Ok(a) => a,
        Err(e) => {
            tracing::error!("failed to read local address: {}", e);
            std::process::exit(1);
        }
    };

    // Handshake: the port must be the first line on stdout.
    let mut stdout = std::io::stdout();
    if let Err(e) = writeln!(stdout, "{}", addr.port()).and_then(|()| stdout.flush()) {
        tracing::error!("failed to write port to stdout: {}", e);
        std::process::exit(1);
    }

    tracing::info!(
        "rccd v{} listening on {} (inactivity {:?})",
        env!("CARGO_PKG_VERSION"),
        addr,
        inactivity
    );

    let activity = Activity::new();
    if let Err(e) = watchdog::spawn(
        activity.clone(),
        inactivity,
        watchdog::DEFAULT_TICK,
        || {
            std::process::exit(0);
        },
    ) {
        tracing::error!("failed to start watchdog: {}", e);
        std::process::exit(1);
    }

    let mut bindings = BindingsRegistry::new();
    bindings.register(Arc::new(MemoryBindings::new().with_send_delay(send_delay)));
    tracing::debug!("language bindings: {:?}", bindings.langs());
    let server = Arc::new(Server::new(bindings));

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let server = Arc::clone(&server);
                let activity = activity.clone();
                let spawned = thread::Builder::new()
                    .name("connection".to_string())
                    .spawn(move || serve_connection(stream, &server, &activity));
                if let Err(e) = spawned {
                    tracing::warn!("failed to spawn connection thread: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!("failed to accept connection: {}", e);
            }
        }
    }
}

/// Serve requests on one connection until the peer hangs up.
fn serve_connection(mut stream: TcpStream, server: &Server, activity: &Activity) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    tracing::debug!("connection from {}", peer);
    let _ = stream.set_nodelay(true);

    loop {
        let request: Request = match framing::read_message(&mut stream) {
            Ok(request) => request,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                tracing::debug!("{} disconnected", peer);
                return;
            }
            Err(e) => {
                tracing::warn!("failed to read request from {}: {}", peer, e);
                return;
            }
        };

        activity.touch();
        let response = server.handle(request);
        activity.touch();

        let shutting_down = matches!(response, Response::ShuttingDown);
        if let Err(e) = framing::write_message(&mut stream, &response) {
            tracing::warn!("failed to write response to {}: {}", peer, e);
            return;
        }
        if shutting_down {
            tracing::info!("shutting down");
            std::process::exit(0);
        }
    }
}

fn setup_logging() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_env(env::names::RUST_LOG).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
