// src/main.rs
//! Process entrypoint: load configuration, install logging, wire signal
//! handling, run the reactor to completion.

use msgreactor::reactor::{Reactor, ReactorConfig};
use msgreactor::{Config, Connection, MessageHandler, PoolConfig};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "msgreactord.conf";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut config = match Config::from_file(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            info!(path = CONFIG_PATH, error = %e, "no usable config file, using defaults");
            Config::default()
        }
    };
    config.apply_positional_overrides(std::env::args().skip(1));

    info!(?config, "starting msgreactord");

    let handler: Arc<MessageHandler> = Arc::new(echo_handler);

    let reactor_config = ReactorConfig {
        bind_addr: config.bind_addr(),
        max_connections: config.max_connections,
        workers: msgreactor::worker::WorkerConfig {
            num_workers: config.thread_count,
            ..Default::default()
        },
        outbound_pool: PoolConfig {
            buffer_size: 8192,
            max_pool_size: config.max_connections * 4,
            min_pool_size: 16,
        },
        ..Default::default()
    };

    let reactor = match Reactor::start(reactor_config, handler) {
        Ok(reactor) => reactor,
        Err(e) => {
            error!(error = %e, "failed to start reactor");
            std::process::exit(1);
        }
    };

    let stopper = reactor.stopper();
    let ctrlc_stopper = stopper.clone();
    if let Err(e) = ctrlc::set_handler(move || ctrlc_stopper.stop()) {
        error!(error = %e, "failed to install signal handler");
        std::process::exit(1);
    }

    match reactor.run() {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            error!(error = %e, "reactor exited with error");
            std::process::exit(1);
        }
    }
}

/// Default application handler: echoes every frame back prefixed with
/// `"Server received: "`, matching spec.md §8 scenario 1.
fn echo_handler(_id: usize, frame: &[u8], conn: &mut Connection) {
    let mut reply = Vec::with_capacity(frame.len() + 17);
    reply.extend_from_slice(b"Server received: ");
    reply.extend_from_slice(frame);
    if let Err(e) = conn.send_message(&reply) {
        tracing::warn!(error = %e, "failed to enqueue echo reply");
    }
}
