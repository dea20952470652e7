pub mod media;
pub mod routes;

use crate::config::{Config, Server};
use anyhow::{Context, Result};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Everything a request handler needs, shared across connections.
pub struct ViewerState {
    pub annotations_dir: PathBuf,
    pub videos_dir: PathBuf,
    pub static_dir: PathBuf,
    pub required_ratings: Vec<String>,
}

impl ViewerState {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            annotations_dir: PathBuf::from(&cfg.paths.annotations_dir),
            videos_dir: PathBuf::from(&cfg.paths.videos_dir),
            static_dir: PathBuf::from(&cfg.paths.static_dir),
            required_ratings: cfg.completeness.required_ratings.clone(),
        }
    }
}

/// Run the read-only viewer until ctrl-c.
pub fn run(cfg: &Config) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| {
            format!(
                "invalid server address: {}:{}",
                cfg.server.host, cfg.server.port
            )
        })?;

    if !PathBuf::from(&cfg.paths.annotations_dir).exists() {
        warn!(
            "annotations directory not found: {}",
            cfg.paths.annotations_dir
        );
    }

    let state = Arc::new(ViewerState::from_config(cfg));
    let server_cfg = cfg.server.clone();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .with_context(|| "building tokio runtime")?;
    runtime.block_on(serve(addr, server_cfg, state))
}

async fn serve(addr: SocketAddr, server_cfg: Server, state: Arc<ViewerState>) -> Result<()> {
    let listener = create_reusable_listener(addr)?;
    info!("viewer listening on http://{addr} (read-only)");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer_addr)) => {
                        debug!("accepted connection from {peer_addr}");
                        handle_connection(stream, &server_cfg, Arc::clone(&state));
                    }
                    Err(err) => error!("failed to accept connection: {err}"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down viewer");
                break;
            }
        }
    }

    Ok(())
}

fn handle_connection(stream: tokio::net::TcpStream, server_cfg: &Server, state: Arc<ViewerState>) {
    let timeout = Duration::from_secs(server_cfg.connection_timeout_seconds.max(1));
    let keep_alive = server_cfg.keep_alive;

    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let mut builder = http1::Builder::new();
        builder.keep_alive(keep_alive);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&state);
                async move { routes::handle(req, state).await }
            }),
        );

        match tokio::time::timeout(timeout, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => debug!("connection error: {err}"),
            Err(_) => warn!("connection timed out after {}s", timeout.as_secs()),
        }
    });
}

/// TCP listener with address reuse, so a restarted viewer does not trip over
/// sockets lingering in TIME_WAIT.
fn create_reusable_listener(addr: SocketAddr) -> Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))
        .with_context(|| "creating socket")?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket
        .bind(&addr.into())
        .with_context(|| format!("binding {addr}"))?;
    socket.listen(128)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener).with_context(|| "registering listener with tokio")
}
