//! HTTP front end of the avatar service.

mod config;
mod error;
mod http;
mod routes;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use gender_detect::{GenderLookup, NameDictionary};
use memoji::{AvatarService, CompositorHandle};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::{Overrides, ServerConfig};
use crate::error::ServerError;
use crate::http::{Request, Response, HEAD_TIMEOUT};
use crate::routes::Router;

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic avatars over HTTP", long_about = None)]
struct Cli {
    /// TOML file with the same keys as the flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    cli.overrides.apply(&mut config);

    let lookup: Box<dyn GenderLookup> = match &config.names {
        Some(path) => Box::new(
            NameDictionary::load(path)
                .with_context(|| format!("Failed to load names from {}", path.display()))?,
        ),
        None => Box::new(NameDictionary::builtin()),
    };
    let service = AvatarService::new(&config.service_config(), lookup, CompositorHandle::image())
        .context("Failed to initialise the avatar service")?;
    let router = Arc::new(Router::new(service));

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    log::info!("server: listening on {}", config.bind);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let router = Arc::clone(&router);
                    tokio::spawn(async move {
                        if let Err(err) = handle_client(stream, router).await {
                            log::warn!("server: connection {} failed: {}", addr, err);
                        }
                    });
                }
                Err(err) => log::error!("server: accept failed: {}", err),
            },
            _ = tokio::signal::ctrl_c() => {
                log::info!("server: shutting down");
                return Ok(());
            }
        }
    }
}

/// What arrived on a connection before the head deadline
#[derive(Debug)]
enum Incoming {
    Request(Request),
    Malformed(ServerError),
    Closed,
    TimedOut,
}

async fn handle_client(mut stream: TcpStream, router: Arc<Router>) -> Result<()> {
    let request = match read_request(&mut stream, HEAD_TIMEOUT).await? {
        Incoming::Request(request) => request,
        Incoming::Malformed(err) => {
            log::debug!("server: {}", err);
            stream.write_all(&Response::from_error(&err).serialize()).await?;
            return Ok(());
        }
        Incoming::TimedOut => {
            log::debug!("server: request head not received within {:?}", HEAD_TIMEOUT);
            let response = Response::text(408, "request head not received in time");
            stream.write_all(&response.serialize()).await?;
            return Ok(());
        }
        Incoming::Closed => return Ok(()),
    };

    let started = Instant::now();
    let line = format!("{} {}", request.method, request.path);
    let response = tokio::task::spawn_blocking(move || router.handle(&request)).await?;
    log::info!("{} {} {:?}", line, response.status, started.elapsed());

    stream.write_all(&response.serialize()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Reads until a complete request head arrives, giving up after `limit`
async fn read_request<S>(stream: &mut S, limit: Duration) -> io::Result<Incoming>
where
    S: AsyncRead + Unpin,
{
    match tokio::time::timeout(limit, read_head(stream)).await {
        Ok(incoming) => incoming,
        Err(_) => Ok(Incoming::TimedOut),
    }
}

async fn read_head<S>(stream: &mut S) -> io::Result<Incoming>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = Vec::with_capacity(1024);
    loop {
        if stream.read_buf(&mut buffer).await? == 0 {
            return Ok(Incoming::Closed);
        }
        match Request::parse(&buffer) {
            Ok(Some(request)) => return Ok(Incoming::Request(request)),
            Ok(None) => continue,
            Err(err) => return Ok(Incoming::Malformed(err)),
        }
    }
}
