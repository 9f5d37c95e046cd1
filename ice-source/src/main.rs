// ice-source: stream stdin to an IceCast mountpoint.

use std::path::PathBuf;

use anyhow::{bail, Context};
use ice_source::{config, Config, Session};
use tokio::io::AsyncReadExt;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const CHUNK_SIZE: usize = 4096;

fn main() -> anyhow::Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--version" | "-V" => {
                println!("ice-source {}", VERSION);
                return Ok(());
            }
            "--config" | "-c" => {
                let path = args.next().context("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            other => bail!("unknown argument: {other}"),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = match config_path {
        Some(p) => config::load_from(&p)?,
        None => config::load(),
    };

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cfg))
}

async fn run(cfg: Config) -> anyhow::Result<()> {
    let mut session = Session::new(cfg.server()).with_login_timeout(cfg.login_timeout());
    if !session.connect(cfg.stream.clone()).await {
        bail!("could not connect to {}:{}", cfg.host, cfg.port);
    }
    session
        .login()
        .await
        .with_context(|| format!("login to {}:{}{} failed", cfg.host, cfg.port, cfg.mount))?;
    tracing::info!(mount = %cfg.mount, "streaming stdin");

    let result = pump_stdin(&mut session).await;
    session.disconnect();
    result
}

/// Forward stdin until EOF or Ctrl+C.
async fn pump_stdin(session: &mut Session) -> anyhow::Result<()> {
    let mut stdin = tokio::io::stdin();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent: u64 = 0;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        let read = tokio::select! {
            _ = &mut shutdown => None,
            read = stdin.read(&mut buf) => Some(read),
        };
        let n = match read {
            None => {
                tracing::info!("interrupted");
                break;
            }
            Some(read) => read.context("reading stdin")?,
        };
        if n == 0 {
            break;
        }
        session.send_audio(&buf[..n]).await?;
        sent += n as u64;
    }
    tracing::info!(bytes = sent, "stream finished");
    Ok(())
}
