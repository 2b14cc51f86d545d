use anyhow::{Context as AnyhowContext, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};
use tokio::sync::mpsc;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use morphext::{InboundEvent, MorphApp, SyncMessage, WorkerSession};

fn main() -> Result<()> {
    // try_init fails when a subscriber is already installed; that is fine.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    rt.block_on(run_session())
}

/// One message-passing session: bootstrap the app, then relay host events
/// from stdin until the transport closes. Outbound messages go to stdout as
/// newline-delimited JSON; logs stay on stderr so they never corrupt the
/// message stream.
async fn run_session() -> Result<()> {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();

    let mut session = WorkerSession::new(MorphApp::new(), outbound_tx);
    session
        .bootstrap()
        .context("worker bootstrap failed; session is unusable")?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        tokio::select! {
            maybe_message = outbound_rx.recv() => {
                let Some(message) = maybe_message else { break };
                write_message(&mut stdout, &message).await?;
            }
            maybe_line = lines.next_line() => {
                let Some(line) = maybe_line.context("failed to read stdin")? else {
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<InboundEvent>(line) {
                    Ok(event) => {
                        if let Err(err) = session.handle(event) {
                            error!(target: "worker", error = %err, "failed to handle host event");
                        }
                    }
                    Err(err) => {
                        warn!(target: "worker", error = %err, "ignoring malformed host message");
                    }
                }
            }
        }
    }

    // Flush whatever the session produced before the transport closed.
    while let Ok(message) = outbound_rx.try_recv() {
        write_message(&mut stdout, &message).await?;
    }

    Ok(())
}

async fn write_message(stdout: &mut Stdout, message: &SyncMessage) -> Result<()> {
    let mut line = serde_json::to_vec(message).context("failed to serialize outbound message")?;
    line.push(b'\n');
    stdout
        .write_all(&line)
        .await
        .context("failed to write to stdout")?;
    stdout.flush().await.context("failed to flush stdout")?;
    Ok(())
}
