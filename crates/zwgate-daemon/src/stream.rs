//! Plain TCP event-stream subscribers
//!
//! Each connected client receives every event line, terminated by CRLF,
//! from the moment it connects. Anything the client sends is ignored.

use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::fanout::Fanout;
use crate::state::AppState;

/// Accept event-stream clients until the listener fails
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    state
        .fanout
        .broadcast_log(&format!("Started event stream listener ({})", bind));

    loop {
        let (socket, peer) = listener.accept().await?;
        info!(peer = %peer, "Accepted event stream connection");
        let state = state.clone();
        tokio::spawn(async move {
            let (reader, writer) = socket.into_split();
            run_subscriber(state, reader, writer).await;
            info!(peer = %peer, "Closed event stream connection");
        });
    }
}

/// Forward event lines to one subscriber until it disconnects
pub async fn run_subscriber<R, W>(state: Arc<AppState>, mut reader: R, mut writer: W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut events) = Fanout::channel();
    let channel = state.fanout.register_events(tx);
    let mut discard = [0u8; 512];

    loop {
        tokio::select! {
            line = events.recv() => {
                let Some(line) = line else { break };
                let framed = format!("{}\r\n", line);
                if let Err(e) = writer.write_all(framed.as_bytes()).await {
                    debug!(channel = %channel, error = %e, "Event stream write failed");
                    break;
                }
            }
            read = reader.read(&mut discard) => {
                match read {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        }
    }

    state.fanout.unregister_events(channel);
}
