//! Link to the out-of-process Z-Wave driver
//!
//! The driver speaks newline-delimited JSON: each inbound line is a
//! [`HardwareEvent`], each outbound line a [`DriverCommand`].

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zwgate_core::{Controller, DriverCommand, HardwareEvent};

use crate::config::DriverConfig;

/// Driver events buffered ahead of the ingestion loop
const EVENT_QUEUE: usize = 1024;

/// Fire-and-forget command sink backed by the driver connection
#[derive(Clone)]
pub struct DriverHandle {
    commands: mpsc::UnboundedSender<DriverCommand>,
}

impl Controller for DriverHandle {
    fn submit(&self, command: DriverCommand) {
        if self.commands.send(command).is_err() {
            warn!("Driver link closed, dropping command");
        }
    }
}

/// Connect to the driver, retrying up to `max_attempts` times
pub async fn connect(
    config: &DriverConfig,
) -> Result<(DriverHandle, mpsc::Receiver<HardwareEvent>)> {
    let attempts = config.max_attempts.max(1);
    let delay = Duration::from_millis(config.retry_delay_ms);

    let mut attempt = 1;
    let stream = loop {
        match TcpStream::connect(&config.address).await {
            Ok(stream) => break stream,
            Err(e) if attempt < attempts => {
                warn!(
                    address = %config.address,
                    attempt,
                    error = %e,
                    "Driver connection failed, retrying"
                );
                attempt += 1;
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "Failed to connect to driver at {} after {} attempts",
                        config.address, attempts
                    )
                });
            }
        }
    };

    info!(address = %config.address, "Connected to driver");
    let (reader, writer) = stream.into_split();
    Ok(spawn_link(reader, writer))
}

/// Start the reader and writer tasks over an established connection
pub fn spawn_link<R, W>(reader: R, writer: W) -> (DriverHandle, mpsc::Receiver<HardwareEvent>)
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE);
    let (command_tx, command_rx) = mpsc::unbounded_channel();

    tokio::spawn(read_events(reader, event_tx));
    tokio::spawn(write_commands(writer, command_rx));

    (DriverHandle { commands: command_tx }, event_rx)
}

async fn read_events<R>(reader: R, events: mpsc::Sender<HardwareEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<HardwareEvent>(line) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            debug!("Event consumer gone, stopping driver reader");
                            return;
                        }
                    }
                    Err(e) => warn!(error = %e, line, "Skipping undecodable driver event"),
                }
            }
            Ok(None) => {
                warn!("Driver closed the connection");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Driver read error");
                return;
            }
        }
    }
}

async fn write_commands<W>(mut writer: W, mut commands: mpsc::UnboundedReceiver<DriverCommand>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(command) = commands.recv().await {
        let mut line = match serde_json::to_string(&command) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "Failed to encode driver command");
                continue;
            }
        };
        line.push('\n');
        debug!(?command, "Sending driver command");
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!(error = %e, "Driver write error, stopping command writer");
            return;
        }
    }
}
