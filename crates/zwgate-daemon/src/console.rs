//! Administrative console sessions
//!
//! A session reads one command per line and interleaves the command output
//! with log lines mirrored from the fanout. The same loop serves TCP clients
//! and the interactive terminal.

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{info, warn};
use zwgate_core::{DeviceId, ParameterSelector};

use crate::fanout::Fanout;
use crate::state::AppState;

const HELP: &[&str] = &[
    "Commands:",
    "    network                                       list registered nodes",
    "    node <id>                                     show one node and its values",
    "    get <id> <class> <label>                      show one value by label",
    "    get <id> <class> <instance> <index>           show one value by slot",
    "    set <id> <class> <instance> <index> <value>   send a new value to the network",
    "    help                                          show this text",
    "    quit                                          close the session",
];

/// Output of one console command
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub lines: Vec<String>,
    pub quit: bool,
}

impl Reply {
    fn lines(lines: Vec<String>) -> Self {
        Self { lines, quit: false }
    }

    fn line(line: impl Into<String>) -> Self {
        Self::lines(vec![line.into()])
    }
}

/// Accept console clients until the listener fails
pub async fn serve(state: Arc<AppState>, bind: &str) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;
    state
        .fanout
        .broadcast_log(&format!("Started console listener ({})", bind));

    loop {
        let (socket, peer) = listener.accept().await?;
        info!(peer = %peer, "Accepted console connection");
        let state = state.clone();
        tokio::spawn(async move {
            let (reader, writer) = socket.into_split();
            if let Err(e) = run_session(state, reader, writer).await {
                warn!(peer = %peer, error = %e, "Console session error");
            }
            info!(peer = %peer, "Closed console connection");
        });
    }
}

/// Run one console session until the client quits or disconnects
pub async fn run_session<R, W>(state: Arc<AppState>, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut logs) = Fanout::channel();
    let channel = state.fanout.register_console(tx);

    let result = async {
        write_lines(&mut writer, &["zwgate console".to_string()]).await?;
        write_lines(&mut writer, &HELP.iter().map(|s| s.to_string()).collect::<Vec<_>>()).await?;

        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else { break };
                    let reply = execute(&state, &line).await;
                    write_lines(&mut writer, &reply.lines).await?;
                    if reply.quit {
                        break;
                    }
                }
                log = logs.recv() => {
                    let Some(log) = log else { break };
                    write_lines(&mut writer, &[log]).await?;
                }
            }
        }
        anyhow::Ok(())
    }
    .await;

    state.fanout.unregister_console(channel);
    result
}

async fn write_lines<W: AsyncWrite + Unpin>(writer: &mut W, lines: &[String]) -> Result<()> {
    for line in lines {
        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\r\n").await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Execute one command line
pub async fn execute(state: &AppState, line: &str) -> Reply {
    let words: Vec<&str> = line.split_whitespace().collect();
    match words.as_slice() {
        [] => Reply::default(),
        ["help"] => Reply::lines(HELP.iter().map(|s| s.to_string()).collect()),
        ["quit"] | ["exit"] => Reply {
            lines: vec!["Bye".to_string()],
            quit: true,
        },
        ["network"] => Reply::lines(state.network_report().await),
        ["node", id] => match parse_device(id) {
            Some(id) => match state.device_report(id).await {
                Ok(lines) => Reply::lines(lines),
                Err(e) => Reply::line(e.to_string()),
            },
            None => Reply::line(format!("Invalid node id '{}'", id)),
        },
        ["get", id, class, rest @ ..] if !rest.is_empty() => {
            let Some(id) = parse_device(id) else {
                return Reply::line(format!("Invalid node id '{}'", id));
            };
            // Anything after the class that is not a slot is a label, spaces included
            let selector = parse_slot(rest)
                .unwrap_or_else(|| ParameterSelector::Label(skip_words(line, 3).to_string()));
            match state.parameter(id, class, &selector).await {
                Ok(param) => {
                    let slot = format!("<{}:{}> {}", param.instance, param.index, param.label);
                    Reply::line(match &param.value {
                        Some(value) => format!("{} = {}", slot, value),
                        None => slot,
                    })
                }
                Err(e) => Reply::line(e.to_string()),
            }
        }
        ["get", ..] => {
            Reply::line("Usage: get <id> <class> <label> | get <id> <class> <instance> <index>")
        }
        ["set", id, class, instance, index, value] => {
            let (Some(id), Some(selector)) = (parse_device(id), parse_slot(&[*instance, *index]))
            else {
                return Reply::line("Usage: set <id> <class> <instance> <index> <value>");
            };
            let payload = Value::String(value.to_string());
            match state.set_parameter(id, class, &selector, Some(&payload)).await {
                Ok(param) => Reply::line(format!(
                    "Sent {} to node {} ({}), currently {}",
                    value,
                    id,
                    param.label,
                    param
                        .value
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "(none)".to_string())
                )),
                Err(e) => Reply::line(e.to_string()),
            }
        }
        [command, ..] => Reply::line(format!(
            "Unknown command '{}'. Type 'help' for a list of commands.",
            command
        )),
    }
}

fn parse_device(id: &str) -> Option<DeviceId> {
    id.parse().ok()
}

fn parse_slot(words: &[&str]) -> Option<ParameterSelector> {
    match words {
        [instance, index] => Some(ParameterSelector::Slot {
            instance: instance.parse().ok()?,
            index: index.parse().ok()?,
        }),
        _ => None,
    }
}

/// Remainder of `line` after its first `n` words, trimmed
fn skip_words(line: &str, n: usize) -> &str {
    let mut rest = line.trim_start();
    for _ in 0..n {
        rest = rest
            .find(char::is_whitespace)
            .map_or("", |at| &rest[at..])
            .trim_start();
    }
    rest.trim_end()
}
