//! Newline-delimited JSON adapter over stdin/stdout.
//!
//! Each stdin line is one [`Request`]; each stdout line is one [`Output`]
//! (mode changes, session replies, status, errors). Stands in for the
//! platform observers and the renderer.

use std::sync::Arc;

use anyhow::Context;
use notchd_coordinator::timer::now;
use notchd_coordinator::{Coordinator, CoordinatorStats, ModeChange, WidgetManager};
use notchd_core::NotchConfig;
use notchd_core::session::SessionView;
use notchd_core::types::{DisplayMode, SignalEvent, WidgetId, WidgetKind};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::RunOpts;
use crate::recorder::Recorder;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Signal { event: SignalEvent },
    Open { kind: WidgetKind },
    Close { id: WidgetId },
    Cancel { id: WidgetId },
    Dismiss { id: WidgetId },
    Status,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Output {
    ModeChanged(ModeChange),
    SessionOpened {
        session: SessionView,
    },
    SessionClosed {
        id: WidgetId,
    },
    Status {
        mode: DisplayMode,
        sessions: Vec<SessionView>,
        stats: CoordinatorStats,
    },
    Error {
        message: String,
    },
}

/// Maps requests onto the coordinator and widget manager.
pub struct Adapter {
    coordinator: Coordinator,
    widgets: Arc<WidgetManager>,
}

impl Adapter {
    pub fn new(coordinator: Coordinator, widgets: Arc<WidgetManager>) -> Self {
        Self {
            coordinator,
            widgets,
        }
    }

    /// Handle one input line. Returns the reply to print, if any.
    pub fn handle_line(&self, line: &str) -> Option<Output> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = %e, "adapter: malformed request");
                Some(Output::Error {
                    message: format!("malformed request: {e}"),
                })
            }
        }
    }

    pub fn handle(&self, request: Request) -> Option<Output> {
        debug!(?request, "adapter: request");
        let result = match request {
            Request::Signal { event } => {
                self.coordinator.submit(event);
                Ok(None)
            }
            Request::Open { kind } => self.widgets.open(kind).map(|session| {
                Some(Output::SessionOpened {
                    session: session.view(now()),
                })
            }),
            Request::Close { id } => self
                .widgets
                .close(id)
                .map(|()| Some(Output::SessionClosed { id })),
            Request::Cancel { id } => self
                .widgets
                .cancel(id)
                .map(|()| Some(Output::SessionClosed { id })),
            Request::Dismiss { id } => self
                .widgets
                .dismiss(id)
                .map(|()| Some(Output::SessionClosed { id })),
            Request::Status => Ok(Some(Output::Status {
                mode: self.coordinator.current(),
                sessions: self.widgets.views(now()),
                stats: self.coordinator.stats(),
            })),
        };
        result.unwrap_or_else(|e| {
            Some(Output::Error {
                message: e.to_string(),
            })
        })
    }
}

async fn write_outputs(mut rx: mpsc::UnboundedReceiver<Output>) {
    let mut stdout = tokio::io::stdout();
    while let Some(output) = rx.recv().await {
        let line = match serde_json::to_string(&output) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "adapter: failed to encode output");
                continue;
            }
        };
        if let Err(e) = stdout.write_all(format!("{line}\n").as_bytes()).await {
            warn!(error = %e, "adapter: stdout closed");
            break;
        }
        let _ = stdout.flush().await;
    }
}

/// Run until stdin closes or ctrl-c.
pub async fn run(config: NotchConfig, opts: RunOpts) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let coordinator = Coordinator::with_cancel(config.clone(), cancel.clone());
    let widgets = Arc::new(WidgetManager::new(coordinator.clone(), config));
    let ticker = widgets.spawn_ticker(cancel.clone());

    let (out_tx, out_rx) = mpsc::unbounded_channel::<Output>();
    let (changes_tx, changes_rx) = broadcast::channel::<ModeChange>(256);
    let subscription = {
        let out_tx = out_tx.clone();
        let changes_tx = changes_tx.clone();
        coordinator.subscribe(move |change| {
            let _ = out_tx.send(Output::ModeChanged(change.clone()));
            let _ = changes_tx.send(change.clone());
        })
    };

    let recorder = match &opts.record {
        Some(path) => {
            let mut recorder = Recorder::with_cancel(path, changes_rx, cancel.clone())
                .with_context(|| format!("opening record file {}", path.display()))?;
            info!(path = %path.display(), "recording mode changes");
            Some(tokio::spawn(async move { recorder.run().await }))
        }
        None => {
            drop(changes_rx);
            None
        }
    };
    let writer = tokio::spawn(write_outputs(out_rx));

    let adapter = Adapter::new(coordinator.clone(), Arc::clone(&widgets));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("notchd: reading signals from stdin");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) => {
                        if let Some(output) = adapter.handle_line(&line) {
                            let _ = out_tx.send(output);
                        }
                    }
                    None => {
                        info!("notchd: stdin closed, shutting down");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("notchd: interrupted, shutting down");
                break;
            }
        }
    }

    // Drain queued inputs, then close the output channels so the writer
    // and recorder finish what they already hold.
    coordinator.flush().await;
    coordinator.unsubscribe(subscription);
    drop(out_tx);
    drop(changes_tx);
    writer.await.context("output writer")?;
    if let Some(recorder) = recorder {
        recorder.await.context("recorder")?;
    }

    cancel.cancel();
    ticker.await.context("widget ticker")?;
    Ok(())
}
