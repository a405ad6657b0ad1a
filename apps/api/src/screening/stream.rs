//! NDJSON progress stream for a screening run.
//!
//! Intermediate `{"step", "status"}` lines are paced by a timer, not by real
//! stage completion. A warm cache skips them and emits only the terminal line.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info};

use crate::pipeline::Stage;
use crate::screening::models::ScreeningReport;
use crate::screening::service::{ScreeningError, ScreeningService};

const TERMINAL_STEP: u8 = 8;

fn tick_line(step: u8, label: &str) -> Value {
    json!({ "step": step, "status": format!("{label}...") })
}

fn terminal_line(result: Result<ScreeningReport, ScreeningError>) -> Value {
    let report = result.map_err(|e| e.to_string()).and_then(|report| {
        serde_json::to_value(report).map_err(|e| format!("could not encode results: {e}"))
    });
    match report {
        Ok(results) => json!({ "step": TERMINAL_STEP, "results": results }),
        Err(message) => {
            error!("Screening stream failed: {message}");
            json!({ "error": message })
        }
    }
}

fn encode(value: &Value) -> Bytes {
    let mut line = value.to_string();
    line.push('\n');
    Bytes::from(line)
}

/// Streams one screening run. Exactly one terminal line (`results` or `error`) is sent.
pub fn screening_stream(
    service: ScreeningService,
    tick: Duration,
) -> impl Stream<Item = Result<Bytes, Infallible>> {
    let (tx, rx) = mpsc::channel::<Value>(16);

    tokio::spawn(async move {
        let cached = match service.active_job().await {
            Ok(job) => service.cached_report(&job).await,
            Err(e) => Err(e),
        };

        let terminal = match cached {
            Ok(Some(report)) => terminal_line(Ok(report)),
            Err(e) => terminal_line(Err(e)),
            Ok(None) => {
                info!("Cache cold, streaming progress while the pipeline runs");
                let mut ticks = Stage::SEQUENCE
                    .iter()
                    .filter_map(|stage| stage.progress())
                    .filter(|(step, _)| *step < TERMINAL_STEP);
                let mut interval = tokio::time::interval(tick);
                let run = service.run_screening();
                tokio::pin!(run);

                loop {
                    tokio::select! {
                        biased;
                        result = &mut run => break terminal_line(result),
                        _ = interval.tick() => {
                            if let Some((step, label)) = ticks.next() {
                                // A departed client must not cancel the run.
                                let _ = tx.send(tick_line(step, label)).await;
                            }
                        }
                    }
                }
            }
        };

        let _ = tx.send(terminal).await;
    });

    ReceiverStream::new(rx).map(|value| Ok(encode(&value)))
}
