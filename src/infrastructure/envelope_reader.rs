//! Newline-delimited JSON envelope source.
//!
//! Stands in for the firehose connection: every non-blank line is one envelope.
//! Lines that do not decode are forwarded as `None`, which is what the firehose
//! client produces for broken frames.

use crate::domain::envelope::Envelope;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// `None` for anything that is not a JSON envelope
pub fn decode_envelope(line: &str) -> Option<Envelope> {
    match serde_json::from_str::<Envelope>(line) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            debug!(error = %e, "undecodable envelope line");
            None
        }
    }
}

/// Reads `reader` on a background task; the channel closes at end of input
pub fn spawn_envelope_reader<R>(reader: R, buffer: usize) -> mpsc::Receiver<Option<Envelope>>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(buffer.max(1));

    tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut read = 0u64;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    read += 1;
                    if tx.send(decode_envelope(&line)).await.is_err() {
                        debug!("envelope consumer went away");
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "envelope input failed");
                    break;
                }
            }
        }
        info!(lines = read, "envelope input exhausted");
    });

    rx
}
