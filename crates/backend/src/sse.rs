// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server-Sent-Events framing.
//!
//! The byte stream is cut into lines, `data:` lines are accumulated, and
//! each blank-line-terminated event's joined payload is relayed over an
//! mpsc channel. Framing is a pure state machine ([`SseFramer`]) so it is
//! testable without a socket; the relay task feeds it from a reqwest
//! byte stream.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Incremental SSE frame decoder.
#[derive(Debug, Default)]
pub struct SseFramer {
    line_buffer: Vec<u8>,
    data_lines: Vec<String>,
}

impl SseFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the payloads of any events completed by it.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();
        self.line_buffer.extend_from_slice(chunk);
        while let Some(newline_index) = self.line_buffer.iter().position(|byte| *byte == b'\n') {
            let mut line = self.line_buffer.drain(..=newline_index).collect::<Vec<_>>();
            if matches!(line.last(), Some(b'\n')) {
                line.pop();
            }
            if matches!(line.last(), Some(b'\r')) {
                line.pop();
            }
            if let Some(payload) = self.push_line(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush at end of stream: an unterminated trailing event still counts.
    pub fn finish(&mut self) -> Option<String> {
        if !self.line_buffer.is_empty() {
            let line = std::mem::take(&mut self.line_buffer);
            self.push_line(&line);
        }
        self.take_event()
    }

    fn push_line(&mut self, line: &[u8]) -> Option<String> {
        if line.is_empty() {
            return self.take_event();
        }
        let text = String::from_utf8_lossy(line);
        if let Some(rest) = text.strip_prefix("data:") {
            self.data_lines
                .push(rest.strip_prefix(' ').unwrap_or(rest).to_string());
        }
        // `event:`, `id:`, `retry:` and comment lines are ignored; the
        // payload JSON itself carries everything this client reads.
        None
    }

    fn take_event(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.data_lines).join("\n"))
    }
}

/// Relay a response's SSE payloads into `tx` until the stream ends or the
/// receiver is dropped. Transport errors just end the relay; the caller
/// observes the closed channel and reconnects.
pub fn spawn_sse_relay(response: reqwest::Response, tx: mpsc::Sender<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut bytes_stream = response.bytes_stream();
        let mut framer = SseFramer::new();
        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(chunk) => chunk,
                Err(error) => {
                    debug!(error = %error, "event stream read failed");
                    return;
                }
            };
            for payload in framer.push_chunk(&chunk) {
                if tx.send(payload).await.is_err() {
                    return;
                }
            }
        }
        if let Some(payload) = framer.finish() {
            let _ = tx.send(payload).await;
        }
    })
}

#[cfg(test)]
#[path = "sse_tests.rs"]
mod tests;
