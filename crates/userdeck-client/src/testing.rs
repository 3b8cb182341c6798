//! Scripted transport for unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

use crate::transport::{
    Transport, TransportError, TransportErrorKind, TransportMeta, TransportRequest,
    TransportResponse,
};

type Scripted = std::result::Result<TransportResponse, TransportError>;

/// Transport that replays queued responses and records every request.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn push(&self, response: TransportResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub(crate) fn push_error(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    /// Value of header `name` on the `index`th recorded request.
    pub(crate) fn header(&self, index: usize, name: &str) -> Option<String> {
        self.requests.lock()[index]
            .headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Scripted {
        let url = request.url.clone();
        self.requests.lock().push(request);
        let mut next = self.responses.lock().pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Other,
                "no scripted response",
            ))
        })?;
        next.meta.url = url;
        Ok(next)
    }
}

pub(crate) fn text_response(status: u16, body: &str) -> TransportResponse {
    let head = format!("HTTP/1.1 {}\r\nContent-Type: text/plain\r\n\r\n", status);
    TransportResponse {
        meta: TransportMeta {
            status,
            url: String::new(),
            total_time: Duration::from_millis(1),
            header_size: head.len(),
        },
        head,
        body: body.to_string(),
    }
}

pub(crate) fn json_response(status: u16, body: Value) -> TransportResponse {
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\r\n",
        status
    );
    TransportResponse {
        meta: TransportMeta {
            status,
            url: String::new(),
            total_time: Duration::from_millis(1),
            header_size: head.len(),
        },
        head,
        body: body.to_string(),
    }
}

/// Formatted log output collected for assertions.
#[derive(Debug, Clone, Default)]
pub(crate) struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Send this thread's `tracing` output to a buffer until the guard drops.
pub(crate) fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
