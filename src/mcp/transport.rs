//! stdio transport shared by the JSON-RPC and n8n line protocols.
//!
//! - Messages are UTF-8 encoded JSON, one per line
//! - stdin: receives messages from the client
//! - stdout: sends responses to the client
//! - stderr: logs only, never protocol output
//!
//! # Concurrency
//!
//! Each parsed message is dispatched on its own task so a slow Graph API
//! call never blocks intake of the next line. The serve loop is the single
//! writer: completed responses are written whole, one per line, in
//! completion order. Responses may therefore be reordered relative to their
//! requests; JSON-RPC callers correlate by `id`.

use std::future::Future;
use std::io;

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace};

use crate::mcp::dispatcher::Dispatcher;
use crate::mcp::message::parse_line;

/// Banner written before the first response when readiness is announced.
pub const READY_BANNER: &str = r#"{"ready":true}"#;

/// Per-connection state of the line reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for a complete line.
    AwaitingLine,
    /// A complete line is being parsed.
    Parsing,
    /// A parsed message is being handed to the dispatcher.
    Dispatching,
    /// Input ended or failed.
    Closed,
}

/// A line-delimited JSON transport over a reader/writer pair.
pub struct StdioTransport<R = BufReader<tokio::io::Stdin>, W = tokio::io::Stdout> {
    reader: R,
    writer: W,
    /// Bytes of a line not yet terminated by `\n`.
    pending: Vec<u8>,
    state: ConnectionState,
}

impl StdioTransport {
    /// Creates a transport over the process's stdin and stdout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_io(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over arbitrary I/O.
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            pending: Vec::new(),
            state: ConnectionState::AwaitingLine,
        }
    }

    /// Current connection state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consumes the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Reads the next complete line.
    ///
    /// Returns `None` at end of input. A final line without a trailing
    /// newline is still returned. Invalid UTF-8 is replaced rather than
    /// rejected so the parser can report it.
    ///
    /// Cancel safe: bytes read before cancellation stay buffered and the
    /// next call continues the same line.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.pending).await?;

        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
            if bytes.last() == Some(&b'\r') {
                bytes.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Writes one JSON value as a single line and flushes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_json(&mut self, value: &Value) -> io::Result<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }

    /// Runs the read/dispatch/write loop until end of input or `shutdown`.
    ///
    /// At end of input, in-flight requests are drained and their responses
    /// written before returning. On `shutdown`, in-flight requests are
    /// abandoned, including while draining.
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal read or write failure.
    pub async fn serve<S>(
        &mut self,
        dispatcher: &Dispatcher,
        announce_ready: bool,
        shutdown: S,
    ) -> io::Result<()>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut in_flight: JoinSet<Option<Value>> = JoinSet::new();

        if announce_ready {
            self.write_raw(READY_BANNER).await?;
        }

        let result = loop {
            self.state = ConnectionState::AwaitingLine;

            tokio::select! {
                () = &mut shutdown => {
                    info!(in_flight = in_flight.len(), "Abandoning in-flight requests");
                    in_flight.abort_all();
                    break Ok(());
                }

                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = self.write_completion(joined).await {
                        break Err(e);
                    }
                }

                line = self.read_line() => match line {
                    Ok(Some(line)) => {
                        if let Err(e) = self.accept(&line, dispatcher, &mut in_flight).await {
                            break Err(e);
                        }
                    }
                    Ok(None) => {
                        debug!("End of input");
                        break tokio::select! {
                            drained = self.drain(&mut in_flight) => drained,
                            () = &mut shutdown => {
                                info!(in_flight = in_flight.len(), "Abandoning in-flight requests");
                                in_flight.abort_all();
                                Ok(())
                            }
                        };
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to read from input");
                        break Err(e);
                    }
                },
            }
        };

        self.state = ConnectionState::Closed;
        result
    }

    /// Parses one line and either writes its rejection or spawns its dispatch.
    async fn accept(
        &mut self,
        line: &str,
        dispatcher: &Dispatcher,
        in_flight: &mut JoinSet<Option<Value>>,
    ) -> io::Result<()> {
        if line.trim().is_empty() {
            return Ok(());
        }

        trace!(line, "Received line");
        self.state = ConnectionState::Parsing;

        match parse_line(line) {
            Ok(message) => {
                self.state = ConnectionState::Dispatching;
                let dispatcher = dispatcher.clone();
                in_flight.spawn(async move { dispatcher.handle_message(message).await });
                Ok(())
            }
            Err(rejection) => match dispatcher.reject(&rejection) {
                Some(response) => self.write_json(&response).await,
                None => Ok(()),
            },
        }
    }

    async fn write_completion(
        &mut self,
        joined: Result<Option<Value>, tokio::task::JoinError>,
    ) -> io::Result<()> {
        match joined {
            Ok(Some(response)) => self.write_json(&response).await,
            Ok(None) => Ok(()),
            Err(e) => {
                error!(error = %e, "Request task failed");
                Ok(())
            }
        }
    }

    async fn drain(&mut self, in_flight: &mut JoinSet<Option<Value>>) -> io::Result<()> {
        while let Some(joined) = in_flight.join_next().await {
            self.write_completion(joined).await?;
        }
        Ok(())
    }
}
