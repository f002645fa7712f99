//! Redis pub/sub sink with pipelined reply draining.
//!
//! Publishes are written back-to-back without waiting for replies. After
//! every send the sink opportunistically consumes whatever reply bytes
//! have already arrived and settles them against the outstanding-command
//! count. The peer's replies are never needed to make progress, only to
//! verify the conversation stayed in sync; the hot path therefore never
//! blocks. The only blocking exchanges are the one-shot open and close
//! handshakes.

use crate::event::{Event, PortStatus};
use crate::net::{read_line, Stream, CHUNK_SIZE};
use crate::resp::command;
use crate::resp::parser::{ParseError, ReplyParser};
use std::io;
use tracing::{debug, trace, warn};

/// Fatal sink faults. Every variant leaves the connection unusable: the
/// reply stream can no longer be trusted, so the caller must stop using
/// it rather than retry.
#[derive(Debug)]
pub enum SinkError {
    /// Reply stream no longer matches the expected grammar.
    Desync(ParseError),
    /// An open or close handshake got the wrong line back.
    Handshake { sent: &'static str, got: Vec<u8> },
    /// Readiness-probe failure, short handshake write, or the peer
    /// closing while replies were still owed.
    Connection(io::Error),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Desync(e) => write!(f, "reply stream desynchronized: {e}"),
            SinkError::Handshake { sent, got } => write!(
                f,
                "unexpected reply to {sent}: {:?}",
                String::from_utf8_lossy(got)
            ),
            SinkError::Connection(e) => write!(f, "connection fault: {e}"),
        }
    }
}

impl std::error::Error for SinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SinkError::Desync(e) => Some(e),
            SinkError::Handshake { .. } => None,
            SinkError::Connection(e) => Some(e),
        }
    }
}

impl From<io::Error> for SinkError {
    fn from(e: io::Error) -> Self {
        SinkError::Connection(e)
    }
}

impl From<ParseError> for SinkError {
    fn from(e: ParseError) -> Self {
        SinkError::Desync(e)
    }
}

/// Per-connection publish sink.
///
/// Holds the reply parser and outstanding count for one connection; the
/// stream itself is borrowed per call, so the sink carries no I/O state
/// of its own.
#[derive(Debug)]
pub struct RedisSink {
    channel: String,
    parser: ReplyParser,
}

impl RedisSink {
    /// Create a sink publishing to `channel`. No I/O happens until
    /// [`open`](Self::open).
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            parser: ReplyParser::new(),
        }
    }

    /// Commands sent whose replies have not yet been consumed.
    pub fn outstanding(&self) -> u64 {
        self.parser.outstanding()
    }

    /// Open handshake: send `PING`, block for the reply line, require
    /// exactly `+PONG\r\n`. Runs once, before any pipelining starts.
    pub fn open<S: Stream + ?Sized>(&mut self, stream: &mut S) -> Result<(), SinkError> {
        send_exact(stream, command::PING, "PING")?;

        let line = read_line(stream)?;
        if line != b"+PONG\r\n" {
            return Err(SinkError::Handshake { sent: "PING", got: line });
        }

        debug!(channel = %self.channel, "sink ready");
        Ok(())
    }

    /// Close handshake: send `QUIT`, block for the reply line, accept
    /// `+OK\r\n` or `:0\r\n`.
    pub fn close<S: Stream + ?Sized>(&mut self, stream: &mut S) -> Result<(), SinkError> {
        send_exact(stream, command::QUIT, "QUIT")?;

        let line = read_line(stream)?;
        if line != b"+OK\r\n" && line != b":0\r\n" {
            return Err(SinkError::Handshake { sent: "QUIT", got: line });
        }

        debug!(outstanding = self.outstanding(), "sink closed");
        Ok(())
    }

    /// Publish one scan result, then drain any replies already waiting.
    ///
    /// Results that are not open ports are ignored. A failed or short
    /// send drops this one event and keeps going; it is the only fault
    /// the sink recovers from.
    pub fn report<S: Stream + ?Sized>(
        &mut self,
        stream: &mut S,
        event: &Event,
    ) -> Result<(), SinkError> {
        if event.status != PortStatus::Open {
            return Ok(());
        }

        let payload = event.payload();
        let line = command::encode_publish(&self.channel, &payload);
        match stream.send(&line) {
            Ok(n) if n == line.len() => {}
            Ok(n) => {
                warn!(sent = n, expected = line.len(), payload = %payload, "short write, event dropped");
                return Ok(());
            }
            Err(e) => {
                warn!(error = %e, payload = %payload, "send failed, event dropped");
                return Ok(());
            }
        }

        self.parser.note_sent();
        trace!(outstanding = self.outstanding(), payload = %payload, "published");

        self.drain(stream)
    }

    /// Consume whatever reply bytes have already arrived, without ever
    /// blocking.
    ///
    /// One zero-timeout readiness probe, then at most one bounded read.
    /// No bytes waiting is the common case and a no-op.
    pub fn drain<S: Stream + ?Sized>(&mut self, stream: &mut S) -> Result<(), SinkError> {
        if !stream.readable()? {
            return Ok(());
        }

        let mut chunk = [0u8; CHUNK_SIZE];
        let n = stream.recv(&mut chunk)?;
        if n == 0 {
            return Err(SinkError::Connection(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed with replies outstanding",
            )));
        }

        self.parser.consume(&chunk[..n])?;
        Ok(())
    }
}

/// Send a handshake literal in full; anything short is a connection
/// fault, not a droppable event.
fn send_exact<S: Stream + ?Sized>(
    stream: &mut S,
    bytes: &[u8],
    what: &'static str,
) -> Result<(), SinkError> {
    let n = stream.send(bytes)?;
    if n != bytes.len() {
        return Err(SinkError::Connection(io::Error::new(
            io::ErrorKind::WriteZero,
            format!("short write sending {what}"),
        )));
    }
    Ok(())
}
