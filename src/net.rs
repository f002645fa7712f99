//! Socket seam for the sink.
//!
//! The sink is written against a small stream trait rather than
//! `TcpStream` directly so the protocol machinery can be exercised with
//! scripted byte streams in tests. The real implementation wraps a
//! `std::net::TcpStream` and answers the readiness probe with a
//! zero-timeout `poll(2)`.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::os::unix::io::AsRawFd;

/// Handshake line buffer size and maximum bytes read per drain pass.
pub const CHUNK_SIZE: usize = 1024;

/// Bidirectional byte stream with a non-blocking readiness probe.
pub trait Stream {
    /// Send as much of `buf` as the transport accepts, returning the count.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive up to `buf.len()` bytes; `Ok(0)` means the peer closed.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Whether at least one byte can be received right now, without
    /// blocking and without waiting for one to arrive.
    fn readable(&mut self) -> io::Result<bool>;
}

impl Stream for TcpStream {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn readable(&mut self) -> io::Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };

        // Zero timeout: report what is ready right now, never wait.
        let rc = unsafe { libc::poll(&mut fds, 1, 0) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(rc > 0 && fds.revents & libc::POLLIN != 0)
    }
}

/// Read one `\n`-terminated line, one byte at a time, into a bounded
/// buffer.
///
/// Used only for the blocking open/close handshakes, where the peer is
/// expected to answer immediately. Stops at the first `\n` or after
/// [`CHUNK_SIZE`] bytes. The peer closing the connection mid-line is an
/// error.
pub fn read_line<S: Stream + ?Sized>(stream: &mut S) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    while line.len() < CHUNK_SIZE {
        let n = stream.recv(&mut byte)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading reply line",
            ));
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }

    Ok(line)
}
