//! Outgoing command encoding.
//!
//! Commands are length-prefixed RESP arrays except for the two handshake
//! literals, which are sent in the inline form.

use bytes::BytesMut;

/// Open-handshake liveness probe.
pub const PING: &[u8] = b"PING\r\n";

/// Close-handshake goodbye.
pub const QUIT: &[u8] = b"QUIT\r\n";

/// Encode `PUBLISH <channel> <payload>` as a three-element array of bulk
/// strings. Length prefixes are exact byte counts, so multi-byte payload
/// content is safe.
pub fn encode_publish(channel: &str, payload: &str) -> BytesMut {
    let mut buf = BytesMut::with_capacity(32 + channel.len() + payload.len());
    buf.extend_from_slice(b"*3\r\n$7\r\nPUBLISH\r\n");
    extend_bulk(&mut buf, channel.as_bytes());
    extend_bulk(&mut buf, payload.as_bytes());
    buf
}

fn extend_bulk(buf: &mut BytesMut, data: &[u8]) {
    buf.extend_from_slice(b"$");
    buf.extend_from_slice(data.len().to_string().as_bytes());
    buf.extend_from_slice(b"\r\n");
    buf.extend_from_slice(data);
    buf.extend_from_slice(b"\r\n");
}
