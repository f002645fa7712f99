//! Reply parser for the pipelined publish stream.
//!
//! The dialect this sink speaks is tiny: every PUBLISH gets back an
//! integer reply (`:N\r\n`) and the opening PING gets back `+PONG\r\n`.
//! Replies arrive pipelined and may be split across arbitrary read chunks,
//! so the parser is a byte-at-a-time state machine whose state persists
//! between calls. Integer values are never extracted; only reply
//! boundaries matter, because each boundary settles one outstanding
//! command.

/// Echo literal expected after a `+` type byte.
const PONG_LITERAL: &[u8] = b"PONG\r\n";

/// Parser position within the reply stream.
///
/// `Idle` holds exactly when no partial reply is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyState {
    /// Between replies; the next byte must be a type marker.
    #[default]
    Idle,
    /// Inside a `:...\r\n` integer reply.
    Integer,
    /// Matching the `PONG\r\n` echo; the index is the next expected byte.
    Pong(usize),
}

/// Parse faults. Either variant poisons the connection: once the byte
/// stream deviates from the dialect there is no way to find the next
/// reply boundary again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// A byte that fits no expected reply shape.
    Unexpected(u8),
    /// A complete reply arrived with no command outstanding.
    OutOfSync,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::Unexpected(byte) => {
                write!(f, "unexpected byte in reply stream: 0x{byte:02x}")
            }
            ParseError::OutOfSync => {
                write!(f, "reply received with no command outstanding")
            }
        }
    }
}

impl std::error::Error for ParseError {}

/// Per-connection reply accounting: parser state plus the count of
/// commands whose replies have not yet been consumed.
#[derive(Debug, Default)]
pub struct ReplyParser {
    state: ReplyState,
    outstanding: u64,
}

impl ReplyParser {
    /// Create a parser for a fresh connection: idle, nothing outstanding.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one command sent; its reply is now owed.
    pub fn note_sent(&mut self) {
        self.outstanding += 1;
    }

    /// Commands sent whose replies have not yet been consumed.
    pub fn outstanding(&self) -> u64 {
        self.outstanding
    }

    /// Current parser position.
    pub fn state(&self) -> ReplyState {
        self.state
    }

    /// Consume one read chunk, left to right.
    ///
    /// Returns `Ok(true)` if the `+PONG\r\n` echo completed somewhere in
    /// the chunk. A reply split across chunks resumes where the previous
    /// call left off.
    pub fn consume(&mut self, chunk: &[u8]) -> Result<bool, ParseError> {
        let mut pong_matched = false;
        for &byte in chunk {
            match self.state {
                ReplyState::Idle => match byte {
                    b':' => self.state = ReplyState::Integer,
                    b'+' => self.state = ReplyState::Pong(0),
                    other => return Err(ParseError::Unexpected(other)),
                },
                ReplyState::Integer => match byte {
                    b'0'..=b'9' | b'\r' => {}
                    b'\n' => {
                        if self.outstanding == 0 {
                            return Err(ParseError::OutOfSync);
                        }
                        self.outstanding -= 1;
                        self.state = ReplyState::Idle;
                    }
                    other => return Err(ParseError::Unexpected(other)),
                },
                ReplyState::Pong(i) => {
                    if byte != PONG_LITERAL[i] {
                        return Err(ParseError::Unexpected(byte));
                    }
                    if byte == b'\n' {
                        pong_matched = true;
                        self.state = ReplyState::Idle;
                    } else {
                        self.state = ReplyState::Pong(i + 1);
                    }
                }
            }
        }
        Ok(pong_matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_integer_reply() {
        let mut parser = ReplyParser::new();
        parser.note_sent();

        assert_eq!(parser.consume(b":5\r\n"), Ok(false));
        assert_eq!(parser.outstanding(), 0);
        assert_eq!(parser.state(), ReplyState::Idle);
    }

    #[test]
    fn test_chunk_splits_do_not_change_semantics() {
        // Every split of `:5\r\n` must land in the same final state.
        let stream = b":5\r\n";
        for split_at in 1..stream.len() {
            let mut parser = ReplyParser::new();
            parser.note_sent();

            assert_eq!(parser.consume(&stream[..split_at]), Ok(false));
            assert_eq!(parser.consume(&stream[split_at..]), Ok(false));
            assert_eq!(parser.outstanding(), 0);
            assert_eq!(parser.state(), ReplyState::Idle);
        }

        // Byte-at-a-time, too.
        let mut parser = ReplyParser::new();
        parser.note_sent();
        for &byte in stream.iter() {
            parser.consume(&[byte]).unwrap();
        }
        assert_eq!(parser.outstanding(), 0);
        assert_eq!(parser.state(), ReplyState::Idle);
    }

    #[test]
    fn test_pipelined_replies_in_one_chunk() {
        let mut parser = ReplyParser::new();
        for _ in 0..3 {
            parser.note_sent();
        }

        assert_eq!(parser.consume(b":0\r\n:1\r\n:12\r\n"), Ok(false));
        assert_eq!(parser.outstanding(), 0);
        assert_eq!(parser.state(), ReplyState::Idle);
    }

    #[test]
    fn test_reply_with_nothing_outstanding_is_out_of_sync() {
        let mut parser = ReplyParser::new();
        assert_eq!(parser.consume(b":0\r\n"), Err(ParseError::OutOfSync));
    }

    #[test]
    fn test_extra_reply_after_drain_is_out_of_sync() {
        let mut parser = ReplyParser::new();
        parser.note_sent();
        parser.consume(b":1\r\n").unwrap();
        assert_eq!(parser.consume(b":1\r\n"), Err(ParseError::OutOfSync));
    }

    #[test]
    fn test_pong_echo() {
        let mut parser = ReplyParser::new();
        assert_eq!(parser.consume(b"+PONG\r\n"), Ok(true));
        assert_eq!(parser.state(), ReplyState::Idle);
        // The echo is not a command reply; it settles nothing.
        assert_eq!(parser.outstanding(), 0);
    }

    #[test]
    fn test_pong_echo_split_across_chunks() {
        let mut parser = ReplyParser::new();
        assert_eq!(parser.consume(b"+PO"), Ok(false));
        assert_eq!(parser.state(), ReplyState::Pong(2));
        assert_eq!(parser.consume(b"NG\r\n"), Ok(true));
        assert_eq!(parser.state(), ReplyState::Idle);
    }

    #[test]
    fn test_pong_mismatch_is_fatal_at_the_bad_byte() {
        let mut parser = ReplyParser::new();
        assert_eq!(
            parser.consume(b"+PONX\r\n"),
            Err(ParseError::Unexpected(b'X'))
        );
    }

    #[test]
    fn test_trailing_garbage_after_pong_is_fatal() {
        let mut parser = ReplyParser::new();
        assert_eq!(
            parser.consume(b"+PONG\r\nX"),
            Err(ParseError::Unexpected(b'X'))
        );
    }

    #[test]
    fn test_unknown_type_marker_is_fatal() {
        let mut parser = ReplyParser::new();
        parser.note_sent();
        assert_eq!(parser.consume(b"-ERR\r\n"), Err(ParseError::Unexpected(b'-')));
    }

    #[test]
    fn test_junk_inside_integer_is_fatal() {
        let mut parser = ReplyParser::new();
        parser.note_sent();
        assert_eq!(parser.consume(b":1a\r\n"), Err(ParseError::Unexpected(b'a')));
    }

    #[test]
    fn test_empty_chunk_is_a_no_op() {
        let mut parser = ReplyParser::new();
        parser.note_sent();
        assert_eq!(parser.consume(b""), Ok(false));
        assert_eq!(parser.outstanding(), 1);
        assert_eq!(parser.state(), ReplyState::Idle);
    }
}
