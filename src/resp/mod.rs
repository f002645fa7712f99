//! Client-side subset of the RESP wire protocol.
//!
//! Only the shapes this sink actually exchanges are modeled: outgoing
//! commands (PING, QUIT, PUBLISH arrays) and incoming integer or
//! `+PONG\r\n` replies.

pub mod command;
pub mod parser;
