use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, close_code};

use crate::config::DenyMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    Closed,
    ReadFailed,
    Malformed,
    Unauthorized,
    StoreFailed,
    Evicted,
    WriteFailed,
}

impl Exit {
    pub fn is_denial(self) -> bool {
        matches!(self, Exit::Malformed | Exit::Unauthorized | Exit::StoreFailed)
    }
}

/// The only place that decides whether a denied client is told why.
pub fn closing_frame(mode: DenyMode, exit: Exit) -> Option<Message> {
    if mode == DenyMode::Silent || !exit.is_denial() {
        return None;
    }

    let (code, reason) = match exit {
        Exit::StoreFailed => (close_code::ERROR, "try again later"),
        Exit::Malformed => (close_code::POLICY, "malformed message"),
        _ => (close_code::POLICY, "invalid or expired token"),
    };

    Some(Message::Close(Some(CloseFrame {
        code,
        reason: Utf8Bytes::from_static(reason),
    })))
}
