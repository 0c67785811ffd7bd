//! Decode-once codec for WebSocket messages.
//!
//! - Text frames => `Frame` (request or reply envelope)
//! - Binary frames are rejected: envelopes are JSON text
//! - Ping/Pong/Close are surfaced for lifecycle management

use axum::extract::ws::Message;
use mockwire_core::{
    error::{MockWireError, Result},
    protocol::{envelope::decode_frame, Frame},
};

#[derive(Debug)]
pub enum Inbound {
    Frame { frame: Frame, bytes_len: usize },
    Ping(Vec<u8>),
    Pong(Vec<u8>),
    Close,
}

/// Payload size before decoding, for the frame limit.
pub fn frame_len(msg: &Message) -> usize {
    match msg {
        Message::Text(s) => s.len(),
        Message::Binary(b) => b.len(),
        Message::Ping(v) => v.len(),
        Message::Pong(v) => v.len(),
        Message::Close(_) => 0,
    }
}

pub fn decode(msg: Message) -> Result<Inbound> {
    match msg {
        Message::Text(s) => {
            let bytes_len = s.len();
            let frame = decode_frame(&s)?;
            Ok(Inbound::Frame { frame, bytes_len })
        }
        Message::Binary(_) => Err(MockWireError::BadRequest("binary frames are not supported".into())),
        Message::Ping(v) => Ok(Inbound::Ping(v)),
        Message::Pong(v) => Ok(Inbound::Pong(v)),
        Message::Close(_) => Ok(Inbound::Close),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn text_request_decodes() {
        let msg = Message::Text(r#"{"id":3,"method":"handleRequest","data":{"url":"/a"}}"#.into());
        match decode(msg).unwrap() {
            Inbound::Frame { frame: Frame::Request(req), .. } => assert_eq!(req.id.get(), 3),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn binary_is_rejected() {
        let err = decode(Message::Binary(vec![1, 2, 3])).unwrap_err();
        assert_eq!(err.code().as_str(), "BAD_REQUEST");
    }
}
