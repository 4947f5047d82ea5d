//! Length-prefixed framing for stream transports.
//!
//! Every frame is a `u32` little-endian byte count followed by one encoded
//! [`MessageEvent`] body.

use crate::protocol::{DecodeError, EncodeError, MessageEvent};
use crate::MAX_FRAME_SIZE;
use thiserror::Error;

const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame of {0} bytes exceeds the {} byte limit", MAX_FRAME_SIZE)]
    TooLarge(usize),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Encodes `message` with its length header.
pub fn encode_frame(message: &MessageEvent) -> Result<Vec<u8>, FrameError> {
    let body = message.to_bytes()?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge(body.len()));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Reassembles frames from arbitrarily chunked input.
#[derive(Debug, Default)]
pub struct FrameReader {
    buf: Vec<u8>,
}

impl FrameReader {
    pub fn new() -> Self {
        FrameReader { buf: Vec::new() }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes received but not yet consumed as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Pops the next complete frame body, if one has fully arrived.
    ///
    /// An oversized length header is a transport failure: the stream cannot
    /// be resynchronised afterwards.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&self.buf[..HEADER_LEN]);
        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(FrameError::TooLarge(len));
        }
        if self.buf.len() < HEADER_LEN + len {
            return Ok(None);
        }
        let body = self.buf[HEADER_LEN..HEADER_LEN + len].to_vec();
        self.buf.drain(..HEADER_LEN + len);
        Ok(Some(body))
    }

    /// Pops and decodes the next frame. Decode failures are per message and
    /// leave the stream usable.
    pub fn next_message(&mut self) -> Result<Option<Result<MessageEvent, DecodeError>>, FrameError> {
        Ok(self.next_frame()?.map(|body| MessageEvent::from_bytes(&body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BombKind, Phase};
    use crate::protocol::{LoginPayload, ReasonCode};

    fn stream() -> (Vec<MessageEvent>, Vec<u8>) {
        let messages = vec![
            MessageEvent::JoinGame(LoginPayload::new("abc", "dora", 3)),
            MessageEvent::StartGame,
            MessageEvent::PlayerBomb(BombKind::Normal),
            MessageEvent::ChangePhase(Phase::Ready),
            MessageEvent::Chat("[dora] gl hf".to_string()),
            MessageEvent::Kicked(ReasonCode::EndKick),
        ];
        let bytes = messages
            .iter()
            .flat_map(|m| encode_frame(m).unwrap())
            .collect();
        (messages, bytes)
    }

    fn drain(reader: &mut FrameReader, out: &mut Vec<MessageEvent>) {
        while let Some(message) = reader.next_message().unwrap() {
            out.push(message.unwrap());
        }
    }

    #[test]
    fn test_frame_header_counts_body_bytes() {
        let frame = encode_frame(&MessageEvent::PauseGame(true)).unwrap();
        assert_eq!(frame, vec![2, 0, 0, 0, 20, 1]);
    }

    #[test]
    fn test_single_byte_chunks_match_contiguous_block() {
        let (messages, bytes) = stream();

        let mut whole = FrameReader::new();
        whole.push(&bytes);
        let mut from_block = Vec::new();
        drain(&mut whole, &mut from_block);

        let mut chunked = FrameReader::new();
        let mut from_chunks = Vec::new();
        for byte in &bytes {
            chunked.push(std::slice::from_ref(byte));
            drain(&mut chunked, &mut from_chunks);
        }

        assert_eq!(from_block, messages);
        assert_eq!(from_chunks, messages);
        assert_eq!(chunked.buffered(), 0);
    }

    #[test]
    fn test_partial_frame_waits_for_more_bytes() {
        let frame = encode_frame(&MessageEvent::PlayerDetonate(300)).unwrap();
        let mut reader = FrameReader::new();
        reader.push(&frame[..frame.len() - 1]);
        assert_eq!(reader.next_frame(), Ok(None));
        reader.push(&frame[frame.len() - 1..]);
        assert_eq!(
            reader.next_message().unwrap(),
            Some(Ok(MessageEvent::PlayerDetonate(300)))
        );
    }

    #[test]
    fn test_bad_body_does_not_poison_stream() {
        let mut reader = FrameReader::new();
        reader.push(&[1, 0, 0, 0, 99]);
        reader.push(&encode_frame(&MessageEvent::TimeUp).unwrap());
        assert!(matches!(reader.next_message(), Ok(Some(Err(_)))));
        assert_eq!(reader.next_message(), Ok(Some(Ok(MessageEvent::TimeUp))));
    }

    #[test]
    fn test_oversized_header_is_fatal() {
        let mut reader = FrameReader::new();
        reader.push(&(MAX_FRAME_SIZE as u32 + 1).to_le_bytes());
        assert_eq!(
            reader.next_frame(),
            Err(FrameError::TooLarge(MAX_FRAME_SIZE + 1))
        );
    }
}
