//! Module that contains the token kinds and the frame format sent around the ring.
//!
//! Every ring message is a single signed 64-bit integer written big-endian:
//! the sign tells the token kind and the magnitude is the token's epoch.

use bytes::{Buf, BufMut, BytesMut};
use serde::{Deserialize, Serialize};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Size in bytes of one ring frame.
pub const FRAME_LEN: usize = 8;

/// Enum that represents the two tokens circulating on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Ping,
    Pong,
}

impl TokenKind {
    /// Function that classifies a received value. Zero is not a token.
    pub fn of(value: i64) -> Option<Self> {
        match value {
            v if v > 0 => Some(Self::Ping),
            v if v < 0 => Some(Self::Pong),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Ping => "PING",
            Self::Pong => "PONG",
        }
    }
}

/// Integer width written by the traffic injector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Width {
    Bits32,
    Bits64,
}

impl Width {
    /// Function that returns the big-endian bytes of `value` at this width.
    /// 32-bit values are truncated the way a narrowing cast would.
    pub fn encode(&self, value: i64) -> Vec<u8> {
        match self {
            Self::Bits32 => (value as i32).to_be_bytes().to_vec(),
            Self::Bits64 => value.to_be_bytes().to_vec(),
        }
    }
}

pub fn encode_value(value: i64) -> [u8; FRAME_LEN] {
    value.to_be_bytes()
}

pub fn decode_value(frame: [u8; FRAME_LEN]) -> i64 {
    i64::from_be_bytes(frame)
}

/// Codec that turns a byte stream into ring frames and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenCodec;

impl Decoder for TokenCodec {
    type Item = i64;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<i64>, io::Error> {
        if src.len() < FRAME_LEN {
            src.reserve(FRAME_LEN - src.len());
            return Ok(None);
        }
        Ok(Some(src.get_i64()))
    }
}

impl Encoder<i64> for TokenCodec {
    type Error = io::Error;

    fn encode(&mut self, value: i64, dst: &mut BytesMut) -> Result<(), io::Error> {
        dst.reserve(FRAME_LEN);
        dst.put_i64(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{SinkExt, StreamExt};
    use tokio::io::AsyncWriteExt;
    use tokio_util::codec::{FramedRead, FramedWrite};

    #[test]
    fn classifies_by_sign() {
        assert_eq!(TokenKind::of(3), Some(TokenKind::Ping));
        assert_eq!(TokenKind::of(-3), Some(TokenKind::Pong));
        assert_eq!(TokenKind::of(0), None);
    }

    #[test]
    fn frames_are_big_endian() {
        assert_eq!(encode_value(1), [0, 0, 0, 0, 0, 0, 0, 1]);
        assert_eq!(encode_value(-1), [0xff; 8]);
        for v in [1, -1, i64::MAX, i64::MIN, 42, -4096] {
            assert_eq!(decode_value(encode_value(v)), v);
        }
    }

    #[test]
    fn narrow_width_writes_four_bytes() {
        assert_eq!(Width::Bits32.encode(-2), vec![0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(Width::Bits64.encode(5).len(), FRAME_LEN);
    }

    #[test]
    fn decoder_waits_for_a_full_frame() {
        let mut codec = TokenCodec;
        let mut buf = BytesMut::from(&encode_value(-9)[..5]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(&encode_value(-9)[5..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(-9));
        assert!(buf.is_empty());
    }

    #[tokio::test]
    async fn framed_stream_carries_values_in_order() {
        let (client, server) = tokio::io::duplex(64);
        let mut writer = FramedWrite::new(client, TokenCodec);
        let mut reader = FramedRead::new(server, TokenCodec);

        writer.send(1).await.unwrap();
        writer.send(-1).await.unwrap();
        drop(writer);

        assert_eq!(reader.next().await.unwrap().unwrap(), 1);
        assert_eq!(reader.next().await.unwrap().unwrap(), -1);
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn partial_frame_at_eof_is_an_error() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FramedRead::new(server, TokenCodec);
        client.write_all(&[0, 0, 1]).await.unwrap();
        drop(client);
        assert!(reader.next().await.unwrap().is_err());
    }
}
