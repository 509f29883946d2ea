//! FLAP socket I/O: framed reads and sequence-stamped writes.
//!
//! Each connection worker owns one [`FlapReader`] and one [`FlapWriter`].
//! The writer holds the connection-local sequence counter, widened to u32 so
//! emission never overflows; only the low 16 bits are wire-visible and the
//! counter is post-incremented exactly once per emission.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;
use crate::session::SnacMessage;
use oscar_proto::wire::{Marshal, from_bytes, to_bytes};
use oscar_proto::{FLAP_VERSION, FlapFrame, FlapFrameType, FlapSignonFrame, SnacHeader, TlvRestBlock, WireError};

/// Reads FLAP frames off a socket.
pub struct FlapReader<R> {
    reader: R,
}

impl<R: AsyncRead + Unpin> FlapReader<R> {
    /// Wraps a socket read half.
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Reads one complete frame: header, then exactly `payload_length`
    /// bytes. A bad start marker or truncated payload is fatal.
    pub async fn read_frame(&mut self) -> Result<(FlapFrame, Bytes), ServerError> {
        let mut header = [0u8; FlapFrame::HEADER_LEN];
        self.reader.read_exact(&mut header).await?;
        let flap: FlapFrame = from_bytes(&header)?;

        let mut payload = vec![0u8; usize::from(flap.payload_length)];
        self.reader.read_exact(&mut payload).await?;
        Ok((flap, Bytes::from(payload)))
    }
}

/// Writes sequence-stamped FLAP frames to a socket.
pub struct FlapWriter<W> {
    writer: W,
    sequence: u32,
}

impl<W: AsyncWrite + Unpin> FlapWriter<W> {
    /// Wraps a socket write half with the sequence counter at zero.
    pub fn new(writer: W) -> Self {
        Self { writer, sequence: 0 }
    }

    /// Current value of the widened sequence counter.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Emits one frame. The full buffer is written before returning; a
    /// partial write surfaces as an I/O error from the socket.
    async fn write_frame(
        &mut self,
        frame_type: FlapFrameType,
        payload: &[u8],
    ) -> Result<(), ServerError> {
        if payload.len() > usize::from(u16::MAX) {
            return Err(ServerError::Wire(WireError::PrefixOverflow {
                len: payload.len(),
                max: usize::from(u16::MAX),
            }));
        }
        let flap = FlapFrame {
            frame_type,
            sequence: (self.sequence & 0xFFFF) as u16,
            payload_length: payload.len() as u16,
        };
        let mut buf = BytesMut::with_capacity(FlapFrame::HEADER_LEN + payload.len());
        flap.marshal(&mut buf)?;
        buf.put_slice(payload);
        self.writer.write_all(&buf).await?;
        self.writer.flush().await?;
        self.sequence = self.sequence.wrapping_add(1);
        Ok(())
    }

    /// Sends the server's sign-on greeting: FLAP version, plus any TLVs.
    pub async fn send_signon(&mut self, tlvs: TlvRestBlock) -> Result<(), ServerError> {
        let signon = FlapSignonFrame { flap_version: FLAP_VERSION, tlvs };
        let payload = to_bytes(&signon)?;
        self.write_frame(FlapFrameType::SignOn, &payload).await
    }

    /// Sends an orderly sign-off frame.
    pub async fn send_signoff(&mut self) -> Result<(), ServerError> {
        self.write_frame(FlapFrameType::SignOff, &[]).await
    }

    /// The emit primitive: SNAC header then body inside one data frame.
    pub async fn send_snac(
        &mut self,
        header: &SnacHeader,
        body: &[u8],
    ) -> Result<(), ServerError> {
        let mut scratch = BytesMut::with_capacity(SnacHeader::LEN + body.len());
        header.marshal(&mut scratch)?;
        scratch.put_slice(body);
        self.write_frame(FlapFrameType::Data, &scratch).await
    }

    /// Emits a pre-marshaled SNAC message.
    pub async fn send_message(&mut self, msg: &SnacMessage) -> Result<(), ServerError> {
        self.send_snac(&msg.header, &msg.body).await
    }
}
