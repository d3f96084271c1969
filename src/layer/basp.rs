use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::layer::{EventSink, HeaderWriter, ProtocolLayer};
use crate::timer::TimeoutMsg;

pub type ActorId = u32;

/// Application framing of the binary actor system protocol: source and
///  destination actor, serialized as two little-endian u32 with no padding.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BaspHeader {
    pub from: ActorId,
    pub to: ActorId,
}

impl BaspHeader {
    pub fn ser(&self, buf: &mut BytesMut) {
        buf.put_u32_le(self.from);
        buf.put_u32_le(self.to);
    }
}

/// A fully parsed application message. The payload is a cheap ref-counted
///  slice of the received frame, so handlers may keep it past the read event
///  without copying.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct BaspMessage {
    pub header: BaspHeader,
    pub payload: Bytes,
}

/// Innermost layer of the canonical stack. Stateless: it owns no timers and
///  buffers nothing.
#[derive(Debug, Default)]
pub struct Basp;

impl ProtocolLayer for Basp {
    type Message = BaspMessage;

    const HEADER_SIZE: usize = 2 * size_of::<ActorId>();
    const OFFSET: usize = Self::HEADER_SIZE;

    fn read(
        &mut self,
        _ctx: &mut dyn EventSink<BaspMessage>,
        frame: Bytes,
    ) -> Result<Option<BaspMessage>, ProtocolError> {
        if frame.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::MalformedHeader {
                layer: "basp",
                required: Self::HEADER_SIZE,
                available: frame.len(),
            });
        }

        let mut header_buf = frame.as_ref();
        let from = header_buf.get_u32_le();
        let to = header_buf.get_u32_le();

        Ok(Some(BaspMessage {
            header: BaspHeader { from, to },
            payload: frame.slice(Self::HEADER_SIZE..),
        }))
    }

    fn timeout(
        &mut self,
        _ctx: &mut dyn EventSink<BaspMessage>,
        _msg: &TimeoutMsg,
    ) -> Result<Option<BaspMessage>, ProtocolError> {
        Ok(None)
    }

    fn write_header(
        &mut self,
        buf: &mut BytesMut,
        running_offset: usize,
        hw: &mut HeaderWriter,
    ) -> Result<usize, ProtocolError> {
        let len_before = buf.len();
        if let Err(e) = hw(buf) {
            buf.truncate(len_before);
            return Err(ProtocolError::HeaderWriter(e));
        }

        let appended = buf.len().saturating_sub(len_before);
        if appended != Self::HEADER_SIZE {
            buf.truncate(len_before);
            return Err(ProtocolError::HeaderWriter(anyhow::anyhow!(
                "header writer appended {} bytes instead of {}",
                appended,
                Self::HEADER_SIZE,
            )));
        }
        Ok(running_offset + Self::HEADER_SIZE)
    }
}
