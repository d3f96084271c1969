use std::collections::BTreeMap;
use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, trace};

use crate::error::ProtocolError;
use crate::layer::{EventSink, HeaderWriter, ProtocolLayer};
use crate::timer::TimeoutMsg;

/// Timeout payload of the ordering layer: the sequence number that was
///  buffered out of order when the timer was armed.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OrderingTimeout {
    pub seq: u32,
}

/// Sequencing layer: prefixes every outgoing frame with a little-endian u32
///  sequence number and re-establishes sequence order on the receiving side.
///
/// Frames arriving ahead of the read cursor are buffered and a timeout is
///  armed for each; when the timeout fires before the gap closed, the layer
///  gives up on the missing sequence numbers and releases what it buffered.
/// Frames behind the cursor are duplicates of something already delivered
///  and are dropped.
///
/// One instance tracks exactly one peer; a fresh session starts at sequence
///  zero on both sides. Sequence numbers are compared linearly - a session
///  is assumed to stay far below the u32 range.
pub struct Ordering<Next> {
    next_seq_read: u32,
    next_seq_write: u32,
    /// received frames (ordering header already stripped) waiting for the
    ///  read cursor to catch up
    pending: BTreeMap<u32, Bytes>,
    pending_timeout: Duration,
    next: Next,
}

impl<Next: ProtocolLayer> Ordering<Next> {
    pub fn new(next: Next, pending_timeout: Duration) -> Ordering<Next> {
        Ordering {
            next_seq_read: 0,
            next_seq_write: 0,
            pending: BTreeMap::default(),
            pending_timeout,
            next,
        }
    }

    /// Release buffered frames as long as the read cursor points at one,
    ///  advancing the cursor past each.
    fn drain_pending(
        &mut self,
        ctx: &mut dyn EventSink<Next::Message>,
        slot: &mut Option<Next::Message>,
    ) -> Result<(), ProtocolError> {
        while let Some(frame) = self.pending.remove(&self.next_seq_read) {
            trace!(seq = self.next_seq_read, "releasing buffered frame");
            self.next_seq_read += 1;
            let fresh = self.next.read(ctx, frame)?;
            rotate(ctx, slot, fresh);
        }
        Ok(())
    }
}

/// Only one message fits on the return path, so earlier messages are pushed
///  through the sink as later ones arrive; the last one stays in `slot` for
///  the caller to hand up. This keeps deliveries in production order.
fn rotate<M>(ctx: &mut dyn EventSink<M>, slot: &mut Option<M>, fresh: Option<M>) {
    if let Some(fresh) = fresh {
        if let Some(previous) = slot.replace(fresh) {
            ctx.deliver(previous);
        }
    }
}

impl<Next: ProtocolLayer> ProtocolLayer for Ordering<Next> {
    type Message = Next::Message;

    const HEADER_SIZE: usize = size_of::<u32>();
    const OFFSET: usize = Next::OFFSET + Self::HEADER_SIZE;

    fn read(
        &mut self,
        ctx: &mut dyn EventSink<Next::Message>,
        frame: Bytes,
    ) -> Result<Option<Next::Message>, ProtocolError> {
        if frame.len() < Self::HEADER_SIZE {
            return Err(ProtocolError::MalformedHeader {
                layer: "ordering",
                required: Self::HEADER_SIZE,
                available: frame.len(),
            });
        }
        let seq = frame.as_ref().get_u32_le();
        let body = frame.slice(Self::HEADER_SIZE..);

        if seq == self.next_seq_read {
            self.next_seq_read += 1;
            let mut slot = self.next.read(ctx, body)?;
            self.drain_pending(ctx, &mut slot)?;
            Ok(slot)
        } else if seq > self.next_seq_read {
            debug!(
                seq,
                expected = self.next_seq_read,
                "out-of-order frame - buffering and arming timeout"
            );
            self.pending.insert(seq, body);
            ctx.set_timeout(self.pending_timeout, TimeoutMsg::new(OrderingTimeout { seq }));
            Ok(None)
        } else {
            debug!(
                seq,
                expected = self.next_seq_read,
                "frame behind the read cursor - dropping duplicate"
            );
            Ok(None)
        }
    }

    fn timeout(
        &mut self,
        ctx: &mut dyn EventSink<Next::Message>,
        msg: &TimeoutMsg,
    ) -> Result<Option<Next::Message>, ProtocolError> {
        let Some(&OrderingTimeout { seq }) = msg.downcast_ref::<OrderingTimeout>() else {
            return self.next.timeout(ctx, msg);
        };

        if !self.pending.contains_key(&seq) {
            // delivered in order before the timer fired
            trace!(seq, "timeout for a sequence that is no longer buffered - ignoring");
            return Ok(None);
        }

        debug!(
            seq,
            next_seq_read = self.next_seq_read,
            "timeout fired - giving up on the missing sequence numbers"
        );

        // Release everything buffered up to the timed-out frame in sequence
        //  order, skipping the holes we are giving up on, then any
        //  consecutive run behind it.
        let mut slot = None;
        let released: Vec<u32> = self.pending.range(..=seq).map(|(&s, _)| s).collect();
        for s in released {
            let frame = self.pending.remove(&s).expect("key was just collected from the map");
            self.next_seq_read = s + 1;
            let fresh = self.next.read(ctx, frame)?;
            rotate(ctx, &mut slot, fresh);
        }
        self.drain_pending(ctx, &mut slot)?;
        Ok(slot)
    }

    fn write_header(
        &mut self,
        buf: &mut BytesMut,
        running_offset: usize,
        hw: &mut HeaderWriter,
    ) -> Result<usize, ProtocolError> {
        buf.put_u32_le(self.next_seq_write);
        let total = self
            .next
            .write_header(buf, running_offset + Self::HEADER_SIZE, hw)?;
        self.next_seq_write += 1;
        Ok(total)
    }
}
