//! Composable protocol stack for actor-style broker endpoints.
//!
//! A [broker::Broker] owns one connection and routes bytes between a
//!  [transport::Transport] (socket plus send/receive buffers) and a stack of
//!  protocol layers arranged from outermost (wire) to innermost (application
//!  message). Each layer parses and strips its own header on the way in,
//!  writes its own header on the way out, and may buffer out-of-order frames
//!  and arm timeouts. The innermost layer produces a typed application
//!  message that the broker hands to its dispatcher.
//!
//! ## Design goals
//!
//! * Layers compose by value and are monomorphized against each other; the
//!   broker sees the finished nest through a single object-safe boundary
//!   ([stack::ProtocolStack]). Adding a layer costs no dispatch inside the
//!   stack.
//! * Layer code is synchronous and never blocks. Only the transport
//!   suspends, and only in its socket calls; how read/write readiness is
//!   scheduled is the runtime's business.
//! * Event outcomes are explicit: every read or timeout event either
//!   delivers, defers, or fails with a typed [error::ProtocolError]. A
//!   failed event never tears down the broker.
//! * One broker, one logical execution context. No internal locking, no
//!   cross-thread sharing of buffers.
//!
//! ## Canonical stack and wire format
//!
//! The canonical composition is `Ordering<Basp>`: a sequencing layer for
//!  datagram transports around the binary actor system protocol framing.
//!  Each datagram on the wire is
//!
//! ```ascii
//! offset  size  field
//! 0       4     seq_nr   (u32 LE) - per-session frame sequence number
//! 4       4     from     (u32 LE) - source actor
//! 8       4     to       (u32 LE) - destination actor
//! 12      *     payload
//! ```
//!
//! Both sides of a fresh session start at sequence number zero. Frames
//!  arriving ahead of the expected sequence number are buffered and armed
//!  with a timeout; when the timer fires before the gap closed, the receiver
//!  gives up on the missing numbers and releases what it buffered, in order.
//!
//! ## Write path
//!
//! Sending inverts the layering: [broker::Broker::wr_buf] walks the stack
//!  outermost-in, each layer appending its header to the send buffer, and
//!  the innermost layer calls back into the application-supplied header
//!  writer. The returned [broker::WriteHandle] is the send buffer positioned
//!  past all headers; everything appended through it is payload. Flushing is
//!  explicit - for datagram transports, one `wr_buf`/`flush` pair per frame.

pub mod broker;
pub mod config;
pub mod error;
pub mod layer;
pub mod stack;
pub mod timer;
pub mod transport;

#[cfg(test)]
pub mod test_util;

#[cfg(test)]
mod tests {
    use tracing::Level;

    #[ctor::ctor]
    fn init_test_logging() {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(Level::TRACE)
            .try_init()
            .ok();
    }
}
