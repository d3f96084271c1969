pub mod basp;
pub mod ordering;

use std::time::Duration;

use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::timer::TimeoutMsg;

/// Caller-supplied callback that appends the innermost application header.
///  It must append exactly the innermost layer's declared header size; the
///  error channel is untyped since the callback belongs to application code.
pub type HeaderWriter = dyn FnMut(&mut BytesMut) -> anyhow::Result<()>;

/// The slice of broker capability a layer may use while it is handling an
///  event: dispatch a message directly to the application handler, or arm a
///  timeout that will re-enter the stack later.
///
/// Direct dispatch exists because a single read event can unblock several
///  buffered messages at once, while only one message can travel back up the
///  return path.
pub trait EventSink<M> {
    fn deliver(&mut self, msg: M);

    fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg);
}

/// One tier of a protocol stack.
///
/// Layers compose by value: a wrapper layer owns its inner layer as a field,
///  strips its own header on `read` before delegating inward, and writes its
///  own header on `write_header` before recursing inward. The innermost
///  layer defines the message type the whole stack produces; wrappers
///  re-export it unchanged.
pub trait ProtocolLayer {
    type Message: 'static;

    /// serialized size of this layer's own header
    const HEADER_SIZE: usize;

    /// total header bytes from this layer inward (`Next::OFFSET + HEADER_SIZE`)
    const OFFSET: usize;

    /// Parse and strip this layer's header from the front of `frame`, then
    ///  either consume the frame (buffer it, drop it) and return `Ok(None)`,
    ///  or delegate the remainder inward and hand the result up.
    fn read(
        &mut self,
        ctx: &mut dyn EventSink<Self::Message>,
        frame: Bytes,
    ) -> Result<Option<Self::Message>, ProtocolError>;

    /// Handle a timeout if it belongs to this layer, otherwise delegate
    ///  inward. `Ok(None)` means the timeout produced nothing to deliver.
    fn timeout(
        &mut self,
        ctx: &mut dyn EventSink<Self::Message>,
        msg: &TimeoutMsg,
    ) -> Result<Option<Self::Message>, ProtocolError>;

    /// Append this layer's header to `buf` and recurse inward; the innermost
    ///  layer invokes `hw` to append the application header. Returns
    ///  `running_offset` plus every header byte appended from this layer
    ///  inward, so the outermost call yields the stack's total header size.
    fn write_header(
        &mut self,
        buf: &mut BytesMut,
        running_offset: usize,
        hw: &mut HeaderWriter,
    ) -> Result<usize, ProtocolError>;
}
