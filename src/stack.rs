use bytes::{Bytes, BytesMut};

use crate::error::ProtocolError;
use crate::layer::{EventSink, HeaderWriter, ProtocolLayer};
use crate::timer::TimeoutMsg;

/// A fully composed layer nest viewed through a uniform, object-safe
///  interface. The broker consumes this; it never sees the concrete nest.
pub trait ProtocolStack<M>: Send {
    fn read(
        &mut self,
        ctx: &mut dyn EventSink<M>,
        frame: Bytes,
    ) -> Result<Option<M>, ProtocolError>;

    fn timeout(
        &mut self,
        ctx: &mut dyn EventSink<M>,
        msg: &TimeoutMsg,
    ) -> Result<Option<M>, ProtocolError>;

    /// Append all reserved headers to `buf`, outermost first. Returns the
    ///  total number of header bytes, which equals [ProtocolStack::offset].
    fn write_header(
        &mut self,
        buf: &mut BytesMut,
        hw: &mut HeaderWriter,
    ) -> Result<usize, ProtocolError>;

    /// sum of all layers' header sizes
    fn offset(&self) -> usize;
}

/// Adapter that erases a statically composed layer nest once, at the stack
///  boundary. Calls between layers stay monomorphized; the broker pays a
///  single virtual dispatch per event.
pub struct LayerStack<L> {
    layer: L,
}

impl<L: ProtocolLayer> LayerStack<L> {
    pub fn new(layer: L) -> LayerStack<L> {
        LayerStack { layer }
    }
}

impl<L> ProtocolStack<L::Message> for LayerStack<L>
where
    L: ProtocolLayer + Send,
{
    fn read(
        &mut self,
        ctx: &mut dyn EventSink<L::Message>,
        frame: Bytes,
    ) -> Result<Option<L::Message>, ProtocolError> {
        self.layer.read(ctx, frame)
    }

    fn timeout(
        &mut self,
        ctx: &mut dyn EventSink<L::Message>,
        msg: &TimeoutMsg,
    ) -> Result<Option<L::Message>, ProtocolError> {
        self.layer.timeout(ctx, msg)
    }

    fn write_header(
        &mut self,
        buf: &mut BytesMut,
        hw: &mut HeaderWriter,
    ) -> Result<usize, ProtocolError> {
        self.layer.write_header(buf, 0, hw)
    }

    fn offset(&self) -> usize {
        L::OFFSET
    }
}
