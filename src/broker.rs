use std::mem;
use std::time::Duration;

use bytes::BytesMut;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, span, trace, Level};
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::layer::{EventSink, HeaderWriter};
use crate::stack::ProtocolStack;
use crate::timer::{TimeoutMsg, TimerService};
use crate::transport::Transport;

/// Application boundary of a broker: every message the stack produces ends
///  up here, in the order the innermost layer produced it.
#[cfg_attr(test, automock)]
pub trait MessageDispatcher<M: 'static + Send>: Send {
    fn on_message(&mut self, msg: M);
}

/// The connection-local endpoint: owns one transport and one protocol stack
///  and routes events between them. Read events come in from the socket
///  side, timeout events from the timer side; both may produce application
///  messages for the dispatcher. All calls run on a single logical context -
///  nothing here is meant to be shared across threads.
pub struct Broker<M: 'static> {
    transport: Box<dyn Transport>,
    stack: Box<dyn ProtocolStack<M>>,
    dispatcher: Box<dyn MessageDispatcher<M>>,
    timer: Box<dyn TimerService>,
}

/// Transient view of the send buffer positioned past all reserved headers:
///  every byte appended through it is payload. It must not outlive the call
///  chain that produced it, and appending payload does not flush - sending
///  is an explicit, separate step.
#[derive(Debug)]
pub struct WriteHandle<'a> {
    pub buf: &'a mut BytesMut,
    pub header_offset: usize,
}

/// Bridges the layers' mid-event needs to the broker's collaborators without
///  handing the layers the whole broker.
struct BrokerEventSink<'a, M: 'static + Send> {
    dispatcher: &'a mut dyn MessageDispatcher<M>,
    timer: &'a mut dyn TimerService,
}

impl<'a, M: 'static + Send> EventSink<M> for BrokerEventSink<'a, M> {
    fn deliver(&mut self, msg: M) {
        self.dispatcher.on_message(msg);
    }

    fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg) {
        self.timer.set_timeout(after, msg);
    }
}

impl<M: 'static + Send> Broker<M> {
    pub fn new(
        transport: Box<dyn Transport>,
        stack: Box<dyn ProtocolStack<M>>,
        dispatcher: Box<dyn MessageDispatcher<M>>,
        timer: Box<dyn TimerService>,
    ) -> Broker<M> {
        Broker {
            transport,
            stack,
            dispatcher,
            timer,
        }
    }

    /// The socket became readable: pull bytes from the transport and run
    ///  them through the stack. Errors are reported to the caller and leave
    ///  the broker usable; in particular [ProtocolError::UnexpectedMessage]
    ///  just means this event delivered nothing (the frame may be buffered
    ///  inside a layer waiting for its predecessors).
    pub async fn read_event(&mut self) -> Result<(), ProtocolError> {
        self.transport.read_some().await?;

        let frame = {
            let receive_buffer = self.transport.rd_buf();
            if receive_buffer.is_empty() {
                debug!("read event produced no bytes - peer closed");
                return Err(ProtocolError::PeerClosed);
            }
            mem::take(receive_buffer).freeze()
        };

        let correlation_id = Uuid::new_v4();
        let span = span!(Level::TRACE, "read_event", ?correlation_id);
        let _entered = span.enter();
        trace!(len = frame.len(), "running received frame through the stack");

        let delivered = {
            let mut ctx = BrokerEventSink {
                dispatcher: self.dispatcher.as_mut(),
                timer: self.timer.as_mut(),
            };
            self.stack.read(&mut ctx, frame)?
        };

        match delivered {
            Some(msg) => {
                self.dispatcher.on_message(msg);
                Ok(())
            }
            None => Err(ProtocolError::UnexpectedMessage),
        }
    }

    /// A previously armed timeout came back from the timer service.
    pub fn timeout_event(&mut self, msg: &TimeoutMsg) -> Result<(), ProtocolError> {
        trace!(?msg, "timeout event");

        let delivered = {
            let mut ctx = BrokerEventSink {
                dispatcher: self.dispatcher.as_mut(),
                timer: self.timer.as_mut(),
            };
            self.stack.timeout(&mut ctx, msg)?
        };

        match delivered {
            Some(msg) => {
                self.dispatcher.on_message(msg);
                Ok(())
            }
            None => Err(ProtocolError::UnexpectedMessage),
        }
    }

    /// Reserve all stack headers in the send buffer and hand out a write
    ///  handle for appending payload. `hw` appends the innermost application
    ///  header when the stack reaches it. On failure the send buffer is
    ///  restored to its previous state.
    pub fn wr_buf(&mut self, hw: &mut HeaderWriter) -> Result<WriteHandle<'_>, ProtocolError> {
        let buf = self.transport.wr_buf();
        let restore_len = buf.len();

        match self.stack.write_header(&mut *buf, hw) {
            Ok(header_offset) => Ok(WriteHandle { buf, header_offset }),
            Err(e) => {
                buf.truncate(restore_len);
                Err(e)
            }
        }
    }

    /// The socket became writable: push out whatever the send buffer holds.
    pub async fn write_event(&mut self) -> Result<(), ProtocolError> {
        self.transport.write_some().await
    }

    /// Application-side send: transmit the send buffer now. For datagram
    ///  transports this closes the current frame, so write one message per
    ///  `wr_buf`/`flush` pair.
    pub async fn flush(&mut self) -> Result<(), ProtocolError> {
        self.transport.write_some().await
    }

    /// Arm a timeout that will come back through [Broker::timeout_event].
    pub fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg) {
        self.timer.set_timeout(after, msg);
    }

    pub fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    pub fn stack(&self) -> &dyn ProtocolStack<M> {
        self.stack.as_ref()
    }
}
