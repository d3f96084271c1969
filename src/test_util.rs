//! Test doubles and frame builders shared by the unit tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{BufMut, BytesMut};

use crate::broker::MessageDispatcher;
use crate::layer::EventSink;
use crate::timer::{TimeoutMsg, TimerService};
use crate::transport::Transport;

/// sink for layers that are expected not to touch the broker during an event
pub struct NullSink;

impl<M> EventSink<M> for NullSink {
    fn deliver(&mut self, _msg: M) {}

    fn set_timeout(&mut self, _after: Duration, _msg: TimeoutMsg) {}
}

/// records everything a layer pushes mid-event
pub struct SinkSpy<M> {
    pub delivered: Vec<M>,
    pub timeouts: Vec<(Duration, TimeoutMsg)>,
}

impl<M> Default for SinkSpy<M> {
    fn default() -> Self {
        SinkSpy {
            delivered: Vec::new(),
            timeouts: Vec::new(),
        }
    }
}

impl<M> EventSink<M> for SinkSpy<M> {
    fn deliver(&mut self, msg: M) {
        self.delivered.push(msg);
    }

    fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg) {
        self.timeouts.push((after, msg));
    }
}

/// dispatcher that appends every message to a shared list the test holds on to
pub struct RecordingDispatcher<M> {
    messages: Arc<Mutex<Vec<M>>>,
}

impl<M> RecordingDispatcher<M> {
    pub fn new() -> (RecordingDispatcher<M>, Arc<Mutex<Vec<M>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingDispatcher {
                messages: messages.clone(),
            },
            messages,
        )
    }
}

impl<M: Send + 'static> MessageDispatcher<M> for RecordingDispatcher<M> {
    fn on_message(&mut self, msg: M) {
        self.messages.lock().unwrap().push(msg);
    }
}

/// timer that records armed timeouts instead of scheduling them
pub struct RecordingTimer {
    timeouts: Arc<Mutex<Vec<(Duration, TimeoutMsg)>>>,
}

impl RecordingTimer {
    #[allow(clippy::type_complexity)]
    pub fn new() -> (RecordingTimer, Arc<Mutex<Vec<(Duration, TimeoutMsg)>>>) {
        let timeouts = Arc::new(Mutex::new(Vec::new()));
        (
            RecordingTimer {
                timeouts: timeouts.clone(),
            },
            timeouts,
        )
    }
}

impl TimerService for RecordingTimer {
    fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg) {
        self.timeouts.lock().unwrap().push((after, msg));
    }
}

/// application header plus payload, without the sequencing prefix
pub fn frame_body(from: u32, to: u32, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.put_u32_le(from);
    buf.put_u32_le(to);
    buf.put_slice(payload);
    buf.to_vec()
}

/// append a complete frame as it travels on the wire
pub fn put_frame(buf: &mut BytesMut, seq: u32, from: u32, to: u32, payload: &[u8]) {
    buf.put_u32_le(seq);
    buf.put_slice(&frame_body(from, to, payload));
}

/// swap a transport's send and receive buffers, simulating a symmetric peer
pub fn swap_buffers(transport: &mut dyn Transport) {
    let outbound = std::mem::take(transport.wr_buf());
    let inbound = std::mem::replace(transport.rd_buf(), outbound);
    *transport.wr_buf() = inbound;
}
