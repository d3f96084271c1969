use std::any::Any;
use std::fmt::{Debug, Formatter};
use std::time::Duration;

use tokio::sync::mpsc;

/// An opaque message a layer hands to the timer service and later receives
///  back through `Broker::timeout_event`. Each layer defines its own payload
///  type and recognizes its timeouts by downcasting, so layers never need to
///  know about each other's timers.
pub struct TimeoutMsg(Box<dyn Any + Send>);

impl TimeoutMsg {
    pub fn new<T: Any + Send>(payload: T) -> TimeoutMsg {
        TimeoutMsg(Box::new(payload))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl Debug for TimeoutMsg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimeoutMsg({:?})", self.0.as_ref().type_id())
    }
}

/// Boundary to whatever schedules delayed redelivery. Arming a timeout must
///  not block; the runtime owning the broker is responsible for feeding the
///  message back through `Broker::timeout_event` once the delay elapsed.
pub trait TimerService: Send {
    fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg);
}

/// Timer adapter for tokio-driven brokers: every armed timeout becomes a
///  delayed message in an unbounded channel. The task driving the broker
///  selects over the receiver and calls `timeout_event` for each message
///  that pops out.
///
/// Must be used from within a tokio runtime.
pub struct DelayTimer {
    tx: mpsc::UnboundedSender<TimeoutMsg>,
}

impl DelayTimer {
    pub fn new() -> (DelayTimer, mpsc::UnboundedReceiver<TimeoutMsg>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (DelayTimer { tx }, rx)
    }
}

impl TimerService for DelayTimer {
    fn set_timeout(&mut self, after: Duration, msg: TimeoutMsg) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // the receiving side may be gone during shutdown
            let _ = tx.send(msg);
        });
    }
}
