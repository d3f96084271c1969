use std::time::Duration;

use anyhow::bail;

pub struct ProtocolConfig {
    /// How long the ordering layer holds on to an out-of-order frame before
    ///  giving up on the sequence numbers in front of it and releasing the
    ///  buffered frame anyway.
    ///
    /// Choosing this too small releases frames while their predecessors are
    ///  merely late, which shows up to the application as gaps; choosing it
    ///  too big delays every message behind a genuinely lost frame by the
    ///  full timeout.
    pub pending_timeout: Duration,

    /// How many bytes a stream transport pulls from the socket per read
    ///  event. Stream transports have no framing of their own, so this is
    ///  purely a throughput/latency trade-off.
    pub read_chunk_size: usize,

    /// Upper bound for a single received frame. Datagram transports size
    ///  their receive buffer from this; a datagram larger than this cannot
    ///  be represented and is logged as (potentially) truncated.
    pub max_frame_size: usize,
}

impl ProtocolConfig {
    /// defaults for a single session over a typical LAN or loopback link
    pub fn default_session() -> ProtocolConfig {
        ProtocolConfig {
            pending_timeout: Duration::from_secs(2),
            read_chunk_size: 16 * 1024,
            max_frame_size: 64 * 1024,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.pending_timeout.is_zero() {
            bail!("pending timeout must be non-zero");
        }
        if self.read_chunk_size == 0 {
            bail!("read chunk size must be non-zero");
        }
        if self.max_frame_size == 0 {
            bail!("max frame size must be non-zero");
        }
        Ok(())
    }
}
