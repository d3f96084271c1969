use bytes::BytesMut;

use crate::error::ProtocolError;
use crate::transport::Transport;

/// In-memory loopback transport: no socket, no I/O. Test code prefills the
///  receive buffer before triggering a read event, and inspects (or swaps)
///  the buffers to simulate a peer.
#[derive(Default)]
pub struct MemTransport {
    receive_buffer: BytesMut,
    send_buffer: BytesMut,
}

impl MemTransport {
    pub fn new() -> MemTransport {
        MemTransport::default()
    }
}

#[async_trait::async_trait]
impl Transport for MemTransport {
    async fn read_some(&mut self) -> Result<(), ProtocolError> {
        // the receive buffer holds whatever the test put there
        Ok(())
    }

    async fn write_some(&mut self) -> Result<(), ProtocolError> {
        // keep the send buffer around so tests can look at it
        Ok(())
    }

    fn rd_buf(&mut self) -> &mut BytesMut {
        &mut self.receive_buffer
    }

    fn wr_buf(&mut self) -> &mut BytesMut {
        &mut self.send_buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use rstest::rstest;
    use tokio::runtime::Builder;

    #[rstest]
    fn test_buffers_survive_io_calls() {
        let rt = Builder::new_current_thread().build().unwrap();
        rt.block_on(async {
            let mut transport = MemTransport::new();
            transport.rd_buf().put_slice(b"in");
            transport.wr_buf().put_slice(b"out");

            transport.read_some().await.unwrap();
            transport.write_some().await.unwrap();

            assert_eq!(transport.rd_buf().as_ref(), b"in");
            assert_eq!(transport.wr_buf().as_ref(), b"out");
        });
    }
}
