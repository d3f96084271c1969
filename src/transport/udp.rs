use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::net::UdpSocket;
use tracing::{info, trace, warn};

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::transport::Transport;

/// Datagram transport over a connected UDP socket: one datagram per read
///  event, one datagram per flush. Datagram boundaries are the framing the
///  sequencing layer relies on.
pub struct UdpTransport {
    socket: UdpSocket,
    receive_buffer: BytesMut,
    send_buffer: BytesMut,
    config: Arc<ProtocolConfig>,
}

impl UdpTransport {
    /// Bind a local socket and connect it to a single peer.
    pub async fn connect(
        local: SocketAddr,
        peer: SocketAddr,
        config: Arc<ProtocolConfig>,
    ) -> Result<UdpTransport, ProtocolError> {
        let socket = UdpSocket::bind(local).await?;
        socket.connect(peer).await?;
        info!(local = ?socket.local_addr()?, ?peer, "bound datagram transport");
        Ok(Self::from_socket(socket, config))
    }

    /// Wrap an already bound and connected socket.
    pub fn from_socket(socket: UdpSocket, config: Arc<ProtocolConfig>) -> UdpTransport {
        UdpTransport {
            socket,
            receive_buffer: BytesMut::new(),
            send_buffer: BytesMut::new(),
            config,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    async fn read_some(&mut self) -> Result<(), ProtocolError> {
        self.receive_buffer.clear();
        self.receive_buffer.resize(self.config.max_frame_size, 0);

        let num_read = self.socket.recv(self.receive_buffer.as_mut()).await?;
        self.receive_buffer.truncate(num_read);

        if num_read == self.config.max_frame_size {
            warn!(
                len = num_read,
                "datagram fills the configured maximum frame size and may have been truncated"
            );
        }
        trace!(len = num_read, "received datagram");
        Ok(())
    }

    async fn write_some(&mut self) -> Result<(), ProtocolError> {
        if self.send_buffer.is_empty() {
            return Ok(());
        }
        trace!(len = self.send_buffer.len(), "sending datagram");
        self.socket.send(self.send_buffer.as_ref()).await?;
        self.send_buffer.clear();
        Ok(())
    }

    fn rd_buf(&mut self) -> &mut BytesMut {
        &mut self.receive_buffer
    }

    fn wr_buf(&mut self) -> &mut BytesMut {
        &mut self.send_buffer
    }
}
