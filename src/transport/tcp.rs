use std::net::SocketAddr;
use std::sync::Arc;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, trace};

use crate::config::ProtocolConfig;
use crate::error::ProtocolError;
use crate::transport::{Acceptor, Transport};

/// Stream transport: no framing of its own, so the layers on top must
///  self-delimit their frames. A read event pulls at most one configured
///  chunk from the socket; zero bytes read leaves the receive buffer empty,
///  which the broker reports as closed by peer.
pub struct TcpTransport {
    stream: TcpStream,
    receive_buffer: BytesMut,
    send_buffer: BytesMut,
    config: Arc<ProtocolConfig>,
}

impl TcpTransport {
    pub async fn connect(
        peer: SocketAddr,
        config: Arc<ProtocolConfig>,
    ) -> Result<TcpTransport, ProtocolError> {
        let stream = TcpStream::connect(peer).await?;
        info!(local = ?stream.local_addr()?, ?peer, "connected stream transport");
        Ok(Self::new(stream, config))
    }

    /// Wrap an already established connection (the acceptor side).
    pub fn new(stream: TcpStream, config: Arc<ProtocolConfig>) -> TcpTransport {
        TcpTransport {
            stream,
            receive_buffer: BytesMut::new(),
            send_buffer: BytesMut::new(),
            config,
        }
    }

    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.stream.peer_addr()
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn read_some(&mut self) -> Result<(), ProtocolError> {
        self.receive_buffer.clear();
        self.receive_buffer.resize(self.config.read_chunk_size, 0);

        let num_read = self.stream.read(self.receive_buffer.as_mut()).await?;
        self.receive_buffer.truncate(num_read);

        if num_read == 0 {
            debug!("stream read returned zero bytes - peer closed");
        } else {
            trace!(len = num_read, "received stream chunk");
        }
        Ok(())
    }

    async fn write_some(&mut self) -> Result<(), ProtocolError> {
        if self.send_buffer.is_empty() {
            return Ok(());
        }
        trace!(len = self.send_buffer.len(), "writing send buffer to stream");
        self.stream.write_all(self.send_buffer.as_ref()).await?;
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

/// Accept boundary for server sockets: one fresh [TcpTransport] per incoming
///  connection.
pub struct TcpAcceptor {
    listener: TcpListener,
    config: Arc<ProtocolConfig>,
}

impl TcpAcceptor {
    pub async fn bind(
        addr: SocketAddr,
        config: Arc<ProtocolConfig>,
    ) -> Result<TcpAcceptor, ProtocolError> {
        let listener = TcpListener::bind(addr).await?;
        info!(local = ?listener.local_addr()?, "listening for stream connections");
        Ok(TcpAcceptor { listener, config })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[async_trait::async_trait]
impl Acceptor for TcpAcceptor {
    async fn accept(&mut self) -> Result<(SocketAddr, Box<dyn Transport>), ProtocolError> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(?peer, "accepted connection");
        Ok((peer, Box::new(TcpTransport::new(stream, self.config.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use rstest::rstest;
    use tokio::runtime::Builder;

    #[rstest]
    fn test_stream_round_trip_through_acceptor() {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let config = Arc::new(ProtocolConfig::default_session());
            let mut acceptor = TcpAcceptor::bind("127.0.0.1:0".parse().unwrap(), config.clone())
                .await
                .unwrap();
            let server_addr = acceptor.local_addr().unwrap();

            let client = tokio::spawn(async move {
                let mut client = TcpTransport::connect(server_addr, config).await.unwrap();
                client.wr_buf().put_slice(b"hello over tcp");
                client.write_some().await.unwrap();
                client
            });

            let (_, mut accepted) = acceptor.accept().await.unwrap();
            accepted.read_some().await.unwrap();
            assert_eq!(accepted.rd_buf().as_ref(), b"hello over tcp");

            client.await.unwrap();
        });
    }

    #[rstest]
    fn test_peer_close_leaves_receive_buffer_empty() {
        let rt = Builder::new_current_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let config = Arc::new(ProtocolConfig::default_session());
            let mut acceptor = TcpAcceptor::bind("127.0.0.1:0".parse().unwrap(), config.clone())
                .await
                .unwrap();
            let server_addr = acceptor.local_addr().unwrap();

            let client = tokio::spawn(async move {
                let stream = TcpStream::connect(server_addr).await.unwrap();
                drop(stream);
            });

            let (_, mut accepted) = acceptor.accept().await.unwrap();
            client.await.unwrap();

            accepted.read_some().await.unwrap();
            assert!(accepted.rd_buf().is_empty());
        });
    }
}
