pub mod mem;
pub mod tcp;
pub mod udp;

use std::net::SocketAddr;

use bytes::BytesMut;

use crate::error::ProtocolError;

/// Socket boundary of a broker: owns the socket handle plus one receive and
///  one send buffer, and moves bytes between them and the wire. Everything
///  above this trait is byte-oriented and does not care which kind of socket
///  is underneath.
///
/// `read_some` overwrites the receive buffer with whatever the socket
///  produced; an empty buffer after a successful read means the peer closed
///  a stream connection (the broker reports that as [ProtocolError::PeerClosed]).
/// `write_some` transmits the entire send buffer and empties it on success.
#[async_trait::async_trait]
pub trait Transport: Send {
    async fn read_some(&mut self) -> Result<(), ProtocolError>;

    async fn write_some(&mut self) -> Result<(), ProtocolError>;

    fn rd_buf(&mut self) -> &mut BytesMut;

    fn wr_buf(&mut self) -> &mut BytesMut;
}

/// Server-side boundary: turns incoming connections into fresh transports.
///  The caller composes a stack + broker around each accepted transport and
///  hands it to its runtime; per-connection initialization lives there.
#[async_trait::async_trait]
pub trait Acceptor: Send {
    async fn accept(&mut self) -> Result<(SocketAddr, Box<dyn Transport>), ProtocolError>;
}
