use thiserror::Error;

/// Everything that can go wrong between a socket event entering a broker and
///  a message leaving it.
///
/// `UnexpectedMessage` doubles as "a layer deferred the frame" (buffered it
///  and armed a timeout) and "there was nothing to deliver" - callers that
///  drive a broker from an event loop treat it as a non-fatal outcome of the
///  event, not as a reason to tear the connection down.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("transport i/o failure: {0}")]
    Io(#[from] std::io::Error),

    /// A stream transport read zero bytes: the peer closed its end.
    #[error("connection closed by peer")]
    PeerClosed,

    /// A layer was handed fewer bytes than its own header occupies.
    #[error("malformed {layer} header: {required} bytes required, {available} available")]
    MalformedHeader {
        layer: &'static str,
        required: usize,
        available: usize,
    },

    /// The event produced no message to hand to the application.
    #[error("no message to deliver")]
    UnexpectedMessage,

    /// The caller-supplied header writer failed or broke its size contract.
    #[error("header writer failed: {0}")]
    HeaderWriter(anyhow::Error),
}
