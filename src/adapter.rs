//! The transport-side collaborators the driver consumes.
//!
//! The record layer (epoch handling, record protection, alert delivery) and
//! the reliable handshake layer (flight assembly, retransmission, transcript
//! hashing) live outside this crate; the driver only depends on the
//! operations below. A blocking `receive_message` is the driver's only
//! suspension point.

use crate::alert::AlertDescription;
use crate::error::Error;
use crate::message::{MessageType, ProtocolVersion};
use crate::policy::PendingCipher;

/// One reassembled handshake message: its type and the bare body, without
/// the DTLS handshake header (the reliable layer owns the framing).
#[derive(Debug)]
pub struct HandshakeMessage {
    pub msg_type: MessageType,
    pub body: Vec<u8>,
}

impl HandshakeMessage {
    pub fn new(msg_type: MessageType, body: Vec<u8>) -> Self {
        HandshakeMessage { msg_type, body }
    }
}

/// An unreliable datagram pipe. Record layer implementations sit on top of
/// this; the driver itself never touches it directly.
pub trait DatagramTransport {
    /// Largest datagram the transport can deliver.
    fn receive_limit(&self) -> usize;

    /// Largest datagram the transport accepts for sending.
    fn send_limit(&self) -> usize;

    /// Block for the next datagram. May time out with a transport error;
    /// timeouts are this layer's policy, not the driver's.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    fn send(&mut self, data: &[u8]) -> Result<(), Error>;

    fn close(&mut self);
}

/// The DTLS record layer: epochs, record protection, alerts.
pub trait RecordLayer {
    /// The protocol version observed on the peer's records, once any record
    /// has arrived.
    fn discovered_peer_version(&self) -> Option<ProtocolVersion>;

    /// Install record protection for the pending epoch. The epoch activates
    /// when the peer's ChangeCipherSpec arrives; between installation and
    /// activation the parameters are fixed.
    fn init_pending_epoch(&mut self, cipher: Box<dyn PendingCipher>);

    /// Best-effort delivery of a fatal alert. Failures are swallowed: by the
    /// time an alert goes out the handshake is already dead.
    fn send_alert(&mut self, description: AlertDescription);

    /// Send application data under the current epoch.
    fn send(&mut self, data: &[u8]) -> Result<(), Error>;

    /// Receive application data under the current epoch.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Tear down, including any pending epoch that never activated.
    fn close(&mut self);
}

/// The reliable handshake layer: reassembles flights from datagrams, hands
/// the driver whole messages in order, and keeps the running transcript
/// hash over every handshake message (with its framing) in both directions.
pub trait ReliableHandshake {
    /// Block until the peer's next complete handshake message. Retransmits
    /// of our own flights happen inside here, invisibly to the driver.
    fn receive_message(&mut self) -> Result<HandshakeMessage, Error>;

    /// Queue one handshake message of the current flight.
    fn send_message(&mut self, msg_type: MessageType, body: &[u8]) -> Result<(), Error>;

    /// Snapshot of the transcript hash over everything sent and received so
    /// far, in order.
    fn current_hash(&self) -> Vec<u8>;

    /// The hello exchange is complete; negotiated parameters (notably the
    /// PRF hash) are now fixed and the layer may collapse any buffered
    /// transcript into its digest.
    fn notify_hello_complete(&mut self);

    /// Flush the final flight and stop retransmission bookkeeping.
    fn finish(&mut self) -> Result<(), Error>;
}
