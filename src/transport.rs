use crate::adapter::RecordLayer;
use crate::policy::ServerPolicy;
use crate::Error;

/// An authenticated, encrypted datagram channel.
///
/// Returned by a successful [`accept`](crate::DtlsServerProtocol::accept);
/// owns the record layer and the server policy for the lifetime of the
/// session. Datagram semantics apply: sends and receives are whole
/// messages, never partial.
pub struct DtlsTransport<L, S> {
    record_layer: L,
    server: S,
}

impl<L, S> DtlsTransport<L, S>
where
    L: RecordLayer,
    S: ServerPolicy,
{
    pub(crate) fn new(record_layer: L, server: S) -> DtlsTransport<L, S> {
        DtlsTransport {
            record_layer,
            server,
        }
    }

    /// Send one application datagram under the established epoch.
    pub fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.record_layer.send(data)
    }

    /// Receive one application datagram. Returns the payload length.
    pub fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.record_layer.receive(buf)
    }

    /// The policy object that negotiated this session.
    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut S {
        &mut self.server
    }

    /// Tear the session down.
    pub fn close(mut self) {
        self.record_layer.close();
    }
}
