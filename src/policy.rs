//! The pluggable surfaces the handshake driver drives: server policy,
//! key exchange and credentials.
//!
//! These are pure collaborators. The driver owns the call order and the
//! validation of everything a policy hands back; a policy owns the choices
//! (versions, suites, extensions, tickets) and the key material.

use crate::buffer::Buf;
use crate::context::ServerContext;
use crate::error::Error;
use crate::message::{
    Certificate, CertificateRequest, CipherSuite, CompressionMethod, DigitallySigned, Extensions,
    NewSessionTicket, ProtocolVersion, SupplementalDataEntry,
};

/// Server-side credentials: the certificate chain presented to the peer.
///
/// Signing happens inside the key exchange the policy supplies, so the
/// driver only ever needs the chain itself.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub certificate: Certificate,
}

impl Credentials {
    pub fn new(certificate: Certificate) -> Self {
        Credentials { certificate }
    }
}

/// Record-protection state for the pending epoch.
///
/// The driver treats this as opaque: it is created by the policy once the
/// master secret exists and handed to the record layer, which activates it
/// when the epoch flips.
pub trait PendingCipher {
    /// Protect one record payload under the pending epoch keys.
    fn encrypt(&mut self, seq: u64, plaintext: &[u8]) -> Result<Vec<u8>, Error>;

    /// Unprotect one record payload received under the pending epoch.
    fn decrypt(&mut self, seq: u64, ciphertext: &[u8]) -> Result<Vec<u8>, Error>;
}

/// The decisions a server makes during the handshake.
///
/// The driver invokes these strictly in the documented order, one call at a
/// time, never concurrently:
/// `init`, `notify_client_version`, `notify_offered_cipher_suites`,
/// `notify_offered_compression_methods`, `notify_secure_renegotiation`,
/// `process_client_extensions`, `get_server_version`,
/// `get_selected_cipher_suite`, `get_selected_compression_method`,
/// `get_server_extensions`, `get_server_supplemental_data`,
/// `get_key_exchange`, `get_credentials`, `get_certificate_request` (only
/// with credentials), `process_client_supplemental_data`, `get_cipher`,
/// `get_new_session_ticket` (only when announced), and finally
/// `notify_handshake_complete`.
pub trait ServerPolicy {
    /// Observe the freshly created context. Called once, before any message
    /// is read.
    fn init(&mut self, _context: &ServerContext) {}

    fn notify_client_version(&mut self, _version: ProtocolVersion) -> Result<(), Error> {
        Ok(())
    }

    fn notify_offered_cipher_suites(&mut self, _suites: &[CipherSuite]) -> Result<(), Error> {
        Ok(())
    }

    fn notify_offered_compression_methods(
        &mut self,
        _methods: &[CompressionMethod],
    ) -> Result<(), Error> {
        Ok(())
    }

    fn notify_secure_renegotiation(&mut self, _secure: bool) -> Result<(), Error> {
        Ok(())
    }

    /// The client's extensions block. Only called when the ClientHello
    /// carried one.
    fn process_client_extensions(&mut self, _extensions: &Extensions) -> Result<(), Error> {
        Ok(())
    }

    /// The protocol version for the ServerHello. Must not be newer than the
    /// client's version; the driver enforces this.
    fn get_server_version(&mut self) -> Result<ProtocolVersion, Error>;

    /// The cipher suite for the ServerHello. Must come from the offered
    /// list; the driver enforces this.
    fn get_selected_cipher_suite(&mut self) -> Result<CipherSuite, Error>;

    /// The compression method for the ServerHello. Must come from the
    /// offered list; the driver enforces this.
    fn get_selected_compression_method(&mut self) -> Result<CompressionMethod, Error>;

    /// Extensions for the ServerHello. The driver appends an empty
    /// renegotiation_info if secure renegotiation was signalled and the
    /// policy did not include one itself.
    fn get_server_extensions(&mut self) -> Result<Option<Extensions>, Error> {
        Ok(None)
    }

    /// Supplemental data to send after the ServerHello (RFC 4680).
    fn get_server_supplemental_data(
        &mut self,
    ) -> Result<Option<Vec<SupplementalDataEntry>>, Error> {
        Ok(None)
    }

    /// The key exchange driving ServerKeyExchange/ClientKeyExchange for the
    /// selected suite.
    fn get_key_exchange(&mut self) -> Result<Box<dyn KeyExchange>, Error>;

    /// Server credentials, or `None` for anonymous/PSK-style suites.
    fn get_credentials(&mut self) -> Result<Option<Credentials>, Error> {
        Ok(None)
    }

    /// Request a client certificate. Only consulted when credentials were
    /// presented.
    fn get_certificate_request(&mut self) -> Result<Option<CertificateRequest>, Error> {
        Ok(None)
    }

    /// The client's supplemental data, or `None` when the client sent none.
    /// Called exactly once either way.
    fn process_client_supplemental_data(
        &mut self,
        _entries: Option<Vec<SupplementalDataEntry>>,
    ) -> Result<(), Error> {
        Ok(())
    }

    /// Build the record protection for the pending epoch. Called once the
    /// master secret is in the context.
    fn get_cipher(&mut self, context: &ServerContext) -> Result<Box<dyn PendingCipher>, Error>;

    /// A fresh session ticket. Only called when the server extensions
    /// announced SessionTicket.
    fn get_new_session_ticket(&mut self) -> Result<NewSessionTicket, Error> {
        Ok(NewSessionTicket::new(0, &[]))
    }

    fn notify_handshake_complete(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// The algorithm-specific half of the handshake.
///
/// The driver picks the `skip_*` or `process_*` variant of each pair based
/// on whether credentials and client certificates are present, then pulls
/// the premaster secret to establish the master secret.
pub trait KeyExchange {
    fn init(&mut self, context: &ServerContext) -> Result<(), Error>;

    fn process_server_credentials(&mut self, credentials: &Credentials) -> Result<(), Error>;

    fn skip_server_credentials(&mut self) -> Result<(), Error>;

    /// The ServerKeyExchange body, or `None` when the algorithm does not
    /// send one (e.g. plain RSA key transport).
    fn generate_server_key_exchange(&mut self) -> Result<Option<Vec<u8>>, Error>;

    /// Check that the certificate request is compatible with the algorithm
    /// before it goes on the wire.
    fn validate_certificate_request(&mut self, request: &CertificateRequest) -> Result<(), Error>;

    fn process_client_certificate(&mut self, certificate: &Certificate) -> Result<(), Error>;

    fn skip_client_credentials(&mut self) -> Result<(), Error>;

    /// Consume the ClientKeyExchange body. The cursor must be fully
    /// consumed; the driver fails with decode_error otherwise.
    fn process_client_key_exchange(&mut self, body: &mut &[u8]) -> Result<(), Error>;

    /// Verify the client's CertificateVerify signature over
    /// `transcript_hash` using the certificate received earlier. A failed
    /// signature must surface as decrypt_error.
    fn process_certificate_verify(
        &mut self,
        signed: &DigitallySigned,
        transcript_hash: &[u8],
    ) -> Result<(), Error>;

    /// Yield the premaster secret for master secret derivation. Called once,
    /// after the ClientKeyExchange was processed.
    fn generate_premaster_secret(&mut self) -> Result<Buf, Error>;
}
