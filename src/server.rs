// DTLS server handshake flow driven here:
//
// 1. Client sends ClientHello
// 2. Server sends ServerHello, [SupplementalData], Certificate*,
//    ServerKeyExchange*, CertificateRequest*, ServerHelloDone
// 3. Client sends [SupplementalData], Certificate*, ClientKeyExchange,
//    CertificateVerify*, Finished
// 4. Server verifies Finished, then sends [NewSessionTicket], Finished
// 5. Handshake complete, application data can flow
//
// The HelloVerifyRequest cookie round trip happens below this driver, in
// whatever accepts datagrams before committing to a connection; the cookie
// field of the ClientHello is captured but not validated here.

use std::time::SystemTime;

use subtle::ConstantTimeEq;

use crate::adapter::{RecordLayer, ReliableHandshake};
use crate::alert::AlertDescription;
use crate::context::{SecurityParameters, ServerContext};
use crate::crypto::{calculate_master_secret, calculate_verify_data, PrfAlgorithm};
use crate::message::{
    assert_empty, Certificate, CertificateRequest, CertificateVerify, CipherSuite, ClientHello,
    CompressionMethod, Extensions, ExtensionType, Finished, MessageType, Random, ServerHello,
    SessionId, SupplementalData, SupplementalDataEntry,
};
use crate::policy::{KeyExchange, ServerPolicy};
use crate::transport::DtlsTransport;
use crate::Error;

/// The server-side DTLS handshake driver.
///
/// One instance can accept any number of connections; per-connection state
/// lives only inside [`DtlsServerProtocol::accept`].
pub struct DtlsServerProtocol {
    verify_requests: bool,
}

impl DtlsServerProtocol {
    pub fn new() -> DtlsServerProtocol {
        DtlsServerProtocol {
            verify_requests: true,
        }
    }

    /// Whether a client that answered our CertificateRequest with a
    /// certificate must also prove possession via CertificateVerify.
    /// Defaults to true.
    pub fn verify_requests(&self) -> bool {
        self.verify_requests
    }

    pub fn set_verify_requests(&mut self, verify_requests: bool) {
        self.verify_requests = verify_requests;
    }

    /// Negotiate a DTLS session with a connecting peer.
    ///
    /// Blocks until the handshake completes or fails; the only suspension
    /// points are the reliable handshake layer's `receive_message` calls.
    /// On success the record layer and the policy move into the returned
    /// transport. On failure the corresponding fatal alert is emitted
    /// through the record layer (when the transport still works), the
    /// pending epoch is torn down, and all secret-bearing buffers are wiped
    /// as the per-connection state drops.
    pub fn accept<S, L, H>(
        &self,
        mut server: S,
        mut record_layer: L,
        mut handshake: H,
    ) -> Result<DtlsTransport<L, S>, Error>
    where
        S: ServerPolicy,
        L: RecordLayer,
        H: ReliableHandshake,
    {
        let server_random = Random::generate(SystemTime::now());
        let security_parameters = SecurityParameters::new_server(server_random);
        let mut state = ServerHandshakeState::new(ServerContext::new(security_parameters));

        server.init(&state.context);

        match self.handshake(&mut state, &mut server, &mut record_layer, &mut handshake) {
            Ok(()) => {
                debug!("handshake complete");
                Ok(DtlsTransport::new(record_layer, server))
            }
            Err(err) => {
                if let Some(description) = err.alert_description() {
                    debug!("handshake failed, sending alert {}", description);
                    record_layer.send_alert(description);
                }
                record_layer.close();
                Err(err)
            }
        }
    }

    fn handshake<S, L, H>(
        &self,
        state: &mut ServerHandshakeState,
        server: &mut S,
        record_layer: &mut L,
        handshake: &mut H,
    ) -> Result<(), Error>
    where
        S: ServerPolicy,
        L: RecordLayer,
        H: ReliableHandshake,
    {
        let client_message = handshake.receive_message()?;

        // The first record from the client tells the record layer which
        // version the peer speaks; the ClientHello body refines it below.
        if let Some(version) = record_layer.discovered_peer_version() {
            state.context.set_client_version(version);
        }

        match client_message.msg_type {
            MessageType::ClientHello => {
                process_client_hello(state, server, &client_message.body)?
            }
            other => return Err(unexpected(other, "ClientHello")),
        }

        let server_hello = generate_server_hello(state, server)?;
        handshake.send_message(MessageType::ServerHello, &server_hello)?;

        {
            let suite = state.selected_cipher_suite()?;
            let version = state.context.server_version()?;
            let compression = state.selected_compression_method()?;

            let params = state.context.security_parameters_mut();
            params.set_prf_algorithm(PrfAlgorithm::for_cipher_suite(suite, version));
            params.set_compression_algorithm(compression);

            // The PRF hash is fixed now; the handshake layer can collapse
            // its buffered transcript into a digest.
            handshake.notify_hello_complete();
        }

        if let Some(entries) = server.get_server_supplemental_data()? {
            let body = generate_supplemental_data(entries);
            handshake.send_message(MessageType::SupplementalData, &body)?;
        }

        let mut key_exchange = server.get_key_exchange()?;
        key_exchange.init(&state.context)?;

        let server_credentials = server.get_credentials()?;
        match &server_credentials {
            None => key_exchange.skip_server_credentials()?,
            Some(credentials) => {
                key_exchange.process_server_credentials(credentials)?;

                let mut body = Vec::new();
                credentials.certificate.serialize(&mut body);
                handshake.send_message(MessageType::Certificate, &body)?;
            }
        }

        if let Some(server_key_exchange) = key_exchange.generate_server_key_exchange()? {
            handshake.send_message(MessageType::ServerKeyExchange, &server_key_exchange)?;
        }

        if server_credentials.is_some() {
            if let Some(certificate_request) = server.get_certificate_request()? {
                key_exchange.validate_certificate_request(&certificate_request)?;

                let mut body = Vec::new();
                certificate_request.serialize(&mut body);
                handshake.send_message(MessageType::CertificateRequest, &body)?;

                state.certificate_request = Some(certificate_request);
            }
        }

        handshake.send_message(MessageType::ServerHelloDone, &[])?;

        let mut client_message = handshake.receive_message()?;

        if client_message.msg_type == MessageType::SupplementalData {
            process_client_supplemental_data(server, &client_message.body)?;
            client_message = handshake.receive_message()?;
        } else {
            server.process_client_supplemental_data(None)?;
        }

        if client_message.msg_type == MessageType::Certificate {
            if state.certificate_request.is_none() {
                return Err(Error::alert(
                    AlertDescription::UnexpectedMessage,
                    "client Certificate without CertificateRequest",
                ));
            }
            process_client_certificate(state, key_exchange.as_mut(), &client_message.body)?;
            client_message = handshake.receive_message()?;
        } else {
            // Certificate is optional even when requested.
            key_exchange.skip_client_credentials()?;
        }

        match client_message.msg_type {
            MessageType::ClientKeyExchange => {
                process_client_key_exchange(state, key_exchange.as_mut(), &client_message.body)?
            }
            other => return Err(unexpected(other, "ClientKeyExchange")),
        }

        // Keys derived from the master secret are fixed from this point;
        // the client's Finished arrives under the freshly negotiated epoch.
        record_layer.init_pending_epoch(server.get_cipher(&state.context)?);

        // Snapshot excludes the client's Finished itself.
        let mut client_finished_hash = handshake.current_hash();
        client_message = handshake.receive_message()?;

        if client_message.msg_type == MessageType::CertificateVerify {
            process_certificate_verify(
                state,
                key_exchange.as_mut(),
                &client_message.body,
                &client_finished_hash,
            )?;

            client_finished_hash = handshake.current_hash();
            client_message = handshake.receive_message()?;
        } else if self.verify_requests && state.has_client_certificate() {
            return Err(Error::alert(
                AlertDescription::UnexpectedMessage,
                "client presented a certificate but sent no CertificateVerify",
            ));
        }

        match client_message.msg_type {
            MessageType::Finished => {
                let expected =
                    verify_data_for(state, "client finished", &client_finished_hash)?;
                process_finished(state, &client_message.body, &expected)?;
                trace!("client Finished verified");
            }
            other => return Err(unexpected(other, "Finished")),
        }

        if state.expect_session_ticket {
            let ticket = server.get_new_session_ticket()?;
            let mut body = Vec::new();
            ticket.serialize(&mut body);
            handshake.send_message(MessageType::NewSessionTicket, &body)?;
        }

        // Exclusive of our own Finished.
        let server_verify_data =
            verify_data_for(state, "server finished", &handshake.current_hash())?;
        let mut body = Vec::new();
        Finished::new(&server_verify_data).serialize(&mut body);
        handshake.send_message(MessageType::Finished, &body)?;

        handshake.finish()?;

        server.notify_handshake_complete()?;

        Ok(())
    }
}

impl Default for DtlsServerProtocol {
    fn default() -> Self {
        DtlsServerProtocol::new()
    }
}

/// Per-connection scratchpad. Created on `accept` entry, owned exclusively
/// by the driver, dropped (wiping secrets) on exit.
struct ServerHandshakeState {
    context: ServerContext,
    offered_cipher_suites: Vec<CipherSuite>,
    offered_compression_methods: Vec<CompressionMethod>,
    client_extensions: Option<Extensions>,
    server_extensions: Option<Extensions>,
    selected_cipher_suite: Option<CipherSuite>,
    selected_compression_method: Option<CompressionMethod>,
    secure_renegotiation: bool,
    expect_session_ticket: bool,
    certificate_request: Option<CertificateRequest>,
    client_certificate: Option<Certificate>,
}

impl ServerHandshakeState {
    fn new(context: ServerContext) -> ServerHandshakeState {
        ServerHandshakeState {
            context,
            offered_cipher_suites: Vec::new(),
            offered_compression_methods: Vec::new(),
            client_extensions: None,
            server_extensions: None,
            selected_cipher_suite: None,
            selected_compression_method: None,
            secure_renegotiation: false,
            expect_session_ticket: false,
            certificate_request: None,
            client_certificate: None,
        }
    }

    fn selected_cipher_suite(&self) -> Result<CipherSuite, Error> {
        self.selected_cipher_suite.ok_or_else(|| {
            Error::alert(
                AlertDescription::InternalError,
                "cipher suite not yet selected",
            )
        })
    }

    fn selected_compression_method(&self) -> Result<CompressionMethod, Error> {
        self.selected_compression_method.ok_or_else(|| {
            Error::alert(
                AlertDescription::InternalError,
                "compression method not yet selected",
            )
        })
    }

    fn has_client_certificate(&self) -> bool {
        self.client_certificate
            .as_ref()
            .map_or(false, |c| !c.is_empty())
    }
}

fn unexpected(got: MessageType, wanted: &str) -> Error {
    Error::alert(
        AlertDescription::UnexpectedMessage,
        format!("expected {}, got {:?}", wanted, got),
    )
}

/// The renegotiation_info extension payload: an opaque8 wrapping of
/// `renegotiated_connection` (RFC 5746 3.2).
fn create_renegotiation_info(renegotiated_connection: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + renegotiated_connection.len());
    out.push(renegotiated_connection.len() as u8);
    out.extend_from_slice(renegotiated_connection);
    out
}

/// RC4 suites are forbidden over DTLS regardless of what the policy says
/// (RFC 6347 4.1.2.2).
fn validate_selected_cipher_suite(
    suite: CipherSuite,
    alert: AlertDescription,
) -> Result<(), Error> {
    if suite.uses_rc4() {
        return Err(Error::alert(
            alert,
            format!("{:?} is a stream cipher suite, unusable over DTLS", suite),
        ));
    }
    Ok(())
}

fn process_client_hello<S: ServerPolicy>(
    state: &mut ServerHandshakeState,
    server: &mut S,
    body: &[u8],
) -> Result<(), Error> {
    let (rest, client_hello) = ClientHello::parse(body)?;
    assert_empty(rest)?;

    debug!(
        "ClientHello: version {:?}, {} suites, {} compression methods",
        client_hello.client_version,
        client_hello.cipher_suites.len(),
        client_hello.compression_methods.len()
    );

    state.context.set_client_version(client_hello.client_version);
    server.notify_client_version(client_hello.client_version)?;

    state
        .context
        .security_parameters_mut()
        .set_client_random(client_hello.random);

    // session_id and cookie are captured by the parse; no resumption, and
    // cookie validation happens below this layer.

    state.offered_cipher_suites = client_hello.cipher_suites;
    state.offered_compression_methods = client_hello.compression_methods;
    state.client_extensions = client_hello.extensions;

    server.notify_offered_cipher_suites(&state.offered_cipher_suites)?;
    server.notify_offered_compression_methods(&state.offered_compression_methods)?;

    // RFC 5746 3.6, server behavior on the initial handshake: the SCSV and
    // the renegotiation_info extension are equivalent signals.
    if state.offered_cipher_suites.iter().any(|s| s.is_scsv()) {
        state.secure_renegotiation = true;
    }

    if let Some(extensions) = &state.client_extensions {
        if let Some(reneg) = extensions.get(ExtensionType::RenegotiationInfo) {
            state.secure_renegotiation = true;

            // renegotiated_connection must be empty on an initial
            // handshake; compared in constant time.
            let expected = create_renegotiation_info(&[]);
            let is_empty: bool = reneg.ct_eq(&expected[..]).into();
            if !is_empty {
                return Err(Error::alert(
                    AlertDescription::HandshakeFailure,
                    "renegotiation_info not empty on initial handshake",
                ));
            }
        }
    }

    server.notify_secure_renegotiation(state.secure_renegotiation)?;

    if let Some(extensions) = &state.client_extensions {
        server.process_client_extensions(extensions)?;
    }

    Ok(())
}

fn generate_server_hello<S: ServerPolicy>(
    state: &mut ServerHandshakeState,
    server: &mut S,
) -> Result<Vec<u8>, Error> {
    let server_version = server.get_server_version()?;
    let client_version = state.context.client_version()?;
    if !server_version.is_equal_or_earlier_version_of(client_version) {
        return Err(Error::alert(
            AlertDescription::InternalError,
            format!(
                "policy chose {:?}, newer than client's {:?}",
                server_version, client_version
            ),
        ));
    }
    state.context.set_server_version(server_version);

    let selected_cipher_suite = server.get_selected_cipher_suite()?;
    if !state.offered_cipher_suites.contains(&selected_cipher_suite)
        || selected_cipher_suite.is_null()
        || selected_cipher_suite.is_scsv()
    {
        return Err(Error::alert(
            AlertDescription::InternalError,
            format!("policy selected unusable suite {:?}", selected_cipher_suite),
        ));
    }
    validate_selected_cipher_suite(selected_cipher_suite, AlertDescription::InternalError)?;

    let selected_compression_method = server.get_selected_compression_method()?;
    if !state
        .offered_compression_methods
        .contains(&selected_compression_method)
    {
        return Err(Error::alert(
            AlertDescription::InternalError,
            format!(
                "policy selected unoffered compression {:?}",
                selected_compression_method
            ),
        ));
    }

    state.selected_cipher_suite = Some(selected_cipher_suite);
    state.selected_compression_method = Some(selected_compression_method);

    debug!(
        "ServerHello: version {:?}, suite {:?}, compression {:?}",
        server_version, selected_cipher_suite, selected_compression_method
    );

    let mut server_extensions = server.get_server_extensions()?;

    if state.secure_renegotiation {
        let no_reneg_ext = server_extensions
            .as_ref()
            .map_or(true, |e| !e.contains(ExtensionType::RenegotiationInfo));

        if no_reneg_ext {
            // Answering the SCSV with an unsolicited empty
            // renegotiation_info is the one exception RFC 5746 3.6 carves
            // out of the no-unsolicited-extensions rule.
            server_extensions
                .get_or_insert_with(Extensions::new)
                .put(ExtensionType::RenegotiationInfo, create_renegotiation_info(&[]));
        }
    }

    if let Some(extensions) = &server_extensions {
        state.expect_session_ticket = extensions.contains(ExtensionType::SessionTicket);
    }

    let write_extensions = server_extensions
        .as_ref()
        .map_or(false, |e| !e.is_empty());

    // An empty session_id: sessions are not cached, resumption impossible.
    let hello = ServerHello::new(
        server_version,
        *state.context.security_parameters().server_random(),
        SessionId::empty(),
        selected_cipher_suite,
        selected_compression_method,
        if write_extensions {
            server_extensions.clone()
        } else {
            None
        },
    );

    let mut body = Vec::new();
    hello.serialize(&mut body);

    state.server_extensions = server_extensions;

    Ok(body)
}

fn generate_supplemental_data(entries: Vec<SupplementalDataEntry>) -> Vec<u8> {
    let mut body = Vec::new();
    SupplementalData::new(entries).serialize(&mut body);
    body
}

fn process_client_supplemental_data<S: ServerPolicy>(
    server: &mut S,
    body: &[u8],
) -> Result<(), Error> {
    let (rest, supplemental) = SupplementalData::parse(body)?;
    assert_empty(rest)?;

    server.process_client_supplemental_data(Some(supplemental.entries))
}

fn process_client_certificate(
    state: &mut ServerHandshakeState,
    key_exchange: &mut dyn KeyExchange,
    body: &[u8],
) -> Result<(), Error> {
    let (rest, certificate) = Certificate::parse(body)?;
    assert_empty(rest)?;

    trace!(
        "client Certificate with {} entries",
        certificate.certificate_list.len()
    );

    key_exchange.process_client_certificate(&certificate)?;
    state.client_certificate = Some(certificate);

    Ok(())
}

fn process_client_key_exchange(
    state: &mut ServerHandshakeState,
    key_exchange: &mut dyn KeyExchange,
    body: &[u8],
) -> Result<(), Error> {
    let mut cursor = body;
    key_exchange.process_client_key_exchange(&mut cursor)?;
    assert_empty(cursor)?;

    let premaster_secret = key_exchange.generate_premaster_secret()?;

    let params = state.context.security_parameters();
    let prf_algorithm = params.prf_algorithm()?;
    let client_random = *params.client_random()?;
    let server_random = *params.server_random();

    let master_secret = calculate_master_secret(
        prf_algorithm,
        &premaster_secret,
        &client_random,
        &server_random,
    )?;

    state
        .context
        .security_parameters_mut()
        .set_master_secret(master_secret);

    Ok(())
}

fn process_certificate_verify(
    state: &mut ServerHandshakeState,
    key_exchange: &mut dyn KeyExchange,
    body: &[u8],
    transcript_hash: &[u8],
) -> Result<(), Error> {
    if !state.has_client_certificate() {
        return Err(Error::alert(
            AlertDescription::UnexpectedMessage,
            "CertificateVerify without a client certificate",
        ));
    }

    let (rest, certificate_verify) = CertificateVerify::parse(body)?;
    assert_empty(rest)?;

    key_exchange.process_certificate_verify(&certificate_verify.signed, transcript_hash)
}

fn process_finished(
    state: &ServerHandshakeState,
    body: &[u8],
    expected_verify_data: &[u8],
) -> Result<(), Error> {
    let verify_data_length = state.context.security_parameters().verify_data_length();
    let (rest, finished) = Finished::parse(body, verify_data_length)?;
    assert_empty(rest)?;

    let matches: bool = finished.verify_data.ct_eq(expected_verify_data).into();
    if !matches {
        return Err(Error::alert(
            AlertDescription::DecryptError,
            "Finished verify_data mismatch",
        ));
    }

    Ok(())
}

fn verify_data_for(
    state: &ServerHandshakeState,
    label: &str,
    transcript_hash: &[u8],
) -> Result<Vec<u8>, Error> {
    let params = state.context.security_parameters();
    calculate_verify_data(
        params.prf_algorithm()?,
        params.master_secret()?,
        label,
        transcript_hash,
        params.verify_data_length(),
    )
}
