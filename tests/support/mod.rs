//! In-memory test doubles for driving `accept` without sockets or crypto:
//! a scripted peer standing in for the reliable handshake layer, a record
//! layer over a loopback datagram queue, and configurable policy and
//! key-exchange fakes. Everything observable is behind `Rc<RefCell<...>>`
//! clones the test keeps after the real objects move into the driver.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use sha2::{Digest, Sha256};

use dserve::crypto::{calculate_master_secret, calculate_verify_data, PrfAlgorithm};
use dserve::message::{
    CertificateRequest, CipherSuite, ClientHello, CompressionMethod, Cookie, Extensions,
    MessageType, NewSessionTicket, ProtocolVersion, Random, ServerHello, SessionId,
    SupplementalDataEntry,
};
use dserve::{
    AlertDescription, Buf, Credentials, DatagramTransport, DtlsServerProtocol, DtlsTransport,
    Error, HandshakeMessage, KeyExchange, PendingCipher, RecordLayer, ReliableHandshake,
    ServerContext, ServerPolicy, ToBuf,
};

/// Premaster secret both sides of the scripted handshake agree on.
pub const PREMASTER: &[u8] = b"premaster secret bytes for tests";

/// Fixed client random used in every scripted ClientHello.
pub fn client_random() -> Random {
    Random::new(&[0x11; 32]).unwrap()
}

/// Everything the fakes record, in global order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Received(MessageType),
    Sent(MessageType),
    HelloComplete,
    InitPendingEpoch,
    Alert(AlertDescription),
    RecordLayerClosed,
    HandshakeFinished,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

/// The server's Finished verify_data as computed independently by the
/// scripted client, against what the driver actually sent.
pub struct FinishedExchange {
    pub expected: Vec<u8>,
    pub actual: Vec<u8>,
}

/// What the policy callbacks observed.
#[derive(Default)]
pub struct Observations {
    pub client_version: Option<ProtocolVersion>,
    pub offered_suites: Vec<CipherSuite>,
    pub offered_compressions: Vec<CompressionMethod>,
    pub secure_renegotiation: Option<bool>,
    pub client_extensions_seen: bool,
    pub client_supplemental: Option<Option<Vec<SupplementalDataEntry>>>,
    pub ticket_requested: bool,
    pub handshake_complete: bool,
}

/// One scripted client action, consumed per `receive_message` call.
pub enum Step {
    Message(MessageType, Vec<u8>),
    Finished { corrupt: bool },
}

/// Scripted stand-in for the reliable handshake layer: hands the driver the
/// scripted client flight, records the server flight, and keeps the
/// transcript hash over both directions the way the real layer would.
pub struct ScriptedClient {
    steps: VecDeque<Step>,
    transcript: Vec<u8>,
    negotiated: Option<(ProtocolVersion, CipherSuite)>,
    server_random: Option<Random>,
    sent: Rc<RefCell<Vec<(MessageType, Vec<u8>)>>>,
    finished_exchange: Rc<RefCell<Option<FinishedExchange>>>,
    log: Log,
}

impl ScriptedClient {
    pub fn new(
        steps: Vec<Step>,
        sent: Rc<RefCell<Vec<(MessageType, Vec<u8>)>>>,
        finished_exchange: Rc<RefCell<Option<FinishedExchange>>>,
        log: Log,
    ) -> ScriptedClient {
        ScriptedClient {
            steps: steps.into(),
            transcript: Vec::new(),
            negotiated: None,
            server_random: None,
            sent,
            finished_exchange,
            log,
        }
    }

    fn append_transcript(&mut self, msg_type: MessageType, body: &[u8]) {
        self.transcript.push(msg_type.as_u8());
        self.transcript
            .extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        self.transcript.extend_from_slice(body);
    }

    fn prf_algorithm(&self) -> PrfAlgorithm {
        let (version, suite) = self.negotiated.expect("ServerHello not yet observed");
        PrfAlgorithm::for_cipher_suite(suite, version)
    }

    fn master_secret(&self) -> Buf {
        let server_random = self.server_random.expect("ServerHello not yet observed");
        calculate_master_secret(
            self.prf_algorithm(),
            PREMASTER,
            &client_random(),
            &server_random,
        )
        .unwrap()
    }

    fn verify_data(&self, label: &str) -> Vec<u8> {
        calculate_verify_data(
            self.prf_algorithm(),
            &self.master_secret(),
            label,
            &self.current_hash(),
            12,
        )
        .unwrap()
    }
}

impl ReliableHandshake for ScriptedClient {
    fn receive_message(&mut self) -> Result<HandshakeMessage, Error> {
        let step = self.steps.pop_front().ok_or_else(|| {
            Error::from(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "script exhausted",
            ))
        })?;

        let (msg_type, body) = match step {
            Step::Message(msg_type, body) => (msg_type, body),
            Step::Finished { corrupt } => {
                // verify_data over the transcript before this Finished.
                let mut verify_data = self.verify_data("client finished");
                if corrupt {
                    verify_data[0] ^= 0x01;
                }
                (MessageType::Finished, verify_data)
            }
        };

        self.append_transcript(msg_type, &body);
        self.log.borrow_mut().push(Event::Received(msg_type));

        Ok(HandshakeMessage::new(msg_type, body))
    }

    fn send_message(&mut self, msg_type: MessageType, body: &[u8]) -> Result<(), Error> {
        if msg_type == MessageType::ServerHello {
            let (_, hello) = ServerHello::parse(body).expect("driver sent unparseable ServerHello");
            self.negotiated = Some((hello.server_version, hello.cipher_suite));
            self.server_random = Some(hello.random);
        }

        if msg_type == MessageType::Finished {
            // Independent check of the server's verify_data, over the
            // transcript before the server Finished is appended.
            let expected = self.verify_data("server finished");
            *self.finished_exchange.borrow_mut() = Some(FinishedExchange {
                expected,
                actual: body.to_vec(),
            });
        }

        self.append_transcript(msg_type, body);
        self.log.borrow_mut().push(Event::Sent(msg_type));
        self.sent.borrow_mut().push((msg_type, body.to_vec()));

        Ok(())
    }

    fn current_hash(&self) -> Vec<u8> {
        Sha256::digest(&self.transcript).to_vec()
    }

    fn notify_hello_complete(&mut self) {
        self.log.borrow_mut().push(Event::HelloComplete);
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.log.borrow_mut().push(Event::HandshakeFinished);
        Ok(())
    }
}

/// A datagram pipe backed by a queue the test can inspect.
pub struct LoopbackTransport {
    pub datagrams: Rc<RefCell<VecDeque<Vec<u8>>>>,
}

impl DatagramTransport for LoopbackTransport {
    fn receive_limit(&self) -> usize {
        1500
    }

    fn send_limit(&self) -> usize {
        1500
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        match self.datagrams.borrow_mut().pop_front() {
            Some(datagram) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(len)
            }
            None => Err(Error::from(io::Error::new(
                io::ErrorKind::WouldBlock,
                "no datagram queued",
            ))),
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.datagrams.borrow_mut().push_back(data.to_vec());
        Ok(())
    }

    fn close(&mut self) {}
}

/// Record layer fake: reports a configured discovered version, remembers
/// the pending cipher, logs alerts, and moves application data through the
/// loopback transport unprotected.
pub struct FakeRecordLayer {
    peer_version: Option<ProtocolVersion>,
    pending_cipher: Option<Box<dyn PendingCipher>>,
    transport: LoopbackTransport,
    log: Log,
}

impl FakeRecordLayer {
    pub fn new(
        peer_version: Option<ProtocolVersion>,
        transport: LoopbackTransport,
        log: Log,
    ) -> FakeRecordLayer {
        FakeRecordLayer {
            peer_version,
            pending_cipher: None,
            transport,
            log,
        }
    }
}

impl RecordLayer for FakeRecordLayer {
    fn discovered_peer_version(&self) -> Option<ProtocolVersion> {
        self.peer_version
    }

    fn init_pending_epoch(&mut self, cipher: Box<dyn PendingCipher>) {
        self.pending_cipher = Some(cipher);
        self.log.borrow_mut().push(Event::InitPendingEpoch);
    }

    fn send_alert(&mut self, description: AlertDescription) {
        self.log.borrow_mut().push(Event::Alert(description));
    }

    fn send(&mut self, data: &[u8]) -> Result<(), Error> {
        self.transport.send(data)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        self.transport.receive(buf)
    }

    fn close(&mut self) {
        self.log.borrow_mut().push(Event::RecordLayerClosed);
        self.transport.close();
    }
}

/// Pass-through pending cipher; record protection is out of scope here.
pub struct NullCipher;

impl PendingCipher for NullCipher {
    fn encrypt(&mut self, _seq: u64, plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(plaintext.to_vec())
    }

    fn decrypt(&mut self, _seq: u64, ciphertext: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(ciphertext.to_vec())
    }
}

/// Key exchange fake: records the call sequence and hands out the shared
/// premaster secret.
pub struct FakeKeyExchange {
    calls: Rc<RefCell<Vec<&'static str>>>,
    server_key_exchange: Option<Vec<u8>>,
    reject_certificate_verify: bool,
}

impl KeyExchange for FakeKeyExchange {
    fn init(&mut self, _context: &ServerContext) -> Result<(), Error> {
        self.calls.borrow_mut().push("init");
        Ok(())
    }

    fn process_server_credentials(&mut self, _credentials: &Credentials) -> Result<(), Error> {
        self.calls.borrow_mut().push("process_server_credentials");
        Ok(())
    }

    fn skip_server_credentials(&mut self) -> Result<(), Error> {
        self.calls.borrow_mut().push("skip_server_credentials");
        Ok(())
    }

    fn generate_server_key_exchange(&mut self) -> Result<Option<Vec<u8>>, Error> {
        self.calls.borrow_mut().push("generate_server_key_exchange");
        Ok(self.server_key_exchange.clone())
    }

    fn validate_certificate_request(
        &mut self,
        _request: &CertificateRequest,
    ) -> Result<(), Error> {
        self.calls.borrow_mut().push("validate_certificate_request");
        Ok(())
    }

    fn process_client_certificate(
        &mut self,
        _certificate: &dserve::message::Certificate,
    ) -> Result<(), Error> {
        self.calls.borrow_mut().push("process_client_certificate");
        Ok(())
    }

    fn skip_client_credentials(&mut self) -> Result<(), Error> {
        self.calls.borrow_mut().push("skip_client_credentials");
        Ok(())
    }

    fn process_client_key_exchange(&mut self, body: &mut &[u8]) -> Result<(), Error> {
        self.calls.borrow_mut().push("process_client_key_exchange");
        let consumed = *body;
        *body = &consumed[consumed.len()..];
        Ok(())
    }

    fn process_certificate_verify(
        &mut self,
        _signed: &dserve::message::DigitallySigned,
        transcript_hash: &[u8],
    ) -> Result<(), Error> {
        assert!(!transcript_hash.is_empty());
        self.calls.borrow_mut().push("process_certificate_verify");
        if self.reject_certificate_verify {
            return Err(Error::FatalAlert(
                AlertDescription::DecryptError,
                "signature check failed".into(),
            ));
        }
        Ok(())
    }

    fn generate_premaster_secret(&mut self) -> Result<Buf, Error> {
        self.calls.borrow_mut().push("generate_premaster_secret");
        Ok(PREMASTER.to_buf())
    }
}

/// Configurable server policy fake.
pub struct FakePolicy {
    pub server_version: ProtocolVersion,
    pub cipher_suite: CipherSuite,
    pub compression: CompressionMethod,
    pub extensions: Option<Extensions>,
    pub credentials: Option<Credentials>,
    pub certificate_request: Option<CertificateRequest>,
    pub supplemental: Option<Vec<SupplementalDataEntry>>,
    pub ticket: NewSessionTicket,
    pub server_key_exchange: Option<Vec<u8>>,
    pub reject_certificate_verify: bool,
    pub obs: Rc<RefCell<Observations>>,
    pub kx_calls: Rc<RefCell<Vec<&'static str>>>,
}

impl FakePolicy {
    pub fn new(cipher_suite: CipherSuite) -> FakePolicy {
        FakePolicy {
            server_version: ProtocolVersion::DTLS1_2,
            cipher_suite,
            compression: CompressionMethod::Null,
            extensions: None,
            credentials: None,
            certificate_request: None,
            supplemental: None,
            ticket: NewSessionTicket::new(3600, &[0xAB, 0xCD]),
            server_key_exchange: None,
            reject_certificate_verify: false,
            obs: Rc::new(RefCell::new(Observations::default())),
            kx_calls: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl ServerPolicy for FakePolicy {
    fn notify_client_version(&mut self, version: ProtocolVersion) -> Result<(), Error> {
        self.obs.borrow_mut().client_version = Some(version);
        Ok(())
    }

    fn notify_offered_cipher_suites(&mut self, suites: &[CipherSuite]) -> Result<(), Error> {
        self.obs.borrow_mut().offered_suites = suites.to_vec();
        Ok(())
    }

    fn notify_offered_compression_methods(
        &mut self,
        methods: &[CompressionMethod],
    ) -> Result<(), Error> {
        self.obs.borrow_mut().offered_compressions = methods.to_vec();
        Ok(())
    }

    fn notify_secure_renegotiation(&mut self, secure: bool) -> Result<(), Error> {
        self.obs.borrow_mut().secure_renegotiation = Some(secure);
        Ok(())
    }

    fn process_client_extensions(&mut self, _extensions: &Extensions) -> Result<(), Error> {
        self.obs.borrow_mut().client_extensions_seen = true;
        Ok(())
    }

    fn get_server_version(&mut self) -> Result<ProtocolVersion, Error> {
        Ok(self.server_version)
    }

    fn get_selected_cipher_suite(&mut self) -> Result<CipherSuite, Error> {
        Ok(self.cipher_suite)
    }

    fn get_selected_compression_method(&mut self) -> Result<CompressionMethod, Error> {
        Ok(self.compression)
    }

    fn get_server_extensions(&mut self) -> Result<Option<Extensions>, Error> {
        Ok(self.extensions.clone())
    }

    fn get_server_supplemental_data(
        &mut self,
    ) -> Result<Option<Vec<SupplementalDataEntry>>, Error> {
        Ok(self.supplemental.clone())
    }

    fn get_key_exchange(&mut self) -> Result<Box<dyn KeyExchange>, Error> {
        Ok(Box::new(FakeKeyExchange {
            calls: self.kx_calls.clone(),
            server_key_exchange: self.server_key_exchange.clone(),
            reject_certificate_verify: self.reject_certificate_verify,
        }))
    }

    fn get_credentials(&mut self) -> Result<Option<Credentials>, Error> {
        Ok(self.credentials.clone())
    }

    fn get_certificate_request(&mut self) -> Result<Option<CertificateRequest>, Error> {
        Ok(self.certificate_request.clone())
    }

    fn process_client_supplemental_data(
        &mut self,
        entries: Option<Vec<SupplementalDataEntry>>,
    ) -> Result<(), Error> {
        self.obs.borrow_mut().client_supplemental = Some(entries);
        Ok(())
    }

    fn get_cipher(&mut self, context: &ServerContext) -> Result<Box<dyn PendingCipher>, Error> {
        // The master secret must be in place before the epoch keys exist.
        context.security_parameters().master_secret()?;
        Ok(Box::new(NullCipher))
    }

    fn get_new_session_ticket(&mut self) -> Result<NewSessionTicket, Error> {
        self.obs.borrow_mut().ticket_requested = true;
        Ok(self.ticket.clone())
    }

    fn notify_handshake_complete(&mut self) -> Result<(), Error> {
        self.obs.borrow_mut().handshake_complete = true;
        Ok(())
    }
}

/// Clones of everything observable, retained by the test after the fakes
/// move into `accept`.
pub struct Harness {
    pub log: Log,
    pub sent: Rc<RefCell<Vec<(MessageType, Vec<u8>)>>>,
    pub obs: Rc<RefCell<Observations>>,
    pub kx_calls: Rc<RefCell<Vec<&'static str>>>,
    pub finished_exchange: Rc<RefCell<Option<FinishedExchange>>>,
    pub datagrams: Rc<RefCell<VecDeque<Vec<u8>>>>,
}

impl Harness {
    pub fn sent_body(&self, msg_type: MessageType) -> Option<Vec<u8>> {
        self.sent
            .borrow()
            .iter()
            .find(|(t, _)| *t == msg_type)
            .map(|(_, body)| body.clone())
    }

    pub fn sent_types(&self) -> Vec<MessageType> {
        self.sent.borrow().iter().map(|(t, _)| *t).collect()
    }

    pub fn alerts(&self) -> Vec<AlertDescription> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Alert(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

/// Run one scripted handshake against the driver.
pub fn run_handshake(
    protocol: &DtlsServerProtocol,
    policy: FakePolicy,
    steps: Vec<Step>,
) -> (
    Result<DtlsTransport<FakeRecordLayer, FakePolicy>, Error>,
    Harness,
) {
    let log: Log = Rc::new(RefCell::new(Vec::new()));
    let sent = Rc::new(RefCell::new(Vec::new()));
    let finished_exchange = Rc::new(RefCell::new(None));
    let datagrams = Rc::new(RefCell::new(VecDeque::new()));

    let harness = Harness {
        log: log.clone(),
        sent: sent.clone(),
        obs: policy.obs.clone(),
        kx_calls: policy.kx_calls.clone(),
        finished_exchange: finished_exchange.clone(),
        datagrams: datagrams.clone(),
    };

    let client = ScriptedClient::new(steps, sent, finished_exchange, log.clone());
    let transport = LoopbackTransport {
        datagrams: datagrams.clone(),
    };
    let record_layer = FakeRecordLayer::new(Some(ProtocolVersion::DTLS1_2), transport, log);

    let result = protocol.accept(policy, record_layer, client);

    (result, harness)
}

/// Serialized ClientHello body with the fixed client random, empty
/// session_id and cookie, and Null compression.
pub fn client_hello_body(
    version: ProtocolVersion,
    suites: &[CipherSuite],
    extensions: Option<Extensions>,
) -> Vec<u8> {
    let mut hello = ClientHello::new(
        version,
        client_random(),
        SessionId::empty(),
        Cookie::empty(),
        suites.to_vec(),
        vec![CompressionMethod::Null],
    );
    hello.extensions = extensions;

    let mut body = Vec::new();
    hello.serialize(&mut body);
    body
}
