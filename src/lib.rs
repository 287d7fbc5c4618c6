//! dserve — server-side DTLS handshake driver
//!
//! dserve negotiates the server half of a DTLS 1.0/1.2 handshake over an
//! already-established datagram transport and yields an authenticated,
//! encrypted datagram channel. It is the *driver* only: message sequencing,
//! wire validation, negotiation policy enforcement, transcript bookkeeping
//! for the Finished exchange, and the pending-to-current epoch handover.
//! Everything algorithmic or transport-shaped plugs in from outside.
//!
//! # Goals
//! - **Sequencing correctness**: exactly one acceptable peer message per
//!   state; anything else is a fatal `unexpected_message`.
//! - **Alert fidelity**: every validation failure maps to the exact RFC 5246
//!   alert description.
//! - **Safety**: `forbid(unsafe_code)`; constant-time comparison for every
//!   secret-influenced equality; secrets wiped on all failure paths.
//!
//! ## Non-goals
//! - The client-side handshake
//! - Session resumption (beyond issuing a NewSessionTicket)
//! - Renegotiation
//! - The HelloVerifyRequest cookie exchange (belongs below this driver)
//! - Record protection algorithms, key exchange arithmetic, certificate
//!   chain validation (all supplied by the embedding stack)
//!
//! # Collaborators
//!
//! Three traits describe what the driver consumes:
//! - [`ReliableHandshake`] — reassembled handshake messages in order, plus
//!   the running transcript hash. Retransmission lives here.
//! - [`RecordLayer`] — epochs, record protection, alert delivery.
//! - [`DatagramTransport`] — the raw unreliable pipe underneath the record
//!   layer.
//!
//! Two more describe what the server plugs in:
//! - [`ServerPolicy`] — version/suite/extension choices, credentials,
//!   session tickets, and the pending-epoch cipher.
//! - [`KeyExchange`] — the algorithm-specific message handling and the
//!   premaster secret.
//!
//! # Example
//!
//! ```rust,no_run
//! use dserve::{DtlsServerProtocol, Error};
//! # use dserve::{ServerPolicy, RecordLayer, ReliableHandshake};
//! # fn example<S, L, H>(policy: S, record_layer: L, handshake: H) -> Result<(), Error>
//! # where S: ServerPolicy, L: RecordLayer, H: ReliableHandshake {
//! let protocol = DtlsServerProtocol::new();
//! let mut transport = protocol.accept(policy, record_layer, handshake)?;
//! transport.send(b"hello under the new epoch")?;
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(missing_docs)]
#![allow(clippy::upper_case_acronyms)]

// Full message flow this driver implements (server side):
//
// Client                                               Server
//
// 1     ClientHello                  -------->
//
// 2                                                     ServerHello
//                                                SupplementalData*
//                                                      Certificate*
//                                                ServerKeyExchange*
//                                               CertificateRequest*
//                                    <--------      ServerHelloDone
// 3     SupplementalData*
//       Certificate*
//       ClientKeyExchange
//       CertificateVerify*
//       Finished                     -------->
// 4                                               NewSessionTicket*
//                                    <--------             Finished
//       Application Data             <------->     Application Data

#[macro_use]
extern crate log;

mod adapter;
pub use adapter::{DatagramTransport, HandshakeMessage, RecordLayer, ReliableHandshake};

mod alert;
pub use alert::AlertDescription;

mod buffer;
pub use buffer::{Buf, ToBuf};

mod context;
pub use context::{ConnectionEnd, SecurityParameters, ServerContext};

pub mod crypto;

mod error;
pub use error::Error;

pub mod message;

mod policy;
pub use policy::{Credentials, KeyExchange, PendingCipher, ServerPolicy};

mod server;
pub use server::DtlsServerProtocol;

mod transport;
pub use transport::DtlsTransport;

mod util;
