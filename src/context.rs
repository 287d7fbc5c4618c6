//! Per-connection security parameters and negotiation context.

use crate::alert::AlertDescription;
use crate::buffer::Buf;
use crate::crypto::PrfAlgorithm;
use crate::error::Error;
use crate::message::{CompressionMethod, ProtocolVersion, Random};

/// Which side of the connection these parameters describe. This crate only
/// drives the server side, so the driver always constructs `Server`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEnd {
    Client,
    Server,
}

/// The mutable security parameters of one handshake (RFC 5246 6.1).
///
/// Fields that are unknown until a negotiation step has run are `Option`;
/// the accessors convert a premature read into `internal_error`, because a
/// read before the set-point is a driver sequencing bug, not peer input.
#[derive(Debug)]
pub struct SecurityParameters {
    entity: ConnectionEnd,
    client_random: Option<Random>,
    server_random: Random,
    prf_algorithm: Option<PrfAlgorithm>,
    compression_algorithm: Option<CompressionMethod>,
    verify_data_length: usize,
    master_secret: Option<Buf>,
}

impl SecurityParameters {
    pub(crate) fn new_server(server_random: Random) -> SecurityParameters {
        SecurityParameters {
            entity: ConnectionEnd::Server,
            client_random: None,
            server_random,
            prf_algorithm: None,
            compression_algorithm: None,
            // RFC 5246 7.4.9: every suite without an explicit
            // verify_data_length uses 12, which covers all suites here.
            verify_data_length: 12,
            master_secret: None,
        }
    }

    pub fn entity(&self) -> ConnectionEnd {
        self.entity
    }

    pub fn server_random(&self) -> &Random {
        &self.server_random
    }

    pub fn client_random(&self) -> Result<&Random, Error> {
        self.client_random.as_ref().ok_or_else(|| {
            Error::alert(AlertDescription::InternalError, "client_random not yet read")
        })
    }

    pub(crate) fn set_client_random(&mut self, random: Random) {
        self.client_random = Some(random);
    }

    pub fn prf_algorithm(&self) -> Result<PrfAlgorithm, Error> {
        self.prf_algorithm.ok_or_else(|| {
            Error::alert(
                AlertDescription::InternalError,
                "prf_algorithm not yet negotiated",
            )
        })
    }

    pub(crate) fn set_prf_algorithm(&mut self, algorithm: PrfAlgorithm) {
        self.prf_algorithm = Some(algorithm);
    }

    pub fn compression_algorithm(&self) -> Result<CompressionMethod, Error> {
        self.compression_algorithm.ok_or_else(|| {
            Error::alert(
                AlertDescription::InternalError,
                "compression_algorithm not yet negotiated",
            )
        })
    }

    pub(crate) fn set_compression_algorithm(&mut self, method: CompressionMethod) {
        self.compression_algorithm = Some(method);
    }

    pub fn verify_data_length(&self) -> usize {
        self.verify_data_length
    }

    pub fn master_secret(&self) -> Result<&[u8], Error> {
        self.master_secret.as_deref().ok_or_else(|| {
            Error::alert(
                AlertDescription::InternalError,
                "master_secret not yet established",
            )
        })
    }

    pub(crate) fn set_master_secret(&mut self, master_secret: Buf) {
        self.master_secret = Some(master_secret);
    }
}

/// Negotiation context handed to the policy callbacks: the security
/// parameters plus both protocol versions.
#[derive(Debug)]
pub struct ServerContext {
    security_parameters: SecurityParameters,
    client_version: Option<ProtocolVersion>,
    server_version: Option<ProtocolVersion>,
}

impl ServerContext {
    pub(crate) fn new(security_parameters: SecurityParameters) -> ServerContext {
        ServerContext {
            security_parameters,
            client_version: None,
            server_version: None,
        }
    }

    pub fn security_parameters(&self) -> &SecurityParameters {
        &self.security_parameters
    }

    pub(crate) fn security_parameters_mut(&mut self) -> &mut SecurityParameters {
        &mut self.security_parameters
    }

    pub fn client_version(&self) -> Result<ProtocolVersion, Error> {
        self.client_version.ok_or_else(|| {
            Error::alert(AlertDescription::InternalError, "client_version not yet known")
        })
    }

    pub(crate) fn set_client_version(&mut self, version: ProtocolVersion) {
        self.client_version = Some(version);
    }

    pub fn server_version(&self) -> Result<ProtocolVersion, Error> {
        self.server_version.ok_or_else(|| {
            Error::alert(AlertDescription::InternalError, "server_version not yet chosen")
        })
    }

    pub(crate) fn set_server_version(&mut self, version: ProtocolVersion) {
        self.server_version = Some(version);
    }
}
