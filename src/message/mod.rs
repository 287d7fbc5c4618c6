//! Wire structures for the DTLS server handshake.
//!
//! Parsers are `nom` based; serializers append to a plain `Vec<u8>`. The
//! handshake header (type, length, message_seq, fragment bounds) is the
//! reliable handshake layer's concern; every codec here covers the bare
//! message body.

use nom::number::complete::{be_u16, be_u8};
use nom::IResult;

use crate::alert::AlertDescription;
use crate::error::Error;

mod certificate;
mod certificate_request;
mod certificate_verify;
mod client_hello;
mod digitally_signed;
mod extension;
mod finished;
mod id;
mod new_session_ticket;
mod server_hello;
mod supplemental_data;

pub use certificate::Certificate;
pub use certificate_request::{CertificateRequest, ClientCertificateType, DistinguishedName};
pub use certificate_verify::CertificateVerify;
pub use client_hello::ClientHello;
pub use digitally_signed::{
    DigitallySigned, HashAlgorithm, SignatureAlgorithm, SignatureAndHashAlgorithm,
};
pub use extension::{Extension, ExtensionType, Extensions};
pub use finished::Finished;
pub use id::{Cookie, InvalidLength, Random, SessionId};
pub use new_session_ticket::NewSessionTicket;
pub use server_hello::ServerHello;
pub use supplemental_data::{SupplementalData, SupplementalDataEntry};

/// Handshake message types (RFC 5246 7.4, RFC 6347 4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    HelloRequest,
    ClientHello,
    ServerHello,
    HelloVerifyRequest,
    NewSessionTicket,
    Certificate,
    ServerKeyExchange,
    CertificateRequest,
    ServerHelloDone,
    CertificateVerify,
    ClientKeyExchange,
    Finished,
    SupplementalData,
    Unknown(u8),
}

impl MessageType {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => MessageType::HelloRequest,
            1 => MessageType::ClientHello,
            2 => MessageType::ServerHello,
            3 => MessageType::HelloVerifyRequest,
            4 => MessageType::NewSessionTicket,
            11 => MessageType::Certificate,
            12 => MessageType::ServerKeyExchange,
            13 => MessageType::CertificateRequest,
            14 => MessageType::ServerHelloDone,
            15 => MessageType::CertificateVerify,
            16 => MessageType::ClientKeyExchange,
            20 => MessageType::Finished,
            23 => MessageType::SupplementalData,
            _ => MessageType::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            MessageType::HelloRequest => 0,
            MessageType::ClientHello => 1,
            MessageType::ServerHello => 2,
            MessageType::HelloVerifyRequest => 3,
            MessageType::NewSessionTicket => 4,
            MessageType::Certificate => 11,
            MessageType::ServerKeyExchange => 12,
            MessageType::CertificateRequest => 13,
            MessageType::ServerHelloDone => 14,
            MessageType::CertificateVerify => 15,
            MessageType::ClientKeyExchange => 16,
            MessageType::Finished => 20,
            MessageType::SupplementalData => 23,
            MessageType::Unknown(value) => *value,
        }
    }
}

/// Protocol versions relevant to a DTLS server.
///
/// DTLS version numbers are ones-complements of the TLS numbers, so a
/// *numerically smaller* wire value is a *newer* version.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    DTLS1_0,
    DTLS1_2,
    Unknown(u16),
}

impl ProtocolVersion {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0xFEFF => ProtocolVersion::DTLS1_0,
            0xFEFD => ProtocolVersion::DTLS1_2,
            _ => ProtocolVersion::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ProtocolVersion::DTLS1_0 => 0xFEFF,
            ProtocolVersion::DTLS1_2 => 0xFEFD,
            ProtocolVersion::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ProtocolVersion> {
        let (input, value) = be_u16(input)?;
        Ok((input, ProtocolVersion::from_u16(value)))
    }

    pub fn is_dtls(&self) -> bool {
        matches!(self, ProtocolVersion::DTLS1_0 | ProtocolVersion::DTLS1_2)
    }

    /// Version ordering within the DTLS family. Because the wire encoding is
    /// inverted, "equal or earlier" means a wire value that is equal or
    /// larger.
    pub fn is_equal_or_earlier_version_of(&self, other: ProtocolVersion) -> bool {
        self.as_u16() >= other.as_u16()
    }
}

/// Cipher suite identifiers.
///
/// Only the suites the driver itself must recognize get a named variant;
/// anything else travels as `Unknown` and is left to the policy to judge.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherSuite {
    NULL_NULL,
    RSA_RC4_128_MD5,
    RSA_RC4_128_SHA,
    RSA_AES128_CBC_SHA,
    RSA_AES256_CBC_SHA,
    EMPTY_RENEGOTIATION_INFO_SCSV,
    ECDHE_RSA_RC4_128_SHA,
    ECDHE_RSA_AES128_CBC_SHA,
    ECDHE_ECDSA_AES128_GCM_SHA256,
    ECDHE_ECDSA_AES256_GCM_SHA384,
    ECDHE_RSA_AES128_GCM_SHA256,
    ECDHE_RSA_AES256_GCM_SHA384,
    Unknown(u16),
}

impl CipherSuite {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => CipherSuite::NULL_NULL,
            0x0004 => CipherSuite::RSA_RC4_128_MD5,
            0x0005 => CipherSuite::RSA_RC4_128_SHA,
            0x002F => CipherSuite::RSA_AES128_CBC_SHA,
            0x0035 => CipherSuite::RSA_AES256_CBC_SHA,
            0x00FF => CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV,
            0xC011 => CipherSuite::ECDHE_RSA_RC4_128_SHA,
            0xC013 => CipherSuite::ECDHE_RSA_AES128_CBC_SHA,
            0xC02B => CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256,
            0xC02C => CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384,
            0xC02F => CipherSuite::ECDHE_RSA_AES128_GCM_SHA256,
            0xC030 => CipherSuite::ECDHE_RSA_AES256_GCM_SHA384,
            _ => CipherSuite::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CipherSuite::NULL_NULL => 0x0000,
            CipherSuite::RSA_RC4_128_MD5 => 0x0004,
            CipherSuite::RSA_RC4_128_SHA => 0x0005,
            CipherSuite::RSA_AES128_CBC_SHA => 0x002F,
            CipherSuite::RSA_AES256_CBC_SHA => 0x0035,
            CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV => 0x00FF,
            CipherSuite::ECDHE_RSA_RC4_128_SHA => 0xC011,
            CipherSuite::ECDHE_RSA_AES128_CBC_SHA => 0xC013,
            CipherSuite::ECDHE_ECDSA_AES128_GCM_SHA256 => 0xC02B,
            CipherSuite::ECDHE_ECDSA_AES256_GCM_SHA384 => 0xC02C,
            CipherSuite::ECDHE_RSA_AES128_GCM_SHA256 => 0xC02F,
            CipherSuite::ECDHE_RSA_AES256_GCM_SHA384 => 0xC030,
            CipherSuite::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CipherSuite> {
        let (input, value) = be_u16(input)?;
        Ok((input, CipherSuite::from_u16(value)))
    }

    /// The signaling value from RFC 5746; never a real suite.
    pub fn is_scsv(&self) -> bool {
        matches!(self, CipherSuite::EMPTY_RENEGOTIATION_INFO_SCSV)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CipherSuite::NULL_NULL)
    }

    /// RC4 suites MUST NOT be negotiated over DTLS (RFC 6347 4.1.2.2).
    pub fn uses_rc4(&self) -> bool {
        matches!(
            self.as_u16(),
            0x0003
                | 0x0004
                | 0x0005
                | 0x0017
                | 0x0018
                | 0x008A
                | 0x008E
                | 0x0092
                | 0xC002
                | 0xC007
                | 0xC00C
                | 0xC011
                | 0xC016
                | 0xC033
        )
    }

    /// Suites whose TLS 1.2 PRF hash is SHA-384 rather than the SHA-256
    /// default (RFC 5246 5, RFC 5289).
    pub fn uses_sha384_prf(&self) -> bool {
        matches!(
            self.as_u16(),
            0x009D | 0x009F | 0xC024 | 0xC028 | 0xC02C | 0xC02E | 0xC030 | 0xC032
        )
    }
}

/// Compression methods (RFC 5246 6.1, RFC 3749).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Null,
    Deflate,
    Unknown(u8),
}

impl CompressionMethod {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => CompressionMethod::Null,
            0x01 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            CompressionMethod::Null => 0x00,
            CompressionMethod::Deflate => 0x01,
            CompressionMethod::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CompressionMethod> {
        let (input, value) = be_u8(input)?;
        Ok((input, CompressionMethod::from_u8(value)))
    }
}

/// Every message body must be consumed exactly; trailing bytes are a
/// decode_error (RFC 5246 7.4).
pub fn assert_empty(rest: &[u8]) -> Result<(), Error> {
    if rest.is_empty() {
        Ok(())
    } else {
        Err(Error::alert(
            AlertDescription::DecodeError,
            format!("{} trailing bytes after handshake body", rest.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering_is_inverted_on_the_wire() {
        // DTLS 1.0 is earlier than DTLS 1.2 despite the larger wire value.
        assert!(ProtocolVersion::DTLS1_0
            .is_equal_or_earlier_version_of(ProtocolVersion::DTLS1_2));
        assert!(!ProtocolVersion::DTLS1_2
            .is_equal_or_earlier_version_of(ProtocolVersion::DTLS1_0));
        assert!(ProtocolVersion::DTLS1_2
            .is_equal_or_earlier_version_of(ProtocolVersion::DTLS1_2));
    }

    #[test]
    fn only_dtls_versions_are_dtls() {
        assert!(ProtocolVersion::DTLS1_0.is_dtls());
        assert!(ProtocolVersion::DTLS1_2.is_dtls());
        // TLS 1.2
        assert!(!ProtocolVersion::from_u16(0x0303).is_dtls());
    }

    #[test]
    fn scsv_and_null_suites() {
        assert!(CipherSuite::from_u16(0x00FF).is_scsv());
        assert!(CipherSuite::from_u16(0x0000).is_null());
        assert!(!CipherSuite::from_u16(0x002F).is_scsv());
    }

    #[test]
    fn rc4_suites_flagged() {
        assert!(CipherSuite::RSA_RC4_128_SHA.uses_rc4());
        assert!(CipherSuite::ECDHE_RSA_RC4_128_SHA.uses_rc4());
        assert!(!CipherSuite::RSA_AES128_CBC_SHA.uses_rc4());
    }

    #[test]
    fn trailing_bytes_are_decode_error() {
        assert!(assert_empty(&[]).is_ok());
        let err = assert_empty(&[0x00]).unwrap_err();
        assert_eq!(err.alert_description(), Some(AlertDescription::DecodeError));
    }
}
