use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u8};

use crate::alert::AlertDescription;
use crate::error::Error;

use super::{
    CipherSuite, CompressionMethod, Cookie, Extensions, ProtocolVersion, Random, SessionId,
};

/// ClientHello body (RFC 6347 4.2.2; the cookie field is what distinguishes
/// it from the TLS shape).
#[derive(Debug, PartialEq, Eq)]
pub struct ClientHello {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cookie: Cookie,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<CompressionMethod>,
    pub extensions: Option<Extensions>,
}

impl ClientHello {
    pub fn new(
        client_version: ProtocolVersion,
        random: Random,
        session_id: SessionId,
        cookie: Cookie,
        cipher_suites: Vec<CipherSuite>,
        compression_methods: Vec<CompressionMethod>,
    ) -> Self {
        ClientHello {
            client_version,
            random,
            session_id,
            cookie,
            cipher_suites,
            compression_methods,
            extensions: None,
        }
    }

    /// Parse a ClientHello body.
    ///
    /// Unlike the other codecs this returns the crate error directly: the
    /// RFCs prescribe distinct alerts for the individual field validations
    /// (illegal_parameter for version/session_id/compression range issues,
    /// decode_error for a malformed cipher-suite vector), which a uniform
    /// nom error could not carry.
    pub fn parse(input: &[u8]) -> Result<(&[u8], ClientHello), Error> {
        let (input, client_version) = ProtocolVersion::parse(input)?;
        if !client_version.is_dtls() {
            return Err(Error::alert(
                AlertDescription::IllegalParameter,
                format!("client_version {:04x} is not DTLS", client_version.as_u16()),
            ));
        }

        let (input, random) = Random::parse(input)?;

        let (input, session_id_len) = be_u8(input)?;
        let (input, session_id_data) = take(session_id_len)(input)?;
        let session_id = SessionId::try_new(session_id_data)
            .map_err(|e| Error::alert(AlertDescription::IllegalParameter, e.to_string()))?;

        let (input, cookie_len) = be_u8(input)?;
        let (input, cookie_data) = take(cookie_len)(input)?;
        // Any uint8-prefixed length fits the cookie bound.
        let cookie = Cookie::try_new(cookie_data)
            .map_err(|e| Error::alert(AlertDescription::DecodeError, e.to_string()))?;

        let (input, cipher_suites_len) = be_u16(input)?;
        if cipher_suites_len < 2 || cipher_suites_len % 2 != 0 {
            return Err(Error::alert(
                AlertDescription::DecodeError,
                format!("invalid cipher_suites length {}", cipher_suites_len),
            ));
        }
        let (input, mut suites_data) = take(cipher_suites_len)(input)?;
        let mut cipher_suites = Vec::with_capacity(cipher_suites_len as usize / 2);
        while !suites_data.is_empty() {
            let (rest, suite) = CipherSuite::parse(suites_data)?;
            cipher_suites.push(suite);
            suites_data = rest;
        }

        let (input, compression_methods_len) = be_u8(input)?;
        if compression_methods_len < 1 {
            return Err(Error::alert(
                AlertDescription::IllegalParameter,
                "empty compression_methods",
            ));
        }
        let (input, methods_data) = take(compression_methods_len)(input)?;
        let compression_methods = methods_data
            .iter()
            .map(|&b| CompressionMethod::from_u8(b))
            .collect();

        // Extensions block is optional; absent and empty are distinct states.
        let (input, extensions) = if input.is_empty() {
            (input, None)
        } else {
            let (input, extensions) = Extensions::parse(input)?;
            (input, Some(extensions))
        };

        Ok((
            input,
            ClientHello {
                client_version,
                random,
                session_id,
                cookie,
                cipher_suites,
                compression_methods,
                extensions,
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.client_version.as_u16().to_be_bytes());
        self.random.serialize(output);
        self.session_id.serialize(output);
        self.cookie.serialize(output);
        output.extend_from_slice(&(self.cipher_suites.len() as u16 * 2).to_be_bytes());
        for suite in &self.cipher_suites {
            output.extend_from_slice(&suite.as_u16().to_be_bytes());
        }
        output.push(self.compression_methods.len() as u8);
        for method in &self.compression_methods {
            output.push(method.as_u8());
        }

        if let Some(extensions) = &self.extensions {
            extensions.serialize(output);
        }
    }
}
