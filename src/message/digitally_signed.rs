use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

/// Hash algorithm identifiers (RFC 5246 7.4.1.4.1).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    MD5,
    SHA1,
    SHA224,
    SHA256,
    SHA384,
    SHA512,
    Unknown(u8),
}

impl HashAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => HashAlgorithm::MD5,
            2 => HashAlgorithm::SHA1,
            3 => HashAlgorithm::SHA224,
            4 => HashAlgorithm::SHA256,
            5 => HashAlgorithm::SHA384,
            6 => HashAlgorithm::SHA512,
            _ => HashAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            HashAlgorithm::MD5 => 1,
            HashAlgorithm::SHA1 => 2,
            HashAlgorithm::SHA224 => 3,
            HashAlgorithm::SHA256 => 4,
            HashAlgorithm::SHA384 => 5,
            HashAlgorithm::SHA512 => 6,
            HashAlgorithm::Unknown(value) => *value,
        }
    }
}

/// Signature algorithm identifiers (RFC 5246 7.4.1.4.1).
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Anonymous,
    RSA,
    DSA,
    ECDSA,
    Unknown(u8),
}

impl SignatureAlgorithm {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => SignatureAlgorithm::Anonymous,
            1 => SignatureAlgorithm::RSA,
            2 => SignatureAlgorithm::DSA,
            3 => SignatureAlgorithm::ECDSA,
            _ => SignatureAlgorithm::Unknown(value),
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            SignatureAlgorithm::Anonymous => 0,
            SignatureAlgorithm::RSA => 1,
            SignatureAlgorithm::DSA => 2,
            SignatureAlgorithm::ECDSA => 3,
            SignatureAlgorithm::Unknown(value) => *value,
        }
    }
}

/// SignatureAndHashAlgorithm pair, two bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureAndHashAlgorithm {
    pub hash: HashAlgorithm,
    pub signature: SignatureAlgorithm,
}

impl SignatureAndHashAlgorithm {
    pub fn new(hash: HashAlgorithm, signature: SignatureAlgorithm) -> Self {
        SignatureAndHashAlgorithm { hash, signature }
    }

    pub fn from_u16(value: u16) -> Self {
        SignatureAndHashAlgorithm {
            hash: HashAlgorithm::from_u8((value >> 8) as u8),
            signature: SignatureAlgorithm::from_u8(value as u8),
        }
    }

    pub fn as_u16(&self) -> u16 {
        (self.hash.as_u8() as u16) << 8 | self.signature.as_u8() as u16
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SignatureAndHashAlgorithm> {
        let (input, value) = be_u16(input)?;
        Ok((input, SignatureAndHashAlgorithm::from_u16(value)))
    }
}

/// DigitallySigned structure (RFC 5246 4.7): algorithm pair followed by an
/// opaque16 signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitallySigned {
    pub algorithm: SignatureAndHashAlgorithm,
    pub signature: Vec<u8>,
}

impl DigitallySigned {
    pub fn new(algorithm: SignatureAndHashAlgorithm, signature: Vec<u8>) -> Self {
        DigitallySigned {
            algorithm,
            signature,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], DigitallySigned> {
        let (input, algorithm) = SignatureAndHashAlgorithm::parse(input)?;
        let (input, signature_len) = be_u16(input)?;
        let (input, signature) = take(signature_len)(input)?;
        Ok((
            input,
            DigitallySigned {
                algorithm,
                signature: signature.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.algorithm.as_u16().to_be_bytes());
        output.extend_from_slice(&(self.signature.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.signature);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MESSAGE: &[u8] = &[
        0x04, 0x01, // SignatureAndHashAlgorithm (SHA256 + RSA)
        0x00, 0x04, // Signature length
        0x01, 0x02, 0x03, 0x04, // Signature data
    ];

    #[test]
    fn roundtrip() {
        let algorithm =
            SignatureAndHashAlgorithm::new(HashAlgorithm::SHA256, SignatureAlgorithm::RSA);
        let digitally_signed = DigitallySigned::new(algorithm, MESSAGE[4..8].to_vec());

        let mut serialized = Vec::new();
        digitally_signed.serialize(&mut serialized);
        assert_eq!(serialized, MESSAGE);

        let (rest, parsed) = DigitallySigned::parse(&serialized).unwrap();
        assert_eq!(parsed, digitally_signed);

        assert!(rest.is_empty());
    }

    #[test]
    fn algorithm_pair_packs_both_bytes() {
        let pair = SignatureAndHashAlgorithm::new(HashAlgorithm::SHA384, SignatureAlgorithm::ECDSA);
        assert_eq!(pair.as_u16(), 0x0503);
        assert_eq!(SignatureAndHashAlgorithm::from_u16(0x0503), pair);
    }
}
