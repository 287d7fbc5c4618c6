use nom::IResult;

use super::DigitallySigned;

/// CertificateVerify body (RFC 5246 7.4.8): a signature over the handshake
/// transcript up to, but not including, this message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateVerify {
    pub signed: DigitallySigned,
}

impl CertificateVerify {
    pub fn new(signed: DigitallySigned) -> Self {
        CertificateVerify { signed }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], CertificateVerify> {
        let (input, signed) = DigitallySigned::parse(input)?;
        Ok((input, CertificateVerify { signed }))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        self.signed.serialize(output);
    }
}
