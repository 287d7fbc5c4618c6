use nom::bytes::complete::take;
use nom::IResult;
use smallvec::SmallVec;

use crate::util::{be_u24, put_u24};

/// Certificate message body (RFC 5246 7.4.2): a uint24 list of uint24-length
/// DER certificates, leaf first. The DER contents are opaque to the driver;
/// chain validation belongs to the key exchange and the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub certificate_list: SmallVec<[Vec<u8>; 4]>,
}

impl Certificate {
    pub fn new(certificate_list: SmallVec<[Vec<u8>; 4]>) -> Self {
        Certificate { certificate_list }
    }

    /// An empty certificate list; a client answers a CertificateRequest this
    /// way when it has nothing to offer.
    pub fn empty() -> Self {
        Certificate {
            certificate_list: SmallVec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.certificate_list.is_empty()
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Certificate> {
        let (input, total_len) = be_u24(input)?;
        let (input, mut list_data) = take(total_len)(input)?;

        let mut certificate_list = SmallVec::new();
        while !list_data.is_empty() {
            let (rest, cert_len) = be_u24(list_data)?;
            let (rest, cert) = take(cert_len)(rest)?;
            certificate_list.push(cert.to_vec());
            list_data = rest;
        }

        Ok((input, Certificate { certificate_list }))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        let total_len: usize = self.certificate_list.iter().map(|cert| cert.len() + 3).sum();
        put_u24(output, total_len as u32);

        for cert in &self.certificate_list {
            put_u24(output, cert.len() as u32);
            output.extend_from_slice(cert);
        }
    }
}
