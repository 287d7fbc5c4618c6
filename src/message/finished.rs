use nom::bytes::complete::take;
use nom::IResult;
use smallvec::SmallVec;

/// Finished body: the verify_data PRF output. Every cipher suite this
/// driver admits uses the 12-byte default length (RFC 5246 7.4.9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finished {
    pub verify_data: SmallVec<[u8; 12]>,
}

impl Finished {
    pub fn new(verify_data: &[u8]) -> Self {
        Finished {
            verify_data: SmallVec::from_slice(verify_data),
        }
    }

    /// Parse a Finished body whose verify_data is `verify_data_length`
    /// bytes; the caller asserts nothing trails it.
    pub fn parse(input: &[u8], verify_data_length: usize) -> IResult<&[u8], Finished> {
        let (input, verify_data) = take(verify_data_length)(input)?;
        Ok((input, Finished::new(verify_data)))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.verify_data);
    }
}
