use std::ops::RangeFrom;

use nom::error::{make_error, ErrorKind, ParseError};
use nom::{Err, IResult, InputIter, InputLength, Slice};

/// Big-endian uint24, the length prefix TLS uses for certificate lists and
/// supplemental data vectors.
pub fn be_u24<I, E: ParseError<I>>(input: I) -> IResult<I, u32, E>
where
    I: Slice<RangeFrom<usize>> + InputIter<Item = u8> + InputLength,
{
    let bound: usize = 3;

    if input.input_len() < bound {
        Err(Err::Error(make_error(input, ErrorKind::Eof)))
    } else {
        let mut res = 0u32;

        for byte in input.iter_elements().take(bound) {
            res = (res << 8) + byte as u32;
        }

        Ok((input.slice(bound..), res))
    }
}

/// Append a big-endian uint24 length prefix.
pub fn put_u24(output: &mut Vec<u8>, value: u32) {
    output.extend_from_slice(&value.to_be_bytes()[1..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u24_roundtrip() {
        let mut out = Vec::new();
        put_u24(&mut out, 0x01_02_03);
        assert_eq!(out, &[0x01, 0x02, 0x03]);

        let (rest, value) = be_u24::<_, nom::error::Error<&[u8]>>(&out[..]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(value, 0x01_02_03);
    }

    #[test]
    fn u24_short_input() {
        let data = [0x01, 0x02];
        assert!(be_u24::<_, nom::error::Error<&[u8]>>(&data[..]).is_err());
    }
}
