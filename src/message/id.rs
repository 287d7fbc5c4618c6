use std::fmt;
use std::ops::Deref;
use std::time::{SystemTime, UNIX_EPOCH};

use nom::bytes::complete::take;
use nom::error::{Error as NomError, ErrorKind};
use nom::number::complete::be_u8;
use nom::{Err, IResult};
use rand::rngs::OsRng;
use rand::RngCore;

pub struct InvalidLength(&'static str, IdType, usize);

impl fmt::Debug for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.1 {
            IdType::Fixed(len) => write!(
                f,
                "Incorrect fixed ID ({}) length: {} should be {}",
                self.0, self.2, len
            ),
            IdType::Variable(min, max) => write!(
                f,
                "Incorrect variable ID ({}) length: {} <= {} <= {}",
                self.0, min, self.2, max,
            ),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum IdType {
    Fixed(usize),
    Variable(usize, usize),
}

macro_rules! var_array {
    ($name:ident, $min:expr, $max:expr) => {
        #[derive(Clone, Copy)]
        pub struct $name([u8; $max], usize);

        impl $name {
            pub fn try_new(data: &[u8]) -> Result<Self, InvalidLength> {
                #[allow(unused_comparisons)]
                if data.len() < $min || data.len() > $max {
                    return Err(InvalidLength(
                        stringify!($name),
                        IdType::Variable($min, $max),
                        data.len(),
                    ));
                }
                let mut array = [0; $max];
                array[..data.len()].copy_from_slice(data);
                Ok($name(array, data.len()))
            }

            pub fn empty() -> Self {
                $name([0; $max], 0)
            }

            /// Parse an opaque vector with a uint8 length prefix. Lengths
            /// beyond the type's bound fail with `ErrorKind::Verify`.
            pub fn parse(input: &[u8]) -> IResult<&[u8], $name> {
                let (input, len) = be_u8(input)?;
                let (input, data) = take(len)(input)?;
                match $name::try_new(data) {
                    Ok(v) => Ok((input, v)),
                    Err(_) => Err(Err::Failure(NomError::new(input, ErrorKind::Verify))),
                }
            }

            pub fn serialize(&self, output: &mut Vec<u8>) {
                output.push(self.1 as u8);
                output.extend_from_slice(&self.0[..self.1]);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:02x?})", stringify!($name), &self.0[..self.1])
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.deref() == other.deref()
            }
        }

        impl Eq for $name {}

        impl Deref for $name {
            type Target = [u8];

            fn deref(&self) -> &Self::Target {
                &self.0[..self.1]
            }
        }

        impl<'a> TryFrom<&'a [u8]> for $name {
            type Error = InvalidLength;

            fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
                Self::try_new(value)
            }
        }
    };
}

macro_rules! fixed_array {
    ($name:ident, $size:expr) => {
        #[derive(Clone, Copy)]
        pub struct $name([u8; $size]);

        impl $name {
            pub fn new(data: &[u8]) -> Result<Self, InvalidLength> {
                if data.len() != $size {
                    return Err(InvalidLength(
                        stringify!($name),
                        IdType::Fixed($size),
                        data.len(),
                    ));
                }
                let mut array = [0; $size];
                array.copy_from_slice(data);
                Ok($name(array))
            }

            pub fn parse(input: &[u8]) -> IResult<&[u8], $name> {
                let (input, data) = take($size as usize)(input)?;
                let mut array = [0; $size];
                array.copy_from_slice(data);
                Ok((input, $name(array)))
            }

            pub fn serialize(&self, output: &mut Vec<u8>) {
                output.extend_from_slice(&self.0);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({:02x?})", stringify!($name), &self.0)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.deref() == other.deref()
            }
        }

        impl Eq for $name {}

        impl Deref for $name {
            type Target = [u8];

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl<'a> TryFrom<&'a [u8]> for $name {
            type Error = InvalidLength;

            fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }
    };
}

var_array!(SessionId, 0, 32);
var_array!(Cookie, 0, 255);
fixed_array!(Random, 32);

impl Random {
    /// Fresh 32-byte random per RFC 5246 7.4.1.2: a 4-byte
    /// gmt_unix_time prefix followed by 28 bytes from the OS RNG.
    pub fn generate(now: SystemTime) -> Random {
        let gmt_unix_time = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        let mut data = [0u8; 32];
        data[..4].copy_from_slice(&gmt_unix_time.to_be_bytes());
        OsRng.fill_bytes(&mut data[4..]);
        Random(data)
    }
}
