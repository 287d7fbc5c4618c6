use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use crate::util::{be_u24, put_u24};

/// One supplemental data entry (RFC 4680 3): a registered type plus opaque
/// payload negotiated out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementalDataEntry {
    pub data_type: u16,
    pub data: Vec<u8>,
}

impl SupplementalDataEntry {
    pub fn new(data_type: u16, data: Vec<u8>) -> Self {
        SupplementalDataEntry { data_type, data }
    }
}

/// SupplementalData message body (RFC 4680): a uint24-framed vector of
/// entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplementalData {
    pub entries: Vec<SupplementalDataEntry>,
}

impl SupplementalData {
    pub fn new(entries: Vec<SupplementalDataEntry>) -> Self {
        SupplementalData { entries }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], SupplementalData> {
        let (input, total_len) = be_u24(input)?;
        let (input, mut entries_data) = take(total_len)(input)?;

        let mut entries = Vec::new();
        while !entries_data.is_empty() {
            let (rest, data_type) = be_u16(entries_data)?;
            let (rest, data_len) = be_u16(rest)?;
            let (rest, data) = take(data_len)(rest)?;
            entries.push(SupplementalDataEntry::new(data_type, data.to_vec()));
            entries_data = rest;
        }

        Ok((input, SupplementalData { entries }))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        let total_len: usize = self.entries.iter().map(|e| 4 + e.data.len()).sum();
        put_u24(output, total_len as u32);

        for entry in &self.entries {
            output.extend_from_slice(&entry.data_type.to_be_bytes());
            output.extend_from_slice(&(entry.data.len() as u16).to_be_bytes());
            output.extend_from_slice(&entry.data);
        }
    }
}
