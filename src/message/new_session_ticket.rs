use nom::bytes::complete::take;
use nom::number::complete::{be_u16, be_u32};
use nom::IResult;
use smallvec::SmallVec;

/// NewSessionTicket body (RFC 5077 3.3): a lifetime hint in seconds and the
/// opaque ticket blob the server wants echoed back on resumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSessionTicket {
    pub ticket_lifetime_hint: u32,
    pub ticket: SmallVec<[u8; 256]>,
}

impl NewSessionTicket {
    pub fn new(ticket_lifetime_hint: u32, ticket: &[u8]) -> Self {
        NewSessionTicket {
            ticket_lifetime_hint,
            ticket: SmallVec::from_slice(ticket),
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], NewSessionTicket> {
        let (input, ticket_lifetime_hint) = be_u32(input)?;
        let (input, ticket_len) = be_u16(input)?;
        let (input, ticket) = take(ticket_len)(input)?;

        Ok((
            input,
            NewSessionTicket {
                ticket_lifetime_hint,
                ticket: SmallVec::from_slice(ticket),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.ticket_lifetime_hint.to_be_bytes());
        output.extend_from_slice(&(self.ticket.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.ticket);
    }
}
