use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

/// A single hello extension: type plus opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub extension_data: Vec<u8>,
}

impl Extension {
    pub fn new(extension_type: ExtensionType, extension_data: Vec<u8>) -> Self {
        Extension {
            extension_type,
            extension_data,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], Extension> {
        let (input, extension_type) = ExtensionType::parse(input)?;
        let (input, extension_length) = be_u16(input)?;
        let (input, extension_data) = take(extension_length)(input)?;

        Ok((
            input,
            Extension {
                extension_type,
                extension_data: extension_data.to_vec(),
            },
        ))
    }

    pub fn serialize(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(&self.extension_type.as_u16().to_be_bytes());
        output.extend_from_slice(&(self.extension_data.len() as u16).to_be_bytes());
        output.extend_from_slice(&self.extension_data);
    }
}

/// The extensions block of a hello message.
///
/// Lookup is by type; on-wire serialization preserves insertion order, so a
/// policy controls exactly what the ServerHello carries and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    entries: Vec<Extension>,
}

impl Extensions {
    pub fn new() -> Self {
        Extensions::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, extension_type: ExtensionType) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.extension_type == extension_type)
            .map(|e| e.extension_data.as_slice())
    }

    pub fn contains(&self, extension_type: ExtensionType) -> bool {
        self.get(extension_type).is_some()
    }

    /// Insert or replace the payload for a type, keeping first-insertion
    /// order for existing entries.
    pub fn put(&mut self, extension_type: ExtensionType, extension_data: Vec<u8>) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.extension_type == extension_type)
        {
            existing.extension_data = extension_data;
        } else {
            self.entries
                .push(Extension::new(extension_type, extension_data));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.entries.iter()
    }

    /// Parse an extensions block including its uint16 outer length.
    pub fn parse(input: &[u8]) -> IResult<&[u8], Extensions> {
        let (input, extensions_len) = be_u16(input)?;
        let (input, mut block) = take(extensions_len)(input)?;

        let mut entries = Vec::new();
        while !block.is_empty() {
            let (rest, extension) = Extension::parse(block)?;
            entries.push(extension);
            block = rest;
        }

        Ok((input, Extensions { entries }))
    }

    /// Write the block including the uint16 outer length.
    pub fn serialize(&self, output: &mut Vec<u8>) {
        let mut extensions_len = 0;
        for ext in &self.entries {
            // Extension type (2) + extension length (2) + data
            extensions_len += 4 + ext.extension_data.len();
        }

        output.extend_from_slice(&(extensions_len as u16).to_be_bytes());

        for ext in &self.entries {
            ext.serialize(output);
        }
    }
}

impl FromIterator<(ExtensionType, Vec<u8>)> for Extensions {
    fn from_iter<T: IntoIterator<Item = (ExtensionType, Vec<u8>)>>(iter: T) -> Self {
        let mut extensions = Extensions::new();
        for (t, data) in iter {
            extensions.put(t, data);
        }
        extensions
    }
}

/// Extension type registry values the driver can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionType {
    ServerName,
    MaxFragmentLength,
    TrustedCaKeys,
    TruncatedHmac,
    StatusRequest,
    SupportedGroups,
    EcPointFormats,
    SignatureAlgorithms,
    UseSrtp,
    Heartbeat,
    ApplicationLayerProtocolNegotiation,
    EncryptThenMac,
    ExtendedMasterSecret,
    SessionTicket,
    RenegotiationInfo,
    Unknown(u16),
}

impl ExtensionType {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0x0000 => ExtensionType::ServerName,
            0x0001 => ExtensionType::MaxFragmentLength,
            0x0003 => ExtensionType::TrustedCaKeys,
            0x0004 => ExtensionType::TruncatedHmac,
            0x0005 => ExtensionType::StatusRequest,
            0x000A => ExtensionType::SupportedGroups,
            0x000B => ExtensionType::EcPointFormats,
            0x000D => ExtensionType::SignatureAlgorithms,
            0x000E => ExtensionType::UseSrtp,
            0x000F => ExtensionType::Heartbeat,
            0x0010 => ExtensionType::ApplicationLayerProtocolNegotiation,
            0x0016 => ExtensionType::EncryptThenMac,
            0x0017 => ExtensionType::ExtendedMasterSecret,
            0x0023 => ExtensionType::SessionTicket,
            0xFF01 => ExtensionType::RenegotiationInfo,
            _ => ExtensionType::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            ExtensionType::ServerName => 0x0000,
            ExtensionType::MaxFragmentLength => 0x0001,
            ExtensionType::TrustedCaKeys => 0x0003,
            ExtensionType::TruncatedHmac => 0x0004,
            ExtensionType::StatusRequest => 0x0005,
            ExtensionType::SupportedGroups => 0x000A,
            ExtensionType::EcPointFormats => 0x000B,
            ExtensionType::SignatureAlgorithms => 0x000D,
            ExtensionType::UseSrtp => 0x000E,
            ExtensionType::Heartbeat => 0x000F,
            ExtensionType::ApplicationLayerProtocolNegotiation => 0x0010,
            ExtensionType::EncryptThenMac => 0x0016,
            ExtensionType::ExtendedMasterSecret => 0x0017,
            ExtensionType::SessionTicket => 0x0023,
            ExtensionType::RenegotiationInfo => 0xFF01,
            ExtensionType::Unknown(value) => *value,
        }
    }

    pub fn parse(input: &[u8]) -> IResult<&[u8], ExtensionType> {
        let (input, value) = be_u16(input)?;
        Ok((input, ExtensionType::from_u16(value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &[u8] = &[
        0x00, 0x0A, // ExtensionType::SupportedGroups
        0x00, 0x08, // Extension length
        0x00, 0x06, 0x00, 0x17, 0x00, 0x18, 0x00, 0x19, // Extension data
    ];

    #[test]
    fn roundtrip() {
        let extension = Extension::new(ExtensionType::SupportedGroups, MESSAGE[4..].to_vec());

        let mut serialized = Vec::new();
        extension.serialize(&mut serialized);
        assert_eq!(serialized, MESSAGE);

        let (rest, parsed) = Extension::parse(&serialized).unwrap();
        assert_eq!(parsed, extension);

        assert!(rest.is_empty());
    }

    #[test]
    fn block_preserves_insertion_order() {
        let mut extensions = Extensions::new();
        extensions.put(ExtensionType::SessionTicket, vec![]);
        extensions.put(ExtensionType::RenegotiationInfo, vec![0x00]);
        extensions.put(ExtensionType::ServerName, vec![0x01]);

        let mut serialized = Vec::new();
        extensions.serialize(&mut serialized);

        let (rest, parsed) = Extensions::parse(&serialized).unwrap();
        assert!(rest.is_empty());

        let order: Vec<ExtensionType> = parsed.iter().map(|e| e.extension_type).collect();
        assert_eq!(
            order,
            vec![
                ExtensionType::SessionTicket,
                ExtensionType::RenegotiationInfo,
                ExtensionType::ServerName,
            ]
        );
    }

    #[test]
    fn put_replaces_in_place() {
        let mut extensions = Extensions::new();
        extensions.put(ExtensionType::SessionTicket, vec![0x01]);
        extensions.put(ExtensionType::RenegotiationInfo, vec![0x00]);
        extensions.put(ExtensionType::SessionTicket, vec![0x02]);

        assert_eq!(extensions.len(), 2);
        assert_eq!(
            extensions.get(ExtensionType::SessionTicket),
            Some(&[0x02u8][..])
        );
        assert_eq!(
            extensions.iter().next().unwrap().extension_type,
            ExtensionType::SessionTicket
        );
    }

    #[test]
    fn empty_block_parses() {
        let (rest, extensions) = Extensions::parse(&[0x00, 0x00]).unwrap();
        assert!(rest.is_empty());
        assert!(extensions.is_empty());
    }
}
