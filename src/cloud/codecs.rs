use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum CodecType {
    Base64,
    Hex,
}

/// Converts the text form of a PanelUpdate frame to bytes and back
pub trait Codec {
    type Error;

    fn decode(&self, input: &str) -> Result<Bytes, Self::Error>;
    fn encode(&self, frame: &[u8]) -> String;
}

pub fn create_codec(ty: CodecType) -> Box<dyn Codec<Error = CodecError>> {
    match ty {
        CodecType::Base64 => Box::new(Base64),
        CodecType::Hex => Box::new(Hex),
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("failed to decode hex string: {0}")]
    HexDecodeError(#[from] hex::FromHexError),
    #[error("failed to decode base64 string: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),
    #[error("empty input")]
    EmptyInput,
}

/// The encoding the cloud API uses for file contents
pub struct Base64;
impl Codec for Base64 {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<Bytes, Self::Error> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        Ok(Bytes::from(base64::decode(input)?))
    }

    fn encode(&self, frame: &[u8]) -> String {
        base64::encode(frame)
    }
}

/// Plain hex, handy for captures pasted from logs. Whitespace between bytes is ignored.
pub struct Hex;
impl Codec for Hex {
    type Error = CodecError;

    fn decode(&self, input: &str) -> Result<Bytes, Self::Error> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(CodecError::EmptyInput);
        }
        Ok(Bytes::from(hex::decode(compact)?))
    }

    fn encode(&self, frame: &[u8]) -> String {
        hex::encode(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base64() {
        let codec = create_codec(CodecType::Base64);
        let frame = codec.decode("fh3/rxMAXwoe\n").unwrap();
        assert_eq!(&frame[..], &hex_literal::hex!("7e1dffaf13005f0a1e")[..]);
        assert_eq!(codec.encode(&frame), "fh3/rxMAXwoe");

        assert!(matches!(codec.decode("  "), Err(CodecError::EmptyInput)));
        assert!(matches!(
            codec.decode("%%%"),
            Err(CodecError::Base64DecodeError(_))
        ));
    }

    #[test]
    fn test_hex() {
        let codec = create_codec(CodecType::Hex);
        let frame = codec.decode("7e 1d ff\taf").unwrap();
        assert_eq!(&frame[..], &[0x7e, 0x1d, 0xff, 0xaf]);
        assert_eq!(codec.encode(&frame), "7e1dffaf");

        assert!(matches!(codec.decode(""), Err(CodecError::EmptyInput)));
        assert!(matches!(
            codec.decode("7g"),
            Err(CodecError::HexDecodeError(_))
        ));
    }

    #[test]
    fn test_codec_type() {
        assert_eq!("hex".parse::<CodecType>().unwrap(), CodecType::Hex);
        assert_eq!(CodecType::Base64.to_string(), "base64");
    }
}
