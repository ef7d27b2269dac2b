use std::{
    io::{self, BufRead, StdinLock, Stdout, Write},
    str::FromStr,
};

use anyhow::anyhow;
use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::balboa::RequestBody;

use super::{
    codecs::{create_codec, Codec, CodecError, CodecType},
    session::{CloudTransport, Credentials},
};

/// Carries requests to a spa and brings back its PanelUpdate frames
pub trait Transport {
    type Error;

    /// Id the spa is addressed by in request envelopes
    fn device_id(&mut self) -> Result<String, Self::Error>;

    /// Posts a `get_file` request and returns the decoded file contents
    fn fetch_frame(&mut self, request: &RequestBody) -> Result<Bytes, Self::Error>;

    fn send(&mut self, request: &RequestBody) -> Result<(), Self::Error>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    type Error = T::Error;

    fn device_id(&mut self) -> Result<String, Self::Error> {
        (**self).device_id()
    }

    fn fetch_frame(&mut self, request: &RequestBody) -> Result<Bytes, Self::Error> {
        (**self).fetch_frame(request)
    }

    fn send(&mut self, request: &RequestBody) -> Result<(), Self::Error> {
        (**self).send(request)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportType {
    /// The vendor cloud API
    Cloud,

    /// Read frames from stdin and write requests to stdout
    Lines { codec_type: CodecType },
}

impl FromStr for TransportType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        let transport_type = parts.next().unwrap_or_default();

        Ok(match transport_type {
            "cloud" => TransportType::Cloud,
            "lines" => {
                let codec_type = match parts.next() {
                    Some(codec_type) => CodecType::from_str(codec_type)?,
                    None => CodecType::Base64,
                };
                TransportType::Lines { codec_type }
            }
            _ => return Err(anyhow!("unknown transport type: {}", transport_type)),
        })
    }
}

pub fn create_transport(
    ty: TransportType,
    api_url: &str,
    credentials: Credentials,
) -> Result<Box<dyn Transport<Error = TransportError>>, TransportError> {
    Ok(match ty {
        TransportType::Cloud => Box::new(CloudTransport::new(api_url, credentials)?),
        TransportType::Lines { codec_type } => Box::new(Lines::stdio(codec_type)),
    })
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("login rejected with status {0}")]
    LoginRejected(reqwest::StatusCode),

    #[error("session token was rejected")]
    Unauthorized,

    #[error("the account has no spa attached")]
    MissingDeviceId,

    #[error("codec error: {0}")]
    CodecError(#[from] CodecError),

    #[error("io error: {0}")]
    IOError(#[from] std::io::Error),

    #[error("EOF")]
    EOF,
}

/// Frames arrive one encoded line at a time on `reader`; requests are written to `writer`
pub struct Lines<R, W> {
    codec: Box<dyn Codec<Error = CodecError>>,
    reader: R,
    writer: W,
}

impl Lines<StdinLock<'static>, Stdout> {
    pub fn stdio(codec_type: CodecType) -> Self {
        Self::new(codec_type, io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Lines<R, W> {
    // No account to look a device id up from
    const DEVICE_ID: &'static str = "local";

    pub fn new(codec_type: CodecType, reader: R, writer: W) -> Self {
        Self {
            codec: create_codec(codec_type),
            reader,
            writer,
        }
    }
}

impl<R: BufRead, W: Write> Transport for Lines<R, W> {
    type Error = TransportError;

    fn device_id(&mut self) -> Result<String, Self::Error> {
        Ok(Self::DEVICE_ID.into())
    }

    fn fetch_frame(&mut self, request: &RequestBody) -> Result<Bytes, Self::Error> {
        debug!(%request, "reading frame from input");

        let mut input = String::new();
        loop {
            input.clear();
            if self.reader.read_line(&mut input)? == 0 {
                return Err(TransportError::EOF);
            }
            let line = input.trim();
            if !line.is_empty() {
                return Ok(self.codec.decode(line)?);
            }
        }
    }

    fn send(&mut self, request: &RequestBody) -> Result<(), Self::Error> {
        writeln!(self.writer, "{}", request)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::balboa::CommandEncoder;

    #[test]
    fn test_transport_type() {
        assert_eq!(
            TransportType::from_str("cloud").unwrap(),
            TransportType::Cloud
        );
        assert_eq!(
            TransportType::from_str("lines:hex").unwrap(),
            TransportType::Lines {
                codec_type: CodecType::Hex
            }
        );
        assert_eq!(
            TransportType::from_str("lines").unwrap(),
            TransportType::Lines {
                codec_type: CodecType::Base64
            }
        );
        assert!(TransportType::from_str("lines:morse").is_err());
        assert!(TransportType::from_str("serial").is_err());
    }

    #[test]
    fn test_lines() {
        let input = Cursor::new(b"fh3/rxMAXwoe\n\n  \n%%\n".to_vec());
        let mut lines = Lines::new(CodecType::Base64, input, Vec::new());

        let encoder = CommandEncoder::new(lines.device_id().unwrap());
        let frame = lines.fetch_frame(&encoder.panel_update()).unwrap();
        assert_eq!(&frame[..], &hex_literal::hex!("7e1dffaf13005f0a1e")[..]);

        // Blank lines are skipped
        assert!(matches!(
            lines.fetch_frame(&encoder.panel_update()),
            Err(TransportError::CodecError(_))
        ));
        assert!(matches!(
            lines.fetch_frame(&encoder.panel_update()),
            Err(TransportError::EOF)
        ));

        let request = encoder.set_temperature(100);
        lines.send(&request).unwrap();
        assert_eq!(
            String::from_utf8(lines.writer).unwrap(),
            format!("{}\n", request)
        );
    }
}
