/*

Cloud plumbing
--------------

The spa talks to the vendor cloud, never to us directly. Every exchange is an XML
`sci_request` posted to the API with a bearer token:

    login  -> token + device id
    get_file PanelUpdate.txt -> <data>BASE64</data> -> PanelFrame
    device_request Button/SetTemp -> (reply ignored)

Transports are interchangeable so frames can also be fed from stdin for debugging.

*/

pub mod codecs;
pub use codecs::{create_codec, Codec, CodecError, CodecType};

pub mod session;
pub use session::{CloudTransport, Credentials, Session, DEFAULT_API_URL};

pub mod transport;
pub use transport::{create_transport, Lines, Transport, TransportError, TransportType};

/// Extracts the file contents from a `get_file` reply. Replies without a `<data>` element are
/// treated as bare file contents.
pub fn file_contents(reply: &str) -> &str {
    const OPEN: &str = "<data>";
    const CLOSE: &str = "</data>";

    reply
        .find(OPEN)
        .map(|start| &reply[start + OPEN.len()..])
        .and_then(|rest| rest.find(CLOSE).map(|end| &rest[..end]))
        .unwrap_or(reply)
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_contents() {
        let reply = concat!(
            r#"<sci_reply version="1.0"><file_system><device id="spa"><commands>"#,
            r#"<get_file><data>fh3/rxMAXwoe</data></get_file>"#,
            r#"</commands></device></file_system></sci_reply>"#
        );
        assert_eq!(file_contents(reply), "fh3/rxMAXwoe");
        assert_eq!(file_contents(" fh3/rxMAXwoe\n"), "fh3/rxMAXwoe");

        // Unterminated element falls back to the whole reply
        assert_eq!(file_contents("<data>abc"), "<data>abc");
    }
}
