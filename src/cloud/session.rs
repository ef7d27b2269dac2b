use std::time::Duration;

use bytes::Bytes;
use reqwest::{blocking::Client, header, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::balboa::RequestBody;

use super::{
    codecs::{Base64, Codec},
    file_contents,
    transport::{Transport, TransportError},
};

pub const DEFAULT_API_URL: &str = "https://bwgapi.balboawater.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Serialize, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize, Debug)]
struct LoginResponse {
    token: String,
    #[serde(default)]
    device: Option<LoginDevice>,
}

#[derive(Deserialize, Debug)]
struct LoginDevice {
    device_id: String,
}

/// Auth state for one account. Lives only in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub device_id: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    // Drop the token but keep the device id, it doesn't change between logins
    pub fn invalidate(&mut self) {
        self.token = None;
    }
}

/// Talks to the vendor cloud API over HTTPS
pub struct CloudTransport {
    http: Client,
    base_url: String,
    credentials: Credentials,
    session: Session,
}

impl CloudTransport {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
            session: Session::default(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    fn login(&mut self) -> Result<(), TransportError> {
        let url = format!("{}/users/login", self.base_url);
        debug!(url = %url, username = %self.credentials.username, "logging in");

        let resp = self.http.post(&url).json(&self.credentials).send()?;
        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "login rejected");
            return Err(TransportError::LoginRejected(status));
        }

        let login: LoginResponse = resp.json()?;
        let device_id = login
            .device
            .map(|d| d.device_id)
            .ok_or(TransportError::MissingDeviceId)?;

        info!(device_id = %device_id, "logged in");
        self.session = Session {
            token: Some(login.token),
            device_id: Some(device_id),
        };
        Ok(())
    }

    fn token(&mut self) -> Result<String, TransportError> {
        if !self.session.is_authenticated() {
            self.login()?;
        }
        self.session
            .token
            .clone()
            .ok_or(TransportError::Unauthorized)
    }

    fn post(&mut self, request: &RequestBody) -> Result<String, TransportError> {
        let token = self.token()?;
        let url = format!("{}/devices/sci", self.base_url);
        trace!(url = %url, %request, "posting request");

        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(header::CONTENT_TYPE, "application/xml")
            .body(request.as_str().to_owned())
            .send()?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            // Log in again on the next request
            warn!("session token expired");
            self.session.invalidate();
            return Err(TransportError::Unauthorized);
        }

        let body = resp.error_for_status()?.text()?;
        trace!(reply = %body, "got reply");
        Ok(body)
    }
}

impl Transport for CloudTransport {
    type Error = TransportError;

    fn device_id(&mut self) -> Result<String, Self::Error> {
        if self.session.device_id.is_none() {
            self.login()?;
        }
        self.session
            .device_id
            .clone()
            .ok_or(TransportError::MissingDeviceId)
    }

    fn fetch_frame(&mut self, request: &RequestBody) -> Result<Bytes, Self::Error> {
        let reply = self.post(request)?;
        Ok(Base64.decode(file_contents(&reply))?)
    }

    fn send(&mut self, request: &RequestBody) -> Result<(), Self::Error> {
        self.post(request)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::{BufRead, BufReader, Read, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    use super::*;
    use crate::balboa::CommandEncoder;

    const PANEL_REPLY: &str =
        "<sci_reply><file_system><get_file><data>fh3/rxMAXwoe</data></get_file></file_system></sci_reply>";

    // Answers one connection per scripted (status, body) reply and returns what each request
    // was: method, path and the Authorization header when there was one
    fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).unwrap();
                let mut request: Vec<String> = request_line
                    .split_whitespace()
                    .take(2)
                    .map(String::from)
                    .collect();

                let mut length = 0;
                loop {
                    let mut line = String::new();
                    reader.read_line(&mut line).unwrap();
                    let line = line.trim_end();
                    if line.is_empty() {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        match name.to_ascii_lowercase().as_str() {
                            "content-length" => length = value.trim().parse().unwrap(),
                            "authorization" => request.push(value.trim().to_string()),
                            _ => {}
                        }
                    }
                }
                let mut content = vec![0u8; length];
                reader.read_exact(&mut content).unwrap();
                seen.push(request.join(" "));

                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
            }
            seen
        });

        (url, handle)
    }

    fn transport(url: &str) -> CloudTransport {
        CloudTransport::new(
            url,
            Credentials {
                username: "me".into(),
                password: "pw".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_login_response() {
        let login: LoginResponse = serde_json::from_str(
            r#"{"token": "abc", "username": "me", "device": {"device_id": "00000000-00000000-001527FF-FF09818B", "alias": "Hot Tub"}}"#,
        )
        .unwrap();
        assert_eq!(login.token, "abc");
        assert_eq!(
            login.device.unwrap().device_id,
            "00000000-00000000-001527FF-FF09818B"
        );

        let login: LoginResponse = serde_json::from_str(r#"{"token": "abc"}"#).unwrap();
        assert!(login.device.is_none());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let credentials = Credentials {
            username: "me".into(),
            password: "hunter2".into(),
        };
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("me"));
        assert!(!debug.contains("hunter2"));

        assert_eq!(
            serde_json::to_string(&credentials).unwrap(),
            r#"{"username":"me","password":"hunter2"}"#
        );
    }

    #[test]
    fn test_session_invalidate() {
        let mut session = Session {
            token: Some("abc".into()),
            device_id: Some("spa".into()),
        };
        assert!(session.is_authenticated());
        session.invalidate();
        assert!(!session.is_authenticated());
        assert_eq!(session.device_id.as_deref(), Some("spa"));
    }

    #[test]
    fn test_trims_base_url() {
        let transport = transport("https://example.invalid/");
        assert_eq!(transport.base_url, "https://example.invalid");
        assert_eq!(transport.session(), &Session::default());
    }

    #[test]
    fn test_unauthorized_logs_in_again() {
        let (url, server) = serve(vec![
            (200, r#"{"token": "t1", "device": {"device_id": "spa-1"}}"#),
            (401, ""),
            (200, r#"{"token": "t2", "device": {"device_id": "spa-1"}}"#),
            (200, PANEL_REPLY),
        ]);
        let mut transport = transport(&url);
        let request = CommandEncoder::new("spa-1").panel_update();

        assert_eq!(transport.device_id().unwrap(), "spa-1");
        assert!(matches!(
            transport.fetch_frame(&request),
            Err(TransportError::Unauthorized)
        ));
        assert_eq!(transport.session().token, None);
        assert_eq!(transport.session().device_id.as_deref(), Some("spa-1"));

        let frame = transport.fetch_frame(&request).unwrap();
        assert_eq!(&frame[..], &hex_literal::hex!("7e1dffaf13005f0a1e")[..]);
        assert_eq!(transport.session().token.as_deref(), Some("t2"));

        assert_eq!(
            server.join().unwrap(),
            vec![
                "POST /users/login",
                "POST /devices/sci Bearer t1",
                "POST /users/login",
                "POST /devices/sci Bearer t2",
            ]
        );
    }

    #[test]
    fn test_login_failures() {
        let (url, server) = serve(vec![(403, ""), (200, r#"{"token": "t1"}"#)]);
        let mut transport = transport(&url);

        assert!(matches!(
            transport.device_id(),
            Err(TransportError::LoginRejected(StatusCode::FORBIDDEN))
        ));
        assert!(matches!(
            transport.device_id(),
            Err(TransportError::MissingDeviceId)
        ));
        assert!(!transport.session().is_authenticated());

        assert_eq!(server.join().unwrap().len(), 2);
    }
}
