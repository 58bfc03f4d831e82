use crate::config::WebSocketConfig;
use crate::connection::WSConnection;
use crate::error::Error;
use crate::read::Receiver;
use crate::request::resolve_url;
use crate::write::Sender;
use base64::prelude::BASE64_STANDARD;
use base64::Engine;
use log::debug;
use rand::Rng;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpStream;
use url::Url;

const SEC_WEBSOCKET_ACCEPT: &str = "Sec-WebSocket-Accept";

// RFC 6455 §4.1: the fixed GUID appended to the key before hashing.
const HANDSHAKE_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The digest the server must echo back in Sec-WebSocket-Accept:
/// base64(SHA1(key || GUID)).
pub(crate) fn accept_digest(key: &str) -> String {
    let digest = Sha1::new_with_prefix(key.as_bytes())
        .chain_update(HANDSHAKE_GUID.as_bytes())
        .finalize();
    BASE64_STANDARD.encode(digest)
}

/// A fresh Sec-WebSocket-Key: 16 random bytes, standard base64 (24 chars).
pub(crate) fn fresh_key() -> String {
    BASE64_STANDARD.encode(rand::rng().random::<[u8; 16]>())
}

/// The protocol engine: a sender and a receiver glued together, independent
/// of any concrete transport. Construction draws the masking key the sender
/// keeps for its lifetime.
pub struct Client {
    pub(crate) sender: Sender,
    pub(crate) receiver: Receiver,
}

impl Client {
    pub fn new() -> Self {
        let mask: [u8; 4] = rand::rng().random();
        Client {
            sender: Sender::new(mask),
            receiver: Receiver::new(),
        }
    }

    /// Performs the opening handshake over an established transport: draws
    /// a fresh key, emits the upgrade request, validates the server's
    /// response digest. Returns the response headers on success.
    pub fn handshake<S: Read + Write>(
        &mut self,
        stream: &mut S,
        url: &Url,
        user_headers: &[(&str, &str)],
    ) -> Result<HashMap<String, String>, Error> {
        let key = fresh_key();
        self.handshake_with_key(stream, url, user_headers, &key)
    }

    pub(crate) fn handshake_with_key<S: Read + Write>(
        &mut self,
        stream: &mut S,
        url: &Url,
        user_headers: &[(&str, &str)],
        key: &str,
    ) -> Result<HashMap<String, String>, Error> {
        self.sender.send_request(stream, url, user_headers, key)?;
        let headers = self.receiver.receive_response(stream)?;

        // Header names are kept case-exact, but the lookup can't be: the
        // server is free to spell the header however it likes.
        let accept = headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(SEC_WEBSOCKET_ACCEPT))
            .map(|(_, value)| value.as_str())
            .ok_or(Error::AcceptKeyNotFound)?;

        if accept != accept_digest(key) {
            return Err(Error::KeyControlFailed);
        }

        debug!("handshake complete with {}", url);
        Ok(headers)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Opens a TCP connection to a ws:// endpoint, performs the handshake and
/// returns a ready-to-use connection. The Host header is derived from the
/// URL; caller headers follow it in caller order.
pub fn connect(
    raw_url: &str,
    user_headers: &[(&str, &str)],
) -> Result<WSConnection<TcpStream>, Error> {
    connect_with_config(raw_url, user_headers, WebSocketConfig::default())
}

pub fn connect_with_config(
    raw_url: &str,
    user_headers: &[(&str, &str)],
    config: WebSocketConfig,
) -> Result<WSConnection<TcpStream>, Error> {
    let url = Url::parse(raw_url)?;
    let endpoint = resolve_url(&url)?;
    if endpoint.secure {
        // TODO: route a TLS stream through the Transport seam so wss works.
        return Err(Error::TlsNotSupported);
    }

    let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port))?;
    debug!("connected to {}:{}", endpoint.host, endpoint.port);

    let mut headers: Vec<(&str, &str)> = Vec::with_capacity(user_headers.len() + 1);
    headers.push(("Host", endpoint.host_header.as_str()));
    headers.extend_from_slice(user_headers);

    // A failed handshake drops the stream with everything else acquired so
    // far; there is no half-open connection to hand back.
    WSConnection::handshake(stream, &url, &headers, config)
}
