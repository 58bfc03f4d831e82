use crate::error::Error;
use url::Url;

/// Where a ws/wss URL points once scheme and port defaults are resolved.
/// This is what the TCP layer needs to dial, plus the value the Host header
/// should carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// `host` or `host:port`, with the port included only when the URL spelled
    /// one out, matching what browsers put in the Host header.
    pub host_header: String,
    pub secure: bool,
}

/// Resolves scheme, host and port out of a WebSocket URL. `ws` defaults to
/// port 80 and `wss` to 443; anything else is not a WebSocket scheme.
pub fn resolve_url(url: &Url) -> Result<Endpoint, Error> {
    let default_port: u16 = match url.scheme() {
        "ws" => 80,
        "wss" => 443,
        _ => return Err(Error::UnknownScheme),
    };

    let host = url.host_str().ok_or(Error::MissingHost)?.to_string();
    let port = url.port().unwrap_or(default_port);

    let host_header = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.clone(),
    };

    Ok(Endpoint {
        host,
        port,
        host_header,
        secure: url.scheme() == "wss",
    })
}

/// The request target for the GET line: path plus query plus fragment, as
/// they appear in the URL.
pub fn request_target(url: &Url) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        target.push('#');
        target.push_str(fragment);
    }
    target
}

/// Builds the opening upgrade request in one pass: the GET line, the fixed
/// upgrade headers, the key, then the caller's headers in caller order, then
/// the terminating blank line. Supplying Host is the caller's business;
/// `connect` injects it, a bare Client leaves it to its user.
pub fn build_request(url: &Url, key: &str, user_headers: &[(&str, &str)]) -> String {
    let mut request = format!(
        "GET {} HTTP/1.1\r\n\
         Pragma: no-cache\r\n\
         Cache-Control: no-cache\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: {}\r\n",
        request_target(url),
        key,
    );

    for (name, value) in user_headers {
        request.push_str(name);
        request.push_str(": ");
        request.push_str(value);
        request.push_str("\r\n");
    }

    request.push_str("\r\n");
    request
}
