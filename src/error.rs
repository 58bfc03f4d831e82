use httparse::Error as HttpParseError;
use std::io;
use thiserror::Error;
use url::ParseError;

#[derive(Error, Debug)]
pub enum Error {
    // General Errors
    #[error("IO Error happened: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    // Handshake Errors
    #[error("{source}")]
    URLParseError {
        #[from]
        source: ParseError,
    },

    #[error("Invalid scheme in WebSocket URL, expected ws or wss")]
    UnknownScheme,

    #[error("WebSocket URL has no host")]
    MissingHost,

    #[error("wss URLs need a TLS transport, which isn't implemented yet")]
    TlsNotSupported,

    #[error("Server didn't answer with 101 Switching Protocols")]
    FailedSwitchingProtocols,

    #[error("{source}")]
    HttpParseError {
        #[from]
        source: HttpParseError,
    },

    #[error("Malformed HTTP response from the server")]
    BadHttpResponse,

    #[error("HTTP response headers exceed the allowed length")]
    HttpHeaderTooLong,

    #[error("Couldn't find Sec-WebSocket-Accept header in the response")]
    AcceptKeyNotFound,

    #[error("Server didn't send a valid Sec-WebSocket-Accept key")]
    KeyControlFailed,

    // Framing Errors
    #[error("Received a masked frame from the server")]
    MaskedMessageFromServer,

    #[error("Unknown opcode: {0:#x}")]
    UnknownOpcode(u8),

    #[error("RSV bit set without a negotiated extension")]
    RsvNotZero,

    #[error("Control frames must not be fragmented")]
    ControlFrameFragmented,

    #[error("Payload exceeds the allowed size")]
    PayloadTooBig,

    #[error("Stream ended in the middle of a frame")]
    EndOfStream,

    // Fragmentation Errors
    #[error("A surfaced message can't carry the continuation opcode")]
    FragmentedMessage,

    #[error("Frame violates the fragmentation order")]
    BadMessageOrder,

    // API misuse
    #[error("Fragments must be sent through stream, not send")]
    UseStreamInstead,

    #[error("Control frames must be sent through send, not stream")]
    UseSendInstead,

    // Transport Errors
    #[error("Read timed out before a frame arrived")]
    WouldBlock,
}

impl Error {
    /// Maps a transport read failure onto the protocol taxonomy: timeouts
    /// are retryable `WouldBlock`, a connection that ends mid-frame is
    /// `EndOfStream`, everything else stays an IO error.
    pub(crate) fn from_read(source: io::Error) -> Error {
        match source.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Error::WouldBlock,
            io::ErrorKind::UnexpectedEof => Error::EndOfStream,
            _ => Error::IOError { source },
        }
    }
}
