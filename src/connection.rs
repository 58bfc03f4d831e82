use crate::client::Client;
use crate::config::WebSocketConfig;
use crate::error::Error;
use crate::frame::OpCode;
use crate::message::Message;
use crate::read::Sink;
use std::collections::HashMap;
use std::io::{self, BufReader, Read, Write};
use std::net::TcpStream;
use std::time::Duration;
use url::Url;

/// What the connection needs from its byte stream: blocking reads and
/// writes, plus receive-side timeout control for deadlines.
pub trait Transport: Read + Write {
    /// Installs or clears the socket-level receive timeout.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
    /// Toggles non-blocking mode, used by zero-deadline receives.
    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()>;
}

impl Transport for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }

    fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        TcpStream::set_nonblocking(self, nonblocking)
    }
}

// Handshake adapter: reads go through the connection's buffer, writes go
// straight to the transport.
struct BufferedStream<'a, S: Transport>(&'a mut BufReader<S>);

impl<S: Transport> Read for BufferedStream<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl<S: Transport> Write for BufferedStream<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.get_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.get_mut().flush()
    }
}

/// A WebSocket client bound to a concrete transport. Owns the transport, a
/// read-side buffer in front of it, and the response headers harvested
/// during the handshake.
///
/// Not safe for two concurrent senders or two concurrent receivers; one
/// dedicated reader thread plus one writer thread is the supported sharing
/// pattern, since the inbound and outbound byte streams are independent.
pub struct WSConnection<S: Transport> {
    // Field order is the teardown order: the header map must be released
    // before the buffered reader takes the transport down with it.
    headers: HashMap<String, String>,
    reader: BufReader<S>,
    client: Client,
    // What set_read_timeout installed, restored after deadline probes.
    socket_timeout: Option<Duration>,
}

impl<S: Transport> WSConnection<S> {
    /// Performs the opening handshake over `stream` and returns the bound
    /// connection. On failure everything acquired so far, the transport
    /// included, is released.
    pub fn handshake(
        stream: S,
        url: &Url,
        headers: &[(&str, &str)],
        config: WebSocketConfig,
    ) -> Result<Self, Error> {
        let mut client = Client::new();
        let mut reader = BufReader::with_capacity(config.read_buffer_capacity.max(1), stream);
        let headers = client.handshake(&mut BufferedStream(&mut reader), url, headers)?;
        Ok(WSConnection {
            headers,
            reader,
            client,
            socket_timeout: None,
        })
    }

    /// Response headers from the handshake, names case-exact as the server
    /// sent them. Retained for the lifetime of the connection.
    pub fn response_headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Installs a receive timeout on the underlying socket. A read that
    /// trips it surfaces as `WouldBlock`.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) -> Result<(), Error> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.socket_timeout = timeout;
        Ok(())
    }

    /// Sends one complete message with the given opcode.
    pub fn send(&mut self, opcode: OpCode, data: &[u8]) -> Result<(), Error> {
        self.client.sender.send(self.reader.get_mut(), opcode, data)
    }

    pub fn send_text(&mut self, text: &str) -> Result<(), Error> {
        self.send(OpCode::Text, text.as_bytes())
    }

    pub fn send_binary(&mut self, data: &[u8]) -> Result<(), Error> {
        self.send(OpCode::Binary, data)
    }

    pub fn send_ping(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.send(OpCode::Ping, payload)
    }

    pub fn send_pong(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.send(OpCode::Pong, payload)
    }

    /// Sends an empty close frame.
    pub fn close(&mut self) -> Result<(), Error> {
        self.client.sender.send_close(self.reader.get_mut(), None)
    }

    /// Sends a close frame carrying a status code and reason.
    pub fn close_with(&mut self, code: u16, reason: &[u8]) -> Result<(), Error> {
        self.client
            .sender
            .send_close(self.reader.get_mut(), Some((code, reason)))
    }

    /// Emits one fragment of a streamed message; see `Sender::stream` for
    /// the opcode contract.
    pub fn stream(&mut self, opcode: OpCode, data: Option<&[u8]>) -> Result<(), Error> {
        self.client
            .sender
            .stream(self.reader.get_mut(), opcode, data)
    }

    /// Receives the next message, draining data payloads into `writer`.
    pub fn receive_into_writer<'a, W: Write>(
        &'a mut self,
        writer: &'a mut W,
        max_len: u64,
    ) -> Result<Message<'a>, Error> {
        self.client
            .receiver
            .receive(&mut self.reader, Sink::Writer(writer), max_len, None)
    }

    /// Receives the next message, assembling data payloads into `buffer`.
    /// When a control frame interrupts a fragmented message, pass the same
    /// buffer to the next call; assembly resumes at the recorded offset.
    pub fn receive_into_buffer<'a>(
        &'a mut self,
        buffer: &'a mut [u8],
        max_len: u64,
    ) -> Result<Message<'a>, Error> {
        self.client
            .receiver
            .receive(&mut self.reader, Sink::Buffer(buffer), max_len, None)
    }

    /// Receives one frame's worth of message, leaving the payload on the
    /// wire behind a bounded reader. Drain it fully before the next
    /// receive, or the stream desynchronizes.
    pub fn receive_partial(&mut self, max_len: u64) -> Result<Message<'_>, Error> {
        self.client
            .receiver
            .receive(&mut self.reader, Sink::Partial, max_len, None)
    }

    /// Like `receive_into_writer`, but waits at most `deadline` for the
    /// first byte of the next frame. A zero deadline probes without
    /// waiting. `WouldBlock` consumes nothing; retrying is well-defined.
    pub fn receive_into_writer_deadline<'a, W: Write>(
        &'a mut self,
        writer: &'a mut W,
        max_len: u64,
        deadline: Duration,
    ) -> Result<Message<'a>, Error> {
        let leading = self.wait_first_byte(deadline)?;
        self.client.receiver.receive(
            &mut self.reader,
            Sink::Writer(writer),
            max_len,
            Some(leading),
        )
    }

    /// `receive_into_buffer` with a deadline on the first byte.
    pub fn receive_into_buffer_deadline<'a>(
        &'a mut self,
        buffer: &'a mut [u8],
        max_len: u64,
        deadline: Duration,
    ) -> Result<Message<'a>, Error> {
        let leading = self.wait_first_byte(deadline)?;
        self.client.receiver.receive(
            &mut self.reader,
            Sink::Buffer(buffer),
            max_len,
            Some(leading),
        )
    }

    /// `receive_partial` with a deadline on the first byte.
    pub fn receive_partial_deadline(
        &mut self,
        max_len: u64,
        deadline: Duration,
    ) -> Result<Message<'_>, Error> {
        let leading = self.wait_first_byte(deadline)?;
        self.client
            .receiver
            .receive(&mut self.reader, Sink::Partial, max_len, Some(leading))
    }

    // Waits up to `deadline` for the first header byte of the next frame,
    // arming the socket timeout (or non-blocking mode for a zero deadline)
    // only around that one read, then restoring whatever set_read_timeout
    // installed. Buffered bytes short-circuit the socket entirely.
    fn wait_first_byte(&mut self, deadline: Duration) -> Result<u8, Error> {
        let mut byte = [0u8; 1];

        if !self.reader.buffer().is_empty() {
            self.reader.read_exact(&mut byte).map_err(Error::from_read)?;
            return Ok(byte[0]);
        }

        let result = if deadline.is_zero() {
            self.reader.get_ref().set_nonblocking(true)?;
            let result = self.reader.read_exact(&mut byte);
            self.reader.get_ref().set_nonblocking(false)?;
            result
        } else {
            self.reader.get_ref().set_read_timeout(Some(deadline))?;
            let result = self.reader.read_exact(&mut byte);
            self.reader.get_ref().set_read_timeout(self.socket_timeout)?;
            result
        };

        match result {
            Ok(()) => Ok(byte[0]),
            Err(e) => Err(Error::from_read(e)),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_raw(stream: S, config: WebSocketConfig) -> Self {
        WSConnection {
            headers: HashMap::new(),
            reader: BufReader::with_capacity(config.read_buffer_capacity.max(1), stream),
            client: Client::new(),
            socket_timeout: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn stream_mut(&mut self) -> &mut S {
        self.reader.get_mut()
    }
}
