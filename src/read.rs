use crate::error::Error;
use crate::frame::{FrameHeader, OpCode, MAX_CONTROL_PAYLOAD};
use crate::message::{Message, MessageData, PartialPayload};
use bytes::BytesMut;
use log::{debug, trace};
use std::collections::HashMap;
use std::io::{self, Read, Write};

/// Upper bound on the HTTP response head (status line plus headers). A
/// server that keeps talking past this is not switching protocols.
pub const MAX_HTTP_HEADER_LENGTH: usize = 16384;

// Header slots handed to httparse; responses with more fail parsing.
const MAX_RESPONSE_HEADERS: usize = 64;

/// Destination for the payload of the next received message, picked per
/// call. One receive routine serves all three disciplines.
pub enum Sink<'a> {
    /// Drain data payloads into the writer; the message reports the count.
    Writer(&'a mut dyn Write),
    /// Assemble data payloads into the buffer; the message borrows the
    /// written prefix. The buffer's capacity doubles as a payload cap.
    Buffer(&'a mut [u8]),
    /// Leave the payload on the wire and hand out a bounded reader, one
    /// message per frame.
    Partial,
}

struct FragmentedMessage {
    opcode: OpCode,
    /// Payload bytes of the message delivered so far, carried across
    /// receive calls when a control frame surfaces mid-assembly.
    written: u64,
}

/// Client-side decoder: parses the handshake response, then turns frames
/// into messages. Owns the fragmentation state.
pub struct Receiver {
    fragmented_message: Option<FragmentedMessage>,
    // Control payloads are bounded at 125 bytes and parked here, so they
    // never land in the caller's sink between fragments of a data message.
    control_buf: [u8; MAX_CONTROL_PAYLOAD],
}

impl Receiver {
    pub(crate) fn new() -> Self {
        Self {
            fragmented_message: None,
            control_buf: [0u8; MAX_CONTROL_PAYLOAD],
        }
    }

    /// Reads and validates the server's side of the handshake. Anything but
    /// `HTTP/1.1 101 Switching Protocols` fails; on success the response
    /// headers come back with case-exact names.
    pub fn receive_response<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
    ) -> Result<HashMap<String, String>, Error> {
        let head = read_response_head(reader)?;
        parse_response_head(&head)
    }

    /// Decodes frames until one message can be surfaced: a complete data
    /// message, a control frame (fragmentation state survives those), or,
    /// in the partial discipline, the next frame of the current message.
    ///
    /// `max_len == 0` means unbounded; otherwise the cumulative payload of
    /// the current message crossing it fails before the payload is read.
    /// `leading` is a first header byte already pulled by a deadline probe.
    pub(crate) fn receive<'a, R: Read>(
        &'a mut self,
        reader: &'a mut R,
        sink: Sink<'a>,
        max_len: u64,
        leading: Option<u8>,
    ) -> Result<Message<'a>, Error> {
        let mut sink = sink;
        let mut leading = leading;

        loop {
            let header = FrameHeader::parse(&mut *reader, leading.take())?;
            trace!(
                "frame in: {:?}, fin {}, {} payload bytes",
                header.opcode,
                header.fin,
                header.len
            );

            // Control frames may interleave anywhere, fragmentation
            // included. They are read whole (exactly header.len bytes)
            // and surfaced without touching the assembly state.
            if header.opcode.is_control() {
                let len = header.len as usize;
                reader
                    .read_exact(&mut self.control_buf[..len])
                    .map_err(Error::from_read)?;
                let payload = &self.control_buf[..len];

                if header.opcode == OpCode::Close {
                    // First two payload bytes are the status code; whatever
                    // follows is the reason, and that is what the caller
                    // sees as data.
                    let (code, reason) = if len >= 2 {
                        (
                            Some(u16::from_be_bytes([payload[0], payload[1]])),
                            &payload[2..],
                        )
                    } else {
                        (None, payload)
                    };
                    return Message::new(OpCode::Close, MessageData::Slice(reason), code);
                }
                return Message::new(header.opcode, MessageData::Slice(payload), None);
            }

            // Data path. A continuation must have an assembly to continue,
            // and a fresh data frame must not preempt one.
            let (msg_opcode, already) = match (&self.fragmented_message, header.opcode) {
                (Some(frag), OpCode::Continue) => (frag.opcode, frag.written),
                (Some(_), _) => return Err(Error::BadMessageOrder),
                (None, OpCode::Continue) => return Err(Error::BadMessageOrder),
                (None, opcode) => (opcode, 0),
            };

            let total = already
                .checked_add(header.len)
                .ok_or(Error::PayloadTooBig)?;
            if max_len > 0 && total > max_len {
                return Err(Error::PayloadTooBig);
            }

            match &mut sink {
                Sink::Partial => {
                    // One message per frame; the caller drains the payload
                    // and calls receive again until the FIN bit showed up.
                    self.fragmented_message = if header.fin {
                        None
                    } else {
                        Some(FragmentedMessage {
                            opcode: msg_opcode,
                            written: total,
                        })
                    };
                    let payload = PartialPayload::new(reader, header.len);
                    return Message::new(
                        msg_opcode,
                        MessageData::Partial {
                            complete: header.fin,
                            reader: payload,
                        },
                        None,
                    );
                }
                Sink::Writer(writer) => {
                    let copied = io::copy(&mut reader.by_ref().take(header.len), &mut **writer)
                        .map_err(Error::from_read)?;
                    if copied < header.len {
                        return Err(Error::EndOfStream);
                    }
                }
                Sink::Buffer(buf) => {
                    if total > buf.len() as u64 {
                        return Err(Error::PayloadTooBig);
                    }
                    let start = already as usize;
                    let len = header.len as usize;
                    reader
                        .read_exact(&mut buf[start..start + len])
                        .map_err(Error::from_read)?;
                }
            }

            if header.fin {
                self.fragmented_message = None;
                let data = match sink {
                    Sink::Writer(_) => MessageData::Written(total),
                    Sink::Buffer(buf) => {
                        let assembled: &'a [u8] = buf;
                        MessageData::Slice(&assembled[..total as usize])
                    }
                    Sink::Partial => unreachable!(), // returned one message per frame above
                };
                return Message::new(msg_opcode, data, None);
            }

            // Not final: remember where the assembly stands and keep
            // decoding. An interleaved control frame surfaces on its own.
            self.fragmented_message = Some(FragmentedMessage {
                opcode: msg_opcode,
                written: total,
            });
        }
    }
}

// Accumulates the response head until the bare CRLF line, bounded by
// MAX_HTTP_HEADER_LENGTH. Byte-wise reads are fine here: the connection
// fronts the transport with a buffered reader.
fn read_response_head<R: Read + ?Sized>(reader: &mut R) -> Result<BytesMut, Error> {
    let mut head = BytesMut::with_capacity(1024);
    let mut byte = [0u8; 1];

    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_HTTP_HEADER_LENGTH {
            return Err(Error::HttpHeaderTooLong);
        }
        match reader.read_exact(&mut byte) {
            Ok(()) => head.extend_from_slice(&byte),
            // A server that hangs up before the blank line never sent a
            // complete response.
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(Error::BadHttpResponse)
            }
            Err(e) => return Err(Error::from_read(e)),
        }
    }

    Ok(head)
}

fn parse_response_head(head: &[u8]) -> Result<HashMap<String, String>, Error> {
    let mut header_slots = [httparse::EMPTY_HEADER; MAX_RESPONSE_HEADERS];
    let mut response = httparse::Response::new(&mut header_slots);

    match response.parse(head)? {
        httparse::Status::Complete(_) => {}
        httparse::Status::Partial => return Err(Error::BadHttpResponse),
    }

    if response.version != Some(1) || response.code != Some(101) {
        return Err(Error::FailedSwitchingProtocols);
    }

    let mut headers = HashMap::new();
    for header in response.headers.iter() {
        let value =
            std::str::from_utf8(header.value).map_err(|_| Error::BadHttpResponse)?;
        headers.insert(header.name.to_string(), value.trim().to_string());
    }

    debug!(
        "server switched protocols, {} response headers",
        headers.len()
    );
    Ok(headers)
}
