use crate::error::Error;
use crate::frame::{FrameHeader, OpCode, MAX_CONTROL_PAYLOAD};
use crate::mask::write_masked;
use crate::request::build_request;
use log::trace;
use std::io::Write;
use url::Url;

/// Client-side frame writer. Owns the masking key, which is drawn once at
/// client construction and reused for every outbound frame. That is
/// protocol-legal, since the key travels inside each frame's header anyway.
pub struct Sender {
    mask: [u8; 4],
}

impl Sender {
    pub(crate) fn new(mask: [u8; 4]) -> Self {
        Self { mask }
    }

    /// Emits the opening HTTP upgrade request in one pass.
    pub fn send_request<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        url: &Url,
        user_headers: &[(&str, &str)],
        key: &str,
    ) -> Result<(), Error> {
        let request = build_request(url, key, user_headers);
        trace!("handshake request out, {} bytes", request.len());
        writer.write_all(request.as_bytes())?;
        Ok(())
    }

    /// Sends one complete message. Data opcodes go out as a single final
    /// frame; control opcodes are bounded at 125 payload bytes; close without
    /// arguments is the empty close frame. Fragments don't belong here.
    pub fn send<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        opcode: OpCode,
        data: &[u8],
    ) -> Result<(), Error> {
        match opcode {
            OpCode::Text | OpCode::Binary => self.write_frame(writer, true, opcode, data),
            OpCode::Ping | OpCode::Pong => {
                if data.len() > MAX_CONTROL_PAYLOAD {
                    return Err(Error::PayloadTooBig);
                }
                self.write_frame(writer, true, opcode, data)
            }
            OpCode::Close => self.send_close(writer, None),
            OpCode::Continue | OpCode::End => Err(Error::UseStreamInstead),
        }
    }

    /// Sends a close frame. With a status, the first two payload bytes carry
    /// the code big-endian and the reason follows (RFC 6455 §5.5.1); the
    /// whole payload stays within the control-frame bound.
    pub fn send_close<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        status: Option<(u16, &[u8])>,
    ) -> Result<(), Error> {
        match status {
            None => self.write_frame(writer, true, OpCode::Close, &[]),
            Some((code, reason)) => {
                if 2 + reason.len() > MAX_CONTROL_PAYLOAD {
                    return Err(Error::PayloadTooBig);
                }
                let mut payload = Vec::with_capacity(2 + reason.len());
                payload.extend_from_slice(&code.to_be_bytes());
                payload.extend_from_slice(reason);
                self.write_frame(writer, true, OpCode::Close, &payload)
            }
        }
    }

    /// Emits one fragment of a larger logical message. Text or Binary opens
    /// a sequence, `Continue` extends it, `End` terminates it with a final
    /// continuation frame. A `None` payload emits a header-only fragment,
    /// which is how a stream whose data already went out gets terminated.
    ///
    /// The sender keeps no state between calls; well-formed ordering is the
    /// caller's contract.
    pub fn stream<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        opcode: OpCode,
        data: Option<&[u8]>,
    ) -> Result<(), Error> {
        let payload = data.unwrap_or(&[]);
        match opcode {
            OpCode::Text | OpCode::Binary => self.write_frame(writer, false, opcode, payload),
            OpCode::Continue => self.write_frame(writer, false, OpCode::Continue, payload),
            OpCode::End => self.write_frame(writer, true, OpCode::Continue, payload),
            OpCode::Close | OpCode::Ping | OpCode::Pong => Err(Error::UseSendInstead),
        }
    }

    fn write_frame<W: Write + ?Sized>(
        &mut self,
        writer: &mut W,
        fin: bool,
        opcode: OpCode,
        payload: &[u8],
    ) -> Result<(), Error> {
        trace!(
            "frame out: {:?}, fin {}, {} payload bytes",
            opcode,
            fin,
            payload.len()
        );
        let (header, header_len) = FrameHeader::encode(fin, opcode, payload.len() as u64, self.mask);
        writer.write_all(&header[..header_len])?;
        write_masked(writer, payload, self.mask)
    }
}
