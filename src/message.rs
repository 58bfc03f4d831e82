use crate::error::Error;
use crate::frame::OpCode;
use std::fmt;
use std::io::{self, Read};

/// Bounded read handle over the payload of the frame a partial receive just
/// returned. The caller must drain it completely before the next receive
/// call; bytes left behind would be decoded as the next frame's header.
pub struct PartialPayload<'a> {
    inner: io::Take<&'a mut (dyn Read + 'a)>,
}

impl<'a> PartialPayload<'a> {
    pub(crate) fn new(reader: &'a mut (dyn Read + 'a), len: u64) -> Self {
        Self {
            inner: reader.take(len),
        }
    }

    /// Bytes still on the wire for this frame.
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }
}

impl Read for PartialPayload<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

/// Where the payload of a received message ended up, decided by the receive
/// discipline the caller picked.
pub enum MessageData<'a> {
    /// Payload in a contiguous buffer: the caller-supplied region for data
    /// messages, or the receiver's own scratch for control frames.
    Slice(&'a [u8]),
    /// Payload already drained into the caller-supplied writer; carries the
    /// byte count.
    Written(u64),
    /// Payload still on the wire. `complete` mirrors the frame's FIN bit;
    /// the caller drains the reader and receives again until it is true.
    Partial {
        complete: bool,
        reader: PartialPayload<'a>,
    },
}

impl fmt::Debug for MessageData<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageData::Slice(bytes) => f.debug_tuple("Slice").field(&bytes.len()).finish(),
            MessageData::Written(count) => f.debug_tuple("Written").field(count).finish(),
            MessageData::Partial { complete, reader } => f
                .debug_struct("Partial")
                .field("complete", complete)
                .field("remaining", &reader.remaining())
                .finish(),
        }
    }
}

/// A decoded application message. Fragmentation is consumed by the receiver,
/// so the opcode here is always the one of the frame (or first fragment)
/// that carried the data, never `Continue`.
#[derive(Debug)]
pub struct Message<'a> {
    pub opcode: OpCode,
    pub data: MessageData<'a>,
    /// Close status code, taken big-endian from the first two payload bytes
    /// of a close frame that carried at least two.
    pub code: Option<u16>,
}

impl<'a> Message<'a> {
    pub(crate) fn new(
        opcode: OpCode,
        data: MessageData<'a>,
        code: Option<u16>,
    ) -> Result<Message<'a>, Error> {
        if matches!(opcode, OpCode::Continue | OpCode::End) {
            return Err(Error::FragmentedMessage);
        }
        Ok(Message { opcode, data, code })
    }

    /// The payload bytes, when the chosen discipline left them in memory.
    pub fn as_slice(&self) -> Option<&[u8]> {
        match &self.data {
            MessageData::Slice(bytes) => Some(bytes),
            _ => None,
        }
    }
}
