//! Synchronous WebSockets client for blocking byte streams.
//!
//! This library implements the client side of the
//! [WebSocket Protocol RFC](https://datatracker.ietf.org/doc/html/rfc6455)
//! over plain blocking I/O, typically a `std::net::TcpStream`: it performs
//! the opening handshake, masks and frames outbound messages, decodes
//! inbound frames, assembles fragmented messages and surfaces control
//! frames, until either side closes.
//!
//! Received payloads can be consumed three ways: assembled into a
//! caller-supplied buffer, drained into a caller-supplied writer, or read
//! frame by frame straight off the wire through a bounded reader.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod frame;
pub mod message;

mod mask;
mod read;
mod request;
mod write;
