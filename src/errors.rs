//! Crate-wide error type.
//!
//! Each core module defines its own narrow error enum (see `cache::keyed_map::MapError`,
//! `dns::buffer::BufferError`, `dns::protocol::ProtocolError`, ...) and this enum collects
//! them at the boundaries where they need to cross into the CLI or the HTTP control plane.

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum Error {
    Buffer(crate::dns::buffer::BufferError),
    Protocol(crate::dns::protocol::ProtocolError),
    Map(crate::cache::keyed_map::MapError),
    Config(crate::config::ConfigError),
    Control(crate::control::ControlError),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
