//! Online web services: pluggable backends that store posts by id.
//!
//! A backend is anything that can hold opaque image blobs and hand them back:
//! a photo host, a local directory, a mock in tests. The orchestrator only
//! ever talks to the [`OwsClient`] trait.

mod client;
mod local;

pub use client::OwsClient;
pub use local::LocalClient;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier for an online web service, stored as a u16 on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ows {
    Flickr,
    Local,
}

impl Ows {
    /// The wire representation of this backend.
    pub fn id(self) -> u16 {
        match self {
            Ows::Flickr => 0,
            Ows::Local => 1,
        }
    }

    /// Parse a wire identifier, failing with `UnknownOws` for values no
    /// backend claims.
    pub fn from_id(id: u16) -> Result<Self> {
        match id {
            0 => Ok(Ows::Flickr),
            1 => Ok(Ows::Local),
            other => Err(Error::UnknownOws(other)),
        }
    }
}

impl fmt::Display for Ows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ows::Flickr => write!(f, "flickr"),
            Ows::Local => write!(f, "local"),
        }
    }
}
