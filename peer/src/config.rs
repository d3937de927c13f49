//! Command-line configuration and session identity.

use clap::Parser;
use shared::PlayerId;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Length in bytes of topics and public keys.
pub const KEY_LEN: usize = 32;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("topic is not valid hex: {0}")]
    TopicHex(#[from] hex::FromHexError),

    #[error("topic must be {expected} bytes, got {actual}")]
    TopicLength { expected: usize, actual: usize },
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Local UDP address to bind to
    #[arg(short = 'b', long, default_value = "0.0.0.0:0")]
    pub bind: SocketAddr,

    /// Address of a peer already in the game (repeatable)
    #[arg(short = 'p', long = "peer")]
    pub peers: Vec<SocketAddr>,

    /// Hex topic of the game to join. Omit to create a new game.
    #[arg(short = 't', long)]
    pub topic: Option<String>,

    /// Seconds of silence before a peer is considered gone
    #[arg(long, default_value = "5")]
    pub timeout_secs: u64,
}

impl Args {
    /// The topic to join, or a fresh random one when creating a game.
    pub fn resolve_topic(&self) -> Result<Topic, ConfigError> {
        match &self.topic {
            Some(text) => Topic::from_hex(text),
            None => Ok(Topic::random()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Rendezvous topic shared by every peer of one game.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Topic([u8; KEY_LEN]);

impl Topic {
    pub fn random() -> Self {
        Topic(rand::random())
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Topic(bytes)
    }

    pub fn from_hex(text: &str) -> Result<Self, ConfigError> {
        let bytes = hex::decode(text.trim())?;
        let bytes: [u8; KEY_LEN] =
            bytes
                .as_slice()
                .try_into()
                .map_err(|_| ConfigError::TopicLength {
                    expected: KEY_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Topic(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({})", self.to_hex())
    }
}

/// This peer's public identity. The player id is derived from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    public_key: [u8; KEY_LEN],
}

impl Identity {
    pub fn generate() -> Self {
        Self {
            public_key: rand::random(),
        }
    }

    pub fn from_public_key(public_key: [u8; KEY_LEN]) -> Self {
        Self { public_key }
    }

    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        &self.public_key
    }

    pub fn player_id(&self) -> PlayerId {
        PlayerId::from_public_key(&self.public_key)
    }
}
