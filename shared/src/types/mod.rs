//! Core types used throughout the polling system

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::SharedError;

pub mod production;
pub mod profile;
pub mod recipe;
pub mod status;

pub use production::*;
pub use profile::*;
pub use recipe::*;
pub use status::*;

/// Registry identifier of a machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MachineId(pub u32);

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "machine_{}", self.0)
    }
}

impl From<u32> for MachineId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Machine family, selects the protocol adapter variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineType {
    /// Dyeing / finishing unit running multi-step recipes
    #[serde(alias = "BYMakinesi")]
    Dyeing,
    /// Drying unit running a single parameter set
    #[serde(alias = "Kurutma Makinesi")]
    Drying,
}

impl MachineType {
    /// Whether the controller reports step numbers worth analyzing
    pub fn tracks_steps(&self) -> bool {
        matches!(self, MachineType::Dyeing)
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineType::Dyeing => write!(f, "dyeing"),
            MachineType::Drying => write!(f, "drying"),
        }
    }
}

impl FromStr for MachineType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "BYMakinesi" => Ok(MachineType::Dyeing),
            "Kurutma Makinesi" => Ok(MachineType::Drying),
            other if other.eq_ignore_ascii_case("dyeing") => Ok(MachineType::Dyeing),
            other if other.eq_ignore_ascii_case("drying") => Ok(MachineType::Drying),
            other => Err(SharedError::UnknownMachineType {
                input: other.to_string(),
            }),
        }
    }
}

/// Connection state of a machine as seen by its polling worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    ConnectionLost,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::ConnectionLost => write!(f, "connection_lost"),
        }
    }
}

fn default_port() -> u16 {
    502
}

fn default_unit_id() -> u8 {
    1
}

fn default_enabled() -> bool {
    true
}

/// Registry entry for one machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub id: MachineId,
    pub name: String,
    pub machine_type: MachineType,
    /// Controller host name or IP address
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_unit_id")]
    pub unit_id: u8,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Overrides the variant's default register profile
    #[serde(default)]
    pub profile: Option<MachineProfile>,
}

impl MachineConfig {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        machine_type: MachineType,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: MachineId(id),
            name: name.into(),
            machine_type,
            address: address.into(),
            port: default_port(),
            unit_id: default_unit_id(),
            enabled: true,
            profile: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_profile(mut self, profile: MachineProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Effective register profile for this machine
    pub fn profile(&self) -> MachineProfile {
        self.profile
            .clone()
            .unwrap_or_else(|| MachineProfile::for_type(self.machine_type))
    }

    /// `host:port` of the controller
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
