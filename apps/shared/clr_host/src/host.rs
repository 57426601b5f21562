//! Host-side collaborators of the bridge
//!
//! Everything the game server process hands to the bridge: its opaque handle,
//! entity references carried by events, resource creation info, the host
//! logging sink and the working-directory provider.

use std::io;
use std::path::PathBuf;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Opaque handle of the host process, passed unchanged to the "main" entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HostHandle(usize);

impl HostHandle {
    pub fn new(raw: usize) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> usize {
        self.0
    }
}

/// Kind of a host entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum EntityKind {
    Player = 1,
    Vehicle = 2,
    Checkpoint = 3,
    Blip = 4,
    ColShape = 5,
    VoiceChannel = 6,
    Unknown = 0,
}

impl EntityKind {
    /// Convert from u8 (for FFI interop)
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => EntityKind::Player,
            2 => EntityKind::Vehicle,
            3 => EntityKind::Checkpoint,
            4 => EntityKind::Blip,
            5 => EntityKind::ColShape,
            6 => EntityKind::VoiceChannel,
            _ => EntityKind::Unknown,
        }
    }

    /// Convert to u8 (for FFI interop)
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Reference to an entity owned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub kind: EntityKind,
    pub id: u32,
}

impl Entity {
    pub fn new(kind: EntityKind, id: u32) -> Self {
        Self { kind, id }
    }

    pub fn player(id: u32) -> Self {
        Self::new(EntityKind::Player, id)
    }

    pub fn vehicle(id: u32) -> Self {
        Self::new(EntityKind::Vehicle, id)
    }

    pub fn checkpoint(id: u32) -> Self {
        Self::new(EntityKind::Checkpoint, id)
    }
}

/// Creation info the host supplies for every resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResourceDescriptor {
    /// Resource name, also the directory name under the resources path
    pub name: String,
    /// Main script identifier passed to the "main" entry point
    pub main: String,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>, main: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            main: main.into(),
        }
    }
}

/// The host's text logging sink
pub trait HostLog: Send + Sync {
    fn log_info(&self, message: &str);
}

/// Logging sink that forwards host messages to tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl HostLog for TracingLog {
    fn log_info(&self, message: &str) {
        info!(target: "clr_host::host", "{}", message);
    }
}

/// Provides the host's working directory
pub trait PathProvider: Send + Sync {
    fn working_dir(&self) -> io::Result<PathBuf>;
}

/// Working directory of the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct CurrentDirProvider;

impl PathProvider for CurrentDirProvider {
    fn working_dir(&self) -> io::Result<PathBuf> {
        std::env::current_dir()
    }
}
