//! Test doubles for the bridge's collaborators

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::context::{ContextHandle, EntryPointDescriptor, ExecutionContextManager};
use crate::entry_points::{EntryPoint, EntryPointTable, ResolvedEntryPoint};
use crate::host::{Entity, HostHandle, HostLog, PathProvider};
use crate::value::MValue;

/// One recorded callback invocation
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Main(HostHandle, String, String),
    Checkpoint(Entity, Entity, bool),
    ClientEvent(Entity, String, Vec<MValue>),
    PlayerConnect(Entity, String),
    PlayerDamage(Entity, Entity, u32, u16),
    PlayerDead(Entity, Entity, u32),
    PlayerDisconnect(Entity, String),
    EntityRemove(Entity),
    ServerEvent(String, Vec<MValue>),
    VehicleChangeSeat(Entity, Entity, u8, u8),
    VehicleEnter(Entity, Entity, u8),
    VehicleLeave(Entity, Entity, u8),
    Stop,
    /// An invoker reported its release
    Released(String),
}

#[derive(Default)]
struct RuntimeState {
    /// Calls tagged with the id of the context they came from
    calls: Vec<(u32, Call)>,
    created: Vec<(PathBuf, PathBuf)>,
    destroyed: Vec<ContextHandle>,
    resolved: Vec<EntryPointDescriptor>,
}

/// Execution context manager that records every call into it
#[derive(Clone, Default)]
pub struct RecordingRuntime {
    state: Arc<Mutex<RuntimeState>>,
    missing: Arc<HashSet<EntryPoint>>,
    fail_create: bool,
    failing: Option<EntryPoint>,
}

impl RecordingRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave `entry_points` unresolvable
    pub fn without(mut self, entry_points: &[EntryPoint]) -> Self {
        self.missing = Arc::new(entry_points.iter().copied().collect());
        self
    }

    /// Make context creation fail
    pub fn failing_creation(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Make `entry_point` report an error when invoked
    pub fn failing_call(mut self, entry_point: EntryPoint) -> Self {
        self.failing = Some(entry_point);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls_by_context().into_iter().map(|(_, call)| call).collect()
    }

    /// Every call with the id of the context it came from
    ///
    /// Context ids follow creation order starting at 1; the standalone
    /// `table()` and released invokers use 0.
    pub fn calls_by_context(&self) -> Vec<(u32, Call)> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Append an invoker release to the call timeline
    pub fn record_release(&self, label: &str) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push((0, Call::Released(label.to_string())));
    }

    pub fn created(&self) -> Vec<(PathBuf, PathBuf)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn destroyed(&self) -> Vec<ContextHandle> {
        self.state.lock().unwrap().destroyed.clone()
    }

    pub fn resolved(&self) -> Vec<EntryPointDescriptor> {
        self.state.lock().unwrap().resolved.clone()
    }

    /// A table with every entry point recording into this runtime
    pub fn table(&self) -> EntryPointTable {
        let mut table = EntryPointTable::empty();
        for entry_point in EntryPoint::ALL {
            table.install(entry_point, self.recorder(entry_point, 0));
        }
        table
    }

    fn recorder(&self, entry_point: EntryPoint, context: u32) -> ResolvedEntryPoint {
        let state = Arc::clone(&self.state);
        let fails = self.failing == Some(entry_point);
        let record = move |call: Call| {
            state.lock().unwrap().calls.push((context, call));
            if fails {
                Err(format!("{} failed", entry_point))
            } else {
                Ok(())
            }
        };

        match entry_point {
            EntryPoint::Main => ResolvedEntryPoint::Main(Box::new(move |host: HostHandle, name: &str, main: &str| {
                record(Call::Main(host, name.to_string(), main.to_string()))
            })),
            EntryPoint::OnCheckpoint => ResolvedEntryPoint::Checkpoint(Box::new(
                move |target, entity, state| record(Call::Checkpoint(target, entity, state)),
            )),
            EntryPoint::OnClientEvent => ResolvedEntryPoint::ClientEvent(Box::new(
                move |target: Entity, name: &str, args: &[MValue]| {
                    record(Call::ClientEvent(target, name.to_string(), args.to_vec()))
                },
            )),
            EntryPoint::OnPlayerConnect => ResolvedEntryPoint::PlayerReason(Box::new(
                move |target: Entity, reason: &str| record(Call::PlayerConnect(target, reason.to_string())),
            )),
            EntryPoint::OnPlayerDamage => ResolvedEntryPoint::PlayerDamage(Box::new(
                move |target, attacker, weapon, damage| {
                    record(Call::PlayerDamage(target, attacker, weapon, damage))
                },
            )),
            EntryPoint::OnPlayerDead => ResolvedEntryPoint::PlayerDead(Box::new(
                move |target, killer, weapon| record(Call::PlayerDead(target, killer, weapon)),
            )),
            EntryPoint::OnPlayerDisconnect => ResolvedEntryPoint::PlayerReason(Box::new(
                move |target: Entity, reason: &str| record(Call::PlayerDisconnect(target, reason.to_string())),
            )),
            EntryPoint::OnEntityRemove => ResolvedEntryPoint::Entity(Box::new(move |entity| {
                record(Call::EntityRemove(entity))
            })),
            EntryPoint::OnServerEvent => ResolvedEntryPoint::ServerEvent(Box::new(
                move |name: &str, args: &[MValue]| record(Call::ServerEvent(name.to_string(), args.to_vec())),
            )),
            EntryPoint::OnVehicleChangeSeat => ResolvedEntryPoint::SeatChange(Box::new(
                move |target, player, old_seat, new_seat| {
                    record(Call::VehicleChangeSeat(target, player, old_seat, new_seat))
                },
            )),
            EntryPoint::OnVehicleEnter => ResolvedEntryPoint::Seat(Box::new(
                move |target, player, seat| record(Call::VehicleEnter(target, player, seat)),
            )),
            EntryPoint::OnVehicleLeave => ResolvedEntryPoint::Seat(Box::new(
                move |target, player, seat| record(Call::VehicleLeave(target, player, seat)),
            )),
            EntryPoint::OnStop => ResolvedEntryPoint::NoArgs(Box::new(move || record(Call::Stop))),
        }
    }
}

impl ExecutionContextManager for RecordingRuntime {
    fn create_context(&self, resource_root: &Path, runtime_library: &Path) -> Option<ContextHandle> {
        let mut state = self.state.lock().unwrap();
        state
            .created
            .push((resource_root.to_path_buf(), runtime_library.to_path_buf()));
        if self.fail_create {
            return None;
        }
        Some(ContextHandle::new(0xC0DE, state.created.len() as u32))
    }

    fn resolve(
        &self,
        handle: &ContextHandle,
        descriptor: &EntryPointDescriptor,
    ) -> Option<ResolvedEntryPoint> {
        self.state.lock().unwrap().resolved.push(descriptor.clone());
        if self.missing.contains(&descriptor.entry_point) {
            return None;
        }
        Some(self.recorder(descriptor.entry_point, handle.id))
    }

    fn destroy_context(&self, handle: ContextHandle) {
        self.state.lock().unwrap().destroyed.push(handle);
    }
}

/// Host log sink that keeps every message
#[derive(Clone, Default)]
pub struct RecordingLog {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingLog {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl HostLog for RecordingLog {
    fn log_info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Path provider with a fixed answer
pub struct FixedDir(pub Option<PathBuf>);

impl PathProvider for FixedDir {
    fn working_dir(&self) -> io::Result<PathBuf> {
        self.0
            .clone()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "working directory unavailable"))
    }
}
