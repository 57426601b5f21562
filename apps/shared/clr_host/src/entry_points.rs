//! Entry-Point Table
//!
//! The fixed set of named callbacks a resource's execution context exports.
//! Each slot is resolved once when the resource is constructed; a slot that
//! could not be resolved stays `Unresolved` and every invocation site checks
//! it before calling.

use std::fmt;

use tracing::{debug, warn};

use crate::context::{ContextHandle, EntryPointDescriptor, ExecutionContextManager};
use crate::error::{BridgeError, CallResult, Result};
use crate::host::{Entity, HostHandle};
use crate::value::MValue;

/// Named callbacks exported by the embedded module wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    Main,
    OnCheckpoint,
    OnClientEvent,
    OnPlayerConnect,
    OnPlayerDamage,
    OnPlayerDead,
    OnPlayerDisconnect,
    OnEntityRemove,
    OnServerEvent,
    OnVehicleChangeSeat,
    OnVehicleEnter,
    OnVehicleLeave,
    OnStop,
}

impl EntryPoint {
    pub const ALL: [EntryPoint; 13] = [
        EntryPoint::Main,
        EntryPoint::OnCheckpoint,
        EntryPoint::OnClientEvent,
        EntryPoint::OnPlayerConnect,
        EntryPoint::OnPlayerDamage,
        EntryPoint::OnPlayerDead,
        EntryPoint::OnPlayerDisconnect,
        EntryPoint::OnEntityRemove,
        EntryPoint::OnServerEvent,
        EntryPoint::OnVehicleChangeSeat,
        EntryPoint::OnVehicleEnter,
        EntryPoint::OnVehicleLeave,
        EntryPoint::OnStop,
    ];

    /// Method name on the module wrapper type
    pub fn method_name(&self) -> &'static str {
        match self {
            EntryPoint::Main => "Main",
            EntryPoint::OnCheckpoint => "OnCheckpoint",
            EntryPoint::OnClientEvent => "OnClientEvent",
            EntryPoint::OnPlayerConnect => "OnPlayerConnect",
            EntryPoint::OnPlayerDamage => "OnPlayerDamage",
            EntryPoint::OnPlayerDead => "OnPlayerDead",
            EntryPoint::OnPlayerDisconnect => "OnPlayerDisconnect",
            EntryPoint::OnEntityRemove => "OnEntityRemove",
            EntryPoint::OnServerEvent => "OnServerEvent",
            EntryPoint::OnVehicleChangeSeat => "OnVehicleChangeSeat",
            EntryPoint::OnVehicleEnter => "OnVehicleEnter",
            EntryPoint::OnVehicleLeave => "OnVehicleLeave",
            EntryPoint::OnStop => "OnStop",
        }
    }

    /// Look up an entry point by its method name
    pub fn from_method_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ep| ep.method_name() == name)
    }

    /// Fixed signature of this entry point
    pub fn signature(&self) -> Signature {
        match self {
            EntryPoint::Main => Signature::Main,
            EntryPoint::OnCheckpoint => Signature::Checkpoint,
            EntryPoint::OnClientEvent => Signature::ClientEvent,
            EntryPoint::OnPlayerConnect | EntryPoint::OnPlayerDisconnect => Signature::PlayerReason,
            EntryPoint::OnPlayerDamage => Signature::PlayerDamage,
            EntryPoint::OnPlayerDead => Signature::PlayerDead,
            EntryPoint::OnEntityRemove => Signature::Entity,
            EntryPoint::OnServerEvent => Signature::ServerEvent,
            EntryPoint::OnVehicleChangeSeat => Signature::SeatChange,
            EntryPoint::OnVehicleEnter | EntryPoint::OnVehicleLeave => Signature::Seat,
            EntryPoint::OnStop => Signature::NoArgs,
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}

/// Shape of the positional arguments an entry point accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signature {
    /// (host, resource name, main script)
    Main,
    /// (target, entity, state)
    Checkpoint,
    /// (target, event name, args)
    ClientEvent,
    /// (target, reason)
    PlayerReason,
    /// (target, attacker, weapon, damage)
    PlayerDamage,
    /// (target, killer, weapon)
    PlayerDead,
    /// (entity)
    Entity,
    /// (event name, args)
    ServerEvent,
    /// (target, player, old seat, new seat)
    SeatChange,
    /// (target, player, seat)
    Seat,
    NoArgs,
}

pub type MainFn = Box<dyn FnMut(HostHandle, &str, &str) -> CallResult + Send>;
pub type CheckpointFn = Box<dyn FnMut(Entity, Entity, bool) -> CallResult + Send>;
pub type ClientEventFn = Box<dyn FnMut(Entity, &str, &[MValue]) -> CallResult + Send>;
pub type PlayerReasonFn = Box<dyn FnMut(Entity, &str) -> CallResult + Send>;
pub type PlayerDamageFn = Box<dyn FnMut(Entity, Entity, u32, u16) -> CallResult + Send>;
pub type PlayerDeadFn = Box<dyn FnMut(Entity, Entity, u32) -> CallResult + Send>;
pub type EntityFn = Box<dyn FnMut(Entity) -> CallResult + Send>;
pub type ServerEventFn = Box<dyn FnMut(&str, &[MValue]) -> CallResult + Send>;
pub type SeatChangeFn = Box<dyn FnMut(Entity, Entity, u8, u8) -> CallResult + Send>;
pub type SeatFn = Box<dyn FnMut(Entity, Entity, u8) -> CallResult + Send>;
pub type NoArgsFn = Box<dyn FnMut() -> CallResult + Send>;

/// A callable resolved from an execution context, typed by its signature
pub enum ResolvedEntryPoint {
    Main(MainFn),
    Checkpoint(CheckpointFn),
    ClientEvent(ClientEventFn),
    PlayerReason(PlayerReasonFn),
    PlayerDamage(PlayerDamageFn),
    PlayerDead(PlayerDeadFn),
    Entity(EntityFn),
    ServerEvent(ServerEventFn),
    SeatChange(SeatChangeFn),
    Seat(SeatFn),
    NoArgs(NoArgsFn),
}

impl ResolvedEntryPoint {
    pub fn signature(&self) -> Signature {
        match self {
            ResolvedEntryPoint::Main(_) => Signature::Main,
            ResolvedEntryPoint::Checkpoint(_) => Signature::Checkpoint,
            ResolvedEntryPoint::ClientEvent(_) => Signature::ClientEvent,
            ResolvedEntryPoint::PlayerReason(_) => Signature::PlayerReason,
            ResolvedEntryPoint::PlayerDamage(_) => Signature::PlayerDamage,
            ResolvedEntryPoint::PlayerDead(_) => Signature::PlayerDead,
            ResolvedEntryPoint::Entity(_) => Signature::Entity,
            ResolvedEntryPoint::ServerEvent(_) => Signature::ServerEvent,
            ResolvedEntryPoint::SeatChange(_) => Signature::SeatChange,
            ResolvedEntryPoint::Seat(_) => Signature::Seat,
            ResolvedEntryPoint::NoArgs(_) => Signature::NoArgs,
        }
    }
}

impl fmt::Debug for ResolvedEntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResolvedEntryPoint({:?})", self.signature())
    }
}

/// One table entry
pub enum Slot<F> {
    Resolved(F),
    Unresolved,
}

impl<F> Slot<F> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Slot::Resolved(_))
    }

    /// Borrow the callable, or report the entry point as unresolved
    pub fn callable(&mut self, entry_point: EntryPoint) -> Result<&mut F> {
        match self {
            Slot::Resolved(f) => Ok(f),
            Slot::Unresolved => Err(BridgeError::Unresolved(entry_point)),
        }
    }
}

impl<F> Default for Slot<F> {
    fn default() -> Self {
        Slot::Unresolved
    }
}

/// Resolved callables of one resource, one slot per entry point
#[derive(Default)]
pub struct EntryPointTable {
    pub main: Slot<MainFn>,
    pub on_checkpoint: Slot<CheckpointFn>,
    pub on_client_event: Slot<ClientEventFn>,
    pub on_player_connect: Slot<PlayerReasonFn>,
    pub on_player_damage: Slot<PlayerDamageFn>,
    pub on_player_dead: Slot<PlayerDeadFn>,
    pub on_player_disconnect: Slot<PlayerReasonFn>,
    pub on_entity_remove: Slot<EntityFn>,
    pub on_server_event: Slot<ServerEventFn>,
    pub on_vehicle_change_seat: Slot<SeatChangeFn>,
    pub on_vehicle_enter: Slot<SeatFn>,
    pub on_vehicle_leave: Slot<SeatFn>,
    pub on_stop: Slot<NoArgsFn>,
}

impl EntryPointTable {
    /// Table with every slot unresolved
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve every entry point from the given context
    ///
    /// Resolution is best-effort: a missing symbol or a callable with the
    /// wrong signature leaves its slot unresolved.
    pub fn resolve(
        contexts: &dyn ExecutionContextManager,
        handle: &ContextHandle,
        namespace: &str,
        type_name: &str,
    ) -> Self {
        let mut table = Self::empty();

        for entry_point in EntryPoint::ALL {
            let descriptor = EntryPointDescriptor::new(namespace, type_name, entry_point);
            match contexts.resolve(handle, &descriptor) {
                Some(resolved) => {
                    let signature = resolved.signature();
                    if !table.install(entry_point, resolved) {
                        warn!(
                            "Entry point '{}' resolved with signature {:?}, expected {:?}",
                            entry_point,
                            signature,
                            entry_point.signature()
                        );
                    }
                }
                None => debug!("Entry point '{}' not found in {}", entry_point, type_name),
            }
        }

        table
    }

    /// Store a resolved callable in the slot of `entry_point`
    ///
    /// Returns `false` and leaves the slot untouched when the callable's
    /// signature does not match the entry point.
    pub fn install(&mut self, entry_point: EntryPoint, resolved: ResolvedEntryPoint) -> bool {
        use ResolvedEntryPoint as R;

        match (entry_point, resolved) {
            (EntryPoint::Main, R::Main(f)) => self.main = Slot::Resolved(f),
            (EntryPoint::OnCheckpoint, R::Checkpoint(f)) => self.on_checkpoint = Slot::Resolved(f),
            (EntryPoint::OnClientEvent, R::ClientEvent(f)) => {
                self.on_client_event = Slot::Resolved(f)
            }
            (EntryPoint::OnPlayerConnect, R::PlayerReason(f)) => {
                self.on_player_connect = Slot::Resolved(f)
            }
            (EntryPoint::OnPlayerDamage, R::PlayerDamage(f)) => {
                self.on_player_damage = Slot::Resolved(f)
            }
            (EntryPoint::OnPlayerDead, R::PlayerDead(f)) => self.on_player_dead = Slot::Resolved(f),
            (EntryPoint::OnPlayerDisconnect, R::PlayerReason(f)) => {
                self.on_player_disconnect = Slot::Resolved(f)
            }
            (EntryPoint::OnEntityRemove, R::Entity(f)) => self.on_entity_remove = Slot::Resolved(f),
            (EntryPoint::OnServerEvent, R::ServerEvent(f)) => {
                self.on_server_event = Slot::Resolved(f)
            }
            (EntryPoint::OnVehicleChangeSeat, R::SeatChange(f)) => {
                self.on_vehicle_change_seat = Slot::Resolved(f)
            }
            (EntryPoint::OnVehicleEnter, R::Seat(f)) => self.on_vehicle_enter = Slot::Resolved(f),
            (EntryPoint::OnVehicleLeave, R::Seat(f)) => self.on_vehicle_leave = Slot::Resolved(f),
            (EntryPoint::OnStop, R::NoArgs(f)) => self.on_stop = Slot::Resolved(f),
            _ => return false,
        }
        true
    }

    pub fn is_resolved(&self, entry_point: EntryPoint) -> bool {
        match entry_point {
            EntryPoint::Main => self.main.is_resolved(),
            EntryPoint::OnCheckpoint => self.on_checkpoint.is_resolved(),
            EntryPoint::OnClientEvent => self.on_client_event.is_resolved(),
            EntryPoint::OnPlayerConnect => self.on_player_connect.is_resolved(),
            EntryPoint::OnPlayerDamage => self.on_player_damage.is_resolved(),
            EntryPoint::OnPlayerDead => self.on_player_dead.is_resolved(),
            EntryPoint::OnPlayerDisconnect => self.on_player_disconnect.is_resolved(),
            EntryPoint::OnEntityRemove => self.on_entity_remove.is_resolved(),
            EntryPoint::OnServerEvent => self.on_server_event.is_resolved(),
            EntryPoint::OnVehicleChangeSeat => self.on_vehicle_change_seat.is_resolved(),
            EntryPoint::OnVehicleEnter => self.on_vehicle_enter.is_resolved(),
            EntryPoint::OnVehicleLeave => self.on_vehicle_leave.is_resolved(),
            EntryPoint::OnStop => self.on_stop.is_resolved(),
        }
    }

    /// Entry points that could not be resolved
    pub fn missing(&self) -> Vec<EntryPoint> {
        EntryPoint::ALL
            .into_iter()
            .filter(|ep| !self.is_resolved(*ep))
            .collect()
    }

    pub fn resolved_count(&self) -> usize {
        EntryPoint::ALL.len() - self.missing().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> ResolvedEntryPoint {
        ResolvedEntryPoint::NoArgs(Box::new(|| Ok(())))
    }

    #[test]
    fn test_method_names_round_trip() {
        for entry_point in EntryPoint::ALL {
            assert_eq!(EntryPoint::from_method_name(entry_point.method_name()), Some(entry_point));
        }
        assert_eq!(EntryPoint::from_method_name("OnTick"), None);
    }

    #[test]
    fn test_empty_table_has_all_slots_missing() {
        let table = EntryPointTable::empty();
        assert_eq!(table.missing().len(), 13);
        assert_eq!(table.resolved_count(), 0);
    }

    #[test]
    fn test_install_matching_signature() {
        let mut table = EntryPointTable::empty();
        assert!(table.install(EntryPoint::OnStop, no_args()));
        assert!(table.is_resolved(EntryPoint::OnStop));
        assert_eq!(table.resolved_count(), 1);
    }

    #[test]
    fn test_install_rejects_mismatched_signature() {
        let mut table = EntryPointTable::empty();
        assert!(!table.install(EntryPoint::Main, no_args()));
        assert!(!table.is_resolved(EntryPoint::Main));
    }

    #[test]
    fn test_shared_signatures_fill_their_own_slot() {
        let mut table = EntryPointTable::empty();
        let seat = ResolvedEntryPoint::Seat(Box::new(|_: Entity, _: Entity, _: u8| Ok(())));
        assert!(table.install(EntryPoint::OnVehicleLeave, seat));
        assert!(table.is_resolved(EntryPoint::OnVehicleLeave));
        assert!(!table.is_resolved(EntryPoint::OnVehicleEnter));
    }

    #[test]
    fn test_unresolved_slot_reports_entry_point() {
        let mut table = EntryPointTable::empty();
        match table.on_stop.callable(EntryPoint::OnStop) {
            Err(BridgeError::Unresolved(EntryPoint::OnStop)) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
