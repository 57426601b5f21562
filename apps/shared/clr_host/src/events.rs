//! Event Dispatcher
//!
//! Routes host events to the matching entry point. The event set is closed:
//! every forwarded kind has exactly one slot in the `EntryPointTable`, and
//! kinds the bridge does not forward are reported as ignored.
//!
//! Script events carry a dynamically-typed payload which is coerced into an
//! ordered argument list before the callback is invoked.

use serde::{Deserialize, Serialize};

use crate::entry_points::{EntryPoint, EntryPointTable};
use crate::error::{BridgeError, CallResult, Result};
use crate::host::Entity;
use crate::value::MValue;

/// Every event kind the host can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Checkpoint,
    ClientScriptEvent,
    PlayerConnect,
    PlayerDamage,
    PlayerDead,
    PlayerDisconnect,
    RemoveEntity,
    ServerScriptEvent,
    VehicleChangeSeat,
    VehicleEnter,
    VehicleLeave,
    ResourceStart,
    ResourceStop,
    ResourceError,
    ConsoleCommand,
    MetaChange,
    SyncedMetaChange,
    WeaponDamage,
    Explosion,
    ColShape,
}

impl EventKind {
    /// Entry point this kind is forwarded to, if any
    pub fn entry_point(&self) -> Option<EntryPoint> {
        match self {
            EventKind::Checkpoint => Some(EntryPoint::OnCheckpoint),
            EventKind::ClientScriptEvent => Some(EntryPoint::OnClientEvent),
            EventKind::PlayerConnect => Some(EntryPoint::OnPlayerConnect),
            EventKind::PlayerDamage => Some(EntryPoint::OnPlayerDamage),
            EventKind::PlayerDead => Some(EntryPoint::OnPlayerDead),
            EventKind::PlayerDisconnect => Some(EntryPoint::OnPlayerDisconnect),
            EventKind::RemoveEntity => Some(EntryPoint::OnEntityRemove),
            EventKind::ServerScriptEvent => Some(EntryPoint::OnServerEvent),
            EventKind::VehicleChangeSeat => Some(EntryPoint::OnVehicleChangeSeat),
            EventKind::VehicleEnter => Some(EntryPoint::OnVehicleEnter),
            EventKind::VehicleLeave => Some(EntryPoint::OnVehicleLeave),
            EventKind::ResourceStart
            | EventKind::ResourceStop
            | EventKind::ResourceError
            | EventKind::ConsoleCommand
            | EventKind::MetaChange
            | EventKind::SyncedMetaChange
            | EventKind::WeaponDamage
            | EventKind::Explosion
            | EventKind::ColShape => None,
        }
    }
}

/// Host event kinds that are never forwarded to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoredKind {
    ResourceStart,
    ResourceStop,
    ResourceError,
    ConsoleCommand,
    MetaChange,
    SyncedMetaChange,
    WeaponDamage,
    Explosion,
    ColShape,
}

impl From<IgnoredKind> for EventKind {
    fn from(kind: IgnoredKind) -> Self {
        match kind {
            IgnoredKind::ResourceStart => EventKind::ResourceStart,
            IgnoredKind::ResourceStop => EventKind::ResourceStop,
            IgnoredKind::ResourceError => EventKind::ResourceError,
            IgnoredKind::ConsoleCommand => EventKind::ConsoleCommand,
            IgnoredKind::MetaChange => EventKind::MetaChange,
            IgnoredKind::SyncedMetaChange => EventKind::SyncedMetaChange,
            IgnoredKind::WeaponDamage => EventKind::WeaponDamage,
            IgnoredKind::Explosion => EventKind::Explosion,
            IgnoredKind::ColShape => EventKind::ColShape,
        }
    }
}

/// An event delivered by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostEvent {
    Checkpoint {
        target: Entity,
        entity: Entity,
        state: bool,
    },
    ClientScriptEvent {
        target: Entity,
        name: String,
        #[serde(default)]
        args: MValue,
    },
    PlayerConnect {
        target: Entity,
        reason: String,
    },
    PlayerDamage {
        target: Entity,
        attacker: Entity,
        weapon: u32,
        damage: u16,
    },
    PlayerDead {
        target: Entity,
        killer: Entity,
        weapon: u32,
    },
    PlayerDisconnect {
        target: Entity,
        reason: String,
    },
    RemoveEntity {
        entity: Entity,
    },
    ServerScriptEvent {
        name: String,
        #[serde(default)]
        args: MValue,
    },
    VehicleChangeSeat {
        target: Entity,
        player: Entity,
        old_seat: u8,
        new_seat: u8,
    },
    VehicleEnter {
        target: Entity,
        player: Entity,
        seat: u8,
    },
    VehicleLeave {
        target: Entity,
        player: Entity,
        seat: u8,
    },
    /// A kind the bridge does not forward
    Other {
        event: IgnoredKind,
    },
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::Checkpoint { .. } => EventKind::Checkpoint,
            HostEvent::ClientScriptEvent { .. } => EventKind::ClientScriptEvent,
            HostEvent::PlayerConnect { .. } => EventKind::PlayerConnect,
            HostEvent::PlayerDamage { .. } => EventKind::PlayerDamage,
            HostEvent::PlayerDead { .. } => EventKind::PlayerDead,
            HostEvent::PlayerDisconnect { .. } => EventKind::PlayerDisconnect,
            HostEvent::RemoveEntity { .. } => EventKind::RemoveEntity,
            HostEvent::ServerScriptEvent { .. } => EventKind::ServerScriptEvent,
            HostEvent::VehicleChangeSeat { .. } => EventKind::VehicleChangeSeat,
            HostEvent::VehicleEnter { .. } => EventKind::VehicleEnter,
            HostEvent::VehicleLeave { .. } => EventKind::VehicleLeave,
            HostEvent::Other { event } => EventKind::from(*event),
        }
    }

    /// Parse one event per non-empty line of JSON
    pub fn parse_lines(input: &str) -> std::result::Result<Vec<HostEvent>, serde_json::Error> {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(serde_json::from_str)
            .collect()
    }
}

/// What happened to a dispatched event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The event was passed to this entry point
    Delivered(EntryPoint),
    /// The event kind is not forwarded to resources
    Ignored(EventKind),
}

/// Route `event` to its entry point in `table`
///
/// Fails with `BridgeError::Unresolved` when the matching slot is empty and
/// with `BridgeError::Callback` when the embedded side reports an error.
pub fn dispatch(table: &mut EntryPointTable, event: &HostEvent) -> Result<Dispatch> {
    let entry_point = match event.kind().entry_point() {
        Some(entry_point) => entry_point,
        None => return Ok(Dispatch::Ignored(event.kind())),
    };

    let outcome: CallResult = match event {
        HostEvent::Checkpoint {
            target,
            entity,
            state,
        } => table.on_checkpoint.callable(entry_point)?(*target, *entity, *state),
        HostEvent::ClientScriptEvent { target, name, args } => {
            let args = args.to_args();
            table.on_client_event.callable(entry_point)?(*target, name, &args)
        }
        HostEvent::PlayerConnect { target, reason } => {
            table.on_player_connect.callable(entry_point)?(*target, reason)
        }
        HostEvent::PlayerDamage {
            target,
            attacker,
            weapon,
            damage,
        } => table.on_player_damage.callable(entry_point)?(*target, *attacker, *weapon, *damage),
        HostEvent::PlayerDead {
            target,
            killer,
            weapon,
        } => table.on_player_dead.callable(entry_point)?(*target, *killer, *weapon),
        HostEvent::PlayerDisconnect { target, reason } => {
            table.on_player_disconnect.callable(entry_point)?(*target, reason)
        }
        HostEvent::RemoveEntity { entity } => table.on_entity_remove.callable(entry_point)?(*entity),
        HostEvent::ServerScriptEvent { name, args } => {
            let args = args.to_args();
            table.on_server_event.callable(entry_point)?(name, &args)
        }
        HostEvent::VehicleChangeSeat {
            target,
            player,
            old_seat,
            new_seat,
        } => table.on_vehicle_change_seat.callable(entry_point)?(
            *target, *player, *old_seat, *new_seat,
        ),
        HostEvent::VehicleEnter {
            target,
            player,
            seat,
        } => table.on_vehicle_enter.callable(entry_point)?(*target, *player, *seat),
        HostEvent::VehicleLeave {
            target,
            player,
            seat,
        } => table.on_vehicle_leave.callable(entry_point)?(*target, *player, *seat),
        HostEvent::Other { event } => return Ok(Dispatch::Ignored(EventKind::from(*event))),
    };

    outcome.map_err(|message| BridgeError::Callback {
        entry_point,
        message,
    })?;

    Ok(Dispatch::Delivered(entry_point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::testing::{Call, RecordingRuntime};

    fn full_table(runtime: &RecordingRuntime) -> EntryPointTable {
        runtime.table()
    }

    #[test]
    fn test_every_forwarded_kind_has_an_entry_point() {
        let forwarded = [
            EventKind::Checkpoint,
            EventKind::ClientScriptEvent,
            EventKind::PlayerConnect,
            EventKind::PlayerDamage,
            EventKind::PlayerDead,
            EventKind::PlayerDisconnect,
            EventKind::RemoveEntity,
            EventKind::ServerScriptEvent,
            EventKind::VehicleChangeSeat,
            EventKind::VehicleEnter,
            EventKind::VehicleLeave,
        ];
        let targets: HashSet<EntryPoint> =
            forwarded.iter().filter_map(|k| k.entry_point()).collect();
        assert_eq!(targets.len(), 11);
        assert!(!targets.contains(&EntryPoint::Main));
        assert!(!targets.contains(&EntryPoint::OnStop));
    }

    #[test]
    fn test_field_order_per_kind() {
        let runtime = RecordingRuntime::new();
        let mut table = full_table(&runtime);
        let p1 = Entity::player(1);
        let p2 = Entity::player(2);
        let car = Entity::vehicle(7);
        let cp = Entity::checkpoint(3);

        let events = vec![
            HostEvent::Checkpoint { target: cp, entity: p1, state: true },
            HostEvent::PlayerDamage { target: p1, attacker: p2, weapon: 0xA2C6_43D2, damage: 25 },
            HostEvent::PlayerDead { target: p1, killer: p2, weapon: 5 },
            HostEvent::RemoveEntity { entity: car },
            HostEvent::VehicleChangeSeat { target: car, player: p1, old_seat: 1, new_seat: 2 },
            HostEvent::VehicleEnter { target: car, player: p2, seat: 0 },
            HostEvent::VehicleLeave { target: car, player: p2, seat: 0 },
        ];
        for event in &events {
            assert!(matches!(dispatch(&mut table, event), Ok(Dispatch::Delivered(_))));
        }

        assert_eq!(
            runtime.calls(),
            vec![
                Call::Checkpoint(cp, p1, true),
                Call::PlayerDamage(p1, p2, 0xA2C6_43D2, 25),
                Call::PlayerDead(p1, p2, 5),
                Call::EntityRemove(car),
                Call::VehicleChangeSeat(car, p1, 1, 2),
                Call::VehicleEnter(car, p2, 0),
                Call::VehicleLeave(car, p2, 0),
            ]
        );
    }

    #[test]
    fn test_connect_and_disconnect_use_distinct_slots() {
        let runtime = RecordingRuntime::new();
        let mut table = full_table(&runtime);
        let player = Entity::player(9);

        dispatch(&mut table, &HostEvent::PlayerConnect { target: player, reason: "join".into() }).unwrap();
        dispatch(&mut table, &HostEvent::PlayerDisconnect { target: player, reason: "quit".into() }).unwrap();

        assert_eq!(
            runtime.calls(),
            vec![
                Call::PlayerConnect(player, "join".into()),
                Call::PlayerDisconnect(player, "quit".into()),
            ]
        );
    }

    #[test]
    fn test_script_events_receive_ordered_args() {
        let runtime = RecordingRuntime::new();
        let mut table = full_table(&runtime);
        let player = Entity::player(4);
        let args = MValue::List(vec![MValue::from("item"), MValue::Int(2), MValue::Nil]);

        dispatch(
            &mut table,
            &HostEvent::ClientScriptEvent { target: player, name: "buy".into(), args: args.clone() },
        )
        .unwrap();
        dispatch(
            &mut table,
            &HostEvent::ServerScriptEvent { name: "tick".into(), args: MValue::List(Vec::new()) },
        )
        .unwrap();

        assert_eq!(
            runtime.calls(),
            vec![
                Call::ClientEvent(player, "buy".into(), args.to_args()),
                Call::ServerEvent("tick".into(), Vec::new()),
            ]
        );
    }

    #[test]
    fn test_unlisted_kind_is_ignored() {
        let runtime = RecordingRuntime::new();
        let mut table = full_table(&runtime);
        let event = HostEvent::Other { event: IgnoredKind::ConsoleCommand };
        assert_eq!(
            dispatch(&mut table, &event).unwrap(),
            Dispatch::Ignored(EventKind::ConsoleCommand)
        );
        assert!(runtime.calls().is_empty());
    }

    #[test]
    fn test_unresolved_slot_is_an_error() {
        let mut table = EntryPointTable::empty();
        let event = HostEvent::RemoveEntity { entity: Entity::vehicle(1) };
        assert!(matches!(
            dispatch(&mut table, &event),
            Err(BridgeError::Unresolved(EntryPoint::OnEntityRemove))
        ));
    }

    #[test]
    fn test_callback_failure_is_reported() {
        let mut table = EntryPointTable::empty();
        table.on_entity_remove =
            crate::entry_points::Slot::Resolved(Box::new(|_: Entity| Err("boom".to_string())));
        let event = HostEvent::RemoveEntity { entity: Entity::vehicle(1) };
        match dispatch(&mut table, &event) {
            Err(BridgeError::Callback { entry_point, message }) => {
                assert_eq!(entry_point, EntryPoint::OnEntityRemove);
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_parse_event_lines() {
        let input = r#"
            # recorded session
            {"kind":"player_connect","target":{"kind":"player","id":1},"reason":"join"}
            {"kind":"server_script_event","name":"ready"}
            {"kind":"other","event":"explosion"}
        "#;
        let events = HostEvent::parse_lines(input).unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind(), EventKind::PlayerConnect);
        assert_eq!(
            events[1],
            HostEvent::ServerScriptEvent { name: "ready".into(), args: MValue::Nil }
        );
        assert_eq!(events[2].kind(), EventKind::Explosion);
    }

    #[test]
    fn test_other_cannot_carry_forwarded_kind() {
        let forged = r#"{"kind":"other","event":"player_connect"}"#;
        assert!(HostEvent::parse_lines(forged).is_err());
    }

    #[test]
    fn test_ignored_kinds_have_no_entry_point() {
        let ignored = [
            IgnoredKind::ResourceStart,
            IgnoredKind::ResourceStop,
            IgnoredKind::ResourceError,
            IgnoredKind::ConsoleCommand,
            IgnoredKind::MetaChange,
            IgnoredKind::SyncedMetaChange,
            IgnoredKind::WeaponDamage,
            IgnoredKind::Explosion,
            IgnoredKind::ColShape,
        ];
        for kind in ignored {
            assert_eq!(EventKind::from(kind).entry_point(), None, "{:?}", kind);
        }
    }
}
