//! Native-callable delegates exported by the module wrapper
//!
//! Each entry point is a static managed method marshalled with the C calling
//! convention. Entities travel as [`FfiEntity`], strings as NUL-terminated
//! UTF-8 and argument lists as a JSON array string.

use std::ffi::{c_char, c_void};
use std::mem;
use std::ptr::NonNull;

use super::marshal::{FfiEntity, args_json, c_string};
use crate::entry_points::{ResolvedEntryPoint, Signature};
use crate::host::{Entity, HostHandle};
use crate::value::MValue;

type MainDelegate = unsafe extern "C" fn(*mut c_void, *const c_char, *const c_char);
type CheckpointDelegate = unsafe extern "C" fn(FfiEntity, FfiEntity, u8);
type ClientEventDelegate = unsafe extern "C" fn(FfiEntity, *const c_char, *const c_char);
type PlayerReasonDelegate = unsafe extern "C" fn(FfiEntity, *const c_char);
type PlayerDamageDelegate = unsafe extern "C" fn(FfiEntity, FfiEntity, u32, u16);
type PlayerDeadDelegate = unsafe extern "C" fn(FfiEntity, FfiEntity, u32);
type EntityDelegate = unsafe extern "C" fn(FfiEntity);
type ServerEventDelegate = unsafe extern "C" fn(*const c_char, *const c_char);
type SeatChangeDelegate = unsafe extern "C" fn(FfiEntity, FfiEntity, u8, u8);
type SeatDelegate = unsafe extern "C" fn(FfiEntity, FfiEntity, u8);
type NoArgsDelegate = unsafe extern "C" fn();

/// Wrap a raw delegate pointer into a typed callable
///
/// # Safety
///
/// `delegate` must point at a live native-callable method whose parameters
/// match `signature`, and must stay valid for as long as the returned
/// callable can be invoked.
pub unsafe fn wrap(signature: Signature, delegate: NonNull<c_void>) -> ResolvedEntryPoint {
    let raw = delegate.as_ptr();

    // SAFETY (all arms): guaranteed by the caller; every delegate type is a
    // plain function pointer of the same size as `raw`.
    unsafe {
        match signature {
            Signature::Main => {
                let f = mem::transmute::<*mut c_void, MainDelegate>(raw);
                ResolvedEntryPoint::Main(Box::new(move |host: HostHandle, name: &str, main: &str| {
                    let name = c_string(name)?;
                    let main = c_string(main)?;
                    f(host.as_raw() as *mut c_void, name.as_ptr(), main.as_ptr());
                    Ok(())
                }))
            }
            Signature::Checkpoint => {
                let f = mem::transmute::<*mut c_void, CheckpointDelegate>(raw);
                ResolvedEntryPoint::Checkpoint(Box::new(move |target: Entity, entity: Entity, state: bool| {
                    f(target.into(), entity.into(), state as u8);
                    Ok(())
                }))
            }
            Signature::ClientEvent => {
                let f = mem::transmute::<*mut c_void, ClientEventDelegate>(raw);
                ResolvedEntryPoint::ClientEvent(Box::new(
                    move |target: Entity, name: &str, args: &[MValue]| {
                        let name = c_string(name)?;
                        let args = args_json(args)?;
                        f(target.into(), name.as_ptr(), args.as_ptr());
                        Ok(())
                    },
                ))
            }
            Signature::PlayerReason => {
                let f = mem::transmute::<*mut c_void, PlayerReasonDelegate>(raw);
                ResolvedEntryPoint::PlayerReason(Box::new(move |target: Entity, reason: &str| {
                    let reason = c_string(reason)?;
                    f(target.into(), reason.as_ptr());
                    Ok(())
                }))
            }
            Signature::PlayerDamage => {
                let f = mem::transmute::<*mut c_void, PlayerDamageDelegate>(raw);
                ResolvedEntryPoint::PlayerDamage(Box::new(
                    move |target: Entity, attacker: Entity, weapon: u32, damage: u16| {
                        f(target.into(), attacker.into(), weapon, damage);
                        Ok(())
                    },
                ))
            }
            Signature::PlayerDead => {
                let f = mem::transmute::<*mut c_void, PlayerDeadDelegate>(raw);
                ResolvedEntryPoint::PlayerDead(Box::new(move |target: Entity, killer: Entity, weapon: u32| {
                    f(target.into(), killer.into(), weapon);
                    Ok(())
                }))
            }
            Signature::Entity => {
                let f = mem::transmute::<*mut c_void, EntityDelegate>(raw);
                ResolvedEntryPoint::Entity(Box::new(move |entity: Entity| {
                    f(entity.into());
                    Ok(())
                }))
            }
            Signature::ServerEvent => {
                let f = mem::transmute::<*mut c_void, ServerEventDelegate>(raw);
                ResolvedEntryPoint::ServerEvent(Box::new(move |name: &str, args: &[MValue]| {
                    let name = c_string(name)?;
                    let args = args_json(args)?;
                    f(name.as_ptr(), args.as_ptr());
                    Ok(())
                }))
            }
            Signature::SeatChange => {
                let f = mem::transmute::<*mut c_void, SeatChangeDelegate>(raw);
                ResolvedEntryPoint::SeatChange(Box::new(
                    move |target: Entity, player: Entity, old_seat: u8, new_seat: u8| {
                        f(target.into(), player.into(), old_seat, new_seat);
                        Ok(())
                    },
                ))
            }
            Signature::Seat => {
                let f = mem::transmute::<*mut c_void, SeatDelegate>(raw);
                ResolvedEntryPoint::Seat(Box::new(move |target: Entity, player: Entity, seat: u8| {
                    f(target.into(), player.into(), seat);
                    Ok(())
                }))
            }
            Signature::NoArgs => {
                let f = mem::transmute::<*mut c_void, NoArgsDelegate>(raw);
                ResolvedEntryPoint::NoArgs(Box::new(move || {
                    f();
                    Ok(())
                }))
            }
        }
    }
}
