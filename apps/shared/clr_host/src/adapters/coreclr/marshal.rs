//! Conversions between bridge values and their C ABI representation

use std::ffi::CString;
use std::path::{Path, PathBuf};

use crate::host::{Entity, EntityKind};
use crate::value::MValue;

/// Entity as passed to managed code
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FfiEntity {
    pub kind: u8,
    pub id: u32,
}

impl From<Entity> for FfiEntity {
    fn from(entity: Entity) -> Self {
        Self {
            kind: entity.kind.to_u8(),
            id: entity.id,
        }
    }
}

impl From<FfiEntity> for Entity {
    fn from(entity: FfiEntity) -> Self {
        Entity::new(EntityKind::from_u8(entity.kind), entity.id)
    }
}

/// NUL-terminated copy of `value`
pub fn c_string(value: &str) -> Result<CString, String> {
    CString::new(value).map_err(|_| format!("string contains an interior NUL byte: {:?}", value))
}

/// Argument list encoded as a JSON array string
pub fn args_json(args: &[MValue]) -> Result<CString, String> {
    let json = serde_json::to_string(args).map_err(|e| format!("cannot encode arguments: {}", e))?;
    c_string(&json)
}

pub fn path_string(path: &Path) -> Result<CString, String> {
    let value = path
        .to_str()
        .ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()))?;
    c_string(value)
}

#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: char = ':';

/// Join assembly paths into a trusted-platform-assemblies list
///
/// Only `.dll` files are kept. When two directories provide the same file
/// name the first one wins.
pub fn assembly_list(paths: impl IntoIterator<Item = PathBuf>) -> String {
    let mut seen: Vec<String> = Vec::new();
    let mut entries: Vec<String> = Vec::new();

    for path in paths {
        let is_dll = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("dll"));
        if !is_dll {
            continue;
        }
        let (Some(file_name), Some(full)) = (
            path.file_name().and_then(|n| n.to_str()),
            path.to_str(),
        ) else {
            continue;
        };
        let key = file_name.to_ascii_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        entries.push(full.to_string());
    }

    entries.join(&PATH_LIST_SEPARATOR.to_string())
}

/// Join directories into a search path list
pub fn directory_list(dirs: &[&Path]) -> String {
    dirs.iter()
        .filter_map(|d| d.to_str())
        .collect::<Vec<_>>()
        .join(&PATH_LIST_SEPARATOR.to_string())
}
