use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::StoreError;

/// Read one JSON record. A missing file is `NotFound` for the given kind/id.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path, kind: &'static str, id: &str) -> Result<T, StoreError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(StoreError::NotFound { kind, id: id.to_string() });
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            return Err(StoreError::PermissionDenied(format!("{} {}", kind, id)));
        }
        Err(e) => return Err(StoreError::Io(e)),
    };
    Ok(serde_json::from_slice(&bytes)?)
}

/// Replace a JSON record via temp file + rename so readers never see a torn write.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).map_err(map_write_err)?;
    fs::rename(&tmp, path).map_err(map_write_err)?;
    Ok(())
}

fn map_write_err(e: std::io::Error) -> StoreError {
    if e.kind() == ErrorKind::PermissionDenied { StoreError::PermissionDenied(e.to_string()) } else { StoreError::Io(e) }
}
