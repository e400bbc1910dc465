use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Write `data` to `path` atomically: the bytes land in a temporary sibling
/// file first and are renamed into place, so a failed stage never leaves a
/// partial artifact behind.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));

    fs::write(&tmp_path, data)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

pub fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut data = Vec::new();
    {
        let mut writer = csv::Writer::from_writer(&mut data);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    atomic_write(path, &data)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value)?;
    data.push(b'\n');
    atomic_write(path, &data)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read(path)?;
    Ok(serde_json::from_slice(&data)?)
}

/// Remove exact-duplicate rows, keeping the first occurrence. Rows are
/// compared by their serialized form, which makes float fields participate
/// in exact (not approximate) equality.
pub fn dedup_exact<T: Serialize>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            let key = serde_json::to_string(row).unwrap_or_default();
            seen.insert(key)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_creates_parent_dirs_and_no_tmp_leftover() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/out.json");

        atomic_write(&path, b"{}").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"{}");
        assert!(!path.with_file_name("out.json.tmp").exists());
    }

    #[test]
    fn dedup_exact_keeps_first_occurrence() {
        let rows = vec![("a", 1.5), ("b", 2.0), ("a", 1.5)];
        let deduped = dedup_exact(rows);
        assert_eq!(deduped, vec![("a", 1.5), ("b", 2.0)]);
    }
}
