//! Snapshot stores.
//!
//! [`JsonFileStore`] keeps every network's snapshot in one JSON document,
//! an object mapping network keys (`192.168.1.0/24`) to device record lists.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use lanwatch_common::error::ScanError;
use lanwatch_common::snapshot::{DeviceRecord, SnapshotStore};

type Snapshots = BTreeMap<String, Vec<DeviceRecord>>;

/// Process-local store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: Mutex<HashMap<String, Vec<DeviceRecord>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self, key: &str) -> anyhow::Result<Vec<DeviceRecord>> {
        let snapshots = self
            .snapshots
            .lock()
            .map_err(|_| ScanError::Store("memory store poisoned".into()))?;
        Ok(snapshots.get(key).cloned().unwrap_or_default())
    }

    fn save(&self, key: &str, records: &[DeviceRecord]) -> anyhow::Result<()> {
        let mut snapshots = self
            .snapshots
            .lock()
            .map_err(|_| ScanError::Store("memory store poisoned".into()))?;
        snapshots.insert(key.to_string(), records.to_vec());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> anyhow::Result<Snapshots> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Snapshots::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };
        if text.trim().is_empty() {
            return Ok(Snapshots::new());
        }
        serde_json::from_str(&text)
            .map_err(|e| ScanError::Store(format!("{}: {e}", self.path.display())).into())
    }

    fn write_all(&self, snapshots: &Snapshots) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(snapshots)
            .map_err(|e| ScanError::Store(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self, key: &str) -> anyhow::Result<Vec<DeviceRecord>> {
        let mut snapshots = self.read_all()?;
        Ok(snapshots.remove(key).unwrap_or_default())
    }

    fn save(&self, key: &str, records: &[DeviceRecord]) -> anyhow::Result<()> {
        let mut snapshots = self.read_all()?;
        snapshots.insert(key.to_string(), records.to_vec());
        self.write_all(&snapshots)
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝

#[cfg(test)]
mod tests {
    use super::*;
    use lanwatch_common::device::{DeviceType, DiscoverySource};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn record(ip: &str) -> DeviceRecord {
        DeviceRecord {
            id: format!("id-{ip}"),
            ip: ip.to_string(),
            mac: Some("aa:bb:cc:dd:ee:ff".into()),
            hostname: Some("nas.local".into()),
            vendor: None,
            device_type: Some(DeviceType::Nas),
            name: None,
            first_seen: 100,
            last_seen: 200,
            services: Vec::new(),
            discovery_source: Some(DiscoverySource::Mdns),
        }
    }

    fn scratch_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("lanwatch-{}-{nanos}", std::process::id()))
            .join(name)
    }

    #[test]
    fn memory_store_keys_are_independent() {
        let store = MemoryStore::new();
        store.save("10.0.0.0/24", &[record("10.0.0.2")]).unwrap();
        assert_eq!(store.load("10.0.0.0/24").unwrap().len(), 1);
        assert!(store.load("192.168.1.0/24").unwrap().is_empty());
    }

    #[test]
    fn missing_file_loads_empty() {
        let store = JsonFileStore::new(scratch_path("absent.json"));
        assert!(store.load("10.0.0.0/24").unwrap().is_empty());
    }

    #[test]
    fn file_store_keeps_other_networks() {
        let path = scratch_path("snapshots.json");
        let store = JsonFileStore::new(&path);
        store.save("10.0.0.0/24", &[record("10.0.0.2")]).unwrap();
        store
            .save("192.168.1.0/24", &[record("192.168.1.5"), record("192.168.1.9")])
            .unwrap();

        let reopened = JsonFileStore::new(&path);
        assert_eq!(reopened.load("10.0.0.0/24").unwrap(), vec![record("10.0.0.2")]);
        assert_eq!(reopened.load("192.168.1.0/24").unwrap().len(), 2);
        assert!(!path.with_extension("json.tmp").exists());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn corrupt_file_is_a_store_error() {
        let path = scratch_path("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::new(&path).load("10.0.0.0/24").unwrap_err();
        assert!(matches!(err.downcast_ref::<ScanError>(), Some(ScanError::Store(_))));

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
