//! Persistence of conservative addressing tables.
//!
//! Tables are stored as JSON records together with the size signatures of
//! the two meshes they were computed for. A stored record only applies to a
//! mesh pair with the same signatures.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use log::info;
use serde::{Deserialize, Serialize};

use crate::PolyMesh;
use crate::mesh::MeshSignature;
use crate::remap::AddressingTables;

/// Identifies the mesh pair a set of tables belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressingKey {
    pub old: MeshSignature,
    pub new: MeshSignature,
}

impl AddressingKey {
    pub fn new(old: &PolyMesh, new: &PolyMesh) -> Self {
        Self {
            old: old.signature(),
            new: new.signature(),
        }
    }
}

/// Stored form of the addressing tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressingRecord {
    pub key: AddressingKey,
    pub tables: AddressingTables,
}

/// Storage of addressing tables between runs.
pub trait AddressingStore {
    /// Returns the tables stored for `key`, or `None` if there are none.
    fn load(&self, key: &AddressingKey) -> Result<Option<AddressingTables>>;

    fn save(&self, key: &AddressingKey, tables: &AddressingTables) -> Result<()>;
}

/// Stores the tables of one mesh pair in a JSON file.
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
}

impl AddressingStore for JsonFileStore {
    fn load(&self, key: &AddressingKey) -> Result<Option<AddressingTables>> {
        if !self.path.exists() {
            info!("No stored addressing at {}", self.path.display());
            return Ok(None);
        }
        let record = read_addressing(&self.path)?;
        if record.key != *key {
            info!(
                "Stored addressing at {} belongs to another mesh pair",
                self.path.display()
            );
            return Ok(None);
        }
        Ok(Some(record.tables))
    }

    fn save(&self, key: &AddressingKey, tables: &AddressingTables) -> Result<()> {
        let record = AddressingRecord {
            key: *key,
            tables: tables.clone(),
        };
        write_addressing(&self.path, &record)?;
        info!("Wrote addressing to {}", self.path.display());
        Ok(())
    }
}

/// Keeps tables in memory, keyed by mesh pair.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<AddressingKey, AddressingTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.records()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.records()?.is_empty())
    }

    fn records(&self) -> Result<MutexGuard<'_, HashMap<AddressingKey, AddressingTables>>> {
        self.records
            .lock()
            .map_err(|_| anyhow!("Addressing store lock poisoned"))
    }
}

impl AddressingStore for MemoryStore {
    fn load(&self, key: &AddressingKey) -> Result<Option<AddressingTables>> {
        Ok(self.records()?.get(key).cloned())
    }

    fn save(&self, key: &AddressingKey, tables: &AddressingTables) -> Result<()> {
        self.records()?.insert(*key, tables.clone());
        Ok(())
    }
}

/// Writes an addressing record to a JSON file.
///
/// # Example
/// ```no_run
/// use remap3d::io::{AddressingKey, AddressingRecord, write_addressing};
/// use remap3d::remap::AddressingTables;
/// use remap3d::{Point, PolyMesh};
/// use std::path::Path;
///
/// let mesh = PolyMesh::block(1, 1, 1, Point::new(0., 0., 0.), Point::new(1., 1., 1.)).unwrap();
/// let record = AddressingRecord {
///     key: AddressingKey::new(&mesh, &mesh),
///     tables: AddressingTables::with_cells(1),
/// };
/// write_addressing(Path::new("addressing.json"), &record).unwrap();
/// ```
pub fn write_addressing(path: &Path, record: &AddressingRecord) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create file: {}", path.display()))?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, record)
        .with_context(|| format!("Failed to serialize addressing to: {}", path.display()))?;

    Ok(())
}

/// Reads an addressing record from a JSON file.
pub fn read_addressing(path: &Path) -> Result<AddressingRecord> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let record: AddressingRecord = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize addressing from: {}", path.display()))?;

    Ok(record)
}

pub fn to_addressing_string(record: &AddressingRecord) -> Result<String> {
    serde_json::to_string_pretty(record).context("Failed to serialize addressing to string")
}

pub fn from_addressing_string(json: &str) -> Result<AddressingRecord> {
    serde_json::from_str(json).context("Failed to deserialize addressing from string")
}
