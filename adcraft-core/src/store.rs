//! In-memory store with JSON snapshots.
//!
//! Results keep insertion order so listings come back oldest first.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::collab::Store;
use crate::error::{EngineError, EngineResult};
use crate::model::{CopyPool, ImageAsset, RenderResult, SafeZones, Spec};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub images: Vec<ImageAsset>,
    pub safe_zones: Vec<SafeZones>,
    pub copy_pools: Vec<CopyPool>,
    pub specs: Vec<Spec>,
    pub results: Vec<RenderResult>,
}

#[derive(Default)]
struct Tables {
    images: HashMap<String, ImageAsset>,
    safe_zones: HashMap<String, SafeZones>,
    copy_pools: HashMap<String, CopyPool>,
    specs: HashMap<String, Spec>,
    results: Vec<RenderResult>,
    result_index: HashMap<String, usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> EngineResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| EngineError::Storage("store lock poisoned".into()))
    }

    fn write(&self) -> EngineResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| EngineError::Storage("store lock poisoned".into()))
    }

    pub fn snapshot(&self) -> EngineResult<StoreSnapshot> {
        let t = self.read()?;
        let mut images: Vec<_> = t.images.values().cloned().collect();
        images.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let mut safe_zones: Vec<_> = t.safe_zones.values().cloned().collect();
        safe_zones.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        let mut copy_pools: Vec<_> = t.copy_pools.values().cloned().collect();
        copy_pools.sort_by(|a, b| a.image_id.cmp(&b.image_id));
        let mut specs: Vec<_> = t.specs.values().cloned().collect();
        specs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(StoreSnapshot {
            images,
            safe_zones,
            copy_pools,
            specs,
            results: t.results.clone(),
        })
    }

    pub fn restore(snapshot: StoreSnapshot) -> Self {
        let mut t = Tables::default();
        t.images = snapshot.images.into_iter().map(|i| (i.id.clone(), i)).collect();
        t.safe_zones = snapshot
            .safe_zones
            .into_iter()
            .map(|z| (z.image_id.clone(), z))
            .collect();
        t.copy_pools = snapshot
            .copy_pools
            .into_iter()
            .map(|p| (p.image_id.clone(), p))
            .collect();
        t.specs = snapshot.specs.into_iter().map(|s| (s.id.clone(), s)).collect();
        t.result_index = snapshot
            .results
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id.clone(), i))
            .collect();
        t.results = snapshot.results;
        Self { tables: RwLock::new(t) }
    }

    /// Load a snapshot file, or start empty if it does not exist yet.
    pub fn load(path: &Path) -> EngineResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let json = std::fs::read_to_string(path)?;
        Ok(Self::restore(serde_json::from_str(&json)?))
    }

    pub fn save(&self, path: &Path) -> EngineResult<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_string_pretty(&self.snapshot()?)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

impl Store for MemoryStore {
    fn insert_image(&self, image: ImageAsset) -> EngineResult<()> {
        self.write()?.images.insert(image.id.clone(), image);
        Ok(())
    }

    fn get_image(&self, id: &str) -> EngineResult<Option<ImageAsset>> {
        Ok(self.read()?.images.get(id).cloned())
    }

    fn get_safe_zones(&self, image_id: &str) -> EngineResult<Option<SafeZones>> {
        Ok(self.read()?.safe_zones.get(image_id).cloned())
    }

    fn put_safe_zones(&self, zones: SafeZones) -> EngineResult<()> {
        self.write()?.safe_zones.insert(zones.image_id.clone(), zones);
        Ok(())
    }

    fn get_copy_pool(&self, image_id: &str) -> EngineResult<Option<CopyPool>> {
        Ok(self.read()?.copy_pools.get(image_id).cloned())
    }

    fn put_copy_pool(&self, pool: CopyPool) -> EngineResult<()> {
        self.write()?.copy_pools.insert(pool.image_id.clone(), pool);
        Ok(())
    }

    fn insert_spec(&self, spec: Spec) -> EngineResult<()> {
        self.write()?.specs.insert(spec.id.clone(), spec);
        Ok(())
    }

    fn get_spec(&self, id: &str) -> EngineResult<Option<Spec>> {
        Ok(self.read()?.specs.get(id).cloned())
    }

    fn insert_result(&self, result: RenderResult) -> EngineResult<()> {
        let mut t = self.write()?;
        if t.result_index.contains_key(&result.id) {
            return Err(EngineError::Conflict(format!("result {} already exists", result.id)));
        }
        let index = t.results.len();
        t.result_index.insert(result.id.clone(), index);
        t.results.push(result);
        Ok(())
    }

    fn get_result(&self, id: &str) -> EngineResult<Option<RenderResult>> {
        let t = self.read()?;
        Ok(t.result_index.get(id).map(|&i| t.results[i].clone()))
    }

    fn list_for_image(&self, image_id: &str) -> EngineResult<Vec<RenderResult>> {
        Ok(self
            .read()?
            .results
            .iter()
            .filter(|r| r.image_id == image_id)
            .cloned()
            .collect())
    }

    fn mark_superseded(&self, id: &str, superseded_by: &str) -> EngineResult<()> {
        let mut t = self.write()?;
        let index = *t
            .result_index
            .get(id)
            .ok_or_else(|| EngineError::not_found("result", id))?;
        let result = &mut t.results[index];
        if let Some(existing) = &result.superseded_by {
            return Err(EngineError::Conflict(format!(
                "result {} was already superseded by {}",
                id, existing
            )));
        }
        result.superseded_by = Some(superseded_by.to_string());
        Ok(())
    }

    fn set_approval(&self, id: &str, approved: bool) -> EngineResult<RenderResult> {
        let mut t = self.write()?;
        let index = *t
            .result_index
            .get(id)
            .ok_or_else(|| EngineError::not_found("result", id))?;
        let result = &mut t.results[index];
        result.approved = approved;
        Ok(result.clone())
    }
}
