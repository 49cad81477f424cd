//! Collaborator contracts
//!
//! The engine never performs AI inference, blob IO or persistence itself.
//! Everything it needs from the outside world comes through these traits.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::FamilyDefinition;
use crate::error::EngineResult;
use crate::model::{CopyPool, FamilyId, ImageAsset, RenderResult, SafeZones, Spec};

/// Finds text-safe placement zones on a product photo.
pub trait ZoneAnalyzer: Send + Sync {
    fn analyze(&self, image: &ImageAsset, bytes: &[u8]) -> EngineResult<SafeZones>;
}

/// Writes the multilingual copy pool for a product photo.
pub trait CopyGenerator: Send + Sync {
    fn generate(&self, image: &ImageAsset, bytes: &[u8]) -> EngineResult<CopyPool>;
}

/// Picks the family that best suits an image. Backs auto mode.
pub trait FamilyAdvisor: Send + Sync {
    fn recommend(&self, image: &ImageAsset, families: &[FamilyDefinition]) -> EngineResult<FamilyId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Originals,
    Generated,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Originals => "originals",
            Bucket::Generated => "generated",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, returning the public locator.
    fn save(&self, bucket: Bucket, key: &str, bytes: &[u8]) -> EngineResult<String>;

    /// Accepts either a bare key or a locator previously returned by `save`.
    fn read(&self, bucket: Bucket, key_or_locator: &str) -> EngineResult<Vec<u8>>;
}

/// Persistence for everything the engine produces.
///
/// Getters return `Ok(None)` for unknown ids; the caller decides whether that
/// is an error.
pub trait Store: Send + Sync {
    fn insert_image(&self, image: ImageAsset) -> EngineResult<()>;
    fn get_image(&self, id: &str) -> EngineResult<Option<ImageAsset>>;

    fn get_safe_zones(&self, image_id: &str) -> EngineResult<Option<SafeZones>>;
    fn put_safe_zones(&self, zones: SafeZones) -> EngineResult<()>;

    fn get_copy_pool(&self, image_id: &str) -> EngineResult<Option<CopyPool>>;
    fn put_copy_pool(&self, pool: CopyPool) -> EngineResult<()>;

    fn insert_spec(&self, spec: Spec) -> EngineResult<()>;
    fn get_spec(&self, id: &str) -> EngineResult<Option<Spec>>;

    fn insert_result(&self, result: RenderResult) -> EngineResult<()>;
    fn get_result(&self, id: &str) -> EngineResult<Option<RenderResult>>;

    /// Every result for an image, oldest first.
    fn list_for_image(&self, image_id: &str) -> EngineResult<Vec<RenderResult>>;

    /// Unsuperseded results for an image, oldest first.
    fn list_active_for_image(&self, image_id: &str) -> EngineResult<Vec<RenderResult>> {
        Ok(self
            .list_for_image(image_id)?
            .into_iter()
            .filter(RenderResult::is_active)
            .collect())
    }

    /// Compare-and-set: fails with `Conflict` if `id` is already superseded.
    fn mark_superseded(&self, id: &str, superseded_by: &str) -> EngineResult<()>;

    fn set_approval(&self, id: &str, approved: bool) -> EngineResult<RenderResult>;
}
