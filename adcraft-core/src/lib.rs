//! AdCraft Core - Ad Creative Composition Engine
//!
//! Turns one product photo into a set of finished ad creatives.
//!
//! # Flow
//! 1. Upload: the original is sniffed, measured and stored.
//! 2. Analyze: safe zones and a multilingual copy pool are fetched once per image.
//! 3. Select: each requested family yields specs (style, zone, copy, theme).
//! 4. Render: spec -> layout tree -> SVG -> PNG, stored in the generated bucket.
//! 5. Mutate: style, headline, language and format changes supersede a result
//!    with a new one; every lineage keeps exactly one active result.
//!
//! The catalog is an explicit value built at startup. Randomness is injected
//! so that a seeded run is reproducible.

pub mod catalog;
pub mod collab;
pub mod config;
pub mod error;
pub mod hashing;
pub mod layout;
pub mod model;
pub mod mutation;
pub mod raster;
pub mod render;
pub mod selection;
pub mod storage;
pub mod store;
pub mod studio;
pub mod stub;
pub mod styles;
pub mod text;
pub mod validation;

pub use catalog::{Catalog, FamilyDefinition, Style, StyleDefinition};
pub use collab::{Bucket, CopyGenerator, FamilyAdvisor, ObjectStorage, Store, ZoneAnalyzer};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use model::{
    Angle, CanvasDims, CopyPool, CopySlot, Format, ImageAsset, Language, NormRect, RenderResult,
    Replacement, SafeZones, SlotType, Spec, Zone,
};
pub use render::{RenderOutput, RenderPipeline};
pub use selection::{FamilySelection, SelectionOptions, StyleMode};
pub use storage::{FsStorage, MemoryStorage};
pub use store::MemoryStore;
pub use studio::{Collaborators, GenerateRequest, Studio};
pub use styles::builtin_catalog;
pub use text::{load_font_database, TextShaper};
pub use validation::{ValidationResult, Validator, ZonePolicy};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
