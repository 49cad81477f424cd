//! Style Catalog - Families and the Styles that render them
//!
//! A family is the creative concept the AI reasons about. A style is a
//! concrete layout within a family. The catalog is built once at startup and
//! shared read-only afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::layout::{EmbeddedImage, LayoutTree};
use crate::model::{Angle, FamilyId, PixelRect, SlotType, Spec, StyleId, Theme, ZoneId};
use crate::text::TextShaper;

/// Zone names the stock analyzer produces.
pub const DEFAULT_ZONES: [&str; 3] = ["A", "B", "C"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyDefinition {
    pub id: FamilyId,
    pub display_name: String,
    pub description: String,
    /// When set, every spec of this family targets this angle.
    #[serde(default)]
    pub forced_angle: Option<Angle>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    pub id: StyleId,
    pub family_id: FamilyId,
    pub display_name: String,
    pub supported_zones: Vec<ZoneId>,
    pub default_theme: Theme,
    pub max_lines: usize,
    /// First entry is the primary slot type.
    pub slot_types: Vec<SlotType>,
}

impl StyleDefinition {
    pub fn primary_slot_type(&self) -> SlotType {
        self.slot_types[0]
    }

    pub fn secondary_slot_types(&self) -> &[SlotType] {
        &self.slot_types[1..]
    }
}

/// Pure layout function: identical inputs give an identical tree.
pub type LayoutFn = fn(&Spec, &EmbeddedImage, PixelRect, &TextShaper) -> LayoutTree;

#[derive(Clone)]
pub struct Style {
    pub definition: StyleDefinition,
    layout: LayoutFn,
}

impl Style {
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn layout(
        &self,
        spec: &Spec,
        image: &EmbeddedImage,
        zone: PixelRect,
        shaper: &TextShaper,
    ) -> LayoutTree {
        (self.layout)(spec, image, zone, shaper)
    }
}

impl std::fmt::Debug for Style {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Style").field("definition", &self.definition).finish()
    }
}

/// Registry of families and styles, in registration order.
#[derive(Debug, Clone)]
pub struct Catalog {
    zone_vocabulary: Vec<ZoneId>,
    families: Vec<FamilyDefinition>,
    styles: Vec<Style>,
    family_index: HashMap<FamilyId, usize>,
    style_index: HashMap<StyleId, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::with_zones(DEFAULT_ZONES.iter().map(|z| z.to_string()).collect())
    }

    pub fn with_zones(zone_vocabulary: Vec<ZoneId>) -> Self {
        Self {
            zone_vocabulary,
            families: vec![],
            styles: vec![],
            family_index: HashMap::new(),
            style_index: HashMap::new(),
        }
    }

    pub fn register_family(&mut self, def: FamilyDefinition) -> EngineResult<()> {
        if self.family_index.contains_key(&def.id) {
            return Err(EngineError::Configuration(format!(
                "family '{}' registered twice",
                def.id
            )));
        }
        self.family_index.insert(def.id.clone(), self.families.len());
        self.families.push(def);
        Ok(())
    }

    pub fn register_style(&mut self, def: StyleDefinition, layout: LayoutFn) -> EngineResult<()> {
        if self.style_index.contains_key(&def.id) {
            return Err(EngineError::Configuration(format!(
                "style '{}' registered twice",
                def.id
            )));
        }
        if !self.family_index.contains_key(&def.family_id) {
            return Err(EngineError::Configuration(format!(
                "style '{}' names unregistered family '{}'",
                def.id, def.family_id
            )));
        }
        if def.supported_zones.is_empty() {
            return Err(EngineError::Configuration(format!(
                "style '{}' supports no zones",
                def.id
            )));
        }
        if let Some(zone) = def
            .supported_zones
            .iter()
            .find(|z| !self.zone_vocabulary.contains(z))
        {
            return Err(EngineError::Configuration(format!(
                "style '{}' references unsupported zone '{}'",
                def.id, zone
            )));
        }
        if def.slot_types.is_empty() {
            return Err(EngineError::Configuration(format!(
                "style '{}' consumes no copy slots",
                def.id
            )));
        }
        self.style_index.insert(def.id.clone(), self.styles.len());
        self.styles.push(Style { definition: def, layout });
        Ok(())
    }

    /// Every family must own at least one style.
    pub fn validate(&self) -> EngineResult<()> {
        for family in &self.families {
            if !self.styles.iter().any(|s| s.definition.family_id == family.id) {
                return Err(EngineError::Configuration(format!(
                    "no styles registered for family '{}'",
                    family.id
                )));
            }
        }
        Ok(())
    }

    pub fn get_family(&self, id: &str) -> EngineResult<&FamilyDefinition> {
        self.family_index
            .get(id)
            .map(|&i| &self.families[i])
            .ok_or_else(|| EngineError::not_found("family", id))
    }

    pub fn get_style(&self, id: &str) -> EngineResult<&Style> {
        self.style_index
            .get(id)
            .map(|&i| &self.styles[i])
            .ok_or_else(|| EngineError::not_found("style", id))
    }

    pub fn styles_for_family(&self, family_id: &str) -> EngineResult<Vec<&Style>> {
        self.get_family(family_id)?;
        Ok(self
            .styles
            .iter()
            .filter(|s| s.definition.family_id == family_id)
            .collect())
    }

    pub fn families(&self) -> &[FamilyDefinition] {
        &self.families
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    pub fn zone_vocabulary(&self) -> &[ZoneId] {
        &self.zone_vocabulary
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}
