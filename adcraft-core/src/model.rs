//! Data Model - images, AI artifacts, specs and results
//!
//! All zone rectangles are NORMALIZED (0-1) relative to the image.
//! They become pixels only at render time, against the spec's canvas.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

pub type ImageId = String;
pub type SpecId = String;
pub type ResultId = String;
pub type SlotId = String;
pub type FamilyId = String;
pub type StyleId = String;
pub type ZoneId = String;

/// Mint a fresh prefixed id, e.g. `rr_3f2a...`.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

// --- Geometry ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormRect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn intersects(&self, other: &NormRect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }

    /// Pixel rectangle on a canvas. Each edge is rounded independently.
    pub fn to_pixels(&self, canvas: CanvasDims) -> PixelRect {
        let px = |v: f64, dim: u32| (v * dim as f64).round().max(0.0) as u32;
        PixelRect {
            x: px(self.x, canvas.width),
            y: px(self.y, canvas.height),
            w: px(self.w, canvas.width),
            h: px(self.h, canvas.height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl PixelRect {
    pub fn center_y(&self) -> f32 {
        self.y as f32 + self.h as f32 / 2.0
    }
}

// --- Image ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub id: ImageId,
    pub filename: String,
    pub location: String,
    pub width: u32,
    pub height: u32,
    pub created_at: DateTime<Utc>,
}

// --- AI outputs ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub rect: NormRect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeZones {
    pub image_id: ImageId,
    #[serde(default)]
    pub avoid_regions: Vec<NormRect>,
    pub zones: Vec<Zone>,
}

impl SafeZones {
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Angle {
    Benefit,
    Curiosity,
    Urgency,
    Emotional,
    Aspirational,
    Story,
    Contrast,
}

impl Angle {
    /// Default headline rotation across one generation batch.
    pub const ROTATION: [Angle; 4] = [
        Angle::Benefit,
        Angle::Curiosity,
        Angle::Urgency,
        Angle::Emotional,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Angle::Benefit => "benefit",
            Angle::Curiosity => "curiosity",
            Angle::Urgency => "urgency",
            Angle::Emotional => "emotional",
            Angle::Aspirational => "aspirational",
            Angle::Story => "story",
            Angle::Contrast => "contrast",
        }
    }
}

impl FromStr for Angle {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "benefit" => Ok(Angle::Benefit),
            "curiosity" => Ok(Angle::Curiosity),
            "urgency" => Ok(Angle::Urgency),
            "emotional" => Ok(Angle::Emotional),
            "aspirational" => Ok(Angle::Aspirational),
            "story" => Ok(Angle::Story),
            "contrast" => Ok(Angle::Contrast),
            other => Err(EngineError::Validation(format!("unknown angle '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    De,
    Fr,
    Es,
}

impl Language {
    pub const ALL: [Language; 4] = [Language::En, Language::De, Language::Fr, Language::Es];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Fr => "fr",
            Language::Es => "es",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| EngineError::Validation(format!("unsupported language '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotType {
    Headline,
    Quote,
    Subtext,
}

impl SlotType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::Headline => "headline",
            SlotType::Quote => "quote",
            SlotType::Subtext => "subtext",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySlot {
    pub id: SlotId,
    pub language: Language,
    pub slot_type: SlotType,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<Angle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyPool {
    pub image_id: ImageId,
    pub slots: Vec<CopySlot>,
}

impl CopyPool {
    pub fn slot(&self, id: &str) -> Option<&CopySlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Slots of one type in one language, in pool order.
    pub fn filter(&self, language: Language, slot_type: SlotType) -> Vec<&CopySlot> {
        self.slots
            .iter()
            .filter(|s| s.language == language && s.slot_type == slot_type)
            .collect()
    }
}

// --- Format ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    #[serde(rename = "4:5")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "9:16")]
    Story,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Portrait, Format::Square, Format::Story];

    pub fn dims(&self) -> CanvasDims {
        match self {
            Format::Portrait => CanvasDims { width: 1080, height: 1350 },
            Format::Square => CanvasDims { width: 1080, height: 1080 },
            Format::Story => CanvasDims { width: 1080, height: 1920 },
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Format::Portrait => "4:5",
            Format::Square => "1:1",
            Format::Story => "9:16",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Format {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.tag() == s)
            .ok_or_else(|| EngineError::Validation(format!("unsupported format '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasDims {
    pub width: u32,
    pub height: u32,
}

// --- Theme ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub color: String,
    pub background: String,
    pub radius: f32,
    pub shadow: bool,
}

// --- Spec ---

/// Resolved copy for a spec: text and source slot per slot type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecCopy {
    pub texts: BTreeMap<SlotType, String>,
    pub slot_ids: BTreeMap<SlotType, SlotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl SpecCopy {
    pub fn text(&self, slot_type: SlotType) -> Option<&str> {
        self.texts.get(&slot_type).map(String::as_str)
    }

    pub fn fill(&mut self, slot: &CopySlot) {
        self.texts.insert(slot.slot_type, slot.text.clone());
        self.slot_ids.insert(slot.slot_type, slot.id.clone());
        if slot.attribution.is_some() {
            self.attribution = slot.attribution.clone();
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spec {
    pub id: SpecId,
    pub image_id: ImageId,
    pub format: Format,
    pub language: Language,
    pub family_id: FamilyId,
    pub style_id: StyleId,
    pub zone_id: ZoneId,
    pub primary_slot_id: SlotId,
    pub copy: SpecCopy,
    pub theme: Theme,
    pub canvas: CanvasDims,
    pub created_at: DateTime<Utc>,
}

impl Spec {
    /// Text of the primary slot, whatever its type.
    pub fn primary_text(&self) -> &str {
        self.copy
            .slot_ids
            .iter()
            .find(|(_, id)| **id == self.primary_slot_id)
            .and_then(|(t, _)| self.copy.text(*t))
            .unwrap_or_default()
    }
}

// --- Result ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub id: ResultId,
    pub spec_id: SpecId,
    pub image_id: ImageId,
    pub family_id: FamilyId,
    pub style_id: StyleId,
    pub primary_slot_id: SlotId,
    pub format: Format,
    pub location: String,
    pub render_hash: String,
    pub approved: bool,
    pub superseded_by: Option<ResultId>,
    #[serde(default)]
    pub supersedes: Option<ResultId>,
    pub created_at: DateTime<Utc>,
}

impl RenderResult {
    pub fn is_active(&self) -> bool {
        self.superseded_by.is_none()
    }
}

/// Outcome of a single mutation: the new result and the id it replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Replacement {
    pub result: RenderResult,
    pub superseded_id: ResultId,
}
