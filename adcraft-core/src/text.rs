//! Text Shaping - font resolution and measurement for layout
//!
//! Layout and rasterization share one font database. A family and weight are
//! resolved here with the same query usvg runs for a `<text>` element, and the
//! resolved face is shaped with parley, so a measured line is the line that
//! gets drawn.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use usvg::fontdb;

/// Advances are shaped once at this size and scaled linearly.
const REFERENCE_SIZE: f32 = 100.0;

/// Advance per character, as a fraction of font size, when no face resolves.
const MISSING_FACE_ADVANCE: f32 = 0.6;

const MAX_CACHED_ADVANCES: usize = 8192;

/// Preferred stand-ins for the generic families when the stock ones are absent.
const FALLBACK_FAMILIES: [&str; 4] = ["Inter", "DejaVu Sans", "Liberation Sans", "Noto Sans"];

/// System fonts plus every `.ttf`/`.otf`/`.ttc` found in `font_dirs`.
///
/// usvg falls back to the serif family for unknown names; when that family is
/// not installed it is pointed at a face that is, so every family resolves.
pub fn load_font_database(font_dirs: &[PathBuf]) -> Arc<fontdb::Database> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    for dir in font_dirs {
        load_fonts_from_dir(&mut db, dir);
    }

    let serif = fontdb::Query { families: &[fontdb::Family::Serif], ..Default::default() };
    if db.query(&serif).is_none() {
        if let Some(family) = fallback_family(&db) {
            tracing::debug!(family = %family, "generic families remapped");
            db.set_serif_family(family.clone());
            db.set_sans_serif_family(family);
        }
    }
    tracing::debug!(faces = db.len(), "font database ready");
    Arc::new(db)
}

fn fallback_family(db: &fontdb::Database) -> Option<String> {
    let installed = |name: &str| {
        db.faces().any(|face| face.families.iter().any(|(family, _)| family == name))
    };
    FALLBACK_FAMILIES
        .iter()
        .find(|name| installed(name))
        .map(|name| name.to_string())
        .or_else(|| {
            db.faces()
                .find_map(|face| face.families.first().map(|(family, _)| family.clone()))
        })
}

fn load_fonts_from_dir(db: &mut fontdb::Database, dir: &Path) {
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "font directory absent");
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        tracing::warn!(dir = %dir.display(), "font directory not readable");
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if path.is_file() && (ext == "ttf" || ext == "otf" || ext == "ttc") {
            if let Err(e) = db.load_font_file(&path) {
                tracing::warn!(font = %path.display(), error = %e, "skipping font");
            }
        }
    }
}

/// One resolved face, registered alone so parley cannot pick a sibling weight.
struct ShapedFace {
    fonts: parley::FontContext,
    family: String,
}

struct ShaperState {
    faces: HashMap<fontdb::ID, Option<ShapedFace>>,
    layout: parley::LayoutContext<()>,
    advances: HashMap<(fontdb::ID, String), f32>,
}

impl Default for ShaperState {
    fn default() -> Self {
        Self {
            faces: HashMap::new(),
            layout: parley::LayoutContext::new(),
            advances: HashMap::new(),
        }
    }
}

/// Measures single lines of text against the shared font database.
pub struct TextShaper {
    fontdb: Arc<fontdb::Database>,
    state: Mutex<ShaperState>,
}

impl TextShaper {
    pub fn new(fontdb: Arc<fontdb::Database>) -> Self {
        Self { fontdb, state: Mutex::default() }
    }

    pub fn font_database(&self) -> &Arc<fontdb::Database> {
        &self.fontdb
    }

    /// The face usvg will draw `family` at `weight` with.
    pub fn resolve(&self, family: &str, weight: u16) -> Option<fontdb::ID> {
        let families = [fontdb::Family::Name(family), fontdb::Family::Serif];
        self.fontdb.query(&fontdb::Query {
            families: &families,
            weight: fontdb::Weight(weight),
            ..Default::default()
        })
    }

    /// Width of `text` set on one line, letter spacing included.
    pub fn measure(
        &self,
        text: &str,
        font_family: &str,
        font_size: f32,
        weight: u16,
        letter_spacing: f32,
    ) -> f32 {
        if text.is_empty() {
            return 0.0;
        }
        let chars = text.chars().count() as f32;
        let unit = self
            .resolve(font_family, weight)
            .and_then(|id| self.unit_advance(id, text))
            .unwrap_or_else(|| {
                tracing::trace!(family = font_family, "no face; estimating advance");
                MISSING_FACE_ADVANCE * chars
            });
        unit * font_size + chars * letter_spacing
    }

    /// Advance of `text` at a font size of 1.
    fn unit_advance(&self, id: fontdb::ID, text: &str) -> Option<f32> {
        let Ok(mut state) = self.state.lock() else {
            tracing::warn!("text shaper lock poisoned");
            return None;
        };
        let key = (id, text.to_string());
        if let Some(advance) = state.advances.get(&key) {
            return Some(*advance);
        }

        let ShaperState { faces, layout, advances } = &mut *state;
        let face = faces.entry(id).or_insert_with(|| self.register(id)).as_mut()?;

        let mut builder = layout.ranged_builder(&mut face.fonts, text, 1.0, true);
        builder.push_default(parley::style::StyleProperty::FontStack(
            parley::style::FontStack::Source(Cow::Owned(face.family.clone())),
        ));
        builder.push_default(parley::style::StyleProperty::FontSize(REFERENCE_SIZE));
        let mut shaped: parley::Layout<()> = builder.build(text);
        shaped.break_all_lines(None);
        let width = shaped.lines().map(|line| line.metrics().advance).fold(0.0, f32::max);

        let advance = width / REFERENCE_SIZE;
        if advances.len() >= MAX_CACHED_ADVANCES {
            advances.clear();
        }
        advances.insert(key, advance);
        Some(advance)
    }

    fn register(&self, id: fontdb::ID) -> Option<ShapedFace> {
        let Some(bytes) = self.fontdb.with_face_data(id, |data, _| data.to_vec()) else {
            tracing::warn!(face = ?id, "font data unavailable");
            return None;
        };
        let mut fonts = parley::FontContext::default();
        let families = fonts
            .collection
            .register_fonts(parley::fontique::Blob::from(bytes), None);
        let family_id = families.first().map(|(family_id, _)| *family_id)?;
        let family = fonts.collection.family_name(family_id)?.to_string();
        tracing::debug!(face = ?id, family = %family, "face registered for shaping");
        Some(ShapedFace { fonts, family })
    }
}
