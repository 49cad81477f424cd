//! Render Pipeline - Single Entry Point
//!
//! Spec + safe zones + source bytes in, stored PNG out. Every render goes
//! through `render`; there is no other path to the generated bucket.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::collab::{Bucket, ObjectStorage};
use crate::error::{EngineError, EngineResult};
use crate::hashing::{sha256_hex, spec_fingerprint};
use crate::layout::{EmbeddedImage, LayoutTree};
use crate::model::{new_id, ResultId, SafeZones, Spec};
use crate::raster::Rasterizer;
use crate::text::TextShaper;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderOutput {
    pub result_id: ResultId,
    pub location: String,
    pub render_hash: String,
}

/// The render pipeline - layout, rasterize, store
///
/// Layout and rasterization share one font database, so text is fitted with
/// the faces it is drawn with.
pub struct RenderPipeline {
    catalog: Arc<Catalog>,
    shaper: TextShaper,
    rasterizer: Rasterizer,
    storage: Arc<dyn ObjectStorage>,
}

impl RenderPipeline {
    pub fn new(
        catalog: Arc<Catalog>,
        fonts: Arc<usvg::fontdb::Database>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            catalog,
            shaper: TextShaper::new(fonts.clone()),
            rasterizer: Rasterizer::new(fonts),
            storage,
        }
    }

    /// Build the layout tree for a spec without rasterizing it.
    pub fn layout(&self, spec: &Spec, zones: &SafeZones, source: &[u8]) -> EngineResult<LayoutTree> {
        let style = self.catalog.get_style(&spec.style_id)?;
        let zone = zones
            .zone(&spec.zone_id)
            .ok_or_else(|| EngineError::not_found("zone", &spec.zone_id))?;
        let zone_px = zone.rect.to_pixels(spec.canvas);
        let image = EmbeddedImage::from_bytes(source)?;
        Ok(style.layout(spec, &image, zone_px, &self.shaper))
    }

    #[tracing::instrument(skip_all, fields(spec = %spec.id, style = %spec.style_id, zone = %spec.zone_id))]
    pub fn render(&self, spec: &Spec, zones: &SafeZones, source: &[u8]) -> EngineResult<RenderOutput> {
        let tree = self.layout(spec, zones, source)?;
        let png = self.rasterizer.rasterize(&tree)?;

        let result_id = new_id("rr");
        let location = self
            .storage
            .save(Bucket::Generated, &format!("{}.png", result_id), &png)?;
        let render_hash = sha256_hex(&png);
        let fingerprint = spec_fingerprint(spec)?;
        tracing::info!(
            result = %result_id,
            bytes = png.len(),
            fingerprint = %fingerprint,
            "rendered"
        );

        Ok(RenderOutput { result_id, location, render_hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Format, Language, SlotType, SpecCopy};
    use crate::storage::MemoryStorage;
    use crate::stub::stock_safe_zones;
    use crate::styles::builtin_catalog;
    use crate::text::load_font_database;

    fn tiny_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 120, 90]));
        let mut out = std::io::Cursor::new(vec![]);
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn spec(catalog: &Catalog, zone_id: &str) -> Spec {
        let style = catalog.get_style("minimal_caption").unwrap();
        let mut copy = SpecCopy::default();
        copy.texts.insert(SlotType::Headline, "Effortlessly you.".into());
        copy.slot_ids.insert(SlotType::Headline, "sl_1".into());
        Spec {
            id: "sp_1".into(),
            image_id: "img_1".into(),
            format: Format::Square,
            language: Language::En,
            family_id: "minimal".into(),
            style_id: "minimal_caption".into(),
            zone_id: zone_id.into(),
            primary_slot_id: "sl_1".into(),
            copy,
            theme: style.definition.default_theme.clone(),
            canvas: Format::Square.dims(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_render_stores_png_at_canvas_size() {
        let catalog = Arc::new(builtin_catalog().unwrap());
        let storage = Arc::new(MemoryStorage::new());
        let pipeline = RenderPipeline::new(catalog.clone(), load_font_database(&[]), storage.clone());

        let out = pipeline
            .render(&spec(&catalog, "B"), &stock_safe_zones("img_1"), &tiny_png(40, 50))
            .unwrap();
        assert_eq!(out.location, format!("/files/generated/{}.png", out.result_id));
        let png = storage.read(Bucket::Generated, &out.location).unwrap();
        assert_eq!(out.render_hash, sha256_hex(&png));
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (1080, 1080));
    }

    #[test]
    fn test_unknown_zone_is_not_found() {
        let catalog = Arc::new(builtin_catalog().unwrap());
        let pipeline = RenderPipeline::new(catalog.clone(), load_font_database(&[]), Arc::new(MemoryStorage::new()));
        let err = pipeline
            .layout(&spec(&catalog, "Q"), &stock_safe_zones("img_1"), &tiny_png(4, 4))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound { entity: "zone", .. }));
    }

    #[test]
    fn test_layout_anchors_text_in_zone() {
        let catalog = Arc::new(builtin_catalog().unwrap());
        let pipeline = RenderPipeline::new(catalog.clone(), load_font_database(&[]), Arc::new(MemoryStorage::new()));
        let tree = pipeline
            .layout(&spec(&catalog, "A"), &stock_safe_zones("img_1"), &tiny_png(4, 4))
            .unwrap();
        let block = tree.text_blocks()[0];
        // Zone A on a 1080 square: x = 0.04 * 1080
        assert_eq!(block.rect.x, 43.0);
        assert!(block.rect.y >= 32.0);
    }
}
