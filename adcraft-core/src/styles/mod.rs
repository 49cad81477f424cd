//! Built-in families and styles.
//!
//! Each style owns its layout function. Helpers here only fit text; they do
//! not decide where anything goes.

mod luxury;
mod minimal;
mod promo;
mod testimonial;

use crate::catalog::{Catalog, FamilyDefinition};
use crate::error::EngineResult;
use crate::layout::{fit_text, FitRequest, Rect, TextAlign, TextBlock, MIN_FONT_SIZE};
use crate::model::{Angle, PixelRect, Spec};
use crate::text::TextShaper;

pub const PROMO: &str = "promo";
pub const TESTIMONIAL: &str = "testimonial";
pub const MINIMAL: &str = "minimal";
pub const LUXURY: &str = "luxury";

/// The stock catalog: four families, nine styles.
pub fn builtin_catalog() -> EngineResult<Catalog> {
    let mut catalog = Catalog::new();

    catalog.register_family(FamilyDefinition {
        id: PROMO.into(),
        display_name: "Promo".into(),
        description: "Bold promotional overlays that highlight offers and product benefits".into(),
        forced_angle: None,
    })?;
    catalog.register_family(FamilyDefinition {
        id: TESTIMONIAL.into(),
        display_name: "Testimonial".into(),
        description: "Customer quote styles that build trust through social proof".into(),
        forced_angle: None,
    })?;
    catalog.register_family(FamilyDefinition {
        id: MINIMAL.into(),
        display_name: "Minimal".into(),
        description: "Clean, understated layouts that let the product speak for itself".into(),
        forced_angle: None,
    })?;
    catalog.register_family(FamilyDefinition {
        id: LUXURY.into(),
        display_name: "Luxury Editorial".into(),
        description: "Aspirational, refined copy with no aggressive hooks".into(),
        forced_angle: Some(Angle::Aspirational),
    })?;

    promo::register(&mut catalog)?;
    testimonial::register(&mut catalog)?;
    minimal::register(&mut catalog)?;
    luxury::register(&mut catalog)?;

    catalog.validate()?;
    Ok(catalog)
}

pub(crate) fn zone_rect(zone: PixelRect) -> Rect {
    Rect::new(zone.x as f32, zone.y as f32, zone.w as f32, zone.h as f32)
}

/// Space left between a top edge and the canvas bottom, less a margin.
pub(crate) fn room_below(spec: &Spec, top: f32, margin: f32) -> f32 {
    (spec.canvas.height as f32 - top - margin).max(0.0)
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct TextStyle<'a> {
    pub family: &'a str,
    pub weight: u16,
    pub line_height: f32,
    pub letter_spacing: f32,
    pub color: &'a str,
    pub align: TextAlign,
}

/// Fit `text` into a column of `width` starting at `(x, y)`.
/// The returned block's rect is exactly as tall as its lines.
#[allow(clippy::too_many_arguments)]
pub(crate) fn fit_block(
    shaper: &TextShaper,
    text: &str,
    style: TextStyle<'_>,
    x: f32,
    y: f32,
    width: f32,
    max_size: f32,
    max_height: f32,
    max_lines: usize,
) -> TextBlock {
    let (font_size, lines) = fit_text(shaper, &FitRequest {
        text,
        font_family: style.family,
        weight: style.weight,
        letter_spacing: style.letter_spacing,
        line_height: style.line_height,
        max_size,
        min_size: MIN_FONT_SIZE,
        max_width: width.max(1.0),
        max_height,
        max_lines,
    });
    let mut block = TextBlock {
        rect: Rect::new(x, y, width, 0.0),
        lines,
        font_family: style.family.to_string(),
        font_size,
        font_weight: style.weight,
        color: style.color.to_string(),
        align: style.align,
        line_height: style.line_height,
        letter_spacing: style.letter_spacing,
    };
    block.rect.h = block.block_height();
    block
}

/// Widest line of a fitted block, for content-sized cards.
pub(crate) fn widest_line(shaper: &TextShaper, block: &TextBlock) -> f32 {
    block
        .lines
        .iter()
        .map(|l| {
            shaper.measure(
                l,
                &block.font_family,
                block.font_size,
                block.font_weight,
                block.letter_spacing,
            )
        })
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{EmbeddedImage, LayoutNode};
    use crate::model::{CanvasDims, Format, Language, NormRect, SlotType, SpecCopy};
    use crate::text::load_font_database;

    fn shaper() -> TextShaper {
        TextShaper::new(load_font_database(&[]))
    }

    fn embedded() -> EmbeddedImage {
        EmbeddedImage { data_uri: "data:image/png;base64,AAAA".into(), width: 800, height: 1000 }
    }

    fn spec_for(catalog: &Catalog, style_id: &str, format: Format) -> Spec {
        let style = catalog.get_style(style_id).unwrap();
        let mut copy = SpecCopy::default();
        for t in &style.definition.slot_types {
            let text = match t {
                SlotType::Headline => "Salon look in 5 minutes, no glue and no mess at all",
                SlotType::Subtext => "Professional results at home",
                SlotType::Quote => "My manicurist was shocked these aren't gel. Two weeks in and they still look perfect.",
            };
            copy.texts.insert(*t, text.to_string());
            copy.slot_ids.insert(*t, format!("sl_{}", t.as_str()));
        }
        copy.attribution = Some("\u{2014} Sophie M., Verified Buyer".into());
        Spec {
            id: "sp_test".into(),
            image_id: "img_test".into(),
            format,
            language: Language::En,
            family_id: style.definition.family_id.clone(),
            style_id: style_id.into(),
            zone_id: "B".into(),
            primary_slot_id: format!("sl_{}", style.definition.primary_slot_type().as_str()),
            copy,
            theme: style.definition.default_theme.clone(),
            canvas: format.dims(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_builtin_catalog_is_complete() {
        let catalog = builtin_catalog().unwrap();
        assert_eq!(catalog.families().len(), 4);
        assert_eq!(catalog.styles().len(), 9);
        assert_eq!(catalog.styles_for_family(LUXURY).unwrap().len(), 4);
        assert_eq!(catalog.styles_for_family(PROMO).unwrap().len(), 1);
        assert_eq!(
            catalog.get_family(LUXURY).unwrap().forced_angle,
            Some(Angle::Aspirational)
        );
    }

    #[test]
    fn test_every_style_paints_background_first_and_stays_on_canvas() {
        let catalog = builtin_catalog().unwrap();
        let image = embedded();
        let shaper = shaper();
        for format in Format::ALL {
            let CanvasDims { width, height } = format.dims();
            for zone in [
                NormRect::new(0.04, 0.03, 0.5, 0.15),
                NormRect::new(0.04, 0.78, 0.92, 0.19),
                NormRect::new(0.6, 0.05, 0.36, 0.25),
            ] {
                for style in catalog.styles() {
                    let spec = spec_for(&catalog, style.id(), format);
                    let zone_px = zone.to_pixels(spec.canvas);
                    let tree = style.layout(&spec, &image, zone_px, &shaper);
                    assert_eq!((tree.width, tree.height), (width, height));
                    assert!(
                        matches!(tree.nodes.first(), Some(LayoutNode::Image { .. })),
                        "{} must start with the background",
                        style.id()
                    );
                    let blocks = tree.text_blocks();
                    assert!(!blocks.is_empty(), "{} renders no text", style.id());
                    for block in blocks {
                        assert!(block.lines.len() <= style.definition.max_lines.max(1) + 1);
                        assert!(block.rect.bottom() <= height as f32 + 0.5, "{} overflows", style.id());
                    }
                }
            }
        }
    }

    #[test]
    fn test_layout_is_deterministic() {
        let catalog = builtin_catalog().unwrap();
        let image = embedded();
        let shaper = shaper();
        for style in catalog.styles() {
            let spec = spec_for(&catalog, style.id(), Format::Portrait);
            let zone = NormRect::new(0.04, 0.78, 0.92, 0.19).to_pixels(spec.canvas);
            assert_eq!(
                style.layout(&spec, &image, zone, &shaper),
                style.layout(&spec, &image, zone, &shaper)
            );
        }
    }

    #[test]
    fn test_headline_font_is_clamped_by_zone_height() {
        let catalog = builtin_catalog().unwrap();
        let spec = spec_for(&catalog, "boxed_text", Format::Portrait);
        let zone = NormRect::new(0.04, 0.03, 0.5, 0.15).to_pixels(spec.canvas);
        let tree = catalog.get_style("boxed_text").unwrap().layout(&spec, &embedded(), zone, &shaper());
        let headline = tree.text_blocks()[0];
        assert!(headline.font_size <= zone.h as f32 * 0.35);
    }

    #[test]
    fn test_wide_glyph_headline_stays_inside_the_card() {
        let catalog = builtin_catalog().unwrap();
        let shaper = shaper();
        let mut spec = spec_for(&catalog, "boxed_text", Format::Portrait);
        spec.copy.texts.insert(SlotType::Headline, "WWWWWWWWW WWWW".into());
        let zone = NormRect::new(0.04, 0.03, 0.5, 0.15).to_pixels(spec.canvas);
        let tree = catalog.get_style("boxed_text").unwrap().layout(&spec, &embedded(), zone, &shaper);
        let headline = tree.text_blocks()[0];
        for line in &headline.lines {
            let width = shaper.measure(
                line,
                &headline.font_family,
                headline.font_size,
                headline.font_weight,
                headline.letter_spacing,
            );
            assert!(width <= headline.rect.w + 0.5, "{:?} is {} wide", line, width);
        }
    }

    #[test]
    fn test_every_line_fits_its_text_box() {
        let catalog = builtin_catalog().unwrap();
        let image = embedded();
        let shaper = shaper();
        for format in Format::ALL {
            for zone in [NormRect::new(0.04, 0.03, 0.5, 0.15), NormRect::new(0.04, 0.78, 0.92, 0.19)] {
                for style in catalog.styles() {
                    let spec = spec_for(&catalog, style.id(), format);
                    let tree = style.layout(&spec, &image, zone.to_pixels(spec.canvas), &shaper);
                    for block in tree.text_blocks() {
                        for line in &block.lines {
                            let width = shaper.measure(
                                line,
                                &block.font_family,
                                block.font_size,
                                block.font_weight,
                                block.letter_spacing,
                            );
                            assert!(
                                width <= block.rect.w + 0.5,
                                "{} {:?}: {:?} is {} wide in a {} box",
                                style.id(),
                                format,
                                line,
                                width,
                                block.rect.w
                            );
                        }
                    }
                }
            }
        }
    }
}
