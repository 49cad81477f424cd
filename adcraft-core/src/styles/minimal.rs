use crate::catalog::{Catalog, StyleDefinition};
use crate::error::EngineResult;
use crate::layout::{EmbeddedImage, LayoutNode, LayoutTree, Rect, TextAlign};
use crate::model::{PixelRect, SlotType, Spec, Theme};
use crate::text::TextShaper;

use super::{fit_block, room_below, zone_rect, TextStyle, MINIMAL};

pub(super) fn register(catalog: &mut Catalog) -> EngineResult<()> {
    catalog.register_style(
        StyleDefinition {
            id: "minimal_caption".into(),
            family_id: MINIMAL.into(),
            display_name: "Minimal Caption".into(),
            supported_zones: vec!["A".into(), "B".into(), "C".into()],
            default_theme: Theme {
                font_family: "Inter".into(),
                font_size: 44.0,
                color: "#FFFFFF".into(),
                background: "transparent".into(),
                radius: 0.0,
                shadow: false,
            },
            max_lines: 2,
            slot_types: vec![SlotType::Headline],
        },
        minimal_caption,
    )
}

/// Bare left-aligned caption over the photo with a short rule above it.
fn minimal_caption(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const RULE_W: f32 = 48.0;
    const RULE_H: f32 = 3.0;
    const GAP: f32 = 14.0;

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let max_size = theme.font_size.min((area.h * 0.3).round());
    let text_top = area.y + RULE_H + GAP;

    let caption = fit_block(
        shaper,
        spec.copy.text(SlotType::Headline).unwrap_or_default(),
        TextStyle {
            family: &theme.font_family,
            weight: 600,
            line_height: 1.15,
            letter_spacing: -0.5,
            color: &theme.color,
            align: TextAlign::Start,
        },
        area.x,
        text_top,
        area.w.max(1.0),
        max_size,
        room_below(spec, text_top, 16.0)
            .min((area.h - RULE_H - GAP).max(max_size * 1.15)),
        2,
    );

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![
            image.background(spec.canvas.width, spec.canvas.height),
            LayoutNode::filled_box(Rect::new(area.x, area.y, RULE_W, RULE_H), theme.color.clone()),
            LayoutNode::Text(caption),
        ],
    }
}
