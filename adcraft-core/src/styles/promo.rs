use crate::catalog::{Catalog, StyleDefinition};
use crate::error::EngineResult;
use crate::layout::{CornerRadii, EmbeddedImage, LayoutNode, LayoutTree, Rect, Shadow, TextAlign};
use crate::model::{PixelRect, SlotType, Spec, Theme};
use crate::text::TextShaper;

use super::{fit_block, zone_rect, TextStyle, PROMO};

pub(super) fn register(catalog: &mut Catalog) -> EngineResult<()> {
    catalog.register_style(
        StyleDefinition {
            id: "boxed_text".into(),
            family_id: PROMO.into(),
            display_name: "Boxed Text".into(),
            supported_zones: vec!["A".into(), "B".into(), "C".into()],
            default_theme: Theme {
                font_family: "Bebas Neue".into(),
                font_size: 52.0,
                color: "#292121".into(),
                background: "rgba(255, 255, 255, 0.75)".into(),
                radius: 16.0,
                shadow: true,
            },
            max_lines: 2,
            slot_types: vec![SlotType::Headline, SlotType::Subtext],
        },
        boxed_text,
    )
}

/// Translucent card pinned to the bottom of the zone, centred headline with
/// an optional small subtext line beneath it.
fn boxed_text(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 36.0;
    const PAD_Y: f32 = 28.0;
    const GAP: f32 = 10.0;

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let inner_w = (area.w - 2.0 * PAD_X).max(1.0);
    let max_size = theme.font_size.min(area.h * 0.35);
    let subtext = spec.copy.text(SlotType::Subtext).filter(|s| !s.is_empty());

    let headline_style = TextStyle {
        family: &theme.font_family,
        weight: 400,
        line_height: 1.2,
        letter_spacing: 0.5,
        color: &theme.color,
        align: TextAlign::Center,
    };
    let sub_budget = if subtext.is_some() { max_size * 0.5 + GAP } else { 0.0 };
    let mut headline = fit_block(
        shaper,
        spec.copy.text(SlotType::Headline).unwrap_or_default(),
        headline_style,
        area.x + PAD_X,
        0.0,
        inner_w,
        max_size,
        (area.h - 2.0 * PAD_Y - sub_budget).max(max_size * 1.2),
        2,
    );

    let mut sub = subtext.map(|text| {
        fit_block(
            shaper,
            text,
            TextStyle {
                family: "Inter",
                weight: 400,
                line_height: 1.2,
                letter_spacing: 0.0,
                color: &theme.color,
                align: TextAlign::Center,
            },
            area.x + PAD_X,
            0.0,
            inner_w,
            (headline.font_size * 0.45).max(14.0),
            headline.font_size,
            1,
        )
    });

    let content_h = headline.rect.h + sub.as_ref().map_or(0.0, |s| GAP + s.rect.h);
    let card_h = content_h + 2.0 * PAD_Y;
    let canvas_h = spec.canvas.height as f32;
    let card_y = (area.bottom() - card_h).max(area.y).min(canvas_h - card_h).max(0.0);

    headline.rect.y = card_y + PAD_Y;
    if let Some(s) = sub.as_mut() {
        s.rect.y = headline.rect.bottom() + GAP;
    }

    let mut children = vec![LayoutNode::Text(headline)];
    children.extend(sub.map(LayoutNode::Text));

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![
            image.background(spec.canvas.width, spec.canvas.height),
            LayoutNode::Box {
                rect: Rect::new(area.x, card_y, area.w, card_h),
                fill: theme.background.clone(),
                radii: CornerRadii::uniform(theme.radius),
                stroke: None,
                shadow: theme.shadow.then(|| Shadow::soft(0.15)),
                children,
            },
        ],
    }
}
