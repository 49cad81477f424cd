//! Luxury family: serif headlines, muted palettes, generous whitespace.

use crate::catalog::{Catalog, StyleDefinition};
use crate::error::EngineResult;
use crate::layout::{CornerRadii, EmbeddedImage, LayoutNode, LayoutTree, Rect, Shadow, TextAlign};
use crate::model::{Language, PixelRect, SlotType, Spec, Theme};
use crate::text::TextShaper;

use super::{fit_block, room_below, zone_rect, TextStyle, LUXURY};

const SERIF: &str = "Playfair Display";
const EDGE_MARGIN: f32 = 24.0;
const FRAME_COLOR: &str = "#C8B99A";
const FRAME_INSET: f32 = 22.0;

fn luxury_style(
    id: &str,
    display_name: &str,
    theme: Theme,
    max_lines: usize,
    slot_types: Vec<SlotType>,
) -> StyleDefinition {
    StyleDefinition {
        id: id.into(),
        family_id: LUXURY.into(),
        display_name: display_name.into(),
        supported_zones: vec!["A".into(), "B".into(), "C".into()],
        default_theme: theme,
        max_lines,
        slot_types,
    }
}

fn serif_theme(font_size: f32, color: &str, background: &str, radius: f32, shadow: bool) -> Theme {
    Theme {
        font_family: SERIF.into(),
        font_size,
        color: color.into(),
        background: background.into(),
        radius,
        shadow,
    }
}

pub(super) fn register(catalog: &mut Catalog) -> EngineResult<()> {
    catalog.register_style(
        luxury_style(
            "luxury_minimal_center",
            "Luxury Minimal Center",
            serif_theme(52.0, "#1A1A1A", "#FFFFFF", 2.0, true),
            3,
            vec![SlotType::Headline],
        ),
        minimal_center,
    )?;
    catalog.register_style(
        luxury_style(
            "luxury_editorial_left",
            "Luxury Editorial Left",
            serif_theme(46.0, "#1A1A1A", "rgba(255, 252, 248, 0.92)", 0.0, false),
            4,
            vec![SlotType::Headline, SlotType::Subtext],
        ),
        editorial_left,
    )?;
    catalog.register_style(
        luxury_style(
            "luxury_soft_frame",
            "Luxury Soft Frame",
            serif_theme(50.0, "#2B2B2B", "rgba(250, 248, 245, 0.93)", 0.0, true),
            3,
            vec![SlotType::Headline],
        ),
        soft_frame,
    )?;
    catalog.register_style(
        luxury_style(
            "luxury_soft_frame_open",
            "Luxury Soft Frame Open",
            serif_theme(150.0, "#FFFFFF", "transparent", 0.0, false),
            3,
            vec![SlotType::Headline],
        ),
        soft_frame_open,
    )
}

/// Lift a card of `height` so it ends above the canvas bottom margin.
fn settle(top: f32, height: f32, canvas_h: f32) -> f32 {
    top.min(canvas_h - EDGE_MARGIN - height).max(0.0)
}

fn serif(spec: &Spec, align: TextAlign) -> TextStyle<'_> {
    TextStyle {
        family: &spec.theme.font_family,
        weight: 400,
        line_height: 1.25,
        letter_spacing: 0.0,
        color: &spec.theme.color,
        align,
    }
}

fn headline(spec: &Spec) -> &str {
    spec.copy.text(SlotType::Headline).unwrap_or_default()
}

/// White card, centred serif headline over a thin champagne divider.
fn minimal_center(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 56.0;
    const PAD_Y: f32 = 52.0;
    const DIVIDER_GAP: f32 = 26.0;

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let inner_w = (area.w - 2.0 * PAD_X).max(1.0);
    let max_size = theme.font_size.min((area.h * 0.14).round());
    let room = room_below(spec, area.y, EDGE_MARGIN) - 2.0 * PAD_Y - DIVIDER_GAP - 1.0;

    let mut text = fit_block(
        shaper,
        headline(spec),
        serif(spec, TextAlign::Center),
        area.x + PAD_X,
        0.0,
        inner_w,
        max_size,
        room.max(max_size * 1.25),
        3,
    );
    let card_h = 2.0 * PAD_Y + text.rect.h + DIVIDER_GAP + 1.0;
    let card_y = settle(area.y, card_h, spec.canvas.height as f32);
    text.rect.y = card_y + PAD_Y;

    let divider_w = inner_w * 0.6;
    let divider = LayoutNode::filled_box(
        Rect::new(
            area.x + (area.w - divider_w) / 2.0,
            text.rect.bottom() + DIVIDER_GAP,
            divider_w,
            1.0,
        ),
        "#D4C5B0",
    );

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
                shadow: theme.shadow.then(|| Shadow { dy: 4.0, blur: 14.0, opacity: 0.08 }),
                children: vec![LayoutNode::Text(text), divider],
            },
        ],
    }
}

/// Collection line shown when no subtext copy was resolved.
fn collection_label(language: Language) -> &'static str {
    match language {
        Language::En => "Luxury Collection",
        Language::De => "Luxuskollektion",
        Language::Fr => "Collection Luxe",
        Language::Es => "Colecci\u{f3}n de Lujo",
    }
}

/// Ivory panel with a gold bar on its left edge; serif headline and a
/// spaced uppercase kicker beneath.
fn editorial_left(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 40.0;
    const PAD_Y: f32 = 40.0;
    const BAR_W: f32 = 3.0;
    const BAR_GAP: f32 = 22.0;
    const GAP: f32 = 16.0;

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let text_x = area.x + PAD_X + BAR_W + BAR_GAP;
    let inner_w = (area.right() - PAD_X - text_x).max(1.0);
    let max_size = theme.font_size.min((area.h * 0.12).round());
    let room = room_below(spec, area.y, EDGE_MARGIN) - 2.0 * PAD_Y - GAP - max_size;

    let mut title = fit_block(
        shaper,
        headline(spec),
        serif(spec, TextAlign::Start),
        text_x,
        0.0,
        inner_w,
        max_size,
        room.max(max_size * 1.25),
        3,
    );

    let kicker_text = spec
        .copy
        .text(SlotType::Subtext)
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| collection_label(spec.language))
        .to_uppercase();
    let kicker_size = (title.font_size * 0.52).max(14.0);
    let mut kicker = fit_block(
        shaper,
        &kicker_text,
        TextStyle {
            family: "Inter",
            weight: 400,
            line_height: 1.3,
            letter_spacing: kicker_size * 0.1,
            color: "#7A7060",
            align: TextAlign::Start,
        },
        text_x,
        0.0,
        inner_w,
        kicker_size,
        kicker_size * 1.3,
        1,
    );

    let content_h = title.rect.h + GAP + kicker.rect.h;
    let panel_h = content_h + 2.0 * PAD_Y;
    let panel_y = settle(area.y, panel_h, spec.canvas.height as f32);
    title.rect.y = panel_y + PAD_Y;
    kicker.rect.y = title.rect.bottom() + GAP;

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![
            image.background(spec.canvas.width, spec.canvas.height),
            LayoutNode::Box {
                rect: Rect::new(area.x, panel_y, area.w, panel_h),
                fill: theme.background.clone(),
                radii: CornerRadii::uniform(theme.radius),
                stroke: None,
                shadow: None,
                children: vec![
                    LayoutNode::filled_box(
                        Rect::new(area.x + PAD_X, panel_y + PAD_Y, BAR_W, content_h),
                        "#C8A96E",
                    ),
                    LayoutNode::Text(title),
                    LayoutNode::Text(kicker),
                ],
            },
        ],
    }
}

/// Soft card with a hairline frame inset from its edges.
fn soft_frame(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 48.0;
    const PAD_Y: f32 = 44.0;

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let inner_w = (area.w - 2.0 * (FRAME_INSET + PAD_X)).max(1.0);
    let max_size = theme.font_size.min((area.h * 0.13).round());
    let chrome = 2.0 * (FRAME_INSET + PAD_Y);
    let room = room_below(spec, area.y, EDGE_MARGIN) - chrome;

    let mut text = fit_block(
        shaper,
        headline(spec),
        serif(spec, TextAlign::Center),
        area.x + FRAME_INSET + PAD_X,
        0.0,
        inner_w,
        max_size,
        room.max(max_size * 1.25),
        3,
    );
    let card_h = text.rect.h + chrome;
    let card_y = settle(area.y, card_h, spec.canvas.height as f32);
    text.rect.y = card_y + FRAME_INSET + PAD_Y;
    let card = Rect::new(area.x, card_y, area.w, card_h);

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![
            image.background(spec.canvas.width, spec.canvas.height),
            LayoutNode::Box {
                rect: card,
                fill: theme.background.clone(),
                radii: CornerRadii::uniform(theme.radius),
                stroke: None,
                shadow: theme.shadow.then(|| Shadow { dy: 2.0, blur: 12.0, opacity: 0.06 }),
                children: vec![
                    LayoutNode::frame(card.inset(FRAME_INSET, FRAME_INSET), FRAME_COLOR, 1.5),
                    LayoutNode::Text(text),
                ],
            },
        ],
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gravity {
    Top,
    Center,
    Bottom,
}

/// Text sits where the zone sits: upper third pulls up, lower third down.
fn gravity_for(zone: PixelRect, canvas_h: u32) -> Gravity {
    let ratio = zone.center_y() / canvas_h.max(1) as f32;
    if ratio < 0.38 {
        Gravity::Top
    } else if ratio > 0.62 {
        Gravity::Bottom
    } else {
        Gravity::Center
    }
}

/// Canvas-wide hairline frame with large white serif type and no card.
fn soft_frame_open(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const TEXT_INSET: f32 = 40.0;

    let theme = &spec.theme;
    let canvas = Rect::new(0.0, 0.0, spec.canvas.width as f32, spec.canvas.height as f32);
    let frame = canvas.inset(FRAME_INSET, FRAME_INSET);
    let region = frame.inset(TEXT_INSET, TEXT_INSET);
    let max_size = theme.font_size.min((zone.h as f32 * 0.51).round());

    let mut text = fit_block(
        shaper,
        headline(spec),
        TextStyle {
            family: &theme.font_family,
            weight: 400,
            line_height: 1.1,
            letter_spacing: 0.0,
            color: &theme.color,
            align: TextAlign::Center,
        },
        region.x,
        region.y,
        region.w.max(1.0),
        max_size,
        region.h.max(max_size * 1.1),
        3,
    );
    text.rect.y = match gravity_for(zone, spec.canvas.height) {
        Gravity::Top => region.y,
        Gravity::Center => region.y + (region.h - text.rect.h).max(0.0) / 2.0,
        Gravity::Bottom => (region.bottom() - text.rect.h).max(region.y),
    };

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![
            image.background(spec.canvas.width, spec.canvas.height),
            LayoutNode::frame(frame, FRAME_COLOR, 1.5),
            LayoutNode::Text(text),
        ],
    }
}
