use crate::catalog::{Catalog, StyleDefinition};
use crate::error::EngineResult;
use crate::layout::{CornerRadii, EmbeddedImage, LayoutNode, LayoutTree, Rect, Shadow, TextAlign};
use crate::model::{PixelRect, SlotType, Spec, Theme};
use crate::text::TextShaper;

use super::{fit_block, room_below, widest_line, zone_rect, TextStyle, TESTIMONIAL};

const EDGE_MARGIN: f32 = 24.0;

pub(super) fn register(catalog: &mut Catalog) -> EngineResult<()> {
    let zones = || vec!["A".to_string(), "B".to_string(), "C".to_string()];

    catalog.register_style(
        StyleDefinition {
            id: "quote_card".into(),
            family_id: TESTIMONIAL.into(),
            display_name: "Quote Card".into(),
            supported_zones: zones(),
            default_theme: Theme {
                font_family: "Inter".into(),
                font_size: 48.0,
                color: "#0A0A0A".into(),
                background: "rgba(255, 255, 255, 0.82)".into(),
                radius: 6.0,
                shadow: true,
            },
            max_lines: 5,
            slot_types: vec![SlotType::Quote],
        },
        quote_card,
    )?;

    catalog.register_style(
        StyleDefinition {
            id: "star_review".into(),
            family_id: TESTIMONIAL.into(),
            display_name: "Star Review".into(),
            supported_zones: zones(),
            default_theme: Theme {
                font_family: "Inter".into(),
                font_size: 34.0,
                color: "#1a1a1a".into(),
                background: "#FFFFFF".into(),
                radius: 16.0,
                shadow: true,
            },
            max_lines: 3,
            slot_types: vec![SlotType::Quote],
        },
        star_review,
    )?;

    catalog.register_style(
        StyleDefinition {
            id: "message_bubble".into(),
            family_id: TESTIMONIAL.into(),
            display_name: "Message Bubble".into(),
            supported_zones: zones(),
            default_theme: Theme {
                font_family: "Inter".into(),
                font_size: 38.0,
                color: "#FFFFFF".into(),
                background: "#007AFF".into(),
                radius: 42.0,
                shadow: true,
            },
            max_lines: 3,
            slot_types: vec![SlotType::Quote],
        },
        message_bubble,
    )
}

/// Keep a content-sized card on canvas: anchored at `top`, lifted if needed.
fn settle(top: f32, height: f32, canvas_h: f32) -> f32 {
    top.min(canvas_h - EDGE_MARGIN - height).max(0.0)
}

fn offset(node: &mut LayoutNode, dy: f32) {
    match node {
        LayoutNode::Text(t) => t.rect.y += dy,
        LayoutNode::Box { rect, children, .. } => {
            rect.y += dy;
            children.iter_mut().for_each(|c| offset(c, dy));
        }
        LayoutNode::Polygon { points, .. } => points.iter_mut().for_each(|p| p.1 += dy),
        LayoutNode::Image { rect, .. } => rect.y += dy,
    }
}

/// White card with an oversized blue opening quote, bold body, a rule and
/// the reviewer's attribution.
fn quote_card(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 40.0;
    const PAD_Y: f32 = 36.0;
    const ACCENT: &str = "#1AABFB";

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let inner_w = (area.w - 2.0 * PAD_X).max(1.0);
    let canvas_h = spec.canvas.height as f32;

    let body_max = theme.font_size.min((area.h * 0.3).round());
    let mark_size = (body_max * 2.4).min(160.0).round();
    let attribution_size = (body_max * 0.72).round().max(14.0);
    let fixed = 2.0 * PAD_Y + mark_size * 0.62 + 24.0 + 1.0 + 16.0 + attribution_size * 1.2;
    let body_room = (room_below(spec, area.y, EDGE_MARGIN) - fixed).max(body_max * 1.25);

    let mut y = PAD_Y;
    let mark = fit_block(
        shaper,
        "\u{201C}",
        TextStyle {
            family: &theme.font_family,
            weight: 700,
            line_height: 0.62,
            letter_spacing: 0.0,
            color: ACCENT,
            align: TextAlign::Start,
        },
        area.x + PAD_X,
        y,
        inner_w,
        mark_size,
        mark_size,
        1,
    );
    y += mark.rect.h;

    let body = fit_block(
        shaper,
        spec.copy.text(SlotType::Quote).unwrap_or_default(),
        TextStyle {
            family: &theme.font_family,
            weight: 700,
            line_height: 1.25,
            letter_spacing: 0.0,
            color: &theme.color,
            align: TextAlign::Start,
        },
        area.x + PAD_X,
        y,
        inner_w,
        body_max,
        body_room,
        5,
    );
    y += body.rect.h + 24.0;

    let rule = LayoutNode::filled_box(Rect::new(area.x + PAD_X, y, inner_w, 1.0), "#E0E0E0");
    y += 1.0 + 16.0;

    let attribution = fit_block(
        shaper,
        spec.copy.attribution.as_deref().unwrap_or("\u{2014} Verified Review"),
        TextStyle {
            family: &theme.font_family,
            weight: 400,
            line_height: 1.2,
            letter_spacing: 0.0,
            color: "#3A3A3A",
            align: TextAlign::Start,
        },
        area.x + PAD_X,
        y,
        inner_w,
        attribution_size,
        attribution_size * 1.2,
        1,
    );
    y += attribution.rect.h + PAD_Y;

    let mut card = LayoutNode::Box {
        rect: Rect::new(area.x, 0.0, area.w, y),
        fill: theme.background.clone(),
        radii: CornerRadii::uniform(theme.radius),
        stroke: None,
        shadow: theme.shadow.then(|| Shadow { dy: 2.0, blur: 10.0, opacity: 0.10 }),
        children: vec![
            LayoutNode::Text(mark),
            LayoutNode::Text(body),
            rule,
            LayoutNode::Text(attribution),
        ],
    };
    offset(&mut card, settle(area.y, y, canvas_h));

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![image.background(spec.canvas.width, spec.canvas.height), card],
    }
}

/// Five-point star centred at `(cx, cy)` with outer radius `r`.
fn star(cx: f32, cy: f32, r: f32) -> Vec<(f32, f32)> {
    let inner = r * 0.5;
    (0..10)
        .map(|i| {
            let radius = if i % 2 == 0 { r } else { inner };
            let theta = -std::f32::consts::FRAC_PI_2 + i as f32 * std::f32::consts::PI / 5.0;
            (cx + radius * theta.cos(), cy + radius * theta.sin())
        })
        .collect()
}

/// Rating card: a row of five amber stars above the review text.
fn star_review(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 28.0;
    const PAD_Y: f32 = 22.0;
    const STAR_GAP: f32 = 4.0;
    const STAR_COLOR: &str = "#F59E0B";

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let inner_w = (area.w - 2.0 * PAD_X).max(1.0);
    let canvas_h = spec.canvas.height as f32;

    let star_size = 36f32.min((area.h * 0.12).round()).max(12.0);
    let body_max = theme.font_size.min((area.h * 0.17).round());
    let body_room =
        (room_below(spec, area.y, EDGE_MARGIN) - 2.0 * PAD_Y - star_size - 14.0).max(body_max * 1.35);

    let body = fit_block(
        shaper,
        spec.copy.text(SlotType::Quote).unwrap_or_default(),
        TextStyle {
            family: &theme.font_family,
            weight: 700,
            line_height: 1.35,
            letter_spacing: 0.0,
            color: &theme.color,
            align: TextAlign::Start,
        },
        area.x + PAD_X,
        PAD_Y + star_size + 14.0,
        inner_w,
        body_max,
        body_room,
        3,
    );

    let stars_w = 5.0 * star_size + 4.0 * STAR_GAP;
    let card_w = (widest_line(shaper, &body).max(stars_w) + 2.0 * PAD_X).min(area.w);
    let card_h = body.rect.bottom() + PAD_Y;

    let mut children: Vec<LayoutNode> = (0..5)
        .map(|i| {
            let cx = area.x + PAD_X + star_size / 2.0 + i as f32 * (star_size + STAR_GAP);
            LayoutNode::Polygon {
                points: star(cx, PAD_Y + star_size / 2.0, star_size / 2.0),
                fill: STAR_COLOR.into(),
            }
        })
        .collect();
    children.push(LayoutNode::Text(body));

    let mut card = LayoutNode::Box {
        rect: Rect::new(area.x, 0.0, card_w, card_h),
        fill: theme.background.clone(),
        radii: CornerRadii::uniform(theme.radius),
        stroke: None,
        shadow: theme.shadow.then(|| Shadow::soft(0.15)),
        children,
    };
    offset(&mut card, settle(area.y, card_h, canvas_h));

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![image.background(spec.canvas.width, spec.canvas.height), card],
    }
}

/// iMessage-style "sent" bubble, right-aligned in the zone, with a sharp
/// polygon tail flush against its square bottom-right corner.
fn message_bubble(spec: &Spec, image: &EmbeddedImage, zone: PixelRect, shaper: &TextShaper) -> LayoutTree {
    const PAD_X: f32 = 24.0;
    const PAD_Y: f32 = 18.0;

    let theme = &spec.theme;
    let area = zone_rect(zone);
    let canvas_h = spec.canvas.height as f32;

    let font_max = theme.font_size.min((area.h * 0.13).round()).max(14.0);
    let tail_half = (font_max * 0.30).round();
    let tail_w = font_max.round();
    let max_bubble_w = (area.w * 0.9 - tail_w).max(2.0 * PAD_X + 1.0);

    let body = fit_block(
        shaper,
        spec.copy.text(SlotType::Quote).unwrap_or_default(),
        TextStyle {
            family: &theme.font_family,
            weight: 700,
            line_height: 1.3,
            letter_spacing: 0.0,
            color: &theme.color,
            align: TextAlign::Start,
        },
        0.0,
        PAD_Y,
        max_bubble_w - 2.0 * PAD_X,
        font_max,
        (room_below(spec, area.y, EDGE_MARGIN) - 2.0 * PAD_Y).max(font_max * 1.3),
        3,
    );

    let bubble_w = (widest_line(shaper, &body) + 2.0 * PAD_X).min(max_bubble_w);
    let bubble_h = body.rect.h + 2.0 * PAD_Y;
    let bubble_x = area.right() - tail_w - bubble_w;
    let top = settle(area.y, bubble_h, canvas_h);

    let mut text = body;
    text.rect.x = bubble_x + PAD_X;
    text.rect.w = bubble_w - 2.0 * PAD_X;
    text.rect.y += top;

    let bottom = top + bubble_h;
    let tail_x = bubble_x + bubble_w;
    let tail = LayoutNode::Polygon {
        points: vec![
            (tail_x, bottom - 2.0 * tail_half),
            (tail_x + tail_w, bottom - tail_half),
            (tail_x, bottom),
        ],
        fill: theme.background.clone(),
    };

    LayoutTree {
        width: spec.canvas.width,
        height: spec.canvas.height,
        nodes: vec![
            image.background(spec.canvas.width, spec.canvas.height),
            LayoutNode::Box {
                rect: Rect::new(bubble_x, top, bubble_w, bubble_h),
                fill: theme.background.clone(),
                radii: CornerRadii {
                    top_left: theme.radius,
                    top_right: theme.radius,
                    bottom_right: 0.0,
                    bottom_left: theme.radius,
                },
                stroke: None,
                shadow: theme.shadow.then(|| Shadow { dy: 3.0, blur: 9.0, opacity: 0.20 }),
                children: vec![LayoutNode::Text(text)],
            },
            tail,
        ],
    }
}
