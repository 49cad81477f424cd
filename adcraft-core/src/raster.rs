//! Rasterizer - layout tree to SVG to PNG
//!
//! The tree is serialized to an SVG document, parsed by usvg against a shared
//! font database and painted by resvg into a pixmap of the canvas size.

use std::fmt::Write as _;
use std::sync::Arc;

use usvg::fontdb;

use crate::error::{EngineError, EngineResult};
use crate::layout::{CornerRadii, LayoutNode, LayoutTree, Rect, TextAlign, TextBlock};

/// Ascent used to place the first baseline inside a line box.
const BASELINE_RATIO: f32 = 0.78;

pub struct Rasterizer {
    fontdb: Arc<fontdb::Database>,
}

impl Rasterizer {
    /// Draws with the faces layout measured against.
    pub fn new(fontdb: Arc<fontdb::Database>) -> Self {
        Self { fontdb }
    }

    #[tracing::instrument(skip(self, tree), fields(width = tree.width, height = tree.height))]
    pub fn rasterize(&self, tree: &LayoutTree) -> EngineResult<Vec<u8>> {
        let svg = to_svg(tree);
        let opts = usvg::Options {
            fontdb: self.fontdb.clone(),
            font_family: "Inter".to_string(),
            ..Default::default()
        };
        let parsed = usvg::Tree::from_str(&svg, &opts)
            .map_err(|e| EngineError::Render(format!("layout svg rejected: {}", e)))?;

        let mut pixmap = resvg::tiny_skia::Pixmap::new(tree.width, tree.height).ok_or_else(|| {
            EngineError::Render(format!(
                "cannot allocate {}x{} pixmap",
                tree.width, tree.height
            ))
        })?;
        resvg::render(&parsed, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());
        pixmap
            .encode_png()
            .map_err(|e| EngineError::Render(format!("png encoding failed: {}", e)))
    }
}

// --- SVG serialization ---

pub fn to_svg(tree: &LayoutTree) -> String {
    let mut out = String::with_capacity(4096);
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = tree.width,
        h = tree.height
    );
    let mut filters = 0usize;
    write_nodes(&mut out, &tree.nodes, &mut filters);
    out.push_str("</svg>");
    out
}

fn write_nodes(out: &mut String, nodes: &[LayoutNode], filters: &mut usize) {
    for node in nodes {
        match node {
            LayoutNode::Image { href, rect } => {
                let _ = write!(
                    out,
                    r#"<image x="{}" y="{}" width="{}" height="{}" preserveAspectRatio="xMidYMid slice" xlink:href="{}"/>"#,
                    rect.x, rect.y, rect.w, rect.h, href
                );
            }
            LayoutNode::Box { rect, fill, radii, stroke, shadow, children } => {
                let mut attrs = format!(r#" fill="{}""#, escape(fill));
                if let Some(s) = stroke {
                    let _ = write!(attrs, r#" stroke="{}" stroke-width="{}""#, escape(&s.color), s.width);
                }
                if let Some(sh) = shadow {
                    *filters += 1;
                    let id = format!("shadow{}", filters);
                    let _ = write!(
                        out,
                        r##"<defs><filter id="{id}" x="-20%" y="-20%" width="140%" height="160%"><feDropShadow dx="0" dy="{}" stdDeviation="{}" flood-color="#000000" flood-opacity="{}"/></filter></defs>"##,
                        sh.dy, sh.blur, sh.opacity
                    );
                    let _ = write!(attrs, r#" filter="url(#{})""#, id);
                }
                write_box_shape(out, rect, radii, &attrs);
                write_nodes(out, children, filters);
            }
            LayoutNode::Text(block) => write_text(out, block),
            LayoutNode::Polygon { points, fill } => {
                let pts: Vec<String> = points.iter().map(|(x, y)| format!("{},{}", x, y)).collect();
                let _ = write!(out, r#"<polygon points="{}" fill="{}"/>"#, pts.join(" "), escape(fill));
            }
        }
    }
}

fn write_box_shape(out: &mut String, rect: &Rect, radii: &CornerRadii, attrs: &str) {
    if radii.is_uniform() {
        let _ = write!(
            out,
            r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}"{}/>"#,
            rect.x, rect.y, rect.w, rect.h, radii.top_left, attrs
        );
        return;
    }
    let max_r = rect.w.min(rect.h) / 2.0;
    let [tl, tr, br, bl] = [radii.top_left, radii.top_right, radii.bottom_right, radii.bottom_left]
        .map(|r| r.clamp(0.0, max_r));
    let (x, y, r, b) = (rect.x, rect.y, rect.right(), rect.bottom());
    let _ = write!(
        out,
        r#"<path d="M{} {} H{} A{tr} {tr} 0 0 1 {} {} V{} A{br} {br} 0 0 1 {} {} H{} A{bl} {bl} 0 0 1 {} {} V{} A{tl} {tl} 0 0 1 {} {} Z"{}/>"#,
        x + tl, y,
        r - tr, r, y + tr,
        b - br, r - br, b,
        x + bl, x, b - bl,
        y + tl, x + tl, y,
        attrs,
    );
}

fn write_text(out: &mut String, block: &TextBlock) {
    let (anchor, x) = match block.align {
        TextAlign::Start => ("start", block.rect.x),
        TextAlign::Center => ("middle", block.rect.x + block.rect.w / 2.0),
        TextAlign::End => ("end", block.rect.right()),
    };
    let line_px = block.font_size * block.line_height;
    let leading = (line_px - block.font_size) / 2.0;
    for (i, line) in block.lines.iter().enumerate() {
        let baseline = block.rect.y + i as f32 * line_px + leading + block.font_size * BASELINE_RATIO;
        let _ = write!(
            out,
            r#"<text x="{}" y="{}" font-family="{}" font-size="{}" font-weight="{}" letter-spacing="{}" fill="{}" text-anchor="{}">{}</text>"#,
            x,
            baseline,
            escape(&block.font_family),
            block.font_size,
            block.font_weight,
            block.letter_spacing,
            escape(&block.color),
            anchor,
            escape(line)
        );
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
