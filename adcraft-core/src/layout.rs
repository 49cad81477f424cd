//! Layout Tree - the declarative output of a style's layout function
//!
//! Coordinates are absolute canvas pixels. Nodes paint in order; a Box's
//! children paint immediately after the box itself.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::text::TextShaper;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn inset(&self, dx: f32, dy: f32) -> Rect {
        Rect::new(
            self.x + dx,
            self.y + dy,
            (self.w - 2.0 * dx).max(0.0),
            (self.h - 2.0 * dy).max(0.0),
        )
    }
}

/// Corner radii in clockwise order from the top-left.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerRadii {
    pub top_left: f32,
    pub top_right: f32,
    pub bottom_right: f32,
    pub bottom_left: f32,
}

impl CornerRadii {
    pub fn uniform(r: f32) -> Self {
        Self { top_left: r, top_right: r, bottom_right: r, bottom_left: r }
    }

    pub fn is_uniform(&self) -> bool {
        self.top_left == self.top_right
            && self.top_right == self.bottom_right
            && self.bottom_right == self.bottom_left
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shadow {
    pub dy: f32,
    pub blur: f32,
    pub opacity: f32,
}

impl Shadow {
    pub fn soft(opacity: f32) -> Self {
        Self { dy: 4.0, blur: 10.0, opacity }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub color: String,
    pub width: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Start,
    Center,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    /// Box the lines are laid out in; line 0 starts at its top edge.
    pub rect: Rect,
    pub lines: Vec<String>,
    pub font_family: String,
    pub font_size: f32,
    pub font_weight: u16,
    pub color: String,
    pub align: TextAlign,
    /// Multiplier of font size.
    pub line_height: f32,
    pub letter_spacing: f32,
}

impl TextBlock {
    pub fn block_height(&self) -> f32 {
        self.lines.len() as f32 * self.font_size * self.line_height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LayoutNode {
    /// Raster image scaled to cover `rect`, cropped at the centre.
    Image { href: String, rect: Rect },
    Box {
        rect: Rect,
        fill: String,
        radii: CornerRadii,
        stroke: Option<Stroke>,
        shadow: Option<Shadow>,
        children: Vec<LayoutNode>,
    },
    Text(TextBlock),
    Polygon { points: Vec<(f32, f32)>, fill: String },
}

impl LayoutNode {
    pub fn filled_box(rect: Rect, fill: impl Into<String>) -> Self {
        LayoutNode::Box {
            rect,
            fill: fill.into(),
            radii: CornerRadii::default(),
            stroke: None,
            shadow: None,
            children: vec![],
        }
    }

    /// Outline-only rectangle, used for decorative frames.
    pub fn frame(rect: Rect, color: impl Into<String>, width: f32) -> Self {
        LayoutNode::Box {
            rect,
            fill: "none".to_string(),
            radii: CornerRadii::default(),
            stroke: Some(Stroke { color: color.into(), width }),
            shadow: None,
            children: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutTree {
    pub width: u32,
    pub height: u32,
    pub nodes: Vec<LayoutNode>,
}

impl LayoutTree {
    /// Every text block in paint order, including nested ones.
    pub fn text_blocks(&self) -> Vec<&TextBlock> {
        fn walk<'a>(nodes: &'a [LayoutNode], out: &mut Vec<&'a TextBlock>) {
            for node in nodes {
                match node {
                    LayoutNode::Text(t) => out.push(t),
                    LayoutNode::Box { children, .. } => walk(children, out),
                    _ => {}
                }
            }
        }
        let mut out = vec![];
        walk(&self.nodes, &mut out);
        out
    }
}

/// Format and pixel size read from an image header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub mime: &'static str,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Sniff PNG, JPEG or WebP and read dimensions without decoding pixels.
pub fn sniff_image(bytes: &[u8]) -> EngineResult<ImageInfo> {
    let format = image::guess_format(bytes)
        .map_err(|e| EngineError::Validation(format!("unrecognized image data: {}", e)))?;
    let (mime, extension) = match format {
        image::ImageFormat::Png => ("image/png", "png"),
        image::ImageFormat::Jpeg => ("image/jpeg", "jpg"),
        image::ImageFormat::WebP => ("image/webp", "webp"),
        other => {
            return Err(EngineError::Validation(format!(
                "unsupported image format {:?}",
                other
            )))
        }
    };
    let (width, height) = image::ImageReader::with_format(std::io::Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| EngineError::Validation(format!("unreadable image header: {}", e)))?;
    Ok(ImageInfo { mime, extension, width, height })
}

/// Source photograph prepared for embedding in a layout.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

impl EmbeddedImage {
    pub fn from_bytes(bytes: &[u8]) -> EngineResult<Self> {
        let info = sniff_image(bytes)?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        Ok(Self {
            data_uri: format!("data:{};base64,{}", info.mime, encoded),
            width: info.width,
            height: info.height,
        })
    }

    /// Full-bleed cover background for a canvas.
    pub fn background(&self, width: u32, height: u32) -> LayoutNode {
        LayoutNode::Image {
            href: self.data_uri.clone(),
            rect: Rect::new(0.0, 0.0, width as f32, height as f32),
        }
    }
}

// --- Text fitting ---

/// Greedy word wrap. A single word wider than the line gets a line of its own.
pub fn wrap_text(
    shaper: &TextShaper,
    text: &str,
    font_family: &str,
    font_size: f32,
    weight: u16,
    letter_spacing: f32,
    max_width: f32,
) -> Vec<String> {
    let mut lines = vec![];
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if current.is_empty()
            || shaper.measure(&candidate, font_family, font_size, weight, letter_spacing) <= max_width
        {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Constraints for fitting copy into a text box.
#[derive(Debug, Clone)]
pub struct FitRequest<'a> {
    pub text: &'a str,
    pub font_family: &'a str,
    pub weight: u16,
    pub letter_spacing: f32,
    pub line_height: f32,
    pub max_size: f32,
    pub min_size: f32,
    pub max_width: f32,
    pub max_height: f32,
    pub max_lines: usize,
}

impl FitRequest<'_> {
    fn width_at(&self, shaper: &TextShaper, line: &str, size: f32) -> f32 {
        shaper.measure(line, self.font_family, size, self.weight, self.letter_spacing)
    }
}

pub const MIN_FONT_SIZE: f32 = 14.0;

/// Shrink from `max_size` until the wrapped copy fits the line budget, the
/// height budget and the width (a single long word can overflow a line). At
/// the floor the copy is truncated with an ellipsis.
pub fn fit_text(shaper: &TextShaper, req: &FitRequest<'_>) -> (f32, Vec<String>) {
    let max_lines = req.max_lines.max(1);
    let floor = req.min_size.min(req.max_size).max(1.0);
    let mut size = req.max_size.max(floor);
    loop {
        let lines = wrap_text(
            shaper,
            req.text,
            req.font_family,
            size,
            req.weight,
            req.letter_spacing,
            req.max_width,
        );
        let height = lines.len() as f32 * size * req.line_height;
        let narrow = lines.iter().all(|l| req.width_at(shaper, l, size) <= req.max_width);
        if (narrow && lines.len() <= max_lines && height <= req.max_height) || size <= floor {
            return (size, truncate_lines(shaper, req, size, lines, max_lines));
        }
        size = (size - 2.0).max(floor);
    }
}

/// Cut to `max_lines`, dropping words from the last line until it fits with
/// the ellipsis appended.
fn truncate_lines(
    shaper: &TextShaper,
    req: &FitRequest<'_>,
    size: f32,
    mut lines: Vec<String>,
    max_lines: usize,
) -> Vec<String> {
    if lines.len() <= max_lines {
        return lines;
    }
    lines.truncate(max_lines);
    if let Some(last) = lines.last_mut() {
        let mut words: Vec<&str> = last.split_whitespace().collect();
        let ellipsized = loop {
            let joined = words.join(" ");
            let trimmed = joined.trim_end_matches(|c: char| c.is_ascii_punctuation());
            let candidate = format!("{}\u{2026}", trimmed);
            if words.len() <= 1 || req.width_at(shaper, &candidate, size) <= req.max_width {
                break candidate;
            }
            words.pop();
        };
        *last = ellipsized;
    }
    lines
}
