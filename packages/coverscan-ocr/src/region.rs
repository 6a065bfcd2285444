use serde::{Deserialize, Serialize};

/// A single recognized word as reported by an OCR backend, in source-image pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub text: String,
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
    /// Percentage. Tesseract reports `-1` for rows that carry no word.
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        text: impl Into<String>,
        left: i64,
        top: i64,
        width: i64,
        height: i64,
        confidence: f32,
    ) -> Self {
        Self {
            text: text.into(),
            left,
            top,
            width,
            height,
            confidence,
        }
    }

    /// Converts the left/top/width/height box into edge coordinates.
    ///
    /// Returns `None` for negative origins or empty boxes.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let left = u32::try_from(self.left).ok()?;
        let top = u32::try_from(self.top).ok()?;
        let width = u32::try_from(self.width).ok()?;
        let height = u32::try_from(self.height).ok()?;
        BoundingBox::new(left, top, left.checked_add(width)?, top.checked_add(height)?)
    }
}

/// Axis-aligned rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "[u32; 4]", try_from = "[u32; 4]")]
pub struct BoundingBox {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

impl BoundingBox {
    /// Builds a box, rejecting anything where `left >= right` or `top >= bottom`.
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Option<Self> {
        if left >= right || top >= bottom {
            return None;
        }
        Some(Self {
            left,
            top,
            right,
            bottom,
        })
    }

    pub fn left(&self) -> u32 {
        self.left
    }

    pub fn top(&self) -> u32 {
        self.top
    }

    pub fn right(&self) -> u32 {
        self.right
    }

    pub fn bottom(&self) -> u32 {
        self.bottom
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.left, b.top, b.right, b.bottom]
    }
}

impl TryFrom<[u32; 4]> for BoundingBox {
    type Error = String;

    fn try_from(v: [u32; 4]) -> Result<Self, Self::Error> {
        BoundingBox::new(v[0], v[1], v[2], v[3])
            .ok_or_else(|| format!("degenerate bounding box {:?}", v))
    }
}

/// Presentation bucket derived from box height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
    Small,
    Medium,
    Large,
}

impl SizeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
        }
    }
}

/// A retained detection. Built only by the extractor, read through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRegion {
    text: String,
    bbox: BoundingBox,
    confidence: u8,
}

impl TextRegion {
    pub(crate) fn new(text: String, bbox: BoundingBox, confidence: u8) -> Self {
        Self {
            text,
            bbox,
            confidence: confidence.min(100),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn confidence(&self) -> u8 {
        self.confidence
    }

    /// Horizontal position of the left edge as a percentage of image width.
    pub fn x_percent(&self, image_width: u32) -> f64 {
        percent(self.bbox.left, image_width)
    }

    /// Vertical position of the top edge as a percentage of image height.
    pub fn y_percent(&self, image_height: u32) -> f64 {
        percent(self.bbox.top, image_height)
    }
}

fn percent(value: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * f64::from(value) / f64::from(total)
}

/// Regions of one image in reading order, plus that image's pixel size.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    regions: Vec<TextRegion>,
    image_width: u32,
    image_height: u32,
}

impl PageResult {
    pub(crate) fn new(regions: Vec<TextRegion>, image_width: u32, image_height: u32) -> Self {
        Self {
            regions,
            image_width,
            image_height,
        }
    }

    pub fn empty(image_width: u32, image_height: u32) -> Self {
        Self::new(Vec::new(), image_width, image_height)
    }

    pub fn regions(&self) -> &[TextRegion] {
        &self.regions
    }

    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Region texts joined by a single space, in reading order.
    pub fn linear_text(&self) -> String {
        self.regions
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Overlay record persisted to the cache and handed to viewers.
///
/// Tesseract regions carry `confidence` and `bbox`; vision-model regions only
/// have the estimated percentage position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub text: String,
    pub x_percent: f64,
    pub y_percent: f64,
    pub size: SizeClass,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

fn default_kind() -> String {
    "other".to_string()
}
