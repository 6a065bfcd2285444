//! Turns raw word detections into filtered text regions in reading order.
//!
//! Everything here is a pure function of its inputs. Detections that fail the
//! filter are expected OCR noise and are dropped without being reported.
use serde::{Deserialize, Serialize};

use crate::region::{Detection, PageResult, RegionRecord, SizeClass, TextRegion};

/// Thresholds for the region filter and the size buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Detections below this confidence percentage are dropped.
    pub min_confidence: u8,
    /// Minimum number of characters after trimming.
    pub min_text_chars: usize,
    /// Boxes at most this tall are `small`.
    pub small_max_height: u32,
    /// Boxes at most this tall (and above `small_max_height`) are `medium`.
    pub medium_max_height: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 70,
            min_text_chars: 2,
            small_max_height: 12,
            medium_max_height: 20,
        }
    }
}

impl ExtractorConfig {
    pub fn size_class(&self, height: u32) -> SizeClass {
        if height <= self.small_max_height {
            SizeClass::Small
        } else if height <= self.medium_max_height {
            SizeClass::Medium
        } else {
            SizeClass::Large
        }
    }
}

/// Filters `detections` and returns the survivors sorted top-to-bottom, then
/// left-to-right.
pub fn extract_regions(
    detections: &[Detection],
    image_width: u32,
    image_height: u32,
    config: &ExtractorConfig,
) -> PageResult {
    let mut regions: Vec<TextRegion> = detections
        .iter()
        .filter_map(|d| retain(d, config))
        .collect();

    // `sort_by_key` is stable, so equal (top, left) keep input order.
    regions.sort_by_key(|r| (r.bbox().top(), r.bbox().left()));

    PageResult::new(regions, image_width, image_height)
}

fn retain(detection: &Detection, config: &ExtractorConfig) -> Option<TextRegion> {
    let text = detection.text.trim();
    if !is_meaningful_text(text, config.min_text_chars) {
        return None;
    }
    if !detection.confidence.is_finite() || detection.confidence < f32::from(config.min_confidence) {
        return None;
    }
    let bbox = detection.bounding_box()?;
    let confidence = detection.confidence.round().clamp(0.0, 100.0) as u8;
    Some(TextRegion::new(text.to_string(), bbox, confidence))
}

/// Text is kept when it is long enough, not made only of symbols, and has at
/// least one letter or digit.
pub fn is_meaningful_text(text: &str, min_chars: usize) -> bool {
    if text.chars().count() < min_chars {
        return false;
    }
    if text.chars().all(is_symbol) {
        return false;
    }
    text.chars().any(char::is_alphanumeric)
}

fn is_symbol(ch: char) -> bool {
    !ch.is_alphanumeric() && !ch.is_whitespace()
}

/// Overlay records for a page, positions as percentages of the image size.
pub fn to_records(page: &PageResult, config: &ExtractorConfig) -> Vec<RegionRecord> {
    page.regions()
        .iter()
        .map(|region| RegionRecord {
            text: region.text().to_string(),
            x_percent: region.x_percent(page.image_width()),
            y_percent: region.y_percent(page.image_height()),
            size: config.size_class(region.bbox().height()),
            kind: "content".to_string(),
            confidence: Some(region.confidence()),
            bbox: Some(region.bbox()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover_detections() -> Vec<Detection> {
        vec![
            Detection::new("EYE", 100, 50, 40, 20, 85.0),
            Detection::new("PRIVATE", 10, 50, 60, 20, 90.0),
            Detection::new("!!", 5, 5, 10, 10, 95.0),
        ]
    }

    #[test]
    fn test_reading_order_and_percentages() {
        let config = ExtractorConfig::default();
        let page = extract_regions(&cover_detections(), 200, 100, &config);

        let texts: Vec<&str> = page.regions().iter().map(|r| r.text()).collect();
        assert_eq!(texts, vec!["PRIVATE", "EYE"]);
        assert_eq!(page.regions()[0].x_percent(200), 5.0);
        assert_eq!(page.regions()[1].x_percent(200), 50.0);
        assert_eq!(page.linear_text(), "PRIVATE EYE");
    }

    #[test]
    fn test_low_confidence_excluded() {
        let detections = vec![Detection::new("ANDREW", 10, 10, 50, 15, 65.0)];
        let page = extract_regions(&detections, 100, 100, &ExtractorConfig::default());
        assert!(page.is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let detections = vec![Detection::new("ANDREW", 10, 10, 50, 15, 65.0)];
        let config = ExtractorConfig {
            min_confidence: 60,
            ..Default::default()
        };
        let page = extract_regions(&detections, 100, 100, &config);
        assert_eq!(page.len(), 1);
        assert_eq!(page.regions()[0].confidence(), 65);
    }

    #[test]
    fn test_same_top_keeps_left_to_right() {
        let detections = vec![
            Detection::new("first", 10, 50, 30, 10, 90.0),
            Detection::new("second", 100, 50, 30, 10, 90.0),
        ];
        let page = extract_regions(&detections, 300, 300, &ExtractorConfig::default());
        assert_eq!(page.linear_text(), "first second");
    }

    #[test]
    fn test_identical_keys_are_stable() {
        let detections = vec![
            Detection::new("aa", 10, 50, 30, 10, 90.0),
            Detection::new("bb", 10, 50, 30, 10, 80.0),
        ];
        let page = extract_regions(&detections, 300, 300, &ExtractorConfig::default());
        assert_eq!(page.linear_text(), "aa bb");
    }

    #[test]
    fn test_text_rules() {
        assert!(!is_meaningful_text("A", 2));
        assert!(!is_meaningful_text("--", 2));
        assert!(!is_meaningful_text(".,;", 2));
        assert!(!is_meaningful_text("- -", 2));
        assert!(is_meaningful_text("£1", 2));
        assert!(is_meaningful_text("No.1642", 2));
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        let detections = vec![
            Detection::new("  a  ", 0, 0, 10, 10, 99.0),
            Detection::new("  SPY ", 0, 0, 10, 10, 99.0),
        ];
        let page = extract_regions(&detections, 10, 10, &ExtractorConfig::default());
        assert_eq!(page.len(), 1);
        assert_eq!(page.regions()[0].text(), "SPY");
    }

    #[test]
    fn test_invariants_hold_for_mixed_input() {
        let config = ExtractorConfig::default();
        let mut detections = Vec::new();
        for i in 0..60i64 {
            let text = match i % 5 {
                0 => "x".to_string(),
                1 => "??".to_string(),
                _ => format!("w{}", i),
            };
            detections.push(Detection::new(
                text,
                (i * 37) % 190,
                (i * 13) % 90,
                (i % 4) * 5,
                8 + i % 15,
                (i * 7 % 101) as f32 - 1.0,
            ));
        }

        let page = extract_regions(&detections, 200, 100, &config);
        for region in page.regions() {
            assert!(region.confidence() >= config.min_confidence);
            assert!(region.text().trim().chars().count() >= 2);
            let b = region.bbox();
            assert!(b.left() < b.right() && b.top() < b.bottom());
            let x = region.x_percent(200);
            assert!((0.0..=100.0).contains(&x));
        }
        for pair in page.regions().windows(2) {
            let (a, b) = (pair[0].bbox(), pair[1].bbox());
            assert!(a.top() < b.top() || (a.top() == b.top() && a.left() <= b.left()));
        }

        let again = extract_regions(&detections, 200, 100, &config);
        assert_eq!(page, again);
    }

    #[test]
    fn test_size_classes_and_records() {
        let config = ExtractorConfig::default();
        assert_eq!(config.size_class(12), SizeClass::Small);
        assert_eq!(config.size_class(13), SizeClass::Medium);
        assert_eq!(config.size_class(20), SizeClass::Medium);
        assert_eq!(config.size_class(21), SizeClass::Large);

        let page = extract_regions(&cover_detections(), 200, 100, &config);
        let records = to_records(&page, &config);
        assert_eq!(records[0].text, "PRIVATE");
        assert_eq!(records[0].size, SizeClass::Medium);
        assert_eq!(records[0].y_percent, 50.0);
        assert_eq!(records[0].confidence, Some(90));
        assert_eq!(records[0].kind, "content");
    }
}
