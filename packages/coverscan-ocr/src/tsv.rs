//! Reader for Tesseract's `tsv` output (the `image_to_data` table).
use crate::region::Detection;

const PAGE_LEVEL: u32 = 1;
const WORD_LEVEL: u32 = 5;

/// Words and page size recovered from a TSV table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TsvPage {
    pub dimensions: Option<(u32, u32)>,
    pub detections: Vec<Detection>,
}

/// Parses word rows (`level == 5`). Short or unreadable rows are skipped.
pub fn parse_tsv(tsv: &str) -> TsvPage {
    let mut page = TsvPage::default();

    for (idx, row) in tsv.lines().enumerate() {
        if idx == 0 && row.starts_with("level") {
            continue;
        }
        let cols = row.split('\t').collect::<Vec<_>>();
        if cols.len() < 11 {
            continue;
        }
        let Ok(level) = cols[0].trim().parse::<u32>() else {
            continue;
        };
        let Some([left, top, width, height]) = parse_box(&cols[6..10]) else {
            continue;
        };

        if level == PAGE_LEVEL && page.dimensions.is_none() {
            if let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) {
                page.dimensions = Some((w, h));
            }
            continue;
        }
        if level != WORD_LEVEL {
            continue;
        }

        let Ok(confidence) = cols[10].trim().parse::<f32>() else {
            continue;
        };
        let text = cols.get(11).map(|t| t.trim()).unwrap_or_default();
        if text.is_empty() {
            continue;
        }
        page.detections
            .push(Detection::new(text, left, top, width, height, confidence));
    }

    page
}

fn parse_box(cols: &[&str]) -> Option<[i64; 4]> {
    let mut out = [0i64; 4];
    for (slot, col) in out.iter_mut().zip(cols) {
        *slot = col.trim().parse().ok()?;
    }
    Some(out)
}
