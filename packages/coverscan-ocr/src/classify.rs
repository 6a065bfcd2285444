//! Cover/content page routing for the hybrid backend.
use std::path::{Path, PathBuf};

const COVER_MARKERS: [&str; 3] = ["000", "cover", "front"];

/// A page is treated as a cover when it is the first PNG among its siblings
/// (sorted by path) or its file name contains a cover marker.
pub fn is_cover_page(path: &Path, siblings: &[PathBuf]) -> bool {
    let mut pngs: Vec<&PathBuf> = siblings
        .iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .map(|e| e.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();
    pngs.sort();
    if pngs.first().map(|first| first.as_path() == path).unwrap_or(false) {
        return true;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    COVER_MARKERS.iter().any(|marker| name.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Vec<PathBuf> {
        ["scans/page_002.png", "scans/page_001.png", "scans/notes.txt", "scans/page_003.png"]
            .iter()
            .map(PathBuf::from)
            .collect()
    }

    #[test]
    fn test_first_png_is_cover() {
        assert!(is_cover_page(Path::new("scans/page_001.png"), &pages()));
        assert!(!is_cover_page(Path::new("scans/page_003.png"), &pages()));
    }

    #[test]
    fn test_name_markers() {
        assert!(is_cover_page(Path::new("scans/Front-Matter.png"), &[]));
        assert!(is_cover_page(Path::new("scans/issue1642_000.png"), &pages()));
        assert!(is_cover_page(Path::new("scans/COVER.jpg"), &[]));
        assert!(!is_cover_page(Path::new("scans/page_042.png"), &[]));
    }
}
