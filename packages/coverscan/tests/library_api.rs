//! Integration tests for the coverscan library API

#[test]
fn test_prelude_imports() {
    use coverscan::prelude::*;

    let hocr = "<div class='ocr_page' title='bbox 0 0 200 100'>\
        <span class='ocrx_word' title='bbox 100 50 140 70; x_wconf 85'>EYE</span>\
        <span class='ocrx_word' title='bbox 10 50 70 70; x_wconf 90'>PRIVATE</span></div>";
    let parsed = parse_hocr(hocr);
    let (width, height) = parsed.dimensions.unwrap();
    let page: PageResult = extract_regions(&parsed.detections, width, height, &ExtractorConfig::default());
    assert_eq!(page.linear_text(), "PRIVATE EYE");

    let scorer = KeywordScorer::default();
    assert_eq!(scorer.score(&page.linear_text()).keywords_found.len(), 2);
}

#[test]
fn test_config_defaults() {
    use coverscan::AppConfig;

    let config = AppConfig::default();
    assert_eq!(config.extractor.min_confidence, 70);
    assert_eq!(config.tesseract.psm, vec![3, 6, 11]);
    assert_eq!(config.cache_file.to_str(), Some("hybrid_ocr_cache.json"));
}

#[test]
fn test_ocr_crate_types() {
    use coverscan_ocr::{Detection, ExtractorConfig, SizeClass};

    let detections = vec![
        Detection::new("SPY", 0, 0, 30, 25, 99.0),
        Detection::new("x", 0, 0, 30, 25, 99.0),
    ];
    let page = coverscan_ocr::extract_regions(&detections, 100, 100, &ExtractorConfig::default());
    let records = coverscan_ocr::to_records(&page, &ExtractorConfig::default());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size, SizeClass::Large);
}
