//! Reader for Tesseract's HOCR output.
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::region::Detection;

/// Words and page size recovered from an HOCR document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HocrPage {
    /// Page size from the `ocr_page` bbox, when present.
    pub dimensions: Option<(u32, u32)>,
    pub detections: Vec<Detection>,
}

struct OpenWord {
    depth: usize,
    title: String,
    text: String,
}

/// Parses `ocrx_word` spans out of an HOCR document.
///
/// Never fails: a document that stops parsing part way yields the words read
/// before the error, and a word with an unreadable `bbox` is skipped.
pub fn parse_hocr(hocr: &str) -> HocrPage {
    let mut reader = Reader::from_str(hocr);
    reader.check_end_names(false);

    let mut page = HocrPage::default();
    let mut word: Option<OpenWord> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if let Some(open) = word.as_mut() {
                    open.depth += 1;
                    continue;
                }
                inspect_page(&e, &mut page);
                if has_class(&e, "ocrx_word") {
                    word = Some(OpenWord {
                        depth: 1,
                        title: attr(&e, b"title").unwrap_or_default(),
                        text: String::new(),
                    });
                }
            }
            Ok(Event::Empty(e)) => {
                if word.is_none() {
                    inspect_page(&e, &mut page);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(open) = word.as_mut() {
                    match t.unescape() {
                        Ok(text) => open.text.push_str(&text),
                        Err(_) => open.text.push_str(&decode_html_entities(
                            &String::from_utf8_lossy(&t),
                        )),
                    }
                }
            }
            Ok(Event::CData(t)) => {
                if let Some(open) = word.as_mut() {
                    open.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                let closed = match word.as_mut() {
                    Some(open) => {
                        open.depth -= 1;
                        open.depth == 0
                    }
                    None => false,
                };
                if closed {
                    if let Some(detection) = word.take().and_then(finish_word) {
                        page.detections.push(detection);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(
                    position = reader.buffer_position(),
                    "stopping HOCR parse: {}",
                    e
                );
                break;
            }
        }
    }

    page
}

fn inspect_page(e: &BytesStart<'_>, page: &mut HocrPage) {
    if page.dimensions.is_some() || !has_class(e, "ocr_page") {
        return;
    }
    if let Some([_, _, x1, y1]) = attr(e, b"title").as_deref().and_then(title_bbox) {
        page.dimensions = Some((x1, y1));
    }
}

fn finish_word(open: OpenWord) -> Option<Detection> {
    let Some([x0, y0, x1, y1]) = title_bbox(&open.title) else {
        tracing::trace!(title = %open.title, "skipping word with malformed bbox");
        return None;
    };
    let confidence = title_wconf(&open.title).unwrap_or(0.0);
    let text = open.text.replace('\u{00a0}', " ");
    Some(Detection::new(
        text.trim(),
        i64::from(x0),
        i64::from(y0),
        i64::from(x1) - i64::from(x0),
        i64::from(y1) - i64::from(y0),
        confidence,
    ))
}

fn has_class(e: &BytesStart<'_>, class: &str) -> bool {
    attr(e, b"class")
        .map(|value| value.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

fn attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == name)
        .map(|a| match a.unescape_value() {
            Ok(value) => value.into_owned(),
            Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
        })
}

/// Reads the `bbox x0 y0 x1 y1` property of an HOCR `title` attribute.
pub fn title_bbox(title: &str) -> Option<[u32; 4]> {
    let rest = title_property(title, "bbox")?;
    let nums = rest
        .split_whitespace()
        .map(|v| v.parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;
    match nums.as_slice() {
        [x0, y0, x1, y1] => Some([*x0, *y0, *x1, *y1]),
        _ => None,
    }
}

/// Reads the `x_wconf N` property of an HOCR `title` attribute.
pub fn title_wconf(title: &str) -> Option<f32> {
    title_property(title, "x_wconf")?
        .split_whitespace()
        .next()?
        .parse::<f32>()
        .ok()
}

fn title_property<'a>(title: &'a str, name: &str) -> Option<&'a str> {
    title.split(';').map(str::trim).find_map(|part| {
        let rest = part.strip_prefix(name)?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            Some(rest.trim())
        } else {
            None
        }
    })
}

fn decode_html_entities(value: &str) -> String {
    value
        .replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN"
    "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="en" lang="en">
 <head>
  <title></title>
  <meta http-equiv="Content-Type" content="text/html;charset=utf-8"/>
  <meta name='ocr-system' content='tesseract 5.3.0' />
 </head>
 <body>
  <div class='ocr_page' id='page_1' title='image "cover.png"; bbox 0 0 200 100; ppageno 0'>
   <div class='ocr_carea' id='block_1_1' title="bbox 5 5 140 70">
    <p class='ocr_par' id='par_1_1' lang='eng' title="bbox 5 5 140 70">
     <span class='ocr_line' id='line_1_1' title="bbox 5 5 140 70; baseline 0 0; x_size 20">
      <span class='ocrx_word' id='word_1_1' title='bbox 100 50 140 70; x_wconf 85'>EYE</span>
      <span class='ocrx_word' id='word_1_2' title='bbox 10 50 70 70; x_wconf 90'><strong>PRIVATE</strong></span>
      <span class='ocrx_word' id='word_1_3' title='bbox 5 5 15 15; x_wconf 95'>!!</span>
      <span class='ocrx_word' id='word_1_4' title='bbox 5 5 oops; x_wconf 95'>BROKEN</span>
      <span class='ocrx_word' id='word_1_5' title='bbox 20 80 60 95'>R&amp;D</span>
     </span>
    </p>
   </div>
  </div>
 </body>
</html>
"#;

    #[test]
    fn test_parse_words() {
        let page = parse_hocr(SAMPLE);
        assert_eq!(page.dimensions, Some((200, 100)));

        let texts: Vec<&str> = page.detections.iter().map(|d| d.text.as_str()).collect();
        assert_eq!(texts, vec!["EYE", "PRIVATE", "!!", "R&D"]);

        let eye = &page.detections[0];
        assert_eq!((eye.left, eye.top, eye.width, eye.height), (100, 50, 40, 20));
        assert_eq!(eye.confidence, 85.0);
        // missing x_wconf
        assert_eq!(page.detections[3].confidence, 0.0);
    }

    #[test]
    fn test_garbage_yields_nothing() {
        assert_eq!(parse_hocr("not hocr at all"), HocrPage::default());
        assert_eq!(parse_hocr(""), HocrPage::default());
        assert!(parse_hocr("<span class='ocrx_word' title='bbox 1 2").detections.is_empty());
    }

    #[test]
    fn test_truncated_document_keeps_earlier_words() {
        let cut = SAMPLE.find("word_1_3").unwrap();
        let page = parse_hocr(&SAMPLE[..cut]);
        assert_eq!(page.detections.len(), 2);
    }

    #[test]
    fn test_title_properties() {
        assert_eq!(title_bbox("bbox 1 2 3 4; x_wconf 96"), Some([1, 2, 3, 4]));
        assert_eq!(title_bbox("x_wconf 96; bbox 1 2 3"), None);
        assert_eq!(title_bbox("bbox 1 2 3 -4"), None);
        assert_eq!(title_bbox("bboxes 1 2 3 4"), None);
        assert_eq!(title_wconf("bbox 1 2 3 4; x_wconf 96"), Some(96.0));
        assert_eq!(title_wconf("bbox 1 2 3 4"), None);
    }
}
