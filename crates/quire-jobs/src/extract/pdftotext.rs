//! PDF layout source backed by `pdftotext -bbox-layout` (poppler-utils).

use std::io::Write;
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tempfile::NamedTempFile;
use tokio::process::Command;

use quire_core::defaults::EXTRACTION_CMD_TIMEOUT_SECS;
use quire_core::{BoundingBox, Error, PageLayout, PdfTextSource, Result, TextBlock};

/// Layout source that shells out to poppler's `pdftotext`.
///
/// `-bbox-layout` groups words into lines and blocks and reports the
/// bounding rectangle of each in page points, which maps directly onto the
/// chunk geometry. Each invocation is guarded by a per-command timeout so a
/// wedged child process cannot stall a batch run indefinitely.
pub struct PdftotextSource;

impl PdftotextSource {
    /// Create a new pdftotext-backed source.
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdftotextSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a command with a timeout, returning stdout as a string.
async fn run_cmd_with_timeout(cmd: &mut Command, timeout_secs: u64) -> Result<String> {
    let output = tokio::time::timeout(std::time::Duration::from_secs(timeout_secs), cmd.output())
        .await
        .map_err(|_| {
            Error::Extraction(format!("External command timed out after {}s", timeout_secs))
        })?
        .map_err(|e| Error::Extraction(format!("Failed to execute command: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Extraction(format!(
            "Command failed (exit {}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn page_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<page width="([\d.]+)" height="([\d.]+)""#).expect("static page pattern")
    })
}

fn block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"<block xMin="(-?[\d.]+)" yMin="(-?[\d.]+)" xMax="(-?[\d.]+)" yMax="(-?[\d.]+)""#,
        )
        .expect("static block pattern")
    })
}

fn word_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<word[^>]*>(.*?)</word>").expect("static word pattern"))
}

/// Undo the XML escaping pdftotext applies to word text.
fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Parse `pdftotext -bbox-layout` output into page layouts.
///
/// The output is line-regular XML; a line scan with anchored patterns is
/// enough, the same way `pdfinfo` output is parsed by key-value splitting.
pub(crate) fn parse_bbox_layout(output: &str) -> Result<Vec<PageLayout>> {
    let mut pages: Vec<PageLayout> = Vec::new();
    let mut current_block: Option<(BoundingBox, Vec<String>)> = None;

    for line in output.lines() {
        if let Some(caps) = page_regex().captures(line) {
            let width: f64 = caps[1].parse().unwrap_or(0.0);
            let height: f64 = caps[2].parse().unwrap_or(0.0);
            pages.push(PageLayout {
                page: pages.len() as i32,
                width,
                height,
                blocks: Vec::new(),
            });
            continue;
        }

        if let Some(caps) = block_regex().captures(line) {
            let x_min: f64 = caps[1].parse().unwrap_or(0.0);
            let y_min: f64 = caps[2].parse().unwrap_or(0.0);
            let x_max: f64 = caps[3].parse().unwrap_or(0.0);
            let y_max: f64 = caps[4].parse().unwrap_or(0.0);
            current_block = Some((
                BoundingBox {
                    x: x_min,
                    y: y_min,
                    width: x_max - x_min,
                    height: y_max - y_min,
                },
                Vec::new(),
            ));
            continue;
        }

        if let Some((_, ref mut words)) = current_block {
            for caps in word_regex().captures_iter(line) {
                words.push(unescape(&caps[1]));
            }
        }

        if line.contains("</block>") {
            if let Some((bbox, words)) = current_block.take() {
                let text = words.join(" ");
                if let Some(page) = pages.last_mut() {
                    page.blocks.push(TextBlock { bbox, text });
                }
            }
        }
    }

    if pages.is_empty() {
        return Err(Error::Extraction(
            "Unrecognized pdftotext output: no pages found".to_string(),
        ));
    }

    Ok(pages)
}

#[async_trait]
impl PdfTextSource for PdftotextSource {
    async fn extract_pages(&self, data: &[u8]) -> Result<Vec<PageLayout>> {
        if data.is_empty() {
            return Err(Error::Extraction(
                "Cannot extract text from empty PDF data".to_string(),
            ));
        }

        // Validate PDF magic bytes (%PDF)
        if data.len() < 4 || &data[0..4] != b"%PDF" {
            return Err(Error::Extraction(
                "Not a valid PDF (missing %PDF header)".to_string(),
            ));
        }

        // pdftotext reads from a file path, not stdin
        let mut tmpfile = NamedTempFile::new()
            .map_err(|e| Error::Extraction(format!("Failed to create temp file: {}", e)))?;
        tmpfile
            .write_all(data)
            .map_err(|e| Error::Extraction(format!("Failed to write temp file: {}", e)))?;
        let tmp_path = tmpfile.path().to_string_lossy().to_string();

        let output = run_cmd_with_timeout(
            Command::new("pdftotext")
                .arg("-bbox-layout")
                .arg(&tmp_path)
                .arg("-"),
            EXTRACTION_CMD_TIMEOUT_SECS,
        )
        .await?;

        parse_bbox_layout(&output)
    }

    async fn health_check(&self) -> Result<bool> {
        match Command::new("pdftotext").arg("-v").output().await {
            Ok(output) => {
                // pdftotext -v prints version to stderr and exits with 0 or 99
                // depending on the version. Both indicate the binary exists.
                Ok(output.status.success() || output.status.code() == Some(99))
            }
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "pdftotext"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_OUTPUT: &str = r#"<?xml version="1.0"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Strict//EN">
<html xmlns="http://www.w3.org/1999/xhtml">
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <flow>
      <block xMin="72.000000" yMin="80.500000" xMax="540.000000" yMax="95.200000">
        <line xMin="72.000000" yMin="80.500000" xMax="540.000000" yMax="95.200000">
          <word xMin="72.000000" yMin="80.500000" xMax="120.000000" yMax="95.200000">Sparse</word>
          <word xMin="125.000000" yMin="80.500000" xMax="200.000000" yMax="95.200000">attention</word>
          <word xMin="205.000000" yMin="80.500000" xMax="260.000000" yMax="95.200000">&amp;</word>
          <word xMin="265.000000" yMin="80.500000" xMax="330.000000" yMax="95.200000">memory</word>
        </line>
      </block>
      <block xMin="72.000000" yMin="120.000000" xMax="300.000000" yMax="132.000000">
        <line xMin="72.000000" yMin="120.000000" xMax="300.000000" yMax="132.000000">
          <word xMin="72.000000" yMin="120.000000" xMax="300.000000" yMax="132.000000">Introduction</word>
        </line>
      </block>
    </flow>
  </page>
  <page width="612.000000" height="792.000000">
    <flow>
      <block xMin="36.000000" yMin="40.000000" xMax="200.000000" yMax="52.000000">
        <line xMin="36.000000" yMin="40.000000" xMax="200.000000" yMax="52.000000">
          <word xMin="36.000000" yMin="40.000000" xMax="200.000000" yMax="52.000000">Second</word>
          <word xMin="36.000000" yMin="40.000000" xMax="200.000000" yMax="52.000000">page</word>
        </line>
      </block>
    </flow>
  </page>
</doc>
</body>
</html>
"#;

    #[test]
    fn test_parse_bbox_layout_pages_and_blocks() {
        let pages = parse_bbox_layout(SAMPLE_OUTPUT).expect("parse");
        assert_eq!(pages.len(), 2);

        assert_eq!(pages[0].page, 0);
        assert!((pages[0].width - 612.0).abs() < f64::EPSILON);
        assert_eq!(pages[0].blocks.len(), 2);
        assert_eq!(pages[0].blocks[0].text, "Sparse attention & memory");
        assert_eq!(pages[0].blocks[1].text, "Introduction");

        assert_eq!(pages[1].page, 1);
        assert_eq!(pages[1].blocks.len(), 1);
        assert_eq!(pages[1].blocks[0].text, "Second page");
    }

    #[test]
    fn test_parse_bbox_layout_block_geometry() {
        let pages = parse_bbox_layout(SAMPLE_OUTPUT).expect("parse");
        let bbox = pages[0].blocks[0].bbox;
        assert!((bbox.x - 72.0).abs() < 1e-9);
        assert!((bbox.y - 80.5).abs() < 1e-9);
        assert!((bbox.width - 468.0).abs() < 1e-9);
        assert!((bbox.height - 14.7).abs() < 1e-9);
    }

    #[test]
    fn test_parse_bbox_layout_is_deterministic() {
        let a = parse_bbox_layout(SAMPLE_OUTPUT).expect("parse");
        let b = parse_bbox_layout(SAMPLE_OUTPUT).expect("parse");
        assert_eq!(a, b);
    }

    #[test]
    fn test_parse_bbox_layout_rejects_garbage() {
        assert!(parse_bbox_layout("not xml at all").is_err());
        assert!(parse_bbox_layout("").is_err());
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape("a &amp; b"), "a & b");
        assert_eq!(unescape("&lt;tag&gt;"), "<tag>");
        assert_eq!(unescape("it&apos;s &quot;fine&quot;"), "it's \"fine\"");
    }

    #[tokio::test]
    async fn test_empty_input_fails() {
        let source = PdftotextSource::new();
        let err = source.extract_pages(b"").await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }

    #[tokio::test]
    async fn test_invalid_magic_fails() {
        let source = PdftotextSource::new();
        let err = source.extract_pages(b"not a pdf at all").await.unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
        assert!(err.to_string().contains("%PDF"));
    }

    #[tokio::test]
    async fn test_health_check_does_not_error() {
        let source = PdftotextSource::new();
        // Passes whether or not poppler is installed
        let result = source.health_check().await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_extraction_against_real_binary() {
        // Minimal valid PDF containing the text "Hello World"
        let pdf_bytes: &[u8] = b"%PDF-1.0
1 0 obj
<< /Type /Catalog /Pages 2 0 R >>
endobj

2 0 obj
<< /Type /Pages /Kids [3 0 R] /Count 1 >>
endobj

3 0 obj
<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792]
   /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >>
endobj

4 0 obj
<< /Length 44 >>
stream
BT /F1 12 Tf 100 700 Td (Hello World) Tj ET
endstream
endobj

5 0 obj
<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>
endobj

xref
0 6
0000000000 65535 f
0000000009 00000 n
0000000058 00000 n
0000000115 00000 n
0000000266 00000 n
0000000360 00000 n

trailer
<< /Size 6 /Root 1 0 R >>
startxref
434
%%EOF";

        let source = PdftotextSource::new();
        if !source.health_check().await.unwrap_or(false) {
            eprintln!("Skipping test_extraction_against_real_binary: pdftotext not installed");
            return;
        }

        let pages = source.extract_pages(pdf_bytes).await.expect("extract");
        assert_eq!(pages.len(), 1);
        let all_text: String = pages[0]
            .blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        assert!(
            all_text.contains("Hello World"),
            "expected 'Hello World' in: {all_text}"
        );
    }
}
