//! Document payload: the plaintext inside a single-document container.
//!
//! A UTF-8 JSON array of segments:
//! ```json
//! [{"type": "text", "content": "..."},
//!  {"type": "image", "data": "<base64 PNG>", "width": 320, "height": 200}]
//! ```
//! Containers treat this as opaque bytes; only the editor side interprets it.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{SafepadError, SafepadResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Segment {
    Text {
        content: String,
    },
    Image {
        /// Base64-encoded PNG
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        height: Option<f64>,
    },
    /// Segment kinds this build does not know; dropped on re-save
    #[serde(other)]
    Unknown,
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text {
            content: content.into(),
        }
    }

    pub fn image(png: &[u8], width: f64, height: f64) -> Self {
        Segment::Image {
            data: STANDARD.encode(png),
            width: Some(width),
            height: Some(height),
        }
    }

    /// Decoded image bytes, `None` for non-image segments.
    pub fn image_bytes(&self) -> Option<SafepadResult<Vec<u8>>> {
        match self {
            Segment::Image { data, .. } => Some(
                STANDARD
                    .decode(data)
                    .map_err(|e| SafepadError::Payload(format!("invalid image data: {e}"))),
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(pub Vec<Segment>);

impl Document {
    pub fn from_text(text: impl Into<String>) -> Self {
        Document(vec![Segment::text(text)])
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    /// Serialize as a UTF-8 JSON array.
    pub fn to_bytes(&self) -> SafepadResult<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| SafepadError::Payload(format!("serializing document: {e}")))
    }

    /// Parse a payload. Anything that is not a segment array is taken as
    /// plain text (lossy UTF-8), matching files written by older editors.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match serde_json::from_slice::<Document>(bytes) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::debug!(error = %e, "payload is not a segment array, reading as text");
                Document::from_text(String::from_utf8_lossy(bytes))
            }
        }
    }

    /// Payload to seal for a file's contents. A non-empty segment array is
    /// kept byte-for-byte, unknown segment kinds included; anything else
    /// (plain text, other JSON, a bare `[]`) becomes one text segment.
    pub fn payload_for(input: &[u8]) -> SafepadResult<Vec<u8>> {
        match serde_json::from_slice::<Document>(input) {
            Ok(doc) if !doc.0.is_empty() => Ok(input.to_vec()),
            _ => Document::from_text(String::from_utf8_lossy(input)).to_bytes(),
        }
    }

    /// Text rendering with images shown as `[image WxH]`.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            match segment {
                Segment::Text { content } => out.push_str(content),
                Segment::Image { width, height, .. } => {
                    match (width, height) {
                        (Some(w), Some(h)) => out.push_str(&format!("[image {w:.0}x{h:.0}]")),
                        _ => out.push_str("[image]"),
                    }
                }
                Segment::Unknown => {}
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_editor_payload() {
        let json = br#"[{"type":"text","content":"Dear diary\n"},
            {"type":"image","data":"iVBORw0KGgo=","width":320.0,"height":200},
            {"type":"text","content":"the end"}]"#;

        let doc = Document::from_bytes(json);

        assert_eq!(doc.segments().len(), 3);
        assert_eq!(doc.plain_text(), "Dear diary\n[image 320x200]the end");
        let png = doc.segments()[1].image_bytes().unwrap().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }

    #[test]
    fn test_non_json_falls_back_to_text() {
        let doc = Document::from_bytes(b"just some notes");
        assert_eq!(doc, Document::from_text("just some notes"));
    }

    #[test]
    fn test_json_object_falls_back_to_text() {
        let doc = Document::from_bytes(br#"{"type":"text"}"#);
        assert_eq!(doc.plain_text(), r#"{"type":"text"}"#);
    }

    #[test]
    fn test_invalid_utf8_is_lossy() {
        let doc = Document::from_bytes(&[b'a', 0xFF, b'b']);
        assert_eq!(doc.plain_text(), "a\u{FFFD}b");
    }

    #[test]
    fn test_unknown_segment_kind_ignored() {
        let doc = Document::from_bytes(br#"[{"type":"table","rows":2},{"type":"text","content":"x"}]"#);
        assert_eq!(doc.segments()[0], Segment::Unknown);
        assert_eq!(doc.plain_text(), "x");
    }

    #[test]
    fn test_to_bytes_shape() {
        let doc = Document(vec![Segment::text("hi"), Segment::image(b"png", 10.0, 20.0)]);
        let json: serde_json::Value = serde_json::from_slice(&doc.to_bytes().unwrap()).unwrap();

        assert_eq!(json[0]["type"], "text");
        assert_eq!(json[0]["content"], "hi");
        assert_eq!(json[1]["type"], "image");
        assert_eq!(json[1]["data"], "cG5n");
        assert_eq!(Document::from_bytes(&doc.to_bytes().unwrap()), doc);
    }

    #[test]
    fn test_payload_keeps_segment_array_verbatim() {
        let input = br#"[{"type":"table","rows":2}, {"type":"text","content":"x"}]"#;
        assert_eq!(Document::payload_for(input).unwrap(), input.to_vec());
    }

    #[test]
    fn test_payload_wraps_text() {
        let payload = Document::payload_for(b"[]").unwrap();
        assert_eq!(Document::from_bytes(&payload), Document::from_text("[]"));

        let payload = Document::payload_for(b"shopping list").unwrap();
        assert_eq!(Document::from_bytes(&payload).plain_text(), "shopping list");
    }

    #[test]
    fn test_bad_image_data() {
        let segment = Segment::Image {
            data: "!!not base64!!".into(),
            width: None,
            height: None,
        };
        assert!(matches!(segment.image_bytes(), Some(Err(SafepadError::Payload(_)))));
        assert!(Segment::text("x").image_bytes().is_none());
    }
}
