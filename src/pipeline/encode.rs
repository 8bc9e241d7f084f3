//! Document encoding: raw PDF bytes → base64 `ImageData` attachment.
//!
//! Providers reached through `edgequake-llm` have no Files API; the document
//! travels inline in the chat request as a base64 attachment. The attachment
//! type is named for images, but the MIME type is carried through verbatim,
//! so multimodal providers that accept `application/pdf` read it as a file.

use crate::pipeline::input::Document;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Encode a document as an inline attachment for a chat request.
pub fn encode_document(document: &Document) -> ImageData {
    let b64 = STANDARD.encode(&document.bytes);
    debug!(
        "Encoded '{}' → {} bytes base64",
        document.display_name,
        b64.len()
    );

    ImageData::new(b64, document.mime_type.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_mime_and_bytes() {
        let document = Document {
            display_name: "paper.pdf".into(),
            mime_type: "application/pdf".into(),
            bytes: b"%PDF-1.7 tiny".to_vec(),
        };
        let data = encode_document(&document);
        assert_eq!(data.mime_type, "application/pdf");
        let decoded = STANDARD.decode(&data.data).expect("valid base64");
        assert_eq!(decoded, document.bytes);
    }
}
