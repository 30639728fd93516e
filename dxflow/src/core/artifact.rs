//! Artifacts passed from one pipeline stage to the next.
//!
//! Each artifact is produced once per run and moved into the stage that
//! consumes it. Payloads whose shape is owned by the remote services
//! (disease lists, code mappings, notes) are kept as opaque JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// MIME type accepted for uploaded documents.
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

const PDF_MAGIC: &[u8] = b"%PDF";

/// A binary document selected for processing.
///
/// Cloning is cheap; the content is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    name: String,
    content_type: String,
    bytes: Arc<[u8]>,
}

impl DocumentFile {
    /// Creates a document from raw bytes.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// Creates a PDF document.
    #[must_use]
    pub fn pdf(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, PDF_CONTENT_TYPE, bytes)
    }

    /// Reads a document from disk.
    ///
    /// The content type is `application/pdf` when the extension or the
    /// leading bytes say so, `application/octet-stream` otherwise.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| "document".to_string(), |n| n.to_string_lossy().into_owned());

        let has_pdf_extension = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        let content_type = if has_pdf_extension || bytes.starts_with(PDF_MAGIC) {
            PDF_CONTENT_TYPE
        } else {
            "application/octet-stream"
        };

        Ok(Self::new(name, content_type, bytes))
    }

    /// The file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared MIME type.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The raw content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the document has no content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns true if the document is a PDF, by MIME type or magic bytes.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.content_type.eq_ignore_ascii_case(PDF_CONTENT_TYPE) || self.bytes.starts_with(PDF_MAGIC)
    }
}

/// Local handle to the document as accepted by the upload service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    locator: String,
    bytes: Arc<[u8]>,
}

impl DocumentHandle {
    /// Creates a handle from the retrieval locator and the fetched bytes.
    #[must_use]
    pub fn new(locator: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            locator: locator.into(),
            bytes: Arc::from(bytes.into()),
        }
    }

    /// The locator the bytes were fetched from.
    #[must_use]
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// The fetched content.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if nothing was fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the fetched content to `path`.
    pub async fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        tokio::fs::write(path, &self.bytes).await
    }
}

macro_rules! opaque_artifact {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub serde_json::Value);

        impl $name {
            /// Returns the underlying JSON payload.
            #[must_use]
            pub fn as_json(&self) -> &serde_json::Value {
                &self.0
            }

            /// Consumes the artifact, returning its JSON payload.
            #[must_use]
            pub fn into_json(self) -> serde_json::Value {
                self.0
            }
        }

        impl From<serde_json::Value> for $name {
            fn from(value: serde_json::Value) -> Self {
                Self(value)
            }
        }
    };
}

opaque_artifact!(
    /// One OCR'd page, exactly as the OCR backend returned it.
    OcrPage
);

/// Output of the OCR stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Full document text.
    pub file_content: String,
    /// Per-page output, forwarded untouched to note assembly.
    #[serde(default)]
    pub pages: Vec<OcrPage>,
}

/// Output of the PII redaction stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedText {
    /// Document text with identifying information removed.
    pub file_content: String,
}

opaque_artifact!(
    /// Diseases found in the redacted text.
    DiseaseList
);
opaque_artifact!(
    /// Diseases mapped to ICD codes, possibly incomplete.
    IcdMapping
);
opaque_artifact!(
    /// ICD mapping with incomplete codes filled in.
    FilledIcdMapping
);
opaque_artifact!(
    /// ICD codes mapped to HCC risk categories.
    HccMapping
);
opaque_artifact!(
    /// Paginated medical notes, the final pipeline product.
    MedicalNotes
);

/// Input of the note assembly stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaginateInput {
    /// Pages from the original OCR result.
    pub pages: Vec<OcrPage>,
    /// Output of the risk mapping stage.
    pub risk_mapping: HccMapping,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_document_is_pdf() {
        assert!(DocumentFile::pdf("a.pdf", b"anything".to_vec()).is_pdf());
        assert!(DocumentFile::new("a.bin", "application/octet-stream", b"%PDF-1.7".to_vec()).is_pdf());
        assert!(!DocumentFile::new("a.txt", "text/plain", b"hello".to_vec()).is_pdf());
    }

    #[test]
    fn test_document_clone_shares_bytes() {
        let doc = DocumentFile::pdf("a.pdf", vec![1, 2, 3]);
        let copy = doc.clone();
        assert_eq!(doc.bytes().as_ptr(), copy.bytes().as_ptr());
        assert_eq!(copy.len(), 3);
    }

    #[tokio::test]
    async fn test_document_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.PDF");
        tokio::fs::write(&path, b"not really a pdf").await.unwrap();

        let doc = DocumentFile::from_path(&path).await.unwrap();
        assert_eq!(doc.name(), "scan.PDF");
        assert_eq!(doc.content_type(), PDF_CONTENT_TYPE);

        let other = dir.path().join("notes.txt");
        tokio::fs::write(&other, b"plain").await.unwrap();
        let doc = DocumentFile::from_path(&other).await.unwrap();
        assert!(!doc.is_pdf());
    }

    #[tokio::test]
    async fn test_document_handle_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        let handle = DocumentHandle::new("https://files.example/doc.pdf", b"%PDF-1.4".to_vec());

        handle.save(&path).await.unwrap();
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4".to_vec());
        assert_eq!(handle.locator(), "https://files.example/doc.pdf");
    }

    #[test]
    fn test_ocr_pages_keep_backend_shape() {
        let pages = serde_json::json!([
            {"page": 1, "text": "Patient has", "confidence": 0.98},
            {"text": "no page number here"},
            "plain string page"
        ]);
        let body = serde_json::json!({
            "file_content": "Patient has diabetes.",
            "pages": pages.clone()
        });

        let ocr: OcrResult = serde_json::from_value(body).unwrap();
        assert_eq!(ocr.pages.len(), 3);
        assert_eq!(serde_json::to_value(&ocr.pages).unwrap(), pages);
        assert_eq!(ocr.pages[2].as_json(), "plain string page");
    }

    #[test]
    fn test_ocr_result_without_pages() {
        let ocr: OcrResult =
            serde_json::from_value(serde_json::json!({"file_content": "x"})).unwrap();
        assert!(ocr.pages.is_empty());
    }

    #[test]
    fn test_opaque_artifact_is_transparent() {
        let mapping = HccMapping::from(serde_json::json!({"E11.9": "HCC 37"}));
        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(json, r#"{"E11.9":"HCC 37"}"#);
        assert_eq!(mapping.as_json()["E11.9"], "HCC 37");
    }
}
