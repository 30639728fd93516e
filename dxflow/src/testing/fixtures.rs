//! Fixture values returned by [`StubStageClient`](super::StubStageClient).

use crate::core::{
    DiseaseList, DocumentFile, FilledIcdMapping, HccMapping, IcdMapping, MedicalNotes, OcrPage,
    OcrResult, RedactedText,
};

/// Locator returned by the stub upload.
pub const DOWNLOAD_URL: &str = "https://files.example.test/uploads/discharge-summary.pdf";

/// A small PDF-looking document.
#[must_use]
pub fn sample_document() -> DocumentFile {
    DocumentFile::pdf(
        "discharge-summary.pdf",
        b"%PDF-1.4\n% discharge summary\n%%EOF".to_vec(),
    )
}

/// Two-page OCR result.
#[must_use]
pub fn ocr_result() -> OcrResult {
    OcrResult {
        file_content: "John Doe, DOB 01/02/1950. Type 2 diabetes. Chronic kidney disease stage 3."
            .to_string(),
        pages: vec![
            OcrPage(serde_json::json!({
                "page": 1,
                "text": "John Doe, DOB 01/02/1950. Type 2 diabetes.",
                "confidence": 0.97
            })),
            OcrPage(serde_json::json!({
                "page": 2,
                "text": "Chronic kidney disease stage 3."
            })),
        ],
    }
}

/// OCR text with the patient identifiers removed.
#[must_use]
pub fn redacted_text() -> RedactedText {
    RedactedText {
        file_content: "[NAME], DOB [DATE]. Type 2 diabetes. Chronic kidney disease stage 3."
            .to_string(),
    }
}

/// Diseases found in [`redacted_text`].
#[must_use]
pub fn disease_list() -> DiseaseList {
    DiseaseList(serde_json::json!({
        "diseases": ["Type 2 diabetes", "Chronic kidney disease stage 3"]
    }))
}

/// ICD mapping with one incomplete code.
#[must_use]
pub fn icd_mapping() -> IcdMapping {
    IcdMapping(serde_json::json!({
        "Type 2 diabetes": "E11",
        "Chronic kidney disease stage 3": "N18.3"
    }))
}

/// ICD mapping with every code completed.
#[must_use]
pub fn filled_icd_mapping() -> FilledIcdMapping {
    FilledIcdMapping(serde_json::json!({
        "Type 2 diabetes": "E11.9",
        "Chronic kidney disease stage 3": "N18.30"
    }))
}

/// HCC categories for [`filled_icd_mapping`].
#[must_use]
pub fn hcc_mapping() -> HccMapping {
    HccMapping(serde_json::json!({
        "E11.9": "HCC 38",
        "N18.30": "HCC 328"
    }))
}

/// Final paginated notes.
#[must_use]
pub fn medical_notes() -> MedicalNotes {
    MedicalNotes(serde_json::json!({
        "pages": [
            {"page_number": 1, "codes": [{"icd": "E11.9", "hcc": "HCC 38"}]},
            {"page_number": 2, "codes": [{"icd": "N18.30", "hcc": "HCC 328"}]}
        ]
    }))
}
