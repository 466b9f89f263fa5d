use crate::models::{
    AggregatedText, MedicationCandidate, MedicationEntry, MedicationInfo, ScanMetadata,
    ScanRequest, ScanResponse,
};

/// Tag reported in `metadata.textFormatting`.
pub const TEXT_FORMATTING: &str = "normalized";

/// Shapes pipeline output into the wire payload. No decisions are made here.
pub struct ResponseAssembler;

impl ResponseAssembler {
    /// `candidates` and `infos` are parallel, in extraction order.
    pub fn assemble(
        request: &ScanRequest,
        aggregated: &AggregatedText,
        extracted_text: String,
        candidates: &[MedicationCandidate],
        infos: Vec<MedicationInfo>,
    ) -> ScanResponse {
        let medications = candidates
            .iter()
            .zip(infos)
            .map(|(candidate, info)| MedicationEntry::new(candidate, info))
            .collect();

        ScanResponse {
            success: true,
            extracted_text,
            medications,
            processing_time: request.started.elapsed().as_millis() as u64,
            metadata: ScanMetadata {
                filename: request.filename.clone(),
                file_size: request.size,
                upload_time: request.uploaded_at,
                ocr_variants_used: aggregated.variants_used,
                ocr_confidence: aggregated.confidence,
                text_formatting: TEXT_FORMATTING.to_string(),
                request_id: request.id,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LabelContext, Recipe};
    use axum::body::Bytes;

    fn aggregated() -> AggregatedText {
        AggregatedText {
            text: "ASPIRIN 81mg".to_string(),
            variant_id: 2,
            recipe: Recipe::Sharpened,
            confidence: 91.0,
            mean_confidence: 70.0,
            variants_used: 5,
        }
    }

    fn candidate(name: &str, dosage: &str) -> MedicationCandidate {
        MedicationCandidate {
            raw_name: name.to_string(),
            corrected_name: name.to_string(),
            dosage: dosage.to_string(),
            span: format!("{name} {dosage}"),
            context: LabelContext::default(),
        }
    }

    #[test]
    fn assembles_success_payload_with_metadata() {
        let request = ScanRequest::new(Bytes::from_static(b"fake"), "image/png", "label.png");
        let candidates = vec![candidate("ASPIRIN", "81mg")];
        let infos = vec![MedicationInfo::fallback("ASPIRIN")];

        let response = ResponseAssembler::assemble(
            &request,
            &aggregated(),
            "ASPIRIN 81mg".to_string(),
            &candidates,
            infos,
        );

        assert!(response.success);
        assert_eq!(response.extracted_text, "ASPIRIN 81mg");
        assert_eq!(response.medications.len(), 1);
        assert_eq!(response.medications[0].dosage, "81mg");
        assert_eq!(response.metadata.filename, "label.png");
        assert_eq!(response.metadata.file_size, 4);
        assert_eq!(response.metadata.ocr_variants_used, 5);
        assert_eq!(response.metadata.text_formatting, TEXT_FORMATTING);
        assert_eq!(response.metadata.request_id, request.id);
    }

    #[test]
    fn zero_medications_is_still_success() {
        let request = ScanRequest::new(Bytes::from_static(b"fake"), "image/png", "blank.png");
        let response =
            ResponseAssembler::assemble(&request, &aggregated(), String::new(), &[], Vec::new());

        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["success"], true);
        assert_eq!(json["extractedText"], "");
        assert!(json["medications"].as_array().expect("array").is_empty());
        assert!(json["processingTime"].as_u64().is_some());
        assert_eq!(json["metadata"]["ocrVariantsUsed"], 5);
        assert_eq!(json["metadata"]["textFormatting"], "normalized");
    }
}
