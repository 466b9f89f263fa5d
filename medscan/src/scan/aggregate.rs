use std::cmp::Ordering;

use crate::models::{AggregatedText, RecognitionResult};

/// Pick the reading that drives extraction.
///
/// Highest confidence wins; ties go to the reading with more non-whitespace
/// characters, then to the earlier variant. `variants_used` counts every
/// successful reading, not just the chosen one. Returns `None` when no
/// variant produced a result.
pub fn select_best(results: &[RecognitionResult]) -> Option<AggregatedText> {
    let best = results.iter().max_by(|a, b| rank(a, b))?;

    let mean_confidence =
        results.iter().map(|r| r.confidence).sum::<f32>() / results.len() as f32;

    Some(AggregatedText {
        text: best.text.clone(),
        variant_id: best.variant_id,
        recipe: best.recipe,
        confidence: best.confidence,
        mean_confidence,
        variants_used: results.len(),
    })
}

fn rank(a: &RecognitionResult, b: &RecognitionResult) -> Ordering {
    a.confidence
        .total_cmp(&b.confidence)
        .then_with(|| a.non_whitespace_len().cmp(&b.non_whitespace_len()))
        .then_with(|| b.variant_id.cmp(&a.variant_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recipe;

    fn reading(variant_id: usize, text: &str, confidence: f32) -> RecognitionResult {
        RecognitionResult {
            variant_id,
            recipe: Recipe::Grayscale,
            text: text.to_string(),
            confidence,
        }
    }

    #[test]
    fn empty_input_selects_nothing() {
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn highest_confidence_wins() {
        let results = vec![
            reading(0, "PARACETAMOL 500mg tablets", 61.0),
            reading(1, "PARACETAM0L", 88.0),
            reading(2, "P4R4", 12.0),
        ];

        let aggregated = select_best(&results).unwrap();
        assert_eq!(aggregated.text, "PARACETAM0L");
        assert_eq!(aggregated.variant_id, 1);
        assert_eq!(aggregated.confidence, 88.0);
        assert_eq!(aggregated.variants_used, 3);
    }

    #[test]
    fn tie_prefers_longer_legible_reading() {
        let results = vec![
            reading(0, "ASPIRIN", 75.0),
            reading(1, "ASPIRIN   81mg", 75.0),
            reading(2, "ASPIRIN 81 mg", 75.0),
        ];

        let aggregated = select_best(&results).unwrap();
        assert_eq!(aggregated.variant_id, 1);
    }

    #[test]
    fn full_tie_prefers_earlier_variant() {
        let results = vec![reading(3, "abc", 50.0), reading(1, "xyz", 50.0)];
        assert_eq!(select_best(&results).unwrap().variant_id, 1);
    }

    #[test]
    fn mean_confidence_covers_all_variants() {
        let results = vec![reading(0, "a", 40.0), reading(1, "b", 80.0)];
        let aggregated = select_best(&results).unwrap();
        assert_eq!(aggregated.mean_confidence, 60.0);
    }

    #[test]
    fn empty_text_still_counts_as_used_variant() {
        let results = vec![reading(0, "", 0.0)];
        let aggregated = select_best(&results).unwrap();
        assert_eq!(aggregated.variants_used, 1);
        assert!(aggregated.text.is_empty());
    }
}
