use serde::{Deserialize, Serialize};

/// Usage/warning text printed on the label itself, keyed by marker phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelContext {
    pub uses: Option<String>,
    pub warnings: Option<String>,
    pub side_effects: Option<String>,
}

impl LabelContext {
    pub fn is_empty(&self) -> bool {
        self.uses.is_none() && self.warnings.is_none() && self.side_effects.is_none()
    }
}

/// Lower-cased, trimmed name with inner whitespace collapsed. Used as the
/// enrichment cache key and for de-duplicating candidates.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A medication mention detected in normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MedicationCandidate {
    /// Name as it appeared in the normalized text.
    pub raw_name: String,
    /// Display name after stripping instruction words.
    pub corrected_name: String,
    /// Strength token such as `500mg`; empty when none was found.
    pub dosage: String,
    /// The line the candidate was found on.
    pub span: String,
    pub context: LabelContext,
}

impl MedicationCandidate {
    pub fn key(&self) -> String {
        normalize_name(&self.corrected_name)
    }
}

/// Enriched record for one candidate. This is what the enrichment cache stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationInfo {
    pub name: String,
    pub generic_name: Option<String>,
    pub brand_names: Vec<String>,
    pub used_for: String,
    pub side_effects: String,
    pub warnings: String,
    pub sources: Vec<String>,
    /// Share of informational fields that a source filled, 0.0–1.0.
    pub confidence: f32,
}

impl MedicationInfo {
    /// The "unknown but named" record returned when no source answers.
    pub fn fallback(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generic_name: None,
            brand_names: Vec::new(),
            used_for: String::new(),
            side_effects: String::new(),
            warnings: String::new(),
            sources: Vec::new(),
            confidence: 0.0,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.sources.is_empty()
    }

    /// Fill empty informational fields from the label's own text.
    /// Sources are left untouched: label text is not an external source.
    pub fn fill_from_label(&mut self, context: &LabelContext) {
        fill_if_empty(&mut self.used_for, context.uses.as_deref());
        fill_if_empty(&mut self.side_effects, context.side_effects.as_deref());
        fill_if_empty(&mut self.warnings, context.warnings.as_deref());
    }
}

fn fill_if_empty(field: &mut String, value: Option<&str>) {
    if field.is_empty() {
        if let Some(value) = value {
            field.push_str(value);
        }
    }
}

/// One medication as returned on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicationEntry {
    pub name: String,
    pub dosage: String,
    pub generic_name: Option<String>,
    pub brand_names: Vec<String>,
    pub used_for: String,
    pub side_effects: String,
    pub warnings: String,
    pub confidence: f32,
    pub sources: Vec<String>,
}

impl MedicationEntry {
    pub fn new(candidate: &MedicationCandidate, info: MedicationInfo) -> Self {
        Self {
            name: info.name,
            dosage: candidate.dosage.clone(),
            generic_name: info.generic_name,
            brand_names: info.brand_names,
            used_for: info.used_for,
            side_effects: info.side_effects,
            warnings: info.warnings,
            confidence: info.confidence,
            sources: info.sources,
        }
    }
}
