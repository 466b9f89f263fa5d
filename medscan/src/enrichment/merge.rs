use crate::models::MedicationInfo;

/// Longest text kept from any single source field.
pub const MAX_SOURCE_TEXT_CHARS: usize = 1000;

/// Fields one external source returned for a medication name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceRecord {
    pub source: String,
    pub generic_name: Option<String>,
    pub brand_names: Vec<String>,
    pub used_for: Option<String>,
    pub side_effects: Option<String>,
    pub warnings: Option<String>,
}

impl SourceRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.generic_name.is_none()
            && self.brand_names.is_empty()
            && self.used_for.is_none()
            && self.side_effects.is_none()
            && self.warnings.is_none()
    }
}

/// Collapse whitespace and cap length. Blank input yields `None`.
pub fn source_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    let capped: String = collapsed.chars().take(MAX_SOURCE_TEXT_CHARS).collect();
    Some(capped.trim_end().to_string())
}

/// Fill-if-absent merge of one source into the record being built.
///
/// Returns whether the source filled at least one field; only then is it
/// appended to `sources`.
pub fn absorb(info: &mut MedicationInfo, record: SourceRecord) -> bool {
    let mut filled = false;

    if info.generic_name.is_none() && record.generic_name.is_some() {
        info.generic_name = record.generic_name;
        filled = true;
    }
    if info.brand_names.is_empty() && !record.brand_names.is_empty() {
        info.brand_names = record.brand_names;
        filled = true;
    }
    filled |= fill_text(&mut info.used_for, record.used_for);
    filled |= fill_text(&mut info.side_effects, record.side_effects);
    filled |= fill_text(&mut info.warnings, record.warnings);

    if filled && !info.sources.contains(&record.source) {
        info.sources.push(record.source);
    }
    info.confidence = coverage(info);

    filled
}

fn fill_text(field: &mut String, value: Option<String>) -> bool {
    match value {
        Some(value) if field.is_empty() && !value.is_empty() => {
            *field = value;
            true
        }
        _ => false,
    }
}

/// Every mergeable field has a value; further sources cannot add anything.
pub fn is_complete(info: &MedicationInfo) -> bool {
    info.generic_name.is_some()
        && !info.brand_names.is_empty()
        && !info.used_for.is_empty()
        && !info.side_effects.is_empty()
        && !info.warnings.is_empty()
}

/// Share of the informational fields (brand names, usage, side effects,
/// warnings) that hold a value.
pub fn coverage(info: &MedicationInfo) -> f32 {
    let filled = [
        !info.brand_names.is_empty(),
        !info.used_for.is_empty(),
        !info.side_effects.is_empty(),
        !info.warnings.is_empty(),
    ]
    .into_iter()
    .filter(|filled| *filled)
    .count();

    filled as f32 / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(source: &str) -> SourceRecord {
        SourceRecord::new(source)
    }

    #[test]
    fn first_source_wins_per_field() {
        let mut info = MedicationInfo::fallback("ASPIRIN");

        let mut fda = record("openfda");
        fda.used_for = Some("pain relief".to_string());
        fda.brand_names = vec!["Bayer Aspirin".to_string()];

        let mut rx = record("rxnorm");
        rx.used_for = Some("something else".to_string());
        rx.brand_names = vec!["Ecotrin".to_string()];
        rx.generic_name = Some("aspirin".to_string());

        assert!(absorb(&mut info, fda));
        assert!(absorb(&mut info, rx));

        assert_eq!(info.used_for, "pain relief");
        assert_eq!(info.brand_names, vec!["Bayer Aspirin".to_string()]);
        assert_eq!(info.generic_name.as_deref(), Some("aspirin"));
        assert_eq!(info.sources, vec!["openfda".to_string(), "rxnorm".to_string()]);
    }

    #[test]
    fn source_that_adds_nothing_is_not_credited() {
        let mut info = MedicationInfo::fallback("ASPIRIN");

        let mut fda = record("openfda");
        fda.used_for = Some("pain relief".to_string());
        absorb(&mut info, fda);

        let mut medline = record("medlineplus");
        medline.used_for = Some("also pain".to_string());
        assert!(!absorb(&mut info, medline));

        assert_eq!(info.sources, vec!["openfda".to_string()]);
    }

    #[test]
    fn name_is_never_replaced() {
        let mut info = MedicationInfo::fallback("ASPIRIN");
        let mut fda = record("openfda");
        fda.generic_name = Some("aspirin".to_string());
        absorb(&mut info, fda);
        assert_eq!(info.name, "ASPIRIN");
    }

    #[test]
    fn confidence_tracks_informational_coverage() {
        let mut info = MedicationInfo::fallback("ASPIRIN");
        assert_eq!(coverage(&info), 0.0);

        let mut fda = record("openfda");
        fda.used_for = Some("pain".to_string());
        fda.warnings = Some("Reye's syndrome".to_string());
        absorb(&mut info, fda);

        assert_eq!(info.confidence, 0.5);
    }

    #[test]
    fn complete_requires_every_field() {
        let mut info = MedicationInfo::fallback("ASPIRIN");
        let full = SourceRecord {
            source: "openfda".to_string(),
            generic_name: Some("aspirin".to_string()),
            brand_names: vec!["Bayer".to_string()],
            used_for: Some("pain".to_string()),
            side_effects: Some("nausea".to_string()),
            warnings: Some("bleeding".to_string()),
        };
        absorb(&mut info, full);
        assert!(is_complete(&info));
        assert_eq!(info.confidence, 1.0);
    }

    #[test]
    fn source_text_collapses_and_caps() {
        assert_eq!(source_text("  a \n\n b  "), Some("a b".to_string()));
        assert_eq!(source_text(" \n "), None);

        let long = "word ".repeat(400);
        let capped = source_text(&long).unwrap();
        assert!(capped.chars().count() <= MAX_SOURCE_TEXT_CHARS);
        assert!(!capped.ends_with(' '));
    }

    #[test]
    fn empty_record_detection() {
        assert!(record("rxnorm").is_empty());
        let mut rx = record("rxnorm");
        rx.brand_names.push("Tylenol".to_string());
        assert!(!rx.is_empty());
    }
}
