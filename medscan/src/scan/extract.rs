//! Pattern rules that turn normalized label text into medication candidates.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::{normalize_name, LabelContext, MedicationCandidate};

/// A capitalized run of one to four words followed by a strength.
static RE_NAME_STRENGTH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?P<name>[A-Z][A-Za-z0-9-]*(?:\s+[A-Z][A-Za-z0-9-]*){0,3})\s+(?P<dose>\d+(?:[.,]\d+)?\s?(?i:mg|mcg|µg|g|ml|iu|units?))\b",
    )
    .expect("valid strength regex")
});

static RE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    let mut alternatives: Vec<String> = MARKERS
        .iter()
        .flat_map(|(phrase, _)| marker_forms(phrase))
        .map(|form| regex::escape(&form))
        .collect();
    alternatives.sort_by_key(|alt| std::cmp::Reverse(alt.len()));
    alternatives.dedup();
    Regex::new(&format!(r"\b(?:{})\b:?", alternatives.join("|"))).expect("valid marker regex")
});

/// Words that precede a name on labels but are not part of it.
const LEADING_STOPWORDS: &[&str] = &[
    "active", "adults", "caplet", "caplets", "capsule", "capsules", "children", "contains",
    "daily", "dose", "each", "extra", "ingredient", "ingredients", "max", "maximum", "per",
    "regular", "softgel", "softgels", "strength", "tablet", "tablets", "take", "total", "up",
    "usual",
];

const MAX_NAME_WORDS: usize = 4;
const MIN_FALLBACK_LETTERS: usize = 3;
const MAX_CONTEXT_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Uses,
    Purpose,
    Warnings,
    SideEffects,
    /// Closes the previous section without opening one we keep.
    End,
}

const MARKERS: &[(&str, Section)] = &[
    ("Uses", Section::Uses),
    ("Indications", Section::Uses),
    ("Purpose", Section::Purpose),
    ("Warnings", Section::Warnings),
    ("Warning", Section::Warnings),
    ("Cautions", Section::Warnings),
    ("Caution", Section::Warnings),
    ("Do not use", Section::Warnings),
    ("Side effects", Section::SideEffects),
    ("Adverse reactions", Section::SideEffects),
    ("Directions", Section::End),
    ("Inactive ingredients", Section::End),
    ("Other information", Section::End),
    ("Storage", Section::End),
];

/// Sentence case as listed, Title Case, and UPPER CASE.
fn marker_forms(phrase: &str) -> Vec<String> {
    let title = phrase
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    vec![phrase.to_string(), title, phrase.to_uppercase()]
}

fn section_for(marker: &str) -> Option<Section> {
    let phrase = marker.trim_end_matches(':').to_lowercase();
    MARKERS
        .iter()
        .find(|(candidate, _)| candidate.to_lowercase() == phrase)
        .map(|(_, section)| *section)
}

/// Extract medication candidates from normalized text.
///
/// Every capitalized name directly followed by a strength becomes a
/// candidate, de-duplicated by normalized name in order of appearance. When
/// no strength appears anywhere, the leading word run of the first line is
/// used with an empty dosage. Label context is attached to each candidate.
pub fn extract(text: &str) -> Vec<MedicationCandidate> {
    let context = label_context(text);
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    let mut strength_found = false;

    for line in text.lines() {
        for caps in RE_NAME_STRENGTH.captures_iter(line) {
            strength_found = true;
            let raw_name = caps["name"].trim();
            let Some(corrected_name) = strip_leading_stopwords(raw_name) else {
                continue;
            };

            let candidate = MedicationCandidate {
                raw_name: raw_name.to_string(),
                corrected_name,
                dosage: caps["dose"].trim().to_string(),
                span: line.trim().to_string(),
                context: context.clone(),
            };

            if seen.insert(candidate.key()) {
                candidates.push(candidate);
            }
        }
    }

    if !strength_found {
        if let Some(candidate) = leading_word_run(text, &context) {
            candidates.push(candidate);
        }
    }

    candidates
}

fn strip_leading_stopwords(name: &str) -> Option<String> {
    let words: Vec<&str> = name
        .split_whitespace()
        .skip_while(|word| LEADING_STOPWORDS.contains(&word.to_lowercase().as_str()))
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn leading_word_run(text: &str, context: &LabelContext) -> Option<MedicationCandidate> {
    let first_line = text.lines().map(str::trim).find(|line| !line.is_empty())?;

    let raw_name = first_line
        .split_whitespace()
        .take_while(|word| word.chars().all(|c| c.is_alphabetic() || c == '-'))
        .take(MAX_NAME_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    let letters = raw_name.chars().filter(|c| c.is_alphabetic()).count();
    if letters < MIN_FALLBACK_LETTERS {
        return None;
    }

    let corrected_name = strip_leading_stopwords(&raw_name)?;
    if normalize_name(&corrected_name).is_empty() {
        return None;
    }

    Some(MedicationCandidate {
        raw_name,
        corrected_name,
        dosage: String::new(),
        span: first_line.to_string(),
        context: context.clone(),
    })
}

/// Capture usage, warning and side-effect sections printed on the label.
///
/// A section runs from its marker to the next marker of a different kind.
/// Consecutive markers of the same kind ("Warnings Do not use ...") stay in
/// one section. The first section of each kind wins; `Purpose` only fills
/// usage when no `Uses`/`Indications` section exists.
pub fn label_context(text: &str) -> LabelContext {
    let markers: Vec<(Section, usize, usize)> = RE_MARKER
        .find_iter(text)
        .filter_map(|m| section_for(m.as_str()).map(|section| (section, m.start(), m.end())))
        .collect();

    let mut uses = None;
    let mut purpose = None;
    let mut warnings = None;
    let mut side_effects = None;

    let mut i = 0;
    while i < markers.len() {
        let (section, _, content_start) = markers[i];
        let mut next = i + 1;
        while next < markers.len() && markers[next].0 == section {
            next += 1;
        }
        let content_end = markers.get(next).map_or(text.len(), |m| m.1);

        if let Some(content) = clean_section(&text[content_start..content_end]) {
            let slot = match section {
                Section::Uses => &mut uses,
                Section::Purpose => &mut purpose,
                Section::Warnings => &mut warnings,
                Section::SideEffects => &mut side_effects,
                Section::End => {
                    i = next;
                    continue;
                }
            };
            if slot.is_none() {
                *slot = Some(content);
            }
        }

        i = next;
    }

    LabelContext {
        uses: uses.or(purpose),
        warnings,
        side_effects,
    }
}

fn clean_section(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_start_matches([':', '-', '•', ' ']).trim();
    if trimmed.is_empty() {
        return None;
    }

    let capped: String = trimmed.chars().take(MAX_CONTEXT_CHARS).collect();
    Some(capped.trim_end().to_string())
}
