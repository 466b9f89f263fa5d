//! Post-OCR cleanup of the selected reading.
//!
//! Layout noise is normalized line by line (line breaks are kept, the
//! extractor depends on them), then tokens are corrected: first a fixed
//! table of known misreads, then an edit-distance match against a
//! dictionary of medication names. [`normalize`] is idempotent.

use std::sync::LazyLock;

use regex::Regex;

static RE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[•·●▪■◦]\s*").expect("valid bullet regex"));
static RE_SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,;:!?])").expect("valid punctuation regex"));
static RE_COMMA_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([,;])(\p{L})").expect("valid comma regex"));
static RE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// `500rng` → `500mg`, `50rncg` → `50mcg`.
static RE_UNIT_RN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d) ?rn(c?g)\b").expect("valid unit regex"));
/// `1000lU` / `1000|U` → `1000IU`.
static RE_UNIT_IU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d) ?[l|]U\b").expect("valid IU regex"));

/// Known misreads, lowercase. Every value must be in [`MEDICATION_NAMES`].
const MISREADS: &[(&str, &str)] = &[
    ("1buprofen", "ibuprofen"),
    ("0meprazole", "omeprazole"),
    ("acetamin0phen", "acetaminophen"),
    ("acetaminophcn", "acetaminophen"),
    ("advii", "advil"),
    ("amoxici11in", "amoxicillin"),
    ("amoxicil1in", "amoxicillin"),
    ("asp1rin", "aspirin"),
    ("aspirln", "aspirin"),
    ("asprin", "aspirin"),
    ("ibupr0fen", "ibuprofen"),
    ("ibuprofcn", "ibuprofen"),
    ("lbuprofen", "ibuprofen"),
    ("lisin0pril", "lisinopril"),
    ("metf0rmin", "metformin"),
    ("parace7amol", "paracetamol"),
    ("paracetam0l", "paracetamol"),
    ("paracetamo1", "paracetamol"),
    ("tylenoi", "tylenol"),
    ("vitamln", "vitamin"),
    ("vltamin", "vitamin"),
];

/// Lowercase medication vocabulary used for fuzzy correction.
const MEDICATION_NAMES: &[&str] = &[
    "acetaminophen", "acyclovir", "advil", "albuterol", "alendronate", "allopurinol",
    "alprazolam", "amitriptyline", "amlodipine", "amoxicillin", "ampicillin", "apixaban",
    "aripiprazole", "aspirin", "atenolol", "atorvastatin", "azithromycin", "baclofen",
    "benadryl", "benazepril", "bisoprolol", "budesonide", "bupropion", "buspirone",
    "carbamazepine", "carvedilol", "cephalexin", "cetirizine", "ciprofloxacin", "citalopram",
    "clarithromycin", "claritin", "clonazepam", "clopidogrel", "codeine", "colchicine",
    "cyclobenzaprine", "dexamethasone", "diazepam", "diclofenac", "digoxin", "diltiazem",
    "diphenhydramine", "donepezil", "doxycycline", "duloxetine", "enalapril", "escitalopram",
    "esomeprazole", "famotidine", "fexofenadine", "finasteride", "fluconazole", "fluoxetine",
    "fluticasone", "furosemide", "gabapentin", "glimepiride", "glipizide", "guaifenesin",
    "hydrochlorothiazide", "hydrocodone", "hydroxyzine", "ibuprofen", "insulin", "lamotrigine",
    "lansoprazole", "levetiracetam", "levofloxacin", "levothyroxine", "lipitor", "lisinopril",
    "loratadine", "lorazepam", "losartan", "meloxicam", "metformin", "methotrexate",
    "methylprednisolone", "metoprolol", "metronidazole", "mirtazapine", "montelukast",
    "morphine", "motrin", "naproxen", "nexium", "nitrofurantoin", "omeprazole", "ondansetron",
    "oxycodone", "panadol", "pantoprazole", "paracetamol", "paroxetine", "phenytoin",
    "pravastatin", "prednisolone", "prednisone", "pregabalin", "promethazine", "propranolol",
    "quetiapine", "ramipril", "ranitidine", "risperidone", "rivaroxaban", "rosuvastatin",
    "sertraline", "simvastatin", "sitagliptin", "spironolactone", "sumatriptan", "tamsulosin",
    "tramadol", "trazodone", "tylenol", "valacyclovir", "valsartan", "venlafaxine",
    "verapamil", "vitamin", "warfarin", "zolpidem", "zyrtec",
];

const MIN_FUZZY_LEN: usize = 5;

/// Normalize layout, then correct tokens, then re-normalize layout so
/// corrections that change token class (digit → letter) settle.
pub fn normalize(text: &str) -> String {
    let laid_out = normalize_layout(text);
    let corrected = correct_tokens(&laid_out);
    normalize_layout(&corrected)
}

/// Whitespace and punctuation cleanup. Keeps line structure, drops blank lines.
pub fn normalize_layout(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| {
            if c.is_control() && c != '\n' {
                ' '
            } else {
                c
            }
        })
        .collect();

    cleaned
        .lines()
        .map(normalize_line)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn normalize_line(line: &str) -> String {
    let line = RE_BULLET.replace_all(line, " • ");
    let line = RE_SPACE_BEFORE_PUNCT.replace_all(&line, "${1}");
    let line = RE_COMMA_LETTER.replace_all(&line, "${1} ${2}");
    let line = RE_WHITESPACE.replace_all(&line, " ");
    line.trim().to_string()
}

fn correct_tokens(text: &str) -> String {
    let text = RE_UNIT_RN.replace_all(text, "${1}m${2}");
    let text = RE_UNIT_IU.replace_all(&text, "${1}IU");

    let mut result = String::with_capacity(text.len());
    let mut word_buf = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word_buf.push(ch);
        } else {
            if !word_buf.is_empty() {
                result.push_str(&correct_word(&word_buf));
                word_buf.clear();
            }
            result.push(ch);
        }
    }

    if !word_buf.is_empty() {
        result.push_str(&correct_word(&word_buf));
    }

    result
}

fn correct_word(word: &str) -> String {
    let lower = word.to_lowercase();

    if let Some((_, fixed)) = MISREADS.iter().find(|(misread, _)| *misread == lower) {
        return preserve_case(word, fixed);
    }

    if word.chars().count() < MIN_FUZZY_LEN
        || !word.chars().all(|c| c.is_ascii_alphabetic())
        || MEDICATION_NAMES.contains(&lower.as_str())
    {
        return word.to_string();
    }

    match closest_term(&lower, MEDICATION_NAMES) {
        Some(term) => preserve_case(word, term),
        None => word.to_string(),
    }
}

/// Allowed edit distance for a word of this length.
fn max_distance(len: usize) -> usize {
    if len >= 8 {
        2
    } else {
        1
    }
}

/// Unique closest term within the allowed distance. Ties mean no correction.
fn closest_term<'a>(word: &str, terms: &[&'a str]) -> Option<&'a str> {
    let limit = max_distance(word.len());
    let mut best: Option<&'a str> = None;
    let mut best_distance = limit + 1;
    let mut ambiguous = false;

    for &term in terms {
        if word.len().abs_diff(term.len()) > limit {
            continue;
        }

        let dist = edit_distance(word, term);
        if dist < best_distance {
            best_distance = dist;
            best = Some(term);
            ambiguous = false;
        } else if dist == best_distance && best.is_some() {
            ambiguous = true;
        }
    }

    if ambiguous {
        None
    } else {
        best
    }
}

fn preserve_case(original: &str, correction: &str) -> String {
    let mut letters = original.chars().filter(|c| c.is_alphabetic()).peekable();
    if letters.peek().is_some() && letters.all(|c| c.is_uppercase()) {
        return correction.to_uppercase();
    }

    if original.chars().next().is_some_and(|c| c.is_uppercase()) {
        let mut chars = correction.chars();
        match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    } else {
        correction.to_string()
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collapses_spacing_around_bullets() {
        assert_eq!(
            normalize("Uses  •  temporarily relieves"),
            "Uses • temporarily relieves"
        );
    }

    #[test]
    fn keeps_line_breaks_and_drops_blank_lines() {
        assert_eq!(
            normalize("  PARACETAMOL   500mg \r\n\r\n\n  Tablets\t\tx 16  "),
            "PARACETAMOL 500mg\nTablets x 16"
        );
    }

    #[test]
    fn fixes_space_before_punctuation() {
        assert_eq!(normalize("fever , headache ;toothache"), "fever, headache; toothache");
    }

    #[test]
    fn control_characters_become_spaces() {
        assert_eq!(normalize("ASPIRIN\u{0}81mg"), "ASPIRIN 81mg");
    }

    #[test]
    fn corrects_misread_table_entries_preserving_case() {
        assert_eq!(normalize("PARACETAMO1 500mg"), "PARACETAMOL 500mg");
        assert_eq!(normalize("Lbuprofen 200mg"), "Ibuprofen 200mg");
        assert_eq!(normalize("take asprin daily"), "take aspirin daily");
    }

    #[test]
    fn corrects_unit_misreads() {
        assert_eq!(normalize("Metformin 500rng"), "Metformin 500mg");
        assert_eq!(normalize("Vitamin D3 1000lU"), "Vitamin D3 1000IU");
        assert_eq!(normalize("B12 50 rncg"), "B12 50mcg");
    }

    #[test]
    fn fuzzy_corrects_close_medication_names() {
        assert_eq!(normalize("AMOXICILIN 250mg"), "AMOXICILLIN 250mg");
        assert_eq!(normalize("Omeprazol 20mg"), "Omeprazole 20mg");
    }

    #[test]
    fn leaves_ordinary_words_alone() {
        let text = "Warnings\nDirections: adults and children 12 years and over\nKeep out of reach";
        assert_eq!(normalize(text), text);
    }

    #[test]
    fn short_and_numeric_tokens_are_not_fuzzed() {
        assert_eq!(normalize("Tab 500mg x4"), "Tab 500mg x4");
    }

    #[test]
    fn ambiguous_fuzzy_match_is_left_untouched() {
        assert_eq!(closest_term("abcdx", &["abcde", "abcdf"]), None);
        assert_eq!(closest_term("abcdx", &["abcde", "zzzzz"]), Some("abcde"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "Uses  •  temporarily relieves minor aches",
            "  PARACETAMO1   500rng\n\n Warnings :do not exceed,0meprazole",
            "a•,b\t\t•\u{7}c ,,d",
            "ASPIRIN 81mg tablets\r\nSide Effects:nausea ,vomiting",
            "Vitamin D3 1000 lU ; amoxicilin",
            "",
            "   \n  \n",
        ];

        for sample in samples {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn misread_values_are_dictionary_terms() {
        for (misread, fixed) in MISREADS {
            assert!(MEDICATION_NAMES.contains(fixed), "{fixed} missing");
            assert!(!MEDICATION_NAMES.contains(misread), "{misread} is a term");
        }
    }

    #[test]
    fn edit_distance_basics() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("aspirin", "aspirin"), 0);
    }
}
