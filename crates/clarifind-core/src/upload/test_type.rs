//! Test type inference from file names.

/// Fallback when no keyword matches.
pub const GENERAL_LAB_TEST: &str = "General Lab Test";

/// Keyword groups checked in order. First match wins, so broader
/// keywords (e.g. "alt", "ast") sit after the specific panels.
const TEST_TYPE_KEYWORDS: &[(&[&str], &str)] = &[
    (&["cbc", "complete blood"], "Complete Blood Count"),
    (&["lipid", "cholesterol"], "Lipid Panel"),
    (&["thyroid", "tsh", "t3", "t4"], "Thyroid Function"),
    (&["glucose", "blood sugar", "a1c"], "Glucose/Diabetes Panel"),
    (&["liver", "alt", "ast"], "Liver Function"),
    (&["kidney", "creatinine", "bun"], "Kidney Function"),
];

/// Infer the test type from a file name by case-insensitive keyword match.
pub fn infer_test_type(file_name: &str) -> &'static str {
    let name = file_name.to_lowercase();
    TEST_TYPE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| name.contains(k)))
        .map(|(_, test_type)| *test_type)
        .unwrap_or(GENERAL_LAB_TEST)
}
