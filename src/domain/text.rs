//! Text cleanup applied before embedding.
//!
//! Resumes and job descriptions must go through the exact same rule,
//! otherwise their embeddings are not comparable. `normalize` is pure and
//! idempotent: repeated application yields byte-identical output.

/// Minimal cleaning for embedding-based matching.
///
/// Replaces newlines and non-breaking spaces with regular spaces, collapses
/// whitespace runs to a single space, trims, and lowercases.
pub fn normalize(text: &str) -> String {
    let replaced = text.replace(['\n', '\r', '\u{a0}'], " ");
    replaced
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Wraps a cleaned resume body with its category header so the category
/// contributes to the embedding alongside the free text.
pub fn compose_resume_text(category: &str, cleaned_resume: &str) -> String {
    format!(
        "professional resume profile. primary role: {}. skills, experience, and responsibilities: {}",
        normalize(category),
        cleaned_resume
    )
}
