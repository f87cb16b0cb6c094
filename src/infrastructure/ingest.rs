use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;

use crate::domain::document::Document;
use crate::domain::text::{compose_resume_text, normalize};

/// One row of the resume corpus CSV (Kaggle resume dataset column names).
#[derive(Debug, Deserialize)]
struct ResumeRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Resume_str")]
    resume: String,
    #[serde(rename = "Category")]
    category: String,
}

/// Loads the resume corpus from a CSV with `ID`, `Resume_str` and
/// `Category` columns. Rows with an empty resume body are dropped; the
/// remaining text is normalized and prefixed with its category header so
/// the category contributes to the embedding.
pub fn load_resumes(path: &Path) -> Result<Vec<Document>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("cannot open corpus {path:?}"))?;

    let mut documents = Vec::new();
    let mut dropped = 0usize;
    for (row_no, row) in reader.deserialize::<ResumeRow>().enumerate() {
        let row = row.with_context(|| format!("malformed CSV row {}", row_no + 2))?;
        let cleaned = normalize(&row.resume);
        if cleaned.is_empty() {
            dropped += 1;
            continue;
        }
        documents.push(Document {
            id: row.id,
            text: compose_resume_text(&row.category, &cleaned),
            category: row.category,
        });
    }

    if dropped > 0 {
        warn!("Dropped {dropped} rows with empty resume text");
    }
    info!("Loaded {} resumes from {path:?}", documents.len());
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn corpus_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_rows_and_composes_text() {
        let file = corpus_file(
            "ID,Resume_str,Category\n\
             16852973,\"Chef with 5 years\ncooking experience\",CHEF\n\
             22323967,\"Software engineer, Python\",INFORMATION-TECHNOLOGY\n",
        );
        let docs = load_resumes(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "16852973");
        assert_eq!(docs[0].category, "CHEF");
        assert!(docs[0].text.contains("primary role: chef"));
        assert!(docs[0].text.contains("chef with 5 years cooking experience"));
    }

    #[test]
    fn drops_empty_resume_rows() {
        let file = corpus_file(
            "ID,Resume_str,Category\n\
             1,\"   \n \",CHEF\n\
             2,\"real content\",HR\n",
        );
        let docs = load_resumes(file.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "2");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_resumes(Path::new("/nonexistent/resumes.csv")).is_err());
    }
}
