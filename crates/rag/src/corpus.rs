//! Corpus file parsing
//!
//! The crawler writes one file of concatenated prose sections. Sections are
//! separated by a delimiter line; each may begin with a small recognized
//! header naming its source URL and title.

use std::path::Path;

use crate::RagError;

/// A line consisting of this string (after trimming) separates sections.
pub const SECTION_DELIMITER: &str = "=====";

/// One scraped page of the knowledge corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Source URL from the `SOURCE:` header line, or empty.
    pub source_url: String,
    /// Title from the `TITLE:` header line, or "Untitled".
    pub title: String,
    /// Trimmed body prose.
    pub text: String,
}

/// Read and parse the corpus file. A missing file is fatal: the service
/// cannot answer knowledge queries without a corpus.
pub fn load_corpus(path: &Path) -> Result<Vec<Section>, RagError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RagError::Corpus(format!("failed to read {}: {}", path.display(), e)))?;
    let sections = parse_corpus(&raw);
    if sections.is_empty() {
        return Err(RagError::Corpus(format!(
            "corpus {} contains no sections",
            path.display()
        )));
    }
    Ok(sections)
}

/// Split raw corpus text into sections.
///
/// Empty sections (delimiter runs, trailing delimiters) are dropped.
pub fn parse_corpus(raw: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Vec::new();

    for line in raw.lines() {
        if line.trim() == SECTION_DELIMITER {
            if let Some(section) = build_section(&current) {
                sections.push(section);
            }
            current.clear();
        } else {
            current.push(line);
        }
    }
    if let Some(section) = build_section(&current) {
        sections.push(section);
    }

    sections
}

fn build_section(lines: &[&str]) -> Option<Section> {
    let mut source_url = String::new();
    let mut title = String::new();
    let mut body_start = 0;

    // The header is at most the first two recognized lines; anything else
    // belongs to the body.
    for (i, line) in lines.iter().enumerate().take(2) {
        let trimmed = line.trim();
        if let Some(rest) = trimmed.strip_prefix("SOURCE:") {
            source_url = rest.trim().to_string();
            body_start = i + 1;
        } else if let Some(rest) = trimmed.strip_prefix("TITLE:") {
            title = rest.trim().to_string();
            body_start = i + 1;
        } else {
            break;
        }
    }

    let text = lines[body_start..].join("\n").trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some(Section {
        source_url,
        title: if title.is_empty() {
            "Untitled".to_string()
        } else {
            title
        },
        text,
    })
}
