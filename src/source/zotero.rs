//! Zotero BibTeX export reader.
//!
//! Zotero's Better BibTeX / built-in exporter records attachments in a
//! `file` field:
//!
//! ```text
//! file = {Full Text PDF:/home/me/Zotero/storage/ABCD1234/paper.pdf:application/pdf}
//! file = {PDF:C\:\\Users\\me\\Zotero\\storage\\ABCD1234\\paper.pdf:application/pdf}
//! ```
//!
//! Several attachments are separated by `;`. The first PDF attachment whose
//! path exists on disk is used; entries without one are skipped.

use crate::error::ReviewError;
use crate::source::bibtex::{extract_metadata, read_entries};
use crate::source::PaperPair;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static RE_PDF_ATTACHMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^:]*:(.+):application/pdf$").unwrap());
static RE_ESCAPED_DRIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Za-z])\\:").unwrap());
static RE_BACKSLASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\+").unwrap());

/// Extract the attachment path from a Zotero `file` field, without checking
/// that it exists.
pub fn parse_file_field(file_field: &str) -> Vec<PathBuf> {
    let trimmed = file_field.trim();
    let inner = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);

    inner
        .split(';')
        .filter_map(|part| {
            let caps = RE_PDF_ATTACHMENT.captures(part.trim())?;
            let raw = caps.get(1)?.as_str();
            let unescaped = RE_ESCAPED_DRIVE.replace_all(raw, "$1:");
            let normalised = RE_BACKSLASHES.replace_all(&unescaped, r"\");
            Some(PathBuf::from(normalised.into_owned()))
        })
        .collect()
}

/// The first PDF attachment in `file_field` that exists as a file.
pub fn extract_pdf_path_from_file_field(file_field: &str) -> Option<PathBuf> {
    let candidates = parse_file_field(file_field);
    if candidates.is_empty() {
        debug!(
            "File field is not a Zotero PDF attachment: {}",
            file_field.chars().take(50).collect::<String>()
        );
        return None;
    }

    let found = candidates.iter().find(|p| p.is_file()).cloned();
    if found.is_none() {
        warn!(
            "No attachment path from file field exists: {}",
            candidates[0].display()
        );
    }
    found
}

/// Parse a Zotero export into paper pairs.
///
/// Fails when the file is missing or yields no entry with a usable PDF.
pub fn parse_zotero_bib_file(bib_path: &Path) -> Result<Vec<PaperPair>, ReviewError> {
    if !bib_path.exists() {
        return Err(ReviewError::PathNotFound {
            path: bib_path.to_path_buf(),
        });
    }
    if !bib_path.is_file() {
        return Err(ReviewError::WrongPathKind {
            path: bib_path.to_path_buf(),
            expected: "file",
        });
    }

    let entries = read_entries(bib_path)?;
    let mut seen = HashSet::new();
    let mut pairs = Vec::new();
    let mut skipped = 0usize;

    for entry in &entries {
        let Some(metadata) = extract_metadata(entry) else {
            warn!("Skipping entry '{}': missing key or title", entry.key);
            skipped += 1;
            continue;
        };
        if !seen.insert(metadata.bib_key.clone()) {
            continue;
        }

        let Some(file_field) = entry.field("file") else {
            warn!("Entry '{}' has no 'file' field; skipping", metadata.bib_key);
            skipped += 1;
            continue;
        };

        match extract_pdf_path_from_file_field(file_field) {
            Some(pdf_path) => {
                debug!("{} → {}", metadata.bib_key, pdf_path.display());
                pairs.push(PaperPair { metadata, pdf_path });
            }
            None => {
                warn!(
                    "Entry '{}' has no readable PDF attachment; skipping",
                    metadata.bib_key
                );
                skipped += 1;
            }
        }
    }

    if pairs.is_empty() {
        let detail = if skipped > 0 {
            format!("no entries with PDF paths found (skipped {skipped})")
        } else {
            "no entries found".to_string()
        };
        return Err(ReviewError::BibTex {
            path: bib_path.to_path_buf(),
            detail,
        });
    }

    info!(
        "Parsed {} paper(s) from {} ({} skipped)",
        pairs.len(),
        bib_path.display(),
        skipped
    );
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn unix_path_with_any_label() {
        assert_eq!(
            parse_file_field("{Full Text PDF:/home/me/Zotero/storage/AB12/paper.pdf:application/pdf}"),
            vec![PathBuf::from("/home/me/Zotero/storage/AB12/paper.pdf")]
        );
    }

    #[test]
    fn windows_path_is_unescaped() {
        let paths = parse_file_field(r"PDF:C\:\\Users\\me\\Zotero\\storage\\F8XW\\file.pdf:application/pdf");
        assert_eq!(
            paths,
            vec![PathBuf::from(r"C:\Users\me\Zotero\storage\F8XW\file.pdf")]
        );
    }

    #[test]
    fn non_pdf_attachments_are_ignored() {
        let field = "Snapshot:/tmp/page.html:text/html;PDF:/tmp/a.pdf:application/pdf";
        assert_eq!(parse_file_field(field), vec![PathBuf::from("/tmp/a.pdf")]);
        assert!(parse_file_field("Snapshot:/tmp/page.html:text/html").is_empty());
        assert!(parse_file_field("").is_empty());
    }

    #[test]
    fn first_existing_attachment_wins() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("real.pdf");
        fs::write(&pdf, "%PDF-1.4").unwrap();
        let field = format!(
            "PDF:/definitely/missing.pdf:application/pdf;PDF:{}:application/pdf",
            pdf.display()
        );
        assert_eq!(extract_pdf_path_from_file_field(&field), Some(pdf));
        assert_eq!(
            extract_pdf_path_from_file_field("PDF:/definitely/missing.pdf:application/pdf"),
            None
        );
    }

    #[test]
    fn export_is_parsed_into_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("storage/AB12/paper.pdf");
        fs::create_dir_all(pdf.parent().unwrap()).unwrap();
        fs::write(&pdf, "%PDF-1.4").unwrap();

        let bib = dir.path().join("library.bib");
        fs::write(
            &bib,
            format!(
                "@article{{good, title = {{Good}}, file = {{PDF:{}:application/pdf}}}}\n\
                 @article{{nofile, title = {{No File}}}}\n\
                 @article{{gone, title = {{Gone}}, file = {{PDF:/missing.pdf:application/pdf}}}}",
                pdf.display()
            ),
        )
        .unwrap();

        let pairs = parse_zotero_bib_file(&bib).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].metadata.bib_key, "good");
        assert_eq!(pairs[0].pdf_path, pdf);
    }

    #[test]
    fn export_without_attachments_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bib = dir.path().join("library.bib");
        fs::write(&bib, "@article{x, title = {X}}").unwrap();
        match parse_zotero_bib_file(&bib) {
            Err(ReviewError::BibTex { detail, .. }) => assert!(detail.contains("skipped 1")),
            other => panic!("expected BibTeX error, got {other:?}"),
        }
    }

    #[test]
    fn missing_export_is_path_not_found() {
        assert!(matches!(
            parse_zotero_bib_file(Path::new("/no/such/library.bib")),
            Err(ReviewError::PathNotFound { .. })
        ));
    }
}
