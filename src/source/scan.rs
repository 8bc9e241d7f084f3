//! Directory scanner: pair each paper directory's `.bib` with its `.pdf`.
//!
//! ```text
//! papers/                      papers/
//! ├── attention/               ├── paper.bib
//! │   ├── attention.bib        └── paper.pdf
//! │   └── attention.pdf
//! └── ddpm/                    (single-directory mode)
//!     ├── ddpm.bib
//!     └── pdf/ddpm.pdf
//!
//! (subdirectory mode)
//! ```
//!
//! The root is in single-directory mode when it directly holds both a `.bib`
//! and a `.pdf`. Otherwise each immediate subdirectory is one paper
//! directory, searched recursively. Every entry of a paper directory's `.bib`
//! is paired with that directory's PDF.
//!
//! Results are sorted by path so runs are reproducible.

use crate::error::ReviewError;
use crate::source::bibtex::parse_bibtex_file;
use crate::source::PaperPair;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Scan `directory` for paper pairs.
///
/// Unreadable or malformed paper directories are skipped with a warning in
/// subdirectory mode; in single-directory mode the error is returned.
pub fn scan_directory(directory: &Path) -> Result<Vec<PaperPair>, ReviewError> {
    if !directory.exists() {
        return Err(ReviewError::PathNotFound {
            path: directory.to_path_buf(),
        });
    }
    if !directory.is_dir() {
        return Err(ReviewError::WrongPathKind {
            path: directory.to_path_buf(),
            expected: "directory",
        });
    }

    let shallow_bib = find_file(directory, "bib", Some(1));
    let shallow_pdf = find_file(directory, "pdf", Some(1));
    if shallow_bib.is_some() && shallow_pdf.is_some() {
        info!("Processing directory: {}", directory.display());
        return scan_single_directory(directory);
    }

    info!("Scanning subdirectories in: {}", directory.display());
    let mut pairs = Vec::new();
    for subdir in subdirectories(directory) {
        match scan_single_directory(&subdir) {
            Ok(found) => pairs.extend(found),
            Err(e) => warn!("Skipping directory {}: {}", subdir.display(), e),
        }
    }

    info!("Found {} paper pairs in {}", pairs.len(), directory.display());
    Ok(pairs)
}

/// Pair every entry of the directory's `.bib` file with its `.pdf`.
///
/// Returns an empty list when either file is missing.
pub fn scan_single_directory(directory: &Path) -> Result<Vec<PaperPair>, ReviewError> {
    let Some(bib_file) = find_file(directory, "bib", None) else {
        debug!("No BibTeX file in {}", directory.display());
        return Ok(Vec::new());
    };
    let Some(pdf_file) = find_file(directory, "pdf", None) else {
        warn!("No PDF file in {}", directory.display());
        return Ok(Vec::new());
    };

    let pairs: Vec<PaperPair> = parse_bibtex_file(&bib_file)?
        .into_iter()
        .map(|metadata| PaperPair {
            metadata,
            pdf_path: pdf_file.clone(),
        })
        .collect();

    debug!(
        "Paired {} entries from {} with {}",
        pairs.len(),
        bib_file.display(),
        pdf_file.display()
    );
    Ok(pairs)
}

/// First file (by sorted path) with extension `ext`, case-insensitive.
fn find_file(directory: &Path, ext: &str, max_depth: Option<usize>) -> Option<PathBuf> {
    let mut walker = WalkDir::new(directory).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    let mut matches = walker
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|x| x.to_string_lossy().eq_ignore_ascii_case(ext))
        })
        .map(|e| e.into_path());

    let first = matches.next()?;
    let extra = matches.count();
    if extra > 0 {
        warn!(
            "{} .{} files in {}; using {}",
            extra + 1,
            ext,
            directory.display(),
            first.display()
        );
    }
    Some(first)
}

fn subdirectories(directory: &Path) -> Vec<PathBuf> {
    WalkDir::new(directory)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .flatten()
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn bib(key: &str) -> String {
        format!("@article{{{key}, title = {{Paper {key}}}, year = {{2021}}}}")
    }

    #[test]
    fn single_directory_mode() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("refs.bib"), &bib("solo"));
        write(&dir.path().join("paper.PDF"), "%PDF-1.4");

        let pairs = scan_directory(dir.path()).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].metadata.bib_key, "solo");
        assert!(pairs[0].pdf_path.ends_with("paper.PDF"));
    }

    #[test]
    fn subdirectory_mode_is_sorted_and_skips_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("b_paper/b.bib"), &bib("bee"));
        write(&dir.path().join("b_paper/files/b.pdf"), "%PDF-1.4");
        write(&dir.path().join("a_paper/a.bib"), &bib("ay"));
        write(&dir.path().join("a_paper/a.pdf"), "%PDF-1.4");
        write(&dir.path().join("c_no_pdf/c.bib"), &bib("cee"));
        write(&dir.path().join("d_broken/d.bib"), "not bibtex");
        write(&dir.path().join("d_broken/d.pdf"), "%PDF-1.4");

        let pairs = scan_directory(dir.path()).unwrap();
        let keys: Vec<_> = pairs.iter().map(|p| p.metadata.bib_key.as_str()).collect();
        assert_eq!(keys, ["ay", "bee"]);
        assert!(pairs[1].pdf_path.ends_with("files/b.pdf"));
    }

    #[test]
    fn every_bib_entry_shares_the_pdf() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("refs.bib"),
            &format!("{}\n{}", bib("one"), bib("two")),
        );
        write(&dir.path().join("paper.pdf"), "%PDF-1.4");

        let pairs = scan_single_directory(dir.path()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].pdf_path, pairs[1].pdf_path);
    }

    #[test]
    fn missing_and_wrong_kind_paths() {
        assert!(matches!(
            scan_directory(Path::new("/no/such/papers")),
            Err(ReviewError::PathNotFound { .. })
        ));
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            scan_directory(file.path()),
            Err(ReviewError::WrongPathKind { .. })
        ));
    }

    #[test]
    fn empty_directory_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan_directory(dir.path()).unwrap().is_empty());
    }
}
