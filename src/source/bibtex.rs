//! Minimal BibTeX reader.
//!
//! Handles what reference managers actually export: `@type{key, field = {..}}`
//! entries with brace- or quote-delimited values, bare numeric values, and
//! `#` concatenation. `@comment`, `@string` and `@preamble` blocks are
//! skipped. String macros are not expanded; a bare macro name is kept as
//! literal text.
//!
//! Values are cleaned for display: grouping braces removed, common LaTeX
//! escapes (`\&`, `\%`, `\_`) unescaped, whitespace collapsed.

use crate::error::ReviewError;
use crate::source::PaperMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, warn};

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static RE_LATEX_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\([&%_$#])").unwrap());
static RE_AUTHOR_SEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\s+and\s+").unwrap());

/// One raw entry: type, citation key, and lowercase field names → raw values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibEntry {
    pub entry_type: String,
    pub key: String,
    pub fields: HashMap<String, String>,
}

impl BibEntry {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Parse every entry in `content`. Malformed trailing input is ignored.
pub fn parse_entries(content: &str) -> Vec<BibEntry> {
    let mut parser = Parser::new(content);
    let mut entries = Vec::new();

    while parser.skip_to_entry() {
        let entry_type = parser.ident().to_ascii_lowercase();
        parser.skip_ws();
        let Some(close) = parser.open_delim() else {
            continue;
        };

        match entry_type.as_str() {
            "comment" | "string" | "preamble" => parser.skip_balanced(close),
            _ => {
                if let Some(entry) = parser.entry_body(entry_type, close) {
                    entries.push(entry);
                }
            }
        }
    }

    entries
}

/// Read a `.bib` file and extract the metadata of every usable entry.
///
/// Entries without a key or title are skipped with a warning; duplicate keys
/// keep the first occurrence. Fails if the file is unreadable or no entry
/// survives.
pub fn parse_bibtex_file(path: &Path) -> Result<Vec<PaperMetadata>, ReviewError> {
    let entries = read_entries(path)?;
    let mut seen = HashSet::new();
    let mut papers = Vec::new();

    for entry in &entries {
        match extract_metadata(entry) {
            Some(meta) if seen.insert(meta.bib_key.clone()) => papers.push(meta),
            Some(meta) => debug!("Duplicate BibTeX key '{}' ignored", meta.bib_key),
            None => warn!(
                "Skipping entry '{}' in {}: missing key or title",
                entry.key,
                path.display()
            ),
        }
    }

    if papers.is_empty() {
        return Err(ReviewError::BibTex {
            path: path.to_path_buf(),
            detail: "no valid entries found".to_string(),
        });
    }
    Ok(papers)
}

/// Read and parse a `.bib` file into raw entries.
///
/// Files that are not valid UTF-8 are decoded as Latin-1, which never fails.
pub fn read_entries(path: &Path) -> Result<Vec<BibEntry>, ReviewError> {
    let bytes = std::fs::read(path).map_err(|e| ReviewError::BibTex {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let content = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!("{} is not UTF-8; decoding as Latin-1", path.display());
            e.into_bytes().iter().map(|&b| b as char).collect()
        }
    };

    Ok(parse_entries(&content))
}

/// Map a raw entry to [`PaperMetadata`]. `None` when key or title is missing.
pub fn extract_metadata(entry: &BibEntry) -> Option<PaperMetadata> {
    let bib_key = entry.key.trim().to_string();
    let title = entry.field("title").map(clean_value).unwrap_or_default();
    if bib_key.is_empty() || title.is_empty() {
        return None;
    }

    let authors = entry
        .field("author")
        .map(|a| split_authors(&clean_value(a)))
        .unwrap_or_default();

    let year = entry.field("year").and_then(|y| parse_year(&clean_value(y)));

    let url = entry
        .field("url")
        .map(clean_value)
        .filter(|u| !u.is_empty())
        .and_then(|u| {
            if u.starts_with("http://") || u.starts_with("https://") {
                Some(u)
            } else {
                warn!("Ignoring non-http URL '{}' in entry '{}'", u, bib_key);
                None
            }
        });

    let doi = entry
        .field("doi")
        .map(clean_value)
        .filter(|d| !d.is_empty());

    Some(PaperMetadata {
        bib_key,
        title,
        authors,
        year,
        url,
        doi,
    })
}

/// Split a BibTeX author list on the `and` separator.
pub fn split_authors(raw: &str) -> Vec<String> {
    RE_AUTHOR_SEP
        .split(raw)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_year(raw: &str) -> Option<i32> {
    match raw.trim().parse::<i32>() {
        Ok(y) if (1900..=2100).contains(&y) => Some(y),
        Ok(y) => {
            warn!("Year {} is outside 1900–2100; ignoring", y);
            None
        }
        Err(_) => {
            warn!("Could not parse year '{}'; ignoring", raw);
            None
        }
    }
}

/// Strip grouping braces, unescape LaTeX specials, collapse whitespace.
pub fn clean_value(raw: &str) -> String {
    let unbraced: String = raw.chars().filter(|c| *c != '{' && *c != '}').collect();
    let unescaped = RE_LATEX_ESCAPE.replace_all(&unbraced, "$1");
    RE_WHITESPACE.replace_all(unescaped.trim(), " ").into_owned()
}

// ── Scanner ──────────────────────────────────────────────────────────────

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Advance past the next `@`. False at end of input.
    fn skip_to_entry(&mut self) -> bool {
        match self.src[self.pos..].find('@') {
            Some(off) => {
                self.pos += off + 1;
                true
            }
            None => {
                self.pos = self.src.len();
                false
            }
        }
    }

    fn ident(&mut self) -> &'a str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | ':' | '.' | '/' | '+'))
        {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    /// Consume `{` or `(` and return the matching closer.
    fn open_delim(&mut self) -> Option<char> {
        match self.peek()? {
            '{' => {
                self.bump();
                Some('}')
            }
            '(' => {
                self.bump();
                Some(')')
            }
            _ => None,
        }
    }

    /// Skip to just past the delimiter closing the current block.
    fn skip_balanced(&mut self, close: char) {
        let open = if close == '}' { '{' } else { '(' };
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    fn entry_body(&mut self, entry_type: String, close: char) -> Option<BibEntry> {
        self.skip_ws();
        let key_start = self.pos;
        while self.peek().is_some_and(|c| c != ',' && c != close) {
            self.bump();
        }
        let key = self.src[key_start..self.pos].trim().to_string();

        let mut fields = HashMap::new();
        loop {
            self.skip_ws();
            match self.peek()? {
                c if c == close => {
                    self.bump();
                    break;
                }
                ',' => {
                    self.bump();
                    continue;
                }
                '@' => break,
                _ => {}
            }

            let name = self.ident().to_ascii_lowercase();
            if name.is_empty() {
                // Unparseable junk inside the entry; give up on the rest of it.
                self.skip_balanced(close);
                break;
            }
            self.skip_ws();
            if self.peek() != Some('=') {
                continue;
            }
            self.bump();
            let value = self.value(close)?;
            fields.entry(name).or_insert(value);
        }

        Some(BibEntry {
            entry_type,
            key,
            fields,
        })
    }

    /// Read one field value, joining `#`-concatenated parts.
    fn value(&mut self, close: char) -> Option<String> {
        let mut out = String::new();
        loop {
            self.skip_ws();
            match self.peek()? {
                '{' => {
                    self.bump();
                    out.push_str(self.braced());
                }
                '"' => {
                    self.bump();
                    out.push_str(self.quoted());
                }
                _ => {
                    let start = self.pos;
                    while self
                        .peek()
                        .is_some_and(|c| c != ',' && c != close && c != '#' && !c.is_whitespace())
                    {
                        self.bump();
                    }
                    out.push_str(&self.src[start..self.pos]);
                }
            }
            self.skip_ws();
            if self.peek() == Some('#') {
                self.bump();
            } else {
                return Some(out);
            }
        }
    }

    /// Content of a `{..}` group (opening brace already consumed).
    fn braced(&mut self) -> &'a str {
        let start = self.pos;
        let mut depth = 1usize;
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return &self.src[start..self.pos - 1];
                    }
                }
                _ => {}
            }
        }
        &self.src[start..]
    }

    /// Content of a `".."` value (opening quote already consumed). Quotes
    /// inside braces do not terminate the value.
    fn quoted(&mut self) -> &'a str {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.bump() {
            match c {
                '\\' => {
                    self.bump();
                }
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                '"' if depth == 0 => return &self.src[start..self.pos - 1],
                _ => {}
            }
        }
        &self.src[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
% exported by a reference manager
@comment{jabref-meta: databaseType:bibtex;}
@string{ieee = "IEEE"}

@article{vaswani2017attention,
  title     = {Attention Is {All} You Need},
  author    = {Ashish Vaswani and Noam Shazeer and
               Niki Parmar},
  year      = 2017,
  url       = {https://arxiv.org/abs/1706.03762},
  doi       = {10.48550/arXiv.1706.03762},
}

@inproceedings{ho2020ddpm,
  title = "Denoising Diffusion {"}Probabilistic{"} Models",
  author = "Jonathan Ho AND Ajay Jain and Pieter Abbeel",
  year = "1850",
  url = "arxiv.org/abs/2006.11239",
  booktitle = ieee # " NeurIPS"
}
"#;

    #[test]
    fn parses_entries_and_skips_meta_blocks() {
        let entries = parse_entries(SAMPLE);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_type, "article");
        assert_eq!(entries[0].key, "vaswani2017attention");
        assert_eq!(entries[1].field("booktitle"), Some("ieee NeurIPS"));
    }

    #[test]
    fn title_braces_are_stripped() {
        let entries = parse_entries(SAMPLE);
        let meta = extract_metadata(&entries[0]).unwrap();
        assert_eq!(meta.title, "Attention Is All You Need");
    }

    #[test]
    fn authors_split_on_and() {
        let entries = parse_entries(SAMPLE);
        let first = extract_metadata(&entries[0]).unwrap();
        assert_eq!(
            first.authors,
            vec!["Ashish Vaswani", "Noam Shazeer", "Niki Parmar"]
        );
        let second = extract_metadata(&entries[1]).unwrap();
        assert_eq!(
            second.authors,
            vec!["Jonathan Ho", "Ajay Jain", "Pieter Abbeel"]
        );
    }

    #[test]
    fn authors_keep_last_first_form() {
        assert_eq!(
            split_authors("Doe, John and Smith, Jane"),
            vec!["Doe, John", "Smith, Jane"]
        );
        // "and" inside a name is not a separator.
        assert_eq!(split_authors("Alexandra Anderson"), vec!["Alexandra Anderson"]);
    }

    #[test]
    fn year_outside_range_and_non_http_url_are_dropped() {
        let entries = parse_entries(SAMPLE);
        let meta = extract_metadata(&entries[1]).unwrap();
        assert_eq!(meta.year, None);
        assert_eq!(meta.url, None);

        let meta = extract_metadata(&entries[0]).unwrap();
        assert_eq!(meta.year, Some(2017));
        assert_eq!(meta.url.as_deref(), Some("https://arxiv.org/abs/1706.03762"));
        assert_eq!(meta.doi.as_deref(), Some("10.48550/arXiv.1706.03762"));
    }

    #[test]
    fn missing_title_is_skipped() {
        let entries = parse_entries("@misc{notitle, author = {A. Person}}");
        assert_eq!(entries.len(), 1);
        assert!(extract_metadata(&entries[0]).is_none());
    }

    #[test]
    fn clean_value_unescapes_latex() {
        assert_eq!(clean_value("Sense \\& {Sensibility}\n  100\\%"), "Sense & Sensibility 100%");
    }

    #[test]
    fn parenthesised_entries_are_supported() {
        let entries = parse_entries("@book(knuth1984, title = {The {\\TeX}book}, year = {1984})");
        assert_eq!(entries.len(), 1);
        let meta = extract_metadata(&entries[0]).unwrap();
        assert_eq!(meta.title, "The \\TeXbook");
        assert_eq!(meta.year, Some(1984));
    }

    #[test]
    fn file_parse_dedupes_keys() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            "@article{{a, title={{One}}}}\n@article{{a, title={{Dup}}}}\n@article{{b, title={{Two}}}}"
        )
        .unwrap();
        let papers = parse_bibtex_file(tmp.path()).unwrap();
        let keys: Vec<_> = papers.iter().map(|p| p.bib_key.as_str()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(papers[0].title, "One");
    }

    #[test]
    fn file_without_usable_entries_is_an_error() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "% nothing here").unwrap();
        assert!(matches!(
            parse_bibtex_file(tmp.path()),
            Err(ReviewError::BibTex { .. })
        ));
    }

    #[test]
    fn latin1_file_is_decoded() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"@article{m, title={Caf\xe9 Society}}").unwrap();
        let papers = parse_bibtex_file(tmp.path()).unwrap();
        assert_eq!(papers[0].title, "Café Society");
    }
}
