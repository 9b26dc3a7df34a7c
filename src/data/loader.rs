//! CSV Data Loader Module
//! Reads the raw yearly exports (header offset, delimiter and encoding quirks)
//! and turns them into coerced canonical frames, going through the yearly cache.

use super::cache::YearlyCache;
use super::coerce::coerce_types;
use super::mapping::{map_columns, ReadParams, SourceYear};
use encoding_rs::WINDOWS_1252;
use log::{debug, info, warn};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("expected files not found in {}: missing years {years:?}", .dir.display())]
    MissingFiles { dir: PathBuf, years: Vec<i32> },
    #[error(
        "failed to read {} with every encoding: {}",
        .path.display(),
        format_attempts(.attempts)
    )]
    UnreadableEncoding {
        path: PathBuf,
        attempts: Vec<(Encoding, String)>,
    },
    #[error(
        "preprocessed dataset not found ({} / {}); run `cnpq-payments build` first",
        .parquet.display(),
        .csv.display()
    )]
    DatasetNotFound { parquet: PathBuf, csv: PathBuf },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

fn format_attempts(attempts: &[(Encoding, String)]) -> String {
    attempts
        .iter()
        .map(|(enc, err)| format!("{enc}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Text encodings tried, in order, when reading a raw export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf8Sig,
    Latin1,
    Cp1252,
}

impl Encoding {
    pub const FALLBACK_ORDER: [Encoding; 4] = [
        Encoding::Utf8,
        Encoding::Utf8Sig,
        Encoding::Latin1,
        Encoding::Cp1252,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf8Sig => "utf-8-sig",
            Encoding::Latin1 => "latin-1",
            Encoding::Cp1252 => "cp1252",
        }
    }

    /// Strictly decode `bytes`, without replacement characters.
    pub fn decode(self, bytes: &[u8]) -> Result<String, String> {
        let decoded = match self {
            Encoding::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
            Encoding::Utf8Sig => {
                let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
                encoding_rs::UTF_8
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(|s| s.into_owned())
            }
            // ISO-8859-1 maps every byte straight to U+0000..U+00FF
            Encoding::Latin1 => Some(encoding_rs::mem::decode_latin1(bytes).into_owned()),
            Encoding::Cp1252 => WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|s| s.into_owned()),
        };
        decoded.ok_or_else(|| format!("invalid {} byte sequence", self.label()))
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

const DELIMITER_CANDIDATES: [u8; 4] = [b';', b',', b'\t', b'|'];

/// Pick the delimiter occurring most often outside quotes in the header line.
///
/// Ties go to the earlier candidate; `,` when none occurs.
pub fn sniff_delimiter(header_line: &str) -> u8 {
    let mut counts = [0usize; DELIMITER_CANDIDATES.len()];
    let mut in_quotes = false;
    for byte in header_line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
            continue;
        }
        if in_quotes {
            continue;
        }
        if let Some(idx) = DELIMITER_CANDIDATES.iter().position(|&c| c == byte) {
            counts[idx] += 1;
        }
    }

    let mut best = None;
    for (idx, &count) in counts.iter().enumerate() {
        if count > 0 && best.map_or(true, |(_, c)| count > c) {
            best = Some((idx, count));
        }
    }
    best.map(|(idx, _)| DELIMITER_CANDIDATES[idx]).unwrap_or(b',')
}

/// Slice `text` from its `n`-th non-blank line (0-based).
///
/// Blank lines never count toward the offset, so `n = 5` lands on the sixth
/// line that has content.
fn skip_to_header(text: &str, n: usize) -> &str {
    let mut rest = text;
    let mut seen = 0;
    loop {
        let (line, tail) = match rest.find('\n') {
            Some(idx) => (&rest[..idx], &rest[idx + 1..]),
            None => (rest, ""),
        };
        if !line.trim().is_empty() {
            if seen == n {
                return rest;
            }
            seen += 1;
        }
        if tail.is_empty() {
            return "";
        }
        rest = tail;
    }
}

/// Parse decoded CSV text with every column kept as raw String.
pub fn parse_csv_text(text: &str, params: ReadParams) -> PolarsResult<DataFrame> {
    let body = skip_to_header(text, params.header_row);
    let header = body.lines().next().unwrap_or_default();
    if header.trim().is_empty() {
        return Err(PolarsError::NoData(
            format!("no header found at line {}", params.header_row).into(),
        ));
    }
    let delimiter = params
        .delimiter
        .unwrap_or_else(|| sniff_delimiter(header));
    debug!("Using delimiter {:?}", delimiter as char);

    let cursor = Cursor::new(body.as_bytes().to_vec());
    CsvReadOptions::default()
        .with_has_header(true)
        // Zero inference rows reads every column as String
        .with_infer_schema_length(Some(0))
        .map_parse_options(|opts| {
            opts.with_separator(delimiter)
                .with_truncate_ragged_lines(true)
        })
        .into_reader_with_file_handle(cursor)
        .finish()
}

/// Read one raw export, trying each encoding until decoding and parsing succeed.
pub fn read_raw_csv(path: &Path, params: ReadParams) -> Result<DataFrame, LoaderError> {
    let bytes = fs::read(path)?;
    let mut attempts = Vec::new();

    for encoding in Encoding::FALLBACK_ORDER {
        let parsed = encoding
            .decode(&bytes)
            .and_then(|text| parse_csv_text(&text, params).map_err(|e| e.to_string()));
        match parsed {
            Ok(df) => {
                info!(
                    "Read {} as {encoding}: {} rows x {} cols",
                    path.display(),
                    df.height(),
                    df.width()
                );
                return Ok(df);
            }
            Err(err) => {
                warn!("Reading {} as {encoding} failed: {err}", path.display());
                attempts.push((encoding, err));
            }
        }
    }

    Err(LoaderError::UnreadableEncoding {
        path: path.to_path_buf(),
        attempts,
    })
}

/// Locate the three yearly exports in `raw_dir` by file name marker.
pub fn discover_raw_files(raw_dir: &Path) -> Result<BTreeMap<SourceYear, PathBuf>, LoaderError> {
    let mut files: Vec<PathBuf> = fs::read_dir(raw_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut found = BTreeMap::new();
    for path in files {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            continue;
        };
        if let Some(year) = SourceYear::ALL
            .iter()
            .copied()
            .find(|year| name.contains(year.file_marker()))
        {
            found.entry(year).or_insert(path);
        }
    }

    let missing: Vec<i32> = SourceYear::ALL
        .iter()
        .filter(|year| !found.contains_key(year))
        .map(|year| year.year())
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingFiles {
            dir: raw_dir.to_path_buf(),
            years: missing,
        });
    }

    Ok(found)
}

/// Loads yearly exports into canonical frames, reusing the Parquet cache.
pub struct DataLoader {
    cache: YearlyCache,
    read_cache: bool,
}

impl DataLoader {
    pub fn new(cache: YearlyCache) -> Self {
        Self {
            cache,
            read_cache: true,
        }
    }

    /// When false, cached snapshots are ignored and rewritten.
    pub fn with_cache_reads(mut self, enabled: bool) -> Self {
        self.read_cache = enabled;
        self
    }

    /// Raw read + column mapping + coercion, bypassing the cache.
    pub fn load_fresh(&self, year: SourceYear, path: &Path) -> Result<DataFrame, LoaderError> {
        let raw = read_raw_csv(path, year.read_params())?;
        let mapped = map_columns(&raw, year.rename_table())?;
        Ok(coerce_types(&mapped)?)
    }

    /// Canonical frame for one year, from the cache when present.
    pub fn load_year(&self, year: SourceYear, path: &Path) -> Result<DataFrame, LoaderError> {
        if self.read_cache {
            if let Some(df) = self.cache.load(year)? {
                return Ok(df);
            }
        }

        info!("Cache miss for {year}, reading {}", path.display());
        let mut df = self.load_fresh(year, path)?;
        self.cache.save(year, &mut df)?;
        Ok(df)
    }

    /// Discover the exports in `raw_dir` and load every source year, in
    /// concatenation order. Fails before any read when a year is missing.
    pub fn load_all(&self, raw_dir: &Path) -> Result<Vec<(SourceYear, DataFrame)>, LoaderError> {
        discover_raw_files(raw_dir)?
            .into_iter()
            .map(|(year, path)| {
                info!("Source {year}: {}", path.display());
                Ok((year, self.load_year(year, &path)?))
            })
            .collect()
    }
}
