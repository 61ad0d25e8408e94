//! Embedded JPEG block inside line-oriented text containers.
//!
//! The block looks like:
//!
//! ```text
//! thumbnail JPEG
//! Th /9j/4AAQSkZJRgABAQ...
//! Th ...
//! thumbnail end
//! ```
//!
//! Lines are compared after stripping their terminator. The reader stops at
//! the end marker, so the remainder of the file is never read.

use crate::error::ExtractionError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub const START_MARKER: &str = "thumbnail JPEG";
pub const END_MARKER: &str = "thumbnail end";
pub const LINE_PREFIX: &str = "Th ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    BeforeMarker,
    InsideMarker,
    Done,
}

/// Reads the embedded thumbnail from `path`. `Ok(None)` when there is no block.
pub fn read_embedded_thumbnail(path: &Path) -> Result<Option<Vec<u8>>, ExtractionError> {
    let file = File::open(path).map_err(|source| ExtractionError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    scan(BufReader::new(file), path)
}

/// Scans any buffered reader; `origin` only labels errors.
pub fn scan<R: BufRead>(mut reader: R, origin: &Path) -> Result<Option<Vec<u8>>, ExtractionError> {
    let mut state = ScanState::BeforeMarker;
    let mut payload = Vec::new();
    let mut raw = Vec::new();

    while state != ScanState::Done {
        raw.clear();
        let n = reader
            .read_until(b'\n', &mut raw)
            .map_err(|source| ExtractionError::Io {
                path: origin.to_path_buf(),
                source,
            })?;
        if n == 0 {
            return match state {
                ScanState::BeforeMarker => Ok(None),
                _ => Err(ExtractionError::UnterminatedBlock {
                    path: origin.to_path_buf(),
                }),
            };
        }

        // Bytes outside the block may be arbitrary binary data.
        let line = trim_eol(&raw);
        state = match state {
            ScanState::BeforeMarker if line == START_MARKER.as_bytes() => ScanState::InsideMarker,
            ScanState::BeforeMarker => ScanState::BeforeMarker,
            ScanState::InsideMarker if line == END_MARKER.as_bytes() => ScanState::Done,
            ScanState::InsideMarker => {
                let data = line.strip_prefix(LINE_PREFIX.as_bytes()).unwrap_or(line);
                // Padding inside a data line is not part of the payload.
                payload.extend(data.iter().copied().filter(|b| !b.is_ascii_whitespace()));
                ScanState::InsideMarker
            }
            ScanState::Done => ScanState::Done,
        };
    }

    let bytes = STANDARD.decode(&payload)?;
    Ok(Some(bytes))
}

fn trim_eol(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn scan_str(s: &str) -> Result<Option<Vec<u8>>, ExtractionError> {
        scan(Cursor::new(s.as_bytes().to_vec()), Path::new("mem.wire"))
    }

    #[test]
    fn decodes_block_split_over_lines() {
        let src = "header\nthumbnail JPEG\nTh aGVs\nTh bG8=\nthumbnail end\ntrailer\n";
        assert_eq!(scan_str(src).unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn accepts_crlf_terminators() {
        let src = "thumbnail JPEG\r\nTh aGVsbG8=\r\nthumbnail end\r\n";
        assert_eq!(scan_str(src).unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn padding_in_data_lines_is_ignored() {
        let src = "thumbnail JPEG\nTh aGVs \t\nTh  bG8=  \nthumbnail end\n";
        assert_eq!(scan_str(src).unwrap().as_deref(), Some(&b"hello"[..]));
    }

    #[test]
    fn marker_must_match_whole_line() {
        let src = "  thumbnail JPEG\nTh aGVsbG8=\nthumbnail end\n";
        assert!(scan_str(src).unwrap().is_none());
    }

    #[test]
    fn missing_end_marker_is_an_error() {
        let err = scan_str("thumbnail JPEG\nTh aGVsbG8=\n").unwrap_err();
        assert!(matches!(err, ExtractionError::UnterminatedBlock { .. }));
    }

    #[test]
    fn bad_base64_is_an_error() {
        let err = scan_str("thumbnail JPEG\nTh !!!\nthumbnail end\n").unwrap_err();
        assert!(matches!(err, ExtractionError::Decode(_)));
    }
}
