//! `.ls8` program image format.
//!
//! A simple text format, one byte per line:
//! - each non-blank line starts with a string of `0`/`1` characters,
//!   parsed base-2 into one byte
//! - anything after a `#` is a comment (whole-line comments included)
//! - blank lines are ignored
//!
//! Bytes load into memory from address 0 in file order.

use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, Default)]
pub struct ProgramImage {
    /// The program bytes, in load order.
    pub bytes: Vec<u8>,
    /// Original source lines (for listings and debugging).
    pub source_lines: Vec<String>,
}

impl ProgramImage {
    /// Create a new empty image.
    pub fn new() -> Self {
        Self {
            bytes: Vec::new(),
            source_lines: Vec::new(),
        }
    }

    /// Add a byte with its source line.
    pub fn push(&mut self, byte: u8, source: &str) {
        self.bytes.push(byte);
        self.source_lines.push(source.to_string());
    }

    /// Number of program bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Parse image text.
    pub fn parse(source: &str) -> Result<Self, ImageError> {
        let mut image = Self::new();

        for (line_num, line) in source.lines().enumerate() {
            // Strip comments, then surrounding whitespace
            let value = match line.split_once('#') {
                Some((code, _comment)) => code.trim(),
                None => line.trim(),
            };

            if value.is_empty() {
                continue;
            }

            let byte = u8::from_str_radix(value, 2).map_err(|_| ImageError::Parse {
                line: line_num + 1,
                message: format!("malformed binary literal `{}`", value),
            })?;

            image.push(byte, line.trim());
        }

        Ok(image)
    }
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ProgramImage, ImageError> {
    let source = std::fs::read_to_string(path.as_ref()).map_err(ImageError::from_io)?;
    ProgramImage::parse(&source)
}

/// Save a program image to disk, one binary literal per line with the
/// byte's address in a trailing comment.
pub fn save_image<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<(), ImageError> {
    let mut file = std::fs::File::create(path.as_ref()).map_err(ImageError::from_io)?;

    writeln!(file, "# LS-8 program image").map_err(ImageError::from_io)?;
    writeln!(file, "# {} bytes", bytes.len()).map_err(ImageError::from_io)?;
    writeln!(file).map_err(ImageError::from_io)?;

    for (addr, byte) in bytes.iter().enumerate() {
        writeln!(file, "{:08b} # {:03}", byte, addr).map_err(ImageError::from_io)?;
    }

    Ok(())
}

/// Errors that can occur while reading or writing program images.
#[derive(Debug, Clone, Error)]
pub enum ImageError {
    /// The program file does not exist. Kept separate from other I/O
    /// failures because the CLI maps it to its own exit code.
    #[error("file not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },
}

impl ImageError {
    fn from_io(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::NotFound {
            ImageError::NotFound
        } else {
            ImageError::Io(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_bytes() {
        let image = ProgramImage::parse("10000010\n00000000\n00001000\n").unwrap();
        assert_eq!(image.bytes, vec![0b1000_0010, 0, 8]);
    }

    #[test]
    fn test_parse_skips_blanks_and_comments() {
        let source = "\
# print8.ls8

10000010 # LDI R0,8
00000000
00001000

01000111 # PRN R0
00000000
00000001 # HLT
";
        let image = ProgramImage::parse(source).unwrap();
        assert_eq!(
            image.bytes,
            vec![0b1000_0010, 0, 8, 0b0100_0111, 0, 0b0000_0001]
        );
    }

    #[test]
    fn test_parse_whole_line_comment_only_file() {
        let image = ProgramImage::parse("# nothing here\n\n").unwrap();
        assert!(image.is_empty());
    }

    #[test]
    fn test_parse_malformed_literal() {
        let err = ProgramImage::parse("10000010\n2\n").unwrap_err();
        match err {
            ImageError::Parse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_non_binary_text() {
        assert!(ProgramImage::parse("LDI R0,8\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_image("no/such/file.ls8").unwrap_err();
        assert!(matches!(err, ImageError::NotFound));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let bytes = vec![0b1000_0010, 0, 8, 0b0000_0001];
        let path = std::env::temp_dir().join("ls8_image_roundtrip.ls8");

        save_image(&path, &bytes).unwrap();
        let image = load_image(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(image.bytes, bytes);
    }
}
