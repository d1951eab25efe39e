//! Per-file outcomes and the wire codec used to carry them across an
//! isolation boundary.
//!
//! A work unit reports back through a result slot holding one encoded
//! record. Only the status, the conformance flag and the path cross the
//! boundary; formatted text and diagnostics stay on the worker side, where
//! they are logged at the time they occur.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Field separator for encoded records. Paths may legally contain commas,
/// so fields are delimited with the ASCII unit separator; the path field
/// escapes control bytes, so even a separator inside a path cannot break
/// the framing.
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Outcome of one work unit, as seen by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// The formatter ran to completion. `was_conformant` is true when the
    /// original text already matched the formatted text byte for byte.
    Success { path: PathBuf, was_conformant: bool },
    /// The file could not be read or formatted.
    Failure { path: PathBuf },
    /// The file was excluded by the include-only filter.
    Skipped { path: PathBuf },
}

impl FileOutcome {
    /// Source file this outcome belongs to.
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Success { path, .. }
            | FileOutcome::Failure { path }
            | FileOutcome::Skipped { path } => path,
        }
    }

    /// Encode as `status<US>flag<US>path`, one record per result slot.
    /// The path field is escaped so control bytes and non-UTF-8 bytes
    /// survive the trip; a lossy rendering here would make the aggregator
    /// report paths that do not exist on disk.
    pub fn encode(&self) -> String {
        let (status, conformant) = match self {
            FileOutcome::Success { was_conformant, .. } => ("success", *was_conformant),
            FileOutcome::Failure { .. } => ("failure", false),
            FileOutcome::Skipped { .. } => ("skipped", false),
        };
        format!(
            "{status}{sep}{conformant}{sep}{path}",
            sep = FIELD_SEPARATOR,
            path = encode_path(self.path())
        )
    }

    /// Decode a single record. Any record that does not split into exactly
    /// three fields, or that carries an unknown status token, is a fatal
    /// decode error: it means the transport between worker and host is
    /// broken, not that a file failed.
    pub fn decode(record: &str) -> Result<Self> {
        let record = record.trim_end_matches(['\r', '\n']);
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        if fields.len() != 3 {
            return Err(Error::Decode {
                record: record.to_string(),
                message: format!("expected 3 fields, got {}", fields.len()),
            });
        }

        let path = decode_path(fields[2]).ok_or_else(|| Error::Decode {
            record: record.to_string(),
            message: "invalid path escape".into(),
        })?;
        match fields[0] {
            "success" => {
                let was_conformant = fields[1].parse::<bool>().map_err(|_| Error::Decode {
                    record: record.to_string(),
                    message: format!("invalid conformance flag: {}", fields[1]),
                })?;
                Ok(FileOutcome::Success {
                    path,
                    was_conformant,
                })
            }
            "failure" => Ok(FileOutcome::Failure { path }),
            "skipped" => Ok(FileOutcome::Skipped { path }),
            other => Err(Error::Decode {
                record: record.to_string(),
                message: format!("unknown status token: {other}"),
            }),
        }
    }
}

/// Escape a path for the record's path field. Bytes that would break the
/// record framing (the field separator, carriage return, newline and every
/// other control byte) and bytes that are not valid UTF-8 travel as `\xNN`
/// escapes; a literal backslash becomes `\\`. Everything else passes
/// through verbatim, so ordinary paths stay readable in the slot files.
fn encode_path(path: &Path) -> String {
    let bytes = path.as_os_str().as_encoded_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                push_escaped(&mut out, valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                if let Ok(valid) = std::str::from_utf8(valid) {
                    push_escaped(&mut out, valid);
                }
                let bad = e.error_len().unwrap_or(after.len());
                for byte in &after[..bad] {
                    out.push_str(&format!("\\x{byte:02X}"));
                }
                rest = &after[bad..];
            }
        }
    }
    out
}

fn push_escaped(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '\\' => out.push_str(r"\\"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02X}", c as u32)),
            c => out.push(c),
        }
    }
}

/// Reverse of `encode_path`. `None` marks a malformed escape sequence,
/// which the caller turns into a fatal decode error.
fn decode_path(field: &str) -> Option<PathBuf> {
    let mut bytes = Vec::with_capacity(field.len());
    let mut chars = field.chars();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if c != '\\' {
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next()? {
            '\\' => bytes.push(b'\\'),
            'x' => {
                let mut hex = String::with_capacity(2);
                hex.push(chars.next()?);
                hex.push(chars.next()?);
                bytes.push(u8::from_str_radix(&hex, 16).ok()?);
            }
            _ => return None,
        }
    }
    path_from_bytes(bytes)
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
    use std::os::unix::ffi::OsStringExt;
    Some(PathBuf::from(std::ffi::OsString::from_vec(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> Option<PathBuf> {
    String::from_utf8(bytes).ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_success() {
        let outcome = FileOutcome::Success {
            path: PathBuf::from("/project/src/Main.kt"),
            was_conformant: true,
        };
        assert_eq!(FileOutcome::decode(&outcome.encode()).unwrap(), outcome);

        let outcome = FileOutcome::Success {
            path: PathBuf::from("src/Other.kt"),
            was_conformant: false,
        };
        assert_eq!(FileOutcome::decode(&outcome.encode()).unwrap(), outcome);
    }

    #[test]
    fn test_round_trip_failure_and_skipped() {
        let failure = FileOutcome::Failure {
            path: PathBuf::from("/project/src/Broken.kt"),
        };
        assert_eq!(FileOutcome::decode(&failure.encode()).unwrap(), failure);

        let skipped = FileOutcome::Skipped {
            path: PathBuf::from("/project/src/Ignored.kt"),
        };
        assert_eq!(FileOutcome::decode(&skipped.encode()).unwrap(), skipped);
    }

    #[test]
    fn test_round_trip_path_with_comma() {
        let outcome = FileOutcome::Success {
            path: PathBuf::from("/project/weird, dir/Main.kt"),
            was_conformant: true,
        };
        assert_eq!(FileOutcome::decode(&outcome.encode()).unwrap(), outcome);
    }

    #[cfg(unix)]
    #[test]
    fn test_round_trip_non_utf8_path() {
        use std::os::unix::ffi::OsStringExt;
        let path = PathBuf::from(std::ffi::OsString::from_vec(b"/p\xFF.kt".to_vec()));
        let outcome = FileOutcome::Success {
            path,
            was_conformant: true,
        };
        assert_eq!(FileOutcome::decode(&outcome.encode()).unwrap(), outcome);
    }

    #[test]
    fn test_round_trip_path_with_control_bytes() {
        // Newlines and even the field separator are legal in Unix paths;
        // the escape layer keeps them from breaking the record framing.
        let path = PathBuf::from(format!("/p/line\nbreak{FIELD_SEPARATOR}end.kt"));
        let outcome = FileOutcome::Failure { path };
        let encoded = outcome.encode();
        assert_eq!(encoded.matches(FIELD_SEPARATOR).count(), 2);
        assert!(!encoded.contains('\n'));
        assert_eq!(FileOutcome::decode(&encoded).unwrap(), outcome);
    }

    #[test]
    fn test_round_trip_path_with_backslash() {
        let outcome = FileOutcome::Skipped {
            path: PathBuf::from(r"/p/back\slash.kt"),
        };
        assert_eq!(FileOutcome::decode(&outcome.encode()).unwrap(), outcome);
    }

    #[test]
    fn test_decode_rejects_malformed_path_escape() {
        let sep = FIELD_SEPARATOR;
        for field in [r"\x", r"\xZZ", r"\q", "trailing\\"] {
            let err =
                FileOutcome::decode(&format!("success{sep}true{sep}{field}")).unwrap_err();
            assert!(err.to_string().contains("invalid path escape"), "{field}");
        }
    }

    #[test]
    fn test_decode_rejects_wrong_field_count() {
        let sep = FIELD_SEPARATOR;
        assert!(FileOutcome::decode("success").is_err());
        assert!(FileOutcome::decode(&format!("success{sep}true")).is_err());
        assert!(FileOutcome::decode(&format!("success{sep}true{sep}a{sep}b")).is_err());
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let sep = FIELD_SEPARATOR;
        let err = FileOutcome::decode(&format!("exploded{sep}false{sep}/a.kt")).unwrap_err();
        assert!(err.to_string().contains("unknown status token"));
    }

    #[test]
    fn test_decode_rejects_bad_flag() {
        let sep = FIELD_SEPARATOR;
        assert!(FileOutcome::decode(&format!("success{sep}maybe{sep}/a.kt")).is_err());
    }

    #[test]
    fn test_decode_tolerates_trailing_newline() {
        let sep = FIELD_SEPARATOR;
        let decoded = FileOutcome::decode(&format!("skipped{sep}false{sep}/a.kt\n")).unwrap();
        assert_eq!(
            decoded,
            FileOutcome::Skipped {
                path: PathBuf::from("/a.kt")
            }
        );
    }
}
