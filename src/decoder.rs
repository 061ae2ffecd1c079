//! Ways of turning an archive file into package bytes.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, warn};

use crate::constants::{DUMP_SUFFIX, OFFZIP_PROGRAM};
use crate::error::{BundleError, Result};
use crate::package::RecordLayout;
use crate::stream;

/// Produces the package bytes of an archive.
///
/// The package parser only sees the returned bytes and the layout they are in.
pub trait PreDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<u8>>;

    /// Record layout of the bytes returned by [`PreDecoder::decode`].
    fn layout(&self) -> RecordLayout;
}

/// Reads the segmented container directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct SegmentedDecoder {
    pub layout: RecordLayout,
}

impl SegmentedDecoder {
    pub fn new(layout: RecordLayout) -> Self {
        Self { layout }
    }
}

impl PreDecoder for SegmentedDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<u8>> {
        stream::read_archive(path)
    }

    fn layout(&self) -> RecordLayout {
        self.layout
    }
}

/// Runs the external offzip tool and reads the dump it leaves next to the input.
#[derive(Debug, Clone)]
pub struct OffzipDecoder {
    program: PathBuf,
}

impl OffzipDecoder {
    pub fn new<P: Into<PathBuf>>(program: P) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Where the dump for `path` is written.
    pub fn dump_path(path: &Path) -> PathBuf {
        let mut dump = path.as_os_str().to_owned();
        dump.push(".");
        dump.push(DUMP_SUFFIX);
        PathBuf::from(dump)
    }
}

impl Default for OffzipDecoder {
    fn default() -> Self {
        Self::new(OFFZIP_PROGRAM)
    }
}

impl PreDecoder for OffzipDecoder {
    fn decode(&self, path: &Path) -> Result<Vec<u8>> {
        let dump_path = Self::dump_path(path);
        debug!("{} -> {}", path.display(), dump_path.display());

        // A dump left over from an earlier run must not pass for this one.
        match std::fs::remove_file(&dump_path) {
            Ok(()) => debug!("removed stale {}", dump_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let status = Command::new(&self.program)
            .args(["-a", "-1", "-o"])
            .arg(path)
            .arg(&dump_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|err| BundleError::Decoder {
                path: path.to_owned(),
                reason: format!("failed to run {}: {}", self.program.display(), err),
            })?;

        if !dump_path.is_file() {
            return Err(BundleError::Decoder {
                path: path.to_owned(),
                reason: format!("{} produced no dump ({})", self.program.display(), status),
            });
        }
        if !status.success() {
            warn!("{} exited with {}, using its dump anyway", self.program.display(), status);
        }

        let data = std::fs::read(&dump_path);
        if let Err(err) = std::fs::remove_file(&dump_path) {
            warn!("could not remove {}: {}", dump_path.display(), err);
        }

        Ok(data?)
    }

    fn layout(&self) -> RecordLayout {
        RecordLayout::Dump
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_path_is_a_sibling() {
        let dump = OffzipDecoder::dump_path(Path::new("bundles/0a1b2c"));
        assert_eq!(dump, PathBuf::from("bundles/0a1b2c.dump"));
    }

    #[test]
    fn missing_program_is_a_decoder_error() {
        let decoder = OffzipDecoder::new("definitely-not-an-installed-offzip");
        let err = decoder.decode(Path::new("nothing")).unwrap_err();
        assert!(matches!(err, BundleError::Decoder { .. }));
        assert_eq!(decoder.layout(), RecordLayout::Dump);
    }

    #[cfg(unix)]
    #[test]
    fn stale_dump_is_not_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle");
        std::fs::write(&path, b"input").unwrap();
        let dump = OffzipDecoder::dump_path(&path);
        std::fs::write(&dump, b"left over from an earlier run").unwrap();

        // `false` exits non-zero without writing anything.
        let err = OffzipDecoder::new("false").decode(&path).unwrap_err();
        assert!(matches!(err, BundleError::Decoder { .. }));
        assert!(!dump.exists());
    }

    #[test]
    fn segmented_decoder_reads_archives() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bundle");
        std::fs::write(&path, stream::encode(b"package bytes").unwrap()).unwrap();

        let decoder = SegmentedDecoder::new(RecordLayout::Narrow);
        assert_eq!(decoder.decode(&path).unwrap(), b"package bytes");
        assert_eq!(decoder.layout(), RecordLayout::Narrow);
    }
}
