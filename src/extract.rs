//! Bundle extraction and packing.
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, info, trace, warn};
use tempfile::{NamedTempFile, TempPath};

use crate::decoder::{PreDecoder, SegmentedDecoder};
use crate::error::{BundleError, Result};
use crate::package::{self, Package, RecordKey, RecordLayout, SourceEntry};
use crate::registry::{Naming, TypeRegistry};
use crate::stream;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackOptions {
    pub layout: RecordLayout,
    pub naming: Naming,
}

/// Result of unpacking one archive.
#[derive(Debug, Clone)]
pub struct UnpackSummary {
    pub archive: PathBuf,
    /// Files written, in record order.
    pub files: Vec<PathBuf>,
    /// Records whose embedded hashes disagreed with their key.
    pub mismatches: usize,
}

/// Result of unpacking every archive in a directory.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub unpacked: Vec<UnpackSummary>,
    pub failed: Vec<(PathBuf, BundleError)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.unpacked.len() + self.failed.len()
    }

    /// True when there was at least one archive and none of them unpacked.
    pub fn all_failed(&self) -> bool {
        self.unpacked.is_empty() && !self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackSummary {
    pub records: usize,
    pub package_len: usize,
    pub archive_len: usize,
}

/// Unpack one segmented archive into `out_dir`.
pub fn unpack_archive<P, Q>(
    archive_path: P,
    out_dir: Q,
    registry: &TypeRegistry,
    options: UnpackOptions,
) -> Result<UnpackSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let decoder = SegmentedDecoder::new(options.layout);
    unpack_with(&decoder, archive_path.as_ref(), out_dir.as_ref(), registry, options.naming)
}

/// Unpack one archive, getting its package bytes from `decoder`.
pub fn unpack_with(
    decoder: &dyn PreDecoder,
    archive_path: &Path,
    out_dir: &Path,
    registry: &TypeRegistry,
    naming: Naming,
) -> Result<UnpackSummary> {
    debug!("extracting {:?}", archive_path.display());

    let data = decoder.decode(archive_path)?;
    let package = package::parse(&data, decoder.layout())?;
    let files = write_resources(&package, out_dir, registry, naming)?;

    info!("Unpacked {} resources from {}", files.len(), archive_path.display());

    Ok(UnpackSummary {
        archive: archive_path.to_owned(),
        files,
        mismatches: package.mismatches,
    })
}

/// Unpack every archive directly inside `dir`.
///
/// A failing archive is logged and recorded in the report, the rest carry on.
pub fn unpack_directory<P, Q>(
    dir: P,
    out_dir: Q,
    registry: &TypeRegistry,
    decoder: &dyn PreDecoder,
    naming: Naming,
) -> Result<BatchReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let archives = collect_files(dir)?;
    let total = archives.len();
    let mut report = BatchReport::default();

    for (index, archive_path) in archives.into_iter().enumerate() {
        match unpack_with(decoder, &archive_path, out_dir.as_ref(), registry, naming) {
            Ok(summary) => report.unpacked.push(summary),
            Err(err) => {
                warn!("Skipping {}: {}", archive_path.display(), err);
                report.failed.push((archive_path, err));
            }
        }
        info!("{}/{} archives processed", index + 1, total);
    }

    Ok(report)
}

/// File name of an extracted resource.
pub fn output_file_name(key: RecordKey, registry: &TypeRegistry, naming: Naming) -> String {
    format!("{}.{}", key.name_hash, registry.suffix_for(key.type_hash, naming))
}

/// Write each resource of `package` as its own file.
///
/// Every resource is staged in a temporary file first and only then moved
/// into place. If a move fails, files created by this call are removed and
/// files it replaced are put back, so output of earlier archives survives.
fn write_resources(
    package: &Package,
    out_dir: &Path,
    registry: &TypeRegistry,
    naming: Naming,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;

    let mut staged = Vec::<(PathBuf, NamedTempFile)>::with_capacity(package.resources.len());
    let mut slots = HashMap::<PathBuf, (usize, u64)>::with_capacity(package.resources.len());

    for resource in &package.resources {
        let out_path = out_dir.join(output_file_name(resource.key, registry, naming));
        let type_hash = resource.key.type_hash;

        let mut file = NamedTempFile::new_in(out_dir)?;
        file.write_all(&resource.data())?;

        match slots.entry(out_path) {
            Entry::Occupied(mut slot) => {
                let (index, earlier_type) = *slot.get();
                warn!(
                    "{} is shared by types {:016x} and {:016x}, keeping the last; use --naming type to keep both",
                    slot.key().display(),
                    earlier_type,
                    type_hash
                );
                staged[index].1 = file;
                slot.get_mut().1 = type_hash;
            }
            Entry::Vacant(slot) => {
                let path = slot.key().clone();
                slot.insert((staged.len(), type_hash));
                staged.push((path, file));
            }
        }
    }

    let mut committed = Vec::<(PathBuf, Option<TempPath>)>::with_capacity(staged.len());
    for (out_path, file) in staged {
        match commit(file, &out_path, out_dir) {
            Ok(backup) => {
                trace!("Written to {}", out_path.display());
                committed.push((out_path, backup));
            }
            Err(err) => {
                roll_back(committed);
                return Err(err);
            }
        }
    }

    // Dropping the backups deletes the replaced files.
    Ok(committed.into_iter().map(|(path, _)| path).collect())
}

/// Move `file` to `path`, setting aside any file already there.
fn commit(file: NamedTempFile, path: &Path, dir: &Path) -> Result<Option<TempPath>> {
    let backup = if path.is_file() {
        let backup = NamedTempFile::new_in(dir)?.into_temp_path();
        std::fs::rename(path, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(err) = file.persist(path) {
        if let Some(backup) = backup {
            roll_back(vec![(path.to_owned(), Some(backup))]);
        }
        return Err(err.error.into());
    }

    Ok(backup)
}

/// Undo [`commit`]s, newest first.
fn roll_back(committed: Vec<(PathBuf, Option<TempPath>)>) {
    for (path, backup) in committed.into_iter().rev() {
        let undone = match backup {
            Some(backup) => backup.persist(&path).map_err(|err| err.error),
            None => std::fs::remove_file(&path),
        };
        match undone {
            Ok(()) => debug!("rolled back {}", path.display()),
            Err(err) => warn!("could not roll back {}: {}", path.display(), err),
        }
    }
}

/// Write `bytes` to a temporary file next to `path`, then move it into place.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(parent)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|err| err.error)?;

    Ok(())
}

/// Read every file directly inside `dir` as a package source.
pub fn read_sources<P: AsRef<Path>>(dir: P) -> Result<Vec<SourceEntry>> {
    let mut entries = Vec::new();

    for path in collect_files(dir)? {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| BundleError::InvalidSourceName(path.display().to_string()))?;

        let key = package::parse_source_name(file_name)?;
        let data = std::fs::read(&path)?;
        trace!("{} -> {:016x}/{:016x}", file_name, key.type_hash, key.name_hash);

        entries.push(SourceEntry { key, data });
    }

    Ok(entries)
}

/// Pack every file directly inside `dir` into a segmented archive at `out_path`.
pub fn pack_directory<P, Q>(dir: P, out_path: Q) -> Result<PackSummary>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let dir = dir.as_ref();
    let out_path = out_path.as_ref();
    debug!("packing {:?} into {:?}", dir.display(), out_path.display());

    let entries = read_sources(dir)?;
    let records = entries.len();

    let package_bytes = package::serialize(entries)?;
    let archive = stream::encode(&package_bytes)?;
    write_atomically(out_path, &archive)?;

    info!("Packed {} resources into {}", records, out_path.display());

    Ok(PackSummary {
        records,
        package_len: package_bytes.len(),
        archive_len: archive.len(),
    })
}

/// Regular files directly inside `dir`, sorted by name.
pub fn collect_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let walker = walkdir::WalkDir::new(dir.as_ref())
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();

    let mut out = Vec::new();
    for entry in walker {
        let dir_entry = entry.map_err(std::io::Error::from)?;
        let path = dir_entry.path();
        if dir_entry.file_type().is_file() {
            debug!("Found {}", path.display());
            out.push(path.to_owned());
        } else {
            trace!("Skipping {}", path.display());
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::murmur::hash_str;

    #[test]
    fn file_names_follow_naming() {
        let registry = TypeRegistry::new();
        let key = RecordKey::new(hash_str("lua"), 7);
        assert_eq!(output_file_name(key, &registry, Naming::Extension), "7.lua");
        assert_eq!(output_file_name(key, &registry, Naming::Type), "7.lua");
        assert_eq!(
            output_file_name(key, &registry, Naming::Hash),
            format!("7.{}", hash_str("lua"))
        );

        let unknown = RecordKey::new(31337, 8);
        assert_eq!(output_file_name(unknown, &registry, Naming::Extension), "8.31337");
    }

    #[test]
    fn atomic_write_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1.txt");
        std::fs::write(&path, b"old").unwrap();
        write_atomically(&path, b"new").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn shared_file_name_keeps_the_last_record() {
        let config = hash_str("config");
        let texture = hash_str("texture");
        let bytes = package::serialize(vec![
            SourceEntry::new(texture, 42, b"pixels".to_vec()),
            SourceEntry::new(config, 42, b"x = 1".to_vec()),
        ])
        .unwrap();
        let package = package::parse(&bytes, RecordLayout::Wide).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let registry = TypeRegistry::new();
        let files = write_resources(&package, dir.path(), &registry, Naming::Extension).unwrap();

        // config sorts before texture, so the texture payload wins.
        assert_eq!(files, vec![dir.path().join("42.txt")]);
        assert_eq!(std::fs::read(&files[0]).unwrap(), b"pixels");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn failed_commit_restores_replaced_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("1.lua"), b"earlier").unwrap();
        std::fs::create_dir(dir.path().join("2.lua")).unwrap();

        let lua = hash_str("lua");
        let bytes = package::serialize(vec![
            SourceEntry::new(lua, 0, b"new".to_vec()),
            SourceEntry::new(lua, 1, b"replacement".to_vec()),
            SourceEntry::new(lua, 2, b"blocked".to_vec()),
        ])
        .unwrap();
        let package = package::parse(&bytes, RecordLayout::Wide).unwrap();

        let registry = TypeRegistry::new();
        assert!(write_resources(&package, dir.path(), &registry, Naming::Extension).is_err());

        assert!(!dir.path().join("0.lua").exists());
        assert_eq!(std::fs::read(dir.path().join("1.lua")).unwrap(), b"earlier");
        assert!(dir.path().join("2.lua").is_dir());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn collect_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("1.lua"), b"").unwrap();
        std::fs::write(dir.path().join("b"), b"").unwrap();
        std::fs::write(dir.path().join("a"), b"").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn batch_report_failure_rule() {
        let mut report = BatchReport::default();
        assert!(!report.all_failed());
        report
            .failed
            .push((PathBuf::from("x"), BundleError::CorruptChunk("bad".into())));
        assert!(report.all_failed());
        assert_eq!(report.total(), 1);
    }
}
