//! Stage 5: package the output directory as a `.tar.gz`.
//!
//! The archive holds the whole output tree under a single root entry named
//! after the output directory's last component, whatever its full path:
//!
//! ```text
//! /home/me/project/dist/          dist.tar.gz
//! ├── a.html               →      dist/
//! └── b.html                      dist/a.html
//!                                 dist/b.html
//! ```
//!
//! ## Reproducible output
//!
//! Entries are appended in sorted path order and their headers are normalized
//! (mtime 0, uid/gid 0, mode 0644 for files and 0755 for directories). The gzip
//! header carries no timestamp either. The same tree therefore always produces
//! the same bytes, even though the output directory is recreated on every build.
//!
//! ## Failure
//!
//! The archive is written to a temporary file beside the destination and only
//! renamed into place once the gzip stream is complete. On any error the
//! temporary file is deleted and an existing archive at the destination is
//! left as it was.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use walkdir::WalkDir;

const FILE_MODE: u32 = 0o644;
const DIR_MODE: u32 = 0o755;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to walk {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to move archive into place: {0}")]
    Persist(#[from] tempfile::PersistError),
    #[error("Cannot name archive root after {0}")]
    NoRootName(PathBuf),
}

/// What was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Directories and files, including the root directory entry.
    pub entries: usize,
}

/// Write `output_dir` and everything below it to a gzip-compressed tar at
/// `archive_path`.
pub fn create_archive(output_dir: &Path, archive_path: &Path) -> Result<ArchiveSummary, ArchiveError> {
    let root = output_dir
        .file_name()
        .ok_or_else(|| ArchiveError::NoRootName(output_dir.to_path_buf()))?;

    let parent = match archive_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let tmp = NamedTempFile::new_in(parent)?;
    set_archive_mode(tmp.as_file(), archive_path)?;
    let mut builder = tar::Builder::new(GzEncoder::new(tmp, Compression::default()));
    let entries = append_tree(&mut builder, output_dir, Path::new(root))?;

    let mut tmp = builder.into_inner()?.finish()?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(archive_path)?;

    Ok(ArchiveSummary {
        path: archive_path.to_path_buf(),
        entries,
    })
}

/// Temp files are created owner-only. A replaced archive keeps its mode, a new
/// one gets 0644.
fn set_archive_mode(file: &File, archive_path: &Path) -> io::Result<()> {
    match fs::metadata(archive_path) {
        Ok(meta) if meta.is_file() => file.set_permissions(meta.permissions()),
        _ => set_new_file_mode(file),
    }
}

#[cfg(unix)]
fn set_new_file_mode(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(FILE_MODE))
}

#[cfg(not(unix))]
fn set_new_file_mode(_file: &File) -> io::Result<()> {
    Ok(())
}

/// Append `dir` and its contents under `root`, in sorted order.
fn append_tree<W: Write>(
    builder: &mut tar::Builder<W>,
    dir: &Path,
    root: &Path,
) -> Result<usize, ArchiveError> {
    let mut count = 0;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let name = root.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let mut header = normalized_header(tar::EntryType::Directory, DIR_MODE, 0);
            builder.append_data(&mut header, &name, io::empty())?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            let mut header = normalized_header(tar::EntryType::Symlink, FILE_MODE, 0);
            builder.append_link(&mut header, &name, &target)?;
        } else {
            let file = File::open(entry.path())?;
            let size = file.metadata()?.len();
            let mut header = normalized_header(tar::EntryType::Regular, FILE_MODE, size);
            builder.append_data(&mut header, &name, file)?;
        }
        log::debug!("archived {}", name.display());
        count += 1;
    }
    Ok(count)
}

fn normalized_header(kind: tar::EntryType, mode: u32, size: u64) -> tar::Header {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_mode(mode);
    header.set_size(size);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use tempfile::TempDir;

    /// Entry paths and types in archive order.
    pub fn archive_entries(path: &Path) -> Vec<(String, tar::EntryType)> {
        let file = File::open(path).unwrap();
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                let name = e.path().unwrap().to_string_lossy().trim_end_matches('/').to_string();
                (name, e.header().entry_type())
            })
            .collect()
    }

    /// Regular-file entry paths, sorted.
    pub fn archive_files(path: &Path) -> Vec<String> {
        let mut files: Vec<String> = archive_entries(path)
            .into_iter()
            .filter(|(_, t)| t.is_file())
            .map(|(n, _)| n)
            .collect();
        files.sort();
        files
    }

    fn make_tree(root: &Path) -> PathBuf {
        let out = root.join("site").join("dist");
        fs::create_dir_all(out.join("assets")).unwrap();
        fs::write(out.join("b.html"), "<p>b</p>").unwrap();
        fs::write(out.join("a.html"), "<p>a</p>").unwrap();
        fs::write(out.join("assets/style.css"), "body{}").unwrap();
        out
    }

    #[test]
    fn root_entry_is_output_basename() {
        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let archive = tmp.path().join("dist.tar.gz");

        let summary = create_archive(&out, &archive).unwrap();

        let entries = archive_entries(&archive);
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["dist", "dist/a.html", "dist/assets", "dist/assets/style.css", "dist/b.html"]
        );
        assert_eq!(entries[0].1, tar::EntryType::Directory);
        assert_eq!(entries[2].1, tar::EntryType::Directory);
        assert_eq!(summary.entries, 5);
        assert_eq!(summary.path, archive);
    }

    #[test]
    fn file_contents_round_trip() {
        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let archive = tmp.path().join("dist.tar.gz");
        create_archive(&out, &archive).unwrap();

        let dest = tmp.path().join("extracted");
        tar::Archive::new(GzDecoder::new(File::open(&archive).unwrap()))
            .unpack(&dest)
            .unwrap();
        assert_eq!(fs::read_to_string(dest.join("dist/a.html")).unwrap(), "<p>a</p>");
        assert_eq!(fs::read_to_string(dest.join("dist/assets/style.css")).unwrap(), "body{}");
    }

    #[test]
    fn same_tree_gives_identical_bytes() {
        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let first = tmp.path().join("first.tar.gz");
        let second = tmp.path().join("second.tar.gz");

        create_archive(&out, &first).unwrap();
        // Recreate the tree so every mtime differs.
        fs::remove_dir_all(&out).unwrap();
        make_tree(tmp.path());
        create_archive(&out, &second).unwrap();

        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }

    #[test]
    fn headers_are_normalized() {
        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let archive = tmp.path().join("dist.tar.gz");
        create_archive(&out, &archive).unwrap();

        let mut ar = tar::Archive::new(GzDecoder::new(File::open(&archive).unwrap()));
        for entry in ar.entries().unwrap() {
            let entry = entry.unwrap();
            let header = entry.header();
            assert_eq!(header.mtime().unwrap(), 0);
            assert_eq!(header.uid().unwrap(), 0);
            let expected = if header.entry_type().is_dir() { DIR_MODE } else { FILE_MODE };
            assert_eq!(header.mode().unwrap(), expected);
        }
    }

    #[test]
    fn empty_output_holds_only_root() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("dist");
        fs::create_dir_all(&out).unwrap();
        let archive = tmp.path().join("dist.tar.gz");

        let summary = create_archive(&out, &archive).unwrap();

        assert_eq!(summary.entries, 1);
        assert_eq!(archive_entries(&archive), vec![("dist".to_string(), tar::EntryType::Directory)]);
    }

    #[test]
    fn creates_archive_parent_directories() {
        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let archive = tmp.path().join("release/docs/guide.tar.gz");

        create_archive(&out, &archive).unwrap();
        assert!(archive.is_file());
    }

    #[test]
    fn missing_output_dir_leaves_no_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("dist.tar.gz");

        let result = create_archive(&tmp.path().join("dist"), &archive);

        assert!(matches!(result, Err(ArchiveError::Walk(_))));
        assert!(!archive.exists());
        // The temporary file is gone as well.
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_write_keeps_previous_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("dist.tar.gz");
        fs::write(&archive, "previous").unwrap();

        let result = create_archive(&tmp.path().join("dist"), &archive);

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&archive).unwrap(), "previous");
    }

    #[test]
    fn nameless_output_dir_is_error() {
        let tmp = TempDir::new().unwrap();
        let result = create_archive(Path::new(".."), &tmp.path().join("x.tar.gz"));
        assert!(matches!(result, Err(ArchiveError::NoRootName(_))));
    }

    #[cfg(unix)]
    #[test]
    fn new_archive_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let archive = tmp.path().join("dist.tar.gz");

        create_archive(&out, &archive).unwrap();

        let mode = fs::metadata(&archive).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn replaced_archive_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let out = make_tree(tmp.path());
        let archive = tmp.path().join("dist.tar.gz");
        fs::write(&archive, "previous").unwrap();
        fs::set_permissions(&archive, fs::Permissions::from_mode(0o640)).unwrap();

        create_archive(&out, &archive).unwrap();

        let mode = fs::metadata(&archive).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
        assert_eq!(archive_files(&archive).len(), 3);
    }
}
