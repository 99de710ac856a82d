//! Folder containers: directory tree → deflate ZIP → V2.0 container, and back
//!
//! Sealing walks the tree (skipping dotfiles, dot-directories, and symlinks),
//! spools a ZIP into an anonymous temp file that is removed when dropped,
//! then seals the archive bytes exactly like a single document.
//!
//! Progress bands: archiving 0–50%, encrypting/writing 50–100% when sealing;
//! reading 0–10%, decrypting 10–50%, extracting 50–100% when opening.

use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use secrecy::SecretString;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::container;
use crate::error::{VaultError, VaultResult};
use crate::kdf::CostParams;
use crate::output::PartialOutput;
use crate::progress::{scaled, Observer};
use crate::vault;

/// Outcome of extracting a folder container.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files written, relative to the destination root
    pub extracted: Vec<PathBuf>,
    /// Archive entry names refused because they would land outside the root
    pub skipped: Vec<String>,
}

/// A regular file selected for archiving.
#[derive(Debug, Clone)]
struct SourceFile {
    path: PathBuf,
    /// `/`-separated path relative to the source root
    archive_name: String,
}

/// Archive and seal a directory tree, returning the container bytes.
pub fn seal_directory(
    source: &Path,
    password: &SecretString,
    cost: &CostParams,
    observer: Observer<'_>,
) -> VaultResult<Vec<u8>> {
    let files = collect_source_files(source)?;
    let archive = archive_files(&files, observer)?;

    observer.checkpoint()?;
    observer.status("Step 2/3: encrypting archive");
    let sealed = vault::seal(&archive, password, cost)?;
    observer.progress(75);
    observer.status("Step 3/3: done");
    observer.progress(100);

    info!(
        source = %source.display(),
        files = files.len(),
        archive_bytes = archive.len(),
        container_bytes = sealed.len(),
        "folder sealed"
    );
    Ok(sealed)
}

/// Archive and seal a directory tree into the file at `output`.
///
/// The output is created before any archiving so an unwritable destination
/// fails fast. On any later error or cancellation the partial file is deleted.
pub fn seal_directory_to_path(
    source: &Path,
    output: &Path,
    password: &SecretString,
    cost: &CostParams,
    observer: Observer<'_>,
) -> VaultResult<()> {
    let files = collect_source_files(source)?;
    let mut out = PartialOutput::create(output)?;

    let archive = archive_files(&files, observer)?;

    observer.checkpoint()?;
    observer.status("Step 2/3: encrypting archive");
    let sealed = vault::seal(&archive, password, cost)?;
    observer.progress(75);

    observer.checkpoint()?;
    observer.status("Step 3/3: writing container");
    out.write_all(&sealed)?;
    out.commit()?;
    observer.progress(100);

    info!(
        source = %source.display(),
        output = %output.display(),
        files = files.len(),
        container_bytes = sealed.len(),
        "folder sealed"
    );
    Ok(())
}

/// Decrypt a folder container and extract it under `destination`.
///
/// Entries whose path would resolve outside `destination` are skipped with a
/// warning and listed in [`ExtractSummary::skipped`]; they never abort the
/// extraction. An entry that fails to extract (for example a bad checksum)
/// is removed before the error is returned; entries already extracted stay.
pub fn open_directory(
    container_bytes: &[u8],
    password: &SecretString,
    cost: &CostParams,
    destination: &Path,
    observer: Observer<'_>,
) -> VaultResult<ExtractSummary> {
    observer.status("Step 1/3: reading container");
    let header = container::decode(container_bytes)?;
    observer.progress(10);

    observer.checkpoint()?;
    observer.status("Step 2/3: decrypting");
    let archive_bytes = vault::open_header(&header, password, cost)?;
    observer.progress(50);

    let mut archive = ZipArchive::new(Cursor::new(archive_bytes.as_slice()))
        .map_err(|e| VaultError::Archive(e.to_string()))?;

    fs::create_dir_all(destination)
        .map_err(|e| VaultError::io(format!("creating {}", destination.display()), e))?;

    observer.status("Step 3/3: extracting files");
    let total = archive.len();
    let mut summary = ExtractSummary::default();

    for i in 0..total {
        observer.checkpoint()?;
        let mut entry = archive
            .by_index(i)
            .map_err(|e| VaultError::Archive(e.to_string()))?;
        let name = entry.name().to_string();

        let Some(relative) = sanitize_entry_path(&name) else {
            warn!(entry = %name, "skipping archive entry outside destination");
            summary.skipped.push(name);
            continue;
        };
        let target = destination.join(&relative);

        if entry.is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| VaultError::io(format!("creating {}", target.display()), e))?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| VaultError::io(format!("creating {}", parent.display()), e))?;
            }
            // Committed only once the entry's CRC has checked out.
            let mut out = PartialOutput::create(&target)?;
            out.copy_from(&mut entry)?;
            out.commit()?;
            debug!(file = %relative.display(), "extracted");
            summary.extracted.push(relative);
        }
        observer.progress(scaled(i + 1, total, 50, 100));
    }

    observer.progress(100);
    info!(
        destination = %destination.display(),
        extracted = summary.extracted.len(),
        skipped = summary.skipped.len(),
        "folder extracted"
    );
    Ok(summary)
}

/// Validate the source and list its regular, non-hidden files.
///
/// Fails with [`VaultError::EmptySource`] before any cryptographic work when
/// nothing would be archived.
fn collect_source_files(source: &Path) -> VaultResult<Vec<SourceFile>> {
    if !source.is_dir() {
        return Err(VaultError::NotADirectory(source.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_files_inner(source, source, &mut files)?;
    files.sort_by(|a, b| a.archive_name.cmp(&b.archive_name));

    if files.is_empty() {
        return Err(VaultError::EmptySource(source.to_path_buf()));
    }
    Ok(files)
}

fn collect_files_inner(root: &Path, dir: &Path, out: &mut Vec<SourceFile>) -> VaultResult<()> {
    let entries =
        fs::read_dir(dir).map_err(|e| VaultError::io(format!("reading dir {}", dir.display()), e))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| VaultError::io(format!("reading dir {}", dir.display()), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| VaultError::io(format!("stat {}", path.display()), e))?;

        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || file_type.is_symlink() {
            continue;
        }

        if file_type.is_dir() {
            collect_files_inner(root, &path, out)?;
        } else if file_type.is_file() {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            out.push(SourceFile {
                archive_name: archive_name(relative),
                path,
            });
        }
    }
    Ok(())
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Deflate `files` into a temp-file-backed ZIP and return its bytes.
fn archive_files(files: &[SourceFile], observer: Observer<'_>) -> VaultResult<Zeroizing<Vec<u8>>> {
    observer.status("Step 1/3: compressing files");

    // Anonymous temp file: unlinked on creation where supported, released on drop.
    let spool =
        tempfile::tempfile().map_err(|e| VaultError::io("creating temporary archive", e))?;
    let mut zip = ZipWriter::new(spool);
    let total = files.len();

    for (i, file) in files.iter().enumerate() {
        observer.checkpoint()?;

        let mut src = File::open(&file.path)
            .map_err(|e| VaultError::io(format!("opening {}", file.path.display()), e))?;
        let len = src
            .metadata()
            .map_err(|e| VaultError::io(format!("stat {}", file.path.display()), e))?
            .len();

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(len > u64::from(u32::MAX));
        zip.start_file(file.archive_name.as_str(), options)
            .map_err(|e| VaultError::Archive(e.to_string()))?;
        io::copy(&mut src, &mut zip)
            .map_err(|e| VaultError::io(format!("compressing {}", file.path.display()), e))?;

        debug!(file = %file.archive_name, bytes = len, "archived");
        observer.progress(scaled(i + 1, total, 0, 50));
    }

    let mut spool = zip
        .finish()
        .map_err(|e| VaultError::Archive(e.to_string()))?;
    spool
        .seek(SeekFrom::Start(0))
        .map_err(|e| VaultError::io("rewinding temporary archive", e))?;

    let mut bytes = Zeroizing::new(Vec::new());
    spool
        .read_to_end(&mut bytes)
        .map_err(|e| VaultError::io("reading temporary archive", e))?;
    Ok(bytes)
}

/// Resolve an archive entry name to a path that stays under the destination.
///
/// Both `/` and `\` count as separators. Absolute names, drive prefixes, and
/// `..` segments that climb above the root yield `None`; `.` and empty
/// segments are dropped, and `..` inside the root collapses normally.
pub fn sanitize_entry_path(name: &str) -> Option<PathBuf> {
    if name.starts_with('/') || name.starts_with('\\') {
        return None;
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in name.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".." => {
                parts.pop()?;
            }
            p if p.contains(':') => return None,
            p => parts.push(p),
        }
    }

    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().collect())
}
