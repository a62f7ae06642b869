use std::{
    fs::{self, File},
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use log::{debug, info};
use zip::ZipArchive;

use crate::error::{Result, UpdateError};

/// What `install_archive` changed in the install directory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InstallStats {
    pub dirs_created: usize,
    pub files_written: usize,
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    let file = File::open(path).map_err(UpdateError::io(path))?;
    ZipArchive::new(BufReader::new(file)).map_err(|source| UpdateError::Archive {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve an entry name under `install_dir`, refusing names that escape it.
fn destination(install_dir: &Path, name: &str, enclosed: Option<PathBuf>) -> Result<PathBuf> {
    match enclosed {
        Some(rel) => Ok(install_dir.join(rel)),
        None => Err(UpdateError::UnsafeEntryPath(name.to_string())),
    }
}

/// Delete the files listed by the previous version's archive.
///
/// Only file entries are considered and only files that still exist are
/// removed. Directories are left in place even when they end up empty.
/// Returns the number of files deleted.
pub fn remove_listed_files(archive_path: &Path, install_dir: &Path) -> Result<usize> {
    let mut archive = open_archive(archive_path)?;
    let mut removed = 0;

    for i in 0..archive.len() {
        // Raw access: the old archive is never decompressed.
        let entry = archive
            .by_index_raw(i)
            .map_err(|source| UpdateError::Archive {
                path: archive_path.to_path_buf(),
                source,
            })?;
        if entry.is_dir() {
            continue;
        }

        let path = destination(install_dir, entry.name(), entry.enclosed_name())?;
        if path.is_file() {
            fs::remove_file(&path).map_err(UpdateError::io(&path))?;
            debug!("Removed {}", path.display());
            removed += 1;
        }
    }

    info!(
        "Removed {} file(s) of the previous version from {}",
        removed,
        install_dir.display()
    );
    Ok(removed)
}

/// Extract every entry of `archive_path` over `install_dir`, in archive order.
///
/// A file already present at an entry's destination is deleted before the
/// entry is written. Missing parent directories are created.
pub fn install_archive(archive_path: &Path, install_dir: &Path) -> Result<InstallStats> {
    let mut archive = open_archive(archive_path)?;
    let mut stats = InstallStats::default();

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(|source| UpdateError::Archive {
            path: archive_path.to_path_buf(),
            source,
        })?;
        let path = destination(install_dir, entry.name(), entry.enclosed_name())?;

        if entry.is_dir() {
            if !path.is_dir() {
                fs::create_dir_all(&path).map_err(UpdateError::io(&path))?;
                stats.dirs_created += 1;
            }
            continue;
        }

        if path.is_file() {
            fs::remove_file(&path).map_err(UpdateError::io(&path))?;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(UpdateError::io(parent))?;
        }

        let mut out = File::create(&path).map_err(UpdateError::io(&path))?;
        io::copy(&mut entry, &mut out).map_err(UpdateError::io(&path))?;
        debug!("Extracted {}", path.display());
        stats.files_written += 1;
    }

    info!(
        "Installed {} file(s) and {} new dir(s) into {}",
        stats.files_written,
        stats.dirs_created,
        install_dir.display()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Entry, write_zip};
    use tempfile::tempdir;

    #[test]
    fn removes_listed_files_but_keeps_directories() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir_all(install.join("sub")).unwrap();
        fs::write(install.join("a.txt"), b"a").unwrap();
        fs::write(install.join("sub/b.txt"), b"b").unwrap();
        fs::write(install.join("keep.cfg"), b"user settings").unwrap();

        let old = dir.path().join("v1.zip");
        write_zip(
            &old,
            &[
                Entry::Dir("sub/"),
                Entry::File("a.txt", b"a"),
                Entry::File("sub/b.txt", b"b"),
            ],
        );

        let removed = remove_listed_files(&old, &install).unwrap();

        assert_eq!(removed, 2);
        assert!(!install.join("a.txt").exists());
        assert!(!install.join("sub/b.txt").exists());
        assert!(install.join("sub").is_dir());
        assert!(install.join("keep.cfg").is_file());
    }

    #[test]
    fn files_already_gone_are_skipped() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir(&install).unwrap();
        fs::write(install.join("a.txt"), b"a").unwrap();

        let old = dir.path().join("v1.zip");
        write_zip(
            &old,
            &[Entry::File("a.txt", b"a"), Entry::File("missing.txt", b"m")],
        );

        assert_eq!(remove_listed_files(&old, &install).unwrap(), 1);
    }

    #[test]
    fn installs_dirs_and_overwrites_existing_files() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir_all(install.join("sub")).unwrap();
        fs::write(install.join("sub/c.txt"), b"old contents, longer than new").unwrap();

        let new = dir.path().join("v2.zip");
        write_zip(
            &new,
            &[
                Entry::Dir("sub/"),
                Entry::File("sub/c.txt", b"new"),
                Entry::Dir("data/cache/"),
            ],
        );

        let stats = install_archive(&new, &install).unwrap();

        assert!(install.join("sub").is_dir());
        assert!(install.join("data/cache").is_dir());
        assert_eq!(fs::read(install.join("sub/c.txt")).unwrap(), b"new");
        assert_eq!(
            stats,
            InstallStats {
                dirs_created: 1,
                files_written: 1,
            }
        );
    }

    #[test]
    fn creates_parents_for_files_without_dir_entries() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir(&install).unwrap();

        let new = dir.path().join("v2.zip");
        write_zip(&new, &[Entry::File("lib/plugins/x.so", b"\x7fELF")]);

        install_archive(&new, &install).unwrap();
        assert_eq!(fs::read(install.join("lib/plugins/x.so")).unwrap(), b"\x7fELF");
    }

    #[test]
    fn rejects_entries_escaping_install_dir() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir(&install).unwrap();

        let new = dir.path().join("v2.zip");
        write_zip(&new, &[Entry::File("../escape.txt", b"x")]);

        let err = install_archive(&new, &install).unwrap_err();
        assert!(matches!(err, UpdateError::UnsafeEntryPath(name) if name == "../escape.txt"));
        assert!(!dir.path().join("escape.txt").exists());
    }

    #[test]
    fn old_archive_cannot_delete_outside_install_dir() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir(&install).unwrap();
        fs::write(dir.path().join("victim.txt"), b"v").unwrap();

        let old = dir.path().join("v1.zip");
        write_zip(&old, &[Entry::File("../victim.txt", b"v")]);

        assert!(remove_listed_files(&old, &install).is_err());
        assert!(dir.path().join("victim.txt").is_file());
    }

    #[test]
    fn corrupt_archive_is_an_archive_error() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir(&install).unwrap();
        let bogus = dir.path().join("v2.zip");
        fs::write(&bogus, b"definitely not a zip file").unwrap();

        let err = install_archive(&bogus, &install).unwrap_err();
        assert!(matches!(err, UpdateError::Archive { .. }));
    }

    #[test]
    fn write_failures_name_the_destination() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("install");
        fs::create_dir_all(install.join("app.bin")).unwrap();

        let new = dir.path().join("v2.zip");
        write_zip(&new, &[Entry::File("app.bin", b"two")]);

        let err = install_archive(&new, &install).unwrap_err();
        assert!(err.to_string().contains(&install.join("app.bin").display().to_string()));
        assert!(matches!(err, UpdateError::Io { path, .. } if path == install.join("app.bin")));
    }

    #[test]
    fn missing_archive_names_the_archive() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("gone.zip");

        let err = install_archive(&missing, dir.path()).unwrap_err();
        assert!(err.to_string().contains(&missing.display().to_string()));
        assert!(matches!(
            err,
            UpdateError::Io { ref source, .. } if source.kind() == io::ErrorKind::NotFound
        ));
    }
}
