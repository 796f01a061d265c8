//! `.pbw` app packages
//!
//! A package is a zip archive with one directory per hardware platform.
//! Newer platforms fall back to the directories of the platforms they are
//! compatible with; the archive root holds legacy aplite builds.

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use tracing::debug;
use zip::ZipArchive;
use zip::result::ZipError;

use crate::error::{Error, Result};

/// App executable file name
pub const EXECUTABLE: &str = "pebble-app.bin";

/// Resource pack file name
pub const RESOURCES: &str = "app_resources.pbpack";

/// Background worker file name
pub const WORKER: &str = "pebble-worker.bin";

/// Artifacts of one platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBundle {
    pub executable: Vec<u8>,
    pub resources: Option<Vec<u8>>,
    pub worker: Option<Vec<u8>>,
}

/// Directories searched for a platform's artifacts, in order
pub fn search_dirs(platform: &str) -> Vec<String> {
    let dirs: &[&str] = match platform {
        "aplite" => &["aplite/", ""],
        "basalt" => &["basalt/"],
        "chalk" => &["chalk/"],
        "diorite" => &["diorite/", "aplite/", ""],
        "emery" => &["emery/"],
        "flint" => &["flint/", "diorite/", "aplite/", ""],
        other => return vec![format!("{}/", other)],
    };
    dirs.iter().map(|dir| dir.to_string()).collect()
}

/// An opened package
pub struct Package<R> {
    archive: ZipArchive<R>,
}

impl Package<File> {
    /// Open a package file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> Package<R> {
    pub fn new(reader: R) -> Result<Self> {
        Ok(Self {
            archive: ZipArchive::new(reader)?,
        })
    }

    /// Collect the artifacts for `platform`
    ///
    /// # Errors
    ///
    /// [`Error::MissingArtifact`] if the platform has no executable.
    pub fn bundle(&mut self, platform: &str) -> Result<AppBundle> {
        let dirs = search_dirs(platform);

        let executable = self
            .find(&dirs, EXECUTABLE)?
            .ok_or_else(|| Error::MissingArtifact(format!("{} for {}", EXECUTABLE, platform)))?;

        Ok(AppBundle {
            executable,
            resources: self.find(&dirs, RESOURCES)?,
            worker: self.find(&dirs, WORKER)?,
        })
    }

    fn find(&mut self, dirs: &[String], name: &str) -> Result<Option<Vec<u8>>> {
        for dir in dirs {
            let path = format!("{}{}", dir, name);
            match self.archive.by_name(&path) {
                Ok(mut file) => {
                    let mut data = Vec::with_capacity(file.size() as usize);
                    file.read_to_end(&mut data)?;
                    debug!(path = %path, size = data.len(), "Found artifact");
                    return Ok(Some(data));
                }
                Err(ZipError::FileNotFound) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
pub(crate) fn build_package(files: &[(&str, &[u8])]) -> std::io::Cursor<Vec<u8>> {
    use std::io::Write;
    use zip::CompressionMethod;
    use zip::write::{SimpleFileOptions, ZipWriter};

    let mut writer = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, data) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    let mut cursor = writer.finish().unwrap();
    cursor.set_position(0);
    cursor
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_search_dirs() {
        assert_eq!(search_dirs("aplite"), vec!["aplite/", ""]);
        assert_eq!(search_dirs("basalt"), vec!["basalt/"]);
        assert_eq!(search_dirs("flint"), vec!["flint/", "diorite/", "aplite/", ""]);
        assert_eq!(search_dirs("gabbro"), vec!["gabbro/"]);
    }

    #[test]
    fn test_bundle_platform_dir() {
        let package = build_package(&[
            ("basalt/pebble-app.bin", &b"exe"[..]),
            ("basalt/app_resources.pbpack", &b"res"[..]),
            ("aplite/pebble-app.bin", &b"old"[..]),
        ]);

        let bundle = Package::new(package).unwrap().bundle("basalt").unwrap();
        assert_eq!(bundle.executable, b"exe");
        assert_eq!(bundle.resources.as_deref(), Some(&b"res"[..]));
        assert_eq!(bundle.worker, None);
    }

    #[test]
    fn test_bundle_falls_back_to_root() {
        let package = build_package(&[
            ("pebble-app.bin", &b"legacy"[..]),
            ("pebble-worker.bin", &b"worker"[..]),
        ]);

        let bundle = Package::new(package).unwrap().bundle("diorite").unwrap();
        assert_eq!(bundle.executable, b"legacy");
        assert_eq!(bundle.worker.as_deref(), Some(&b"worker"[..]));
    }

    #[test]
    fn test_bundle_missing_executable() {
        let package = build_package(&[("aplite/pebble-app.bin", &b"exe"[..])]);

        let err = Package::new(package).unwrap().bundle("chalk").unwrap_err();
        assert!(matches!(err, Error::MissingArtifact(_)));
    }
}
