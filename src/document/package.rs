//! ZIP 包展开与重新打包
//!
//! OOXML 文档被解压到一个临时目录，修改过的部件写回该目录，
//! 保存时按原顺序和原压缩方式重新打包。临时目录在保存或出错时都会被删除。

use crate::error::DocumentError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    relative: PathBuf,
    is_dir: bool,
    compression: CompressionMethod,
}

/// An archive expanded into a private temporary directory.
#[derive(Debug)]
pub struct ExpandedPackage {
    dir: TempDir,
    entries: Vec<PackageEntry>,
}

impl ExpandedPackage {
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let dir = tempfile::Builder::new()
            .prefix("office-translator-")
            .tempdir()?;

        let mut entries = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            let name = file.name().to_string();
            let relative = file
                .enclosed_name()
                .ok_or_else(|| DocumentError::UnsafeEntry(name.clone()))?;
            let target = dir.path().join(&relative);
            let is_dir = file.is_dir();

            if is_dir {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&target)?;
                io::copy(&mut file, &mut out)?;
            }

            let compression = match file.compression() {
                CompressionMethod::Stored => CompressionMethod::Stored,
                _ => CompressionMethod::Deflated,
            };
            entries.push(PackageEntry {
                name,
                relative,
                is_dir,
                compression,
            });
        }

        Ok(Self { dir, entries })
    }

    /// Location of the expansion directory.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Names of the file members, in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir)
            .map(|entry| entry.name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, DocumentError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| DocumentError::MissingPart(name.to_string()))?;
        Ok(fs::read(self.dir.path().join(&entry.relative))?)
    }

    /// Replace the content of an existing member.
    pub fn write(&mut self, name: &str, content: &[u8]) -> Result<(), DocumentError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| DocumentError::MissingPart(name.to_string()))?;
        fs::write(self.dir.path().join(&entry.relative), content)?;
        Ok(())
    }

    /// Zip the expansion directory into `output` and remove the directory.
    ///
    /// On failure the directory is still removed when `self` is dropped; a
    /// partially written output file may remain.
    pub fn save(self, output: &Path) -> Result<(), DocumentError> {
        let file = File::create(output)?;
        let mut writer = ZipWriter::new(BufWriter::new(file));

        for entry in &self.entries {
            let options = SimpleFileOptions::default().compression_method(entry.compression);
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }
            writer.start_file(entry.name.as_str(), options)?;
            let mut source = File::open(self.dir.path().join(&entry.relative))?;
            io::copy(&mut source, &mut writer)?;
        }

        let mut inner = writer.finish()?;
        inner.flush()?;
        self.dir.close()?;
        Ok(())
    }

    fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries
            .iter()
            .find(|entry| !entry.is_dir && entry.name == name)
    }
}
