//! Zip archive of the packed output.
//!
//! Entries are written in the order given, deflated at level 9, with a
//! fixed timestamp so two runs over the same inputs produce the same
//! archive.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::MaskpackError;

const COMPRESSION_LEVEL: i64 = 9;

/// A file to store and the name it gets inside the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub path: PathBuf,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// Write `entries`, in order, to a new archive at `archive_path`.
pub fn write_archive(archive_path: &Path, entries: &[ArchiveEntry]) -> Result<(), MaskpackError> {
    let zip_err = |source| MaskpackError::ArchiveWrite {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::create(archive_path).map_err(MaskpackError::Io)?;
    let mut writer = ZipWriter::new(BufWriter::new(file));

    for entry in entries {
        let mut source = File::open(&entry.path).map_err(MaskpackError::Io)?;
        let size = source.metadata().map_err(MaskpackError::Io)?.len();

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(COMPRESSION_LEVEL))
            .last_modified_time(DateTime::default())
            .large_file(size >= u64::from(u32::MAX));

        writer
            .start_file(entry.name.as_str(), options)
            .map_err(zip_err)?;
        io::copy(&mut source, &mut writer).map_err(MaskpackError::Io)?;
    }

    writer.finish().map_err(zip_err)?;
    Ok(())
}

/// Entry names of an existing archive, in stored order.
pub fn list_entries(archive_path: &Path) -> Result<Vec<String>, MaskpackError> {
    let zip_err = |source| MaskpackError::ArchiveRead {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(MaskpackError::Io)?;
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(zip_err)?;

    (0..archive.len())
        .map(|i| {
            archive
                .by_index(i)
                .map(|entry| entry.name().to_string())
                .map_err(zip_err)
        })
        .collect()
}
