//! Checks that a packed output directory is internally consistent.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::archive::list_entries;
use crate::error::MaskpackError;
use crate::pack::{
    image_file_name, mask_file_name, DatasetMetadata, METADATA_FILE, TRAIN_SPLIT, VAL_SPLIT,
};

/// One inconsistency found in an output directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VerifyProblem {
    pub path: PathBuf,
    pub message: String,
}

impl fmt::Display for VerifyProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Result of [`verify_output`].
#[derive(Clone, Debug, Default, Serialize)]
pub struct VerifyReport {
    pub dir: PathBuf,
    pub num_train_samples: usize,
    pub num_val_samples: usize,
    /// Files whose size or content was checked.
    pub checked: Vec<PathBuf>,
    pub problems: Vec<VerifyProblem>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    fn problem(&mut self, path: &Path, message: impl Into<String>) {
        self.problems.push(VerifyProblem {
            path: path.to_path_buf(),
            message: message.into(),
        });
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset: {}", self.dir.display())?;
        writeln!(f, "  Training samples:   {}", self.num_train_samples)?;
        writeln!(f, "  Validation samples: {}", self.num_val_samples)?;
        writeln!(f, "  Files checked:      {}", self.checked.len())?;
        if self.problems.is_empty() {
            write!(f, "OK")
        } else {
            writeln!(f, "Problems ({}):", self.problems.len())?;
            for (i, problem) in self.problems.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "  - {problem}")?;
            }
            Ok(())
        }
    }
}

/// Verify the output directory `dir`.
///
/// Problems with the buffers are collected into the report; only a missing
/// or unreadable `info.json` is an error.
pub fn verify_output(dir: &Path) -> Result<VerifyReport, MaskpackError> {
    let meta = DatasetMetadata::read(&dir.join(METADATA_FILE))?;
    let mut report = VerifyReport {
        dir: dir.to_path_buf(),
        num_train_samples: meta.num_train_samples,
        num_val_samples: meta.num_val_samples,
        ..Default::default()
    };

    if meta.width == 0 || meta.height == 0 {
        report.problem(&dir.join(METADATA_FILE), "width and height must be positive");
        return Ok(report);
    }

    for (split, count) in [
        (TRAIN_SPLIT, meta.num_train_samples),
        (VAL_SPLIT, meta.num_val_samples),
    ] {
        check_size(&mut report, &dir.join(image_file_name(split)), meta.image_bytes(count));
        let mask_path = dir.join(mask_file_name(split));
        if check_size(&mut report, &mask_path, meta.mask_bytes(count)) {
            check_mask_bits(&mut report, &mask_path, &meta);
        }
    }

    if let Some(name) = &meta.archive {
        check_archive(&mut report, &dir.join(name));
    }

    Ok(report)
}

/// Returns `true` if the file exists with the expected size.
fn check_size(report: &mut VerifyReport, path: &Path, expected: u64) -> bool {
    report.checked.push(path.to_path_buf());
    match fs::metadata(path) {
        Ok(meta) if meta.len() == expected => true,
        Ok(meta) => {
            report.problem(
                path,
                format!("expected {expected} bytes, found {}", meta.len()),
            );
            false
        }
        Err(err) => {
            report.problem(path, format!("cannot read: {err}"));
            false
        }
    }
}

/// Report the first mask byte carrying bits outside the class bits.
///
/// Reads one sample at a time so large buffers are never held whole.
fn check_mask_bits(report: &mut VerifyReport, path: &Path, meta: &DatasetMetadata) {
    let allowed = meta.allowed_bits();
    let sample_len = meta.mask_bytes(1) as usize;
    if allowed == 0 || sample_len == 0 {
        return;
    }

    let mut reader = match File::open(path) {
        Ok(file) => BufReader::new(file),
        Err(err) => {
            report.problem(path, format!("cannot read: {err}"));
            return;
        }
    };
    let mut sample = vec![0u8; sample_len];
    for index in 0.. {
        match reader.read_exact(&mut sample) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::UnexpectedEof => return,
            Err(err) => {
                report.problem(path, format!("cannot read: {err}"));
                return;
            }
        }
        if let Some(offset) = sample.iter().position(|&b| b & !allowed != 0) {
            report.problem(
                path,
                format!(
                    "byte {} (sample {index}) has bits {:#010b} outside the class bits {:#010b}",
                    index * sample_len + offset,
                    sample[offset],
                    allowed
                ),
            );
            return;
        }
    }
}

fn check_archive(report: &mut VerifyReport, path: &Path) {
    report.checked.push(path.to_path_buf());
    let names = match list_entries(path) {
        Ok(names) => names,
        Err(err) => {
            report.problem(path, err.to_string());
            return;
        }
    };

    let expected = expected_archive_entries();
    if names != expected {
        report.problem(
            path,
            format!("entries are [{}], expected [{}]", names.join(", "), expected.join(", ")),
        );
    }
}

/// Archive entry names in stored order.
pub fn expected_archive_entries() -> Vec<String> {
    vec![
        image_file_name(TRAIN_SPLIT),
        mask_file_name(TRAIN_SPLIT),
        image_file_name(VAL_SPLIT),
        mask_file_name(VAL_SPLIT),
        METADATA_FILE.to_string(),
    ]
}
