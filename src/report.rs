//! Build report types for tracking skipped inputs and pipeline counts.
//!
//! Per-item problems never abort a build; they are recorded here as
//! [`BuildIssue`]s and printed once the build finishes (or fails).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// A report generated by one `build` run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BuildReport {
    /// Whether this run only planned work.
    pub dry_run: bool,
    /// Annotation files found under the input roots.
    pub discovered: usize,
    /// Valid (annotation, image) pairs.
    pub pairs: usize,
    pub train: SplitCounts,
    pub validation: SplitCounts,
    /// Output directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Files written, in write order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub written: Vec<PathBuf>,
    /// Samples a dry run would pack.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub planned: Vec<PlannedSample>,
    /// Skips and notes, in the order they happened.
    pub issues: Vec<BuildIssue>,
}

impl BuildReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    /// Add an issue to the report.
    pub fn add(&mut self, issue: BuildIssue) {
        self.issues.push(issue);
    }

    /// Count of skipped inputs.
    pub fn skip_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Skip)
            .count()
    }

    /// Count of skips recorded at one stage.
    pub fn skip_count_at(&self, stage: Stage) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Skip && i.stage == stage)
            .count()
    }

    pub fn note_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Note)
            .count()
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|i| i.code == code)
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for issue in &self.issues {
            writeln!(f, "{issue}")?;
        }
        for sample in &self.planned {
            writeln!(f, "{sample}")?;
        }

        writeln!(f, "Annotation files: {}", self.discovered)?;
        writeln!(f, "Total labeled samples: {}", self.pairs)?;
        writeln!(f, "Validation: {}", self.validation.planned)?;
        writeln!(f, "Training: {}", self.train.planned)?;
        if let Some(output) = &self.output {
            writeln!(f, "Output: {}", output.display())?;
        }

        let verb = if self.dry_run { "Would pack" } else { "Packed" };
        writeln!(
            f,
            "{verb} train={}, val={}. Skipped train={}, val={}.",
            self.train.packed,
            self.validation.packed,
            self.train.skipped(),
            self.validation.skipped()
        )?;
        if self.dry_run {
            writeln!(f, "Dry run: nothing written.")?;
        }
        Ok(())
    }
}

/// Per-split sample counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SplitCounts {
    /// Pairs assigned to the split.
    pub planned: usize,
    /// Samples written to the buffers, or that a dry run found packable.
    pub packed: usize,
}

impl SplitCounts {
    pub fn skipped(&self) -> usize {
        self.planned.saturating_sub(self.packed)
    }
}

/// One sample a dry run would pack.
#[derive(Clone, Debug, Serialize)]
pub struct PlannedSample {
    pub split: String,
    pub index: usize,
    pub image: PathBuf,
    pub annotation: PathBuf,
    /// Image size read from the file header, if readable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_size: Option<(u32, u32)>,
}

impl fmt::Display for PlannedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[dry] {} + {} -> {}[{}]",
            self.image.display(),
            self.annotation.display(),
            self.split,
            self.index
        )?;
        if let Some((w, h)) = self.image_size {
            write!(f, " ({w}x{h})")?;
        }
        Ok(())
    }
}

/// A single skipped input or note.
#[derive(Clone, Debug, Serialize)]
pub struct BuildIssue {
    pub severity: IssueSeverity,
    pub stage: Stage,
    pub code: IssueCode,
    pub path: PathBuf,
    pub message: String,
}

impl BuildIssue {
    /// An input that was dropped.
    pub fn skip(stage: Stage, code: IssueCode, path: &Path, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Skip,
            stage,
            code,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Something worth knowing that did not drop the input.
    pub fn note(stage: Stage, code: IssueCode, path: &Path, message: impl Into<String>) -> Self {
        Self {
            severity: IssueSeverity::Note,
            stage,
            code,
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

impl fmt::Display for BuildIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            IssueSeverity::Skip => "skip",
            IssueSeverity::Note => "note",
        };
        write!(f, "[{}] {}: {}", tag, self.path.display(), self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    Skip,
    Note,
}

/// Pipeline stage that produced an issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discover,
    Collect,
    Pack,
}

/// Stable issue codes for programmatic consumption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    /// A directory could not be traversed.
    WalkFailed,
    /// The same annotation file was reached from two roots.
    DuplicateAnnotation,
    /// Annotation JSON could not be read or parsed.
    AnnotationUnreadable,
    /// `imagePath` did not lead to an existing image.
    ImageUnresolved,
    /// Image could not be decoded.
    ImageUnreadable,
    /// Image is not square and not already at the target size.
    NonSquareImage,
    /// Composited mask does not match the target size.
    MaskShapeMismatch,
    /// Declared imageWidth/imageHeight replaced by the real size.
    DeclaredSizeOverridden,
    /// Shapes dropped because their labels did not normalize.
    UnrecognizedLabels,
    /// Any other per-sample failure.
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_severity_and_stage() {
        let mut report = BuildReport::new(false);
        report.add(BuildIssue::skip(
            Stage::Collect,
            IssueCode::ImageUnresolved,
            Path::new("a.json"),
            "cannot resolve imagePath='a.png'",
        ));
        report.add(BuildIssue::note(
            Stage::Pack,
            IssueCode::DeclaredSizeOverridden,
            Path::new("b.json"),
            "declared 10x10, image is 8x8",
        ));

        assert_eq!(report.skip_count(), 1);
        assert_eq!(report.skip_count_at(Stage::Collect), 1);
        assert_eq!(report.skip_count_at(Stage::Pack), 0);
        assert_eq!(report.note_count(), 1);
        assert!(report.has_code(IssueCode::DeclaredSizeOverridden));
    }

    #[test]
    fn issue_display_matches_diagnostic_format() {
        let issue = BuildIssue::skip(
            Stage::Collect,
            IssueCode::AnnotationUnreadable,
            Path::new("data/x.json"),
            "EOF while parsing",
        );
        assert_eq!(issue.to_string(), "[skip] data/x.json: EOF while parsing");
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = BuildReport::new(true);
        report.pairs = 3;
        report.add(BuildIssue::skip(
            Stage::Pack,
            IssueCode::NonSquareImage,
            Path::new("c.json"),
            "image is 10x20",
        ));

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"dry_run\":true"));
        assert!(json.contains("\"severity\":\"skip\""));
        assert!(json.contains("\"code\":\"non_square_image\""));
        assert!(json.contains("\"stage\":\"pack\""));
    }

    #[test]
    fn skipped_never_underflows() {
        let counts = SplitCounts {
            planned: 1,
            packed: 3,
        };
        assert_eq!(counts.skipped(), 0);
    }
}
