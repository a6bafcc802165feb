//! Pairing annotation files with their images.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::annotation::read_annotation;
use crate::discover::discover_annotations;
use crate::report::{BuildIssue, BuildReport, IssueCode, Stage};
use crate::resolve::ImageResolver;

/// An annotation file and the image it labels.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    pub annotation: PathBuf,
    pub image: PathBuf,
}

impl Pair {
    pub fn new(annotation: impl Into<PathBuf>, image: impl Into<PathBuf>) -> Self {
        Self {
            annotation: annotation.into(),
            image: image.into(),
        }
    }
}

/// Build pairs for already-discovered annotation files.
///
/// Unparseable annotations and unresolvable image references are recorded
/// in `report` and skipped. Order follows `annotation_paths`; an annotation
/// reached twice is paired once.
pub fn collect_pairs(
    annotation_paths: &[PathBuf],
    resolver: &ImageResolver,
    report: &mut BuildReport,
) -> Vec<Pair> {
    let mut seen: HashSet<&Path> = HashSet::new();
    let mut pairs = Vec::with_capacity(annotation_paths.len());

    for path in annotation_paths {
        if !seen.insert(path.as_path()) {
            report.add(BuildIssue::note(
                Stage::Collect,
                IssueCode::DuplicateAnnotation,
                path,
                "reached from more than one input root; using it once",
            ));
            continue;
        }

        let annotation = match read_annotation(path) {
            Ok(annotation) => annotation,
            Err(err) => {
                report.add(BuildIssue::skip(
                    Stage::Collect,
                    IssueCode::AnnotationUnreadable,
                    path,
                    err.to_string(),
                ));
                continue;
            }
        };

        match resolver.resolve(path, &annotation.image_path) {
            Some(image) => pairs.push(Pair::new(path.clone(), image)),
            None => report.add(BuildIssue::skip(
                Stage::Collect,
                IssueCode::ImageUnresolved,
                path,
                format!("cannot resolve imagePath={:?}", annotation.image_path),
            )),
        }
    }

    pairs
}

/// Discover annotations under `roots` and pair them with images.
pub fn collect_pairs_from_roots(
    roots: &[PathBuf],
    resolver: &ImageResolver,
    report: &mut BuildReport,
) -> Vec<Pair> {
    let annotation_paths = discover_annotations(roots, report);
    report.discovered = annotation_paths.len();
    collect_pairs(&annotation_paths, resolver, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bad_annotations_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("good.json"), r#"{"imagePath": "good.png", "shapes": []}"#).unwrap();
        fs::write(root.join("good.png"), b"png").unwrap();
        fs::write(root.join("broken.json"), "{ not json").unwrap();
        fs::write(root.join("orphan.json"), r#"{"imagePath": "nope.png", "shapes": []}"#).unwrap();

        let mut report = BuildReport::default();
        let pairs = collect_pairs_from_roots(&[root.to_path_buf()], &ImageResolver::default(), &mut report);

        assert_eq!(report.discovered, 3);
        assert_eq!(pairs, vec![Pair::new(root.join("good.json"), root.join("good.png"))]);
        assert_eq!(report.skip_count_at(Stage::Collect), 2);
        assert!(report.has_code(IssueCode::AnnotationUnreadable));
        assert!(report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::ImageUnresolved
                && i.message == "cannot resolve imagePath=\"nope.png\""));
    }

    #[test]
    fn overlapping_roots_pair_each_annotation_once() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("x.json"), r#"{"imagePath": "x.png", "shapes": []}"#).unwrap();
        fs::write(nested.join("x.png"), b"png").unwrap();

        let mut report = BuildReport::default();
        let pairs = collect_pairs_from_roots(
            &[dir.path().to_path_buf(), nested.clone()],
            &ImageResolver::default(),
            &mut report,
        );

        assert_eq!(pairs.len(), 1);
        assert!(report.has_code(IssueCode::DuplicateAnnotation));
        assert_eq!(report.skip_count(), 0);
    }
}
