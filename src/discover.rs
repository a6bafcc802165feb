//! Annotation discovery under the input roots.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::report::{BuildIssue, BuildReport, IssueCode, Stage};

/// Extension of annotation files.
pub const ANNOTATION_EXTENSION: &str = "json";

/// Collect annotation files below each root.
///
/// Roots are visited in the given order and each root's files are sorted by
/// path, so the result is reproducible. Roots that do not exist are skipped
/// silently; directories that cannot be read are recorded in `report`.
pub fn discover_annotations(roots: &[PathBuf], report: &mut BuildReport) -> Vec<PathBuf> {
    let mut out = Vec::new();

    for root in roots {
        if !root.exists() {
            continue;
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().unwrap_or(root).to_path_buf();
                    report.add(BuildIssue::skip(
                        Stage::Discover,
                        IssueCode::WalkFailed,
                        &path,
                        format!("failed while traversing directory: {err}"),
                    ));
                    continue;
                }
            };

            if entry.file_type().is_file() && has_extension(entry.path(), ANNOTATION_EXTENSION) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        out.extend(files);
    }

    out
}

fn has_extension(path: &Path, wanted: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    #[test]
    fn roots_keep_order_and_files_are_sorted_within_root() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("zeta");
        let second = dir.path().join("alpha");

        touch(&first.join("b.json"));
        touch(&first.join("a.json"));
        touch(&first.join("nested/c.JSON"));
        touch(&first.join("notes.txt"));
        touch(&second.join("a.json"));

        let mut report = BuildReport::default();
        let found = discover_annotations(&[first.clone(), second.clone()], &mut report);

        assert_eq!(
            found,
            vec![
                first.join("a.json"),
                first.join("b.json"),
                first.join("nested/c.JSON"),
                second.join("a.json"),
            ]
        );
        assert!(report.issues.is_empty());
    }

    #[test]
    fn missing_roots_are_skipped_silently() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("x.json"));

        let mut report = BuildReport::default();
        let found = discover_annotations(
            &[dir.path().join("does-not-exist"), dir.path().to_path_buf()],
            &mut report,
        );

        assert_eq!(found, vec![dir.path().join("x.json")]);
        assert!(report.issues.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_loop_is_recorded_and_walk_continues() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        touch(&root.join("a.json"));
        touch(&root.join("sub/b.json"));
        std::os::unix::fs::symlink(&root, root.join("sub/back")).unwrap();

        let mut report = BuildReport::default();
        let found = discover_annotations(std::slice::from_ref(&root), &mut report);

        assert_eq!(found, vec![root.join("a.json"), root.join("sub/b.json")]);
        assert_eq!(report.issues.len(), 1);
        let issue = &report.issues[0];
        assert_eq!(issue.code, IssueCode::WalkFailed);
        assert_eq!(issue.stage, Stage::Discover);
        assert_eq!(issue.path, root.join("sub/back"));
        assert!(issue.message.starts_with("failed while traversing directory"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        assert!(has_extension(Path::new("a/b.JSON"), "json"));
        assert!(!has_extension(Path::new("a/b.json.bak"), "json"));
        assert!(!has_extension(Path::new("a/json"), "json"));
    }
}
