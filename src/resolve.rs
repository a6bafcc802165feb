//! Locating the image an annotation refers to.
//!
//! `imagePath` values are often stale: the annotation was moved, the image
//! was re-encoded, or the path was written on another machine. Resolution is
//! an ordered list of [`ResolveStrategy`] values; the first strategy that
//! names an existing file wins.

use std::path::{Path, PathBuf};

/// Image extensions tried by [`ResolveStrategy::StemSearch`] by default.
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "tif", "tiff"];

/// One way of turning an `imagePath` into a file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveStrategy {
    /// `imagePath` relative to the annotation's directory.
    RelativeToAnnotation,
    /// `imagePath` as an absolute path.
    Absolute,
    /// `<stem>.<ext>` next to the annotation, where the stem comes from
    /// `imagePath` or, when that is empty, from the annotation file.
    StemSearch { extensions: Vec<String> },
}

impl ResolveStrategy {
    pub fn stem_search<S: AsRef<str>>(extensions: &[S]) -> Self {
        ResolveStrategy::StemSearch {
            extensions: extensions
                .iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Try this strategy alone.
    pub fn try_resolve(&self, annotation_path: &Path, image_ref: &str) -> Option<PathBuf> {
        let dir = annotation_path.parent().unwrap_or_else(|| Path::new(""));
        let image_ref = portable_ref(image_ref);

        match self {
            ResolveStrategy::RelativeToAnnotation => {
                if image_ref.is_empty() {
                    return None;
                }
                existing_file(dir.join(&image_ref))
            }
            ResolveStrategy::Absolute => {
                let candidate = PathBuf::from(&image_ref);
                if candidate.is_absolute() {
                    existing_file(candidate)
                } else {
                    None
                }
            }
            ResolveStrategy::StemSearch { extensions } => {
                let stem = if image_ref.is_empty() {
                    annotation_path.file_stem()?
                } else {
                    Path::new(&image_ref).file_stem()?
                };
                let stem = stem.to_string_lossy();

                extensions
                    .iter()
                    .find_map(|ext| existing_file(dir.join(format!("{stem}.{ext}"))))
            }
        }
    }
}

/// Backslash-separated references come from annotations saved on Windows.
fn portable_ref(image_ref: &str) -> String {
    let trimmed = image_ref.trim();
    if cfg!(windows) {
        trimmed.to_string()
    } else {
        trimmed.replace('\\', "/")
    }
}

fn existing_file(candidate: PathBuf) -> Option<PathBuf> {
    candidate.is_file().then_some(candidate)
}

/// Ordered resolution strategies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageResolver {
    strategies: Vec<ResolveStrategy>,
}

impl Default for ImageResolver {
    fn default() -> Self {
        Self::with_extensions(DEFAULT_IMAGE_EXTENSIONS)
    }
}

impl ImageResolver {
    pub fn new(strategies: Vec<ResolveStrategy>) -> Self {
        Self { strategies }
    }

    /// The standard strategy list with a custom stem-search extension list.
    pub fn with_extensions<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self::new(vec![
            ResolveStrategy::RelativeToAnnotation,
            ResolveStrategy::Absolute,
            ResolveStrategy::stem_search(extensions),
        ])
    }

    pub fn strategies(&self) -> &[ResolveStrategy] {
        &self.strategies
    }

    /// Resolve `image_ref` for the annotation at `annotation_path`.
    pub fn resolve(&self, annotation_path: &Path, image_ref: &str) -> Option<PathBuf> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.try_resolve(annotation_path, image_ref))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"img").unwrap();
    }

    #[test]
    fn relative_reference_wins() {
        let dir = tempfile::tempdir().unwrap();
        let ann = dir.path().join("labels/a.json");
        touch(&dir.path().join("images/a.png"));
        touch(&dir.path().join("labels/a.png"));

        let resolved = ImageResolver::default().resolve(&ann, "../images/a.png");
        assert_eq!(resolved, Some(dir.path().join("labels/../images/a.png")));
    }

    #[test]
    fn absolute_reference() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("elsewhere/pic.jpg");
        touch(&image);
        let ann = dir.path().join("labels/a.json");

        let resolved = ResolveStrategy::Absolute.try_resolve(&ann, image.to_str().unwrap());
        assert_eq!(resolved, Some(image.clone()));
        assert_eq!(ResolveStrategy::Absolute.try_resolve(&ann, "pic.jpg"), None);
    }

    #[test]
    fn falls_back_to_stem_with_other_extension() {
        let dir = tempfile::tempdir().unwrap();
        let ann = dir.path().join("a.json");
        touch(&dir.path().join("frame_7.jpeg"));

        let resolved = ImageResolver::default().resolve(&ann, "C:\\old\\place\\frame_7.png");
        assert_eq!(resolved, Some(dir.path().join("frame_7.jpeg")));
    }

    #[test]
    fn empty_reference_uses_annotation_stem() {
        let dir = tempfile::tempdir().unwrap();
        let ann = dir.path().join("shot_01.json");
        touch(&dir.path().join("shot_01.webp"));

        let resolved = ImageResolver::default().resolve(&ann, "");
        assert_eq!(resolved, Some(dir.path().join("shot_01.webp")));
    }

    #[test]
    fn unresolvable_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let ann = dir.path().join("a.json");
        fs::create_dir_all(dir.path().join("a.png")).unwrap();

        assert_eq!(ImageResolver::default().resolve(&ann, "missing.png"), None);
        assert_eq!(ImageResolver::default().resolve(&ann, ""), None);
    }

    #[test]
    fn custom_extension_list() {
        let dir = tempfile::tempdir().unwrap();
        let ann = dir.path().join("a.json");
        touch(&dir.path().join("a.png"));
        touch(&dir.path().join("a.jpg"));

        let resolver = ImageResolver::with_extensions(&[".jpg", "png"]);
        assert_eq!(resolver.resolve(&ann, ""), Some(dir.path().join("a.jpg")));
        assert_eq!(
            resolver.strategies()[2],
            ResolveStrategy::StemSearch {
                extensions: vec!["jpg".to_string(), "png".to_string()]
            }
        );
    }
}
