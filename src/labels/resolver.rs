use std::path::{Path, PathBuf};

/// Locates the label file belonging to an image.
///
/// Upstream image names sometimes carry a doubled extension (`x.jpg.jpg`) while
/// the label was saved under the single or bare stem, so three names are tried
/// in order and the first regular file wins:
///
/// 1. `<image_name>.txt`
/// 2. `<image_name minus one extension>.txt`
/// 3. `<image_name minus two extensions>.txt`
#[derive(Debug, Clone)]
pub struct LabelResolver {
    labels_dir: PathBuf,
}

impl LabelResolver {
    pub fn new(labels_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
        }
    }

    pub fn labels_dir(&self) -> &Path {
        &self.labels_dir
    }

    /// Candidate label paths in lookup order. Repeated names are listed once.
    pub fn candidates(&self, image_name: &str) -> Vec<PathBuf> {
        let once = strip_extension(image_name);
        let twice = once.as_deref().and_then(strip_extension);

        let mut names = vec![image_name.to_string()];
        names.extend(once);
        names.extend(twice);
        names.dedup();

        names
            .into_iter()
            .map(|name| self.labels_dir.join(format!("{name}.txt")))
            .collect()
    }

    pub fn resolve(&self, image_name: &str) -> Option<PathBuf> {
        self.candidates(image_name)
            .into_iter()
            .find(|candidate| candidate.is_file())
    }
}

/// File stem of the last path component, i.e. the name with one extension removed.
fn strip_extension(name: &str) -> Option<String> {
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}
