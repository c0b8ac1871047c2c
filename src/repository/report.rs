//! Directory statistics shared by the `get_info()` reports

use std::collections::BTreeSet;
use std::path::{Component, Path};

use crate::util::join_target;

/// Summary of the directories that hold a set of files
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct DirStats {
    /// Distinct directories containing at least one file (root included)
    pub dirs: usize,
    /// Components below the root of the deepest directory; the root is 0
    pub max_depth: usize,
    /// First deepest directory in path order, relative to the root
    pub deepest: String,
}

impl DirStats {
    /// Gather statistics from `/`-separated file paths relative to a root
    pub fn collect<'a>(relative_files: impl IntoIterator<Item = &'a str>) -> Self {
        let dirs: BTreeSet<&str> = relative_files
            .into_iter()
            .map(|file| file.rsplit_once('/').map_or("", |(dir, _)| dir))
            .collect();

        let mut stats = DirStats {
            dirs: dirs.len(),
            ..Default::default()
        };
        for dir in &dirs {
            let depth = if dir.is_empty() { 0 } else { dir.split('/').count() };
            if depth > stats.max_depth {
                stats.max_depth = depth;
                stats.deepest = (*dir).to_string();
            }
        }
        stats
    }

    /// The deepest directory as a path under `root`
    pub fn deepest_under(&self, root: &Path) -> String {
        if self.deepest.is_empty() {
            root.display().to_string()
        } else {
            root.join(&self.deepest).display().to_string()
        }
    }

    /// Depth of the deepest directory counted from the filesystem root
    pub fn absolute_depth(&self, root: &Path) -> usize {
        let root_depth = root
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count();
        root_depth + self.max_depth
    }

    /// The deepest directory as a path in the target namespace
    pub fn deepest_in_target(&self, target_root: &str) -> String {
        join_target(target_root, &self.deepest)
    }
}

pub(crate) fn bool_label(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}
