use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use globset::{GlobBuilder, GlobMatcher};
use ignore::WalkBuilder;
use madl_segmenter::Language;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A candidate source file under the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Root-relative, `/`-separated; recorded in unit ids
    pub relative: String,
    pub language: Language,
}

/// One exclusion entry
#[derive(Debug, Clone)]
enum Exclusion {
    Substring(String),
    Glob(GlobMatcher),
}

impl Exclusion {
    fn new(pattern: &str) -> Result<Self> {
        if !pattern.contains(['*', '?', '[', '{']) {
            return Ok(Self::Substring(pattern.to_string()));
        }
        let glob = GlobBuilder::new(pattern)
            .literal_separator(false)
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("exclude {pattern:?}: {e}")))?;
        Ok(Self::Glob(glob.compile_matcher()))
    }

    /// Substrings only prune directories; globs see every entry
    fn matches(&self, relative: &str, is_dir: bool) -> bool {
        match self {
            Self::Substring(needle) => is_dir && relative.contains(needle.as_str()),
            Self::Glob(glob) => glob.is_match(relative),
        }
    }
}

/// Enumerates source files under a root, filtered by extension and exclusions
pub struct TreeWalker {
    root: PathBuf,
    extensions: BTreeMap<String, Language>,
    exclusions: Arc<Vec<Exclusion>>,
    max_file_size: u64,
    respect_gitignore: bool,
}

impl TreeWalker {
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        let exclusions = config
            .exclude
            .iter()
            .map(|pattern| pattern.trim())
            .filter(|pattern| !pattern.is_empty())
            .map(Exclusion::new)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            root: config.root.clone(),
            extensions: config.extensions.clone(),
            exclusions: Arc::new(exclusions),
            max_file_size: config.max_file_size,
            respect_gitignore: config.respect_gitignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree; output is sorted by relative path
    pub fn walk(&self) -> Vec<SourceFile> {
        let mut files = Vec::new();

        let root = self.root.clone();
        let exclusions = Arc::clone(&self.exclusions);
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(self.respect_gitignore)
            .parents(self.respect_gitignore)
            .ignore(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false);
        builder.filter_entry(move |entry| {
            let relative = relative_path(entry.path(), &root);
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            relative.is_empty() || !exclusions.iter().any(|e| e.matches(&relative, is_dir))
        });

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }

                    let path = entry.path();
                    let Some(language) = self.language_for(path) else {
                        continue;
                    };

                    if let Ok(meta) = entry.metadata() {
                        if meta.len() > self.max_file_size {
                            log::debug!(
                                "Skipping large file {} ({} bytes > {})",
                                path.display(),
                                meta.len(),
                                self.max_file_size
                            );
                            continue;
                        }
                    }

                    files.push(SourceFile {
                        path: path.to_path_buf(),
                        relative: relative_path(path, &self.root),
                        language,
                    });
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        log::info!("Found {} source files", files.len());
        files
    }

    fn language_for(&self, path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.extensions.get(&ext).copied()
    }
}

fn relative_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn walk(root: &Path, configure: impl FnOnce(&mut PipelineConfig)) -> Vec<String> {
        let mut config = PipelineConfig::for_root(root);
        configure(&mut config);
        TreeWalker::from_config(&config)
            .unwrap()
            .walk()
            .into_iter()
            .map(|f| f.relative)
            .collect()
    }

    #[test]
    fn maps_extensions_and_sorts() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("src")).unwrap();
        fs::write(temp.path().join("src/b.go"), "package b\n").unwrap();
        fs::write(temp.path().join("a.py"), "x = 1\n").unwrap();
        fs::write(temp.path().join("README.md"), "# hi\n").unwrap();

        let files = TreeWalker::from_config(&PipelineConfig::for_root(temp.path()))
            .unwrap()
            .walk();
        assert_eq!(
            files.iter().map(|f| f.relative.as_str()).collect::<Vec<_>>(),
            vec!["a.py", "src/b.go"]
        );
        assert_eq!(files[0].language, Language::Python);
        assert_eq!(files[1].language, Language::Go);
    }

    #[test]
    fn skips_default_exclusions_relative_to_root() {
        let temp = tempdir().unwrap();
        let project = temp.path().join("build-tools");
        fs::create_dir_all(project.join("node_modules/pkg")).unwrap();
        fs::create_dir_all(project.join("venv/lib")).unwrap();
        fs::write(project.join("node_modules/pkg/index.js"), "function f() {}\n").unwrap();
        fs::write(project.join("venv/lib/site.py"), "def f():\n    pass\n").unwrap();
        fs::write(project.join("main.py"), "def main():\n    pass\n").unwrap();

        // The root's own name contains "build"; only paths below it are matched
        assert_eq!(walk(&project, |_| {}), vec!["main.py"]);
    }

    #[test]
    fn substring_exclusions_skip_directories_not_files() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("dist")).unwrap();
        fs::create_dir_all(temp.path().join("src/build")).unwrap();
        fs::write(temp.path().join("dist/bundle.js"), "function f() {}\n").unwrap();
        fs::write(temp.path().join("src/build/gen.py"), "def g():\n    pass\n").unwrap();
        fs::write(temp.path().join("distance.py"), "def d(a, b):\n    return a - b\n").unwrap();
        fs::write(temp.path().join("src/builder.py"), "def b(x):\n    return x\n").unwrap();

        assert_eq!(walk(temp.path(), |_| {}), vec!["distance.py", "src/builder.py"]);
    }

    #[test]
    fn glob_exclusions() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("pkg")).unwrap();
        fs::write(temp.path().join("pkg/api.py"), "").unwrap();
        fs::write(temp.path().join("pkg/api_test.py"), "").unwrap();

        let files = walk(temp.path(), |c| c.exclude = vec!["**/*_test.py".to_string()]);
        assert_eq!(files, vec!["pkg/api.py"]);

        let bad = PipelineConfig {
            exclude: vec!["[".to_string()],
            ..PipelineConfig::for_root(temp.path())
        };
        assert!(TreeWalker::from_config(&bad).is_err());
    }

    #[test]
    fn gitignore_and_hidden_toggle() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("generated")).unwrap();
        fs::create_dir_all(temp.path().join(".hidden")).unwrap();
        fs::write(temp.path().join(".gitignore"), "/generated\n").unwrap();
        fs::write(temp.path().join("generated/out.py"), "").unwrap();
        fs::write(temp.path().join(".hidden/h.py"), "").unwrap();
        fs::write(temp.path().join("keep.py"), "").unwrap();

        assert_eq!(walk(temp.path(), |_| {}), vec!["keep.py"]);
        assert_eq!(
            walk(temp.path(), |c| c.respect_gitignore = false),
            vec![".hidden/h.py", "generated/out.py", "keep.py"]
        );
    }

    #[test]
    fn skips_large_files() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("big.py"), "x = 1\n".repeat(100)).unwrap();
        fs::write(temp.path().join("small.py"), "x = 1\n").unwrap();

        assert_eq!(walk(temp.path(), |c| c.max_file_size = 64), vec!["small.py"]);
    }
}
