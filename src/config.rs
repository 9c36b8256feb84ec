use crate::parser::ParseOptions;
use crate::readtime::{WordCountMode, DEFAULT_WORDS_PER_MINUTE};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// The name of the optional project file.
pub const PROJECT_FILE: &str = "sitegen.yaml";

#[derive(Deserialize)]
struct WordsPerMinute(u64);
impl Default for WordsPerMinute {
    fn default() -> Self {
        WordsPerMinute(DEFAULT_WORDS_PER_MINUTE)
    }
}

/// The contents of a `sitegen.yaml` file. Every key is optional; relative
/// paths are resolved against the directory holding the file.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Project {
    source_directory: Option<PathBuf>,
    output_directory: Option<PathBuf>,
    index_file: Option<PathBuf>,
    post_template: Option<PathBuf>,
    home_template: Option<PathBuf>,
    posts_url: Option<String>,

    #[serde(default)]
    words_per_minute: WordsPerMinute,

    #[serde(default)]
    word_count: WordCountMode,

    #[serde(default)]
    strict_frontmatter: bool,

    #[serde(default)]
    keep_going: bool,

    threads: Option<usize>,
}

/// Settings given on the command line. These win over the project file.
#[derive(Default, Debug)]
pub struct Overrides {
    pub threads: Option<usize>,
    pub word_count: Option<WordCountMode>,
    pub keep_going: bool,
    pub strict_frontmatter: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub source_directory: PathBuf,
    pub output_directory: PathBuf,
    pub index_file: PathBuf,
    pub post_template: PathBuf,
    pub home_template: PathBuf,
    pub posts_url: String,
    pub words_per_minute: u64,
    pub word_count: WordCountMode,
    pub strict_frontmatter: bool,
    pub keep_going: bool,
    pub threads: usize,
}

impl Config {
    /// Looks for `sitegen.yaml` in `dir` and then in each of its parents. If
    /// there isn't one, the default layout rooted at `dir` is used:
    /// `posts/raw/**/*.md` in, `posts/**/*.html` and `index.html` out, with
    /// templates `html/layout-post.html` and `html/layout-home.html`.
    pub fn from_directory(dir: &Path, overrides: &Overrides) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, overrides);
            }
            current = candidate.parent();
        }
        Ok(Config::resolve(dir, Project::default(), overrides))
    }

    pub fn from_project_file(path: &Path, overrides: &Overrides) -> Result<Config> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Opening project file `{}`", path.display()))?;
        let project: Project = match contents.trim() {
            "" => Project::default(),
            _ => serde_yaml::from_str(&contents)
                .with_context(|| format!("Loading configuration from `{}`", path.display()))?,
        };
        match path.parent() {
            None => Err(anyhow!(
                "Can't get parent directory for provided project file path '{:?}'",
                path
            )),
            Some(project_root) => Ok(Config::resolve(project_root, project, overrides)),
        }
    }

    fn resolve(root: &Path, project: Project, overrides: &Overrides) -> Config {
        let path = |configured: Option<PathBuf>, default: &str| {
            root.join(configured.unwrap_or_else(|| PathBuf::from(default)))
        };
        Config {
            source_directory: path(project.source_directory, "posts/raw"),
            output_directory: path(project.output_directory, "posts"),
            index_file: path(project.index_file, "index.html"),
            post_template: path(project.post_template, "html/layout-post.html"),
            home_template: path(project.home_template, "html/layout-home.html"),
            posts_url: project.posts_url.unwrap_or_else(|| String::from("posts/")),
            words_per_minute: project.words_per_minute.0,
            word_count: overrides.word_count.unwrap_or(project.word_count),
            strict_frontmatter: overrides.strict_frontmatter || project.strict_frontmatter,
            keep_going: overrides.keep_going || project.keep_going,
            threads: match overrides.threads.or(project.threads) {
                None => num_cpus::get(),
                Some(threads) => threads,
            },
        }
    }

    /// The subset of the configuration the post parser needs.
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            word_count: self.word_count,
            words_per_minute: self.words_per_minute,
            strict_frontmatter: self.strict_frontmatter,
            keep_going: self.keep_going,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_project_file() -> Result<()> {
        let dir = TempDir::new()?;
        let overrides = Overrides {
            threads: Some(1),
            ..Overrides::default()
        };
        let config = Config::from_directory(dir.path(), &overrides)?;
        assert_eq!(dir.path().join("posts/raw"), config.source_directory);
        assert_eq!(dir.path().join("posts"), config.output_directory);
        assert_eq!(dir.path().join("index.html"), config.index_file);
        assert_eq!(dir.path().join("html/layout-post.html"), config.post_template);
        assert_eq!(dir.path().join("html/layout-home.html"), config.home_template);
        assert_eq!("posts/", config.posts_url);
        assert_eq!(250, config.words_per_minute);
        assert_eq!(WordCountMode::Rendered, config.word_count);
        assert!(!config.keep_going);
        assert!(!config.strict_frontmatter);
        assert_eq!(1, config.threads);
        Ok(())
    }

    #[test]
    fn test_project_file_in_parent() -> Result<()> {
        let dir = TempDir::new()?;
        fs::write(
            dir.path().join(PROJECT_FILE),
            "source_directory: content\nposts_url: /blog/\nwords_per_minute: 200\nword_count: source\nthreads: 3\n",
        )?;
        let nested = dir.path().join("content/drafts");
        fs::create_dir_all(&nested)?;

        let overrides = Overrides {
            keep_going: true,
            ..Overrides::default()
        };
        let config = Config::from_directory(&nested, &overrides)?;
        assert_eq!(dir.path().join("content"), config.source_directory);
        assert_eq!(dir.path().join("posts"), config.output_directory);
        assert_eq!("/blog/", config.posts_url);
        assert_eq!(200, config.words_per_minute);
        assert_eq!(WordCountMode::Source, config.word_count);
        assert_eq!(3, config.threads);
        assert!(config.keep_going);
        Ok(())
    }

    #[test]
    fn test_overrides_win() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, "threads: 3\nword_count: rendered\n")?;
        let overrides = Overrides {
            threads: Some(8),
            word_count: Some(WordCountMode::Source),
            strict_frontmatter: true,
            ..Overrides::default()
        };
        let config = Config::from_project_file(&path, &overrides)?;
        assert_eq!(8, config.threads);
        assert_eq!(WordCountMode::Source, config.word_count);
        assert!(config.strict_frontmatter);
        Ok(())
    }

    #[test]
    fn test_unknown_key_rejected() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join(PROJECT_FILE);
        fs::write(&path, "index_page_size: 10\n")?;
        assert!(Config::from_project_file(&path, &Overrides::default()).is_err());
        Ok(())
    }
}
