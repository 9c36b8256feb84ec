//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: loading the two templates,
//! parsing the posts ([`crate::parser`]), and rendering the post pages and the
//! home page ([`crate::write`]).

use crate::config::Config;
use crate::parser::{Error as ParseError, Parser as PostParser};
use crate::write::{Error as WriteError, Writer};
use chrono::Datelike;
use gtmpl::Template;
use log::info;
use std::fmt;
use std::path::{Path, PathBuf};

/// What a build did.
#[derive(Debug)]
pub struct Summary {
    /// The number of post pages written.
    pub posts_written: usize,

    /// The source files which were skipped. Always empty unless
    /// [`Config::keep_going`] is set, since otherwise the first failure
    /// aborts the build.
    pub failures: Vec<Failure>,
}

/// A source file which was skipped and why.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

/// The year to stamp into pages.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}

/// Builds the site from a [`Config`] object. This calls into
/// [`PostParser::parse_posts`], [`Writer::write_posts`], and
/// [`Writer::write_index`] which do the heavy-lifting. Output files are
/// overwritten in place; nothing is deleted from the output directory.
pub fn build_site(config: &Config, year: i32) -> Result<Summary> {
    // Parse the template files first so a broken theme fails before any
    // output is touched.
    let post_template = parse_template(&config.post_template)?;
    let home_template = parse_template(&config.home_template)?;

    let post_parser = PostParser::new(
        &config.source_directory,
        &config.output_directory,
        &config.posts_url,
        config.parse_options(),
    );

    // collect all posts
    let parsed = post_parser.parse_posts(config.threads)?;
    info!(
        "parsed {} posts from `{}`",
        parsed.posts.len(),
        config.source_directory.display()
    );

    // write the post and index pages
    let writer = Writer {
        post_template: &post_template,
        home_template: &home_template,
        index_file: &config.index_file,
        year,
    };
    let written = writer.write_posts(&parsed.posts, config.keep_going)?;
    writer.write_index(&written.posts)?;
    info!(
        "wrote {} posts to `{}` and the index to `{}`",
        written.posts.len(),
        config.output_directory.display(),
        config.index_file.display()
    );

    let mut failures: Vec<Failure> = parsed
        .failures
        .into_iter()
        .map(|f| Failure {
            path: f.path,
            error: Error::Parse(f.error),
        })
        .collect();
    failures.extend(written.failures.into_iter().map(|(post, err)| Failure {
        path: config.source_directory.join(&post.source_path),
        error: Error::Write(err),
    }));

    Ok(Summary {
        posts_written: written.posts.len(),
        failures,
    })
}

// Loads a template file and parses it.
fn parse_template(path: &Path) -> Result<Template> {
    let contents = std::fs::read_to_string(path).map_err(|err| Error::OpenTemplateFile {
        path: path.to_owned(),
        err,
    })?;

    let mut template = Template::default();
    template
        .parse(&contents)
        .map_err(|err| Error::ParseTemplate {
            path: path.to_owned(),
            err,
        })?;
    Ok(template)
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// or loading template files.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors writing [`crate::post::Post`]s to disk as HTML files.
    Write(WriteError),

    /// Returned for I/O problems while opening template files.
    OpenTemplateFile { path: PathBuf, err: std::io::Error },

    /// Returned for errors parsing template files.
    ParseTemplate { path: PathBuf, err: String },
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::ParseTemplate { path, err } => {
                write!(f, "Parsing template file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::ParseTemplate { .. } => None,
        }
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Overrides;
    use crate::post;
    use std::fs;
    use tempfile::TempDir;

    type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

    const POST_LAYOUT: &str =
        "<html><head><title>{{.Title}}</title></head><body>{{.Content}}<footer>{{.Year}}</footer></body></html>\n";
    const HOME_LAYOUT: &str =
        "<ul>{{range .Posts}}<li><a href=\"{{.Path}}\">{{.Title}}</a> {{.Date}} {{.Author}} ({{.ReadTime}})</li>{{end}}</ul><footer>{{.Year}}</footer>\n";

    fn write(root: &Path, relative_path: &str, contents: &str) -> std::io::Result<()> {
        let path = root.join(relative_path);
        fs::create_dir_all(path.parent().unwrap())?;
        fs::write(path, contents)
    }

    fn project(threads: usize) -> std::io::Result<(TempDir, Config)> {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new()?;
        let root = dir.path();
        write(root, "html/layout-post.html", POST_LAYOUT)?;
        write(root, "html/layout-home.html", HOME_LAYOUT)?;
        write(root, "posts/raw/march.md", "title: March\ndate: 2024-03-01\nauthor: A\n---\nIn like a lion.\n")?;
        write(root, "posts/raw/sub/a.md", "title: January\ndate: 2024-01-15\nauthor: B\n---\nCold *and* dark.\n")?;
        write(root, "posts/raw/december.md", "title: December\ndate: 2024-12-31\nauthor: C\n---\nDone.\n")?;

        let overrides = Overrides {
            threads: Some(threads),
            ..Overrides::default()
        };
        let config = Config::from_directory(root, &overrides)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        Ok((dir, config))
    }

    #[test]
    fn test_build_site() -> TestResult {
        let (dir, config) = project(1)?;
        let summary = build_site(&config, 2024)?;
        assert_eq!(3, summary.posts_written);
        assert!(summary.failures.is_empty());

        let root = dir.path();
        let post = fs::read_to_string(root.join("posts/sub/a.html"))?;
        assert_eq!(
            "<html><head><title>January</title></head><body>\
             <h1>January</h1><div>By <b>B</b> on <b>2024-01-15</b> | 3 words, 1 minute to read</div><hr>\
             <p>Cold <em>and</em> dark.</p>\n\
             <footer>2024</footer></body></html>\n",
            post
        );
        assert!(root.join("posts/march.html").is_file());
        assert!(root.join("posts/december.html").is_file());

        let index = fs::read_to_string(root.join("index.html"))?;
        assert_eq!(
            "<ul>\
             <li><a href=\"posts/december.html\">December</a> 2024-12-31 C (1 minute)</li>\
             <li><a href=\"posts/march.html\">March</a> 2024-03-01 A (1 minute)</li>\
             <li><a href=\"posts/sub/a.html\">January</a> 2024-01-15 B (1 minute)</li>\
             </ul><footer>2024</footer>\n",
            index
        );
        Ok(())
    }

    #[test]
    fn test_build_site_is_idempotent() -> TestResult {
        let (dir, config) = project(4)?;
        let outputs = ["index.html", "posts/march.html", "posts/sub/a.html", "posts/december.html"];

        build_site(&config, 2024)?;
        let first: Vec<String> = outputs
            .iter()
            .map(|p| fs::read_to_string(dir.path().join(p)))
            .collect::<std::io::Result<_>>()?;

        build_site(&config, 2024)?;
        let second: Vec<String> = outputs
            .iter()
            .map(|p| fs::read_to_string(dir.path().join(p)))
            .collect::<std::io::Result<_>>()?;

        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn test_missing_delimiter_aborts() -> TestResult {
        let (dir, config) = project(1)?;
        write(dir.path(), "posts/raw/broken.md", "title: Broken\nno delimiter\n")?;

        match build_site(&config, 2024) {
            Err(Error::Parse(err)) => {
                assert!(matches!(err.frontmatter(), Some(post::Error::MissingDelimiter)))
            }
            other => panic!("wanted a parse error; found {:?}", other),
        }
        assert!(!dir.path().join("posts/broken.html").exists());
        assert!(!dir.path().join("index.html").exists());
        Ok(())
    }

    #[test]
    fn test_keep_going_isolates_failures() -> TestResult {
        let (dir, mut config) = project(2)?;
        config.keep_going = true;
        write(dir.path(), "posts/raw/broken.md", "title: Broken\nno delimiter\n")?;

        let summary = build_site(&config, 2024)?;
        assert_eq!(3, summary.posts_written);
        assert_eq!(1, summary.failures.len());
        assert_eq!(config.source_directory.join("broken.md"), summary.failures[0].path);
        assert!(!dir.path().join("posts/broken.html").exists());

        let index = fs::read_to_string(dir.path().join("index.html"))?;
        assert!(!index.contains("Broken"));
        assert!(index.contains("December"));
        Ok(())
    }

    #[test]
    fn test_missing_template() -> TestResult {
        let (dir, config) = project(1)?;
        fs::remove_file(dir.path().join("html/layout-home.html"))?;
        match build_site(&config, 2024) {
            Err(Error::OpenTemplateFile { path, .. }) => assert_eq!(config.home_template, path),
            other => panic!("wanted OpenTemplateFile; found {:?}", other),
        }
        assert!(!dir.path().join("posts/march.html").exists());
        Ok(())
    }
}
