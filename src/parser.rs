//! Defines the [`Parser`], [`Parsed`], and [`Error`] types. Also defines the
//! logic for discovering post source files on the file system and parsing
//! them into [`Post`]s, either on the calling thread or on a pool of worker
//! threads.

use std::{
    cmp::Ordering,
    ffi::OsStr,
    fmt,
    path::{Component, Path, PathBuf},
};

use crossbeam_channel::unbounded;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::{
    markdown,
    post::{self, split_frontmatter, Frontmatter, Post},
    readtime::{ReadTime, WordCountMode},
};

const MARKDOWN_EXTENSION: &str = "md";
const HTML_EXTENSION: &str = "html";

/// Knobs which change how a post is parsed.
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    /// What counts as a word.
    pub word_count: WordCountMode,

    /// The reading speed for read-time estimates.
    pub words_per_minute: u64,

    /// Reject posts with a missing or blank `title`, `date`, or `author`
    /// instead of warning about them.
    pub strict_frontmatter: bool,

    /// Record per-file failures in [`Parsed::failures`] and carry on instead
    /// of aborting on the first one.
    pub keep_going: bool,
}

/// Parses [`Post`] objects from source files.
pub struct Parser<'a> {
    /// The directory which is searched (recursively) for `.md` files.
    source_directory: &'a Path,

    /// The directory in which post pages will be rendered. The directory
    /// structure under `source_directory` is mirrored here.
    output_directory: &'a Path,

    /// The prefix for post links on the index page (i.e., the link for
    /// `{source_directory}/sub/a.md` is `{posts_url}sub/a.html`).
    posts_url: &'a str,

    options: ParseOptions,
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        source_directory: &'a Path,
        output_directory: &'a Path,
        posts_url: &'a str,
        options: ParseOptions,
    ) -> Parser<'a> {
        Parser {
            source_directory,
            output_directory,
            posts_url,
            options,
        }
    }

    /// Searches the source directory for post files (extension = `.md`) and
    /// parses each of them. With `threads` greater than one, the files are
    /// fed to that many worker threads; each worker collects its own
    /// [`Parsed`] and the results are merged once every worker has finished.
    /// The returned posts are sorted by date (most recent first).
    ///
    /// Each post file must be structured as follows:
    ///
    /// 1. YAML frontmatter with fields `title`, `date`, and `author`
    /// 2. A `---` line
    /// 3. Post body
    ///
    /// For example:
    ///
    /// ```md
    /// title: Hello, world!
    /// date: 2024-01-01
    /// author: A
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_posts(&self, threads: usize) -> Result<Parsed> {
        let mut parsed = if threads < 2 {
            self.parse_posts_singlethreaded()?
        } else {
            self.parse_posts_parallel(threads)?
        };
        parsed.posts.sort_by(by_date_descending);
        parsed.failures.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(parsed)
    }

    fn parse_posts_singlethreaded(&self) -> Result<Parsed> {
        let mut parsed = Parsed::default();
        for source in self.sources() {
            let path = source?;
            let result = self.parse_post(&path);
            parsed
                .record(path, result, self.options.keep_going)
                .map_err(|failure| failure.error)?;
        }
        Ok(parsed)
    }

    fn parse_posts_parallel(&self, threads: usize) -> Result<Parsed> {
        let (tx, rx) = unbounded::<PathBuf>();

        std::thread::scope(|scope| {
            let workers: Vec<_> = (0..threads)
                .map(|_| {
                    let rx = rx.clone();
                    scope.spawn(move || -> std::result::Result<Parsed, Failure> {
                        let mut parsed = Parsed::default();
                        for path in rx {
                            let result = self.parse_post(&path);
                            parsed.record(path, result, self.options.keep_going)?;
                        }
                        Ok(parsed)
                    })
                })
                .collect();
            drop(rx);

            let mut first_error = None;
            for source in self.sources() {
                match source {
                    // a failed send means every worker has bailed out
                    Ok(path) => {
                        if tx.send(path).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        first_error = Some(err);
                        break;
                    }
                }
            }
            drop(tx);

            // Files are handed out in discovery order, so the failure with
            // the smallest path is the one a sequential run would hit first.
            let mut first_failure: Option<Failure> = None;
            let mut parsed = Parsed::default();
            for worker in workers {
                match worker.join() {
                    Ok(Ok(p)) => parsed.merge(p),
                    Ok(Err(failure)) => {
                        let earlier = first_failure
                            .as_ref()
                            .map_or(false, |f| f.path <= failure.path);
                        if !earlier {
                            first_failure = Some(failure);
                        }
                    }
                    Err(_) => {
                        first_error.get_or_insert(Error::WorkerPanicked);
                    }
                }
            }

            match (first_failure, first_error) {
                (Some(failure), _) => Err(failure.error),
                (None, Some(err)) => Err(err),
                (None, None) => Ok(parsed),
            }
        })
    }

    /// Walks the source directory in file-name order and yields the path of
    /// every `.md` file. Symbolic links are followed.
    fn sources(&self) -> impl Iterator<Item = Result<PathBuf>> {
        WalkDir::new(self.source_directory)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()))
            .into_iter()
            .filter_map(|result| match result {
                Err(err) => Some(Err(Error::from(err))),
                Ok(entry) => {
                    if entry.file_type().is_file()
                        && entry.path().extension() == Some(OsStr::new(MARKDOWN_EXTENSION))
                    {
                        Some(Ok(entry.into_path()))
                    } else {
                        None
                    }
                }
            })
    }

    /// Parses a single [`Post`] from the source file at `path`, annotating
    /// any error with the path.
    pub fn parse_post(&self, path: &Path) -> Result<Post> {
        match self._parse_post(path) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing post `{}`", path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_post(&self, path: &Path) -> Result<Post> {
        let relative_path = path
            .strip_prefix(self.source_directory)
            .map_err(|_| InvalidFileNameError(path.to_owned()))?;
        let (file_path, url) = self.output_location(relative_path)?;

        let contents = std::fs::read_to_string(path)?;
        let (block, body) = split_frontmatter(&contents)?;
        let frontmatter = Frontmatter::decode(block)?;

        for field in frontmatter.blank_fields() {
            if self.options.strict_frontmatter {
                return Err(post::Error::MissingField(field).into());
            }
            warn!(
                "{}: frontmatter field `{}` is missing or blank",
                path.display(),
                field
            );
        }

        let rendered = markdown::to_html(body, self.options.word_count);
        debug!(
            "parsed `{}` ({} words) -> `{}`",
            path.display(),
            rendered.word_count,
            file_path.display()
        );

        Ok(Post {
            title: frontmatter.title,
            date: frontmatter.date,
            author: frontmatter.author,
            word_count: rendered.word_count,
            read_time: ReadTime::estimate(rendered.word_count, self.options.words_per_minute),
            source_path: relative_path.to_owned(),
            file_path,
            url,
            body: rendered.html,
        })
    }

    /// Maps a source path (relative to the source directory) to the output
    /// file path and the index link. `sub/a.md` becomes
    /// `{output_directory}/sub/a.html` and `{posts_url}sub/a.html`.
    fn output_location(&self, relative_path: &Path) -> Result<(PathBuf, String)> {
        let invalid = || InvalidFileNameError(relative_path.to_owned());
        if relative_path.file_stem().is_none() {
            return Err(invalid().into());
        }
        let with_extension = relative_path.with_extension(HTML_EXTENSION);

        let segments = with_extension
            .components()
            .map(|c| match c {
                Component::Normal(segment) => segment.to_str().ok_or_else(invalid),
                _ => Err(invalid()),
            })
            .collect::<std::result::Result<Vec<&str>, _>>()?;

        Ok((
            self.output_directory.join(&with_extension),
            format!("{}{}", self.posts_url, segments.join("/")),
        ))
    }
}

/// Orders posts by date, most recent first, comparing dates as plain text.
/// Posts with the same date are ordered by link so the result doesn't depend
/// on the order in which the posts were parsed.
pub fn by_date_descending(a: &Post, b: &Post) -> Ordering {
    b.date.cmp(&a.date).then_with(|| a.url.cmp(&b.url))
}

/// The posts parsed from a source directory along with the files which failed
/// to parse (only populated when [`ParseOptions::keep_going`] is set).
#[derive(Debug, Default)]
pub struct Parsed {
    pub posts: Vec<Post>,
    pub failures: Vec<Failure>,
}

impl Parsed {
    /// Adds a parse result. In fail-fast mode an error is handed back along
    /// with the path it came from.
    fn record(
        &mut self,
        path: PathBuf,
        result: Result<Post>,
        keep_going: bool,
    ) -> std::result::Result<(), Failure> {
        match result {
            Ok(post) => self.posts.push(post),
            Err(error) if keep_going => {
                warn!("skipping post: {}", error);
                self.failures.push(Failure { path, error });
            }
            Err(error) => return Err(Failure { path, error }),
        }
        Ok(())
    }

    fn merge(&mut self, other: Parsed) {
        self.posts.extend(other.posts);
        self.failures.extend(other.failures);
    }
}

/// A source file which could not be parsed.
#[derive(Debug)]
pub struct Failure {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {}

/// Represents the result of a [`Post`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Post`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when the frontmatter can't be split from the body or can't be
    /// decoded.
    Frontmatter(post::Error),

    /// Returned when reading a source file fails.
    Io(std::io::Error),

    /// Returned when walking the source directory fails.
    WalkDir(walkdir::Error),

    /// Returned when a source path can't be mapped to an output path.
    InvalidFileName(InvalidFileNameError),

    /// Returned when a parsing thread panics.
    WorkerPanicked,

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl Error {
    /// Returns the underlying frontmatter error, if any, looking through
    /// annotations.
    pub fn frontmatter(&self) -> Option<&post::Error> {
        match self {
            Error::Frontmatter(err) => Some(err),
            Error::Annotated(_, err) => err.frontmatter(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Frontmatter(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::WorkerPanicked => write!(f, "a parser thread panicked"),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Frontmatter(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::WorkerPanicked => None,
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<post::Error> for Error {
    fn from(err: post::Error) -> Error {
        Error::Frontmatter(err)
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}
