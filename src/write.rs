use crate::markdown::escape;
use crate::parser::by_date_descending;
use crate::post::Post;
use gtmpl::{Context, Template, Value};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Responsible for templating and writing HTML pages to disk from [`Post`]
/// sources.
pub struct Writer<'a> {
    /// The template for post pages. It receives `Title`, `Content`, and
    /// `Year` (plus `Author`, `Date`, `WordCount`, and `ReadTime`).
    pub post_template: &'a Template,

    /// The template for the home page. It receives `Posts` and `Year`.
    pub home_template: &'a Template,

    /// The file the home page is written to.
    pub index_file: &'a Path,

    /// The year stamped into every page, typically the current year.
    pub year: i32,
}

/// The outcome of [`Writer::write_posts`].
pub struct Written<'p> {
    /// The posts whose pages were written.
    pub posts: Vec<&'p Post>,

    /// The posts whose pages couldn't be written (only populated when
    /// `keep_going` is set).
    pub failures: Vec<(&'p Post, Error)>,
}

impl Writer<'_> {
    /// Templates a single [`Post`] and writes it to [`Post::file_path`],
    /// overwriting any existing file. The parent directory must exist.
    pub fn write_post(&self, post: &Post) -> Result<()> {
        let content = banner(post) + &post.body;

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("Title".to_owned(), escape(&post.title).into());
        m.insert("Content".to_owned(), content.into());
        m.insert("Year".to_owned(), self.year.into());
        m.insert("Author".to_owned(), escape(&post.author).into());
        m.insert("Date".to_owned(), escape(&post.date).into());
        m.insert("WordCount".to_owned(), (post.word_count as u64).into());
        m.insert("ReadTime".to_owned(), (&post.read_time).into());

        render(self.post_template, Value::Object(m), &post.file_path)
    }

    /// Writes a page for each [`Post`], creating output directories as
    /// needed. Unless `keep_going` is set, the first failure aborts.
    pub fn write_posts<'p>(&self, posts: &'p [Post], keep_going: bool) -> Result<Written<'p>> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        let mut written = Written {
            posts: Vec::with_capacity(posts.len()),
            failures: Vec::new(),
        };

        for post in posts {
            let result = create_parent(&post.file_path, &mut seen_dirs)
                .and_then(|_| self.write_post(post));
            match result {
                Ok(()) => {
                    debug!("wrote `{}`", post.file_path.display());
                    written.posts.push(post);
                }
                Err(err) if keep_going => {
                    warn!("skipping post: {}", err);
                    written.failures.push((post, err));
                }
                Err(err) => return Err(err),
            }
        }
        Ok(written)
    }

    /// Sorts `posts` by date (most recent first) and writes the home page
    /// listing all of them to [`Writer::index_file`].
    pub fn write_index(&self, posts: &[&Post]) -> Result<()> {
        let mut posts = posts.to_vec();
        posts.sort_by(|a, b| by_date_descending(a, b));

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert(
            "Posts".to_owned(),
            Value::Array(posts.into_iter().map(Value::from).collect()),
        );
        m.insert("Year".to_owned(), self.year.into());

        create_parent(self.index_file, &mut HashSet::new())?;
        render(self.home_template, Value::Object(m), self.index_file)
    }
}

/// Builds the banner which heads every post page: the title, then a byline
/// with the author, date, word count, and reading time.
pub fn banner(post: &Post) -> String {
    format!(
        "<h1>{}</h1><div>By <b>{}</b> on <b>{}</b> | {} words, {} to read</div><hr>",
        escape(&post.title),
        escape(&post.author),
        escape(&post.date),
        post.word_count,
        post.read_time,
    )
}

/// Executes `template` against `value` and writes the result to `path`. The
/// page is rendered in memory first; a template error leaves `path`
/// untouched.
fn render(template: &Template, value: Value, path: &Path) -> Result<()> {
    let context = Context::from(value).map_err(|err| Error::Template {
        path: path.to_owned(),
        err,
    })?;
    let mut page: Vec<u8> = Vec::new();
    template
        .execute(&mut page, &context)
        .map_err(|err| Error::Template {
            path: path.to_owned(),
            err,
        })?;
    std::fs::write(path, page).map_err(|err| Error::Io {
        path: path.to_owned(),
        err,
    })
}

fn create_parent(path: &Path, seen_dirs: &mut HashSet<PathBuf>) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() && seen_dirs.insert(dir.to_owned()) => {
            std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                path: dir.to_owned(),
                err,
            })
        }
        _ => Ok(()),
    }
}

/// The result of a fallible page-writing operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error executing a template.
    Template { path: PathBuf, err: String },

    /// An error writing an output file or creating its directory.
    Io { path: PathBuf, err: io::Error },
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template { path, err } => {
                write!(f, "Rendering '{}': {}", path.display(), err)
            }
            Error::Io { path, err } => write!(f, "Writing '{}': {}", path.display(), err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template { .. } => None,
            Error::Io { err, .. } => Some(err),
        }
    }
}
