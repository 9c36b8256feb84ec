//! Defines the [`Post`] and [`Frontmatter`] types as well as the
//! [`split_frontmatter`] function which separates a source document into its
//! YAML frontmatter and its Markdown body. See [`crate::parser`] for the logic
//! that turns source files into [`Post`]s.

use crate::readtime::ReadTime;
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::PathBuf;

/// The line which separates a post's frontmatter from its body.
pub const DELIMITER: &str = "---";

/// Represents a single parsed post, ready to be templated.
#[derive(Clone, Debug, PartialEq)]
pub struct Post {
    /// The title of the post.
    pub title: String,

    /// The date of the post. Posts are ordered by comparing this field as
    /// plain text, so it should be in a sortable format like `YYYY-MM-DD`.
    pub date: String,

    /// The author of the post.
    pub author: String,

    /// The number of words in the post.
    pub word_count: usize,

    /// The estimated reading time derived from `word_count`.
    pub read_time: ReadTime,

    /// The location of the source file relative to the source directory.
    pub source_path: PathBuf,

    /// The target location on disk for the output file.
    pub file_path: PathBuf,

    /// The link to the post page as it appears on the index page, e.g.
    /// `posts/sub/a.html`.
    pub url: String,

    /// The post body rendered as HTML.
    pub body: String,
}

/// The metadata block at the top of a post. Unknown keys are ignored and
/// missing keys are left empty.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct Frontmatter {
    /// The title of the post.
    #[serde(deserialize_with = "nullable_string")]
    pub title: String,

    /// The date of the post.
    #[serde(deserialize_with = "nullable_string")]
    pub date: String,

    /// The author of the post.
    #[serde(deserialize_with = "nullable_string")]
    pub author: String,
}

// `title:` with no value is YAML null; treat it the same as a missing key.
fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Frontmatter {
    /// Decodes a metadata block. An empty block (or one holding nothing but a
    /// YAML document marker) decodes to an all-empty [`Frontmatter`].
    pub fn decode(block: &str) -> Result<Frontmatter> {
        let trimmed = block.trim();
        if trimmed.is_empty() || trimmed == DELIMITER {
            return Ok(Frontmatter::default());
        }
        Ok(serde_yaml::from_str(block)?)
    }

    /// Returns the names of the fields which are blank.
    pub fn blank_fields(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        if self.title.trim().is_empty() {
            blank.push("title");
        }
        if self.date.trim().is_empty() {
            blank.push("date");
        }
        if self.author.trim().is_empty() {
            blank.push("author");
        }
        blank
    }
}

/// Splits a source document into its metadata block and its body. The split
/// happens at the first line which is exactly [`DELIMITER`] and which is both
/// preceded and followed by a newline; any later delimiter lines belong to the
/// body. A `\r` before the newline is tolerated.
///
/// ```md
/// title: Hello, world!
/// date: 2024-01-01
/// author: A
/// ---
/// # Hello
/// ```
pub fn split_frontmatter(input: &str) -> Result<(&str, &str)> {
    let mut search_from = 0;
    while let Some(found) = input[search_from..].find('\n') {
        let line_start = search_from + found + 1;
        let rest = &input[line_start..];
        let line_end = match rest.find('\n') {
            Some(end) => end,
            None => break,
        };
        let line = &rest[..line_end];
        if line.strip_suffix('\r').unwrap_or(line) == DELIMITER {
            return Ok((&input[..line_start - 1], &rest[line_end + 1..]));
        }
        search_from = line_start;
    }
    Err(Error::MissingDelimiter)
}

/// Represents the result of splitting or decoding a post's frontmatter.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error splitting or decoding a post's frontmatter.
#[derive(Debug)]
pub enum Error {
    /// Returned when a post source file has no `---` line separating the
    /// frontmatter from the body.
    MissingDelimiter,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned in strict mode when a frontmatter field is missing or blank.
    MissingField(&'static str),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::MissingDelimiter => {
                write!(f, "missing `{}` line after the frontmatter", DELIMITER)
            }
            Error::DeserializeYaml(err) => write!(f, "invalid frontmatter: {}", err),
            Error::MissingField(field) => {
                write!(f, "frontmatter field `{}` is missing or blank", field)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::MissingDelimiter => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::MissingField(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_split_frontmatter() -> Result<()> {
        let (meta, body) = split_frontmatter("title: Hello\n---\n# Body\n")?;
        assert_eq!("title: Hello", meta);
        assert_eq!("# Body\n", body);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_first_delimiter_only() -> Result<()> {
        let (meta, body) = split_frontmatter("title: a\n---\nbody\n---\nmore\n")?;
        assert_eq!("title: a", meta);
        assert_eq!("body\n---\nmore\n", body);
        assert!(!meta.contains(DELIMITER));
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_leading_fence() -> Result<()> {
        let (meta, body) = split_frontmatter("---\ntitle: a\n---\nbody")?;
        assert_eq!("---\ntitle: a", meta);
        assert_eq!("body", body);
        assert_eq!("a", Frontmatter::decode(meta)?.title);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_crlf() -> Result<()> {
        let (meta, body) = split_frontmatter("title: a\r\n---\r\nbody\r\n")?;
        assert_eq!("title: a\r", meta);
        assert_eq!("body\r\n", body);
        Ok(())
    }

    #[test]
    fn test_split_frontmatter_missing_delimiter() {
        for input in &[
            "title: a\nbody",
            "title: a\n--- \nbody",
            "title: a\n----\nbody",
            // the delimiter line must be terminated by a newline
            "title: a\n---",
            // a delimiter on the very first line has no preceding newline
            "---\nbody",
        ] {
            match split_frontmatter(input) {
                Err(Error::MissingDelimiter) => {}
                other => panic!("wanted MissingDelimiter for {:?}; found {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_decode() -> Result<()> {
        let frontmatter =
            Frontmatter::decode("title: Hello\ndate: 2024-01-01\nauthor: A\ntags: [x]\n")?;
        assert_eq!(
            Frontmatter {
                title: String::from("Hello"),
                date: String::from("2024-01-01"),
                author: String::from("A"),
            },
            frontmatter
        );
        assert!(frontmatter.blank_fields().is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_is_permissive() -> Result<()> {
        let frontmatter = Frontmatter::decode("title: Hello\nauthor:\n")?;
        assert_eq!("Hello", frontmatter.title);
        assert_eq!("", frontmatter.date);
        assert_eq!("", frontmatter.author);
        assert_eq!(vec!["date", "author"], frontmatter.blank_fields());

        assert_eq!(Frontmatter::default(), Frontmatter::decode("  \n")?);
        Ok(())
    }

    #[test]
    fn test_decode_malformed() {
        match Frontmatter::decode("title: [unterminated\n") {
            Err(Error::DeserializeYaml(_)) => {}
            other => panic!("wanted DeserializeYaml; found {:?}", other),
        }
    }
}
