//! Word counting and reading-time estimation for [`crate::post::Post`]s.

use pulldown_cmark::{Event, Tag};
use serde::Deserialize;

/// The default reading speed used when a project doesn't configure one.
pub const DEFAULT_WORDS_PER_MINUTE: u64 = 250;

/// Selects what gets counted as a "word".
#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WordCountMode {
    /// Count whitespace-delimited tokens in the rendered HTML, markup
    /// included.
    Rendered,

    /// Count whitespace-delimited tokens in the prose of the Markdown source
    /// before it is rendered.
    Source,
}

impl Default for WordCountMode {
    fn default() -> Self {
        WordCountMode::Rendered
    }
}

impl std::str::FromStr for WordCountMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rendered" => Ok(WordCountMode::Rendered),
            "source" => Ok(WordCountMode::Source),
            _ => Err(format!(
                "unknown word count mode `{}` (expected `rendered` or `source`)",
                s
            )),
        }
    }
}

/// Counts whitespace-delimited tokens in `text`.
pub fn count_tokens(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Counts the prose words in a Markdown document. Only text and inline code
/// contribute; block ends and line breaks act as word separators so that
/// `# Title` followed by a paragraph doesn't fuse two words together.
pub fn count_prose_words<'a>(events: impl Iterator<Item = Event<'a>>) -> usize {
    let mut prose = String::new();
    for event in events {
        match event {
            Event::Text(text) | Event::Code(text) => prose.push_str(&text),
            Event::SoftBreak | Event::HardBreak | Event::Rule => prose.push(' '),
            Event::End(Tag::Paragraph)
            | Event::End(Tag::Heading(_))
            | Event::End(Tag::Item)
            | Event::End(Tag::CodeBlock(_))
            | Event::End(Tag::TableCell)
            | Event::End(Tag::BlockQuote)
            | Event::End(Tag::FootnoteDefinition(_)) => prose.push(' '),
            _ => {}
        }
    }
    count_tokens(&prose)
}

/// An estimate of how long a post takes to read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadTime {
    /// Whole minutes, never less than one.
    pub minutes: u64,

    /// The estimate formatted for display, e.g. `1 minute` or `3 minutes`.
    pub display: String,
}

impl ReadTime {
    /// Estimates the reading time for `word_count` words at
    /// `words_per_minute`. Anything under a minute is reported as one minute;
    /// anything over is rounded up to the next whole minute.
    pub fn estimate(word_count: usize, words_per_minute: u64) -> ReadTime {
        let words_per_minute = words_per_minute.max(1);
        let word_count = word_count as u64;
        let minutes = match word_count {
            0 => 1,
            n => (n / words_per_minute + u64::from(n % words_per_minute != 0)).max(1),
        };
        ReadTime {
            minutes,
            display: match minutes {
                1 => String::from("1 minute"),
                n => format!("{} minutes", n),
            },
        }
    }
}

impl std::fmt::Display for ReadTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(&self.display)
    }
}
