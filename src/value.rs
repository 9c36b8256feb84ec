//! Conversions from [`Post`]s into template [`Value`]s. Keys use the
//! capitalized names the site's templates were written against (`.Title`,
//! `.Date`, ...). Templates don't escape their output, so text fields are
//! HTML-escaped here.

use crate::markdown::escape;
use crate::post::Post;
use crate::readtime::ReadTime;
use gtmpl_value::Value;
use std::collections::HashMap;

impl From<&ReadTime> for Value {
    fn from(read_time: &ReadTime) -> Value {
        Value::String(read_time.display.clone())
    }
}

impl From<&Post> for Value {
    /// Converts a [`Post`] into the summary object listed on the index page:
    /// `Title`, `Date`, `Author`, `WordCount`, `ReadTime`, and `Path`. The
    /// body isn't included.
    fn from(post: &Post) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("Title".to_owned(), escape(&post.title).into());
        m.insert("Date".to_owned(), escape(&post.date).into());
        m.insert("Author".to_owned(), escape(&post.author).into());
        m.insert("WordCount".to_owned(), (post.word_count as u64).into());
        m.insert("ReadTime".to_owned(), (&post.read_time).into());
        m.insert("Path".to_owned(), escape(&post.url).into());
        Value::Object(m)
    }
}
