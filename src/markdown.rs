use crate::readtime::{count_prose_words, count_tokens, WordCountMode};
use pulldown_cmark::escape::escape_html;
use pulldown_cmark::{html, Options, Parser};

/// The Markdown extensions enabled for post bodies.
fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// The result of rendering a post body.
pub struct Rendered {
    /// The body as HTML. This is trusted output and is dropped into the page
    /// verbatim.
    pub html: String,

    /// The body's word count according to the requested [`WordCountMode`].
    pub word_count: usize,
}

/// Converts the Markdown `body` to HTML and counts its words. Leading and
/// trailing whitespace in `body` is ignored.
pub fn to_html(body: &str, mode: WordCountMode) -> Rendered {
    let body = body.trim();
    let mut out = String::with_capacity(body.len() * 3 / 2);
    html::push_html(&mut out, Parser::new_ext(body, options()));

    let word_count = match mode {
        WordCountMode::Rendered => count_tokens(&out),
        WordCountMode::Source => count_prose_words(Parser::new_ext(body, options())),
    };

    Rendered {
        html: out,
        word_count,
    }
}

/// Escapes `text` for use in HTML text or a quoted attribute.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // writing into a `String` can't fail
    let _ = escape_html(&mut out, text);
    out
}
