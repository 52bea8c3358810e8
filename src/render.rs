//! Answer markup rendering
//!
//! Answers arrive as GitHub-flavored markdown. Views get HTML; the speech
//! engine gets plain text with the markup stripped.

use pulldown_cmark::{html, Event, Options, Parser, TagEnd};

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
}

/// Render markdown to an HTML fragment
pub fn to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Flatten markdown into text suitable for speech: inline code keeps its
/// content, formatting and raw HTML are dropped, one line per block.
pub fn speakable_text(markdown: &str) -> String {
    let mut raw = String::with_capacity(markdown.len());

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Text(text) | Event::Code(text) => raw.push_str(&text),
            Event::SoftBreak => raw.push(' '),
            Event::HardBreak | Event::Rule => raw.push('\n'),
            Event::End(
                TagEnd::Paragraph
                | TagEnd::Heading(_)
                | TagEnd::Item
                | TagEnd::CodeBlock
                | TagEnd::TableRow
                | TagEnd::TableHead
                | TagEnd::BlockQuote(_),
            ) => raw.push('\n'),
            Event::End(TagEnd::TableCell) => raw.push(' '),
            _ => {}
        }
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
