use pulldown_cmark::{html, Options, Parser};

/// Render a markdown body to HTML.
///
/// Rendering never fails: anything that is not valid markdown ends up as text.
pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::empty());
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}
