// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
#[allow(dead_code)]
pub fn generate_markup(sections: usize) -> String {
    let base = concat!(
        "<h2>Section</h2>",
        "<p>Paragraph with <b>bold</b> and <i>italic</i> text.</p>",
        "<ul>\n  <li>First item</li>\n  <li>Second <a href=\"#\">link</a></li>\n</ul>",
        "<p>Line<br>break and an <img src=\"x.png\"> image.</p>",
    );
    base.repeat(sections)
}

#[allow(dead_code)]
pub fn generate_nested_markup(depth: usize) -> String {
    let mut markup = String::new();
    for level in 0..depth {
        markup.push_str(&format!("<div><p>level {level}</p>"));
    }
    markup.push_str("<p>deepest</p>");
    markup.push_str(&"</div>".repeat(depth));
    markup
}
