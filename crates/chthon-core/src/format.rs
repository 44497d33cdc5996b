//! Cleanup applied to generated text before it reaches the chat UI, which
//! renders plain text with simple bullet lists.

use std::sync::LazyLock;

use regex::Regex;

static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"###\s*").expect("static regex"));
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*").expect("static regex"));
static BULLET: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[-*][ \t]+").expect("static regex"));
static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("static regex"));

pub fn clean_generated_text(text: &str) -> String {
    let text = HEADING.replace_all(text, "");
    let text = BOLD.replace_all(&text, "");
    let text = BULLET.replace_all(&text, "• ");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_owned()
}
