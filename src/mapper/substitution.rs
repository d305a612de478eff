/// Expand `$1`, `$2`, ... in `template` from the capture groups of a mapping
/// rule's extraction regex, then trim trailing whitespace and dots.
///
/// Groups that did not participate expand to nothing, so alternations like
/// `x(64)|arm(64)` can share one `$1$2` template.  An expansion that ends up
/// empty yields `None`.
pub(crate) fn expand(template: &str, captures: &fancy_regex::Captures) -> Option<String> {
    let mut result = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(&d) = chars.peek() {
                if d.is_ascii_digit() {
                    chars.next();
                    let idx = (d as u8 - b'0') as usize;
                    if let Some(m) = captures.get(idx) {
                        result.push_str(m.as_str());
                    }
                    continue;
                }
            }
        }
        result.push(c);
    }

    let trimmed_len = result
        .trim_end_matches(|c: char| c.is_whitespace() || c == '.')
        .len();
    result.truncate(trimmed_len);
    let result = result.trim_start().to_string();
    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}
