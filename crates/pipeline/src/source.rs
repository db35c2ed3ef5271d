//! Lightweight text scanning of design entry points.
//!
//! Entry points are JSON with `//` and `/* */` comments. The scanner here
//! blanks comments out so `serde_json` can parse the rest, and remembers the
//! comment bodies so the catalog can pull a human description from them.
//! It tracks string literals and nothing else; it is not a JSON parser.

/// Result of scanning an entry-point file.
#[derive(Debug, Clone, PartialEq)]
pub struct Scanned {
    /// Source with every comment replaced by spaces (newlines kept, so
    /// parse errors still point at the right line).
    pub code: String,
    /// Comment bodies in source order, without their delimiters.
    pub comments: Vec<String>,
    /// A `/*` without a closing `*/` was found; everything after it is blanked.
    pub unterminated_block: bool,
}

/// Split `source` into comment-free code and comment bodies.
pub fn scan(source: &str) -> Scanned {
    let chars: Vec<char> = source.chars().collect();
    let mut code = String::with_capacity(source.len());
    let mut comments = Vec::new();
    let mut unterminated_block = false;
    let mut in_string = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if in_string {
            code.push(c);
            if c == '\\' {
                if let Some(&next) = chars.get(i + 1) {
                    code.push(next);
                    i += 2;
                    continue;
                }
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }

        match (c, chars.get(i + 1)) {
            ('"', _) => {
                in_string = true;
                code.push(c);
                i += 1;
            }
            ('/', Some('/')) => {
                let start = i + 2;
                let end = chars[start..]
                    .iter()
                    .position(|&ch| ch == '\n')
                    .map_or(chars.len(), |p| start + p);
                comments.push(chars[start..end].iter().collect());
                blank(&mut code, &chars[i..end]);
                i = end;
            }
            ('/', Some('*')) => {
                let start = i + 2;
                match block_end(&chars, start) {
                    Some(end) => {
                        comments.push(chars[start..end].iter().collect());
                        blank(&mut code, &chars[i..end + 2]);
                        i = end + 2;
                    }
                    None => {
                        unterminated_block = true;
                        blank(&mut code, &chars[i..]);
                        i = chars.len();
                    }
                }
            }
            _ => {
                code.push(c);
                i += 1;
            }
        }
    }

    Scanned {
        code,
        comments,
        unterminated_block,
    }
}

fn blank(out: &mut String, chars: &[char]) {
    out.extend(chars.iter().map(|&ch| if ch == '\n' { '\n' } else { ' ' }));
}

/// Index of the `*` of the first `*/` at or after `from`.
fn block_end(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&j| chars[j] == '*' && chars[j + 1] == '/')
}

/// Human description for a module: the first line of text in the first
/// comment that has any, or a generated sentence naming `title`.
///
/// Heuristic only. Comments without text and unterminated block comments are
/// skipped; anything that is not a comment is never used.
pub fn extract_description(source: &str, title: &str) -> String {
    scan(source)
        .comments
        .iter()
        .find_map(|comment| first_text_line(comment))
        .unwrap_or_else(|| default_description(title))
}

pub fn default_description(title: &str) -> String {
    format!("Parametric {} design.", title)
}

fn first_text_line(comment: &str) -> Option<String> {
    comment
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['*', '/', '!'])
                .trim_end_matches('*')
                .trim()
        })
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_comment_header() {
        let src = "/**\n * Demo Box - Parametric Container with Lid\n * A more advanced example\n */\n{}";
        assert_eq!(
            extract_description(src, "Demo Box"),
            "Demo Box - Parametric Container with Lid"
        );
    }

    #[test]
    fn test_line_comment() {
        let src = "// Simple cube for smoke tests\n{ \"parameters\": [] }";
        assert_eq!(extract_description(src, "Cube"), "Simple cube for smoke tests");
    }

    #[test]
    fn test_doc_style_line_comment() {
        assert_eq!(extract_description("/// Holder\n{}", "X"), "Holder");
    }

    #[test]
    fn test_fallback_without_comment() {
        assert_eq!(
            extract_description("{ \"parameters\": [] }", "Battery Holder"),
            "Parametric Battery Holder design."
        );
    }

    #[test]
    fn test_empty_comment_is_skipped() {
        let src = "/**/\n//\n// Second comment wins\n{}";
        assert_eq!(extract_description(src, "X"), "Second comment wins");
    }

    #[test]
    fn test_unterminated_block_falls_back() {
        let src = "{ \"parameters\": [] }\n/* never closed\n";
        let scanned = scan(src);
        assert!(scanned.unterminated_block);
        assert!(scanned.comments.is_empty());
        assert_eq!(extract_description(src, "Box"), "Parametric Box design.");
    }

    #[test]
    fn test_slashes_inside_strings_are_not_comments() {
        let src = r#"{ "caption": "see http://example.com/*x*/", "a": "q\"//" } // tail"#;
        let scanned = scan(src);
        assert_eq!(scanned.comments, vec![" tail".to_string()]);
        assert!(scanned.code.contains("http://example.com/*x*/"));
        let value: serde_json::Value = serde_json::from_str(&scanned.code).unwrap();
        assert_eq!(value["a"], "q\"//");
    }

    #[test]
    fn test_code_keeps_line_structure() {
        let src = "/* a\n b */{\n\"x\": 1 // one\n}";
        let scanned = scan(src);
        assert_eq!(scanned.code.lines().count(), src.lines().count());
        let value: serde_json::Value = serde_json::from_str(&scanned.code).unwrap();
        assert_eq!(value["x"], 1);
    }
}
