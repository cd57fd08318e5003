//! Extraction of the first balanced `{...}` object from free-form model text.

/// Outcome of scanning model output for a JSON object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonSpan<'a> {
    /// Text contains no opening brace at all
    Absent,
    /// Braces open but never balance
    Unbalanced,
    Found(&'a str),
}

/// Scan from the first `{` to its matching `}`, skipping braces inside
/// string literals. The returned span still needs a strict parse.
pub fn first_json_object(text: &str) -> JsonSpan<'_> {
    let Some(start) = text.find('{') else {
        return JsonSpan::Absent;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return JsonSpan::Found(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    JsonSpan::Unbalanced
}
