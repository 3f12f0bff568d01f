/// Strip surrounding Markdown code-fence markers from generated text.
/// Generative backends frequently wrap JSON answers in ```json fences even
/// when told not to.
pub fn strip_code_fences(text: &str) -> &str {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```") {
        s = match rest.find('\n') {
            Some(idx) => &rest[idx + 1..],
            None => rest,
        };
    }
    s = s.trim_end();
    if let Some(stripped) = s.strip_suffix("```") {
        s = stripped;
    }
    s.trim()
}

/// Extract the first balanced `{...}` span from free-form text. Brace depth
/// is tracked outside string literals so braces inside JSON values do not
/// unbalance the scan.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in text.as_bytes().iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
