//! XML text escaping and Excel's `_xHHHH_` character escapes
//!
//! XML 1.0 cannot carry most control characters, and parsers normalize a
//! bare carriage return to a line feed. Excel encodes such characters as
//! `_xHHHH_`, and escapes a literal underscore that would otherwise start
//! such a sequence as `_x005F_`.

/// Escape the five XML special characters
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn starts_escape(rest: &str) -> bool {
    let bytes = rest.as_bytes();
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

/// Encode characters XML cannot carry verbatim as `_xHHHH_`
pub(crate) fn encode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        match c {
            '_' if starts_escape(&s[i..]) => result.push_str("_x005F_"),
            '\t' | '\n' => result.push(c),
            c if (c as u32) < 0x20 => result.push_str(&format!("_x{:04X}_", c as u32)),
            c => result.push(c),
        }
    }
    result
}

/// Decode Excel's `_xHHHH_` escape sequences in strings
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(pos) = rest.find('_') {
        result.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let decoded = if starts_escape(rest) {
            u32::from_str_radix(&rest[2..6], 16)
                .ok()
                .and_then(char::from_u32)
        } else {
            None
        };
        match decoded {
            Some(c) => {
                result.push(c);
                rest = &rest[7..];
            }
            None => {
                result.push('_');
                rest = &rest[1..];
            }
        }
    }
    result.push_str(rest);
    result
}
