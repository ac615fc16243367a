//! Handler name normalization
//!
//! MAAS publishes handler class names such as `NodeGroupInterfacesHandler`.
//! Clients address them as `node_group_interfaces`.

fn is_word_tail(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit()
}

/// Split an identifier into its camel-case words.
///
/// A word is either an uppercase prefix followed by a lowercase/digit run
/// (`Machines`, `HTTPServer`, `v2`), or a bare uppercase run (`API` in
/// `API_Handler`). Anything else separates words and is discarded.
fn camel_case_words(name: &str) -> Vec<&str> {
    let bytes = name.as_bytes();
    let mut words = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if !(c.is_ascii_uppercase() || is_word_tail(c)) {
            i += 1;
            continue;
        }

        let mut upper_end = i;
        while upper_end < bytes.len() && (bytes[upper_end] as char).is_ascii_uppercase() {
            upper_end += 1;
        }
        let mut tail_end = upper_end;
        while tail_end < bytes.len() && is_word_tail(bytes[tail_end] as char) {
            tail_end += 1;
        }

        let end = if tail_end > upper_end { tail_end } else { upper_end };
        words.push(&name[i..end]);
        i = end;
    }

    words
}

/// Create a command name from a handler name.
///
/// Words are lowercased, the word `handler` is removed, and the rest is
/// joined with underscores. Input with no words yields an empty string.
pub fn handler_command_name(name: &str) -> String {
    camel_case_words(name)
        .into_iter()
        .map(str::to_ascii_lowercase)
        .filter(|word| word != "handler")
        .collect::<Vec<_>>()
        .join("_")
}
