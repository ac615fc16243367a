//! URI template formatting
//!
//! Handler URIs in the describe document look like
//! `http://maas:5240/MAAS/api/2.0/machines/{system_id}/`. `{{` and `}}`
//! stand for literal braces.

use crate::error::{Error, Result};
use crate::maas::http::wire_string;
use serde_json::{Map, Value};

/// Substitute every `{name}` placeholder with its value from `args`.
///
/// Values are percent-encoded as path segments. Placeholders may carry a
/// format spec (`{name:...}`), which is ignored.
pub fn format_uri(template: &str, args: &Map<String, Value>) -> Result<String> {
    let malformed = || Error::MalformedTemplate {
        template: template.to_string(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '{' => {
                let mut field = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(ch) => field.push(ch),
                        None => return Err(malformed()),
                    }
                }

                let name = field
                    .split(|ch: char| ch == ':' || ch == '!')
                    .next()
                    .unwrap_or_default();
                if name.is_empty() {
                    return Err(malformed());
                }

                let value = args.get(name).ok_or_else(|| Error::MissingTemplateArg {
                    template: template.to_string(),
                    name: name.to_string(),
                })?;
                out.push_str(&urlencoding::encode(&wire_string(value)));
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(malformed()),
            other => out.push(other),
        }
    }

    Ok(out)
}
