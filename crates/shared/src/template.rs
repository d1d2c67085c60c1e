//! Sentinel-token templating.
//!
//! A template is plain text containing `{{NAME}}` slots and optional
//! `{{#NAME}} ... {{/NAME}}` block regions. Slots are filled in the order they
//! are listed; slots absent from the template are simply never used.

use regex::{NoExpand, Regex};

/// Replace every `{{NAME}}` occurrence, one slot at a time in list order
pub fn fill(template: &str, slots: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in slots {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}

/// Replace each `{{#NAME}} ... {{/NAME}}` region wholesale with `value`.
///
/// Regions are matched non-greedily and may span lines.
pub fn replace_block(template: &str, name: &str, value: &str) -> String {
    let pattern = format!(
        r"(?s)\{{\{{#{name}\}}\}}.*?\{{\{{/{name}\}}\}}",
        name = regex::escape(name)
    );
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(template, NoExpand(value)).into_owned(),
        Err(_) => template.to_string(),
    }
}
