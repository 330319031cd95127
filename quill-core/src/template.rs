use regex::{Captures, Regex};

use crate::parts::Parts;

/// The outer document. Its `{body}` is one of the body templates below.
pub const PAGE_TEMPLATE: &str = include_str!("../templates/page.html");
/// Regular wiki pages: navigation, content and footer.
pub const MAIN_TEMPLATE: &str = include_str!("../templates/main.html");
/// Printable pages, without navigation.
pub const MINIMAL_TEMPLATE: &str = include_str!("../templates/minimal.html");

pub const BODY_TOKEN: &str = "{body}";
/// Filled in after everything else, once the render time is known.
pub const TIME_TAKEN_TOKEN: &str = "{generation-time-taken}";

/// Matches any of `tokens`, preferring the longest where two start at the
/// same place.
fn token_matcher<'a>(tokens: impl Iterator<Item = &'a str>) -> Option<Regex> {
    let mut tokens: Vec<&str> = tokens
        .filter(|token| !token.is_empty() && *token != TIME_TAKEN_TOKEN)
        .collect();
    if tokens.is_empty() {
        return None;
    }
    tokens.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let pattern = tokens
        .iter()
        .map(|token| regex::escape(token))
        .collect::<Vec<_>>()
        .join("|");
    match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!("cannot build placeholder matcher: {}", e);
            None
        }
    }
}

/// Replaces every occurrence of every key of `parts` in `template`.
///
/// All keys are replaced in one pass, so a value is never searched for
/// further keys. Keys can be any string, `{user.name}` as much as
/// `{title}`. Text without an entry, and the time-taken token, is left as
/// it is.
pub fn substitute(template: &str, parts: &Parts) -> String {
    let Some(matcher) = token_matcher(parts.iter().map(|(token, _)| token)) else {
        return template.to_string();
    };

    matcher
        .replace_all(template, |caps: &Captures| {
            let token = &caps[0];
            parts.get(token).unwrap_or(token).to_string()
        })
        .into_owned()
}

/// Drops the body template into the page template. The result still holds
/// the body's own tokens.
pub fn expand_body(page_template: &str, body: &str) -> String {
    page_template.replace(BODY_TOKEN, body)
}

/// Fills in the time-taken comment, in milliseconds with two decimals.
pub fn fill_time_taken(html: &str, millis: f64) -> String {
    html.replace(TIME_TAKEN_TOKEN, &format!("{:.2}", millis))
}
