//! Preload hints for HTTP/2 server push.
//!
//! Resources the page is going to need are collected while it renders and
//! then advertised to the web server in a single `Link` header.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fetch destination of a pushed resource, the `as=` part of the hint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ResourceType {
    Image,
    Style,
    Script,
    Font,
    Fetch,
    Document,
    Other(String),
}

impl From<String> for ResourceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "image" => ResourceType::Image,
            "style" => ResourceType::Style,
            "script" => ResourceType::Script,
            "font" => ResourceType::Font,
            "fetch" => ResourceType::Fetch,
            "document" => ResourceType::Document,
            _ => ResourceType::Other(value),
        }
    }
}

impl From<ResourceType> for String {
    fn from(value: ResourceType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Image => "image",
            ResourceType::Style => "style",
            ResourceType::Script => "script",
            ResourceType::Font => "font",
            ResourceType::Fetch => "fetch",
            ResourceType::Document => "document",
            ResourceType::Other(name) => name,
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "(ResourceType, String)", into = "(ResourceType, String)")]
pub struct PushHint {
    pub kind: ResourceType,
    /// Only static files should go here. Relative to the site root.
    pub path: String,
}

impl PushHint {
    pub fn new(kind: ResourceType, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

impl From<(ResourceType, String)> for PushHint {
    fn from((kind, path): (ResourceType, String)) -> Self {
        Self { kind, path }
    }
}

impl From<PushHint> for (ResourceType, String) {
    fn from(hint: PushHint) -> Self {
        (hint.kind, hint.path)
    }
}

impl fmt::Display for PushHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>; rel=preload; as={}", self.path, self.kind)
    }
}

/// Where response headers go. The transport owns the real response; the
/// renderer only ever writes the one `Link` header through this.
pub trait HeaderSink {
    fn status(&self) -> u16;
    fn headers_sent(&self) -> bool;
    fn set_header(&mut self, name: &str, value: String);

    /// Redirects never get preload hints.
    fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status())
    }
}

/// In-memory response head. Servers copy it onto their own response type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub sent: bool,
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self::with_status(200)
    }
}

impl ResponseHead {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            sent: false,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl HeaderSink for ResponseHead {
    fn status(&self) -> u16 {
        self.status
    }

    fn headers_sent(&self) -> bool {
        self.sent
    }

    fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value));
    }
}

#[derive(Debug, Clone, Default)]
pub struct PushHints {
    items: Vec<PushHint>,
}

impl PushHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// The statically configured hints that go out with every page.
    pub fn from_static(items: &[PushHint]) -> Self {
        Self {
            items: items.to_vec(),
        }
    }

    pub fn add(&mut self, kind: ResourceType, path: impl Into<String>) {
        self.items.push(PushHint::new(kind, path));
    }

    pub fn items(&self) -> &[PushHint] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `Link` header value, or `None` if there is nothing to push.
    pub fn header_value(&self) -> Option<String> {
        if self.items.is_empty() {
            return None;
        }
        let parts: Vec<String> = self.items.iter().map(ToString::to_string).collect();
        Some(parts.join(", "))
    }

    /// Writes the `Link` header. Returns the number of hints sent, or `None`
    /// when pushing is disabled or there was nothing to send.
    pub fn emit(&self, enabled: bool, sink: &mut dyn HeaderSink) -> Option<usize> {
        if !enabled {
            return None;
        }
        let value = self.header_value()?;
        tracing::debug!(count = self.items.len(), "sending preload hints");
        sink.set_header("Link", value);
        Some(self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PushHints {
        let mut hints = PushHints::new();
        hints.add(ResourceType::Style, "/a.css");
        hints.add(ResourceType::Script, "/b.js");
        hints
    }

    #[test]
    fn test_emit_joins_hints_into_one_header() {
        let mut head = ResponseHead::default();
        let sent = sample().emit(true, &mut head);

        assert_eq!(sent, Some(2));
        assert_eq!(
            head.header("link"),
            Some("</a.css>; rel=preload; as=style, </b.js>; rel=preload; as=script")
        );
    }

    #[test]
    fn test_emit_disabled_sets_nothing() {
        let mut head = ResponseHead::default();
        assert_eq!(sample().emit(false, &mut head), None);
        assert!(head.headers.is_empty());
    }

    #[test]
    fn test_emit_empty_sets_nothing() {
        let mut head = ResponseHead::default();
        assert_eq!(PushHints::new().emit(true, &mut head), None);
        assert!(head.header("Link").is_none());
    }

    #[test]
    fn test_unknown_resource_type_round_trips_its_name() {
        let kind = ResourceType::from("track".to_string());
        assert_eq!(kind, ResourceType::Other("track".into()));
        assert_eq!(kind.to_string(), "track");
    }

    #[test]
    fn test_set_header_replaces_existing() {
        let mut head = ResponseHead::with_status(404);
        head.set_header("Link", "a".into());
        head.set_header("link", "b".into());
        assert_eq!(head.headers.len(), 1);
        assert_eq!(head.header("LINK"), Some("b"));
        assert!(!head.is_redirect());
    }

    #[test]
    fn test_redirect_statuses() {
        let redirects: Vec<bool> = [200, 299, 300, 303, 399, 404]
            .into_iter()
            .map(|status| ResponseHead::with_status(status).is_redirect())
            .collect();
        assert_eq!(redirects, vec![false, false, true, true, true, false]);
    }
}
