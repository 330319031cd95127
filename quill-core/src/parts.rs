//! The placeholder mapping and the processors that may rewrite it just
//! before it is dropped into the page template.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::ConfigError;

/// Placeholder token (braces included, e.g. `{content}`) to replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parts {
    values: BTreeMap<String, String>,
}

impl Parts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        self.values.insert(token.into(), value.into());
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.values.get(token).map(String::as_str)
    }

    pub fn get_mut(&mut self, token: &str) -> Option<&mut String> {
        self.values.get_mut(token)
    }

    pub fn remove(&mut self, token: &str) -> Option<String> {
        self.values.remove(token)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.values.contains_key(token)
    }

    /// Appends to an existing part, creating it if needed.
    pub fn append(&mut self, token: &str, value: &str) {
        self.values
            .entry(token.to_string())
            .or_default()
            .push_str(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Parts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// A hook that sees every page's parts right before substitution.
pub trait PartProcessor: Send + Sync {
    fn process(&self, parts: &mut Parts);
}

impl<F> PartProcessor for F
where
    F: Fn(&mut Parts) + Send + Sync,
{
    fn process(&self, parts: &mut Parts) {
        self(parts)
    }
}

/// Processors that can be switched on by name from the settings file.
#[derive(Default, Clone)]
pub struct ProcessorCatalog {
    known: BTreeMap<String, Arc<dyn PartProcessor>>,
}

impl ProcessorCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, processor: impl PartProcessor + 'static) {
        self.known.insert(name.into(), Arc::new(processor));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PartProcessor>> {
        self.known.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.known.keys().map(String::as_str)
    }
}

impl fmt::Debug for ProcessorCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.known.keys()).finish()
    }
}

/// Processors in the order they were registered, which is the order they run.
#[derive(Default, Clone)]
pub struct PartProcessorRegistry {
    processors: Vec<Arc<dyn PartProcessor>>,
}

impl PartProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, processor: impl PartProcessor + 'static) {
        self.processors.push(Arc::new(processor));
    }

    /// Registers the catalog entry called `name`.
    pub fn register_named(
        &mut self,
        name: &str,
        catalog: &ProcessorCatalog,
    ) -> Result<(), ConfigError> {
        let processor = catalog
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPartProcessor(name.to_string()))?;
        tracing::debug!("registered part processor '{}'", name);
        self.processors.push(processor);
        Ok(())
    }

    pub fn run_all(&self, parts: &mut Parts) {
        for processor in &self.processors {
            processor.process(parts);
        }
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl fmt::Debug for PartProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartProcessorRegistry")
            .field("processors", &self.processors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processors_run_in_registration_order() {
        let mut registry = PartProcessorRegistry::new();
        registry.register(|parts: &mut Parts| parts.append("{extra}", "a"));
        registry.register(|parts: &mut Parts| parts.append("{extra}", "b"));
        registry.register(|parts: &mut Parts| parts.append("{extra}", "c"));

        let mut parts = Parts::new();
        parts.insert("{extra}", "");
        registry.run_all(&mut parts);

        assert_eq!(parts.get("{extra}"), Some("abc"));
    }

    #[test]
    fn test_processor_can_remove_and_rewrite() {
        let mut registry = PartProcessorRegistry::new();
        registry.register(|parts: &mut Parts| {
            parts.remove("{footer-message}");
            if let Some(title) = parts.get_mut("{title}") {
                title.push_str(" - Draft");
            }
        });

        let mut parts: Parts = [("{title}", "Home"), ("{footer-message}", "bye")]
            .into_iter()
            .collect();
        registry.run_all(&mut parts);

        assert_eq!(parts.get("{title}"), Some("Home - Draft"));
        assert!(!parts.contains("{footer-message}"));
    }

    #[test]
    fn test_register_named() {
        let mut catalog = ProcessorCatalog::new();
        catalog.insert("shout", |parts: &mut Parts| {
            if let Some(content) = parts.get_mut("{content}") {
                *content = content.to_uppercase();
            }
        });

        let mut registry = PartProcessorRegistry::new();
        registry.register_named("shout", &catalog).unwrap();
        assert_eq!(registry.len(), 1);

        let err = registry.register_named("whisper", &catalog).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPartProcessor(ref n) if n == "whisper"));
        assert_eq!(registry.len(), 1);

        let mut parts = Parts::new();
        parts.insert("{content}", "hi");
        registry.run_all(&mut parts);
        assert_eq!(parts.get("{content}"), Some("HI"));
    }
}
