//! Runtime kind to base image resolution

use std::collections::HashMap;

/// Lookup table from a declared runtime kind ("node", "go", ...) to the base
/// image a synthesized Dockerfile starts from.
///
/// This is an explicit immutable configuration value owned by the caller,
/// not shared global state. An unresolved kind is a configuration problem
/// the caller must surface before synthesis.
#[derive(Debug, Clone)]
pub struct RuntimeImages {
    images: HashMap<String, String>,
}

impl RuntimeImages {
    /// Table with the runtimes the service supports out of the box.
    pub fn defaults() -> Self {
        let mut images = HashMap::new();
        images.insert("node".to_string(), "node:20-alpine".to_string());
        images.insert("go".to_string(), "golang:1.22-alpine".to_string());
        images.insert("python".to_string(), "python:3.12-slim".to_string());
        Self { images }
    }

    /// Build a table from explicit entries.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Self {
            images: entries.into_iter().collect(),
        }
    }

    /// Resolve a runtime kind to its base image.
    pub fn resolve(&self, kind: &str) -> Option<&str> {
        self.images.get(kind).map(String::as_str)
    }
}

impl Default for RuntimeImages {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_known_kinds() {
        let images = RuntimeImages::defaults();
        assert_eq!(images.resolve("node"), Some("node:20-alpine"));
        assert_eq!(images.resolve("go"), Some("golang:1.22-alpine"));
    }

    #[test]
    fn test_unknown_kind_is_none() {
        let images = RuntimeImages::defaults();
        assert_eq!(images.resolve("cobol"), None);
    }

    #[test]
    fn test_custom_entries_override_nothing_implicitly() {
        let images = RuntimeImages::from_entries([(
            "node".to_string(),
            "node:18-alpine".to_string(),
        )]);
        assert_eq!(images.resolve("node"), Some("node:18-alpine"));
        assert_eq!(images.resolve("go"), None);
    }
}
