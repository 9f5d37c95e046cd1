//! Stream metadata announced to the server in the `ice-*` headers.

use serde::Deserialize;

/// Descriptive metadata for the stream being sourced. Immutable once a session
/// is connected with it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StreamDescriptor {
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default)]
    pub url: String,
}

fn default_content_type() -> String {
    "audio/mpeg".to_string()
}

impl Default for StreamDescriptor {
    fn default() -> Self {
        Self {
            content_type: default_content_type(),
            public: false,
            private: false,
            name: String::new(),
            description: String::new(),
            genre: String::new(),
            url: String::new(),
        }
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

impl StreamDescriptor {
    /// `ice-*` header pairs, booleans as "1"/"0".
    pub fn ice_headers(&self) -> [(&'static str, &str); 6] {
        [
            ("ice-public", flag(self.public)),
            ("ice-private", flag(self.private)),
            ("ice-name", &self.name),
            ("ice-description", &self.description),
            ("ice-genre", &self.genre),
            ("ice-url", &self.url),
        ]
    }
}
