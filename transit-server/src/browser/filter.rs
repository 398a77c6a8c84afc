//! Request-level resource filtering.

use std::collections::BTreeSet;

/// Kind of sub-resource a page requests while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceType {
    Document,
    Script,
    Stylesheet,
    Image,
    Font,
    Media,
    Other,
}

impl ResourceType {
    /// Guess the resource type of a request from its URL path extension.
    pub fn from_url(url: &str) -> ResourceType {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let ext = path
            .rsplit_once('.')
            .filter(|(_, ext)| !ext.contains('/'))
            .map(|(_, ext)| ext.to_ascii_lowercase());

        match ext.as_deref() {
            Some("png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" | "ico" | "bmp") => {
                ResourceType::Image
            }
            Some("css") => ResourceType::Stylesheet,
            Some("woff" | "woff2" | "ttf" | "otf" | "eot") => ResourceType::Font,
            Some("mp4" | "webm" | "mp3" | "ogg") => ResourceType::Media,
            Some("js" | "mjs") => ResourceType::Script,
            Some("html" | "htm" | "php") | None => ResourceType::Document,
            Some(_) => ResourceType::Other,
        }
    }

    /// URL patterns (Chrome `Network.setBlockedURLs` syntax) matching this type,
    /// with and without a query string.
    pub fn url_patterns(&self) -> &'static [&'static str] {
        match self {
            ResourceType::Image => &[
                "*.png", "*.png?*", "*.jpg", "*.jpg?*", "*.jpeg", "*.jpeg?*", "*.gif", "*.gif?*",
                "*.webp", "*.webp?*", "*.svg", "*.svg?*", "*.ico", "*.ico?*", "*.bmp", "*.bmp?*",
            ],
            ResourceType::Stylesheet => &["*.css", "*.css?*"],
            ResourceType::Font => &[
                "*.woff", "*.woff?*", "*.woff2", "*.woff2?*", "*.ttf", "*.ttf?*", "*.otf",
                "*.otf?*", "*.eot", "*.eot?*",
            ],
            ResourceType::Media => &[
                "*.mp4", "*.mp4?*", "*.webm", "*.webm?*", "*.mp3", "*.mp3?*", "*.ogg", "*.ogg?*",
            ],
            ResourceType::Document | ResourceType::Script | ResourceType::Other => &[],
        }
    }
}

/// Which sub-resources a page load may fetch.
///
/// The default blocks images, stylesheets and fonts: none of them affect
/// the DOM we extract from, and skipping them makes page loads cheaper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFilter {
    blocked: BTreeSet<ResourceType>,
}

impl ResourceFilter {
    /// A filter that allows everything.
    pub fn allow_all() -> Self {
        Self {
            blocked: BTreeSet::new(),
        }
    }

    /// Additionally block `resource_type`.
    pub fn block(mut self, resource_type: ResourceType) -> Self {
        self.blocked.insert(resource_type);
        self
    }

    pub fn allows(&self, resource_type: ResourceType) -> bool {
        !self.blocked.contains(&resource_type)
    }

    /// Whether a request for `url` would be let through.
    pub fn allows_url(&self, url: &str) -> bool {
        self.allows(ResourceType::from_url(url))
    }

    pub fn blocked(&self) -> impl Iterator<Item = ResourceType> + '_ {
        self.blocked.iter().copied()
    }

    /// All URL patterns to hand to the browser's request blocker.
    pub fn blocked_url_patterns(&self) -> Vec<&'static str> {
        self.blocked
            .iter()
            .flat_map(|t| t.url_patterns().iter().copied())
            .collect()
    }
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self::allow_all()
            .block(ResourceType::Image)
            .block(ResourceType::Stylesheet)
            .block(ResourceType::Font)
    }
}
