/// A container image reference as it appears in a FROM statement.
///
/// Only the `name:tag` shape is modeled; a missing tag defaults to
/// `latest`. Digest references are treated as part of the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    name: String,
    tag: String,
}

impl Image {
    pub fn new(full_name: &str) -> Self {
        let (name, tag) = match full_name.split_once(':') {
            Some((name, tag)) => (name.to_string(), tag.to_string()),
            None => (full_name.to_string(), "latest".to_string()),
        };
        Self { name, tag }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn full_name(&self) -> String {
        format!("{}:{}", self.name, self.tag)
    }

    /// Whether the image is a light one, ie either alpine- or slim-based.
    pub fn is_alpine_or_slim(&self) -> bool {
        self.tag.contains("alpine") || self.tag.contains("slim")
    }

    /// The alpine equivalent of the currently set tag: same version, but
    /// alpine-based. An already-alpine tag is returned unchanged.
    ///
    /// eg- "latest" -> "alpine", "22.9.0" -> "22.9.0-alpine".
    pub fn alpine_equivalent_tag(&self) -> String {
        match self.tag.as_str() {
            tag if tag.contains("alpine") => tag.to_string(),
            "latest" => "alpine".to_string(),
            tag => format!("{tag}-alpine"),
        }
    }
}
