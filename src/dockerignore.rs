/// The project's .dockerignore file, if any.
#[derive(Debug, Clone)]
pub struct Dockerignore {
    raw: Option<String>,
}

impl Dockerignore {
    pub fn new(contents: Option<String>) -> Self {
        Self { raw: contents }
    }

    pub fn exists(&self) -> bool {
        self.raw.is_some()
    }

    /// Initialize an empty ignore file.
    pub fn create(&mut self) {
        self.raw = Some(String::new());
    }

    /// Append the entries that aren't already present, one per line.
    /// Returns the entries actually added.
    ///
    /// Membership is whole-line: an existing `node_modules/foo` line does
    /// not count as `node_modules`.
    pub fn add_if_not_present(&mut self, entries: &[&str]) -> Vec<String> {
        let raw = self.raw.get_or_insert_default();

        let mut added = Vec::new();
        for entry in entries {
            if raw.lines().any(|line| line.trim() == *entry) {
                continue;
            }
            if !raw.is_empty() && !raw.ends_with('\n') {
                raw.push('\n');
            }
            raw.push_str(entry);
            raw.push('\n');
            added.push(entry.to_string());
        }
        added
    }

    pub fn raw(&self) -> &str {
        self.raw.as_deref().unwrap_or("")
    }
}
