use anyhow::{Context, Result, ensure};
use serde_json::Value;

/// Read-only wrapper over a project's package.json.
///
/// Keeps the original text for the output payload; the rules only need
/// script lookups.
#[derive(Debug, Clone)]
pub struct PackageJson {
    raw: String,
    data: Value,
}

impl PackageJson {
    pub fn parse(contents: &str) -> Result<Self> {
        let data: Value = serde_json::from_str(contents).context("parsing package.json")?;
        ensure!(
            data.is_object(),
            "package.json must be supplied as a JSON object"
        );
        Ok(Self {
            raw: contents.to_string(),
            data,
        })
    }

    /// The commands defined for the given script under `scripts.<name>`.
    ///
    /// eg- for `{"scripts": {"build": "babel ."}}`, `script("build")`
    /// returns `Some("babel .")`.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.data.get("scripts")?.get(name)?.as_str()
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }
}
