use serde::Serialize;

/// One optimization note: either a modification performed automatically
/// (an action) or an advisory the engine declined to apply (a
/// recommendation).
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationAction {
    /// Kebab-case rule identifier.
    pub rule: &'static str,
    /// The project file the note refers to.
    pub filename: &'static str,
    pub title: String,
    pub description: String,
    /// Line in the *modified* file the note points at, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl OptimizationAction {
    pub fn new(
        rule: &'static str,
        filename: &'static str,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            rule,
            filename,
            title: title.into(),
            description: description.into(),
            line: None,
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        if line > 0 {
            self.line = Some(line);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_serialized_only_when_positive() {
        let action = OptimizationAction::new("some-rule", "Dockerfile", "title", "description");
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("line").is_none());
        assert_eq!(json["rule"], "some-rule");

        let action = action.with_line(0);
        let json = serde_json::to_value(&action).unwrap();
        assert!(json.get("line").is_none());

        let action = OptimizationAction::new("some-rule", "Dockerfile", "t", "d").with_line(7);
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["line"], 7);
    }
}
