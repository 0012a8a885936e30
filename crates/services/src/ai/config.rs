use std::{env, fmt};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

#[derive(Clone)]
pub struct AiConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for AiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl AiConfig {
    /// Read `QUIZ_AI_API_KEY`, `QUIZ_AI_BASE_URL` and `QUIZ_AI_MODEL`.
    ///
    /// Returns `None` when no key is set, which disables AI questions.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("QUIZ_AI_API_KEY")?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = lookup("QUIZ_AI_BASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = lookup("QUIZ_AI_MODEL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }

    /// Full `generateContent` endpoint for the configured model.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_or_blank_key_disables() {
        assert!(AiConfig::from_lookup(lookup(&[])).is_none());
        assert!(AiConfig::from_lookup(lookup(&[("QUIZ_AI_API_KEY", "  ")])).is_none());
    }

    #[test]
    fn defaults_fill_base_url_and_model() {
        let config = AiConfig::from_lookup(lookup(&[("QUIZ_AI_API_KEY", "k")])).unwrap();
        assert_eq!(
            config.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn overrides_are_respected() {
        let config = AiConfig::from_lookup(lookup(&[
            ("QUIZ_AI_API_KEY", "k"),
            ("QUIZ_AI_BASE_URL", "http://localhost:9000/"),
            ("QUIZ_AI_MODEL", "test-model"),
        ]))
        .unwrap();
        assert_eq!(
            config.endpoint(),
            "http://localhost:9000/models/test-model:generateContent"
        );
    }

    #[test]
    fn debug_output_hides_the_key() {
        let config = AiConfig::from_lookup(lookup(&[("QUIZ_AI_API_KEY", "SECRET123")])).unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SECRET123"));
        assert!(rendered.contains("<redacted>"));
    }
}
