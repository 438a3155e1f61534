use anyhow::Result;

use super::base::ProviderConfig;

pub const DEFAULT_HOST: &str = "https://api.groq.com/openai";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";

pub struct GroqProviderConfig {
    pub api_key: String,
    pub host: String,
    pub model: String,
}

impl GroqProviderConfig {
    pub fn new(api_key: String, host: String, model: String) -> Self {
        Self { api_key, host, model }
    }
}

impl ProviderConfig for GroqProviderConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env("GROQ_API_KEY", true, None)?
            .ok_or_else(|| anyhow::anyhow!("Groq API key should be present"))?;

        let host = Self::get_env("GROQ_API_HOST", false, Some(DEFAULT_HOST.to_string()))?
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let model = Self::get_env("GROQ_MODEL", false, Some(DEFAULT_MODEL.to_string()))?
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, host, model))
    }
}
