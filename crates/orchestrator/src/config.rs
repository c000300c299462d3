//! Orchestrator configuration.

use std::env;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Built-in assistant instructions used when no prompt is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Ти - ввічливий консультант інтернет-магазину одягу. \
Відповідай коротко, українською (або мовою клієнта), спирайся лише на дані про товари з контексту. \
Не вигадуй ціни та наявність. Допоможи підібрати розмір, запропонуй супутні товари, \
а коли клієнт готовий купити - збери ПІБ, телефон, місто та відділення Нової Пошти.";

/// Reply sent when a conversation is handed to a human.
pub const DEFAULT_ESCALATION_REPLY: &str =
    "Дякуємо за звернення! Передаю ваше повідомлення менеджеру, він зв'яжеться з вами найближчим часом.";

/// Reply sent when generation fails.
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Вибачте, зараз не можу відповісти. Менеджер напише вам найближчим часом.";

/// Phrases that hand the conversation to a human (Ukrainian, Russian, English).
pub const DEFAULT_ESCALATION_PHRASES: &[&str] = &[
    "менеджер",
    "оператор",
    "жива людина",
    "живой человек",
    "скарга",
    "жалоба",
    "шахрай",
    "мошенник",
    "обман",
    "верніть гроші",
    "верните деньги",
    "manager",
    "operator",
    "human",
    "complaint",
    "fraud",
    "scam",
];

/// Settings for the conversation pipeline.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Assistant instructions placed at the top of every system instruction.
    pub system_prompt: String,
    /// Lowercase escalation phrases, checked in order.
    pub escalation_phrases: Vec<String>,
    pub escalation_reply: String,
    pub fallback_reply: String,
    /// Transcript messages included in the generation context.
    pub history_limit: usize,
    /// Catalog hits included in the generation context.
    pub product_context_limit: usize,
    pub generation_timeout: Duration,
    /// Known product names and their CRM ids.
    pub product_ids: IndexMap<String, i64>,
    /// Entries kept by the in-memory dedup set.
    pub dedup_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            escalation_phrases: DEFAULT_ESCALATION_PHRASES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            escalation_reply: DEFAULT_ESCALATION_REPLY.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
            history_limit: 10,
            product_context_limit: 5,
            generation_timeout: Duration::from_secs(60),
            product_ids: IndexMap::new(),
            dedup_capacity: 10_000,
        }
    }
}

impl OrchestratorConfig {
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Load configuration from environment variables.
    ///
    /// - `SYSTEM_PROMPT`: inline instructions (takes precedence)
    /// - `SYSTEM_PROMPT_FILE`: instructions file (default: SYSTEM_PROMPT.md)
    /// - `ESCALATION_PHRASES_FILE`: one phrase per line
    /// - `ESCALATION_REPLY`, `FALLBACK_REPLY`: fixed reply texts
    /// - `HISTORY_LIMIT` (10), `PRODUCT_CONTEXT_LIMIT` (5), `GENERATION_TIMEOUT_SECS` (60)
    /// - `PRODUCT_ID_MAP_FILE`: JSON object of product name to CRM id
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        match env::var("SYSTEM_PROMPT").ok().filter(|p| !p.trim().is_empty()) {
            Some(prompt) => builder = builder.system_prompt(prompt.trim()),
            None => {
                let path =
                    env::var("SYSTEM_PROMPT_FILE").unwrap_or_else(|_| "SYSTEM_PROMPT.md".to_string());
                builder = builder.load_prompt_file(path);
            }
        }

        if let Ok(path) = env::var("ESCALATION_PHRASES_FILE") {
            builder = builder.escalation_phrases(load_phrases_file(&path)?);
        }
        if let Ok(reply) = env::var("ESCALATION_REPLY") {
            builder = builder.escalation_reply(reply);
        }
        if let Ok(reply) = env::var("FALLBACK_REPLY") {
            builder = builder.fallback_reply(reply);
        }

        builder = builder
            .history_limit(env_parse("HISTORY_LIMIT", 10)?)
            .product_context_limit(env_parse("PRODUCT_CONTEXT_LIMIT", 5)?)
            .generation_timeout(Duration::from_secs(env_parse("GENERATION_TIMEOUT_SECS", 60)?));

        if let Ok(path) = env::var("PRODUCT_ID_MAP_FILE") {
            builder = builder.product_ids(load_product_ids(&path)?);
        }

        Ok(builder.build())
    }
}

/// Builder for [`OrchestratorConfig`].
#[derive(Debug, Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Use the file's contents as the prompt if it exists and is non-empty.
    pub fn load_prompt_file(mut self, path: impl AsRef<Path>) -> Self {
        if let Some(prompt) = load_prompt_file(path) {
            self.config.system_prompt = prompt;
        }
        self
    }

    pub fn escalation_phrases(mut self, phrases: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.config.escalation_phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    pub fn escalation_reply(mut self, reply: impl Into<String>) -> Self {
        self.config.escalation_reply = reply.into();
        self
    }

    pub fn fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.config.fallback_reply = reply.into();
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit;
        self
    }

    pub fn product_context_limit(mut self, limit: usize) -> Self {
        self.config.product_context_limit = limit;
        self
    }

    pub fn generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    pub fn product_ids(mut self, ids: IndexMap<String, i64>) -> Self {
        self.config.product_ids = ids;
        self
    }

    pub fn product_id(mut self, name: impl Into<String>, pid: i64) -> Self {
        self.config.product_ids.insert(name.into(), pid);
        self
    }

    pub fn dedup_capacity(mut self, capacity: usize) -> Self {
        self.config.dedup_capacity = capacity.max(1);
        self
    }

    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

fn env_parse<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Load a prompt file, returning None if not found or empty.
fn load_prompt_file(path: impl AsRef<Path>) -> Option<String> {
    let path = path.as_ref();

    match std::fs::read_to_string(path) {
        Ok(content) => {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                warn!("Prompt file {} is empty, using built-in prompt", path.display());
                None
            } else {
                info!("Loaded system prompt from {}", path.display());
                Some(trimmed.to_string())
            }
        }
        Err(_) => None,
    }
}

/// One phrase per line; blank lines and `#` comments are skipped.
pub fn load_phrases_file(path: impl AsRef<Path>) -> Result<Vec<String>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_lowercase)
        .collect())
}

/// JSON object mapping product names to CRM product ids.
pub fn load_product_ids(path: impl AsRef<Path>) -> Result<IndexMap<String, i64>, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
