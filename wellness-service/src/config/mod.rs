use secrecy::Secret;
use service_core::config::{self as core_config, get_env};
use service_core::error::AppError;
use std::path::PathBuf;

/// Default Gemini endpoint root; the `/v1beta` and `/upload/v1beta` paths hang off it.
const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const DEFAULT_MODEL: &str = "gemini-1.5-pro";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Request bodies carry images and history files, so the default is well
/// above axum's 2MB.
const DEFAULT_MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Standing instructions given to the model with every exchange.
pub const SYSTEM_INSTRUCTION: &str = "\
You are a helpful wellness assistant that provides health and wellness advice based on user input.
Your responsibilities include:
1. Food Image Analysis: Analyze nutritional content of food images
2. Wellness Chat: Provide supportive responses for mental and physical health
3. Daily Productivity Tips: Offer actionable wellness-focused productivity advice
4. Mood Tracking: Respond to emotional states with empathy and practical suggestions
5. Exercise Recommendations: Suggest safe and effective exercises
6. Health Assessment: Provide comprehensive health-related feedback
7. Goal Tracking: Support users in their wellness journey with encouragement

Always prioritize:
- Safety and well-being
- Evidence-based recommendations
- Inclusive and supportive language
- Privacy-conscious responses
- Clear warnings about consulting healthcare professionals when needed";

#[derive(Debug, Clone)]
pub struct WellnessConfig {
    pub common: core_config::Config,
    pub google: GoogleConfig,
    pub models: ModelConfig,
    pub staging: StagingConfig,
    pub session: SessionConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub api_key: Secret<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: ProviderKind,
    /// Generation model, e.g. gemini-1.5-pro
    pub text_model: String,
    pub system_instruction: String,
}

#[derive(Debug, Clone)]
pub struct StagingConfig {
    /// Directory holding attachments while they are uploaded.
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub scope: SessionScopeKind,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub max_body_bytes: usize,
    /// Return gateway failures as `200` success envelopes carrying the error
    /// text, the way earlier clients expect.
    pub failures_as_text: bool,
}

/// Backend answering the prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    /// Canned replies, no network; for local runs and tests.
    Mock,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(format!("Invalid provider: {}", s)),
        }
    }
}

/// Whether all requests share one running conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionScopeKind {
    Shared,
    Isolated,
}

impl std::str::FromStr for SessionScopeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "shared" => Ok(SessionScopeKind::Shared),
            "isolated" | "per-request" => Ok(SessionScopeKind::Isolated),
            _ => Err(format!("Invalid session scope: {}", s)),
        }
    }
}

impl WellnessConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        Self::from_lookup(
            common_config,
            &core_config::env_lookup,
            core_config::is_production(),
        )
    }

    /// Assemble the config from an arbitrary key lookup.
    pub fn from_lookup<F>(
        common: core_config::Config,
        lookup: &F,
        is_prod: bool,
    ) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // GEMINI_API_KEY is the older name; a blank GOOGLE_API_KEY defers to it.
        let api_key = match lookup("GOOGLE_API_KEY").filter(|key| !key.trim().is_empty()) {
            Some(key) => key,
            None => get_env(lookup, "GEMINI_API_KEY", None, is_prod)?,
        };
        if api_key.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "GOOGLE_API_KEY must not be empty"
            )));
        }

        let default_staging = std::env::temp_dir().join("wellness-staging");

        Ok(WellnessConfig {
            common,
            google: GoogleConfig {
                api_key: Secret::new(api_key),
                api_base: get_env(lookup, "GEMINI_API_BASE", Some(DEFAULT_API_BASE), is_prod)?,
                timeout_secs: parse_env(
                    lookup,
                    "GEMINI_TIMEOUT_SECS",
                    DEFAULT_TIMEOUT_SECS,
                    is_prod,
                )?,
            },
            models: ModelConfig {
                provider: get_env(lookup, "WELLNESS_PROVIDER", Some("gemini"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
                text_model: get_env(lookup, "GEMINI_MODEL", Some(DEFAULT_MODEL), is_prod)?,
                system_instruction: lookup("WELLNESS_SYSTEM_INSTRUCTION")
                    .unwrap_or_else(|| SYSTEM_INSTRUCTION.to_string()),
            },
            staging: StagingConfig {
                dir: PathBuf::from(get_env(
                    lookup,
                    "WELLNESS_STAGING_DIR",
                    default_staging.to_str(),
                    is_prod,
                )?),
            },
            session: SessionConfig {
                scope: get_env(lookup, "WELLNESS_SESSION_SCOPE", Some("shared"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            http: HttpConfig {
                max_body_bytes: parse_env(
                    lookup,
                    "WELLNESS_MAX_BODY_BYTES",
                    DEFAULT_MAX_BODY_BYTES,
                    is_prod,
                )?,
                failures_as_text: parse_env(lookup, "WELLNESS_FAILURES_AS_TEXT", false, is_prod)?,
            },
        })
    }
}

fn parse_env<F, T>(lookup: &F, key: &str, default: T, is_prod: bool) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + ToString,
    T::Err: std::fmt::Display,
{
    get_env(lookup, key, Some(&default.to_string()), is_prod)?
        .parse()
        .map_err(|e: T::Err| AppError::ConfigError(anyhow::anyhow!("Invalid {}: {}", key, e)))
}
