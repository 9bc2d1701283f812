use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config, read_config_from};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    #[serde(default)]
    exam: ExamConfig,
    #[serde(default)]
    payouts: PayoutConfig,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
}

/// Exam rules shared by every module exam.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExamConfig {
    question_count: i64,
    duration_minutes: i64,
    cooldown_seconds: i64,
    passing_score: f64,
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            question_count: 10,
            duration_minutes: 20,
            cooldown_seconds: 300,
            passing_score: 70.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PayoutConfig {
    instructor_share_percent: i64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            instructor_share_percent: 70,
        }
    }
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    let config: Self = toml::from_slice(&bytes)?;
                    Ok(config)
                };

                let config = match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                };

                config
            })
            .await
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn exam(&self) -> &ExamConfig {
        &self.exam
    }

    #[inline]
    pub fn payouts(&self) -> &PayoutConfig {
        &self.payouts
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }
}

impl ExamConfig {
    pub fn new(
        question_count: i64,
        duration_minutes: i64,
        cooldown_seconds: i64,
        passing_score: f64,
    ) -> Self {
        Self {
            question_count,
            duration_minutes,
            cooldown_seconds,
            passing_score,
        }
    }

    #[inline]
    pub fn question_count(&self) -> i64 {
        self.question_count
    }

    #[inline]
    pub fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }

    #[inline]
    pub fn cooldown_seconds(&self) -> i64 {
        self.cooldown_seconds
    }

    #[inline]
    pub fn passing_score(&self) -> f64 {
        self.passing_score
    }
}

impl PayoutConfig {
    #[inline]
    pub fn instructor_share_percent(&self) -> i64 {
        self.instructor_share_percent
    }
}
