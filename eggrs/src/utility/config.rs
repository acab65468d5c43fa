use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("설정 파일을 찾을 수 없습니다: {0}")]
    FileNotFound(String),
    #[error("설정 파일 읽기 오류: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("설정 파일 파싱 오류: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("설정 유효성 검증 실패: {0}")]
    ValidationError(String),
}

/// 전체 설정. 엔트리 포인트에서 한 번 로드해 각 컴포넌트에 명시적으로 전달한다.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "eggprice.db".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ArtifactsConfig {
    pub models_dir: String,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            models_dir: "trained_models".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// 검증 손실이 개선되지 않아도 기다리는 epoch 수
    pub patience: usize,
    pub validation_ratio: f64,
    /// 가중치 초기화/셔플/드롭아웃 시드 (없으면 매번 무작위)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 32,
            learning_rate: 0.001,
            patience: 10,
            validation_ratio: 0.2,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InferenceConfig {
    pub mc_dropout_passes: usize,
    /// 90% 신뢰구간 → z = 1.645
    pub ci_z_score: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            mc_dropout_passes: 50,
            ci_z_score: 1.645,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LifecycleConfig {
    pub grades: Vec<String>,
    pub eval_days: usize,
    /// MAPE(%)가 이 값을 넘으면 재학습
    pub mape_retrain_threshold: f64,
    pub retrain_interval_days: i64,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grades: ["왕란", "특란", "대란", "중란", "소란"]
                .iter()
                .map(|g| g.to_string())
                .collect(),
            eval_days: 30,
            mape_retrain_threshold: 7.0,
            retrain_interval_days: 30,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// config.toml 파일에서 설정을 로드
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("config.toml")
    }

    /// 지정된 파일에서 설정을 로드
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(format!(
                "{}가 없습니다. config.example.toml을 복사해서 config.toml을 만들고 설정을 채워주세요.",
                path
            )));
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        // 환경 변수로 오버라이드
        config.apply_env_overrides();

        config.validate()?;

        Ok(config)
    }

    /// 환경 변수로 설정을 오버라이드
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("EGGRS_DB_PATH") {
            self.database.path = path;
        }
        if let Ok(dir) = std::env::var("EGGRS_MODELS_DIR") {
            self.artifacts.models_dir = dir;
        }
        if let Ok(threshold) = std::env::var("EGGRS_MAPE_RETRAIN_THRESHOLD") {
            if let Ok(value) = threshold.parse::<f64>() {
                self.lifecycle.mape_retrain_threshold = value;
            }
        }
        if let Ok(days) = std::env::var("EGGRS_RETRAIN_INTERVAL_DAYS") {
            if let Ok(value) = days.parse::<i64>() {
                self.lifecycle.retrain_interval_days = value;
            }
        }

        // 로그 레벨
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.training.epochs == 0 {
            return Err(ConfigError::ValidationError(
                "training.epochs는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "training.batch_size는 1 이상이어야 합니다".to_string(),
            ));
        }
        if !(self.training.learning_rate > 0.0 && self.training.learning_rate.is_finite()) {
            return Err(ConfigError::ValidationError(
                "training.learning_rate는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.training.validation_ratio <= 0.0 || self.training.validation_ratio >= 1.0 {
            return Err(ConfigError::ValidationError(
                "training.validation_ratio는 0~1 사이여야 합니다".to_string(),
            ));
        }

        if self.inference.mc_dropout_passes < 2 {
            return Err(ConfigError::ValidationError(
                "inference.mc_dropout_passes는 2 이상이어야 합니다".to_string(),
            ));
        }
        if self.inference.ci_z_score <= 0.0 {
            return Err(ConfigError::ValidationError(
                "inference.ci_z_score는 0보다 커야 합니다".to_string(),
            ));
        }

        if self.lifecycle.grades.is_empty() {
            return Err(ConfigError::ValidationError(
                "lifecycle.grades가 비어있습니다".to_string(),
            ));
        }
        if self.lifecycle.eval_days == 0 {
            return Err(ConfigError::ValidationError(
                "lifecycle.eval_days는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.lifecycle.mape_retrain_threshold <= 0.0 || self.lifecycle.mape_retrain_threshold > 100.0 {
            return Err(ConfigError::ValidationError(
                "lifecycle.mape_retrain_threshold는 0~100 사이여야 합니다".to_string(),
            ));
        }
        if self.lifecycle.retrain_interval_days <= 0 {
            return Err(ConfigError::ValidationError(
                "lifecycle.retrain_interval_days는 1 이상이어야 합니다".to_string(),
            ));
        }

        // 로그 레벨 검증 (RUST_LOG 필터 문법은 그대로 허용)
        let level = self.logging.level.to_lowercase();
        let is_simple_level = matches!(
            level.as_str(),
            "error" | "warn" | "info" | "debug" | "trace"
        );
        if !is_simple_level && !level.contains('=') {
            return Err(ConfigError::ValidationError(
                "log level은 'error', 'warn', 'info', 'debug', 'trace' 중 하나여야 합니다"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// 설정을 파일로 저장 (주로 디버깅용)
    pub fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("직렬화 오류: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}
