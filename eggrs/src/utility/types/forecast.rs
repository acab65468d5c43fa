use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 한 horizon에 대한 예측 결과. 생성 후 변경되지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub base_date: NaiveDate,
    pub target_date: NaiveDate,
    pub grade: String,
    pub predicted_price: f64,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
    pub horizon_days: i64,
    pub model_version: String,
}

/// 가격 단위로 역변환된 평가 지표
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
    pub directional_accuracy: f64,
}

impl Metrics {
    pub fn new(mae: f64, rmse: f64, mape: f64, directional_accuracy: f64) -> Self {
        Self {
            mae,
            rmse,
            mape,
            directional_accuracy,
        }
    }
}

impl fmt::Display for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MAE={:.2}, RMSE={:.2}, MAPE={:.2}%, 방향정확도={:.2}%",
            self.mae, self.rmse, self.mape, self.directional_accuracy
        )
    }
}

/// 학습 보고서에 기록하는 성능 목표치
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTargets {
    pub max_mae: f64,
    pub max_rmse: f64,
    pub max_mape: f64,
    pub min_directional_accuracy: f64,
}

impl Default for PerformanceTargets {
    fn default() -> Self {
        Self {
            max_mae: 100.0,
            max_rmse: 150.0,
            max_mape: 5.0,
            min_directional_accuracy: 70.0,
        }
    }
}

impl PerformanceTargets {
    /// 목표를 벗어난 지표 설명 목록
    pub fn misses(&self, metrics: &Metrics) -> Vec<String> {
        let mut misses = Vec::new();
        if metrics.mae > self.max_mae {
            misses.push(format!("MAE {} > 목표 {}", metrics.mae, self.max_mae));
        }
        if metrics.rmse > self.max_rmse {
            misses.push(format!("RMSE {} > 목표 {}", metrics.rmse, self.max_rmse));
        }
        if metrics.mape > self.max_mape {
            misses.push(format!("MAPE {}% > 목표 {}%", metrics.mape, self.max_mape));
        }
        if metrics.directional_accuracy < self.min_directional_accuracy {
            misses.push(format!(
                "방향정확도 {}% < 목표 {}%",
                metrics.directional_accuracy, self.min_directional_accuracy
            ));
        }
        misses
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochLoss {
    pub epoch: usize,
    pub train_loss: f64,
    pub val_loss: f64,
}

/// (grade, version)별 학습 결과 보고서
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub grade: String,
    pub model_version: String,
    pub train_date: NaiveDate,
    pub total_samples: usize,
    pub train_samples: usize,
    pub val_samples: usize,
    pub best_val_loss: f64,
    pub epochs_trained: usize,
    pub metrics: Metrics,
    pub history: Vec<EpochLoss>,
    pub targets: PerformanceTargets,
}

/// append-only 성능 기록. 등급별 is_production=true는 최대 하나.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub id: i64,
    pub model_version: String,
    pub grade: String,
    pub eval_date: NaiveDate,
    pub metrics: Metrics,
    pub is_production: bool,
    pub created_at: NaiveDateTime,
}

/// 모델 버전 레지스트리 항목 (아티팩트 바이트와 분리된 메타데이터)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersionEntry {
    pub grade: String,
    pub version: String,
    pub created_at: NaiveDateTime,
    /// 외부에서 넣은 버전은 학습일을 모를 수 있다
    pub train_date: Option<NaiveDate>,
    pub is_production: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Promote,
    KeepCurrent,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Promote => "promote",
            Recommendation::KeepCurrent => "keep_current",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A/B 비교 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub grade: String,
    pub candidate_version: String,
    pub candidate_metrics: Metrics,
    pub production_version: Option<String>,
    pub production_metrics: Option<Metrics>,
    /// 프로덕션이 없으면 None
    pub improvements: Option<usize>,
    pub recommendation: Recommendation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    ModelMissing { artifact: String },
    NotEnoughHistory { required: usize, available: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ModelMissing { artifact } => write!(f, "모델 아티팩트 없음 ({})", artifact),
            SkipReason::NotEnoughHistory {
                required,
                available,
            } => write!(f, "평가 데이터 부족 (필요 {}행, 보유 {}행)", required, available),
        }
    }
}

/// 평가 결과. Skipped는 실패가 아니라 "아직 데이터 없음" 상태다.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    Scored(Metrics),
    Skipped(SkipReason),
}

impl EvaluationOutcome {
    pub fn metrics(&self) -> Option<&Metrics> {
        match self {
            EvaluationOutcome::Scored(m) => Some(m),
            EvaluationOutcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rising,
    Falling,
    Flat,
}

impl Trend {
    /// 7일 변화율(%) 기준: +1% 이상 상승, -1% 이하 하락
    pub fn from_change_percent(change_percent: f64) -> Self {
        if change_percent >= 1.0 {
            Trend::Rising
        } else if change_percent <= -1.0 {
            Trend::Falling
        } else {
            Trend::Flat
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Trend::Rising => "상승",
            Trend::Falling => "하락",
            Trend::Flat => "보합",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastItem {
    pub target_date: NaiveDate,
    pub horizon_days: i64,
    pub price: f64,
    pub confidence_interval: (f64, f64),
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub grade: String,
    pub current_price: Option<f64>,
    pub items: Vec<ForecastItem>,
    pub trend: Trend,
    pub alert: Option<String>,
}
