use std::sync::Arc;

use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactStore, FsArtifactStore};
use crate::db_manager::DBManager;
use crate::lifecycle::LifecycleManager;
use crate::model::predictor::InferenceEngine;
use crate::model::trainer::CancelFlag;
use crate::time::{Clock, SystemClock};
use crate::utility::config::Config;
use crate::utility::errors::{EggrsError, EggrsResult};
use crate::utility::types::{ForecastItem, ForecastSummary, Prediction, Trend};

/// 프로세스 진입점이 조립하는 예측 서비스.
/// 저장소 핸들은 모두 여기서 한 번 만들어 각 컴포넌트에 주입한다.
pub struct ForecastService {
    db: Arc<DBManager>,
    engine: InferenceEngine,
    lifecycle: LifecycleManager,
    grades: Vec<String>,
}

impl ForecastService {
    pub fn new(
        config: &Config,
        db: Arc<DBManager>,
        store: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let engine = InferenceEngine::new(config.inference.clone(), store.clone());
        let lifecycle = LifecycleManager::new(
            config.lifecycle.clone(),
            config.training.clone(),
            db.clone(),
            store,
            clock,
        );
        Self {
            db,
            engine,
            lifecycle,
            grades: config.lifecycle.grades.clone(),
        }
    }

    /// 설정 파일 경로대로 SQLite와 모델 디렉터리를 열고 시스템 시계를 쓴다
    pub fn from_config(config: &Config) -> EggrsResult<Self> {
        let db = Arc::new(DBManager::open(&config.database.path)?);
        let store: Arc<dyn ArtifactStore> = Arc::new(FsArtifactStore::new(&config.artifacts.models_dir)?);
        info!(
            "🔧 [Service] DB={}, 모델 디렉터리={}",
            config.database.path, config.artifacts.models_dir
        );
        Ok(Self::new(config, db, store, Arc::new(SystemClock)))
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.lifecycle = self.lifecycle.with_cancel_flag(flag);
        self
    }

    pub fn db(&self) -> &Arc<DBManager> {
        &self.db
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }

    pub fn grades(&self) -> &[String] {
        &self.grades
    }

    /// 버전을 주지 않으면 레지스트리의 프로덕션 버전으로 예측한다
    pub fn predict(&self, grade: &str, version: Option<&str>) -> EggrsResult<Vec<Prediction>> {
        let version = match version {
            Some(v) => v.to_string(),
            None => self
                .db
                .production_version(grade)?
                .ok_or_else(|| EggrsError::model_not_found(grade, "production", "registry"))?,
        };
        let history = self.db.fetch_history(grade, None)?;
        self.engine.predict(&history, &version)
    }

    /// 프로덕션 모델로 예측하고 저장한다.
    /// 모델이 없거나 데이터가 부족하면 빈 목록을 돌려준다.
    pub fn run_predictions(&self, grade: &str) -> EggrsResult<Vec<Prediction>> {
        match self.predict(grade, None) {
            Ok(predictions) => {
                self.db.insert_predictions(&predictions)?;
                info!("💾 [Service] {} 예측 {}건 저장", grade, predictions.len());
                Ok(predictions)
            }
            Err(e) if e.is_recoverable() => {
                warn!("⚠️ [Service] {} 예측 건너뜀: {}", grade, e);
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub fn run_all_predictions(&self) -> Vec<Prediction> {
        self.grades
            .par_iter()
            .flat_map(|grade| match self.run_predictions(grade) {
                Ok(predictions) => predictions,
                Err(e) => {
                    error!("❌ [Service] {} 예측 실패: {}", grade, e);
                    Vec::new()
                }
            })
            .collect()
    }

    pub fn get_predictions(&self, grade: &str) -> EggrsResult<Vec<Prediction>> {
        self.db.latest_predictions(grade)
    }

    /// 저장된 최신 예측과 최근 소매가로 요약을 만든다. 예측이 없으면 None.
    pub fn forecast_summary(&self, grade: &str) -> EggrsResult<Option<ForecastSummary>> {
        let predictions = self.get_predictions(grade)?;
        if predictions.is_empty() {
            return Ok(None);
        }
        let current_price = self
            .db
            .latest_observation(grade)?
            .and_then(|o| o.retail_price);
        Ok(Some(summarize(grade, current_price, &predictions)))
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// horizon 오름차순 예측 목록을 요약한다. 추세는 가장 짧은 horizon의 변화율로 정한다.
pub fn summarize(grade: &str, current_price: Option<f64>, predictions: &[Prediction]) -> ForecastSummary {
    let base = current_price.filter(|p| *p > 0.0);
    let items: Vec<ForecastItem> = predictions
        .iter()
        .map(|p| ForecastItem {
            target_date: p.target_date,
            horizon_days: p.horizon_days,
            price: p.predicted_price,
            confidence_interval: (p.confidence_lower, p.confidence_upper),
            change_percent: base
                .map(|c| round1((p.predicted_price - c) / c * 100.0))
                .unwrap_or(0.0),
        })
        .collect();

    let (trend, alert) = match (items.first(), base) {
        (Some(first), Some(_)) => {
            let pct = first.change_percent;
            let trend = Trend::from_change_percent(pct);
            let alert = match trend {
                Trend::Flat => format!("향후 {}일간 가격 변동 미미", first.horizon_days),
                _ => format!(
                    "향후 {}일간 {:.1}% {} 예상",
                    first.horizon_days,
                    pct.abs(),
                    trend.label()
                ),
            };
            (trend, Some(alert))
        }
        _ => (Trend::Flat, None),
    };

    ForecastSummary {
        grade: grade.to_string(),
        current_price,
        items,
        trend,
        alert,
    }
}
