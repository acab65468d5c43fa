use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use ndarray::{s, Array2, Axis};
use rayon::prelude::*;
use tracing::{error, info, warn};

use crate::artifacts::ArtifactStore;
use crate::db_manager::DBManager;
use crate::model::features::{build_features, price_column, FeatureRow};
use crate::model::metrics::compute_metrics;
use crate::model::network::ForecastNetwork;
use crate::model::scaler::{build_targets, PriceScaler};
use crate::model::sequence::windows;
use crate::model::trainer::{CancelFlag, Trainer};
use crate::model::{MAX_HORIZON, NUM_HORIZONS, SEQUENCE_LENGTH};
use crate::time::Clock;
use crate::utility::config::{LifecycleConfig, TrainingConfig};
use crate::utility::errors::{EggrsError, EggrsResult};
use crate::utility::types::{
    ComparisonResult, EvaluationOutcome, Metrics, Recommendation, SkipReason, TrainingReport,
};

/// A/B 비교에서 승격에 필요한 최소 개선 지표 수 (4개 중)
pub const MIN_IMPROVEMENTS: usize = 3;

/// 후보가 프로덕션보다 엄격하게 나은 지표 수.
/// MAE/RMSE/MAPE는 낮을수록, 방향 정확도는 높을수록 좋다.
pub fn count_improvements(candidate: &Metrics, production: &Metrics) -> usize {
    [
        candidate.mae < production.mae,
        candidate.rmse < production.rmse,
        candidate.mape < production.mape,
        candidate.directional_accuracy > production.directional_accuracy,
    ]
    .iter()
    .filter(|better| **better)
    .count()
}

/// 프로덕션 기록이 없으면 무조건 승격, 있으면 4개 중 3개 이상 개선 시 승격
pub fn ab_decision(candidate: &Metrics, production: Option<&Metrics>) -> (Option<usize>, Recommendation) {
    match production {
        None => (None, Recommendation::Promote),
        Some(production) => {
            let improvements = count_improvements(candidate, production);
            let recommendation = if improvements >= MIN_IMPROVEMENTS {
                Recommendation::Promote
            } else {
                Recommendation::KeepCurrent
            };
            (Some(improvements), recommendation)
        }
    }
}

/// 이미 불러온 모델로 특징 행 꼬리 구간을 결정적으로(드롭아웃 없이) 평가한다.
pub fn evaluate_rows(
    network: &ForecastNetwork,
    scaler: &PriceScaler,
    rows: &[FeatureRow],
) -> EggrsResult<EvaluationOutcome> {
    let required = SEQUENCE_LENGTH + 1;
    let targets = build_targets(&price_column(rows));
    let valid: Vec<usize> = targets
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.map(|_| i))
        .collect();
    if valid.len() < required {
        return Ok(EvaluationOutcome::Skipped(SkipReason::NotEnoughHistory {
            required,
            available: valid.len(),
        }));
    }

    let features = scaler.transform_features(rows)?.select(Axis(0), &valid);
    let true_prices = Array2::from_shape_fn((valid.len(), NUM_HORIZONS), |(r, c)| {
        targets[valid[r]].map(|t| t[c]).unwrap_or(f64::NAN)
    });

    let inputs = windows(features.view(), SEQUENCE_LENGTH);
    let predicted = scaler.inverse_transform_targets(network.predict(&inputs).view())?;
    let actual = true_prices.slice(s![SEQUENCE_LENGTH.., ..]);

    Ok(EvaluationOutcome::Scored(compute_metrics(actual, predicted.view())))
}

/// 재학습 사유
#[derive(Debug, Clone, PartialEq)]
pub enum RetrainReason {
    NoProductionModel,
    EvaluationSkipped(SkipReason),
    MapeAboveThreshold { mape: f64, threshold: f64 },
    Stale { days_since_train: i64 },
    MissingReport,
}

/// 등급별 정기 점검 결과
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// 프로덕션 모델 유지
    Healthy {
        version: String,
        metrics: Metrics,
        days_since_train: i64,
    },
    /// 후보를 학습하고 A/B 비교까지 마침
    Retrained {
        reason: RetrainReason,
        comparison: ComparisonResult,
        promoted: bool,
    },
    /// 재학습이 필요했지만 데이터 부족 등으로 건너뜀. 기존 프로덕션은 그대로.
    RetrainSkipped { reason: RetrainReason, cause: String },
}

/// 평가 → 재학습 판단 → 재학습 → A/B 비교 → 승격 상태 머신.
///
/// 같은 등급에 대한 변경 작업은 등급별 Mutex로 직렬화되고,
/// 서로 다른 등급은 동시에 실행될 수 있다.
pub struct LifecycleManager {
    settings: LifecycleConfig,
    training: TrainingConfig,
    db: Arc<DBManager>,
    store: Arc<dyn ArtifactStore>,
    clock: Arc<dyn Clock>,
    cancel: Option<CancelFlag>,
    grade_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl LifecycleManager {
    pub fn new(
        settings: LifecycleConfig,
        training: TrainingConfig,
        db: Arc<DBManager>,
        store: Arc<dyn ArtifactStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            training,
            db,
            store,
            clock,
            cancel: None,
            grade_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn grades(&self) -> &[String] {
        &self.settings.grades
    }

    fn grade_lock(&self, grade: &str) -> EggrsResult<Arc<Mutex<()>>> {
        let mut locks = self
            .grade_locks
            .lock()
            .map_err(|e| EggrsError::general(format!("등급 잠금 테이블 오류: {}", e)))?;
        Ok(locks
            .entry(grade.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// 등급 잠금을 잡은 채로 `f`를 실행한다
    fn with_grade_lock<T>(&self, grade: &str, f: impl FnOnce() -> EggrsResult<T>) -> EggrsResult<T> {
        let lock = self.grade_lock(grade)?;
        let _guard = lock
            .lock()
            .map_err(|e| EggrsError::general(format!("{} 등급 잠금 오류: {}", grade, e)))?;
        f()
    }

    fn trainer(&self) -> Trainer {
        let trainer = Trainer::new(self.training.clone(), self.store.clone());
        match &self.cancel {
            Some(flag) => trainer.with_cancel_flag(flag.clone()),
            None => trainer,
        }
    }

    // ---- 학습 ----

    /// 한 등급을 학습하고 레지스트리에 등록한다. 버전이 없으면 날짜 태그를 만든다.
    /// 태그 선택부터 등록까지 등급 잠금 안에서 진행되므로 동시 학습이 같은 태그를 쓰지 않는다.
    pub fn train(&self, grade: &str, version: Option<&str>) -> EggrsResult<TrainingReport> {
        self.with_grade_lock(grade, || self.train_locked(grade, version))
    }

    fn train_locked(&self, grade: &str, version: Option<&str>) -> EggrsResult<TrainingReport> {
        let version = match version {
            Some(v) => v.to_string(),
            None => self.next_version_tag(grade)?,
        };
        let history = self.db.fetch_history(grade, None)?;
        let train_date = self.clock.today();
        let report = self.trainer().train(&history, &version, train_date)?;
        self.db.register_model(grade, &version, train_date)?;
        Ok(report)
    }

    /// 설정된 모든 등급 학습. 실패한 등급은 로그만 남기고 건너뛴다.
    pub fn train_all_grades(&self, version: Option<&str>) -> Vec<TrainingReport> {
        self.settings
            .grades
            .par_iter()
            .filter_map(|grade| match self.train(grade, version) {
                Ok(report) => Some(report),
                Err(e) if e.is_recoverable() => {
                    warn!("⚠️ [Lifecycle] {} 학습 건너뜀: {}", grade, e);
                    None
                }
                Err(e) => {
                    error!("❌ [Lifecycle] {} 학습 실패: {}", grade, e);
                    None
                }
            })
            .collect()
    }

    /// `v{YYYYMMDD}` 태그. 같은 날 이미 있는 버전이면 `-2`, `-3` … 을 붙여
    /// 프로덕션 아티팩트를 덮어쓰지 않게 한다.
    pub fn next_version_tag(&self, grade: &str) -> EggrsResult<String> {
        let base = self.clock.version_tag();
        let mut candidate = base.clone();
        let mut suffix = 2;
        while self.db.model_entry(grade, &candidate)?.is_some() {
            candidate = format!("{}-{}", base, suffix);
            suffix += 1;
        }
        Ok(candidate)
    }

    // ---- 평가 ----

    /// 최근 `eval_days`일 구간에 대한 결정적 평가. 모델이나 데이터가 없으면 Skipped.
    pub fn evaluate(&self, grade: &str, version: &str, eval_days: usize) -> EggrsResult<EvaluationOutcome> {
        let (network, scaler) = match self.store.load_model(grade, version) {
            Ok(model) => model,
            Err(EggrsError::ModelNotFound { artifact, .. }) => {
                warn!("⚠️ [Lifecycle] {} {} 모델 없음, 평가 건너뜀", grade, version);
                return Ok(EvaluationOutcome::Skipped(SkipReason::ModelMissing { artifact }));
            }
            Err(e) => return Err(e),
        };

        let history = self.db.fetch_history(grade, None)?;
        let rows = build_features(&history);
        // 마지막 eval_days개 윈도우가 정답을 가지려면 horizon만큼 더 필요하다
        let span = SEQUENCE_LENGTH + MAX_HORIZON + eval_days;
        let tail = &rows[rows.len().saturating_sub(span)..];

        let outcome = evaluate_rows(&network, &scaler, tail)?;
        match &outcome {
            EvaluationOutcome::Scored(metrics) => {
                info!("🧪 [Lifecycle] {} {} 평가: {}", grade, version, metrics)
            }
            EvaluationOutcome::Skipped(reason) => {
                warn!("⚠️ [Lifecycle] {} {} 평가 건너뜀: {}", grade, version, reason)
            }
        }
        Ok(outcome)
    }

    // ---- A/B 비교 ----

    pub fn compare(&self, grade: &str, candidate: &str) -> EggrsResult<ComparisonResult> {
        self.with_grade_lock(grade, || self.compare_locked(grade, candidate))
    }

    fn compare_locked(&self, grade: &str, candidate: &str) -> EggrsResult<ComparisonResult> {
        let production = self.db.production_record(grade)?;

        let candidate_metrics = match self.evaluate(grade, candidate, self.settings.eval_days)? {
            EvaluationOutcome::Scored(metrics) => metrics,
            EvaluationOutcome::Skipped(SkipReason::ModelMissing { artifact }) => {
                return Err(EggrsError::model_not_found(grade, candidate, artifact));
            }
            EvaluationOutcome::Skipped(SkipReason::NotEnoughHistory { required, available }) => {
                return Err(EggrsError::insufficient_data(
                    grade,
                    required,
                    available,
                    "후보 모델 평가",
                ));
            }
        };

        let (improvements, recommendation) =
            ab_decision(&candidate_metrics, production.as_ref().map(|p| &p.metrics));

        self.db
            .insert_performance(grade, candidate, self.clock.today(), &candidate_metrics)?;

        let result = ComparisonResult {
            grade: grade.to_string(),
            candidate_version: candidate.to_string(),
            candidate_metrics,
            production_version: production.as_ref().map(|p| p.model_version.clone()),
            production_metrics: production.as_ref().map(|p| p.metrics),
            improvements,
            recommendation,
        };
        info!(
            "⚖️ [Lifecycle] {} A/B 결과: {} (후보 {}, 개선 {:?}/4)",
            grade, recommendation, candidate, improvements
        );
        Ok(result)
    }

    // ---- 승격 ----

    pub fn promote(&self, grade: &str, version: &str) -> EggrsResult<()> {
        self.with_grade_lock(grade, || self.db.promote(grade, version))
    }

    // ---- 정기 점검 ----

    /// 프로덕션 모델을 평가하고 필요하면 재학습 → 비교 → 승격까지 진행한다.
    pub fn check_and_retrain(&self, grade: &str) -> EggrsResult<CheckOutcome> {
        self.with_grade_lock(grade, || self.check_locked(grade))
    }

    fn check_locked(&self, grade: &str) -> EggrsResult<CheckOutcome> {
        info!("🔍 [Lifecycle] {} 재학습 필요 여부 점검", grade);

        let Some(version) = self.db.production_version(grade)? else {
            info!("🔍 [Lifecycle] {} 프로덕션 모델 없음, 새로 학습", grade);
            return self.retrain_locked(grade, RetrainReason::NoProductionModel);
        };

        let metrics = match self.evaluate(grade, &version, self.settings.eval_days)? {
            EvaluationOutcome::Scored(metrics) => metrics,
            EvaluationOutcome::Skipped(reason) => {
                info!("🔍 [Lifecycle] {} 평가 불가 ({}), 새로 학습", grade, reason);
                return self.retrain_locked(grade, RetrainReason::EvaluationSkipped(reason));
            }
        };
        self.db
            .record_production_evaluation(grade, &version, self.clock.today(), &metrics)?;
        info!("🔍 [Lifecycle] {} 현재 모델 {} MAPE: {}%", grade, version, metrics.mape);

        let threshold = self.settings.mape_retrain_threshold;
        if metrics.mape > threshold {
            info!(
                "🔁 [Lifecycle] {} MAPE {}% > 기준 {}%, 재학습",
                grade, metrics.mape, threshold
            );
            return self.retrain_locked(
                grade,
                RetrainReason::MapeAboveThreshold {
                    mape: metrics.mape,
                    threshold,
                },
            );
        }

        let Some(report) = self.store.load_report(grade, &version)? else {
            info!("🔁 [Lifecycle] {} 학습 보고서 없음, 재학습", grade);
            return self.retrain_locked(grade, RetrainReason::MissingReport);
        };

        let days_since_train = self.clock.days_since(report.train_date);
        if days_since_train >= self.settings.retrain_interval_days {
            info!("🔁 [Lifecycle] {} 마지막 학습 후 {}일 경과, 재학습", grade, days_since_train);
            return self.retrain_locked(grade, RetrainReason::Stale { days_since_train });
        }

        info!(
            "✅ [Lifecycle] {} 모델 정상 (MAPE={}%, {}일 경과)",
            grade, metrics.mape, days_since_train
        );
        Ok(CheckOutcome::Healthy {
            version,
            metrics,
            days_since_train,
        })
    }

    fn retrain_locked(&self, grade: &str, reason: RetrainReason) -> EggrsResult<CheckOutcome> {
        let report = match self.train_locked(grade, None) {
            Ok(report) => report,
            Err(e @ EggrsError::InsufficientData { .. }) => {
                warn!("⚠️ [Lifecycle] {} 재학습 불가: {}", grade, e);
                return Ok(CheckOutcome::RetrainSkipped {
                    reason,
                    cause: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        };

        let comparison = self.compare_locked(grade, &report.model_version)?;
        let promoted = comparison.recommendation == Recommendation::Promote;
        if promoted {
            self.db.promote(grade, &report.model_version)?;
            info!("🏆 [Lifecycle] {} {} 프로덕션 승격", grade, report.model_version);
        } else {
            info!("📌 [Lifecycle] {} 현재 모델 유지", grade);
        }

        Ok(CheckOutcome::Retrained {
            reason,
            comparison,
            promoted,
        })
    }

    /// 모든 등급을 병렬 점검한다. 한 등급의 실패는 다른 등급에 영향을 주지 않는다.
    pub fn check_and_retrain_all(&self) -> Vec<(String, EggrsResult<CheckOutcome>)> {
        self.settings
            .grades
            .par_iter()
            .map(|grade| {
                let result = self.check_and_retrain(grade);
                if let Err(e) = &result {
                    error!("❌ [Lifecycle] {} 점검 실패: {}", grade, e);
                }
                (grade.clone(), result)
            })
            .collect()
    }
}
