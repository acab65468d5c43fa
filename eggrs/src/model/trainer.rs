use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use ndarray::{Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{info, warn};

use crate::artifacts::ArtifactStore;
use crate::model::features::build_features;
use crate::model::metrics::compute_metrics;
use crate::model::network::{ForecastNetwork, ForwardMode, NetworkConfig};
use crate::model::optimizer::Adam;
use crate::model::scaler::PriceScaler;
use crate::model::sequence::{create_sequences, SequenceSet};
use crate::model::{MAX_HORIZON, SEQUENCE_LENGTH};
use crate::utility::config::TrainingConfig;
use crate::utility::errors::{EggrsError, EggrsResult};
use crate::utility::types::{EpochLoss, MarketHistory, PerformanceTargets, TrainingReport};

/// 학습 중단 요청 플래그. epoch 사이에 확인된다.
pub type CancelFlag = Arc<AtomicBool>;

/// 학습에 필요한 최소 이력 행 수
pub const MIN_TRAINING_ROWS: usize = SEQUENCE_LENGTH + MAX_HORIZON;

/// 학습/검증 분리에 필요한 최소 윈도우 수
const MIN_WINDOWS: usize = 2;

fn mse(pred: &Array2<f64>, target: &Array2<f64>) -> f64 {
    if pred.is_empty() {
        return 0.0;
    }
    (pred - target).mapv(|v| v * v).sum() / pred.len() as f64
}

/// 조기 종료 기반 학습기
///
/// 검증 손실이 개선될 때마다 가중치와 스케일러를 같은 버전으로 저장하고,
/// `patience` epoch 연속 개선이 없으면 멈춘다.
pub struct Trainer {
    settings: TrainingConfig,
    network_config: NetworkConfig,
    store: Arc<dyn ArtifactStore>,
    targets: PerformanceTargets,
    cancel: Option<CancelFlag>,
}

impl Trainer {
    pub fn new(settings: TrainingConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            settings,
            network_config: NetworkConfig::default(),
            store,
            targets: PerformanceTargets::default(),
            cancel: None,
        }
    }

    pub fn with_network_config(mut self, config: NetworkConfig) -> Self {
        self.network_config = config;
        self
    }

    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// 한 등급의 모델을 `version` 태그로 학습한다.
    pub fn train(
        &self,
        history: &MarketHistory,
        version: &str,
        train_date: NaiveDate,
    ) -> EggrsResult<TrainingReport> {
        let grade = history.grade.as_str();
        info!("🚀 [Trainer] 학습 시작: {} {}", grade, version);

        let rows = build_features(history);
        if rows.len() < MIN_TRAINING_ROWS {
            return Err(EggrsError::insufficient_data(
                grade,
                MIN_TRAINING_ROWS,
                rows.len(),
                "학습 이력",
            ));
        }
        info!("📊 [Trainer] {} 특징 {}행 로드", grade, rows.len());

        let mut scaler = PriceScaler::new();
        let table = scaler.fit_transform(&rows)?;
        let sequences = create_sequences(table.features.view(), table.targets.view(), SEQUENCE_LENGTH)?;
        if sequences.len() < MIN_WINDOWS {
            return Err(EggrsError::insufficient_data(
                grade,
                MIN_TRAINING_ROWS + MIN_WINDOWS,
                rows.len(),
                "학습 윈도우",
            ));
        }

        // 시간 순서대로 앞 80% 학습, 뒤 20% 검증
        let total = sequences.len();
        let split = ((total as f64) * (1.0 - self.settings.validation_ratio) + 1e-9).floor() as usize;
        let split = split.clamp(1, total - 1);
        let train_set = sequences.slice(0, split);
        let val_set = sequences.slice(split, total);
        info!(
            "🧩 [Trainer] {} 시퀀스 {}개 (학습 {}, 검증 {})",
            grade,
            total,
            train_set.len(),
            val_set.len()
        );

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut network = ForecastNetwork::new(self.network_config, &mut rng);
        let mut optimizer = Adam::new(&network, self.settings.learning_rate);

        let mut best_val_loss = f64::INFINITY;
        let mut best_network: Option<ForecastNetwork> = None;
        let mut patience_counter = 0usize;
        let mut history_log: Vec<EpochLoss> = Vec::new();

        for epoch in 1..=self.settings.epochs {
            if self.is_cancelled() {
                warn!(
                    "🛑 [Trainer] {} {} 학습 중단 요청 ({} epoch 완료)",
                    grade,
                    version,
                    history_log.len()
                );
                return Err(EggrsError::Cancelled {
                    grade: grade.to_string(),
                    version: version.to_string(),
                    epochs_completed: history_log.len(),
                });
            }

            let train_loss = self.run_epoch(&mut network, &mut optimizer, &train_set, &mut rng);
            let val_loss = mse(&network.predict(&val_set.inputs), &val_set.targets);
            history_log.push(EpochLoss {
                epoch,
                train_loss,
                val_loss,
            });
            info!(
                "📈 [Trainer] {} Epoch {}/{} - train_loss: {:.6}, val_loss: {:.6}",
                grade, epoch, self.settings.epochs, train_loss, val_loss
            );

            if val_loss < best_val_loss {
                best_val_loss = val_loss;
                patience_counter = 0;
                self.store.save_model(grade, version, &network, &scaler)?;
                best_network = Some(network.clone());
                info!("💾 [Trainer] 최고 모델 저장 (val_loss={:.6})", val_loss);
            } else {
                patience_counter += 1;
                if patience_counter >= self.settings.patience {
                    info!("⏹️ [Trainer] {} 조기 종료: epoch {}", grade, epoch);
                    break;
                }
            }
        }

        let best_network = best_network.ok_or_else(|| {
            EggrsError::general(format!("{} {} 검증 손실이 한 번도 유한하지 않았습니다", grade, version))
        })?;

        // 최고 모델의 검증 예측을 가격 단위로 평가
        let val_pred = best_network.predict(&val_set.inputs);
        let true_prices = scaler.inverse_transform_targets(val_set.targets.view())?;
        let pred_prices = scaler.inverse_transform_targets(val_pred.view())?;
        let metrics = compute_metrics(true_prices.view(), pred_prices.view());

        let report = TrainingReport {
            grade: grade.to_string(),
            model_version: version.to_string(),
            train_date,
            total_samples: total,
            train_samples: train_set.len(),
            val_samples: val_set.len(),
            best_val_loss,
            epochs_trained: history_log.len(),
            metrics,
            history: history_log,
            targets: self.targets,
        };
        self.store.save_report(&report)?;

        info!("✅ [Trainer] {} {} 학습 완료: {}", grade, version, metrics);
        for miss in self.targets.misses(&metrics) {
            warn!("⚠️ [Trainer] {} 성능 목표 미달: {}", grade, miss);
        }

        Ok(report)
    }

    /// 학습 구간만 섞어서 미니배치 1 epoch. 샘플 가중 평균 손실을 돌려준다.
    fn run_epoch(
        &self,
        network: &mut ForecastNetwork,
        optimizer: &mut Adam,
        train_set: &SequenceSet,
        rng: &mut StdRng,
    ) -> f64 {
        let mut indices: Vec<usize> = (0..train_set.len()).collect();
        indices.shuffle(&mut *rng);

        let batch_size = self.settings.batch_size.max(1);
        let mut total_loss = 0.0;
        for chunk in indices.chunks(batch_size) {
            let (inputs, targets): (Array3<f64>, Array2<f64>) = train_set.batch(chunk);
            let (out, cache) = network.forward_with_cache(&inputs, ForwardMode::Dropout(&mut *rng));

            let diff = &out - &targets;
            total_loss += diff.mapv(|v| v * v).sum() / out.len_of(Axis(1)) as f64;

            let d_out = diff * (2.0 / out.len() as f64);
            let grads = network.backward(&cache, &d_out);
            optimizer.step(network, &grads);
        }
        total_loss / train_set.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::FsArtifactStore;
    use crate::test_support::{fast_training_config, full_history};
    use tempfile::TempDir;

    fn trainer(dir: &TempDir, epochs: usize) -> (Trainer, Arc<FsArtifactStore>) {
        let store = Arc::new(FsArtifactStore::new(dir.path()).expect("store"));
        let mut settings = fast_training_config();
        settings.epochs = epochs;
        (Trainer::new(settings, store.clone()), store)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).expect("date")
    }

    #[test]
    fn test_insufficient_history() {
        let dir = TempDir::new().expect("tempdir");
        let (trainer, _) = trainer(&dir, 2);
        let err = trainer
            .train(&full_history("특란", 59), "v1", today())
            .unwrap_err();
        assert!(matches!(
            err,
            EggrsError::InsufficientData {
                required: 60,
                available: 59,
                ..
            }
        ));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_too_few_windows() {
        let dir = TempDir::new().expect("tempdir");
        let (trainer, _) = trainer(&dir, 2);
        // 61행 → 유효 목표 31행 → 윈도우 1개
        let err = trainer
            .train(&full_history("특란", 61), "v1", today())
            .unwrap_err();
        assert!(matches!(err, EggrsError::InsufficientData { .. }));
    }

    #[test]
    fn test_training_writes_artifacts_and_report() {
        let dir = TempDir::new().expect("tempdir");
        let (trainer, store) = trainer(&dir, 3);
        let report = trainer
            .train(&full_history("특란", 120), "v20250601", today())
            .expect("train");

        // 120행 → 유효 90행 → 윈도우 60개 → 48/12
        assert_eq!(report.total_samples, 60);
        assert_eq!(report.train_samples, 48);
        assert_eq!(report.val_samples, 12);
        assert!(report.epochs_trained >= 1 && report.epochs_trained <= 3);
        assert_eq!(report.history.len(), report.epochs_trained);
        assert!(report.best_val_loss.is_finite());
        assert!(report.metrics.mae >= 0.0);

        assert!(store.load_checkpoint("특란", "v20250601").is_ok());
        assert!(store.load_scaler("특란", "v20250601").is_ok());
        let saved = store
            .load_report("특란", "v20250601")
            .expect("read")
            .expect("report exists");
        assert_eq!(saved, report);
    }

    #[test]
    fn test_best_loss_matches_history_minimum() {
        let dir = TempDir::new().expect("tempdir");
        let (trainer, _) = trainer(&dir, 4);
        let report = trainer
            .train(&full_history("대란", 100), "v1", today())
            .expect("train");
        let min = report
            .history
            .iter()
            .map(|e| e.val_loss)
            .fold(f64::INFINITY, f64::min);
        assert_eq!(report.best_val_loss, min);
    }

    #[test]
    fn test_cancelled_before_first_epoch() {
        let dir = TempDir::new().expect("tempdir");
        let (trainer, store) = trainer(&dir, 5);
        let flag: CancelFlag = Arc::new(AtomicBool::new(true));
        let trainer = trainer.with_cancel_flag(flag);
        let err = trainer
            .train(&full_history("특란", 100), "v1", today())
            .unwrap_err();
        assert!(matches!(
            err,
            EggrsError::Cancelled {
                epochs_completed: 0,
                ..
            }
        ));
        assert!(store.load_report("특란", "v1").expect("read").is_none());
    }

    #[test]
    fn test_seeded_training_is_reproducible() {
        let dir_a = TempDir::new().expect("tempdir");
        let dir_b = TempDir::new().expect("tempdir");
        let (a, _) = trainer(&dir_a, 2);
        let (b, _) = trainer(&dir_b, 2);
        let history = full_history("특란", 90);
        let ra = a.train(&history, "v1", today()).expect("train");
        let rb = b.train(&history, "v1", today()).expect("train");
        assert_eq!(ra.history, rb.history);
    }
}
