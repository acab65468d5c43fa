use std::sync::Arc;

use chrono::Duration;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::artifacts::ArtifactStore;
use crate::model::features::build_features;
use crate::model::network::ForwardMode;
use crate::model::sequence::last_window;
use crate::model::{HORIZONS, NUM_HORIZONS, SEQUENCE_LENGTH};
use crate::utility::config::InferenceConfig;
use crate::utility::errors::{EggrsError, EggrsResult};
use crate::utility::types::{MarketHistory, Prediction};

/// `mean ± z·std` 구간. 가격은 음수가 될 수 없으므로 하한은 0으로 자른다.
pub fn confidence_band(mean: f64, std: f64, z: f64) -> (f64, f64) {
    let half_width = z * std;
    ((mean - half_width).max(0.0), mean + half_width)
}

/// (N, 3) 표본의 horizon별 평균과 모표준편차
pub fn sample_statistics(samples: &Array2<f64>) -> EggrsResult<(Array1<f64>, Array1<f64>)> {
    let mean = samples
        .mean_axis(Axis(0))
        .ok_or_else(|| EggrsError::general("MC 표본이 비어 있습니다"))?;
    let std = samples.std_axis(Axis(0), 0.0);
    Ok((mean, std))
}

/// Monte-Carlo Dropout 추론기
///
/// 체크포인트와 스케일러를 읽고, 최근 30일 윈도우에 대해 드롭아웃을 켠 채
/// 여러 번 순전파하여 horizon별 평균과 신뢰구간을 만든다.
pub struct InferenceEngine {
    settings: InferenceConfig,
    store: Arc<dyn ArtifactStore>,
}

impl InferenceEngine {
    pub fn new(settings: InferenceConfig, store: Arc<dyn ArtifactStore>) -> Self {
        Self { settings, store }
    }

    /// 세 horizon의 예측을 만든다. 목표 날짜는 벽시계가 아니라
    /// 입력 데이터의 마지막 관측일 기준이다.
    pub fn predict(&self, history: &MarketHistory, version: &str) -> EggrsResult<Vec<Prediction>> {
        let grade = history.grade.as_str();
        let (network, scaler) = self.store.load_model(grade, version)?;

        let rows = build_features(history);
        let base_date = match rows.last() {
            Some(row) => row.date,
            None => {
                return Err(EggrsError::insufficient_data(grade, SEQUENCE_LENGTH, 0, "추론 윈도우"));
            }
        };
        let features = scaler.transform_features(&rows)?;
        let window = last_window(features.view(), SEQUENCE_LENGTH, grade)?;

        let passes = self.settings.mc_dropout_passes.max(1);
        let base_seed = self.settings.seed.unwrap_or_else(rand::random);

        // 패스마다 독립 RNG. 결과 순서는 평균/표준편차에 영향 없음
        let outputs: Vec<Array1<f64>> = (0..passes)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
                network
                    .forward(&window, ForwardMode::Dropout(&mut rng))
                    .index_axis(Axis(0), 0)
                    .to_owned()
            })
            .collect();

        let mut scaled = Array2::<f64>::zeros((passes, NUM_HORIZONS));
        for (i, output) in outputs.iter().enumerate() {
            scaled.row_mut(i).assign(output);
        }
        let prices = scaler.inverse_transform_targets(scaled.view())?;
        let (mean, std) = sample_statistics(&prices)?;
        debug!(
            "🎲 [Inference] {} MC {}회: mean={:?}, std={:?}",
            grade, passes, mean, std
        );

        let z = self.settings.ci_z_score;
        let predictions: Vec<Prediction> = HORIZONS
            .iter()
            .enumerate()
            .map(|(h, &days)| {
                let (lower, upper) = confidence_band(mean[h], std[h], z);
                Prediction {
                    base_date,
                    target_date: base_date + Duration::days(days as i64),
                    grade: grade.to_string(),
                    predicted_price: mean[h],
                    confidence_lower: lower,
                    confidence_upper: upper,
                    horizon_days: days as i64,
                    model_version: version.to_string(),
                }
            })
            .collect();

        info!(
            "🔮 [Inference] {} {} 예측 완료 (기준일 {}): 7일 {:.0}, 14일 {:.0}, 30일 {:.0}",
            grade, version, base_date, mean[0], mean[1], mean[2]
        );
        Ok(predictions)
    }
}
