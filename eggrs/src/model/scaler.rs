use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::features::{feature_matrix, price_column, FeatureRow};
use crate::model::{HORIZONS, MAX_HORIZON, NUM_FEATURES, NUM_HORIZONS};
use crate::utility::errors::{EggrsError, EggrsResult};

/// 스케일러 직렬화 포맷 버전
pub const SCALER_FORMAT_VERSION: u32 = 1;

/// 컬럼별 min-max 변환. max == min 인 컬럼은 range 1로 취급한다.
#[derive(Debug, Clone, PartialEq)]
struct MinMax {
    min: Array1<f64>,
    max: Array1<f64>,
}

impl MinMax {
    fn fit(data: ArrayView2<f64>) -> Self {
        let min = data.fold_axis(Axis(0), f64::INFINITY, |acc, v| acc.min(*v));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |acc, v| acc.max(*v));
        Self { min, max }
    }

    fn range(&self) -> Array1<f64> {
        let mut range = &self.max - &self.min;
        range.mapv_inplace(|r| if r == 0.0 { 1.0 } else { r });
        range
    }

    fn transform(&self, data: ArrayView2<f64>) -> Array2<f64> {
        (&data - &self.min) / &self.range()
    }

    fn inverse(&self, data: ArrayView2<f64>) -> Array2<f64> {
        &data * &self.range() + &self.min
    }
}

/// 학습용으로 정렬된 스케일 결과. 두 행렬의 행은 같은 날짜를 가리킨다.
#[derive(Debug, Clone)]
pub struct ScaledTable {
    /// (M, 15) 스케일된 특징 (목표가 유효한 행만)
    pub features: Array2<f64>,
    /// (M, 3) 스케일된 목표값
    pub targets: Array2<f64>,
}

impl ScaledTable {
    pub fn len(&self) -> usize {
        self.features.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.features.nrows() == 0
    }
}

/// 특징/목표 두 개의 독립 min-max 변환. 체크포인트와 1:1로 묶여 저장된다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceScaler {
    features: Option<MinMax>,
    targets: Option<MinMax>,
}

/// 디스크에 저장되는 명시적 스케일러 포맷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerDocument {
    pub format_version: u32,
    pub feature_min: Vec<f64>,
    pub feature_max: Vec<f64>,
    pub target_min: Vec<f64>,
    pub target_max: Vec<f64>,
}

/// 가격 컬럼으로부터 {7, 14, 30}일 뒤 가격 목표를 만든다.
/// 세 horizon이 모두 존재하는 행만 Some.
pub fn build_targets(prices: &[f64]) -> Vec<Option<[f64; NUM_HORIZONS]>> {
    (0..prices.len())
        .map(|i| {
            if i + MAX_HORIZON < prices.len() {
                Some(HORIZONS.map(|h| prices[i + h]))
            } else {
                None
            }
        })
        .collect()
}

impl PriceScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.features.is_some() && self.targets.is_some()
    }

    /// 특징 변환은 전체 행, 목표 변환은 유효 목표 행으로 학습하고
    /// 목표가 유효한 행만 스케일해서 돌려준다.
    pub fn fit_transform(&mut self, rows: &[FeatureRow]) -> EggrsResult<ScaledTable> {
        if rows.is_empty() {
            return Err(EggrsError::insufficient_data("", MAX_HORIZON + 1, 0, "스케일러 학습"));
        }

        let features = feature_matrix(rows);
        let targets = build_targets(&price_column(rows));

        let valid: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter_map(|(i, t)| t.map(|_| i))
            .collect();
        if valid.is_empty() {
            return Err(EggrsError::insufficient_data(
                "",
                MAX_HORIZON + 1,
                rows.len(),
                "목표값 생성",
            ));
        }

        let target_matrix = Array2::from_shape_fn((valid.len(), NUM_HORIZONS), |(r, c)| {
            targets[valid[r]].map(|t| t[c]).unwrap_or(f64::NAN)
        });
        let feature_scaler = MinMax::fit(features.view());
        let target_scaler = MinMax::fit(target_matrix.view());

        let scaled_features = feature_scaler.transform(features.select(Axis(0), &valid).view());
        let scaled_targets = target_scaler.transform(target_matrix.view());

        debug!(
            "📏 [Scaler] 학습 완료: 특징 {}행, 유효 목표 {}행",
            rows.len(),
            valid.len()
        );

        self.features = Some(feature_scaler);
        self.targets = Some(target_scaler);

        Ok(ScaledTable {
            features: scaled_features,
            targets: scaled_targets,
        })
    }

    /// 학습 시점과 동일한 특징 변환 (추론/평가 공용)
    pub fn transform_features(&self, rows: &[FeatureRow]) -> EggrsResult<Array2<f64>> {
        let scaler = self
            .features
            .as_ref()
            .ok_or_else(|| EggrsError::not_fitted("feature scaler"))?;
        Ok(scaler.transform(feature_matrix(rows).view()))
    }

    /// 원 가격 단위의 (M, 3) 목표를 스케일 공간으로 보낸다.
    pub fn transform_targets(&self, targets: ArrayView2<f64>) -> EggrsResult<Array2<f64>> {
        let scaler = self
            .targets
            .as_ref()
            .ok_or_else(|| EggrsError::not_fitted("target scaler"))?;
        Ok(scaler.transform(targets))
    }

    /// 스케일 공간의 (M, 3) 예측을 가격 단위로 되돌린다.
    pub fn inverse_transform_targets(&self, scaled: ArrayView2<f64>) -> EggrsResult<Array2<f64>> {
        let scaler = self
            .targets
            .as_ref()
            .ok_or_else(|| EggrsError::not_fitted("target scaler"))?;
        Ok(scaler.inverse(scaled))
    }

    pub fn to_document(&self) -> EggrsResult<ScalerDocument> {
        match (&self.features, &self.targets) {
            (Some(f), Some(t)) => Ok(ScalerDocument {
                format_version: SCALER_FORMAT_VERSION,
                feature_min: f.min.to_vec(),
                feature_max: f.max.to_vec(),
                target_min: t.min.to_vec(),
                target_max: t.max.to_vec(),
            }),
            _ => Err(EggrsError::not_fitted("price scaler")),
        }
    }

    /// 저장 포맷을 검증하면서 복원한다. `source`는 오류 메시지용 경로.
    pub fn from_document(doc: ScalerDocument, source: &str) -> EggrsResult<Self> {
        if doc.format_version != SCALER_FORMAT_VERSION {
            return Err(EggrsError::artifact_corrupted(
                source,
                format!("지원하지 않는 스케일러 포맷 버전: {}", doc.format_version),
            ));
        }

        let checks = [
            ("feature_min", &doc.feature_min, NUM_FEATURES),
            ("feature_max", &doc.feature_max, NUM_FEATURES),
            ("target_min", &doc.target_min, NUM_HORIZONS),
            ("target_max", &doc.target_max, NUM_HORIZONS),
        ];
        for (name, values, expected) in checks {
            if values.len() != expected {
                return Err(EggrsError::artifact_corrupted(
                    source,
                    format!("{} 길이 {} (기대값 {})", name, values.len(), expected),
                ));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(EggrsError::artifact_corrupted(
                    source,
                    format!("{}에 유한하지 않은 값 포함", name),
                ));
            }
        }

        Ok(Self {
            features: Some(MinMax {
                min: Array1::from(doc.feature_min),
                max: Array1::from(doc.feature_max),
            }),
            targets: Some(MinMax {
                min: Array1::from(doc.target_min),
                max: Array1::from(doc.target_max),
            }),
        })
    }
}
