pub mod features;
pub mod metrics;
pub mod network;
pub mod optimizer;
pub mod predictor;
pub mod scaler;
pub mod sequence;
pub mod trainer;

/// 입력 lookback 윈도우 길이 (일)
pub const SEQUENCE_LENGTH: usize = 30;

/// 예측 horizon (일). 출력 벡터의 순서와 같다.
pub const HORIZONS: [usize; 3] = [7, 14, 30];

/// 가장 긴 horizon
pub const MAX_HORIZON: usize = 30;

/// 입력 특징 수
pub const NUM_FEATURES: usize = 15;

/// 출력 horizon 수
pub const NUM_HORIZONS: usize = 3;

// 재수출
pub use features::{build_features, FeatureRow, FEATURE_COLUMNS};
pub use network::{ForecastNetwork, ForwardMode, NetworkConfig};
pub use predictor::InferenceEngine;
pub use scaler::PriceScaler;
pub use trainer::{CancelFlag, Trainer};
