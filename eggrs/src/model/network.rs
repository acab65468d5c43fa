use ndarray::{s, Array, Array1, Array2, Array3, ArrayViewD, ArrayViewMutD, Axis, Dimension};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::model::{NUM_FEATURES, NUM_HORIZONS, SEQUENCE_LENGTH};
use crate::utility::errors::{EggrsError, EggrsResult};

/// 체크포인트 직렬화 포맷 버전
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

/// 네트워크 구조 하이퍼파라미터
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_size: usize,
    pub hidden_size_1: usize,
    pub hidden_size_2: usize,
    pub dense_size_1: usize,
    pub dense_size_2: usize,
    pub num_horizons: usize,
    pub dropout: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            input_size: NUM_FEATURES,
            hidden_size_1: 64,
            hidden_size_2: 32,
            dense_size_1: 32,
            dense_size_2: 16,
            num_horizons: NUM_HORIZONS,
            dropout: 0.2,
        }
    }
}

/// 순전파 모드. 드롭아웃은 `Dropout` 모드(학습, MC 추론)에서만 켜진다.
pub enum ForwardMode<'a> {
    Eval,
    Dropout(&'a mut StdRng),
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

fn uniform_array<D: Dimension, R: Rng>(dim: D, bound: f64, rng: &mut R) -> Array<f64, D> {
    let dist = Uniform::new_inclusive(-bound, bound);
    Array::from_shape_simple_fn(dim, || dist.sample(rng))
}

/// inverted dropout 마스크: 유지 확률 (1-p), 유지된 값은 1/(1-p)배
fn dropout_mask<D: Dimension>(dim: D, p: f64, rng: &mut StdRng) -> Array<f64, D> {
    let keep = 1.0 - p;
    Array::from_shape_simple_fn(dim, || if rng.gen::<f64>() < keep { 1.0 / keep } else { 0.0 })
}

/// 단일 LSTM 레이어. 게이트 순서는 (input, forget, cell, output).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LstmLayer {
    /// (4H, I)
    pub w_ih: Array2<f64>,
    /// (4H, H)
    pub w_hh: Array2<f64>,
    /// (4H)
    pub bias: Array1<f64>,
}

struct LstmStep {
    x: Array2<f64>,
    h_prev: Array2<f64>,
    c_prev: Array2<f64>,
    i: Array2<f64>,
    f: Array2<f64>,
    g: Array2<f64>,
    o: Array2<f64>,
    tanh_c: Array2<f64>,
}

impl LstmLayer {
    fn new<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (hidden_size as f64).sqrt();
        Self {
            w_ih: uniform_array(ndarray::Ix2(4 * hidden_size, input_size), bound, rng),
            w_hh: uniform_array(ndarray::Ix2(4 * hidden_size, hidden_size), bound, rng),
            bias: uniform_array(ndarray::Ix1(4 * hidden_size), bound, rng),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            w_ih: Array2::zeros(self.w_ih.raw_dim()),
            w_hh: Array2::zeros(self.w_hh.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    pub fn input_size(&self) -> usize {
        self.w_ih.ncols()
    }

    pub fn hidden_size(&self) -> usize {
        self.w_hh.ncols()
    }

    /// (B, T, I) → (B, T, H)
    fn forward(&self, x: &Array3<f64>) -> (Array3<f64>, Vec<LstmStep>) {
        let (batch, steps, _) = x.dim();
        let hs = self.hidden_size();

        let mut h = Array2::<f64>::zeros((batch, hs));
        let mut c = Array2::<f64>::zeros((batch, hs));
        let mut out = Array3::<f64>::zeros((batch, steps, hs));
        let mut cache = Vec::with_capacity(steps);

        for t in 0..steps {
            let x_t = x.slice(s![.., t, ..]).to_owned();
            let z = x_t.dot(&self.w_ih.t()) + h.dot(&self.w_hh.t()) + &self.bias;

            let i = z.slice(s![.., 0..hs]).mapv(sigmoid);
            let f = z.slice(s![.., hs..2 * hs]).mapv(sigmoid);
            let g = z.slice(s![.., 2 * hs..3 * hs]).mapv(f64::tanh);
            let o = z.slice(s![.., 3 * hs..]).mapv(sigmoid);

            let c_next = &f * &c + &i * &g;
            let tanh_c = c_next.mapv(f64::tanh);
            let h_next = &o * &tanh_c;
            out.slice_mut(s![.., t, ..]).assign(&h_next);

            cache.push(LstmStep {
                x: x_t,
                h_prev: h,
                c_prev: c,
                i,
                f,
                g,
                o,
                tanh_c,
            });
            h = h_next;
            c = c_next;
        }

        (out, cache)
    }

    /// BPTT. `d_out`은 각 시점 출력에 대한 기울기 (B, T, H). 입력 기울기를 돌려준다.
    fn backward(&self, cache: &[LstmStep], d_out: &Array3<f64>, grads: &mut LstmLayer) -> Array3<f64> {
        let (batch, steps, hs) = d_out.dim();
        let mut dx = Array3::<f64>::zeros((batch, steps, self.input_size()));
        let mut dh_next = Array2::<f64>::zeros((batch, hs));
        let mut dc_next = Array2::<f64>::zeros((batch, hs));

        for t in (0..steps).rev() {
            let step = &cache[t];
            let dh = &d_out.slice(s![.., t, ..]) + &dh_next;

            let d_o = &dh * &step.tanh_c;
            let dc = &dh * &step.o * &step.tanh_c.mapv(|v| 1.0 - v * v) + &dc_next;
            let di = &dc * &step.g;
            let dg = &dc * &step.i;
            let df = &dc * &step.c_prev;

            let mut dz = Array2::<f64>::zeros((batch, 4 * hs));
            dz.slice_mut(s![.., 0..hs])
                .assign(&(di * &step.i.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., hs..2 * hs])
                .assign(&(df * &step.f.mapv(|v| v * (1.0 - v))));
            dz.slice_mut(s![.., 2 * hs..3 * hs])
                .assign(&(dg * &step.g.mapv(|v| 1.0 - v * v)));
            dz.slice_mut(s![.., 3 * hs..])
                .assign(&(d_o * &step.o.mapv(|v| v * (1.0 - v))));

            grads.w_ih += &dz.t().dot(&step.x);
            grads.w_hh += &dz.t().dot(&step.h_prev);
            grads.bias += &dz.sum_axis(Axis(0));

            dx.slice_mut(s![.., t, ..]).assign(&dz.dot(&self.w_ih));
            dh_next = dz.dot(&self.w_hh);
            dc_next = &dc * &step.f;
        }

        dx
    }
}

/// 완전연결 레이어 `y = x Wᵀ + b`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    /// (out, in)
    pub weight: Array2<f64>,
    /// (out)
    pub bias: Array1<f64>,
}

impl DenseLayer {
    fn new<R: Rng>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let bound = 1.0 / (input_size as f64).sqrt();
        Self {
            weight: uniform_array(ndarray::Ix2(output_size, input_size), bound, rng),
            bias: uniform_array(ndarray::Ix1(output_size), bound, rng),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            weight: Array2::zeros(self.weight.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    fn forward(&self, x: &Array2<f64>) -> Array2<f64> {
        x.dot(&self.weight.t()) + &self.bias
    }

    fn backward(&self, x: &Array2<f64>, d_out: &Array2<f64>, grads: &mut DenseLayer) -> Array2<f64> {
        grads.weight += &d_out.t().dot(x);
        grads.bias += &d_out.sum_axis(Axis(0));
        d_out.dot(&self.weight)
    }
}

/// 역전파에 필요한 순전파 중간값
pub struct ForwardCache {
    lstm1: Vec<LstmStep>,
    mask1: Option<Array3<f64>>,
    lstm2: Vec<LstmStep>,
    seq_len: usize,
    mask2: Option<Array2<f64>>,
    dense_in: Array2<f64>,
    fc1_pre: Array2<f64>,
    fc1_act: Array2<f64>,
    fc2_pre: Array2<f64>,
    fc2_act: Array2<f64>,
}

/// 다중 horizon 가격 예측 네트워크
///
/// ```text
/// (B, 30, 15) → LSTM(64) → Dropout → LSTM(32) → 마지막 시점 → Dropout
///             → Dense(32, ReLU) → Dense(16, ReLU) → Dense(3)
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastNetwork {
    pub config: NetworkConfig,
    pub lstm1: LstmLayer,
    pub lstm2: LstmLayer,
    pub fc1: DenseLayer,
    pub fc2: DenseLayer,
    pub output: DenseLayer,
}

impl ForecastNetwork {
    pub fn new<R: Rng>(config: NetworkConfig, rng: &mut R) -> Self {
        Self {
            config,
            lstm1: LstmLayer::new(config.input_size, config.hidden_size_1, rng),
            lstm2: LstmLayer::new(config.hidden_size_1, config.hidden_size_2, rng),
            fc1: DenseLayer::new(config.hidden_size_2, config.dense_size_1, rng),
            fc2: DenseLayer::new(config.dense_size_1, config.dense_size_2, rng),
            output: DenseLayer::new(config.dense_size_2, config.num_horizons, rng),
        }
    }

    /// 같은 구조의 0 텐서 (기울기 누적용)
    pub fn zeros_like(&self) -> Self {
        Self {
            config: self.config,
            lstm1: self.lstm1.zeros_like(),
            lstm2: self.lstm2.zeros_like(),
            fc1: self.fc1.zeros_like(),
            fc2: self.fc2.zeros_like(),
            output: self.output.zeros_like(),
        }
    }

    /// 옵티마이저가 순회하는 파라미터 텐서 (고정 순서)
    pub fn tensors(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![
            self.lstm1.w_ih.view().into_dyn(),
            self.lstm1.w_hh.view().into_dyn(),
            self.lstm1.bias.view().into_dyn(),
            self.lstm2.w_ih.view().into_dyn(),
            self.lstm2.w_hh.view().into_dyn(),
            self.lstm2.bias.view().into_dyn(),
            self.fc1.weight.view().into_dyn(),
            self.fc1.bias.view().into_dyn(),
            self.fc2.weight.view().into_dyn(),
            self.fc2.bias.view().into_dyn(),
            self.output.weight.view().into_dyn(),
            self.output.bias.view().into_dyn(),
        ]
    }

    pub fn tensors_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.lstm1.w_ih.view_mut().into_dyn(),
            self.lstm1.w_hh.view_mut().into_dyn(),
            self.lstm1.bias.view_mut().into_dyn(),
            self.lstm2.w_ih.view_mut().into_dyn(),
            self.lstm2.w_hh.view_mut().into_dyn(),
            self.lstm2.bias.view_mut().into_dyn(),
            self.fc1.weight.view_mut().into_dyn(),
            self.fc1.bias.view_mut().into_dyn(),
            self.fc2.weight.view_mut().into_dyn(),
            self.fc2.bias.view_mut().into_dyn(),
            self.output.weight.view_mut().into_dyn(),
            self.output.bias.view_mut().into_dyn(),
        ]
    }

    pub fn parameter_count(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }

    /// (B, T, F) → (B, 3)
    pub fn forward(&self, x: &Array3<f64>, mode: ForwardMode<'_>) -> Array2<f64> {
        self.forward_with_cache(x, mode).0
    }

    /// 평가 모드 순전파 (드롭아웃 없음, 결정적)
    pub fn predict(&self, x: &Array3<f64>) -> Array2<f64> {
        self.forward(x, ForwardMode::Eval)
    }

    pub fn forward_with_cache(&self, x: &Array3<f64>, mode: ForwardMode<'_>) -> (Array2<f64>, ForwardCache) {
        let mut rng = match mode {
            ForwardMode::Eval => None,
            ForwardMode::Dropout(rng) => Some(rng),
        };
        let p = self.config.dropout;

        let (seq1, lstm1) = self.lstm1.forward(x);
        let mask1 = rng.as_deref_mut().map(|r| dropout_mask(seq1.raw_dim(), p, r));
        let seq1 = match &mask1 {
            Some(mask) => seq1 * mask,
            None => seq1,
        };

        let (seq2, lstm2) = self.lstm2.forward(&seq1);
        let seq_len = seq2.len_of(Axis(1));
        let last = seq2.index_axis(Axis(1), seq_len - 1).to_owned();
        let mask2 = rng.as_deref_mut().map(|r| dropout_mask(last.raw_dim(), p, r));
        let dense_in = match &mask2 {
            Some(mask) => last * mask,
            None => last,
        };

        let fc1_pre = self.fc1.forward(&dense_in);
        let fc1_act = fc1_pre.mapv(|v| v.max(0.0));
        let fc2_pre = self.fc2.forward(&fc1_act);
        let fc2_act = fc2_pre.mapv(|v| v.max(0.0));
        let out = self.output.forward(&fc2_act);

        let cache = ForwardCache {
            lstm1,
            mask1,
            lstm2,
            seq_len,
            mask2,
            dense_in,
            fc1_pre,
            fc1_act,
            fc2_pre,
            fc2_act,
        };
        (out, cache)
    }

    /// `d_out` = dLoss/dOutput (B, 3). 같은 구조의 기울기 네트워크를 돌려준다.
    pub fn backward(&self, cache: &ForwardCache, d_out: &Array2<f64>) -> ForecastNetwork {
        let mut grads = self.zeros_like();

        let d_fc2_act = self.output.backward(&cache.fc2_act, d_out, &mut grads.output);
        let d_fc2_pre = d_fc2_act * &cache.fc2_pre.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let d_fc1_act = self.fc2.backward(&cache.fc1_act, &d_fc2_pre, &mut grads.fc2);
        let d_fc1_pre = d_fc1_act * &cache.fc1_pre.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        let d_dense_in = self.fc1.backward(&cache.dense_in, &d_fc1_pre, &mut grads.fc1);

        let d_last = match &cache.mask2 {
            Some(mask) => d_dense_in * mask,
            None => d_dense_in,
        };
        let batch = d_last.nrows();
        let mut d_seq2 = Array3::<f64>::zeros((batch, cache.seq_len, self.config.hidden_size_2));
        d_seq2
            .index_axis_mut(Axis(1), cache.seq_len - 1)
            .assign(&d_last);

        let d_seq1 = self.lstm2.backward(&cache.lstm2, &d_seq2, &mut grads.lstm2);
        let d_seq1 = match &cache.mask1 {
            Some(mask) => d_seq1 * mask,
            None => d_seq1,
        };
        self.lstm1.backward(&cache.lstm1, &d_seq1, &mut grads.lstm1);

        grads
    }

    /// 저장된 가중치의 모양이 구조 설정과 맞는지 확인
    pub fn validate_shapes(&self) -> Result<(), String> {
        let c = &self.config;
        let expected: [(&str, &[usize], Vec<usize>); 12] = [
            ("lstm1.w_ih", self.lstm1.w_ih.shape(), vec![4 * c.hidden_size_1, c.input_size]),
            ("lstm1.w_hh", self.lstm1.w_hh.shape(), vec![4 * c.hidden_size_1, c.hidden_size_1]),
            ("lstm1.bias", self.lstm1.bias.shape(), vec![4 * c.hidden_size_1]),
            ("lstm2.w_ih", self.lstm2.w_ih.shape(), vec![4 * c.hidden_size_2, c.hidden_size_1]),
            ("lstm2.w_hh", self.lstm2.w_hh.shape(), vec![4 * c.hidden_size_2, c.hidden_size_2]),
            ("lstm2.bias", self.lstm2.bias.shape(), vec![4 * c.hidden_size_2]),
            ("fc1.weight", self.fc1.weight.shape(), vec![c.dense_size_1, c.hidden_size_2]),
            ("fc1.bias", self.fc1.bias.shape(), vec![c.dense_size_1]),
            ("fc2.weight", self.fc2.weight.shape(), vec![c.dense_size_2, c.dense_size_1]),
            ("fc2.bias", self.fc2.bias.shape(), vec![c.dense_size_2]),
            ("output.weight", self.output.weight.shape(), vec![c.num_horizons, c.dense_size_2]),
            ("output.bias", self.output.bias.shape(), vec![c.num_horizons]),
        ];
        for (name, actual, want) in expected.iter() {
            if *actual != want.as_slice() {
                return Err(format!("{} 모양 {:?} (기대값 {:?})", name, actual, want));
            }
        }
        if c.input_size != NUM_FEATURES || c.num_horizons != NUM_HORIZONS {
            return Err(format!(
                "입출력 크기 불일치: 입력 {} / 출력 {}",
                c.input_size, c.num_horizons
            ));
        }
        if !(0.0..1.0).contains(&c.dropout) {
            return Err(format!("dropout 비율 {} 범위 밖", c.dropout));
        }
        if self.tensors().iter().any(|t| t.iter().any(|v| !v.is_finite())) {
            return Err("유한하지 않은 가중치 포함".to_string());
        }
        Ok(())
    }
}

/// 디스크에 저장되는 체크포인트 문서
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointDocument {
    pub format_version: u32,
    pub grade: String,
    pub model_version: String,
    pub sequence_length: usize,
    pub network: ForecastNetwork,
}

impl CheckpointDocument {
    pub fn new(grade: &str, model_version: &str, network: ForecastNetwork) -> Self {
        Self {
            format_version: CHECKPOINT_FORMAT_VERSION,
            grade: grade.to_string(),
            model_version: model_version.to_string(),
            sequence_length: SEQUENCE_LENGTH,
            network,
        }
    }

    /// 포맷 버전과 가중치 모양을 검증하고 네트워크를 꺼낸다
    pub fn into_network(self, source: &str) -> EggrsResult<ForecastNetwork> {
        if self.format_version != CHECKPOINT_FORMAT_VERSION {
            return Err(EggrsError::artifact_corrupted(
                source,
                format!("지원하지 않는 체크포인트 포맷 버전: {}", self.format_version),
            ));
        }
        if self.sequence_length != SEQUENCE_LENGTH {
            return Err(EggrsError::artifact_corrupted(
                source,
                format!("시퀀스 길이 {} (기대값 {})", self.sequence_length, SEQUENCE_LENGTH),
            ));
        }
        self.network
            .validate_shapes()
            .map_err(|reason| EggrsError::artifact_corrupted(source, reason))?;
        Ok(self.network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn small_config() -> NetworkConfig {
        NetworkConfig {
            input_size: 3,
            hidden_size_1: 4,
            hidden_size_2: 3,
            dense_size_1: 4,
            dense_size_2: 3,
            num_horizons: 2,
            dropout: 0.2,
        }
    }

    fn sample_input(batch: usize, steps: usize, features: usize) -> Array3<f64> {
        Array3::from_shape_fn((batch, steps, features), |(b, t, f)| {
            ((b * 7 + t * 3 + f) as f64 * 0.37).sin() * 0.5 + 0.5
        })
    }

    fn loss(net: &ForecastNetwork, x: &Array3<f64>, y: &Array2<f64>) -> f64 {
        let out = net.predict(x);
        (&out - y).mapv(|v| v * v).mean().unwrap_or(0.0)
    }

    #[test]
    fn test_output_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = ForecastNetwork::new(NetworkConfig::default(), &mut rng);
        let x = sample_input(2, SEQUENCE_LENGTH, NUM_FEATURES);
        assert_eq!(net.predict(&x).dim(), (2, NUM_HORIZONS));
        assert!(net.validate_shapes().is_ok());
    }

    #[test]
    fn test_eval_mode_is_deterministic() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = ForecastNetwork::new(NetworkConfig::default(), &mut rng);
        let x = sample_input(1, SEQUENCE_LENGTH, NUM_FEATURES);
        assert_eq!(net.predict(&x), net.predict(&x));
    }

    #[test]
    fn test_dropout_mode_varies() {
        let mut rng = StdRng::seed_from_u64(1);
        let net = ForecastNetwork::new(NetworkConfig::default(), &mut rng);
        let x = sample_input(1, SEQUENCE_LENGTH, NUM_FEATURES);

        let outputs: Vec<f64> = (0..20)
            .map(|_| net.forward(&x, ForwardMode::Dropout(&mut rng))[[0, 0]])
            .collect();
        let mean = outputs.iter().sum::<f64>() / outputs.len() as f64;
        let var = outputs.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / outputs.len() as f64;
        assert!(var > 0.0);
    }

    #[test]
    fn test_backward_matches_numerical_gradient() {
        let mut config = small_config();
        config.dropout = 0.0;
        let mut rng = StdRng::seed_from_u64(42);
        let net = ForecastNetwork::new(config, &mut rng);
        let x = sample_input(2, 5, 3);
        let y = Array2::from_shape_fn((2, 2), |(i, j)| 0.3 + 0.1 * (i + j) as f64);

        let (out, cache) = net.forward_with_cache(&x, ForwardMode::Eval);
        let d_out = (&out - &y) * (2.0 / out.len() as f64);
        let grads = net.backward(&cache, &d_out);

        let eps = 1e-6;
        let analytic: Vec<Vec<f64>> = grads.tensors().iter().map(|t| t.iter().copied().collect()).collect();

        for (tensor_idx, tensor_grads) in analytic.iter().enumerate() {
            // 텐서마다 몇 개 원소만 검사
            for elem in [0usize, tensor_grads.len() / 2, tensor_grads.len() - 1] {
                let mut plus = net.clone();
                plus.tensors_mut()[tensor_idx].as_slice_mut().expect("contiguous")[elem] += eps;
                let mut minus = net.clone();
                minus.tensors_mut()[tensor_idx].as_slice_mut().expect("contiguous")[elem] -= eps;

                let numeric = (loss(&plus, &x, &y) - loss(&minus, &x, &y)) / (2.0 * eps);
                let a = tensor_grads[elem];
                assert!(
                    (numeric - a).abs() < 1e-5 + 1e-3 * a.abs().max(numeric.abs()),
                    "tensor {} elem {}: analytic {} numeric {}",
                    tensor_idx,
                    elem,
                    a,
                    numeric
                );
            }
        }
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let mut rng = StdRng::seed_from_u64(3);
        let net = ForecastNetwork::new(NetworkConfig::default(), &mut rng);
        let doc = CheckpointDocument::new("특란", "v20250101", net.clone());
        let json = serde_json::to_string(&doc).expect("serialize");
        let parsed: CheckpointDocument = serde_json::from_str(&json).expect("parse");
        let restored = parsed.into_network("ckpt.json").expect("restore");

        let x = sample_input(1, SEQUENCE_LENGTH, NUM_FEATURES);
        assert_eq!(restored.predict(&x), net.predict(&x));
    }

    #[test]
    fn test_checkpoint_shape_mismatch_is_corrupted() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut net = ForecastNetwork::new(NetworkConfig::default(), &mut rng);
        net.fc1.bias = Array1::zeros(5);
        let doc = CheckpointDocument::new("특란", "v1", net);
        assert!(matches!(
            doc.into_network("ckpt.json"),
            Err(EggrsError::ArtifactCorrupted { .. })
        ));
    }
}
