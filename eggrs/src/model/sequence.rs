use ndarray::{s, Array2, Array3, ArrayView2, Axis};

use crate::utility::errors::{EggrsError, EggrsResult};

/// 학습용 슬라이딩 윈도우 묶음
#[derive(Debug, Clone)]
pub struct SequenceSet {
    /// (num_windows, seq_len, num_features)
    pub inputs: Array3<f64>,
    /// (num_windows, num_horizons)
    pub targets: Array2<f64>,
}

impl SequenceSet {
    pub fn len(&self) -> usize {
        self.inputs.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// [start, end) 구간을 잘라낸다 (시간 순서 유지)
    pub fn slice(&self, start: usize, end: usize) -> SequenceSet {
        SequenceSet {
            inputs: self.inputs.slice(s![start..end, .., ..]).to_owned(),
            targets: self.targets.slice(s![start..end, ..]).to_owned(),
        }
    }

    /// 주어진 인덱스 순서로 미니배치를 만든다
    pub fn batch(&self, indices: &[usize]) -> (Array3<f64>, Array2<f64>) {
        (
            self.inputs.select(Axis(0), indices),
            self.targets.select(Axis(0), indices),
        )
    }
}

/// `window[i] = features[i..i+L]`, `target[i] = targets[i+L]`.
/// 윈도우 수는 `max(0, N - L)`.
pub fn create_sequences(
    features: ArrayView2<f64>,
    targets: ArrayView2<f64>,
    seq_len: usize,
) -> EggrsResult<SequenceSet> {
    if features.nrows() != targets.nrows() {
        return Err(EggrsError::validation(
            "targets",
            format!(
                "특징 {}행과 목표 {}행의 길이가 다릅니다",
                features.nrows(),
                targets.nrows()
            ),
        ));
    }

    let inputs = windows(features, seq_len);
    let count = inputs.len_of(Axis(0));
    let aligned = if count == 0 {
        Array2::zeros((0, targets.ncols()))
    } else {
        targets.slice(s![seq_len.., ..]).to_owned()
    };

    Ok(SequenceSet {
        inputs,
        targets: aligned,
    })
}

/// 목표 없이 윈도우만 만든다 (평가/추론용)
pub fn windows(features: ArrayView2<f64>, seq_len: usize) -> Array3<f64> {
    let (n, f) = features.dim();
    let count = n.saturating_sub(seq_len);
    let mut out = Array3::zeros((count, seq_len, f));
    for i in 0..count {
        out.slice_mut(s![i, .., ..])
            .assign(&features.slice(s![i..i + seq_len, ..]));
    }
    out
}

/// 가장 최근 L행으로 만든 추론 입력 (1, L, F)
pub fn last_window(features: ArrayView2<f64>, seq_len: usize, grade: &str) -> EggrsResult<Array3<f64>> {
    let n = features.nrows();
    if n < seq_len {
        return Err(EggrsError::insufficient_data(grade, seq_len, n, "추론 윈도우"));
    }
    Ok(features
        .slice(s![n - seq_len.., ..])
        .to_owned()
        .insert_axis(Axis(0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp(n: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, cols), |(i, j)| (i * 10 + j) as f64)
    }

    #[test]
    fn test_window_count() {
        for n in [0usize, 5, 30, 31, 45] {
            let features = ramp(n, 4);
            let targets = ramp(n, 3);
            let set = create_sequences(features.view(), targets.view(), 30).expect("windows");
            assert_eq!(set.len(), n.saturating_sub(30));
            assert_eq!(set.targets.nrows(), set.len());
        }
    }

    #[test]
    fn test_window_alignment() {
        let features = ramp(40, 4);
        let targets = ramp(40, 3);
        let set = create_sequences(features.view(), targets.view(), 30).expect("windows");
        for i in 0..set.len() {
            assert_eq!(
                set.inputs.slice(s![i, .., ..]),
                features.slice(s![i..i + 30, ..])
            );
            assert_eq!(set.targets.row(i), targets.row(i + 30));
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let features = ramp(40, 4);
        let targets = ramp(39, 3);
        assert!(create_sequences(features.view(), targets.view(), 30).is_err());
    }

    #[test]
    fn test_last_window() {
        let features = ramp(35, 4);
        let window = last_window(features.view(), 30, "특란").expect("window");
        assert_eq!(window.dim(), (1, 30, 4));
        assert_eq!(window[[0, 29, 0]], 340.0);
        assert_eq!(window[[0, 0, 0]], 50.0);

        let short = ramp(29, 4);
        let err = last_window(short.view(), 30, "특란").unwrap_err();
        assert!(matches!(
            err,
            EggrsError::InsufficientData {
                required: 30,
                available: 29,
                ..
            }
        ));
    }

    #[test]
    fn test_slice_and_batch() {
        let features = ramp(40, 2);
        let targets = ramp(40, 3);
        let set = create_sequences(features.view(), targets.view(), 30).expect("windows");
        let head = set.slice(0, 8);
        assert_eq!(head.len(), 8);
        let (x, y) = set.batch(&[3, 1]);
        assert_eq!(x.dim(), (2, 30, 2));
        assert_eq!(y.row(0), targets.row(33));
    }
}
