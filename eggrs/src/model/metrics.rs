use ndarray::{ArrayView2, Axis};

use crate::utility::types::Metrics;

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// 가격 단위 (N, 3) 실제값/예측값으로 평가 지표를 계산한다.
///
/// - MAE, RMSE: 세 horizon 전체 원소 기준
/// - MAPE: 실제값이 0인 원소 제외, 모두 0이면 0
/// - 방향 정확도: 첫 horizon(7일)의 연속 변화 부호 일치율, N ≤ 1이면 0
///
/// 모든 값은 소수 둘째 자리로 반올림한다.
pub fn compute_metrics(y_true: ArrayView2<f64>, y_pred: ArrayView2<f64>) -> Metrics {
    let n = y_true.len();
    if n == 0 {
        return Metrics::new(0.0, 0.0, 0.0, 0.0);
    }

    let errors = &y_true - &y_pred;
    let mae = errors.mapv(f64::abs).sum() / n as f64;
    let rmse = (errors.mapv(|e| e * e).sum() / n as f64).sqrt();

    let (sum, count) = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, _)| **t != 0.0)
        .fold((0.0, 0usize), |(s, c), (t, p)| (s + ((t - p) / t).abs(), c + 1));
    let mape = if count > 0 { sum / count as f64 * 100.0 } else { 0.0 };

    let directional_accuracy = directional_accuracy(y_true, y_pred);

    Metrics::new(round2(mae), round2(rmse), round2(mape), round2(directional_accuracy))
}

fn directional_accuracy(y_true: ArrayView2<f64>, y_pred: ArrayView2<f64>) -> f64 {
    let rows = y_true.len_of(Axis(0));
    if rows <= 1 {
        return 0.0;
    }
    let true_first = y_true.column(0);
    let pred_first = y_pred.column(0);
    let matches = (1..rows)
        .filter(|&i| {
            let true_up = true_first[i] - true_first[i - 1] > 0.0;
            let pred_up = pred_first[i] - pred_first[i - 1] > 0.0;
            true_up == pred_up
        })
        .count();
    matches as f64 / (rows - 1) as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_prediction() {
        let y = array![[100.0, 110.0, 120.0], [105.0, 115.0, 125.0], [103.0, 113.0, 123.0]];
        let m = compute_metrics(y.view(), y.view());
        assert_eq!(m.mae, 0.0);
        assert_eq!(m.rmse, 0.0);
        assert_eq!(m.mape, 0.0);
        assert_eq!(m.directional_accuracy, 100.0);
    }

    #[test]
    fn test_known_values() {
        let t = array![[100.0, 100.0, 100.0], [200.0, 200.0, 200.0]];
        let p = array![[110.0, 90.0, 100.0], [180.0, 220.0, 200.0]];
        let m = compute_metrics(t.view(), p.view());
        // |err| = 10,10,0,20,20,0 → 60/6
        assert_eq!(m.mae, 10.0);
        // sqrt((100+100+400+400)/6)
        assert_eq!(m.rmse, round2((1000.0f64 / 6.0).sqrt()));
        // (0.1+0.1+0+0.1+0.1+0)/6*100
        assert_eq!(m.mape, round2(40.0 / 6.0));
        // 실제 상승, 예측 상승
        assert_eq!(m.directional_accuracy, 100.0);
    }

    #[test]
    fn test_mape_skips_zero_truth() {
        let t = array![[0.0, 0.0, 0.0]];
        let p = array![[5.0, 5.0, 5.0]];
        let m = compute_metrics(t.view(), p.view());
        assert_eq!(m.mape, 0.0);
        assert_eq!(m.directional_accuracy, 0.0);

        let t = array![[0.0, 100.0, 100.0]];
        let p = array![[5.0, 90.0, 110.0]];
        assert_eq!(compute_metrics(t.view(), p.view()).mape, 10.0);
    }

    #[test]
    fn test_directional_accuracy_uses_first_horizon() {
        let t = array![[100.0, 0.0, 0.0], [110.0, 0.0, 0.0], [105.0, 0.0, 0.0], [108.0, 0.0, 0.0]];
        let p = array![[100.0, 9.0, 9.0], [120.0, 1.0, 1.0], [125.0, 9.0, 9.0], [110.0, 1.0, 1.0]];
        // 실제: 상승, 하락, 상승 / 예측: 상승, 상승, 하락 → 1/3
        let m = compute_metrics(t.view(), p.view());
        assert_eq!(m.directional_accuracy, 33.33);
    }
}
