pub mod indicators {
    pub mod rolling;
}

use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDate};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::NUM_FEATURES;
use crate::utility::types::{DatedValue, MarketHistory};
use indicators::rolling::{clip, forward_fill, pct_change, rolling_mean, rolling_std};

/// 15개 입력 특징 컬럼 (순서 고정)
pub const FEATURE_COLUMNS: [&str; NUM_FEATURES] = [
    "price",              // 1. 소비자가
    "wholesale_price",    // 2. 산지가
    "volume",             // 3. 거래량
    "corn_price",         // 4. 사료(옥수수) 가격
    "exchange_rate",      // 5. 환율 (USD/KRW)
    "avian_flu",          // 6. 조류독감 발생 여부 (0/1)
    "temperature",        // 7. 평균 기온
    "day_of_week_sin",    // 8. 요일 sin
    "day_of_week_cos",    // 9. 요일 cos
    "month_sin",          // 10. 월 sin
    "month_cos",          // 11. 월 cos
    "price_ma7",          // 12. 7일 이동평균
    "price_ma14",         // 13. 14일 이동평균
    "price_volatility_7", // 14. 7일 변동성 (std)
    "price_momentum",     // 15. 가격 모멘텀 (7일 수익률)
];

/// 날짜 하나에 대한 특징 행
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub price: f64,
    pub wholesale_price: f64,
    pub volume: f64,
    pub corn_price: f64,
    pub exchange_rate: f64,
    pub avian_flu: f64,
    pub temperature: f64,
    pub day_of_week_sin: f64,
    pub day_of_week_cos: f64,
    pub month_sin: f64,
    pub month_cos: f64,
    pub price_ma7: f64,
    pub price_ma14: f64,
    pub price_volatility_7: f64,
    pub price_momentum: f64,
}

impl FeatureRow {
    /// FEATURE_COLUMNS 순서의 값 배열
    pub fn values(&self) -> [f64; NUM_FEATURES] {
        [
            self.price,
            self.wholesale_price,
            self.volume,
            self.corn_price,
            self.exchange_rate,
            self.avian_flu,
            self.temperature,
            self.day_of_week_sin,
            self.day_of_week_cos,
            self.month_sin,
            self.month_cos,
            self.price_ma7,
            self.price_ma14,
            self.price_volatility_7,
            self.price_momentum,
        ]
    }
}

/// (N, 15) 특징 행렬
pub fn feature_matrix(rows: &[FeatureRow]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), NUM_FEATURES), |(i, j)| rows[i].values()[j])
}

/// 가격 컬럼만 추출
pub fn price_column(rows: &[FeatureRow]) -> Vec<f64> {
    rows.iter().map(|r| r.price).collect()
}

/// 원시 이력에서 15개 특징 테이블을 만든다.
///
/// 소매가가 없는 관측치는 제외하고 날짜순으로 정렬한 뒤, 각 보조 신호를
/// 해당 날짜 이전의 마지막 값으로 붙인다 (이력 시작일 이전 값은 쓰지 않음).
/// 없는 신호 컬럼은 0, 앞쪽 공백도 0으로 채운다.
pub fn build_features(history: &MarketHistory) -> Vec<FeatureRow> {
    let mut observations: Vec<(NaiveDate, f64, Option<f64>)> = history
        .observations
        .iter()
        .filter_map(|o| o.retail_price.map(|p| (o.date, p, o.wholesale_price)))
        .collect();
    observations.sort_by_key(|(date, _, _)| *date);
    observations.dedup_by_key(|(date, _, _)| *date);

    if observations.is_empty() {
        return Vec::new();
    }

    let dates: Vec<NaiveDate> = observations.iter().map(|(d, _, _)| *d).collect();
    let price: Vec<f64> = observations.iter().map(|(_, p, _)| *p).collect();

    // 산지가: forward-fill, 앞쪽 공백은 같은 날 소매가로 대체
    let mut last_wholesale: Option<f64> = None;
    let wholesale: Vec<f64> = observations
        .iter()
        .map(|(_, retail, wholesale)| {
            if let Some(w) = wholesale.filter(|w| w.is_finite()) {
                last_wholesale = Some(w);
            }
            last_wholesale.unwrap_or(*retail)
        })
        .collect();

    let volume = merge_signal(&dates, history.volume.as_deref());
    let corn_price = merge_signal(&dates, history.feed_price.as_deref());
    let exchange_rate = merge_signal(&dates, history.exchange_rate.as_deref());
    let avian_flu = merge_signal(&dates, history.avian_flu.as_deref());
    let temperature = merge_signal(&dates, history.temperature.as_deref());

    let price_ma7 = rolling_mean(&price, 7);
    let price_ma14 = rolling_mean(&price, 14);
    let price_volatility_7 = rolling_std(&price, 7);
    let price_momentum = clip(&pct_change(&price, 7), -1.0, 1.0);

    debug!(
        "🔧 [Features] {} 특징 생성: {}행 ({} ~ {})",
        history.grade,
        dates.len(),
        dates[0],
        dates[dates.len() - 1]
    );

    dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let (dow_sin, dow_cos) = cyclical(date.weekday().num_days_from_monday() as f64, 7.0);
            let (month_sin, month_cos) = cyclical(date.month() as f64, 12.0);
            FeatureRow {
                date: *date,
                price: price[i],
                wholesale_price: wholesale[i],
                volume: volume[i],
                corn_price: corn_price[i],
                exchange_rate: exchange_rate[i],
                avian_flu: avian_flu[i],
                temperature: temperature[i],
                day_of_week_sin: dow_sin,
                day_of_week_cos: dow_cos,
                month_sin,
                month_cos,
                price_ma7: price_ma7[i],
                price_ma14: price_ma14[i],
                price_volatility_7: price_volatility_7[i],
                price_momentum: price_momentum[i],
            }
        })
        .collect()
}

fn cyclical(value: f64, period: f64) -> (f64, f64) {
    let angle = 2.0 * PI * value / period;
    (angle.sin(), angle.cos())
}

/// 보조 신호를 가격 날짜축에 맞춘다. 신호가 없으면 0 컬럼.
fn merge_signal(dates: &[NaiveDate], signal: Option<&[DatedValue]>) -> Vec<f64> {
    let Some(signal) = signal else {
        return vec![0.0; dates.len()];
    };

    let first = dates[0];
    let by_date: BTreeMap<NaiveDate, Option<f64>> = signal
        .iter()
        .filter(|v| v.date >= first)
        .map(|v| (v.date, v.value))
        .collect();

    // 각 가격 날짜에 대해 그 날짜 이하의 마지막 유효 값을 취한다
    let mut aligned: Vec<Option<f64>> = Vec::with_capacity(dates.len());
    let mut cursor = by_date.iter().peekable();
    let mut last: Option<f64> = None;
    for date in dates {
        while let Some((d, v)) = cursor.peek() {
            if **d > *date {
                break;
            }
            if let Some(value) = v.filter(|value| value.is_finite()) {
                last = Some(value);
            }
            cursor.next();
        }
        aligned.push(last);
    }

    forward_fill(&aligned, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{full_history, linear_history};
    use crate::utility::types::Observation;

    #[test]
    fn test_output_length_matches_input() {
        let history = linear_history("특란", 60);
        let rows = build_features(&history);
        assert_eq!(rows.len(), 60);
        assert_eq!(rows[0].values().len(), FEATURE_COLUMNS.len());
    }

    #[test]
    fn test_missing_signals_are_zero_and_wholesale_falls_back() {
        let history = linear_history("특란", 30);
        let rows = build_features(&history);
        for row in &rows {
            assert_eq!(row.volume, 0.0);
            assert_eq!(row.corn_price, 0.0);
            assert_eq!(row.exchange_rate, 0.0);
            assert_eq!(row.avian_flu, 0.0);
            assert_eq!(row.temperature, 0.0);
            assert_eq!(row.wholesale_price, row.price);
        }
    }

    #[test]
    fn test_value_ranges() {
        let rows = build_features(&full_history("대란", 120));
        for row in &rows {
            for v in [
                row.day_of_week_sin,
                row.day_of_week_cos,
                row.month_sin,
                row.month_cos,
                row.price_momentum,
            ] {
                assert!((-1.0..=1.0).contains(&v));
            }
            assert!(row.price_volatility_7 >= 0.0);
            assert!(row.values().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_momentum_first_seven_rows_zero() {
        let rows = build_features(&linear_history("특란", 20));
        for row in rows.iter().take(7) {
            assert_eq!(row.price_momentum, 0.0);
        }
        assert!(rows[7].price_momentum > 0.0);
    }

    #[test]
    fn test_sorts_by_date_regardless_of_input_order() {
        let mut history = linear_history("특란", 30);
        let sorted = build_features(&history);
        history.observations.reverse();
        history.observations.swap(3, 17);
        let shuffled = build_features(&history);
        assert_eq!(sorted, shuffled);
        assert!(shuffled.windows(2).all(|w| w[0].date < w[1].date));
    }

    #[test]
    fn test_signal_forward_fill_and_leading_gap() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
        let observations: Vec<Observation> = (0..5)
            .map(|i| {
                Observation::new(
                    start + chrono::Duration::days(i),
                    "특란",
                    Some(6000.0 + i as f64),
                    None,
                )
            })
            .collect();
        let mut history = MarketHistory::new("특란", observations);
        history.exchange_rate = Some(vec![
            // 이력 시작 이전 값은 사용하지 않는다
            DatedValue::new(start - chrono::Duration::days(3), Some(1200.0)),
            DatedValue::new(start + chrono::Duration::days(2), Some(1300.0)),
            DatedValue::new(start + chrono::Duration::days(3), None),
        ]);

        let rows = build_features(&history);
        let rates: Vec<f64> = rows.iter().map(|r| r.exchange_rate).collect();
        assert_eq!(rates, vec![0.0, 0.0, 1300.0, 1300.0, 1300.0]);
    }

    #[test]
    fn test_signal_on_non_price_date_carries_to_next_price_date() {
        // 2025-03-03은 월요일. 가격은 평일만 있다.
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).expect("date");
        let offsets = [0, 1, 2, 3, 4, 7];
        let observations: Vec<Observation> = offsets
            .iter()
            .map(|&d| Observation::new(monday + chrono::Duration::days(d), "특란", Some(6000.0), None))
            .collect();
        let mut history = MarketHistory::new("특란", observations);
        history.feed_price = Some(vec![
            DatedValue::new(monday, Some(400.0)),
            // 토요일 값: 가격 행이 없는 날이지만 다음 월요일에 반영된다
            DatedValue::new(monday + chrono::Duration::days(5), Some(420.0)),
            // 마지막 가격 날짜 이후 값은 쓰지 않는다
            DatedValue::new(monday + chrono::Duration::days(8), Some(999.0)),
        ]);

        let rows = build_features(&history);
        let feed: Vec<f64> = rows.iter().map(|r| r.corn_price).collect();
        assert_eq!(feed, vec![400.0, 400.0, 400.0, 400.0, 400.0, 420.0]);
    }

    #[test]
    fn test_rows_without_retail_price_are_dropped() {
        let mut history = linear_history("특란", 10);
        history.observations[4].retail_price = None;
        assert_eq!(build_features(&history).len(), 9);
    }

    #[test]
    fn test_no_lookahead() {
        let history = full_history("특란", 80);
        let full = build_features(&history);

        let mut truncated = history.clone();
        truncated.observations.truncate(50);
        let partial = build_features(&truncated);

        for (a, b) in partial.iter().zip(full.iter()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_feature_matrix_shape() {
        let rows = build_features(&linear_history("특란", 12));
        let m = feature_matrix(&rows);
        assert_eq!(m.dim(), (12, 15));
        assert_eq!(m[(3, 0)], rows[3].price);
        assert_eq!(m[(3, 14)], rows[3].price_momentum);
    }
}
