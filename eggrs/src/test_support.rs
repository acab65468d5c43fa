//! 테스트 전용 합성 시장 이력 생성기

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use crate::utility::config::TrainingConfig;
use crate::utility::types::{DatedValue, MarketHistory, Observation};

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

/// 소매가만 있는 단조 증가 이력 (보조 신호 없음)
pub fn linear_history(grade: &str, days: usize) -> MarketHistory {
    let start = start_date();
    let observations = (0..days)
        .map(|i| {
            Observation::new(
                start + Duration::days(i as i64),
                grade,
                Some(6000.0 + 10.0 * i as f64),
                None,
            )
        })
        .collect();
    MarketHistory::new(grade, observations)
}

fn synthetic_price(i: usize) -> f64 {
    let t = i as f64;
    6000.0 + 300.0 * (t / 10.0).sin() + 2.0 * t + ((i * 37) % 11) as f64 * 8.0
}

/// 모든 보조 신호가 있는 계절성 이력. `start_date()`부터 `days`일.
pub fn full_history(grade: &str, days: usize) -> MarketHistory {
    full_history_from(grade, start_date(), days)
}

pub fn full_history_from(grade: &str, start: NaiveDate, days: usize) -> MarketHistory {
    let dates: Vec<NaiveDate> = (0..days).map(|i| start + Duration::days(i as i64)).collect();

    let observations = dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            let price = synthetic_price(i);
            // 산지가는 5일에 한 번 누락
            let wholesale = if i % 5 == 0 { None } else { Some(price * 0.78) };
            Observation::new(*date, grade, Some(price), wholesale)
        })
        .collect();

    let mut history = MarketHistory::new(grade, observations);
    history.volume = Some(
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| DatedValue::new(*d, Some(120_000.0 + 500.0 * ((i % 9) as f64))))
            .collect(),
    );
    // 사료 가격은 주 1회
    history.feed_price = Some(
        dates
            .iter()
            .enumerate()
            .filter(|(i, _)| i % 7 == 3)
            .map(|(i, d)| DatedValue::new(*d, Some(410.0 + (i / 7) as f64)))
            .collect(),
    );
    // 환율은 평일만
    history.exchange_rate = Some(
        dates
            .iter()
            .enumerate()
            .filter(|(_, d)| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|(i, d)| DatedValue::new(*d, Some(1320.0 + ((i % 13) as f64) * 1.5)))
            .collect(),
    );
    history.avian_flu = Some(
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| DatedValue::new(*d, Some(if (40..50).contains(&i) { 1.0 } else { 0.0 })))
            .collect(),
    );
    history.temperature = Some(
        dates
            .iter()
            .enumerate()
            .map(|(i, d)| DatedValue::new(*d, Some(12.0 + 10.0 * (i as f64 / 58.0).sin())))
            .collect(),
    );
    history
}

/// 테스트용 짧은 학습 설정 (시드 고정)
pub fn fast_training_config() -> TrainingConfig {
    TrainingConfig {
        epochs: 3,
        batch_size: 32,
        learning_rate: 0.001,
        patience: 10,
        validation_ratio: 0.2,
        seed: Some(42),
    }
}
