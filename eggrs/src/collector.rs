use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info};

use crate::db_manager::DBManager;
use crate::utility::errors::EggrsResult;
use crate::utility::types::{Observation, SignalKind, SignalPayload};

/// 등급별 일일 가격 공급원 (외부 API 클라이언트가 구현)
pub trait PriceSource: Send + Sync {
    fn fetch_prices(&self, date: NaiveDate) -> EggrsResult<Vec<Observation>>;
}

/// 보조 신호 공급원. 신호 종류 하나당 구현 하나.
pub trait SignalSource: Send + Sync {
    fn kind(&self) -> SignalKind;

    /// 해당 날짜 데이터가 없으면 `Ok(None)`
    fn fetch(&self, date: NaiveDate) -> EggrsResult<Option<SignalPayload>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum CollectionStatus {
    /// 저장한 레코드 수
    Stored(usize),
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollectionReport {
    pub date: NaiveDate,
    pub prices: CollectionStatus,
    pub signals: Vec<(SignalKind, CollectionStatus)>,
}

impl CollectionReport {
    pub fn failures(&self) -> usize {
        std::iter::once(&self.prices)
            .chain(self.signals.iter().map(|(_, s)| s))
            .filter(|s| matches!(s, CollectionStatus::Failed(_)))
            .count()
    }
}

/// 일일 수집 오케스트레이터. 공급원마다 독립적으로 실행되며
/// 하나가 실패해도 나머지는 계속 수집한다.
pub struct DataCollector {
    db: Arc<DBManager>,
    prices: Option<Box<dyn PriceSource>>,
    signals: Vec<Box<dyn SignalSource>>,
}

impl DataCollector {
    pub fn new(db: Arc<DBManager>) -> Self {
        Self {
            db,
            prices: None,
            signals: Vec::new(),
        }
    }

    pub fn with_price_source(mut self, source: Box<dyn PriceSource>) -> Self {
        self.prices = Some(source);
        self
    }

    pub fn with_signal_source(mut self, source: Box<dyn SignalSource>) -> Self {
        self.signals.push(source);
        self
    }

    pub fn collect_daily(&self, date: NaiveDate) -> CollectionReport {
        info!("📥 [Collector] {} 데이터 수집 시작", date);

        let prices = match &self.prices {
            Some(source) => self.collect_prices(source.as_ref(), date),
            None => CollectionStatus::NoData,
        };

        let signals = self
            .signals
            .iter()
            .map(|source| {
                let kind = source.kind();
                let status = self.collect_signal(source.as_ref(), date);
                match &status {
                    CollectionStatus::Failed(reason) => {
                        error!("❌ [Collector] {} 수집 실패: {}", kind.as_str(), reason)
                    }
                    other => info!("📥 [Collector] {}: {:?}", kind.as_str(), other),
                }
                (kind, status)
            })
            .collect();

        let report = CollectionReport {
            date,
            prices,
            signals,
        };
        info!(
            "✅ [Collector] {} 수집 완료 (실패 {}건)",
            date,
            report.failures()
        );
        report
    }

    fn collect_prices(&self, source: &dyn PriceSource, date: NaiveDate) -> CollectionStatus {
        let result = source.fetch_prices(date).and_then(|observations| {
            observations
                .iter()
                .try_for_each(|o| self.db.upsert_price(o))
                .map(|_| observations.len())
        });
        match result {
            Ok(0) => CollectionStatus::NoData,
            Ok(count) => CollectionStatus::Stored(count),
            Err(e) => {
                error!("❌ [Collector] 가격 수집 실패: {}", e);
                CollectionStatus::Failed(e.to_string())
            }
        }
    }

    fn collect_signal(&self, source: &dyn SignalSource, date: NaiveDate) -> CollectionStatus {
        match source.fetch(date) {
            Ok(None) => CollectionStatus::NoData,
            Ok(Some(payload)) => {
                let count = match &payload {
                    SignalPayload::FeedPrices(records) => records.len(),
                    _ => 1,
                };
                if count == 0 {
                    return CollectionStatus::NoData;
                }
                match self.db.store_signal(&payload) {
                    Ok(()) => CollectionStatus::Stored(count),
                    Err(e) => CollectionStatus::Failed(e.to_string()),
                }
            }
            Err(e) => CollectionStatus::Failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utility::errors::EggrsError;
    use crate::utility::types::{ExchangeRateRecord, VolumeRecord};

    struct FixedPrices;

    impl PriceSource for FixedPrices {
        fn fetch_prices(&self, date: NaiveDate) -> EggrsResult<Vec<Observation>> {
            Ok(vec![
                Observation::new(date, "특란", Some(6500.0), Some(5100.0)),
                Observation::new(date, "대란", Some(6100.0), None),
            ])
        }
    }

    struct Volume;

    impl SignalSource for Volume {
        fn kind(&self) -> SignalKind {
            SignalKind::TradingVolume
        }

        fn fetch(&self, date: NaiveDate) -> EggrsResult<Option<SignalPayload>> {
            Ok(Some(SignalPayload::Volume(VolumeRecord {
                date,
                volume_kg: 150_000.0,
            })))
        }
    }

    struct Broken;

    impl SignalSource for Broken {
        fn kind(&self) -> SignalKind {
            SignalKind::Weather
        }

        fn fetch(&self, _date: NaiveDate) -> EggrsResult<Option<SignalPayload>> {
            Err(EggrsError::general("기상청 API 응답 없음"))
        }
    }

    struct Holiday;

    impl SignalSource for Holiday {
        fn kind(&self) -> SignalKind {
            SignalKind::ExchangeRate
        }

        fn fetch(&self, date: NaiveDate) -> EggrsResult<Option<SignalPayload>> {
            if date.format("%a").to_string() == "Sun" {
                Ok(None)
            } else {
                Ok(Some(SignalPayload::ExchangeRate(ExchangeRateRecord {
                    date,
                    usd_krw: 1350.0,
                })))
            }
        }
    }

    #[test]
    fn test_failing_source_does_not_block_others() {
        let db = Arc::new(DBManager::open_in_memory().expect("db"));
        let collector = DataCollector::new(db.clone())
            .with_price_source(Box::new(FixedPrices))
            .with_signal_source(Box::new(Broken))
            .with_signal_source(Box::new(Volume))
            .with_signal_source(Box::new(Holiday));

        // 2025-06-01은 일요일
        let date = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        let report = collector.collect_daily(date);

        assert_eq!(report.prices, CollectionStatus::Stored(2));
        assert!(matches!(report.signals[0], (SignalKind::Weather, CollectionStatus::Failed(_))));
        assert_eq!(report.signals[1], (SignalKind::TradingVolume, CollectionStatus::Stored(1)));
        assert_eq!(report.signals[2], (SignalKind::ExchangeRate, CollectionStatus::NoData));
        assert_eq!(report.failures(), 1);

        let history = db.fetch_history("특란", None).expect("history");
        assert_eq!(history.observations.len(), 1);
        assert_eq!(history.volume.map(|v| v.len()), Some(1));
        assert_eq!(history.temperature, None);
    }

    #[test]
    fn test_no_price_source() {
        let db = Arc::new(DBManager::open_in_memory().expect("db"));
        let report = DataCollector::new(db).collect_daily(NaiveDate::from_ymd_opt(2025, 6, 2).expect("date"));
        assert_eq!(report.prices, CollectionStatus::NoData);
        assert!(report.signals.is_empty());
    }
}
