use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 사료 가격 테이블에서 특징으로 사용하는 품목
pub const CORN_FEED_TYPE: &str = "옥수수";

/// 등급별 일일 가격 관측치. (date, grade) 기준으로 유일하다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub grade: String,
    pub retail_price: Option<f64>,
    pub wholesale_price: Option<f64>,
}

impl Observation {
    pub fn new(
        date: NaiveDate,
        grade: impl Into<String>,
        retail_price: Option<f64>,
        wholesale_price: Option<f64>,
    ) -> Self {
        Self {
            date,
            grade: grade.into(),
            retail_price,
            wholesale_price,
        }
    }
}

/// 날짜별 단일 값. 값이 비어 있는 날은 forward-fill 대상이다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl DatedValue {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// 보조 신호 종류 (외부 수집기 하나당 하나)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    TradingVolume,
    FeedPrice,
    ExchangeRate,
    AvianFlu,
    Weather,
}

impl SignalKind {
    pub const ALL: [SignalKind; 5] = [
        SignalKind::TradingVolume,
        SignalKind::FeedPrice,
        SignalKind::ExchangeRate,
        SignalKind::AvianFlu,
        SignalKind::Weather,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::TradingVolume => "volume",
            SignalKind::FeedPrice => "feed_price",
            SignalKind::ExchangeRate => "exchange_rate",
            SignalKind::AvianFlu => "avian_flu",
            SignalKind::Weather => "weather",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeRecord {
    pub date: NaiveDate,
    pub volume_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPriceRecord {
    pub date: NaiveDate,
    /// '배합사료', '옥수수', '대두박'
    pub feed_type: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRateRecord {
    pub date: NaiveDate,
    pub usd_krw: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutbreakRecord {
    pub date: NaiveDate,
    pub is_outbreak: bool,
    pub case_count: i64,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub avg_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub min_temperature: Option<f64>,
    pub humidity: Option<f64>,
}

/// 수집기 한 번의 응답. 신호 종류별로 하나의 variant.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalPayload {
    Volume(VolumeRecord),
    FeedPrices(Vec<FeedPriceRecord>),
    ExchangeRate(ExchangeRateRecord),
    AvianFlu(OutbreakRecord),
    Weather(WeatherRecord),
}

impl SignalPayload {
    pub fn kind(&self) -> SignalKind {
        match self {
            SignalPayload::Volume(_) => SignalKind::TradingVolume,
            SignalPayload::FeedPrices(_) => SignalKind::FeedPrice,
            SignalPayload::ExchangeRate(_) => SignalKind::ExchangeRate,
            SignalPayload::AvianFlu(_) => SignalKind::AvianFlu,
            SignalPayload::Weather(_) => SignalKind::Weather,
        }
    }
}

/// 특징 생성에 필요한 한 등급의 원시 이력.
/// 보조 신호가 `None`이면 해당 컬럼은 0으로 합성된다.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketHistory {
    pub grade: String,
    pub observations: Vec<Observation>,
    pub volume: Option<Vec<DatedValue>>,
    pub feed_price: Option<Vec<DatedValue>>,
    pub exchange_rate: Option<Vec<DatedValue>>,
    pub avian_flu: Option<Vec<DatedValue>>,
    pub temperature: Option<Vec<DatedValue>>,
}

impl MarketHistory {
    pub fn new(grade: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            grade: grade.into(),
            observations,
            ..Default::default()
        }
    }

    /// 소매가가 있는 관측치 중 가장 최근 날짜
    pub fn latest_observed_date(&self) -> Option<NaiveDate> {
        self.observations
            .iter()
            .filter(|o| o.retail_price.is_some())
            .map(|o| o.date)
            .max()
    }

    pub fn latest_retail_price(&self) -> Option<f64> {
        self.observations
            .iter()
            .filter(|o| o.retail_price.is_some())
            .max_by_key(|o| o.date)
            .and_then(|o| o.retail_price)
    }
}
