use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use tracing::{debug, info};

use crate::utility::errors::{EggrsError, EggrsResult};
use crate::utility::types::{
    DatedValue, ExchangeRateRecord, FeedPriceRecord, MarketHistory, Metrics, ModelVersionEntry,
    Observation, OutbreakRecord, PerformanceRecord, Prediction, SignalPayload, VolumeRecord,
    WeatherRecord, CORN_FEED_TYPE,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS egg_prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        grade TEXT NOT NULL,
        wholesale_price REAL,
        retail_price REAL,
        unit TEXT NOT NULL DEFAULT '30개',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (date, grade)
    )",
    "CREATE TABLE IF NOT EXISTS trading_volumes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        volume_kg REAL NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS feed_prices (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        feed_type TEXT NOT NULL,
        price REAL NOT NULL,
        unit TEXT NOT NULL DEFAULT '원/kg',
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        UNIQUE (date, feed_type)
    )",
    "CREATE TABLE IF NOT EXISTS exchange_rates (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        usd_krw REAL NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS avian_flu_status (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        is_outbreak INTEGER NOT NULL DEFAULT 0,
        case_count INTEGER NOT NULL DEFAULT 0,
        region TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS weather_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL UNIQUE,
        avg_temperature REAL,
        max_temperature REAL,
        min_temperature REAL,
        humidity REAL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS predictions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        base_date TEXT NOT NULL,
        target_date TEXT NOT NULL,
        grade TEXT NOT NULL,
        predicted_price REAL NOT NULL,
        confidence_lower REAL NOT NULL,
        confidence_upper REAL NOT NULL,
        horizon_days INTEGER NOT NULL,
        model_version TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_predictions_grade_base ON predictions (grade, base_date)",
    "CREATE TABLE IF NOT EXISTS model_performance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        model_version TEXT NOT NULL,
        grade TEXT NOT NULL,
        eval_date TEXT NOT NULL,
        mae REAL NOT NULL,
        rmse REAL NOT NULL,
        mape REAL NOT NULL,
        directional_accuracy REAL NOT NULL,
        is_production INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE INDEX IF NOT EXISTS idx_performance_grade ON model_performance (grade, model_version)",
    "CREATE TABLE IF NOT EXISTS model_registry (
        grade TEXT NOT NULL,
        version TEXT NOT NULL,
        train_date TEXT,
        is_production INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY (grade, version)
    )",
];

fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let text: String = row.get(idx)?;
    NaiveDate::parse_from_str(&text, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn opt_date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let text: Option<String> = row.get(idx)?;
    text.map(|t| {
        NaiveDate::parse_from_str(&t, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn performance_from_row(row: &Row<'_>) -> rusqlite::Result<PerformanceRecord> {
    Ok(PerformanceRecord {
        id: row.get(0)?,
        model_version: row.get(1)?,
        grade: row.get(2)?,
        eval_date: date_column(row, 3)?,
        metrics: Metrics::new(row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?),
        is_production: row.get::<_, i64>(8)? != 0,
        created_at: datetime_column(row, 9)?,
    })
}

const PERFORMANCE_COLUMNS: &str = "id, model_version, grade, eval_date, mae, rmse, mape, \
                                   directional_accuracy, is_production, created_at";

/// 시계열 관측치, 예측, 성능 기록, 모델 레지스트리를 담는 SQLite 저장소.
///
/// 연결은 Mutex 뒤에 있으므로 `Arc<DBManager>`로 등급별 작업자 간에 공유할 수 있다.
pub struct DBManager {
    conn: Mutex<Connection>,
}

impl DBManager {
    pub fn open(path: impl AsRef<Path>) -> EggrsResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!("🗄️ [DB] 데이터베이스 열기: {}", path.display());
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> EggrsResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> EggrsResult<Self> {
        for statement in SCHEMA {
            conn.execute(statement, ())?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> EggrsResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| EggrsError::database("연결 잠금", e.to_string()))
    }

    // ---- 관측치 upsert ----

    pub fn upsert_price(&self, observation: &Observation) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO egg_prices (date, grade, retail_price, wholesale_price)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date, grade) DO UPDATE SET
                retail_price = excluded.retail_price,
                wholesale_price = excluded.wholesale_price",
            params![
                fmt_date(observation.date),
                observation.grade,
                observation.retail_price,
                observation.wholesale_price
            ],
        )?;
        Ok(())
    }

    pub fn upsert_volume(&self, record: &VolumeRecord) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO trading_volumes (date, volume_kg) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET volume_kg = excluded.volume_kg",
            params![fmt_date(record.date), record.volume_kg],
        )?;
        Ok(())
    }

    pub fn upsert_feed_price(&self, record: &FeedPriceRecord) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO feed_prices (date, feed_type, price) VALUES (?1, ?2, ?3)
             ON CONFLICT(date, feed_type) DO UPDATE SET price = excluded.price",
            params![fmt_date(record.date), record.feed_type, record.price],
        )?;
        Ok(())
    }

    pub fn upsert_exchange_rate(&self, record: &ExchangeRateRecord) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO exchange_rates (date, usd_krw) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET usd_krw = excluded.usd_krw",
            params![fmt_date(record.date), record.usd_krw],
        )?;
        Ok(())
    }

    pub fn upsert_avian_flu(&self, record: &OutbreakRecord) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO avian_flu_status (date, is_outbreak, case_count, region)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(date) DO UPDATE SET
                is_outbreak = excluded.is_outbreak,
                case_count = excluded.case_count,
                region = excluded.region",
            params![
                fmt_date(record.date),
                record.is_outbreak as i64,
                record.case_count,
                record.region
            ],
        )?;
        Ok(())
    }

    pub fn upsert_weather(&self, record: &WeatherRecord) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO weather_data (date, avg_temperature, max_temperature, min_temperature, humidity)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(date) DO UPDATE SET
                avg_temperature = excluded.avg_temperature,
                max_temperature = excluded.max_temperature,
                min_temperature = excluded.min_temperature,
                humidity = excluded.humidity",
            params![
                fmt_date(record.date),
                record.avg_temperature,
                record.max_temperature,
                record.min_temperature,
                record.humidity
            ],
        )?;
        Ok(())
    }

    /// 수집기 응답 하나를 해당 테이블에 저장한다
    pub fn store_signal(&self, payload: &SignalPayload) -> EggrsResult<()> {
        match payload {
            SignalPayload::Volume(record) => self.upsert_volume(record),
            SignalPayload::FeedPrices(records) => records
                .iter()
                .try_for_each(|record| self.upsert_feed_price(record)),
            SignalPayload::ExchangeRate(record) => self.upsert_exchange_rate(record),
            SignalPayload::AvianFlu(record) => self.upsert_avian_flu(record),
            SignalPayload::Weather(record) => self.upsert_weather(record),
        }
    }

    // ---- 이력 조회 ----

    /// 등급의 가격 이력과 같은 기간의 보조 신호를 읽는다.
    /// 보조 신호 테이블에 해당 기간 데이터가 없으면 그 신호는 `None`.
    pub fn fetch_history(&self, grade: &str, since: Option<NaiveDate>) -> EggrsResult<MarketHistory> {
        let conn = self.lock()?;
        let since = since.map(fmt_date).unwrap_or_default();

        let mut stmt = conn.prepare(
            "SELECT date, retail_price, wholesale_price FROM egg_prices
             WHERE grade = ?1 AND retail_price IS NOT NULL AND date >= ?2
             ORDER BY date",
        )?;
        let observations = stmt
            .query_map(params![grade, since], |row| {
                Ok(Observation::new(date_column(row, 0)?, grade, row.get(1)?, row.get(2)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut history = MarketHistory::new(grade, observations);
        let Some(first) = history.observations.first().map(|o| fmt_date(o.date)) else {
            debug!("🗄️ [DB] {} 가격 데이터 없음", grade);
            return Ok(history);
        };

        history.volume = fetch_series(
            &conn,
            "SELECT date, volume_kg FROM trading_volumes WHERE date >= ?1 ORDER BY date",
            params![first],
        )?;
        history.feed_price = fetch_series(
            &conn,
            "SELECT date, price FROM feed_prices WHERE date >= ?1 AND feed_type = ?2 ORDER BY date",
            params![first, CORN_FEED_TYPE],
        )?;
        history.exchange_rate = fetch_series(
            &conn,
            "SELECT date, usd_krw FROM exchange_rates WHERE date >= ?1 ORDER BY date",
            params![first],
        )?;
        history.avian_flu = fetch_series(
            &conn,
            "SELECT date, CAST(is_outbreak AS REAL) FROM avian_flu_status WHERE date >= ?1 ORDER BY date",
            params![first],
        )?;
        history.temperature = fetch_series(
            &conn,
            "SELECT date, avg_temperature FROM weather_data WHERE date >= ?1 ORDER BY date",
            params![first],
        )?;

        debug!(
            "🗄️ [DB] {} 이력 로드: 가격 {}행",
            grade,
            history.observations.len()
        );
        Ok(history)
    }

    /// 소매가가 있는 가장 최근 관측치
    pub fn latest_observation(&self, grade: &str) -> EggrsResult<Option<Observation>> {
        let conn = self.lock()?;
        let observation = conn
            .query_row(
                "SELECT date, retail_price, wholesale_price FROM egg_prices
                 WHERE grade = ?1 AND retail_price IS NOT NULL
                 ORDER BY date DESC LIMIT 1",
                params![grade],
                |row| Ok(Observation::new(date_column(row, 0)?, grade, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        Ok(observation)
    }

    // ---- 예측 ----

    /// 같은 (grade, base_date, horizon) 예측은 교체된다.
    /// 가격과 신뢰구간은 원 단위 소수 첫째 자리로 반올림해 저장한다.
    pub fn insert_predictions(&self, predictions: &[Prediction]) -> EggrsResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for p in predictions {
            tx.execute(
                "DELETE FROM predictions WHERE grade = ?1 AND base_date = ?2 AND horizon_days = ?3",
                params![p.grade, fmt_date(p.base_date), p.horizon_days],
            )?;
            tx.execute(
                "INSERT INTO predictions (base_date, target_date, grade, predicted_price,
                    confidence_lower, confidence_upper, horizon_days, model_version)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    fmt_date(p.base_date),
                    fmt_date(p.target_date),
                    p.grade,
                    round_price(p.predicted_price),
                    round_price(p.confidence_lower),
                    round_price(p.confidence_upper),
                    p.horizon_days,
                    p.model_version
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// 최신 base_date의 예측만 horizon 순으로 반환
    pub fn latest_predictions(&self, grade: &str) -> EggrsResult<Vec<Prediction>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT base_date, target_date, grade, predicted_price, confidence_lower,
                    confidence_upper, horizon_days, model_version
             FROM predictions
             WHERE grade = ?1
               AND base_date = (SELECT MAX(base_date) FROM predictions WHERE grade = ?1)
             ORDER BY horizon_days",
        )?;
        let rows = stmt
            .query_map(params![grade], |row| {
                Ok(Prediction {
                    base_date: date_column(row, 0)?,
                    target_date: date_column(row, 1)?,
                    grade: row.get(2)?,
                    predicted_price: row.get(3)?,
                    confidence_lower: row.get(4)?,
                    confidence_upper: row.get(5)?,
                    horizon_days: row.get(6)?,
                    model_version: row.get(7)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    // ---- 성능 기록 ----

    /// 비프로덕션 성능 기록 추가. 새 레코드 id를 반환한다.
    pub fn insert_performance(
        &self,
        grade: &str,
        version: &str,
        eval_date: NaiveDate,
        metrics: &Metrics,
    ) -> EggrsResult<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO model_performance (model_version, grade, eval_date, mae, rmse, mape,
                directional_accuracy, is_production)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
            params![
                version,
                grade,
                fmt_date(eval_date),
                metrics.mae,
                metrics.rmse,
                metrics.mape,
                metrics.directional_accuracy
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 프로덕션 모델의 새 평가를 프로덕션 기록으로 남긴다.
    /// 기존 프로덕션 기록 강등과 새 기록 삽입은 한 트랜잭션이다.
    pub fn record_production_evaluation(
        &self,
        grade: &str,
        version: &str,
        eval_date: NaiveDate,
        metrics: &Metrics,
    ) -> EggrsResult<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "UPDATE model_performance SET is_production = 0 WHERE grade = ?1 AND is_production = 1",
            params![grade],
        )?;
        tx.execute(
            "INSERT INTO model_performance (model_version, grade, eval_date, mae, rmse, mape,
                directional_accuracy, is_production)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
            params![
                version,
                grade,
                fmt_date(eval_date),
                metrics.mae,
                metrics.rmse,
                metrics.mape,
                metrics.directional_accuracy
            ],
        )?;
        let id = tx.last_insert_rowid();
        mark_registry_production(&tx, grade, version)?;
        tx.commit()?;
        Ok(id)
    }

    pub fn production_record(&self, grade: &str) -> EggrsResult<Option<PerformanceRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!(
                    "SELECT {} FROM model_performance
                     WHERE grade = ?1 AND is_production = 1
                     ORDER BY id DESC LIMIT 1",
                    PERFORMANCE_COLUMNS
                ),
                params![grade],
                performance_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// 등급의 전체 성능 기록 (오래된 순)
    pub fn performance_records(&self, grade: &str) -> EggrsResult<Vec<PerformanceRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM model_performance WHERE grade = ?1 ORDER BY id",
            PERFORMANCE_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![grade], performance_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// 원자적 승격: 등급의 프로덕션 기록을 모두 강등하고, 해당 버전의
    /// 가장 최근 성능 기록과 레지스트리 항목을 프로덕션으로 표시한다.
    /// 버전의 성능 기록이 없으면 아무것도 바꾸지 않고 실패한다.
    pub fn promote(&self, grade: &str, version: &str) -> EggrsResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let target: Option<i64> = tx
            .query_row(
                "SELECT id FROM model_performance
                 WHERE grade = ?1 AND model_version = ?2
                 ORDER BY id DESC LIMIT 1",
                params![grade, version],
                |row| row.get(0),
            )
            .optional()?;
        let Some(record_id) = target else {
            // tx drop 시 롤백
            return Err(EggrsError::promotion(grade, version, "해당 버전의 성능 기록이 없습니다"));
        };

        tx.execute(
            "UPDATE model_performance SET is_production = 0 WHERE grade = ?1 AND is_production = 1",
            params![grade],
        )?;
        tx.execute(
            "UPDATE model_performance SET is_production = 1 WHERE id = ?1",
            params![record_id],
        )?;
        mark_registry_production(&tx, grade, version)?;
        tx.commit()?;

        info!("🏆 [DB] {} 프로덕션 모델 변경: {} (기록 #{})", grade, version, record_id);
        Ok(())
    }

    // ---- 모델 레지스트리 ----

    /// 학습이 끝난 버전을 등록한다 (이미 있으면 학습일만 갱신)
    pub fn register_model(&self, grade: &str, version: &str, train_date: NaiveDate) -> EggrsResult<()> {
        self.lock()?.execute(
            "INSERT INTO model_registry (grade, version, train_date, is_production)
             VALUES (?1, ?2, ?3, 0)
             ON CONFLICT(grade, version) DO UPDATE SET train_date = excluded.train_date",
            params![grade, version, fmt_date(train_date)],
        )?;
        Ok(())
    }

    pub fn production_version(&self, grade: &str) -> EggrsResult<Option<String>> {
        let conn = self.lock()?;
        let version = conn
            .query_row(
                "SELECT version FROM model_registry WHERE grade = ?1 AND is_production = 1",
                params![grade],
                |row| row.get(0),
            )
            .optional()?;
        Ok(version)
    }

    pub fn model_entry(&self, grade: &str, version: &str) -> EggrsResult<Option<ModelVersionEntry>> {
        let conn = self.lock()?;
        let entry = conn
            .query_row(
                "SELECT grade, version, created_at, train_date, is_production
                 FROM model_registry WHERE grade = ?1 AND version = ?2",
                params![grade, version],
                registry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn model_versions(&self, grade: &str) -> EggrsResult<Vec<ModelVersionEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT grade, version, created_at, train_date, is_production
             FROM model_registry WHERE grade = ?1 ORDER BY created_at, version",
        )?;
        let entries = stmt
            .query_map(params![grade], registry_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

fn registry_from_row(row: &Row<'_>) -> rusqlite::Result<ModelVersionEntry> {
    Ok(ModelVersionEntry {
        grade: row.get(0)?,
        version: row.get(1)?,
        created_at: datetime_column(row, 2)?,
        train_date: opt_date_column(row, 3)?,
        is_production: row.get::<_, i64>(4)? != 0,
    })
}

fn mark_registry_production(conn: &Connection, grade: &str, version: &str) -> EggrsResult<()> {
    conn.execute(
        "UPDATE model_registry SET is_production = 0 WHERE grade = ?1 AND is_production = 1",
        params![grade],
    )?;
    conn.execute(
        "INSERT INTO model_registry (grade, version, is_production) VALUES (?1, ?2, 1)
         ON CONFLICT(grade, version) DO UPDATE SET is_production = 1",
        params![grade, version],
    )?;
    Ok(())
}

/// 저장용 가격 반올림 (소수 첫째 자리)
fn round_price(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// (date, value) 두 컬럼 쿼리를 시계열로 읽는다. 행이 없으면 None.
fn fetch_series(conn: &Connection, sql: &str, args: &[&dyn ToSql]) -> EggrsResult<Option<Vec<DatedValue>>> {
    let mut stmt = conn.prepare(sql)?;
    let values = stmt
        .query_map(args, |row| Ok(DatedValue::new(date_column(row, 0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(if values.is_empty() { None } else { Some(values) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, day).expect("date")
    }

    fn metrics(mae: f64) -> Metrics {
        Metrics::new(mae, mae * 1.3, 3.0, 70.0)
    }

    fn prediction(base: NaiveDate, horizon: i64, price: f64) -> Prediction {
        Prediction {
            base_date: base,
            target_date: base + chrono::Duration::days(horizon),
            grade: "특란".to_string(),
            predicted_price: price,
            confidence_lower: price - 50.0,
            confidence_upper: price + 50.0,
            horizon_days: horizon,
            model_version: "v1".to_string(),
        }
    }

    #[test]
    fn test_price_upsert_replaces_same_day() {
        let db = DBManager::open_in_memory().expect("db");
        db.upsert_price(&Observation::new(date(1), "특란", Some(6000.0), None))
            .expect("insert");
        db.upsert_price(&Observation::new(date(1), "특란", Some(6100.0), Some(5000.0)))
            .expect("upsert");
        db.upsert_price(&Observation::new(date(2), "특란", None, Some(5000.0)))
            .expect("insert");

        let history = db.fetch_history("특란", None).expect("history");
        assert_eq!(history.observations.len(), 1);
        assert_eq!(history.observations[0].retail_price, Some(6100.0));
        assert_eq!(history.observations[0].wholesale_price, Some(5000.0));
    }

    #[test]
    fn test_history_signals() {
        let db = DBManager::open_in_memory().expect("db");
        for day in 1..=5 {
            db.upsert_price(&Observation::new(date(day), "대란", Some(5800.0), None))
                .expect("price");
        }
        db.store_signal(&SignalPayload::FeedPrices(vec![
            FeedPriceRecord {
                date: date(2),
                feed_type: CORN_FEED_TYPE.to_string(),
                price: 410.0,
            },
            FeedPriceRecord {
                date: date(2),
                feed_type: "대두박".to_string(),
                price: 700.0,
            },
        ]))
        .expect("feed");
        db.store_signal(&SignalPayload::AvianFlu(OutbreakRecord {
            date: date(3),
            is_outbreak: true,
            case_count: 2,
            region: Some("충북".to_string()),
        }))
        .expect("flu");
        // 이력 시작 이전 값은 읽지 않는다
        db.upsert_exchange_rate(&ExchangeRateRecord {
            date: NaiveDate::from_ymd_opt(2025, 4, 30).expect("date"),
            usd_krw: 1380.0,
        })
        .expect("fx");

        let history = db.fetch_history("대란", None).expect("history");
        assert_eq!(history.observations.len(), 5);
        assert_eq!(history.feed_price, Some(vec![DatedValue::new(date(2), Some(410.0))]));
        assert_eq!(history.avian_flu, Some(vec![DatedValue::new(date(3), Some(1.0))]));
        assert_eq!(history.exchange_rate, None);
        assert_eq!(history.volume, None);
        assert_eq!(history.temperature, None);
    }

    #[test]
    fn test_latest_predictions_single_base_date() {
        let db = DBManager::open_in_memory().expect("db");
        db.insert_predictions(&[
            prediction(date(1), 30, 6200.0),
            prediction(date(1), 7, 6000.0),
            prediction(date(1), 14, 6100.0),
        ])
        .expect("insert");
        db.insert_predictions(&[
            prediction(date(2), 14, 6150.0),
            prediction(date(2), 7, 6050.0),
            prediction(date(2), 30, 6250.0),
        ])
        .expect("insert");
        // 같은 기준일 재실행은 교체
        db.insert_predictions(&[prediction(date(2), 7, 6060.0)])
            .expect("insert");

        let latest = db.latest_predictions("특란").expect("latest");
        assert_eq!(latest.len(), 3);
        assert!(latest.iter().all(|p| p.base_date == date(2)));
        let horizons: Vec<i64> = latest.iter().map(|p| p.horizon_days).collect();
        assert_eq!(horizons, vec![7, 14, 30]);
        assert_eq!(latest[0].predicted_price, 6060.0);

        assert!(db.latest_predictions("왕란").expect("latest").is_empty());
    }

    #[test]
    fn test_stored_predictions_are_rounded() {
        let db = DBManager::open_in_memory().expect("db");
        let mut p = prediction(date(3), 7, 6123.456);
        p.confidence_lower = 6001.04;
        p.confidence_upper = 6245.875;
        db.insert_predictions(&[p]).expect("insert");

        let stored = db.latest_predictions("특란").expect("latest");
        assert_eq!(stored[0].predicted_price, 6123.5);
        assert_eq!(stored[0].confidence_lower, 6001.0);
        assert_eq!(stored[0].confidence_upper, 6245.9);
    }

    #[test]
    fn test_promote_single_production() {
        let db = DBManager::open_in_memory().expect("db");
        db.insert_performance("특란", "v1", date(1), &metrics(90.0)).expect("perf");
        db.insert_performance("특란", "v2", date(2), &metrics(80.0)).expect("perf");
        db.insert_performance("대란", "v1", date(2), &metrics(80.0)).expect("perf");

        db.promote("특란", "v1").expect("promote");
        db.promote("대란", "v1").expect("promote");
        db.promote("특란", "v2").expect("promote");

        let production: Vec<PerformanceRecord> = db
            .performance_records("특란")
            .expect("records")
            .into_iter()
            .filter(|r| r.is_production)
            .collect();
        assert_eq!(production.len(), 1);
        assert_eq!(production[0].model_version, "v2");
        assert_eq!(db.production_version("특란").expect("version"), Some("v2".to_string()));

        // 다른 등급은 영향 없음
        assert_eq!(db.production_version("대란").expect("version"), Some("v1".to_string()));
    }

    #[test]
    fn test_promote_unknown_version_keeps_state() {
        let db = DBManager::open_in_memory().expect("db");
        db.insert_performance("특란", "v1", date(1), &metrics(90.0)).expect("perf");
        db.promote("특란", "v1").expect("promote");

        let err = db.promote("특란", "v9").unwrap_err();
        assert!(matches!(err, EggrsError::Promotion { .. }));

        let record = db.production_record("특란").expect("record").expect("exists");
        assert_eq!(record.model_version, "v1");
        assert_eq!(db.production_version("특란").expect("version"), Some("v1".to_string()));
    }

    #[test]
    fn test_promote_marks_latest_record_of_version() {
        let db = DBManager::open_in_memory().expect("db");
        db.insert_performance("특란", "v1", date(1), &metrics(90.0)).expect("perf");
        let latest = db.insert_performance("특란", "v1", date(3), &metrics(70.0)).expect("perf");
        db.promote("특란", "v1").expect("promote");
        let record = db.production_record("특란").expect("record").expect("exists");
        assert_eq!(record.id, latest);
        assert_eq!(record.eval_date, date(3));
    }

    #[test]
    fn test_production_evaluation_keeps_invariant() {
        let db = DBManager::open_in_memory().expect("db");
        db.insert_performance("특란", "v1", date(1), &metrics(90.0)).expect("perf");
        db.promote("특란", "v1").expect("promote");
        db.record_production_evaluation("특란", "v1", date(5), &metrics(95.0))
            .expect("record");

        let records = db.performance_records("특란").expect("records");
        assert_eq!(records.len(), 2);
        assert_eq!(records.iter().filter(|r| r.is_production).count(), 1);
        let production = db.production_record("특란").expect("record").expect("exists");
        assert_eq!(production.eval_date, date(5));
    }

    #[test]
    fn test_registry_entries() {
        let db = DBManager::open_in_memory().expect("db");
        db.register_model("특란", "v20250501", date(1)).expect("register");
        db.register_model("특란", "v20250501", date(2)).expect("register again");
        let entry = db
            .model_entry("특란", "v20250501")
            .expect("entry")
            .expect("exists");
        assert_eq!(entry.train_date, Some(date(2)));
        assert!(!entry.is_production);
        assert_eq!(db.model_versions("특란").expect("versions").len(), 1);
        assert_eq!(db.production_version("특란").expect("version"), None);
    }
}
