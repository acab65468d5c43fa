use chrono::{Duration, Local, NaiveDate};

/// 오늘 날짜를 알려주는 시계. 전역 상태 대신 각 컴포넌트에 주입된다.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;

    /// `v{YYYYMMDD}` 형식의 새 모델 버전 태그
    fn version_tag(&self) -> String {
        format!("v{}", self.today().format("%Y%m%d"))
    }

    /// `since` 이후 경과 일수
    fn days_since(&self, since: NaiveDate) -> i64 {
        (self.today() - since).num_days()
    }
}

/// 로컬 시간대의 실제 날짜
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// 고정 날짜 시계 (테스트, 과거 시점 재실행)
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    date: NaiveDate,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn advanced(&self, days: i64) -> Self {
        Self {
            date: self.date + Duration::days(days),
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.date
    }
}
