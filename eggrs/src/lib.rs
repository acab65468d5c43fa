use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// tracing 초기화 함수
/// RUST_LOG가 있으면 그것을, 없으면 설정 파일의 레벨을 필터로 쓴다.
pub fn init_tracing(level: &str) -> Result<(), String> {
    // 기존 log! 매크로 호환
    LogTracer::init().map_err(|e| {
        eprintln!("Failed to set LogTracer: {}", e);
        format!("로그 시스템 초기화 실패: {}", e)
    })?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| format!("로그 레벨 파싱 실패 ({}): {}", level, e))?;

    // JSON 구조화 로그 + 함수명/모듈명 포함
    let subscriber = Registry::default().with(filter).with(
        fmt::layer()
            .json()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true),
    );

    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        eprintln!("Failed to set tracing subscriber: {}", e);
        format!("로그 시스템 초기화 실패: {}", e)
    })?;

    Ok(())
}

pub mod artifacts;
pub mod collector;
pub mod db_manager;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod time;
pub mod utility;

#[cfg(test)]
pub mod test_support;
