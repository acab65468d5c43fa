use clap::{Parser, Subcommand};
use eggrs::{
    init_tracing,
    lifecycle::CheckOutcome,
    service::ForecastService,
    utility::config::Config,
    utility::errors::{EggrsError, EggrsResult},
    utility::types::EvaluationOutcome,
};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "eggrs")]
#[command(about = "Egg price forecasting with LSTM models")]
struct Args {
    /// 설정 파일 경로 (기본값: config.toml)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 등급별 모델 학습
    Train {
        #[arg(short, long, required_unless_present = "all")]
        grade: Option<String>,
        /// 모델 버전 (기본값: v{YYYYMMDD})
        #[arg(short, long)]
        version: Option<String>,
        /// 설정된 모든 등급 학습
        #[arg(long)]
        all: bool,
    },
    /// 7/14/30일 예측 (버전 미지정 시 프로덕션 모델)
    Predict {
        #[arg(short, long)]
        grade: String,
        #[arg(short, long)]
        version: Option<String>,
        /// 예측 결과를 DB에 저장
        #[arg(long)]
        store: bool,
    },
    /// 최근 구간 성능 평가
    Evaluate {
        #[arg(short, long)]
        grade: String,
        #[arg(short, long)]
        version: String,
        /// 평가 일수 (기본값: 설정 파일의 eval_days)
        #[arg(long)]
        days: Option<usize>,
    },
    /// 후보 모델과 프로덕션 모델 A/B 비교
    Compare {
        #[arg(short, long)]
        grade: String,
        #[arg(short, long)]
        version: String,
    },
    /// 프로덕션 승격
    Promote {
        #[arg(short, long)]
        grade: String,
        #[arg(short, long)]
        version: String,
    },
    /// 재학습 필요 여부 점검 및 자동 재학습
    Check {
        #[arg(short, long, required_unless_present = "all")]
        grade: Option<String>,
        #[arg(long)]
        all: bool,
    },
    /// 저장된 예측 요약
    Forecast {
        #[arg(short, long)]
        grade: String,
    },
}

fn main() -> EggrsResult<()> {
    let args = Args::parse();

    let config = Config::load_from_file(&args.config)?;
    init_tracing(&config.logging.level)
        .map_err(|e| EggrsError::general(format!("로그 시스템 초기화 실패: {}", e)))?;

    info!("🚀 eggrs 시작!");
    info!("📁 설정 파일: {}", args.config);

    let service = ForecastService::from_config(&config)?;

    match args.command {
        Command::Train { grade, version, all } => {
            if all {
                let reports = sweep(&service, "학습", |grade| {
                    service.lifecycle().train(grade, version.as_deref()).map(|r| {
                        info!("✅ {} {} 학습 완료 ({})", r.grade, r.model_version, r.metrics);
                    })
                })?;
                info!("🏁 전체 학습 완료: {}/{} 등급", reports, service.grades().len());
            } else if let Some(grade) = grade {
                let report = service.lifecycle().train(&grade, version.as_deref())?;
                print_json(&report)?;
            }
        }
        Command::Predict { grade, version, store } => {
            let predictions = if store {
                if version.is_some() {
                    warn!("⚠️ --store는 프로덕션 모델로만 저장합니다. --version 무시");
                }
                service.run_predictions(&grade)?
            } else {
                service.predict(&grade, version.as_deref())?
            };
            print_json(&predictions)?;
        }
        Command::Evaluate { grade, version, days } => {
            let days = days.unwrap_or(config.lifecycle.eval_days);
            match service.lifecycle().evaluate(&grade, &version, days)? {
                EvaluationOutcome::Scored(metrics) => print_json(&metrics)?,
                EvaluationOutcome::Skipped(reason) => {
                    warn!("⚠️ 평가 건너뜀: {}", reason);
                }
            }
        }
        Command::Compare { grade, version } => {
            let result = service.lifecycle().compare(&grade, &version)?;
            print_json(&result)?;
        }
        Command::Promote { grade, version } => {
            service.lifecycle().promote(&grade, &version)?;
            info!("🏆 {} {} 프로덕션 승격 완료", grade, version);
        }
        Command::Check { grade, all } => {
            if all {
                let checked = sweep(&service, "점검", |grade| {
                    service.lifecycle().check_and_retrain(grade).map(|o| log_outcome(grade, &o))
                })?;
                info!("🏁 전체 점검 완료: {}/{} 등급", checked, service.grades().len());
            } else if let Some(grade) = grade {
                let outcome = service.lifecycle().check_and_retrain(&grade)?;
                log_outcome(&grade, &outcome);
            }
        }
        Command::Forecast { grade } => match service.forecast_summary(&grade)? {
            Some(summary) => print_json(&summary)?,
            None => warn!("⚠️ {} 예측 데이터가 없습니다", grade),
        },
    }

    info!("🏁 eggrs 종료");
    Ok(())
}

/// 설정된 모든 등급에 `task`를 병렬 실행한다. 실패한 등급은 로그만 남긴다.
/// 성공한 등급 수를 돌려준다.
fn sweep<F>(service: &ForecastService, label: &str, task: F) -> EggrsResult<usize>
where
    F: Fn(&str) -> EggrsResult<()> + Sync,
{
    let grades = service.grades();
    let pb = ProgressBar::new(grades.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| EggrsError::general(format!("진행률 표시 설정 실패: {}", e)))?
            .progress_chars("#>-"),
    );
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let succeeded = grades
        .par_iter()
        .filter(|grade| {
            pb.set_message(format!("{} {} 중", grade, label));
            let ok = match task(grade) {
                Ok(()) => true,
                Err(e) => {
                    error!("❌ {} {} 실패: {}", grade, label, e);
                    false
                }
            };
            pb.inc(1);
            ok
        })
        .count();

    pb.finish_with_message(format!("{} 완료!", label));
    Ok(succeeded)
}

fn log_outcome(grade: &str, outcome: &CheckOutcome) {
    match outcome {
        CheckOutcome::Healthy {
            version,
            metrics,
            days_since_train,
        } => info!(
            "✅ {} {} 유지 ({}, 학습 후 {}일)",
            grade, version, metrics, days_since_train
        ),
        CheckOutcome::Retrained {
            reason,
            comparison,
            promoted,
        } => info!(
            "🔁 {} 재학습 ({:?}): 후보 {} → {}",
            grade,
            reason,
            comparison.candidate_version,
            if *promoted { "승격" } else { "현재 모델 유지" }
        ),
        CheckOutcome::RetrainSkipped { reason, cause } => {
            warn!("⚠️ {} 재학습 필요({:?})하지만 건너뜀: {}", grade, reason, cause)
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> EggrsResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
