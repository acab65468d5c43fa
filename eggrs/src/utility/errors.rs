use thiserror::Error;

/// eggrs 시스템의 모든 오류 타입을 정의하는 enum
/// 각 오류는 구체적인 컨텍스트 정보를 포함하여 디버깅과 운영 판단을 돕는다
#[derive(Error, Debug)]
pub enum EggrsError {
    /// 윈도우 생성/학습에 필요한 이력이 부족함 (데이터가 더 쌓이면 복구됨)
    #[error("데이터 부족: {grade} - 필요 {required}행, 보유 {available}행 ({context})")]
    InsufficientData {
        grade: String,
        required: usize,
        available: usize,
        context: String,
    },

    /// 체크포인트 또는 스케일러 아티팩트 없음 (학습으로 복구 가능)
    #[error("모델 없음: {grade} {version} ({artifact})")]
    ModelNotFound {
        grade: String,
        version: String,
        artifact: String,
    },

    /// fit 이전에 스케일러를 사용함 (호출 순서 위반)
    #[error("스케일러가 학습되지 않았습니다: {component}")]
    NotFitted { component: String },

    /// 아티팩트 파일이 손상되었거나 형식이 맞지 않음
    #[error("아티팩트 손상: {path} - {reason}")]
    ArtifactCorrupted { path: String, reason: String },

    /// 프로덕션 승격 실패 (기존 프로덕션 상태는 유지됨)
    #[error("승격 실패: {grade} {version} - {reason}")]
    Promotion {
        grade: String,
        version: String,
        reason: String,
    },

    /// 데이터베이스 관련 오류
    #[error("데이터베이스 오류: {operation} - {reason}")]
    Database { operation: String, reason: String },

    /// 설정 관련 오류 (config.rs의 ConfigError와 연동)
    #[error("설정 오류: {0}")]
    Config(#[from] crate::utility::config::ConfigError),

    /// 일반적인 I/O 오류
    #[error("I/O 오류: {operation} - {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 직렬화/역직렬화 오류
    #[error("직렬화 오류: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 유효성 검증 오류
    #[error("유효성 검증 실패: {field} - {reason}")]
    Validation { field: String, reason: String },

    /// 학습이 외부 요청으로 중단됨
    #[error("학습 중단: {grade} {version} ({epochs_completed} epoch 완료)")]
    Cancelled {
        grade: String,
        version: String,
        epochs_completed: usize,
    },

    /// 일반적인 오류 (기타)
    #[error("오류: {message}")]
    General { message: String },
}

/// eggrs에서 사용하는 Result 타입 별칭
pub type EggrsResult<T> = Result<T, EggrsError>;

impl EggrsError {
    /// 데이터 부족 오류를 간편하게 생성하는 헬퍼 함수
    pub fn insufficient_data(
        grade: impl Into<String>,
        required: usize,
        available: usize,
        context: impl Into<String>,
    ) -> Self {
        Self::InsufficientData {
            grade: grade.into(),
            required,
            available,
            context: context.into(),
        }
    }

    /// 모델 없음 오류를 간편하게 생성하는 헬퍼 함수
    pub fn model_not_found(
        grade: impl Into<String>,
        version: impl Into<String>,
        artifact: impl Into<String>,
    ) -> Self {
        Self::ModelNotFound {
            grade: grade.into(),
            version: version.into(),
            artifact: artifact.into(),
        }
    }

    pub fn not_fitted(component: impl Into<String>) -> Self {
        Self::NotFitted {
            component: component.into(),
        }
    }

    /// 아티팩트 손상 오류를 간편하게 생성하는 헬퍼 함수
    pub fn artifact_corrupted(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ArtifactCorrupted {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn promotion(
        grade: impl Into<String>,
        version: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Promotion {
            grade: grade.into(),
            version: version.into(),
            reason: reason.into(),
        }
    }

    /// 데이터베이스 오류를 간편하게 생성하는 헬퍼 함수
    pub fn database(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 일반적인 오류를 생성하는 헬퍼 함수
    pub fn general(message: impl Into<String>) -> Self {
        EggrsError::General {
            message: message.into(),
        }
    }

    /// 호출자가 기다리거나 재학습으로 회복할 수 있는 오류인지 여부
    /// NotFitted/아티팩트 손상은 호출 계약 위반이므로 복구 대상이 아니다
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EggrsError::InsufficientData { .. }
                | EggrsError::ModelNotFound { .. }
                | EggrsError::Cancelled { .. }
        )
    }
}

/// Rusqlite 데이터베이스 오류를 EggrsError로 변환
impl From<rusqlite::Error> for EggrsError {
    fn from(error: rusqlite::Error) -> Self {
        let operation = match &error {
            rusqlite::Error::SqliteFailure(_, _) => "SQL 실행",
            rusqlite::Error::QueryReturnedNoRows => "조회 결과 없음",
            rusqlite::Error::InvalidParameterName(_) => "매개변수 검증",
            rusqlite::Error::InvalidPath(_) => "경로 확인",
            rusqlite::Error::InvalidColumnIndex(_) => "컬럼 인덱스",
            rusqlite::Error::InvalidColumnName(_) => "컬럼 이름",
            rusqlite::Error::InvalidColumnType(_, _, _) => "컬럼 타입",
            _ => "데이터베이스 작업",
        };

        EggrsError::Database {
            operation: operation.to_string(),
            reason: error.to_string(),
        }
    }
}

/// std::io::Error를 EggrsError로 변환
impl From<std::io::Error> for EggrsError {
    fn from(error: std::io::Error) -> Self {
        EggrsError::Io {
            operation: "파일 I/O".to_string(),
            source: error,
        }
    }
}

/// ndarray shape 오류를 EggrsError로 변환
impl From<ndarray::ShapeError> for EggrsError {
    fn from(error: ndarray::ShapeError) -> Self {
        EggrsError::General {
            message: format!("배열 shape 오류: {}", error),
        }
    }
}
