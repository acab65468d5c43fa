use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::model::network::{CheckpointDocument, ForecastNetwork};
use crate::model::scaler::{PriceScaler, ScalerDocument};
use crate::utility::errors::{EggrsError, EggrsResult};
use crate::utility::types::TrainingReport;

/// (grade, version)별 체크포인트/스케일러/학습 보고서 저장소.
///
/// 쓰기는 원자적이어야 한다: 동시에 읽는 쪽은 완성된 파일 또는 이전 파일만 본다.
pub trait ArtifactStore: Send + Sync {
    fn save_checkpoint(&self, grade: &str, version: &str, network: &ForecastNetwork) -> EggrsResult<()>;

    /// 없으면 `ModelNotFound`
    fn load_checkpoint(&self, grade: &str, version: &str) -> EggrsResult<ForecastNetwork>;

    fn save_scaler(&self, grade: &str, version: &str, scaler: &PriceScaler) -> EggrsResult<()>;

    /// 없으면 `ModelNotFound`
    fn load_scaler(&self, grade: &str, version: &str) -> EggrsResult<PriceScaler>;

    fn save_report(&self, report: &TrainingReport) -> EggrsResult<()>;

    /// 보고서가 없으면 `Ok(None)`
    fn load_report(&self, grade: &str, version: &str) -> EggrsResult<Option<TrainingReport>>;

    /// 체크포인트와 스케일러를 같은 버전 태그로 함께 저장한다
    fn save_model(
        &self,
        grade: &str,
        version: &str,
        network: &ForecastNetwork,
        scaler: &PriceScaler,
    ) -> EggrsResult<()> {
        self.save_checkpoint(grade, version, network)?;
        self.save_scaler(grade, version, scaler)
    }

    /// 체크포인트와 스케일러를 함께 읽는다
    fn load_model(&self, grade: &str, version: &str) -> EggrsResult<(ForecastNetwork, PriceScaler)> {
        let network = self.load_checkpoint(grade, version)?;
        let scaler = self.load_scaler(grade, version)?;
        Ok((network, scaler))
    }
}

pub fn checkpoint_file_name(grade: &str, version: &str) -> String {
    format!("egg_price_lstm_{}_{}.json", grade, version)
}

pub fn scaler_file_name(grade: &str, version: &str) -> String {
    format!("scaler_{}_{}.json", grade, version)
}

pub fn report_file_name(grade: &str, version: &str) -> String {
    format!("training_report_{}_{}.json", grade, version)
}

/// 디렉토리 하나에 JSON 문서로 저장하는 파일시스템 구현
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> EggrsResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| EggrsError::io(format!("모델 디렉토리 생성 {}", root.display()), e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 임시 파일에 쓴 뒤 rename으로 교체
    fn write_json<T: Serialize>(&self, file_name: &str, value: &T) -> EggrsResult<()> {
        let path = self.root.join(file_name);
        let tmp = NamedTempFile::new_in(&self.root)
            .map_err(|e| EggrsError::io(format!("임시 파일 생성 {}", self.root.display()), e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer
                .flush()
                .map_err(|e| EggrsError::io(format!("임시 파일 쓰기 {}", path.display()), e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| EggrsError::io(format!("임시 파일 동기화 {}", path.display()), e))?;
        tmp.persist(&path)
            .map_err(|e| EggrsError::io(format!("아티팩트 교체 {}", path.display()), e.error))?;

        debug!("💾 [Artifacts] 저장: {}", path.display());
        Ok(())
    }

    /// 파일이 없으면 Ok(None), 파싱 실패는 ArtifactCorrupted
    fn read_json<T: DeserializeOwned>(&self, file_name: &str) -> EggrsResult<Option<T>> {
        let path = self.root.join(file_name);
        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EggrsError::io(format!("아티팩트 읽기 {}", path.display()), e)),
        };
        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|e| EggrsError::artifact_corrupted(path.display().to_string(), e.to_string()))
    }

    fn path_string(&self, file_name: &str) -> String {
        self.root.join(file_name).display().to_string()
    }
}

impl ArtifactStore for FsArtifactStore {
    fn save_checkpoint(&self, grade: &str, version: &str, network: &ForecastNetwork) -> EggrsResult<()> {
        let doc = CheckpointDocument::new(grade, version, network.clone());
        self.write_json(&checkpoint_file_name(grade, version), &doc)
    }

    fn load_checkpoint(&self, grade: &str, version: &str) -> EggrsResult<ForecastNetwork> {
        let file_name = checkpoint_file_name(grade, version);
        let doc: CheckpointDocument = self
            .read_json(&file_name)?
            .ok_or_else(|| EggrsError::model_not_found(grade, version, file_name.clone()))?;
        doc.into_network(&self.path_string(&file_name))
    }

    fn save_scaler(&self, grade: &str, version: &str, scaler: &PriceScaler) -> EggrsResult<()> {
        let doc = scaler.to_document()?;
        self.write_json(&scaler_file_name(grade, version), &doc)
    }

    fn load_scaler(&self, grade: &str, version: &str) -> EggrsResult<PriceScaler> {
        let file_name = scaler_file_name(grade, version);
        let doc: ScalerDocument = self
            .read_json(&file_name)?
            .ok_or_else(|| EggrsError::model_not_found(grade, version, file_name.clone()))?;
        PriceScaler::from_document(doc, &self.path_string(&file_name))
    }

    fn save_report(&self, report: &TrainingReport) -> EggrsResult<()> {
        self.write_json(&report_file_name(&report.grade, &report.model_version), report)
    }

    fn load_report(&self, grade: &str, version: &str) -> EggrsResult<Option<TrainingReport>> {
        self.read_json(&report_file_name(grade, version))
    }
}
