//! Filesystem repository for T-learner artefacts.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::info;

use crate::common::config::AppCfg;
use crate::common::error::{UpliftError, UpliftResult};
use crate::inference::domain::Arm;

use super::domain::{EstimatorArtefact, ModelRepo};

/// Stores one JSON artefact per arm under `model_dir`.
pub struct FsModelRepo {
    root: PathBuf,
}

impl FsModelRepo {
    pub fn new(cfg: &AppCfg) -> Self {
        Self::at(cfg.model_dir.clone())
    }

    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `t_learner_<arm>.json` under the model directory.
    pub fn artefact_path(&self, arm: Arm) -> PathBuf {
        self.root.join(format!("t_learner_{}.json", arm.as_str()))
    }
}

impl ModelRepo for FsModelRepo {
    fn put_artefact(&self, artefact: &EstimatorArtefact) -> UpliftResult<()> {
        artefact.validate()?;
        fs::create_dir_all(&self.root)?;
        let path = self.artefact_path(artefact.arm);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        serde_json::to_writer_pretty(&mut file, artefact)?;
        file.write_all(b"\n")?;
        info!(arm = %artefact.arm, version = %artefact.version, path = %path.display(), "model artefact saved");
        Ok(())
    }

    fn get_artefact(&self, arm: Arm) -> UpliftResult<EstimatorArtefact> {
        let path = self.artefact_path(arm);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(UpliftError::ModelMissing(path.display().to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        let artefact: EstimatorArtefact = serde_json::from_str(&raw)?;
        if artefact.arm != arm {
            return Err(UpliftError::invalid_config(format!(
                "{} holds a {} artefact",
                path.display(),
                artefact.arm
            )));
        }
        artefact.validate()?;
        Ok(artefact)
    }
}
