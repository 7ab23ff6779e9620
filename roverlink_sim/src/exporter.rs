//! JSON export of mission runs.

use crate::mission::{MissionReport, RoverOutcome};
use crate::runner::{ScenarioMetrics, ScenarioResult};
use roverlink_core::Position;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Complete mission export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionExport {
    /// Scenario name, or the input path for ad-hoc missions
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Result lines, one per rover
    pub lines: Vec<String>,

    pub rovers: Vec<RoverOutcome>,

    pub scents: Vec<Position>,

    pub metrics: ScenarioMetrics,
}

impl MissionExport {
    /// Creates an export of a finished mission.
    pub fn new(
        scenario: &str,
        seed: u64,
        report: &MissionReport,
        metrics: ScenarioMetrics,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            passed: true,
            failure_reason: None,
            lines: report.lines(),
            rovers: report.outcomes.clone(),
            scents: report.scents.clone(),
            metrics,
        }
    }

    /// Records a verification verdict.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    pub fn to_json(&self) -> Result<String, ExportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), ExportError> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

impl From<&ScenarioResult> for MissionExport {
    fn from(result: &ScenarioResult) -> Self {
        let mut export = Self::new(
            result.scenario.name(),
            result.seed,
            &result.report,
            result.metrics.clone(),
        );
        export.finalize(result.passed, result.failure_reason.clone());
        export
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;

    #[tokio::test]
    async fn test_export_scenario() {
        let result = ScenarioRunner::new(42).run(ScenarioId::Classic).await;
        let export = MissionExport::from(&result);

        assert!(export.passed);
        assert_eq!(export.lines, vec!["1 1 E", "3 3 N LOST", "2 3 S"]);

        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(json["scenario"], "classic");
        assert_eq!(json["rovers"].as_array().unwrap().len(), 3);
        assert_eq!(json["scents"][0]["x"], 3);
        assert!(json.get("failure_reason").is_none());
    }

    #[tokio::test]
    async fn test_write_and_read_back() {
        let result = ScenarioRunner::new(1).run(ScenarioId::ScentGuard).await;
        let export = MissionExport::from(&result);

        let file = format!("roverlink-export-{}.json", std::process::id());
        let path = std::env::temp_dir().join(file);
        let path = path.to_string_lossy().into_owned();
        export.write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let back: MissionExport = serde_json::from_str(&text).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(back.lines, export.lines);
        assert_eq!(back.metrics, export.metrics);
    }

    #[test]
    fn test_write_to_missing_dir_fails() {
        let report = MissionReport::default();
        let export = MissionExport::new("adhoc", 0, &report, ScenarioMetrics::default());
        let err = export
            .write_to_file("/nonexistent-roverlink-dir/out.json")
            .unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
