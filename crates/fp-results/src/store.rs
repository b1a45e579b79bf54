//! Run storage API.

use crate::types::{History, RunManifest, Snapshot};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::PathBuf;

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join("manifest.json").exists()
    }

    pub fn save_run(&self, manifest: &RunManifest, history: &History) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;

        let manifest_path = run_dir.join("manifest.json");
        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(manifest_path, manifest_json)?;

        let snapshots_path = run_dir.join("snapshots.jsonl");
        let mut content = String::new();
        for snapshot in &history.snapshots {
            let line = serde_json::to_string(snapshot)?;
            content.push_str(&line);
            content.push('\n');
        }
        fs::write(snapshots_path, content)?;

        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join("manifest.json");

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    pub fn load_snapshots(&self, run_id: &str) -> ResultsResult<Vec<Snapshot>> {
        let snapshots_path = self.run_dir(run_id).join("snapshots.jsonl");

        if !snapshots_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(snapshots_path)?;
        let mut snapshots = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                let snapshot: Snapshot = serde_json::from_str(line)?;
                snapshots.push(snapshot);
            }
        }

        Ok(snapshots)
    }

    /// Reassemble the saved history of a run.
    pub fn load_history(&self, run_id: &str) -> ResultsResult<History> {
        let manifest = self.load_manifest(run_id)?;
        let snapshots = self.load_snapshots(run_id)?;
        if snapshots.len() != manifest.snapshots {
            return Err(ResultsError::Corrupt {
                run_id: run_id.to_string(),
                what: format!(
                    "manifest lists {} snapshots, found {}",
                    manifest.snapshots,
                    snapshots.len()
                ),
            });
        }
        Ok(History {
            scenario: manifest.scenario,
            seed: manifest.seed,
            snapshots,
            warnings: manifest.warnings,
        })
    }

    pub fn list_runs(&self, model: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.model == model
                {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.run_id.cmp(&b.run_id));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}
