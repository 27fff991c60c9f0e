//! Checkpoint manager for automatic rotation and best model tracking.

use super::state::Checkpointable;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for checkpoint management.
#[derive(Clone, Debug)]
pub struct CheckpointConfig {
    /// Directory to store checkpoints
    pub checkpoint_dir: PathBuf,
    /// Save checkpoint every N updates
    pub save_every: u64,
    /// Keep only the last N checkpoints (0 = keep all)
    pub keep_last: usize,
    /// Also save a "best" checkpoint based on mean return
    pub save_best: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("checkpoints"),
            save_every: 10,
            keep_last: 5,
            save_best: true,
        }
    }
}

impl CheckpointConfig {
    /// Create a new config with the given directory.
    pub fn new(checkpoint_dir: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            ..Default::default()
        }
    }

    /// Set save frequency.
    pub fn save_every(mut self, updates: u64) -> Self {
        self.save_every = updates;
        self
    }

    /// Set number of checkpoints to keep.
    pub fn keep_last(mut self, n: usize) -> Self {
        self.keep_last = n;
        self
    }

    /// Enable/disable best checkpoint tracking.
    pub fn save_best(mut self, enabled: bool) -> Self {
        self.save_best = enabled;
        self
    }
}

/// Manages checkpoint lifecycle.
///
/// Handles saving, loading, rotation, and best checkpoint tracking.
pub struct CheckpointManager {
    config: CheckpointConfig,
    best_return: f64,
}

impl CheckpointManager {
    /// Create a new checkpoint manager.
    pub fn new(config: CheckpointConfig) -> Self {
        if let Err(e) = fs::create_dir_all(&config.checkpoint_dir) {
            tracing::warn!("Failed to create checkpoint directory: {}", e);
        }

        Self {
            config,
            best_return: f64::NEG_INFINITY,
        }
    }

    /// Get the checkpoint directory path.
    pub fn checkpoint_dir(&self) -> &Path {
        &self.config.checkpoint_dir
    }

    /// Save a checkpoint if the update count is divisible by `save_every`.
    ///
    /// Returns the path to the saved checkpoint, or None if no save was performed.
    pub fn maybe_save<T: Checkpointable>(
        &mut self,
        trainable: &T,
        update: u64,
        mean_return: f64,
    ) -> Result<Option<PathBuf>> {
        if update == 0 || update % self.config.save_every != 0 {
            return Ok(None);
        }

        self.save(trainable, update, mean_return)
    }

    /// Force save a checkpoint regardless of update count.
    pub fn save<T: Checkpointable>(
        &mut self,
        trainable: &T,
        update: u64,
        mean_return: f64,
    ) -> Result<Option<PathBuf>> {
        let data = trainable.save_state()?;

        let filename = format!("checkpoint_update_{:06}.bin", update);
        let path = self.config.checkpoint_dir.join(&filename);

        fs::write(&path, &data)?;
        tracing::info!(path = %path.display(), update, "Saved checkpoint");

        if self.config.save_best && mean_return > self.best_return {
            self.best_return = mean_return;
            let best_path = self.config.checkpoint_dir.join("checkpoint_best.bin");
            fs::copy(&path, &best_path)?;
            tracing::info!(mean_return, "New best checkpoint");
        }

        if self.config.keep_last > 0 {
            self.cleanup_old_checkpoints()?;
        }

        Ok(Some(path))
    }

    /// Load the latest checkpoint.
    ///
    /// Returns the update count if a checkpoint was loaded, or None if no checkpoints exist.
    pub fn load_latest<T: Checkpointable>(&self, trainable: &mut T) -> Result<Option<u64>> {
        let mut checkpoints = self.list_checkpoints()?;

        if let Some(path) = checkpoints.pop() {
            let data = fs::read(&path)?;
            trainable.load_state(&data)?;

            let update = self.extract_update_from_path(&path);
            tracing::info!(path = %path.display(), update, "Loaded checkpoint");

            Ok(Some(update))
        } else {
            Ok(None)
        }
    }

    /// Load the best checkpoint.
    ///
    /// Returns true if the best checkpoint was loaded, false if it doesn't exist.
    pub fn load_best<T: Checkpointable>(&self, trainable: &mut T) -> Result<bool> {
        let best_path = self.config.checkpoint_dir.join("checkpoint_best.bin");

        if best_path.exists() {
            let data = fs::read(&best_path)?;
            trainable.load_state(&data)?;
            tracing::info!("Loaded best checkpoint");
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// List all checkpoint files in order.
    pub fn list_checkpoints(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.config.checkpoint_dir) {
            Ok(e) => e,
            Err(_) => return Ok(Vec::new()),
        };

        let mut checkpoints: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("checkpoint_update_") && n.ends_with(".bin"))
                    .unwrap_or(false)
            })
            .collect();

        checkpoints.sort();
        Ok(checkpoints)
    }

    /// Remove old checkpoints, keeping only the last N.
    fn cleanup_old_checkpoints(&self) -> Result<()> {
        let mut checkpoints = self.list_checkpoints()?;

        while checkpoints.len() > self.config.keep_last {
            let old = checkpoints.remove(0);
            if let Err(e) = fs::remove_file(&old) {
                tracing::warn!(path = %old.display(), "Failed to remove old checkpoint: {}", e);
            } else {
                tracing::debug!(path = %old.display(), "Removed old checkpoint");
            }
        }

        Ok(())
    }

    /// Extract update count from checkpoint filename.
    fn extract_update_from_path(&self, path: &Path) -> u64 {
        path.file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix("checkpoint_update_"))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    }
}
