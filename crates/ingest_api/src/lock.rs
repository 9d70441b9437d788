use std::{str::FromStr, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard};

pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// What to do when the lock cannot be taken within the timeout.
///
/// `BestEffort` carries on and writes anyway, so two contended submissions can
/// pick the same target row. `Strict` refuses the write instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockPolicy {
    #[default]
    BestEffort,
    Strict,
}

impl FromStr for LockPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(Self::BestEffort),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown lock policy '{other}'")),
        }
    }
}

/// Store-wide lock shared by every ingest request of the process.
#[derive(Debug, Clone, Default)]
pub struct ScriptLock {
    inner: Arc<Mutex<()>>,
}

impl ScriptLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits up to `timeout` for the lock. The returned attempt releases it when dropped.
    pub async fn try_lock_for(&self, timeout: Duration) -> LockAttempt {
        let guard = tokio::time::timeout(timeout, self.inner.clone().lock_owned())
            .await
            .ok();
        LockAttempt { guard }
    }

    pub fn is_held(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

#[derive(Debug)]
pub struct LockAttempt {
    guard: Option<OwnedMutexGuard<()>>,
}

impl LockAttempt {
    pub fn acquired(&self) -> bool {
        self.guard.is_some()
    }
}
