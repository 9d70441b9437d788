use std::{sync::Arc, time::Duration};

use chrono::Utc;
use shared::{
    domain::{header_cells, Submission, ROW_WIDTH},
    error::{ErrorKind, IngestError},
    protocol::IngestResponse,
};
use storage::Sheet;
use tracing::{info, warn};

mod lock;

pub use lock::{LockAttempt, LockPolicy, ScriptLock, DEFAULT_LOCK_TIMEOUT};

pub const HEADER_ROW: u64 = 1;

#[derive(Clone)]
pub struct IngestContext {
    pub sheet: Arc<dyn Sheet>,
    pub lock: ScriptLock,
    pub lock_timeout: Duration,
    pub lock_policy: LockPolicy,
}

impl IngestContext {
    pub fn new(sheet: Arc<dyn Sheet>) -> Self {
        Self {
            sheet,
            lock: ScriptLock::new(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            lock_policy: LockPolicy::default(),
        }
    }

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_lock_policy(mut self, lock_policy: LockPolicy) -> Self {
        self.lock_policy = lock_policy;
        self
    }
}

/// Appends one submission to the sheet.
///
/// Never fails: parse and store errors come back as an error response and
/// nothing is written for them.
pub async fn handle(ctx: &IngestContext, raw_body: &[u8]) -> IngestResponse {
    let response = IngestResponse::from(ingest(ctx, raw_body).await);
    match &response {
        IngestResponse::Success { row } => info!(row, "submission stored"),
        IngestResponse::Error { error } => {
            warn!(kind = ?error.kind, error = %error.message, "submission rejected")
        }
    }
    response
}

async fn ingest(ctx: &IngestContext, raw_body: &[u8]) -> Result<u64, IngestError> {
    let mut submission = Submission::parse(raw_body)?;
    submission.normalize_source();

    // Held until this function returns, whichever path it takes.
    let _lock = acquire(ctx).await?;

    let target = ctx.sheet.last_row().await.map_err(store_error)? + 1;
    let row = submission.to_row(Utc::now());
    ctx.sheet
        .write_row(target, row.cells())
        .await
        .map_err(store_error)?;
    Ok(target)
}

async fn acquire(ctx: &IngestContext) -> Result<LockAttempt, IngestError> {
    let attempt = ctx.lock.try_lock_for(ctx.lock_timeout).await;
    if attempt.acquired() {
        return Ok(attempt);
    }

    let timeout_ms = ctx.lock_timeout.as_millis();
    match ctx.lock_policy {
        LockPolicy::BestEffort => {
            warn!(timeout_ms, "store lock not acquired, writing without it");
            Ok(attempt)
        }
        LockPolicy::Strict => Err(IngestError::new(
            ErrorKind::LockTimeout,
            format!("store lock not acquired within {timeout_ms} ms"),
        )),
    }
}

/// Overwrites row 1 with the column titles. Run once before the first submission.
pub async fn initialize_headers(ctx: &IngestContext) -> Result<(), IngestError> {
    ctx.sheet
        .write_row(HEADER_ROW, &header_cells())
        .await
        .map_err(store_error)?;
    info!(columns = ROW_WIDTH, "header row initialized");
    Ok(())
}

fn store_error(err: anyhow::Error) -> IngestError {
    IngestError::store(format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
