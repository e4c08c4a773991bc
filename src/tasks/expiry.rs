//! Expiry watchdog sweep: closes open attempts whose deadline has passed,
//! grading whatever answers were autosaved before the cutoff.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::core::time::primitive_now_utc;
use crate::db::models::AssessmentSnapshot;
use crate::services::attempts;
use crate::store::EngineStore;

const SWEEP_BATCH_SIZE: i64 = 100;

pub(crate) async fn expire_overdue_attempts(store: &dyn EngineStore) -> Result<usize> {
    let now = primitive_now_utc();
    let overdue = store
        .overdue_attempts(now, SWEEP_BATCH_SIZE)
        .await
        .context("Failed to fetch overdue attempts")?;

    let mut snapshots: HashMap<String, AssessmentSnapshot> = HashMap::new();
    let mut closed = 0;

    for attempt in overdue {
        let snapshot = match snapshots.get(&attempt.assessment_id) {
            Some(snapshot) => snapshot.clone(),
            None => {
                let Some(snapshot) = store
                    .assessment_snapshot(&attempt.assessment_id)
                    .await
                    .context("Failed to load assessment for expiry")?
                else {
                    tracing::warn!(
                        assessment_id = %attempt.assessment_id,
                        attempt_id = %attempt.id,
                        "Overdue attempt references a missing assessment"
                    );
                    continue;
                };
                snapshots.insert(attempt.assessment_id.clone(), snapshot.clone());
                snapshot
            }
        };

        // A concurrent submit may settle the attempt first; that is fine.
        if attempts::expire(store, &snapshot, attempt).await?.is_some() {
            closed += 1;
        }
    }

    if closed > 0 {
        tracing::info!(closed_attempts = closed, "Closed expired attempts");
        metrics::counter!("attempts_expired_total").increment(closed as u64);
    }

    Ok(closed)
}
