use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::db::models::SecurityLogEntry;
use crate::store::SecurityLogFilter;

pub(crate) const COLUMNS: &str = "\
    id, trainee_id, assessment_id, attempt_id, event_type, severity, \
    activity, ip_address, user_agent, event_timestamp, additional_data, \
    created_at";

pub(crate) async fn insert(
    executor: impl sqlx::PgExecutor<'_>,
    entry: &SecurityLogEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO security_log_entries (
            id, trainee_id, assessment_id, attempt_id, event_type, severity,
            activity, ip_address, user_agent, event_timestamp, additional_data,
            created_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)",
    )
    .bind(&entry.id)
    .bind(&entry.trainee_id)
    .bind(&entry.assessment_id)
    .bind(&entry.attempt_id)
    .bind(entry.event_type)
    .bind(entry.severity)
    .bind(&entry.activity)
    .bind(&entry.ip_address)
    .bind(&entry.user_agent)
    .bind(entry.event_timestamp)
    .bind(&entry.additional_data)
    .bind(entry.created_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list(
    pool: &PgPool,
    filter: &SecurityLogFilter,
) -> Result<Vec<SecurityLogEntry>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(format!(
        "SELECT {COLUMNS} FROM security_log_entries WHERE 1 = 1"
    ));

    if let Some(assessment_id) = &filter.assessment_id {
        builder.push(" AND assessment_id = ");
        builder.push_bind(assessment_id);
    }
    if let Some(trainee_id) = &filter.trainee_id {
        builder.push(" AND trainee_id = ");
        builder.push_bind(trainee_id);
    }
    if let Some(attempt_id) = &filter.attempt_id {
        builder.push(" AND attempt_id = ");
        builder.push_bind(attempt_id);
    }
    if let Some(from) = filter.from {
        builder.push(" AND event_timestamp >= ");
        builder.push_bind(from);
    }
    if let Some(to) = filter.to {
        builder.push(" AND event_timestamp <= ");
        builder.push_bind(to);
    }

    builder.push(" ORDER BY event_timestamp");

    builder.build_query_as::<SecurityLogEntry>().fetch_all(pool).await
}
