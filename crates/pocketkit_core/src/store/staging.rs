//! Staged changes and their transactional application.

use crate::db::DbResult;
use crate::model::{Record, RecordId, Value};
use log::warn;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, TransactionBehavior};

#[derive(Debug, Clone)]
pub(crate) enum StagedChange {
    Insert(Record),
    Update {
        entity: &'static str,
        id: RecordId,
        changes: Vec<(&'static str, Value)>,
    },
    Delete {
        entity: &'static str,
        id: RecordId,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CommitReport {
    pub applied: usize,
    /// Updates/deletes whose target no longer exists.
    pub skipped: usize,
}

/// Applies `changes` in order inside one immediate transaction.
///
/// Deferred foreign keys are checked at `COMMIT`, so a child may be staged
/// before its parent within the same batch.
pub(crate) fn apply_staged(
    conn: &mut Connection,
    changes: &[StagedChange],
) -> DbResult<CommitReport> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut report = CommitReport::default();

    for change in changes {
        match change {
            StagedChange::Insert(record) => {
                let mut columns = vec!["id".to_string()];
                let mut binds = vec![SqlValue::Text(record.id().to_string())];
                for (name, value) in record.fields() {
                    columns.push(format!("\"{name}\""));
                    binds.push(value.to_sql());
                }
                let placeholders = vec!["?"; columns.len()].join(", ");
                tx.execute(
                    &format!(
                        "INSERT INTO \"{}\" ({}) VALUES ({placeholders});",
                        record.entity(),
                        columns.join(", ")
                    ),
                    params_from_iter(binds),
                )?;
                report.applied += 1;
            }
            StagedChange::Update {
                entity,
                id,
                changes,
            } => {
                let assignments = changes
                    .iter()
                    .map(|(name, _)| format!("\"{name}\" = ?"))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut binds = changes
                    .iter()
                    .map(|(_, value)| value.to_sql())
                    .collect::<Vec<_>>();
                binds.push(SqlValue::Text(id.to_string()));
                let changed = tx.execute(
                    &format!("UPDATE \"{entity}\" SET {assignments} WHERE id = ?;"),
                    params_from_iter(binds),
                )?;
                record_outcome(&mut report, changed, "update", entity, *id);
            }
            StagedChange::Delete { entity, id } => {
                let changed = tx.execute(
                    &format!("DELETE FROM \"{entity}\" WHERE id = ?1;"),
                    [id.to_string()],
                )?;
                record_outcome(&mut report, changed, "delete", entity, *id);
            }
        }
    }

    tx.commit()?;
    Ok(report)
}

fn record_outcome(
    report: &mut CommitReport,
    changed: usize,
    op: &str,
    entity: &str,
    id: RecordId,
) {
    if changed == 0 {
        report.skipped += 1;
        warn!(
            "event=store_commit module=store status=skip reason=not_found op={} entity={} id={}",
            op, entity, id
        );
    } else {
        report.applied += 1;
    }
}
