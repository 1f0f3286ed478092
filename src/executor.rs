/*!
 * Statement execution and result packaging.
 *
 * Every run happens inside an explicit transaction. Reads are rolled back
 * once their rows are collected; confirmed mutating statements are
 * committed only after they succeed.
 *
 * The rollback does not undo statements the engine commits implicitly.
 * On MySQL, `TRUNCATE`, `RENAME TABLE`, `GRANT` and similar statements fall
 * outside the mutating keyword set, run as reads, and commit anyway.
 */

use log::{debug, info, warn};
use serde::Serialize;

use crate::backend::{Backend, ResultSet};
use crate::errors::ExecutionError;
use crate::safety::StatementClass;
use crate::translator::GeneratedStatement;

/// Successful outcome of [`run`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All rows of a read-only statement, possibly none
    Rows(ResultSet),
    /// A mutating statement was executed and committed
    Applied { rows_affected: u64 },
    /// A mutating statement is waiting for the caller to confirm it
    AwaitingConfirmation,
}

impl RunOutcome {
    /// Rows, if this outcome carries any
    pub fn rows(&self) -> Option<&ResultSet> {
        match self {
            Self::Rows(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, Self::AwaitingConfirmation)
    }
}

/// Run a statement against the backend
///
/// A mutating statement that is not confirmed never reaches the backend.
pub async fn run(
    backend: &mut dyn Backend,
    statement: &GeneratedStatement,
    class: StatementClass,
    confirmed: bool,
) -> Result<RunOutcome, ExecutionError> {
    match class {
        StatementClass::Mutating if !confirmed => {
            info!("Statement {} is mutating and awaits confirmation", statement.id());
            Ok(RunOutcome::AwaitingConfirmation)
        }
        StatementClass::Mutating => run_mutating(backend, statement).await,
        StatementClass::ReadOnly => run_read(backend, statement).await,
    }
}

async fn run_mutating(
    backend: &mut dyn Backend,
    statement: &GeneratedStatement,
) -> Result<RunOutcome, ExecutionError> {
    debug!("Executing confirmed statement: {}", statement.sql());
    backend.begin().await?;

    match backend.execute(statement.sql()).await {
        Ok(result) => {
            backend.commit().await?;
            info!("Committed statement, {} row(s) affected", result.rows_affected);
            Ok(RunOutcome::Applied { rows_affected: result.rows_affected })
        }
        Err(e) => {
            if let Err(rollback_error) = backend.rollback().await {
                warn!("Rollback after failed statement also failed: {}", rollback_error);
            }
            Err(e)
        }
    }
}

async fn run_read(
    backend: &mut dyn Backend,
    statement: &GeneratedStatement,
) -> Result<RunOutcome, ExecutionError> {
    debug!("Executing read-only statement: {}", statement.sql());
    backend.begin().await?;

    let result = backend.execute(statement.sql()).await;
    if let Err(rollback_error) = backend.rollback().await {
        warn!("Failed to end read transaction: {}", rollback_error);
    }

    let result = result?;
    debug!("Statement returned {} row(s)", result.len());
    Ok(RunOutcome::Rows(ResultSet::new(result.columns, result.rows)))
}
