/*!
 * Confirmation gate for mutating statements.
 *
 * The gate holds at most one armed confirmation. It is tied to a single
 * statement instance (id and text fingerprint) and is consumed by the first
 * execution attempt that checks it.
 */

use log::debug;
use uuid::Uuid;

use crate::translator::GeneratedStatement;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Armed {
    id: Uuid,
    fingerprint: String,
}

/// One-shot confirmation state
#[derive(Debug, Default)]
pub struct ConfirmationGate {
    armed: Option<Armed>,
}

impl ConfirmationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the gate for `statement`, replacing any earlier confirmation
    pub fn confirm(&mut self, statement: &GeneratedStatement) {
        debug!("Confirmation armed for statement {}", statement.id());
        self.armed = Some(Armed {
            id: statement.id(),
            fingerprint: statement.fingerprint().to_string(),
        });
    }

    /// Whether `statement` is currently confirmed, without consuming it
    pub fn is_confirmed(&self, statement: &GeneratedStatement) -> bool {
        self.armed
            .as_ref()
            .is_some_and(|a| a.id == statement.id() && a.fingerprint == statement.fingerprint())
    }

    /// Consume the confirmation
    ///
    /// Returns true only if the gate was armed for this exact instance. The
    /// gate is disarmed either way.
    pub fn take(&mut self, statement: &GeneratedStatement) -> bool {
        let confirmed = self.is_confirmed(statement);
        self.armed = None;
        confirmed
    }

    /// Drop any pending confirmation
    pub fn reset(&mut self) {
        self.armed = None;
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}
