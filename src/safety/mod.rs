/*!
 * Statement classification and the confirmation gate.
 *
 * Classification is best effort. A read-only verdict is not a guarantee
 * that the statement cannot change data; it only decides whether the
 * statement runs without asking. Statements outside the mutating keyword
 * set, such as `TRUNCATE` or `RENAME TABLE`, classify as read-only, and
 * engines that commit them implicitly (MySQL) apply them without
 * confirmation.
 */

pub mod classifier;
pub mod confirmation;

pub use classifier::{classify, classify_lexical, StatementClass, MUTATING_KEYWORDS};
pub use confirmation::ConfirmationGate;
