/*!
 * Tests for read/mutating statement classification
 */

use askdb::safety::{classify, classify_lexical, StatementClass, MUTATING_KEYWORDS};

#[test]
fn test_classify_withEachMutatingKeyword_shouldBeMutating() {
    for keyword in MUTATING_KEYWORDS {
        let sql = format!("{} something", keyword);
        assert_eq!(classify(&sql), StatementClass::Mutating, "{}", sql);
        assert_eq!(classify_lexical(&sql), StatementClass::Mutating, "{}", sql);
    }
}

#[test]
fn test_classify_shouldIgnoreCaseAndLeadingWhitespace() {
    for sql in ["  DELETE FROM orders", "\n\tUpdate t SET a = 1", "iNsErT INTO t VALUES (1)"] {
        assert_eq!(classify(sql), StatementClass::Mutating, "{}", sql);
        assert_eq!(classify_lexical(sql), StatementClass::Mutating, "{}", sql);
    }
}

#[test]
fn test_classify_withReads_shouldBeReadOnly() {
    for sql in [
        "SELECT * FROM orders",
        "with recent as (select * from orders) select count(*) from recent",
        "EXPLAIN SELECT 1",
        "",
    ] {
        assert_eq!(classify(sql), StatementClass::ReadOnly, "{}", sql);
    }
}

#[test]
fn test_classifyLexical_shouldOnlyLookAtThePrefix() {
    assert_eq!(classify_lexical("select 1; delete from t"), StatementClass::ReadOnly);
    assert_eq!(classify_lexical("-- note\nDELETE FROM t"), StatementClass::ReadOnly);
}

#[test]
fn test_classify_shouldSeeThroughCommentsAndStatementLists() {
    assert_eq!(classify("-- note\nDELETE FROM t"), StatementClass::Mutating);
    assert_eq!(classify("/* cleanup */ drop table t"), StatementClass::Mutating);
    assert_eq!(classify("select 1; delete from t"), StatementClass::Mutating);
}

#[test]
fn test_classify_withKeywordInsideIdentifier_shouldBeReadOnly() {
    assert_eq!(classify("SELECT updated_at, created_by FROM t"), StatementClass::ReadOnly);
    assert_eq!(classify("SELECT 'drop table t'"), StatementClass::ReadOnly);
}

#[test]
fn test_statementClass_display_shouldUseLabels() {
    assert_eq!(StatementClass::ReadOnly.to_string(), "read-only");
    assert_eq!(StatementClass::Mutating.to_string(), "mutating");
    assert!(StatementClass::Mutating.is_mutating());
}
