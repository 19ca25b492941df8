//! Error types.
//!
//! Formula errors never abort a computation: the evaluator degrades to the
//! safe fallback (0 / false) and records the error as a trace marker. They
//! are still real typed errors at the `expr` API boundary so that the
//! import-time screening layer and the tests can inspect them.

use crate::key::{EntityId, ModifierId};
use thiserror::Error;

/// Errors produced while lexing, parsing or sanity-checking a formula.
///
/// # Examples
///
/// ```rust
/// use buildstat::expr::Expr;
/// use buildstat::FormulaError;
///
/// let err = Expr::parse("rollDice(3)").unwrap_err();
/// assert_eq!(err, FormulaError::UnknownFunction("rollDice".into()));
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    /// A character the lexer does not recognize.
    #[error("unexpected character `{0}` at byte {1}")]
    UnexpectedChar(char, usize),

    /// The formula ended where a value or operator was still expected.
    #[error("unexpected end of formula")]
    UnexpectedEnd,

    /// A token that cannot start or continue an expression at this point.
    #[error("unexpected `{0}` at byte {1}")]
    UnexpectedToken(String, usize),

    /// A call to a name outside the helper allow-list.
    ///
    /// This is the error the import-screening boundary keys on: any
    /// formula calling an unknown function is rejected before it can
    /// reach the evaluator.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// A helper called with the wrong number of arguments.
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    /// Nesting deeper than the parser's recursion guard allows.
    #[error("formula nesting too deep")]
    TooDeep,
}

/// Problems found in catalog content.
///
/// Reported by [`Catalog::validate`](crate::catalog::Catalog::validate);
/// the engine itself never fails on these - malformed entries are skipped
/// during activation so one bad entity cannot block the rest of a build.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// An entity with an empty id.
    #[error("entity with empty id (name: `{0}`)")]
    EmptyEntityId(String),

    /// Two entities sharing one id.
    #[error("duplicate entity id `{0}`")]
    DuplicateEntityId(EntityId),

    /// A modifier with an empty target statistic.
    #[error("modifier `{0}` on entity `{1}` has an empty target")]
    EmptyTarget(ModifierId, EntityId),

    /// A modifier with an empty value formula.
    #[error("modifier `{0}` on entity `{1}` has an empty formula")]
    EmptyFormula(ModifierId, EntityId),

    /// A formula that does not parse, with the underlying error.
    #[error("modifier `{0}` on entity `{1}`: {2}")]
    BadFormula(ModifierId, EntityId, FormulaError),
}
