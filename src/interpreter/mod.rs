//! Map interpreter (spec §4.8, component C8): a tree-walking evaluator over
//! an externally-parsed AST, delegating all host-expression evaluation to an
//! injected [`eval::ExpressionEvaluator`].

pub mod ast;
pub mod eval;
pub mod exec;
pub mod scope;

pub use ast::{
    Expr, HttpStatement, MapDocument, OperationDef, Path, RequestStanza, ResponseMatch,
    ResponseStanza, Statement, UseCaseDef,
};
pub use eval::{ExpressionEvaluator, ReferenceEvaluator};
pub use exec::{execute_body, ExecContext, Outcome, ServiceConfig};
pub use scope::Scope;
