//! Host-expression evaluation (spec §4.8 "Host expression evaluation"): the
//! interpreter delegates every expression node to an injected evaluator and
//! imposes no syntax of its own.

use async_trait::async_trait;

use crate::error::Result;
use crate::value::Variable;

use super::ast::Expr;
use super::scope::Scope;

/// The narrow seam between the interpreter and the (out-of-scope) DSL
/// expression language (spec §1 "the host-expression evaluator (treated as
/// an opaque sandbox that takes a scope and returns a value)"). Must be
/// restartable and side-effect-free over the scope snapshot it was given.
#[async_trait]
pub trait ExpressionEvaluator: Send + Sync {
    async fn evaluate(&self, expr: &Expr, scope: &Scope) -> Result<Variable>;
}

/// A minimal reference evaluator over a pragmatic JSON-shaped expression
/// subset, sufficient to drive literal values, dotted-path reads, and a
/// handful of built-in functions. Real deployments inject a sandboxed
/// evaluator for the full host expression language; this one exists so the
/// interpreter is independently testable.
///
/// Recognized shapes (as the `serde_json::Value` wrapped by [`Expr`]):
/// - any JSON scalar/array/object literal, taken as-is;
/// - `{"$var": "dotted.path"}` — a scope lookup;
/// - `{"$call": {"fn": name, "args": [Expr...]}}` — a built-in function.
pub struct ReferenceEvaluator;

#[async_trait]
impl ExpressionEvaluator for ReferenceEvaluator {
    async fn evaluate(&self, expr: &Expr, scope: &Scope) -> Result<Variable> {
        evaluate_json(&expr.0, scope)
    }
}

fn evaluate_json(value: &serde_json::Value, scope: &Scope) -> Result<Variable> {
    if let serde_json::Value::Object(map) = value {
        if map.len() == 1 {
            if let Some(serde_json::Value::String(path)) = map.get("$var") {
                let segments: Vec<&str> = path.split('.').collect();
                return Ok(scope.get(&segments).unwrap_or(Variable::Undefined));
            }
            if let Some(call) = map.get("$call") {
                return evaluate_call(call, scope);
            }
        }
    }
    Ok(value.clone().into())
}

fn evaluate_call(call: &serde_json::Value, scope: &Scope) -> Result<Variable> {
    let name = call.get("fn").and_then(|v| v.as_str()).unwrap_or_default();
    let args: Vec<Variable> = call
        .get("args")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().map(|a| evaluate_json(a, scope)).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();

    let result = match name {
        "identity" => args.into_iter().next().unwrap_or(Variable::Undefined),
        "concat" => Variable::String(
            args.iter()
                .map(|a| a.to_http_string().unwrap_or_default())
                .collect::<Vec<_>>()
                .join(""),
        ),
        "eq" => Variable::Bool(
            args.get(0).map(|a| a.to_http_string().ok()) == args.get(1).map(|a| a.to_http_string().ok()),
        ),
        _ => Variable::Undefined,
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::ast::Expr;

    #[tokio::test]
    async fn literal_expression_passes_through() {
        let scope = Scope::new(Variable::object(), Variable::object());
        let evaluator = ReferenceEvaluator;
        let value = evaluator.evaluate(&Expr::literal(serde_json::json!(42)), &scope).await.unwrap();
        assert!(matches!(value, Variable::Number(n) if n == 42.0));
    }

    #[tokio::test]
    async fn var_expression_reads_from_scope() {
        let mut scope = Scope::new(Variable::object(), Variable::object());
        scope.assign(&["x"], Variable::string("hi")).unwrap();
        let evaluator = ReferenceEvaluator;
        let expr = Expr::literal(serde_json::json!({"$var": "x"}));
        let value = evaluator.evaluate(&expr, &scope).await.unwrap();
        assert_eq!(value.as_str(), Some("hi"));
    }

    #[tokio::test]
    async fn identity_builtin_returns_its_argument() {
        let scope = Scope::new(Variable::object(), Variable::object());
        let evaluator = ReferenceEvaluator;
        let expr = Expr::literal(serde_json::json!({"$call": {"fn": "identity", "args": [1]}}));
        let value = evaluator.evaluate(&expr, &scope).await.unwrap();
        assert!(matches!(value, Variable::Number(n) if n == 1.0));
    }
}
