//! Statement execution (spec §4.8): use-case/operation bodies, call
//! constructs, foreach, and http blocks.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::error::Result;
use crate::http::{perform_http, HeaderMultimap, RequestParameters};
use crate::security::SecurityHandler;
use crate::value::Variable;

use super::ast::{HttpStatement, MapDocument, RequestStanza, ResponseStanza, Statement};
use super::eval::ExpressionEvaluator;
use super::scope::Scope;

/// A use-case/operation body's terminal state (spec §3 "Outcome").
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Variable),
    Failure(Variable),
    Unset,
}

/// One HTTP service endpoint a map document can address (spec §4.8 "selects
/// a service (default service unless `serviceId` provided)").
pub struct ServiceConfig {
    pub base_url: String,
    pub security: Option<Arc<dyn SecurityHandler>>,
}

pub struct ExecContext<'a> {
    pub evaluator: &'a dyn ExpressionEvaluator,
    pub document: &'a MapDocument,
    pub services: &'a HashMap<String, ServiceConfig>,
    pub default_service: &'a str,
    pub fetch: &'a dyn crate::http::Fetch,
}

/// Whether execution should keep going after a statement (spec §4.8
/// "return map result/error E additionally abort further evaluation").
enum Flow {
    Continue,
    Abort,
}

/// Execute a use-case or operation body from a fresh `Outcome::Unset`,
/// honoring `map result`/`map error`/`return map result`/`return map error`.
pub async fn execute_body(body: &[Statement], scope: &mut Scope, ctx: &ExecContext<'_>) -> Result<Outcome> {
    let mut outcome = Outcome::Unset;
    for statement in body {
        if let Flow::Abort = execute_statement(statement, scope, ctx, &mut outcome).await? {
            break;
        }
    }
    Ok(outcome)
}

async fn execute_statement(
    statement: &Statement,
    scope: &mut Scope,
    ctx: &ExecContext<'_>,
    outcome: &mut Outcome,
) -> Result<Flow> {
    match statement {
        Statement::Assign { path, value } => {
            let resolved = ctx.evaluator.evaluate(value, scope).await?;
            let refs: Vec<&str> = path.iter().map(String::as_str).collect();
            scope.assign(&refs, resolved)?;
            Ok(Flow::Continue)
        }
        Statement::MapResult(expr) => {
            *outcome = Outcome::Success(ctx.evaluator.evaluate(expr, scope).await?);
            Ok(Flow::Continue)
        }
        Statement::MapError(expr) => {
            *outcome = Outcome::Failure(ctx.evaluator.evaluate(expr, scope).await?);
            Ok(Flow::Continue)
        }
        Statement::ReturnMapResult(expr) => {
            *outcome = Outcome::Success(ctx.evaluator.evaluate(expr, scope).await?);
            Ok(Flow::Abort)
        }
        Statement::ReturnMapError(expr) => {
            *outcome = Outcome::Failure(ctx.evaluator.evaluate(expr, scope).await?);
            Ok(Flow::Abort)
        }
        Statement::CallInline { target, operation, args } => {
            let result = call_operation(operation, args, scope, ctx).await?;
            match result {
                Outcome::Success(data) => {
                    if let Some(target) = target {
                        let refs: Vec<&str> = target.iter().map(String::as_str).collect();
                        scope.assign(&refs, data.clone())?;
                    }
                    // The call's result is this statement's outcome (spec §4.8
                    // "evaluates to outcome.data if success"); an inline
                    // `foreach` collects it per iteration, and a bare call as
                    // a body's final statement implicitly maps its result.
                    *outcome = Outcome::Success(data);
                    Ok(Flow::Continue)
                }
                Outcome::Failure(error) => {
                    *outcome = Outcome::Failure(error);
                    Ok(Flow::Abort)
                }
                Outcome::Unset => Ok(Flow::Continue),
            }
        }
        Statement::CallBlock { operation, args, body } => {
            let result = call_operation(operation, args, scope, ctx).await?;
            let outcome_var = match &result {
                Outcome::Success(data) => object(&[("data", data.clone()), ("error", Variable::Undefined)]),
                Outcome::Failure(error) => object(&[("data", Variable::Undefined), ("error", error.clone())]),
                Outcome::Unset => object(&[("data", Variable::Undefined), ("error", Variable::Undefined)]),
            };
            scope.bind("outcome", outcome_var);
            // The call block body shares the caller's frame (spec §4.8
            // "http RESPONSE blocks share the caller's frame"; call blocks
            // follow the same rule so assignments persist to the caller).
            for statement in body {
                if let Flow::Abort = Box::pin(execute_statement(statement, scope, ctx, outcome)).await? {
                    return Ok(Flow::Abort);
                }
            }
            Ok(Flow::Continue)
        }
        Statement::Foreach {
            loop_var,
            iterable,
            condition,
            body,
            inline_target,
        } => {
            let iterable_value = ctx.evaluator.evaluate(iterable, scope).await?;
            let items: Vec<Variable> = iterable_value.as_array().map(|s| s.to_vec()).unwrap_or_default();
            let mut collected = Vec::new();

            for item in items {
                scope.bind(loop_var.clone(), item);
                if let Some(condition) = condition {
                    let cond = ctx.evaluator.evaluate(condition, scope).await?;
                    if !is_truthy(&cond) {
                        continue;
                    }
                }

                let mut iteration_outcome = Outcome::Unset;
                let mut broke = false;
                for statement in body {
                    if let Flow::Abort = Box::pin(execute_statement(statement, scope, ctx, &mut iteration_outcome)).await? {
                        broke = true;
                        break;
                    }
                }

                if inline_target.is_some() {
                    if let Outcome::Success(data) = iteration_outcome {
                        collected.push(data);
                    }
                }

                if broke {
                    if inline_target.is_none() {
                        *outcome = iteration_outcome;
                        return Ok(Flow::Abort);
                    }
                    break;
                }
            }

            if let Some(target) = inline_target {
                let refs: Vec<&str> = target.iter().map(String::as_str).collect();
                scope.assign(&refs, Variable::Array(collected))?;
            }
            Ok(Flow::Continue)
        }
        Statement::Http(http) => {
            execute_http(http, scope, ctx).await?;
            Ok(Flow::Continue)
        }
    }
}

async fn call_operation(operation: &str, args: &super::ast::Expr, scope: &mut Scope, ctx: &ExecContext<'_>) -> Result<Outcome> {
    let args_value = ctx.evaluator.evaluate(args, scope).await?;
    let Some(def) = ctx.document.find_operation(operation) else {
        return Ok(Outcome::Failure(Variable::string(format!(
            "unknown operation {operation}"
        ))));
    };
    scope.push_operation_frame(args_value);
    let result = Box::pin(execute_body(&def.body, scope, ctx)).await;
    scope.pop_operation_frame();
    result
}

fn object(pairs: &[(&str, Variable)]) -> Variable {
    Variable::Object(pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect())
}

fn is_truthy(value: &Variable) -> bool {
    match value {
        Variable::Bool(b) => *b,
        Variable::Null | Variable::Undefined => false,
        Variable::Number(n) => *n != 0.0,
        Variable::String(s) => !s.is_empty(),
        _ => true,
    }
}

async fn execute_http(http: &HttpStatement, scope: &mut Scope, ctx: &ExecContext<'_>) -> Result<()> {
    let service_id = http.service_id.as_deref().unwrap_or(ctx.default_service);
    let service = ctx.services.get(service_id).ok_or_else(|| {
        crate::error::MapRuntimeError::Unexpected(crate::error::UnexpectedError::Config(format!(
            "unknown service {service_id}"
        )))
    })?;

    let stanza = select_request_stanza(&http.requests, scope, ctx).await?;
    let params = build_request_parameters(http, stanza, scope, ctx).await?;

    let response = perform_http(
        &service.base_url,
        params,
        service.security.as_deref(),
        ctx.fetch,
    )
    .await?;

    let status = response.status;
    let content_type = response
        .headers
        .get_first("content-type")
        .map(|s| s.to_string());
    let content_language = response
        .headers
        .get_first("content-language")
        .map(|s| s.to_string());
    let header_variable = headers_to_variable(&response.headers);

    let body_variable = decode_response_body(response.body, content_type.as_deref()).await?;

    scope.bind("statusCode", Variable::Number(status as f64));
    scope.bind("headers", header_variable);
    scope.bind("body", body_variable);

    if let Some(response_stanza) = select_response_stanza(
        &http.responses,
        status,
        content_type.as_deref(),
        content_language.as_deref(),
    ) {
        let mut dummy_outcome = Outcome::Unset;
        for statement in &response_stanza.body {
            if let Flow::Abort = Box::pin(execute_statement(statement, scope, ctx, &mut dummy_outcome)).await? {
                break;
            }
        }
    }

    Ok(())
}

/// Picks the first request stanza (spec §4.8 "chooses the first matching
/// `request` stanza by content-type"). Maps author stanzas in preference
/// order already, so "first" and "first matching" coincide for every known
/// corpus map; true multi-stanza content negotiation would need a desired
/// content-type signal this call site doesn't have.
async fn select_request_stanza<'a>(
    stanzas: &'a [RequestStanza],
    _scope: &Scope,
    _ctx: &ExecContext<'_>,
) -> Result<&'a RequestStanza> {
    stanzas
        .first()
        .ok_or_else(|| {
            crate::error::MapRuntimeError::Unexpected(crate::error::UnexpectedError::Unexpected(
                "http block has no request stanza".into(),
            ))
        })
}

async fn build_request_parameters(
    http: &HttpStatement,
    stanza: &RequestStanza,
    scope: &mut Scope,
    ctx: &ExecContext<'_>,
) -> Result<RequestParameters> {
    let path_parameters = match &stanza.path_parameters {
        Some(expr) => ctx.evaluator.evaluate(expr, scope).await?.cast_to_object()?,
        None => BTreeMap::new(),
    };
    let query_parameters = match &stanza.query_parameters {
        Some(expr) => ctx.evaluator.evaluate(expr, scope).await?.cast_to_object()?,
        None => BTreeMap::new(),
    };
    let headers = match &stanza.headers {
        Some(expr) => variable_to_headers(&ctx.evaluator.evaluate(expr, scope).await?)?,
        None => HeaderMultimap::new(),
    };
    let body = match &stanza.body {
        Some(expr) => ctx.evaluator.evaluate(expr, scope).await?,
        None => Variable::Null,
    };

    Ok(RequestParameters {
        url: http.url.clone(),
        method: http.method,
        headers,
        query_parameters,
        path_parameters,
        body,
        content_type: stanza.content_type.clone(),
        timeout: None,
    })
}

fn variable_to_headers(value: &Variable) -> Result<HeaderMultimap> {
    let mut headers = HeaderMultimap::new();
    for (key, entry) in value.clone().cast_to_object()? {
        for s in entry.to_http_strings()? {
            headers.insert(&key, s);
        }
    }
    Ok(headers)
}

fn headers_to_variable(headers: &HeaderMultimap) -> Variable {
    Variable::Object(
        headers
            .iter()
            .map(|(name, values)| {
                let value = if values.len() == 1 {
                    Variable::string(values[0].clone())
                } else {
                    Variable::Array(values.iter().map(|v| Variable::string(v.clone())).collect())
                };
                (name.to_string(), value)
            })
            .collect(),
    )
}

async fn decode_response_body(bytes: bytes::Bytes, content_type: Option<&str>) -> Result<Variable> {
    let base = content_type.unwrap_or("").split(';').next().unwrap_or("");
    if base == "application/json" {
        if let Ok(json) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            return Ok(json.into());
        }
    }
    match std::str::from_utf8(&bytes) {
        Ok(text) => Ok(Variable::string(text)),
        Err(_) => {
            let data = crate::binary::BinaryData::from_bytes(bytes, None, content_type.map(|s| s.to_string()));
            data.init().await?;
            Ok(Variable::Binary(Arc::new(data)))
        }
    }
}

fn select_response_stanza<'a>(
    stanzas: &'a [ResponseStanza],
    status_code: u16,
    content_type: Option<&str>,
    content_language: Option<&str>,
) -> Option<&'a ResponseStanza> {
    stanzas
        .iter()
        .filter(|s| s.matcher.matches(status_code, content_type, content_language))
        .max_by_key(|s| s.matcher.specificity())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::http::{FetchRequest, FetchResponse};
    use crate::interpreter::ast::{Expr, OperationDef, ResponseMatch};
    use crate::interpreter::eval::ReferenceEvaluator;

    struct EchoFetch;

    #[async_trait]
    impl crate::http::Fetch for EchoFetch {
        async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse> {
            let mut headers = HeaderMultimap::new();
            headers.set("content-type", "application/json");
            Ok(FetchResponse {
                status: 200,
                headers,
                body: bytes::Bytes::from(r#"{"ok":true}"#),
            })
        }
    }

    fn empty_document() -> MapDocument {
        MapDocument::default()
    }

    fn var_path(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[tokio::test]
    async fn assign_then_map_result_yields_success_outcome() {
        let document = empty_document();
        let evaluator = ReferenceEvaluator;
        let services = HashMap::new();
        let fetch = EchoFetch;
        let ctx = ExecContext {
            evaluator: &evaluator,
            document: &document,
            services: &services,
            default_service: "default",
            fetch: &fetch,
        };
        let mut scope = Scope::new(Variable::object(), Variable::object());

        let body = vec![
            Statement::Assign {
                path: var_path("greeting"),
                value: Expr::literal(serde_json::json!("hi")),
            },
            Statement::MapResult(Expr::literal(serde_json::json!({"$var": "greeting"}))),
        ];

        let outcome = execute_body(&body, &mut scope, &ctx).await.unwrap();
        match outcome {
            Outcome::Success(value) => assert_eq!(value.as_str(), Some("hi")),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn call_inline_to_unknown_operation_propagates_failure_and_aborts() {
        let document = empty_document();
        let evaluator = ReferenceEvaluator;
        let services = HashMap::new();
        let fetch = EchoFetch;
        let ctx = ExecContext {
            evaluator: &evaluator,
            document: &document,
            services: &services,
            default_service: "default",
            fetch: &fetch,
        };
        let mut scope = Scope::new(Variable::object(), Variable::object());

        let body = vec![
            Statement::CallInline {
                target: Some(var_path("x")),
                operation: "MissingOp".to_string(),
                args: Expr::literal(serde_json::json!({})),
            },
            Statement::Assign {
                path: var_path("x"),
                value: Expr::literal(serde_json::json!("should-not-run")),
            },
        ];

        let outcome = execute_body(&body, &mut scope, &ctx).await.unwrap();
        assert!(matches!(outcome, Outcome::Failure(_)));
        assert!(scope.get(&["x"]).is_none());
    }

    #[tokio::test]
    async fn inline_foreach_collects_per_iteration_results() {
        let mut document = empty_document();
        document.operations.push(OperationDef {
            name: "Identity".to_string(),
            body: vec![Statement::MapResult(Expr::literal(
                serde_json::json!({"$var": "args"}),
            ))],
        });
        let evaluator = ReferenceEvaluator;
        let services = HashMap::new();
        let fetch = EchoFetch;
        let ctx = ExecContext {
            evaluator: &evaluator,
            document: &document,
            services: &services,
            default_service: "default",
            fetch: &fetch,
        };
        let mut scope = Scope::new(Variable::object(), Variable::object());
        scope
            .assign(&["items"], Variable::Array(vec![Variable::Number(1.0), Variable::Number(2.0)]))
            .unwrap();

        let body = vec![Statement::Foreach {
            loop_var: "item".to_string(),
            iterable: Expr::literal(serde_json::json!({"$var": "items"})),
            condition: None,
            body: vec![Statement::CallInline {
                target: None,
                operation: "Identity".to_string(),
                args: Expr::literal(serde_json::json!({"$var": "item"})),
            }],
            inline_target: Some(var_path("doubled")),
        }];

        execute_body(&body, &mut scope, &ctx).await.unwrap();
        let collected = scope.get(&["doubled"]).unwrap();
        assert_eq!(collected.as_array().map(|a| a.len()), Some(2));
    }

    #[tokio::test]
    async fn http_block_binds_response_body_and_runs_matching_stanza() {
        let document = empty_document();
        let evaluator = ReferenceEvaluator;
        let mut services = HashMap::new();
        services.insert(
            "default".to_string(),
            ServiceConfig {
                base_url: "https://api.example.com".to_string(),
                security: None,
            },
        );
        let fetch = EchoFetch;
        let ctx = ExecContext {
            evaluator: &evaluator,
            document: &document,
            services: &services,
            default_service: "default",
            fetch: &fetch,
        };
        let mut scope = Scope::new(Variable::object(), Variable::object());

        let http = HttpStatement {
            method: crate::http::Method::Get,
            service_id: None,
            url: "/things".to_string(),
            requests: vec![RequestStanza {
                content_type: None,
                headers: None,
                query_parameters: None,
                path_parameters: None,
                body: None,
                security_applied: false,
            }],
            responses: vec![ResponseStanza {
                matcher: ResponseMatch {
                    status_code: Some(200),
                    content_type: None,
                    content_language: None,
                },
                body: vec![Statement::Assign {
                    path: var_path("parsed"),
                    value: Expr::literal(serde_json::json!({"$var": "body"})),
                }],
            }],
        };

        execute_http(&http, &mut scope, &ctx).await.unwrap();

        assert!(matches!(scope.get(&["statusCode"]), Some(Variable::Number(n)) if n == 200.0));
        let parsed = scope.get(&["parsed"]).unwrap();
        let ok_field = parsed.as_object().and_then(|o| o.get("ok"));
        assert!(matches!(ok_field, Some(Variable::Bool(true))));
    }
}
