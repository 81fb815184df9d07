//! Map AST node shapes (spec §4.8). The DSL parser and the AST schema
//! library are out-of-scope external collaborators (spec §1); these types
//! are the narrow contract the interpreter consumes. Expression payloads
//! are opaque host nodes handed to the injected [`super::eval::ExpressionEvaluator`]
//! verbatim — the interpreter never inspects their internal shape.

use std::sync::Arc;

use crate::http::Method;

/// An opaque host-expression node (spec §4.8 "the interpreter imposes no
/// syntax"). Wraps whatever the external parser/evaluator pair agrees on;
/// the interpreter only ever passes it through to the evaluator.
#[derive(Debug, Clone)]
pub struct Expr(pub Arc<serde_json::Value>);

impl Expr {
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self(Arc::new(value.into()))
    }
}

/// A dotted identifier path, e.g. `input.location.city` (spec §4.8).
pub type Path = Vec<String>;

#[derive(Debug, Clone)]
pub enum Statement {
    /// `path = expr` (spec §4.8 scoping rules; silently dropped for
    /// `input`/`parameters` paths).
    Assign { path: Path, value: Expr },
    /// `map result expr`.
    MapResult(Expr),
    /// `map error expr`.
    MapError(Expr),
    /// `return map result expr` — aborts the enclosing body.
    ReturnMapResult(Expr),
    /// `return map error expr` — aborts the enclosing body.
    ReturnMapError(Expr),
    /// Inline call: `target = call Operation(args)`.
    CallInline {
        target: Option<Path>,
        operation: String,
        args: Expr,
    },
    /// Call block: `call Operation(args) { ...body using outcome... }`.
    CallBlock {
        operation: String,
        args: Expr,
        body: Vec<Statement>,
    },
    /// `foreach (loopVar of iterable) [if (cond)] { ...body... }`. When
    /// `inline_target` is set this is the inline variant collecting
    /// `outcome.data` per iteration into an array bound to that path.
    Foreach {
        loop_var: String,
        iterable: Expr,
        condition: Option<Expr>,
        body: Vec<Statement>,
        inline_target: Option<Path>,
    },
    Http(HttpStatement),
}

#[derive(Debug, Clone)]
pub struct HttpStatement {
    pub method: Method,
    pub service_id: Option<String>,
    pub url: String,
    pub requests: Vec<RequestStanza>,
    pub responses: Vec<ResponseStanza>,
}

#[derive(Debug, Clone)]
pub struct RequestStanza {
    /// `None` matches any content-type (spec §4.8 "chooses the first
    /// matching `request` stanza by content-type").
    pub content_type: Option<String>,
    pub headers: Option<Expr>,
    pub query_parameters: Option<Expr>,
    pub path_parameters: Option<Expr>,
    pub body: Option<Expr>,
    /// Populated from the security configuration, not authored in the map.
    pub security_applied: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ResponseMatch {
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_language: Option<String>,
}

impl ResponseMatch {
    /// Specificity score for "most specific wins" (spec §4.8): one point
    /// per constraint that is present.
    pub fn specificity(&self) -> u8 {
        self.status_code.is_some() as u8 + self.content_type.is_some() as u8 + self.content_language.is_some() as u8
    }

    pub fn matches(&self, status_code: u16, content_type: Option<&str>, content_language: Option<&str>) -> bool {
        self.status_code.map(|s| s == status_code).unwrap_or(true)
            && self
                .content_type
                .as_deref()
                .map(|ct| content_type.map(|actual| actual.starts_with(ct)).unwrap_or(false))
                .unwrap_or(true)
            && self
                .content_language
                .as_deref()
                .map(|cl| content_language == Some(cl))
                .unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct ResponseStanza {
    pub matcher: ResponseMatch,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct OperationDef {
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone)]
pub struct UseCaseDef {
    pub name: String,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Default)]
pub struct MapDocument {
    pub usecases: Vec<UseCaseDef>,
    pub operations: Vec<OperationDef>,
}

impl MapDocument {
    pub fn find_usecase(&self, name: &str) -> Option<&UseCaseDef> {
        self.usecases.iter().find(|u| u.name == name)
    }

    pub fn find_operation(&self, name: &str) -> Option<&OperationDef> {
        self.operations.iter().find(|o| o.name == name)
    }
}
