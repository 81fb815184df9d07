//! Use-case driver (spec §4.9, component C9): the top-level `perform()`
//! orchestration tying the router (C5), event bus (C6), bind cache, and map
//! interpreter (C8) together.

pub mod build;
pub mod cache;

pub use build::{build_client, build_policy, build_router};
pub use cache::{BindCache, Binder, BoundProfileProvider};

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::error::{MapRuntimeError, PerformError, Result, UnexpectedError};
use crate::events::{EventBus, InterceptContext, PostHookOutcome, PreHookDecision};
use crate::failure::{FailurePolicyRouter, RequestOutcome, RouterOutcome};
use crate::http::Fetch;
use crate::interpreter::{execute_body, ExecContext, ExpressionEvaluator, Outcome, Scope};
use crate::value::Variable;

/// Per-call overrides (spec §6 "`options`").
#[derive(Debug, Clone, Default)]
pub struct PerformOptions {
    pub provider: Option<String>,
    pub parameters: Option<BTreeMap<String, String>>,
    pub security: Option<Variable>,
    pub map_variant: Option<String>,
    pub map_revision: Option<String>,
}

/// Wires one profile's priority router, bind cache, and event bus to the
/// interpreter (spec §4.9). One `Driver` per profile.
pub struct Driver {
    pub profile_id: String,
    pub profile_cache_key: String,
    pub router: FailurePolicyRouter,
    pub bind_cache: BindCache,
    pub binder: Arc<dyn Binder>,
    pub events: EventBus,
    pub evaluator: Arc<dyn ExpressionEvaluator>,
    pub fetch: Arc<dyn Fetch>,
}

/// A hard cap on step-2..5 retries within one `perform` call, guarding
/// against a misconfigured policy that never reaches `Exhausted`.
const MAX_ATTEMPTS: usize = 64;

impl Driver {
    pub async fn perform(&self, usecase: &str, input: Variable, options: PerformOptions) -> Result<Variable> {
        // Step 1: a pinned provider disables failover for this call.
        if options.provider.is_some() {
            self.router.toggle_failover(false);
        }

        let mut provider = match &options.provider {
            Some(p) => p.clone(),
            None => self
                .router
                .current_provider()
                .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::Config("no provider configured".into())))?
                .to_string(),
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            if attempts > MAX_ATTEMPTS {
                return Err(MapRuntimeError::Unexpected(UnexpectedError::Unexpected(
                    "perform exceeded maximum retry attempts".into(),
                )));
            }

            let provider_cache_key = provider_cache_key(&provider, &options);
            let bound = self
                .bind_cache
                .get_or_bind(&self.profile_cache_key, &provider_cache_key, self.binder.clone())
                .await?;

            let ctx = InterceptContext {
                profile: self.profile_id.clone(),
                usecase: usecase.to_string(),
                provider: Some(provider.clone()),
            };

            if self.events.before(&ctx).await == PreHookDecision::Abort {
                return Err(MapRuntimeError::Unexpected(UnexpectedError::Unexpected(
                    "perform aborted by event interceptor".into(),
                )));
            }

            let started = Instant::now();
            let result = self.run_once(usecase, &input, &bound).await;
            let elapsed = started.elapsed();

            let (request_outcome, post_hook) = match &result {
                Ok(Outcome::Success(_)) => (RequestOutcome::Success, PostHookOutcome::Success),
                Ok(Outcome::Failure(error)) => (
                    RequestOutcome::Failure,
                    PostHookOutcome::Failure(error.to_http_string().unwrap_or_default()),
                ),
                Ok(Outcome::Unset) => (RequestOutcome::Failure, PostHookOutcome::Failure("no outcome".into())),
                Err(error) => (RequestOutcome::Failure, PostHookOutcome::Failure(error.to_string())),
            };
            self.events.after(&ctx, &post_hook, elapsed).await;

            if let Ok(Outcome::Success(value)) = result {
                self.router.after_request(RequestOutcome::Success).await;
                return Ok(value);
            }

            self.router.after_request(request_outcome).await;

            match self.router.before_request().await {
                RouterOutcome::Continue { backoff: None, .. } => {
                    return finalize_failure(result);
                }
                RouterOutcome::Continue { backoff: Some(duration), .. } => {
                    tokio::time::sleep(duration).await;
                    continue;
                }
                RouterOutcome::Failover { provider: next } => {
                    provider = next;
                    continue;
                }
                RouterOutcome::Exhausted => {
                    return finalize_failure(result);
                }
            }
        }
    }

    async fn run_once(
        &self,
        usecase: &str,
        input: &Variable,
        bound: &BoundProfileProvider,
    ) -> Result<Outcome> {
        let use_case_def = bound
            .document
            .find_usecase(usecase)
            .ok_or_else(|| MapRuntimeError::Unexpected(UnexpectedError::Config(format!("unknown use-case {usecase}"))))?;

        let mut scope = Scope::new(input.clone(), bound.parameters.clone());
        let exec_ctx = ExecContext {
            evaluator: self.evaluator.as_ref(),
            document: bound.document.as_ref(),
            services: bound.services.as_ref(),
            default_service: "default",
            fetch: self.fetch.as_ref(),
        };

        execute_body(&use_case_def.body, &mut scope, &exec_ctx).await
    }
}

fn provider_cache_key(provider: &str, options: &PerformOptions) -> String {
    match (&options.map_variant, &options.map_revision) {
        (Some(variant), Some(revision)) => format!("{provider}@{variant}#{revision}"),
        (Some(variant), None) => format!("{provider}@{variant}"),
        (None, Some(revision)) => format!("{provider}#{revision}"),
        (None, None) => provider.to_string(),
    }
}

fn finalize_failure(result: Result<Outcome>) -> Result<Variable> {
    match result {
        Ok(Outcome::Failure(error)) => Err(MapRuntimeError::Perform(PerformError::interpreter(
            error.to_http_string().unwrap_or_default(),
            crate::error::SourceLocation::default(),
        ))),
        Ok(Outcome::Unset) => Err(MapRuntimeError::Unexpected(UnexpectedError::Unexpected(
            "use-case body produced no outcome".into(),
        ))),
        Ok(Outcome::Success(value)) => Ok(value),
        Err(error) => Err(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::failure::AbortPolicy;
    use crate::http::{FetchRequest, FetchResponse};
    use crate::interpreter::eval::ReferenceEvaluator;

    struct NeverFetch;

    #[async_trait]
    impl Fetch for NeverFetch {
        async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse> {
            unreachable!("this test's use-case body never performs HTTP")
        }
    }

    struct StaticBinder {
        document: Arc<crate::interpreter::MapDocument>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Binder for StaticBinder {
        async fn bind(&self, _profile_cache_key: &str, _provider_cache_key: &str) -> Result<BoundProfileProvider> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(BoundProfileProvider {
                document: self.document.clone(),
                services: Arc::new(HashMap::new()),
                parameters: Variable::object(),
            })
        }
    }

    fn success_document() -> Arc<crate::interpreter::MapDocument> {
        use crate::interpreter::{Expr, Statement, UseCaseDef};
        Arc::new(crate::interpreter::MapDocument {
            usecases: vec![UseCaseDef {
                name: "Greet".to_string(),
                body: vec![Statement::MapResult(Expr::literal(serde_json::json!("hello")))],
            }],
            operations: vec![],
        })
    }

    fn driver_with(document: Arc<crate::interpreter::MapDocument>, calls: Arc<AtomicUsize>) -> Driver {
        Driver {
            profile_id: "weather".to_string(),
            profile_cache_key: "weather@1.0.0".to_string(),
            router: FailurePolicyRouter::new(
                vec![("primary".into(), Arc::new(AbortPolicy::new()) as Arc<dyn crate::failure::FailurePolicy>)],
                true,
            ),
            bind_cache: BindCache::new(std::time::Duration::from_secs(300)),
            binder: Arc::new(StaticBinder { document, calls }),
            events: EventBus::new(),
            evaluator: Arc::new(ReferenceEvaluator),
            fetch: Arc::new(NeverFetch),
        }
    }

    #[tokio::test]
    async fn successful_usecase_returns_its_result() {
        let driver = driver_with(success_document(), Arc::new(AtomicUsize::new(0)));
        let value = driver
            .perform("Greet", Variable::object(), PerformOptions::default())
            .await
            .unwrap();
        assert_eq!(value.as_str(), Some("hello"));
    }

    #[tokio::test]
    async fn repeated_calls_reuse_the_bound_cache_entry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let driver = driver_with(success_document(), calls.clone());
        driver.perform("Greet", Variable::object(), PerformOptions::default()).await.unwrap();
        driver.perform("Greet", Variable::object(), PerformOptions::default()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn pinning_a_provider_disables_failover() {
        let driver = driver_with(success_document(), Arc::new(AtomicUsize::new(0)));
        let options = PerformOptions {
            provider: Some("primary".to_string()),
            ..Default::default()
        };
        driver.perform("Greet", Variable::object(), options).await.unwrap();
    }
}
