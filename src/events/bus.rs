//! Event bus (spec §4.6, component C6): around-interceptors wrapping
//! `bindAndPerform`/`perform`, guaranteeing sequential delivery. A
//! `Send + Sync` trait with default no-op methods, so most interceptors
//! only override the one hook they care about.

use std::time::Duration;

use async_trait::async_trait;

/// Metadata describing the interceptable call (spec §4.6 "Interceptables
/// carry metadata {profile, usecase, provider?}").
#[derive(Debug, Clone)]
pub struct InterceptContext {
    pub profile: String,
    pub usecase: String,
    pub provider: Option<String>,
}

/// What the pre-hook decides (spec §4.6 "pre-hook decides
/// {continue, retry, abort}").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreHookDecision {
    Continue,
    Retry,
    Abort,
}

/// What the post-hook observes (spec §4.6 "post-hook sees
/// {outcome, elapsed}").
#[derive(Debug, Clone)]
pub enum PostHookOutcome {
    Success,
    Failure(String),
}

#[async_trait]
pub trait EventInterceptor: Send + Sync {
    async fn before(&self, _ctx: &InterceptContext) -> PreHookDecision {
        PreHookDecision::Continue
    }

    async fn after(&self, _ctx: &InterceptContext, _outcome: &PostHookOutcome, _elapsed: Duration) {}
}

/// A simple `tracing`-backed interceptor logging before/after every call.
#[derive(Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl EventInterceptor for LoggingInterceptor {
    async fn before(&self, ctx: &InterceptContext) -> PreHookDecision {
        tracing::debug!(
            target: "mapruntime::events",
            profile = %ctx.profile,
            usecase = %ctx.usecase,
            provider = ctx.provider.as_deref().unwrap_or("-"),
            "perform starting"
        );
        PreHookDecision::Continue
    }

    async fn after(&self, ctx: &InterceptContext, outcome: &PostHookOutcome, elapsed: Duration) {
        match outcome {
            PostHookOutcome::Success => tracing::debug!(
                target: "mapruntime::events",
                profile = %ctx.profile,
                usecase = %ctx.usecase,
                elapsed_ms = elapsed.as_millis() as u64,
                "perform succeeded"
            ),
            PostHookOutcome::Failure(message) => tracing::debug!(
                target: "mapruntime::events",
                profile = %ctx.profile,
                usecase = %ctx.usecase,
                elapsed_ms = elapsed.as_millis() as u64,
                error = %message,
                "perform failed"
            ),
        }
    }
}

/// Delivers hooks to every registered interceptor in registration order,
/// one at a time (spec §4.6 "the bus guarantees sequential delivery (no
/// parallel hooks per interceptable)").
#[derive(Default)]
pub struct EventBus {
    interceptors: Vec<Box<dyn EventInterceptor>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, interceptor: Box<dyn EventInterceptor>) {
        self.interceptors.push(interceptor);
    }

    /// Runs every interceptor's pre-hook in order; the first non-`Continue`
    /// decision short-circuits the remaining interceptors.
    pub async fn before(&self, ctx: &InterceptContext) -> PreHookDecision {
        for interceptor in &self.interceptors {
            let decision = interceptor.before(ctx).await;
            if decision != PreHookDecision::Continue {
                return decision;
            }
        }
        PreHookDecision::Continue
    }

    pub async fn after(&self, ctx: &InterceptContext, outcome: &PostHookOutcome, elapsed: Duration) {
        for interceptor in &self.interceptors {
            interceptor.after(ctx, outcome, elapsed).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingInterceptor(Arc<AtomicUsize>);

    #[async_trait]
    impl EventInterceptor for CountingInterceptor {
        async fn before(&self, _ctx: &InterceptContext) -> PreHookDecision {
            self.0.fetch_add(1, Ordering::SeqCst);
            PreHookDecision::Continue
        }
    }

    struct AbortingInterceptor;

    #[async_trait]
    impl EventInterceptor for AbortingInterceptor {
        async fn before(&self, _ctx: &InterceptContext) -> PreHookDecision {
            PreHookDecision::Abort
        }
    }

    fn ctx() -> InterceptContext {
        InterceptContext {
            profile: "weather".into(),
            usecase: "CurrentWeather".into(),
            provider: None,
        }
    }

    #[tokio::test]
    async fn delivers_before_hooks_to_every_interceptor_in_order() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        bus.register(Box::new(CountingInterceptor(counter.clone())));
        bus.register(Box::new(CountingInterceptor(counter.clone())));
        bus.before(&ctx()).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn abort_short_circuits_remaining_interceptors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        bus.register(Box::new(AbortingInterceptor));
        bus.register(Box::new(CountingInterceptor(counter.clone())));
        let decision = bus.before(&ctx()).await;
        assert_eq!(decision, PreHookDecision::Abort);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
