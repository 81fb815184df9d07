//! Event bus (spec §4.6, component C6).

mod bus;

pub use bus::{EventBus, EventInterceptor, InterceptContext, LoggingInterceptor, PostHookOutcome, PreHookDecision};
