//! Configuration model (spec §4.7, component C7): normalized super.json
//! (profiles, providers, priority, defaults), env resolution, and file
//! path lookup.

pub mod loader;
pub mod normalize;
pub mod raw;
pub mod resolve;

pub use loader::{load_and_normalize, load_from, resolve_config_path};
pub use normalize::{
    merged_input_defaults, normalize, NormalizedProfile, NormalizedProfileProvider,
    NormalizedProvider, NormalizedSuperDocument, NormalizeWarning, NormalizedRetryPolicy,
    RetryPolicyKind,
};
pub use raw::RawSuperDocument;
