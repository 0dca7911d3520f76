//! Consent lifecycle and aggregation engine for federated identity
//! management.
//!
//! The [`consent`] module holds the complete engine: the consent state
//! machine, the attribute eligibility filter, the consent hub directory
//! and the cascade rules linking hubs, facilities and consents.

pub mod consent;

#[cfg(test)]
mod tests;

#[cfg(feature = "consentry_tracing")]
pub mod consentry_tracing {
    //! Tracing subscriber setup for binaries and tests.
    use tracing_subscriber::{EnvFilter, fmt};

    /// Install an env-filtered fmt subscriber. Safe to call repeatedly;
    /// later calls are no-ops.
    pub fn init() {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt().with_target(false).with_env_filter(filter).try_init();
    }
}
