use thiserror::Error;

/// Reasons a request is refused by the caller's tier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    #[error("provider '{0}' is not available on your plan")]
    ProviderNotAllowed(String),

    #[error("no providers are configured for your plan")]
    NoProviders,

    #[error("image uploads are not available on your plan")]
    ImagesNotAllowed,

    #[error("max_tokens must be greater than zero")]
    ZeroMaxTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderParseError {
    #[error("provider id must look like 'vendor/model' (got '{0}')")]
    MissingSeparator(String),

    #[error("provider id has an empty vendor or model (got '{0}')")]
    EmptyComponent(String),
}
