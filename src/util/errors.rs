//! Typed errors for the fatal and soft-failure cases of extension resolution.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Errors raised while assembling or resolving the extension list.
#[derive(Debug, Error)]
pub enum ExtError {
    #[error("no manifest found in `{}` or any parent directory", dir.display())]
    ManifestNotFound { dir: PathBuf },

    #[error("extension `{extension}` uses unknown provider `{provider}`")]
    UnknownProvider { extension: String, provider: String },

    #[error("capability provider `{provider}` failed: {message}")]
    ProviderFailed { provider: String, message: String },

    #[error("capability provider `{provider}` printed unusable output: {message}")]
    ProviderOutputInvalid { provider: String, message: String },

    #[error("bundled directory for `{provider}` not found: {}", path.display())]
    MissingBundledDir { provider: String, path: PathBuf },

    #[error("translator `{program}` is not available: {reason}")]
    TranslatorUnavailable { program: String, reason: String },

    #[error("translation of `{}` failed: {message}", input.display())]
    TranslationFailed { input: PathBuf, message: String },
}

impl ExtError {
    /// Whether this error means an optional capability could not be loaded,
    /// as opposed to a capability that loaded and then failed. A provider
    /// that ran but printed garbage is broken, not absent.
    pub fn is_capability_absence(&self) -> bool {
        matches!(
            self,
            ExtError::TranslatorUnavailable { .. } | ExtError::ProviderFailed { .. }
        )
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string());
        match self {
            ExtError::ManifestNotFound { .. } => diag.with_suggestion(suggestions::NO_MANIFEST),
            ExtError::UnknownProvider { provider, .. } => diag
                .with_context(format!("`{}` is not declared under [providers]", provider))
                .with_suggestion(suggestions::DECLARE_PROVIDER),
            ExtError::ProviderFailed { provider, .. } => diag
                .with_context(format!(
                    "the extension list needs `{}` to compute include and library paths",
                    provider
                ))
                .with_suggestion(suggestions::INSTALL_PROVIDER),
            ExtError::ProviderOutputInvalid { provider, .. } => diag
                .with_context(format!("`{}` is declared under [providers]", provider))
                .with_suggestion(suggestions::FIX_PROVIDER_OUTPUT),
            ExtError::MissingBundledDir { path, .. } => diag
                .with_location(path.clone())
                .with_suggestion(suggestions::INIT_SUBMODULES),
            ExtError::TranslatorUnavailable { .. } => {
                diag.with_suggestion(suggestions::INSTALL_TRANSLATOR)
            }
            ExtError::TranslationFailed { input, .. } => diag.with_location(input.clone()),
        }
    }
}
