//! Pipeline error taxonomy.

/// Result type alias using the pipeline Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the transcoding pipeline.
///
/// Per-tier tool failures are wrapped as [`Error::Av`]; whether they abort
/// the whole asset depends on the tier (the baseline tier is terminal, any
/// other tier degrades to a warning and is dropped from the manifest).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source already meets or exceeds the target tier's bar; nothing
    /// was transcoded and the source passes through unchanged.
    #[error("source is already optimized")]
    AlreadyOptimized,

    /// The source format or mode cannot go through the targeted encoder
    /// pipeline (e.g. palette-mode images). Callers fall back to a generic
    /// pass-through.
    #[error("source not supported by this encoder pipeline: {0}")]
    NotSupportedSource(String),

    /// The source cannot be parsed or decoded at all. The caller decides
    /// what happens to the file; the pipeline never deletes it.
    #[error("invalid source data: {0}")]
    InvalidSourceData(String),

    /// Tier planning finished without a baseline tier.
    #[error("no stream planned at baseline compatibility level {level}")]
    MissingBaselineTier { level: u8 },

    /// External tool boundary failure.
    #[error(transparent)]
    Av(#[from] clsrs_av::Error),

    /// Type-level failure from the shared vocabulary.
    #[error(transparent)]
    Common(#[from] clsrs_common::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error while reading or writing a manifest.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a NotSupportedSource error.
    pub fn not_supported<S: Into<String>>(msg: S) -> Self {
        Self::NotSupportedSource(msg.into())
    }

    /// Create an InvalidSourceData error.
    pub fn invalid_source<S: Into<String>>(msg: S) -> Self {
        Self::InvalidSourceData(msg.into())
    }
}
