use thiserror::Error;

/// Errors raised while importing venue records.
///
/// The import loop routes on [`ImportError::is_recoverable`]: recoverable
/// errors skip the offending row and leave a warning behind, everything else
/// aborts the source being imported.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A required column or key is absent, meaning the source does not match
    /// the schema the venue documents.
    #[error("could not find key '{key}' in csv row {row}")]
    MissingKey { key: String, row: String },

    /// A value is present but malformed: bad date, non-numeric amount, or a
    /// record invariant violation.
    #[error("{0}")]
    Deserialization(String),

    /// The venue symbol does not resolve to a canonical asset.
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),

    /// The venue symbol names a product the canonical model does not carry.
    #[error("unsupported asset '{0}'")]
    UnsupportedAsset(String),

    /// Recognized schema, unrecognized transaction type or category value.
    /// Carries a descriptor like `transactType AffiliatePayout`.
    #[error("{0} is not currently supported")]
    UnsupportedEntry(String),

    /// The price resolver has no price for the pair at the given time.
    #[error("no historical {quote} price for {asset} at {timestamp}")]
    NoPriceForAsset {
        asset: String,
        quote: String,
        timestamp: i64,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl ImportError {
    /// Whether the importer may skip the offending row and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ImportError::Deserialization(_)
                | ImportError::UnknownAsset(_)
                | ImportError::UnsupportedAsset(_)
                | ImportError::UnsupportedEntry(_)
                | ImportError::NoPriceForAsset { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
