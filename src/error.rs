use thiserror::Error;

/// The core's typed error taxonomy. Every component returns one of these
/// kinds rather than recovering locally; the tool surface maps them onto a
/// stable result envelope (see `tools::dispatch`).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("regulation not found: {reg_id}")]
    RegulationNotFound { reg_id: String },

    #[error("page not found: {reg_id} page {page_num}")]
    PageNotFound { reg_id: String, page_num: u32 },

    #[error("table not found: {reg_id} table {table_id}")]
    TableNotFound { reg_id: String, table_id: String },

    #[error("annotation not found: {reg_id} label {label}")]
    AnnotationNotFound { reg_id: String, label: String },

    #[error("reference not resolved: {phrase}")]
    ReferenceNotResolved { phrase: String },

    #[error("section not found: {reg_id} section {section_number}")]
    SectionNotFound {
        reg_id: String,
        section_number: String,
    },

    #[error("integrity error in {reg_id}: {detail}")]
    IntegrityError { reg_id: String, detail: String },

    #[error("index not built for {reg_id:?}: {detail}")]
    IndexMissing {
        reg_id: Option<String>,
        detail: String,
    },

    #[error("table registry not built for {reg_id}")]
    RegistryNotBuilt { reg_id: String },

    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("external failure ({source_name}): {detail}")]
    ExternalFailure { source_name: String, detail: String },
}

impl CoreError {
    /// Process exit code for this error's family (§10.3). `0` is reserved for
    /// success and never returned here.
    pub fn exit_code(&self) -> i32 {
        match self {
            CoreError::Validation(_) => 10,
            CoreError::RegulationNotFound { .. }
            | CoreError::PageNotFound { .. }
            | CoreError::TableNotFound { .. }
            | CoreError::AnnotationNotFound { .. }
            | CoreError::ReferenceNotResolved { .. }
            | CoreError::SectionNotFound { .. } => 11,
            CoreError::IntegrityError { .. } => 12,
            CoreError::IndexMissing { .. } | CoreError::RegistryNotBuilt { .. } => 13,
            CoreError::DimensionMismatch { .. } | CoreError::ExternalFailure { .. } => 14,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }

    pub fn external(source_name: impl Into<String>, detail: impl Into<String>) -> Self {
        CoreError::ExternalFailure {
            source_name: source_name.into(),
            detail: detail.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
