use thiserror::Error;

/// Error types for the jonesfit library.
///
/// Errors propagate with a running context chain: each layer that catches an
/// error may wrap it in [`JonesFitError::Context`] naming itself, so that the
/// final message reads like a call trace.
#[derive(Error, Debug)]
pub enum JonesFitError {
    /// Error indicating a mismatch in matrix or vector dimensions.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Error indicating that a parameter index does not exist.
    #[error("Invalid parameter index: {0}")]
    InvalidParameter(String),

    /// Error indicating that an index into the measurement equation does not resolve.
    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// Error indicating a singular matrix was encountered.
    #[error("Singular matrix: column={column} nrow={nrow} pivot={pivot:e}{}", names_suffix(.names))]
    SingularMatrix {
        /// The elimination step at which no usable pivot remained
        column: usize,
        /// Size of the logical block being eliminated
        nrow: usize,
        /// Magnitude of the best remaining pivot
        pivot: f64,
        /// Names of the rows that were not yet eliminated (if supplied)
        names: Vec<String>,
    },

    /// The inverted curvature gave a variance that is not positive and finite.
    #[error("Ill-conditioned curvature: variance of {name} = {variance:e}")]
    NonPositiveVariance {
        /// Name of the free parameter
        name: String,
        /// The offending diagonal element of the covariance matrix
        variance: f64,
    },

    /// Error indicating a non-finite value was produced.
    #[error("Non-finite result: {0}")]
    NonFinite(String),

    /// Invalid state in the algorithm or data structure.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Parameter-related problems.
    #[error("Parameter error: {0}")]
    ParameterError(String),

    /// Parameter or property not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Error while parsing a function specification.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Unknown function name in the registry.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// I/O error wrapper.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// An error annotated with the name of the operation that propagated it.
    #[error("{context}\n\t{source}")]
    Context {
        /// Name of the propagating operation
        context: String,
        /// The underlying error
        #[source]
        source: Box<JonesFitError>,
    },
}

fn names_suffix(names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!(" remaining=[{}]", names.join(", "))
    }
}

impl JonesFitError {
    /// Wrap this error with the name of the propagating operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        JonesFitError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &JonesFitError {
        match self {
            JonesFitError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The chain of context names, outermost first.
    pub fn trace(&self) -> Vec<&str> {
        let mut trace = Vec::new();
        let mut current = self;
        while let JonesFitError::Context { context, source } = current {
            trace.push(context.as_str());
            current = source;
        }
        trace
    }

    /// True when the root cause is a singular or numerically singular matrix.
    pub fn is_singular(&self) -> bool {
        matches!(
            self.root(),
            JonesFitError::SingularMatrix { .. } | JonesFitError::NonPositiveVariance { .. }
        )
    }

    /// True when the root cause is a configuration error raised before any numerical work.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.root(),
            JonesFitError::DimensionMismatch(_)
                | JonesFitError::InvalidParameter(_)
                | JonesFitError::InvalidIndex(_)
        )
    }
}

impl From<crate::parameters::parameter::ParameterError> for JonesFitError {
    fn from(err: crate::parameters::parameter::ParameterError) -> Self {
        JonesFitError::ParameterError(format!("{}", err))
    }
}

/// Result type alias for jonesfit operations.
pub type Result<T> = std::result::Result<T, JonesFitError>;

/// Extension for appending context to a failed result.
pub trait ResultExt<T> {
    /// Wrap the error (if any) with the name of the propagating operation.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Like [`ResultExt::context`], building the name lazily.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.context(f()))
    }
}
