use thiserror::Error;

/// The broad category of an [`Error`].
///
/// Callers that only need to know what went wrong, and not the exact numbers involved, should
/// match on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Not enough independent correspondences to determine a unique solution.
    InsufficientData,
    /// The correspondences are degenerate (coincident points, collinear points, etc).
    DegenerateConfiguration,
    /// A numerical routine failed or produced a value that cannot be normalized.
    Numerical,
    /// The input was malformed before any computation took place.
    InvalidInput,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("at least {required} correspondences are required, but only {actual} were given")]
    InsufficientCorrespondences { required: usize, actual: usize },
    #[error("linear system has numerical rank {rank}, but rank {required} is required for a unique solution")]
    RankDeficient { rank: usize, required: usize },
    #[error("degenerate configuration: {0}")]
    DegenerateConfiguration(&'static str),
    #[error("numerical failure: {0}")]
    Numerical(&'static str),
    #[error("correspondence lists have different lengths ({left} and {right})")]
    MismatchedLengths { left: usize, right: usize },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientCorrespondences { .. } | Self::RankDeficient { .. } => {
                ErrorKind::InsufficientData
            }
            Self::DegenerateConfiguration(_) => ErrorKind::DegenerateConfiguration,
            Self::Numerical(_) => ErrorKind::Numerical,
            Self::MismatchedLengths { .. } => ErrorKind::InvalidInput,
        }
    }
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
