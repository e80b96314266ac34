use core::{fmt, str::FromStr};
use thiserror::Error;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// How a model is estimated from correspondences.
#[cfg_attr(
    feature = "serde-serialize",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// The normalized direct linear transform only.
    Linear,
    /// The linear estimate refined by minimizing a symmetric geometric error.
    #[default]
    Geometric,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Geometric => "geometric",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown method {0:?}, expected \"linear\" or \"geometric\"")]
pub struct ParseMethodError(pub String);

impl FromStr for Method {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("linear") {
            Ok(Self::Linear)
        } else if s.eq_ignore_ascii_case("geometric") {
            Ok(Self::Geometric)
        } else {
            Err(ParseMethodError(s.to_owned()))
        }
    }
}
