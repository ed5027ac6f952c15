#![warn(missing_docs)]
//! seqlens specific error structures
use std::{error::Error, fmt::Display};

/// seqlens application specific Result type
pub type LensResult<T> = std::result::Result<T, SeqLensError>;

/// Errors that can be returned by the various seqlens functions.
#[derive(Debug, PartialEq, Eq)]
pub enum SeqLensError {
    /// a query outside a surface's valid conic domain or a ray missing the
    /// surface geometry entirely
    Geometry(String),
    /// no real refraction angle exists at an interface
    TotalInternalReflection(String),
    /// a ray radius exceeds a surface's aperture radius. Non-fatal: multi-ray
    /// scans discard the candidate and continue.
    ApertureMiss(String),
    /// unresolved material reference, empty or malformed surface list,
    /// truncated or invalid imported prescription
    Configuration(String),
    /// errors not falling in one of the categories above
    Other(String),
}

impl Display for SeqLensError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geometry(m) => {
                write!(f, "Geometry:{m}")
            }
            Self::TotalInternalReflection(m) => {
                write!(f, "TotalInternalReflection:{m}")
            }
            Self::ApertureMiss(m) => {
                write!(f, "ApertureMiss:{m}")
            }
            Self::Configuration(m) => {
                write!(f, "Configuration:{m}")
            }
            Self::Other(m) => write!(f, "SeqLens Error:Other:{m}"),
        }
    }
}
impl Error for SeqLensError {}

impl std::convert::From<String> for SeqLensError {
    fn from(msg: String) -> Self {
        Self::Other(msg)
    }
}
