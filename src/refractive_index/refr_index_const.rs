//! Wavelength-independant refractive index model.
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use super::{RefractiveIndex, RefractiveIndexType};
use crate::error::{LensResult, SeqLensError};

/// Refractive index of the ambient air medium.
pub const AIR_REFRACTIVE_INDEX: f64 = 1.0;

/// Dispersionless refractive index model.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct RefrIndexConst {
    refractive_index: f64,
}
impl RefrIndexConst {
    /// Create a new constant refractive index model.
    ///
    /// # Errors
    ///
    /// This function returns an error if the given refractive index is <1.0 or not finite.
    pub fn new(refractive_index: f64) -> LensResult<Self> {
        if refractive_index < 1.0 || !refractive_index.is_finite() {
            return Err(SeqLensError::Other(
                "refractive index must be >=1.0 and finite.".into(),
            ));
        }
        Ok(Self { refractive_index })
    }
}

impl RefractiveIndex for RefrIndexConst {
    fn get_refractive_index(&self, wavelength: Length) -> LensResult<f64> {
        if wavelength.is_zero() || wavelength.is_sign_negative() || !wavelength.is_finite() {
            return Err(SeqLensError::Other("wavelength must be >0".into()));
        }
        Ok(self.refractive_index)
    }
    fn to_enum(&self) -> RefractiveIndexType {
        RefractiveIndexType::Const(self.clone())
    }
}

/// Create the refractive index model of the ambient air medium.
#[must_use]
pub fn refr_index_air() -> RefractiveIndexType {
    RefractiveIndexType::Const(RefrIndexConst {
        refractive_index: AIR_REFRACTIVE_INDEX,
    })
}
