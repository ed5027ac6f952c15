//! Three-term Sellmeier dispersion model.
use num::Zero;
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;
use uom::si::length::micrometer;

use super::{RefractiveIndex, RefractiveIndexType};
use crate::error::{LensResult, SeqLensError};

/// Refractive index model following the (three term) Sellmeier equation.
///
/// The wavelength enters the formula in micrometers, which is also the
/// convention glass vendor datasheets use for the coefficients.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct RefrIndexSellmeier1 {
    k1: f64,
    k2: f64,
    k3: f64,
    l1: f64,
    l2: f64,
    l3: f64,
}
impl RefrIndexSellmeier1 {
    /// Create a new refractive index model following the Sellmeier equation.
    ///
    /// # Errors
    ///
    /// This function will return an error if the given coefficients are not finite.
    pub fn new(k1: f64, k2: f64, k3: f64, l1: f64, l2: f64, l3: f64) -> LensResult<Self> {
        if !k1.is_finite()
            || !k2.is_finite()
            || !k3.is_finite()
            || !l1.is_finite()
            || !l2.is_finite()
            || !l3.is_finite()
        {
            return Err(SeqLensError::Other(
                "all coefficients must be finite.".into(),
            ));
        }
        Ok(Self {
            k1,
            k2,
            k3,
            l1,
            l2,
            l3,
        })
    }
}
impl RefractiveIndex for RefrIndexSellmeier1 {
    fn get_refractive_index(&self, wavelength: Length) -> LensResult<f64> {
        if wavelength.is_zero() || wavelength.is_sign_negative() || !wavelength.is_finite() {
            return Err(SeqLensError::Other("wavelength must be >0".into()));
        }
        let lambda = wavelength.get::<micrometer>();
        let l_sq = lambda * lambda;
        Ok(f64::sqrt(
            1.0 + self.k1 * l_sq / (l_sq - self.l1)
                + self.k2 * l_sq / (l_sq - self.l2)
                + self.k3 * l_sq / (l_sq - self.l3),
        ))
    }
    fn to_enum(&self) -> RefractiveIndexType {
        RefractiveIndexType::Sellmeier1(self.clone())
    }
}
