#![warn(missing_docs)]
//! Optical materials and the material catalog.
//!
//! A [`Material`] couples a name (and an optional alternate name, e.g. a
//! vendor synonym) with a dispersion model. Materials are immutable once
//! loaded and shared by reference ([`Arc`]) among many surfaces. The ambient
//! [`air`] material is process-wide, read-only state initialized once.
use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use crate::{
    error::{LensResult, SeqLensError},
    refractive_index::{refr_index_air, RefrIndexSellmeier1, RefractiveIndex, RefractiveIndexType},
};

/// An optical material: a named substance with a dispersion model.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Material {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    alternate_name: Option<String>,
    model: RefractiveIndexType,
}

impl Material {
    /// Create a new [`Material`] from a name, an optional alternate name and
    /// a dispersion model.
    ///
    /// # Errors
    ///
    /// This function returns an error if the given name is empty.
    pub fn new(
        name: &str,
        alternate_name: Option<&str>,
        model: RefractiveIndexType,
    ) -> LensResult<Self> {
        if name.is_empty() {
            return Err(SeqLensError::Configuration(
                "material name must not be empty".into(),
            ));
        }
        Ok(Self {
            name: name.to_owned(),
            alternate_name: alternate_name.map(std::borrow::ToOwned::to_owned),
            model,
        })
    }
    /// Returns the (primary) name of this [`Material`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Returns the alternate name of this [`Material`], if any.
    #[must_use]
    pub fn alternate_name(&self) -> Option<&str> {
        self.alternate_name.as_deref()
    }
    /// Returns `true` if this material is addressed by the given name, either
    /// through its primary or its alternate name.
    #[must_use]
    pub fn matches_name(&self, name: &str) -> bool {
        self.name == name || self.alternate_name.as_deref() == Some(name)
    }
    /// Get the refractive index of this [`Material`] at the given wavelength.
    ///
    /// # Errors
    ///
    /// This function returns an error if the underlying dispersion model fails
    /// (e.g. non-positive wavelength or a non-physical index value).
    pub fn refractive_index(&self, wavelength: Length) -> LensResult<f64> {
        self.model.get_refractive_index(wavelength)
    }
}

static AIR: LazyLock<Arc<Material>> = LazyLock::new(|| {
    Arc::new(Material {
        name: "AIR".to_owned(),
        alternate_name: None,
        model: refr_index_air(),
    })
});

/// Returns the process-wide ambient air material.
///
/// Air is modelled with a constant refractive index of 1.0 and is always
/// usable as default and fallback ambient medium.
#[must_use]
pub fn air() -> Arc<Material> {
    AIR.clone()
}

/// A read-only, externally owned collection of [`Material`]s.
///
/// Surfaces refer to their material by name; the catalog resolves such
/// references during import. An unresolved reference is a configuration
/// error, never a silent fallback to air.
#[derive(Clone, Debug)]
pub struct MaterialCatalog {
    materials: Vec<Arc<Material>>,
}

impl MaterialCatalog {
    /// Create a new, empty [`MaterialCatalog`] containing only the ambient
    /// [`air`] material.
    #[must_use]
    pub fn new() -> Self {
        Self {
            materials: vec![air()],
        }
    }
    /// Add a material to the catalog.
    pub fn add(&mut self, material: Material) {
        self.materials.push(Arc::new(material));
    }
    /// Find a material by its primary or alternate name.
    ///
    /// # Errors
    ///
    /// This function returns a [`SeqLensError::Configuration`] if no material
    /// with the given name exists in the catalog.
    pub fn find(&self, name: &str) -> LensResult<Arc<Material>> {
        self.materials
            .iter()
            .find(|m| m.matches_name(name))
            .cloned()
            .ok_or_else(|| {
                SeqLensError::Configuration(format!("material '{name}' not found in catalog"))
            })
    }
    /// Returns the number of materials in the catalog.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }
    /// Returns `true` if the catalog contains no materials.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
    /// Load a catalog from a JSON array of material records.
    ///
    /// The ambient air material is always present in the resulting catalog.
    ///
    /// # Errors
    ///
    /// This function returns a [`SeqLensError::Configuration`] if the given
    /// string is not a valid material record list.
    pub fn from_json(json: &str) -> LensResult<Self> {
        let materials: Vec<Material> = serde_json::from_str(json).map_err(|e| {
            SeqLensError::Configuration(format!("parsing of material catalog failed: {e}"))
        })?;
        let mut catalog = Self::new();
        for material in materials {
            catalog.add(material);
        }
        Ok(catalog)
    }
    /// Create a catalog with a small set of builtin glasses (plus air):
    /// PMMA, N-BK7 and N-SF11, each with its Sellmeier coefficients.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();
        let builtin = [
            (
                "PMMA",
                Some("ACRYLIC"),
                RefrIndexSellmeier1::new(1.1819, 0.0, 0.0, 0.011_313, 0.0, 0.0),
            ),
            (
                "N-BK7",
                Some("BK7"),
                RefrIndexSellmeier1::new(
                    1.039_612_12,
                    0.231_792_344,
                    1.010_469_45,
                    0.006_000_698_67,
                    0.020_017_914_4,
                    103.560_653,
                ),
            ),
            (
                "N-SF11",
                Some("SF11"),
                RefrIndexSellmeier1::new(
                    1.737_596_95,
                    0.313_747_346,
                    1.898_781_01,
                    0.013_188_707,
                    0.062_306_814_2,
                    155.236_29,
                ),
            ),
        ];
        for (name, alternate, model) in builtin {
            if let Ok(model) = model {
                if let Ok(material) = Material::new(name, alternate, model.to_enum()) {
                    catalog.add(material);
                }
            }
        }
        catalog
    }
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::new()
    }
}
