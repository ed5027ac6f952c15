#![warn(missing_docs)]
//! Import and export of lens designs.
//!
//! Two persisted forms are supported: a line-oriented `.len` prescription
//! (keyword-prefixed records) and a structured JSON document. Both refer to
//! materials by name; references are resolved against a caller-supplied
//! [`MaterialCatalog`] on import. Any import failure aborts the entire
//! import, so a partially built [`Design`] never escapes.
use serde::{Deserialize, Serialize};
use uom::si::length::micrometer;

use crate::{
    design::Design,
    error::{LensResult, SeqLensError},
    material::{air, MaterialCatalog},
    micrometer,
    surface::{Surface, SurfaceShape},
};

/// Token encoding a flat radius of curvature in the JSON document form.
///
/// A flat surface is persisted with this explicit sentinel instead of a
/// numeric infinity (which JSON cannot represent anyway).
pub const FLAT_RADIUS_SENTINEL: &str = "<INFINITY>";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum RadiusField {
    Numeric(f64),
    Token(String),
}

/// Persisted form of a single [`Surface`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SurfaceRecord {
    radius_of_curvature: RadiusField,
    #[serde(default)]
    conic_constant: f64,
    aperture_radius: f64,
    thickness: f64,
    material: String,
}

impl SurfaceRecord {
    fn from_surface(surface: &Surface) -> Self {
        let (radius_of_curvature, conic_constant) = match *surface.shape() {
            SurfaceShape::Flat => (RadiusField::Token(FLAT_RADIUS_SENTINEL.to_owned()), 0.0),
            SurfaceShape::Conic {
                radius,
                conic_constant,
            } => (RadiusField::Numeric(radius), conic_constant),
        };
        Self {
            radius_of_curvature,
            conic_constant,
            aperture_radius: surface.aperture_radius(),
            thickness: surface.thickness(),
            material: surface.material().name().to_owned(),
        }
    }
    fn to_surface(&self, catalog: &MaterialCatalog) -> LensResult<Surface> {
        let shape = match &self.radius_of_curvature {
            RadiusField::Numeric(radius) => SurfaceShape::Conic {
                radius: *radius,
                conic_constant: self.conic_constant,
            },
            RadiusField::Token(token) if token == FLAT_RADIUS_SENTINEL => SurfaceShape::Flat,
            RadiusField::Token(token) => {
                return Err(SeqLensError::Configuration(format!(
                    "unknown radius token '{token}'"
                )))
            }
        };
        Surface::new(
            shape,
            self.aperture_radius,
            self.thickness,
            catalog.find(&self.material)?,
        )
    }
}

/// Persisted form of a complete [`Design`].
///
/// The center wavelength is stored in micrometers; materials are stored as
/// name references.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DesignDocument {
    center_wavelength: f64,
    env_beam_radius: f64,
    env_fov_angle: f64,
    env_beam_cross_distance: f64,
    env_image_radius: f64,
    env_initial_material: String,
    surfaces: Vec<SurfaceRecord>,
}

impl DesignDocument {
    /// Create a document from a [`Design`].
    #[must_use]
    pub fn from_design(design: &Design) -> Self {
        Self {
            center_wavelength: design.center_wavelength.get::<micrometer>(),
            env_beam_radius: design.env_beam_radius,
            env_fov_angle: design.env_fov_angle,
            env_beam_cross_distance: design.env_beam_cross_distance,
            env_image_radius: design.env_image_radius,
            env_initial_material: design.env_initial_material.name().to_owned(),
            surfaces: design.surfaces().iter().map(SurfaceRecord::from_surface).collect(),
        }
    }
    /// Rebuild a [`Design`] from this document, resolving all material
    /// references against the given catalog.
    ///
    /// # Errors
    ///
    /// This function returns a [`SeqLensError::Configuration`] if a material
    /// reference cannot be resolved, the wavelength is not positive or a
    /// surface record is invalid.
    pub fn to_design(&self, catalog: &MaterialCatalog) -> LensResult<Design> {
        if self.center_wavelength <= 0.0 || !self.center_wavelength.is_finite() {
            return Err(SeqLensError::Configuration(
                "center wavelength must be positive and finite".into(),
            ));
        }
        let mut design = Design::new();
        design.center_wavelength = micrometer!(self.center_wavelength);
        design.env_beam_radius = self.env_beam_radius;
        design.env_fov_angle = self.env_fov_angle;
        design.env_beam_cross_distance = self.env_beam_cross_distance;
        design.env_image_radius = self.env_image_radius;
        design.env_initial_material = catalog.find(&self.env_initial_material)?;
        for record in &self.surfaces {
            design.add_surface(record.to_surface(catalog)?);
        }
        Ok(design)
    }
    /// Serialize this document to a pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// This function returns an error if JSON serialization fails.
    pub fn to_json_string(&self) -> LensResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SeqLensError::Configuration(format!("serializing design failed: {e}")))
    }
    /// Deserialize a document from a JSON string.
    ///
    /// # Errors
    ///
    /// This function returns a [`SeqLensError::Configuration`] if the given
    /// string is not a valid design document.
    pub fn from_json_string(json: &str) -> LensResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SeqLensError::Configuration(format!("parsing of design failed: {e}")))
    }
}

/// Field accumulator for one surface of a `.len` prescription.
struct LenSurfaceBuilder {
    radius: Option<f64>,
    conic_constant: f64,
    aperture_radius: f64,
    thickness: f64,
    material: std::sync::Arc<crate::material::Material>,
}

impl LenSurfaceBuilder {
    fn new() -> Self {
        Self {
            radius: None,
            conic_constant: 0.0,
            aperture_radius: crate::surface::DEFAULT_APERTURE_RADIUS,
            thickness: 0.0,
            material: air(),
        }
    }
    fn build(self) -> LensResult<Surface> {
        let shape = match self.radius {
            None => SurfaceShape::Flat,
            Some(radius) => SurfaceShape::Conic {
                radius,
                conic_constant: self.conic_constant,
            },
        };
        Surface::new(shape, self.aperture_radius, self.thickness, self.material)
    }
}

fn parse_len_value(keyword: &str, arg: Option<&str>) -> LensResult<f64> {
    let arg = arg.ok_or_else(|| {
        SeqLensError::Configuration(format!("{keyword} record is missing its value"))
    })?;
    arg.parse().map_err(|_| {
        SeqLensError::Configuration(format!("invalid {keyword} value '{arg}'"))
    })
}

/// Import a line-oriented `.len` prescription.
///
/// Parsing begins at the first `NXT` record; each further `NXT` record
/// terminates the surface accumulated so far. Recognized records are
/// `GLA <name>` (material lookup), `AIR`, `RD <radius>` (0 meaning flat),
/// `TH <thickness>`, `AP <aperture radius>` and `CC <conic constant>`; the
/// value is the last whitespace-separated token of the record. Unknown
/// records are logged and ignored. The prescription must be terminated by an
/// `END` record.
///
/// # Errors
///
/// This function returns a [`SeqLensError::Configuration`] if the start
/// marker or `END` record is missing, a value cannot be parsed, a material
/// reference cannot be resolved or the prescription contains no surfaces.
pub fn import_len_str(text: &str, catalog: &MaterialCatalog) -> LensResult<Design> {
    let mut lines = text
        .lines()
        .skip_while(|line| line.split_whitespace().next() != Some("NXT"));
    if lines.next().is_none() {
        return Err(SeqLensError::Configuration(
            "missing initial NXT record".into(),
        ));
    }
    let mut surfaces = Vec::new();
    let mut builder = LenSurfaceBuilder::new();
    let mut terminated = false;
    for line in lines {
        let mut tokens = line.split_whitespace();
        let keyword = tokens.next().unwrap_or("");
        let arg = tokens.last();
        match keyword {
            "GLA" => {
                let name = arg.ok_or_else(|| {
                    SeqLensError::Configuration("GLA record is missing its value".into())
                })?;
                builder.material = catalog.find(name)?;
            }
            "AIR" => builder.material = air(),
            "RD" => {
                let radius = parse_len_value("RD", arg)?;
                // a prescription encodes a flat surface as radius 0
                builder.radius = if radius == 0.0 { None } else { Some(radius) };
            }
            "TH" => builder.thickness = parse_len_value("TH", arg)?,
            "AP" => builder.aperture_radius = parse_len_value("AP", arg)?,
            "CC" => builder.conic_constant = parse_len_value("CC", arg)?,
            "NXT" => {
                surfaces.push(builder.build()?);
                builder = LenSurfaceBuilder::new();
            }
            "END" => {
                terminated = true;
                break;
            }
            _ => log::debug!("ignoring prescription record '{line}'"),
        }
    }
    if !terminated {
        return Err(SeqLensError::Configuration(
            "truncated prescription: missing END record".into(),
        ));
    }
    if surfaces.is_empty() {
        return Err(SeqLensError::Configuration(
            "prescription contains no surfaces".into(),
        ));
    }
    let mut design = Design::new();
    *design.surfaces_mut() = surfaces;
    Ok(design)
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    const PCX_LEN: &str = "\
// example plano-convex lens
LEN demo
NXT 1
RD 98.12
TH 7.45
AP 37.5
GLA PMMA
NXT 2
RD 0.0
TH 10.0
AP 37.5
AIR
NXT 3
END
";

    #[test]
    fn import_len() {
        let catalog = MaterialCatalog::standard();
        let design = import_len_str(PCX_LEN, &catalog).unwrap();
        assert_eq!(design.surfaces().len(), 2);
        let front = &design.surfaces()[0];
        assert_eq!(
            *front.shape(),
            SurfaceShape::Conic {
                radius: 98.12,
                conic_constant: 0.0
            }
        );
        assert_relative_eq!(front.thickness(), 7.45);
        assert_relative_eq!(front.aperture_radius(), 37.5);
        assert_eq!(front.material().name(), "PMMA");
        let back = &design.surfaces()[1];
        assert_eq!(*back.shape(), SurfaceShape::Flat);
        assert_relative_eq!(back.thickness(), 10.0);
        assert_eq!(back.material().name(), "AIR");
    }
    #[test]
    fn import_len_missing_start_marker() {
        let catalog = MaterialCatalog::standard();
        assert_matches!(
            import_len_str("RD 98.12\nEND\n", &catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn import_len_truncated() {
        let catalog = MaterialCatalog::standard();
        assert_matches!(
            import_len_str("NXT 1\nRD 98.12\nNXT 2\n", &catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn import_len_no_surfaces() {
        let catalog = MaterialCatalog::standard();
        assert_matches!(
            import_len_str("NXT 1\nEND\n", &catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn import_len_unknown_material() {
        let catalog = MaterialCatalog::standard();
        assert_matches!(
            import_len_str("NXT 1\nGLA UNOBTAINIUM\nNXT 2\nEND\n", &catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn import_len_invalid_value() {
        let catalog = MaterialCatalog::standard();
        assert_matches!(
            import_len_str("NXT 1\nRD abc\nNXT 2\nEND\n", &catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn import_len_unknown_records_ignored() {
        let catalog = MaterialCatalog::standard();
        let design =
            import_len_str("NXT 1\nFOO bar\nRD 50.0\nNXT 2\nEND\n", &catalog).unwrap();
        assert_eq!(design.surfaces().len(), 1);
    }

    #[test]
    fn json_round_trip() {
        let catalog = MaterialCatalog::standard();
        let pmma = catalog.find("PMMA").unwrap();
        let mut design = Design::new();
        design.add_example_pcx_lens(200.0, 75.0, &pmma, &air()).unwrap();
        let json = DesignDocument::from_design(&design).to_json_string().unwrap();
        // flat radius is persisted as the sentinel token, not as a number
        assert!(json.contains(FLAT_RADIUS_SENTINEL));
        let restored = DesignDocument::from_json_string(&json)
            .unwrap()
            .to_design(&catalog)
            .unwrap();
        assert_eq!(restored.surfaces(), design.surfaces());
        assert_relative_eq!(
            restored.center_wavelength.get::<micrometer>(),
            design.center_wavelength.get::<micrometer>()
        );
        // material references resolve to the shared catalog instances
        assert!(Arc::ptr_eq(restored.surfaces()[0].material(), &pmma));
        assert!(Arc::ptr_eq(restored.surfaces()[1].material(), &air()));
    }
    #[test]
    fn json_unknown_radius_token() {
        let catalog = MaterialCatalog::standard();
        let json = r#"{
            "center_wavelength": 0.58756,
            "env_beam_radius": 1.0,
            "env_fov_angle": 0.0,
            "env_beam_cross_distance": 65.0,
            "env_image_radius": 21.6,
            "env_initial_material": "AIR",
            "surfaces": [{
                "radius_of_curvature": "<NONSENSE>",
                "aperture_radius": 25.0,
                "thickness": 0.0,
                "material": "AIR"
            }]
        }"#;
        let document = DesignDocument::from_json_string(json).unwrap();
        assert_matches!(
            document.to_design(&catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn json_invalid_document() {
        assert_matches!(
            DesignDocument::from_json_string("not json"),
            Err(SeqLensError::Configuration(_))
        );
    }
    #[test]
    fn json_unresolved_material() {
        let catalog = MaterialCatalog::standard();
        let mut design = Design::new();
        design
            .add_example_pcx_lens(200.0, 75.0, &catalog.find("N-BK7").unwrap(), &air())
            .unwrap();
        let document = DesignDocument::from_design(&design);
        // a catalog without the glass cannot resolve the reference
        let empty_catalog = MaterialCatalog::new();
        assert_matches!(
            document.to_design(&empty_catalog),
            Err(SeqLensError::Configuration(_))
        );
    }
}
