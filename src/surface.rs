#![warn(missing_docs)]
//! A single refracting interface: conic-of-revolution geometry (sag), 2D and
//! 3D ray intersection and vector refraction.
//!
//! All geometric coordinates are plain `f64` lens units (millimeters) with the
//! z axis as the optical axis and the surface vertex at the origin. A conic
//! surface of revolution is described by the implicit relation
//! `z·(2R − (1+k)·z) = x² + y²` with `R` the radius of curvature and `k` the
//! conic constant.
use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use uom::si::f64::Length;

use crate::{
    error::{LensResult, SeqLensError},
    material::{air, Material},
};

/// Default aperture radius of a newly created [`Surface`].
pub const DEFAULT_APERTURE_RADIUS: f64 = 25.0;

/// Shape of a [`Surface`] of revolution.
///
/// A flat surface is a tagged variant of its own instead of a conic with
/// infinite radius, so that no floating-point infinity ever enters the sag or
/// normal formulas.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SurfaceShape {
    /// plane surface perpendicular to the optical axis
    Flat,
    /// conic of revolution around the optical axis
    Conic {
        /// signed radius of curvature (positive: center of curvature on the
        /// image side)
        radius: f64,
        /// conic constant (0 = sphere)
        conic_constant: f64,
    },
}

/// A ray confined to the meridional (y-z) plane.
///
/// `z` is the axial coordinate relative to the vertex of the surface being
/// traced, `y` the ray height and `angle` the ray angle measured from the
/// optical axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeridionalRay {
    /// axial coordinate relative to the target surface vertex
    pub z: f64,
    /// ray height above the optical axis
    pub y: f64,
    /// ray angle measured from the optical axis
    pub angle: f64,
}

/// A single refracting interface of a sequential system.
///
/// The stored material is the medium occupying the space *after* this surface
/// (toward the image side); `thickness` is the axial distance from this
/// surface's vertex to the vertex of the next one.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    shape: SurfaceShape,
    aperture_radius: f64,
    thickness: f64,
    material: Arc<Material>,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            shape: SurfaceShape::Flat,
            aperture_radius: DEFAULT_APERTURE_RADIUS,
            thickness: 0.0,
            material: air(),
        }
    }
}

impl Surface {
    /// Create a new [`Surface`].
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///  - the aperture radius is not positive or not finite
    ///  - the thickness is not finite
    ///  - the shape is conic with a zero or non-finite radius or a non-finite
    ///    conic constant
    pub fn new(
        shape: SurfaceShape,
        aperture_radius: f64,
        thickness: f64,
        material: Arc<Material>,
    ) -> LensResult<Self> {
        if let SurfaceShape::Conic {
            radius,
            conic_constant,
        } = shape
        {
            if radius == 0.0 || !radius.is_finite() {
                return Err(SeqLensError::Configuration(
                    "conic radius of curvature must be non-zero and finite".into(),
                ));
            }
            if !conic_constant.is_finite() {
                return Err(SeqLensError::Configuration(
                    "conic constant must be finite".into(),
                ));
            }
        }
        if aperture_radius <= 0.0 || !aperture_radius.is_finite() {
            return Err(SeqLensError::Configuration(
                "aperture radius must be positive and finite".into(),
            ));
        }
        if !thickness.is_finite() {
            return Err(SeqLensError::Configuration(
                "thickness must be finite".into(),
            ));
        }
        Ok(Self {
            shape,
            aperture_radius,
            thickness,
            material,
        })
    }
    /// Returns the shape of this [`Surface`].
    #[must_use]
    pub const fn shape(&self) -> &SurfaceShape {
        &self.shape
    }
    /// Returns the aperture radius of this [`Surface`].
    #[must_use]
    pub const fn aperture_radius(&self) -> f64 {
        self.aperture_radius
    }
    /// Returns the thickness (vertex-to-vertex distance to the next surface)
    /// of this [`Surface`].
    #[must_use]
    pub const fn thickness(&self) -> f64 {
        self.thickness
    }
    /// Returns the medium on the image side of this [`Surface`].
    #[must_use]
    pub const fn material(&self) -> &Arc<Material> {
        &self.material
    }
    /// Sets the thickness of this [`Surface`].
    ///
    /// # Errors
    ///
    /// This function returns an error if the given thickness is not finite.
    pub fn set_thickness(&mut self, thickness: f64) -> LensResult<()> {
        if !thickness.is_finite() {
            return Err(SeqLensError::Configuration(
                "thickness must be finite".into(),
            ));
        }
        self.thickness = thickness;
        Ok(())
    }
    /// Sets the medium on the image side of this [`Surface`].
    pub fn set_material(&mut self, material: Arc<Material>) {
        self.material = material;
    }

    /// Axial displacement of the surface profile at radial distance `r` from
    /// the vertex.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///  - `r` is negative or not finite
    ///  - the surface is geometrically undefined at `r`, i.e.
    ///    `(1+k)·r²/R² > 1` ([`SeqLensError::Geometry`]; checked before the
    ///    aperture)
    ///  - `r` exceeds the aperture radius ([`SeqLensError::ApertureMiss`])
    pub fn sag(&self, r: f64) -> LensResult<f64> {
        if r < 0.0 || !r.is_finite() {
            return Err(SeqLensError::Geometry(
                "radial distance must be >=0 and finite".into(),
            ));
        }
        match self.shape {
            SurfaceShape::Flat => {
                self.check_aperture(r)?;
                Ok(0.0)
            }
            SurfaceShape::Conic {
                radius,
                conic_constant,
            } => {
                let radicand = 1.0 - (1.0 + conic_constant) * r * r / (radius * radius);
                if radicand < 0.0 {
                    return Err(SeqLensError::Geometry(format!(
                        "surface is undefined at radial distance {r}"
                    )));
                }
                self.check_aperture(r)?;
                Ok(r * r / (radius * (1.0 + radicand.sqrt())))
            }
        }
    }
    fn check_aperture(&self, r: f64) -> LensResult<()> {
        if r > self.aperture_radius {
            return Err(SeqLensError::ApertureMiss(format!(
                "radial distance {r} exceeds aperture radius {}",
                self.aperture_radius
            )));
        }
        Ok(())
    }

    /// Trace a meridional ray onto this surface and refract it.
    ///
    /// The incoming ray coordinates are relative to this surface's vertex;
    /// `medium` is the medium the ray travels in before hitting the surface.
    /// The returned ray starts at the intersection point (again relative to
    /// the vertex) with the refracted angle.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///  - an index of refraction cannot be evaluated at the given wavelength
    ///  - the ray does not intersect the surface ([`SeqLensError::Geometry`])
    ///  - no real refraction angle exists
    ///    ([`SeqLensError::TotalInternalReflection`])
    pub fn trace_ray_2d(
        &self,
        ray: &MeridionalRay,
        medium: &Material,
        wavelength: Length,
    ) -> LensResult<MeridionalRay> {
        let n1 = medium.refractive_index(wavelength)?;
        let n2 = self.material.refractive_index(wavelength)?;
        let slope = ray.angle.tan();
        // ray height extrapolated to the vertex plane
        let y_at_vertex = ray.y - slope * ray.z;
        let (z_int, y_int, normal_tilt) = match self.shape {
            SurfaceShape::Flat => (0.0, y_at_vertex, 0.0),
            SurfaceShape::Conic {
                radius,
                conic_constant,
            } => {
                let z_int = intersect_conic_meridional(radius, conic_constant, slope, y_at_vertex)?;
                let y_int = slope * z_int + y_at_vertex;
                // the surface normal line, tilted against the optical axis
                let tilt = (y_int / ((1.0 + conic_constant) * z_int - radius)).atan();
                (z_int, y_int, tilt)
            }
        };
        let theta1 = ray.angle - normal_tilt;
        let sin_theta2 = n1 / n2 * theta1.sin();
        if sin_theta2.abs() > 1.0 {
            return Err(SeqLensError::TotalInternalReflection(format!(
                "no real refraction angle for incidence angle {theta1}"
            )));
        }
        Ok(MeridionalRay {
            z: z_int,
            y: y_int,
            angle: normal_tilt + sin_theta2.asin(),
        })
    }

    /// Trace a skew ray onto this surface and refract it (vector Snell's law).
    ///
    /// `obj_pt` is the ray starting point relative to this surface's vertex
    /// and `ray_dir` the propagation direction (normalized internally). The
    /// returned intersection point is again relative to the vertex; the
    /// returned direction is the refracted unit direction. No aperture check
    /// is performed here; vignetting is the system tracer's responsibility.
    ///
    /// # Errors
    ///
    /// This function returns an error if
    ///  - an index of refraction cannot be evaluated at the given wavelength
    ///  - the direction vector has zero length or the ray does not intersect
    ///    the surface ([`SeqLensError::Geometry`])
    ///  - no real refracted direction exists
    ///    ([`SeqLensError::TotalInternalReflection`])
    pub fn trace_ray_3d(
        &self,
        obj_pt: &Point3<f64>,
        ray_dir: &Vector3<f64>,
        medium: &Material,
        wavelength: Length,
    ) -> LensResult<(Point3<f64>, Vector3<f64>)> {
        let n1 = medium.refractive_index(wavelength)?;
        let n2 = self.material.refractive_index(wavelength)?;
        if ray_dir.norm() == 0.0 {
            return Err(SeqLensError::Geometry(
                "length of direction vector must be >0".into(),
            ));
        }
        let dir = ray_dir.normalize();
        let (intersection, normal) = match self.shape {
            SurfaceShape::Flat => {
                if dir.z.abs() < f64::EPSILON {
                    return Err(SeqLensError::Geometry(
                        "ray propagates parallel to a flat surface".into(),
                    ));
                }
                let t = -obj_pt.z / dir.z;
                (obj_pt + t * dir, Vector3::z())
            }
            SurfaceShape::Conic {
                radius,
                conic_constant,
            } => {
                let t = intersect_conic_skew(radius, conic_constant, obj_pt, &dir)?;
                let q = obj_pt + t * dir;
                let normal =
                    Vector3::new(-q.x, -q.y, radius - (1.0 + conic_constant) * q.z).normalize();
                (q, normal)
            }
        };
        // orient the normal against the incoming ray
        let normal = if normal.dot(&dir) > 0.0 { -normal } else { normal };
        let mu = n1 / n2;
        let cos_theta1 = -normal.dot(&dir);
        let radicand = 1.0 - mu * mu * (1.0 - cos_theta1 * cos_theta1);
        if radicand < 0.0 {
            return Err(SeqLensError::TotalInternalReflection(
                "no real refracted direction exists".into(),
            ));
        }
        let cos_theta2 = radicand.sqrt();
        let refract_dir = mu * dir + (mu * cos_theta1 - cos_theta2) * normal;
        Ok((intersection, refract_dir))
    }
}

/// Solve the meridional conic/line intersection `z·(2R − (1+k)·z) = y²` for
/// the axial coordinate of the first intersection (the branch closest to the
/// vertex plane).
fn intersect_conic_meridional(
    radius: f64,
    conic_constant: f64,
    slope: f64,
    y_at_vertex: f64,
) -> LensResult<f64> {
    let a = (1.0 + conic_constant) + slope * slope;
    let b = 2.0 * (slope * y_at_vertex - radius);
    let c = y_at_vertex * y_at_vertex;
    solve_near_vertex_root(a, b, c, |z| z)
}

/// Solve the skew ray/conic-of-revolution intersection for the ray parameter
/// of the intersection closest to the vertex plane.
fn intersect_conic_skew(
    radius: f64,
    conic_constant: f64,
    obj_pt: &Point3<f64>,
    dir: &Vector3<f64>,
) -> LensResult<f64> {
    let kp1 = 1.0 + conic_constant;
    let a = dir.x * dir.x + dir.y * dir.y + kp1 * dir.z * dir.z;
    let b = 2.0 * (obj_pt.x * dir.x + obj_pt.y * dir.y + kp1 * obj_pt.z * dir.z - radius * dir.z);
    let c = obj_pt.x * obj_pt.x + obj_pt.y * obj_pt.y + kp1 * obj_pt.z * obj_pt.z
        - 2.0 * radius * obj_pt.z;
    solve_near_vertex_root(a, b, c, |t| obj_pt.z + t * dir.z)
}

/// Solve `a·x² + b·x + c = 0` and return the root whose axial intersection
/// coordinate (as computed by `axial_of`) lies closest to the vertex plane.
fn solve_near_vertex_root(
    a: f64,
    b: f64,
    c: f64,
    axial_of: impl Fn(f64) -> f64,
) -> LensResult<f64> {
    if a.abs() < f64::EPSILON {
        // degenerates to a linear equation (e.g. axial ray onto a parabola)
        if b.abs() < f64::EPSILON {
            return Err(SeqLensError::Geometry(
                "ray does not intersect the surface".into(),
            ));
        }
        return Ok(-c / b);
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Err(SeqLensError::Geometry(
            "ray does not intersect the surface".into(),
        ));
    }
    let sqrt_d = discriminant.sqrt();
    let x1 = (-b + sqrt_d) / (2.0 * a);
    let x2 = (-b - sqrt_d) / (2.0 * a);
    if axial_of(x1).abs() < axial_of(x2).abs() {
        Ok(x1)
    } else {
        Ok(x2)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::material::MaterialCatalog;
    use crate::micrometer;
    use approx::assert_relative_eq;
    use assert_matches::assert_matches;

    fn wvl() -> Length {
        micrometer!(0.58756)
    }
    fn glass() -> Arc<Material> {
        MaterialCatalog::standard().find("N-BK7").unwrap()
    }
    fn sphere(radius: f64, aperture: f64, material: Arc<Material>) -> Surface {
        Surface::new(
            SurfaceShape::Conic {
                radius,
                conic_constant: 0.0,
            },
            aperture,
            0.0,
            material,
        )
        .unwrap()
    }

    #[test]
    fn new() {
        assert!(Surface::new(SurfaceShape::Flat, 0.0, 0.0, air()).is_err());
        assert!(Surface::new(SurfaceShape::Flat, -1.0, 0.0, air()).is_err());
        assert!(Surface::new(SurfaceShape::Flat, f64::NAN, 0.0, air()).is_err());
        assert!(Surface::new(SurfaceShape::Flat, 1.0, f64::INFINITY, air()).is_err());
        assert!(Surface::new(
            SurfaceShape::Conic {
                radius: 0.0,
                conic_constant: 0.0
            },
            1.0,
            0.0,
            air()
        )
        .is_err());
        assert!(Surface::new(
            SurfaceShape::Conic {
                radius: 10.0,
                conic_constant: f64::NAN
            },
            1.0,
            0.0,
            air()
        )
        .is_err());
        assert!(Surface::new(SurfaceShape::Flat, 1.0, 0.0, air()).is_ok());
    }
    #[test]
    fn default() {
        let s = Surface::default();
        assert_eq!(*s.shape(), SurfaceShape::Flat);
        assert_relative_eq!(s.aperture_radius(), DEFAULT_APERTURE_RADIUS);
        assert_relative_eq!(s.thickness(), 0.0);
        assert_eq!(s.material().name(), "AIR");
    }
    #[test]
    fn sag_flat() {
        let s = Surface::default();
        for r in [0.0, 1.0, 12.5, 25.0] {
            assert_relative_eq!(s.sag(r).unwrap(), 0.0);
        }
        assert_matches!(s.sag(-1.0), Err(SeqLensError::Geometry(_)));
        assert_matches!(s.sag(26.0), Err(SeqLensError::ApertureMiss(_)));
    }
    #[test]
    fn sag_sphere() {
        let s = sphere(100.0, 25.0, glass());
        assert_relative_eq!(s.sag(0.0).unwrap(), 0.0);
        // exact spherical sag: R - sqrt(R² - r²)
        assert_relative_eq!(
            s.sag(10.0).unwrap(),
            100.0 - (100.0_f64 * 100.0 - 100.0).sqrt(),
            max_relative = 1e-12
        );
        // negative radius curves the other way
        let s = sphere(-100.0, 25.0, glass());
        assert!(s.sag(10.0).unwrap() < 0.0);
    }
    #[test]
    fn sag_parabola() {
        let s = Surface::new(
            SurfaceShape::Conic {
                radius: 50.0,
                conic_constant: -1.0,
            },
            25.0,
            0.0,
            glass(),
        )
        .unwrap();
        assert_relative_eq!(s.sag(10.0).unwrap(), 100.0 / (2.0 * 50.0), max_relative = 1e-12);
    }
    #[test]
    fn sag_domain_checked_before_aperture() {
        // r = 15 is outside the conic domain of a R=10 sphere but inside the
        // (overly large) aperture
        let s = sphere(10.0, 25.0, glass());
        assert_matches!(s.sag(15.0), Err(SeqLensError::Geometry(_)));
        // r = 30 is a valid conic radius but vignetted
        let s = sphere(100.0, 25.0, glass());
        assert_matches!(s.sag(30.0), Err(SeqLensError::ApertureMiss(_)));
    }

    #[test]
    fn trace_2d_on_axis_stays_on_axis() {
        let ray = MeridionalRay {
            z: -50.0,
            y: 0.0,
            angle: 0.0,
        };
        for s in [sphere(100.0, 25.0, glass()), Surface::default()] {
            let out = s.trace_ray_2d(&ray, &air(), wvl()).unwrap();
            assert_relative_eq!(out.z, 0.0);
            assert_relative_eq!(out.y, 0.0);
            assert_relative_eq!(out.angle, 0.0);
        }
    }
    #[test]
    fn trace_2d_flat_snell() {
        let s = Surface::new(SurfaceShape::Flat, 25.0, 0.0, glass()).unwrap();
        let theta1 = 30.0_f64.to_radians();
        let ray = MeridionalRay {
            z: -10.0,
            y: 0.0,
            angle: theta1,
        };
        let out = s.trace_ray_2d(&ray, &air(), wvl()).unwrap();
        let n2 = glass().refractive_index(wvl()).unwrap();
        assert_relative_eq!(out.angle, (theta1.sin() / n2).asin(), max_relative = 1e-12);
        assert_relative_eq!(out.z, 0.0);
        assert_relative_eq!(out.y, 10.0 * theta1.tan(), max_relative = 1e-12);
    }
    #[test]
    fn trace_2d_snell_invariant_on_sphere() {
        let s = sphere(50.0, 25.0, glass());
        let ray = MeridionalRay {
            z: -20.0,
            y: 10.0,
            angle: 0.1,
        };
        let out = s.trace_ray_2d(&ray, &air(), wvl()).unwrap();
        let n1 = 1.0;
        let n2 = glass().refractive_index(wvl()).unwrap();
        // reconstruct the normal tilt at the intersection point
        let tilt = (out.y / (out.z - 50.0)).atan();
        assert_relative_eq!(
            n1 * (ray.angle - tilt).sin(),
            n2 * (out.angle - tilt).sin(),
            max_relative = 1e-9
        );
    }
    #[test]
    fn trace_2d_total_internal_reflection() {
        // glass to air beyond the critical angle
        let s = Surface::new(SurfaceShape::Flat, 25.0, 0.0, air()).unwrap();
        let ray = MeridionalRay {
            z: -10.0,
            y: 0.0,
            angle: 50.0_f64.to_radians(),
        };
        assert_matches!(
            s.trace_ray_2d(&ray, &glass(), wvl()),
            Err(SeqLensError::TotalInternalReflection(_))
        );
    }
    #[test]
    fn trace_2d_miss() {
        let s = sphere(10.0, 25.0, glass());
        let ray = MeridionalRay {
            z: -50.0,
            y: 15.0,
            angle: 0.0,
        };
        assert_matches!(
            s.trace_ray_2d(&ray, &air(), wvl()),
            Err(SeqLensError::Geometry(_))
        );
    }

    #[test]
    fn trace_3d_flat_straight_through() {
        let s = Surface::new(SurfaceShape::Flat, 25.0, 0.0, glass()).unwrap();
        let (point, dir) = s
            .trace_ray_3d(&Point3::new(0.0, 0.0, -10.0), &Vector3::z(), &air(), wvl())
            .unwrap();
        assert_relative_eq!((point - Point3::origin()).norm(), 0.0);
        assert_relative_eq!((dir - Vector3::z()).norm(), 0.0, epsilon = 1e-12);
    }
    #[test]
    fn trace_3d_refracted_direction_is_unit() {
        let s = sphere(50.0, 25.0, glass());
        let (_, dir) = s
            .trace_ray_3d(
                &Point3::new(3.0, 10.0, -20.0),
                &Vector3::new(0.05, 0.1, 1.0),
                &air(),
                wvl(),
            )
            .unwrap();
        assert_relative_eq!(dir.norm(), 1.0, max_relative = 1e-12);
    }
    #[test]
    fn trace_3d_matches_2d_in_meridional_plane() {
        let s = sphere(50.0, 25.0, glass());
        let angle = 0.1_f64;
        let ray = MeridionalRay {
            z: -20.0,
            y: 10.0,
            angle,
        };
        let out2d = s.trace_ray_2d(&ray, &air(), wvl()).unwrap();
        let (point, dir) = s
            .trace_ray_3d(
                &Point3::new(0.0, 10.0, -20.0),
                &Vector3::new(0.0, angle.sin(), angle.cos()),
                &air(),
                wvl(),
            )
            .unwrap();
        assert_relative_eq!(point.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(point.y, out2d.y, max_relative = 1e-9);
        assert_relative_eq!(point.z, out2d.z, max_relative = 1e-9);
        assert_relative_eq!(dir.y.atan2(dir.z), out2d.angle, max_relative = 1e-9);
    }
    #[test]
    fn trace_3d_snell_invariant_skew() {
        let s = sphere(50.0, 25.0, glass());
        let dir_in = Vector3::new(0.05, 0.1, 1.0).normalize();
        let (point, dir_out) = s
            .trace_ray_3d(&Point3::new(3.0, 10.0, -20.0), &dir_in, &air(), wvl())
            .unwrap();
        let normal = Vector3::new(-point.x, -point.y, 50.0 - point.z).normalize();
        let n1 = 1.0;
        let n2 = glass().refractive_index(wvl()).unwrap();
        let sin_theta1 = normal.cross(&dir_in).norm();
        let sin_theta2 = normal.cross(&dir_out).norm();
        assert_relative_eq!(n1 * sin_theta1, n2 * sin_theta2, max_relative = 1e-9);
    }
    #[test]
    fn trace_3d_total_internal_reflection() {
        let s = Surface::new(SurfaceShape::Flat, 25.0, 0.0, air()).unwrap();
        let angle = 50.0_f64.to_radians();
        assert_matches!(
            s.trace_ray_3d(
                &Point3::new(0.0, 0.0, -10.0),
                &Vector3::new(0.0, angle.sin(), angle.cos()),
                &glass(),
                wvl()
            ),
            Err(SeqLensError::TotalInternalReflection(_))
        );
    }
    #[test]
    fn trace_3d_zero_direction() {
        let s = Surface::default();
        assert_matches!(
            s.trace_ray_3d(
                &Point3::new(0.0, 0.0, -10.0),
                &Vector3::zeros(),
                &air(),
                wvl()
            ),
            Err(SeqLensError::Geometry(_))
        );
    }
}
