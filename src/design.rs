#![warn(missing_docs)]
//! An ordered sequence of surfaces plus environment parameters, hosting the
//! system-level algorithms: sequential 3D tracer, paraxial (Meyer-Arendt)
//! system matrix, marginal-ray image-distance solver and autofocus.
//!
//! All analysis operations are pure reads (`&self`); [`Design::autofocus`] is
//! the only operation that mutates a [`Design`], and it only writes the last
//! surface's thickness. The single-writer discipline (no surface edits while
//! a trace or scan runs over the same design) is therefore enforced by the
//! borrow checker.
use std::sync::Arc;

use nalgebra::{Matrix2, Point3, Vector3};
use uom::si::f64::Length;

use crate::{
    error::{LensResult, SeqLensError},
    material::{air, Material},
    micrometer,
    surface::{MeridionalRay, Surface, SurfaceShape},
};

/// Fixed axial start coordinate of the candidate rays of the marginal-ray
/// scan, relative to the first surface vertex.
const MARGINAL_OBJECT_Z: f64 = -50.0;
/// Number of intervals of the marginal-ray height scan.
const MARGINAL_SCAN_STEPS: usize = 1000;

/// One segment of a sequential system trace, in design-global coordinates
/// (origin at the first surface's vertex).
#[derive(Clone, Debug)]
pub struct TraceSegment {
    /// ray position before the trace onto the current surface
    pub src_pt: Point3<f64>,
    /// intersection point on the current surface
    pub dest_pt: Point3<f64>,
    /// the medium crossed between `src_pt` and `dest_pt`
    pub medium: Arc<Material>,
    /// the direction the refracted ray will follow next
    pub refract_dir: Vector3<f64>,
}

/// Result of a full system trace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TraceOutcome {
    /// the ray passed every surface inside its aperture
    Completed,
    /// the ray exceeded at least one surface's aperture radius
    Vignetted,
}

/// Options for [`Design::trace_ray_through_system`].
#[derive(Default)]
pub struct TraceOptions<'a> {
    /// an additional single-use surface appended after the design surfaces
    /// (e.g. a probe image plane). If its thickness is non-zero, it overrides
    /// the thickness of the last real design surface for this call only.
    pub append_surface: Option<&'a Surface>,
    /// proceed with the trace after a ray misses an aperture (diagnostics)
    pub continue_after_ray_miss: bool,
}

/// An ordered prescription of refracting surfaces with environment
/// parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Design {
    surfaces: Vec<Surface>,
    /// design reference wavelength
    pub center_wavelength: Length,
    /// default beam radius for solver sampling
    pub env_beam_radius: f64,
    /// field-of-view half angle of the environment
    pub env_fov_angle: f64,
    /// axial distance at which field beams cross the axis
    pub env_beam_cross_distance: f64,
    /// radius of the nominal image circle
    pub env_image_radius: f64,
    /// ambient medium before the first surface
    pub env_initial_material: Arc<Material>,
}

impl Default for Design {
    fn default() -> Self {
        Self {
            surfaces: Vec::new(),
            center_wavelength: micrometer!(0.58756),
            env_beam_radius: 1.0,
            env_fov_angle: 0.0,
            env_beam_cross_distance: 65.0,
            env_image_radius: 21.6,
            env_initial_material: air(),
        }
    }
}

impl Design {
    /// Create a new, empty [`Design`] with default environment parameters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    /// Returns the ordered surface list of this [`Design`].
    #[must_use]
    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }
    /// Returns a mutable reference to the ordered surface list.
    ///
    /// This is the entry point for an external surface editor; the analysis
    /// operations themselves never mutate the list.
    pub fn surfaces_mut(&mut self) -> &mut Vec<Surface> {
        &mut self.surfaces
    }
    /// Append a surface on the image side of the system.
    pub fn add_surface(&mut self, surface: Surface) {
        self.surfaces.push(surface);
    }

    /// Axial distance from the first surface's vertex to the vertex of
    /// surface `n` (the sum of the first `n` thicknesses).
    #[must_use]
    pub fn distance_to_vertex(&self, n: usize) -> f64 {
        self.surfaces.iter().take(n).map(Surface::thickness).sum()
    }

    /// Append an example plano-convex lens (curved front, flat back) with the
    /// given focal length and diameter, made of `lens_material` and followed
    /// by `ambient_material`.
    ///
    /// Radius and center thickness are rounded to two decimals, matching the
    /// precision of a hand-written prescription.
    ///
    /// # Errors
    ///
    /// This function returns an error if a refractive index cannot be
    /// evaluated at the design wavelength or the resulting surface parameters
    /// are invalid.
    pub fn add_example_pcx_lens(
        &mut self,
        focal_length: f64,
        diameter: f64,
        lens_material: &Arc<Material>,
        ambient_material: &Arc<Material>,
    ) -> LensResult<()> {
        let n_lens = lens_material.refractive_index(self.center_wavelength)?;
        let n_ambient = ambient_material.refractive_index(self.center_wavelength)?;
        let radius = ((n_lens - n_ambient) * focal_length * 100.0).round() / 100.0;
        let mut front = Surface::new(
            SurfaceShape::Conic {
                radius,
                conic_constant: 0.0,
            },
            diameter / 2.0,
            0.0,
            lens_material.clone(),
        )?;
        let thickness = if focal_length > 0.0 {
            front.sag(diameter / 2.0)? - front.sag(0.0)?
        } else {
            2.0
        };
        front.set_thickness((thickness * 100.0).round() / 100.0)?;
        self.surfaces.push(front);
        let back = Surface::new(
            SurfaceShape::Flat,
            diameter / 2.0,
            10.0,
            ambient_material.clone(),
        )?;
        self.surfaces.push(back);
        Ok(())
    }

    /// Build the paraxial (Meyer-Arendt) system matrix of this [`Design`] at
    /// the design wavelength.
    ///
    /// Per surface a refraction matrix `[[1, P], [0, 1]]` with the refractive
    /// power `P = (n2 - n1) / R` (zero for flat surfaces) is built; for every
    /// surface except the last also a reduced-thickness propagation matrix
    /// `[[1, 0], [-t/n2, 1]]`, with `n2` the index of the medium *after* the
    /// surface. All matrices are composed in object-to-image order by
    /// left-multiplying each new matrix onto the running product. The
    /// element `(0, 1)` of the result is the system's equivalent power.
    ///
    /// # Errors
    ///
    /// This function returns an error if the surface list is empty or an
    /// index of refraction cannot be evaluated.
    pub fn meyer_arendt_system_matrix(&self) -> LensResult<Matrix2<f64>> {
        if self.surfaces.is_empty() {
            return Err(SeqLensError::Configuration("surface list is empty".into()));
        }
        let mut last_medium = self.env_initial_material.clone();
        let mut result = Matrix2::identity();
        for (i, surface) in self.surfaces.iter().enumerate() {
            let n1 = last_medium.refractive_index(self.center_wavelength)?;
            let n2 = surface.material().refractive_index(self.center_wavelength)?;
            let power = match surface.shape() {
                SurfaceShape::Flat => 0.0,
                SurfaceShape::Conic { radius, .. } => (n2 - n1) / radius,
            };
            result = Matrix2::new(1.0, power, 0.0, 1.0) * result;
            if i == self.surfaces.len() - 1 {
                break;
            }
            result = Matrix2::new(1.0, 0.0, -surface.thickness() / n2, 1.0) * result;
            last_medium = surface.material().clone();
        }
        Ok(result)
    }
    /// The system's equivalent optical power (the `(0, 1)` element of the
    /// Meyer-Arendt system matrix).
    ///
    /// # Errors
    ///
    /// See [`Design::meyer_arendt_system_matrix`].
    pub fn equivalent_power(&self) -> LensResult<f64> {
        Ok(self.meyer_arendt_system_matrix()?[(0, 1)])
    }
    /// The system's effective focal length (reciprocal of the equivalent
    /// power). An afocal system yields an infinite value.
    ///
    /// # Errors
    ///
    /// See [`Design::meyer_arendt_system_matrix`].
    pub fn effective_focal_length(&self) -> LensResult<f64> {
        Ok(1.0 / self.equivalent_power()?)
    }

    /// Trace a ray from an object point through all surfaces of the design
    /// sequentially.
    ///
    /// `obj_pt` is relative to the first surface's vertex; `ray_dir` is the
    /// initial propagation direction. Results are reported exclusively
    /// through `on_segment`, which is invoked once per surface *before* the
    /// trace state advances, and through the returned [`TraceOutcome`]. By
    /// default the trace aborts at the first vignetted surface (without
    /// invoking the callback for it); with
    /// [`TraceOptions::continue_after_ray_miss`] the callback still fires and
    /// the trace proceeds, but the outcome still reports the miss.
    ///
    /// # Errors
    ///
    /// This function returns an error if the surface list is empty, a surface
    /// intersection does not exist or a refraction totally reflects. Such a
    /// failure aborts only this ray; the design itself is never touched.
    pub fn trace_ray_through_system(
        &self,
        obj_pt: &Point3<f64>,
        ray_dir: &Vector3<f64>,
        options: &TraceOptions,
        mut on_segment: Option<&mut dyn FnMut(&TraceSegment)>,
    ) -> LensResult<TraceOutcome> {
        if self.surfaces.is_empty() {
            return Err(SeqLensError::Configuration("surface list is empty".into()));
        }
        let mut trace_surfaces: Vec<&Surface> = self.surfaces.iter().collect();
        let mut thickness_override = None;
        if let Some(appended) = options.append_surface {
            if appended.thickness() != 0.0 {
                // override the thickness of the last real design surface
                thickness_override = Some((trace_surfaces.len() - 1, appended.thickness()));
            }
            trace_surfaces.push(appended);
        }

        let mut obj_pt = *obj_pt;
        let mut ray_dir = *ray_dir;
        let mut pending_medium = self.env_initial_material.clone();
        let mut pending_thickness = 0.0;
        let mut z = 0.0;
        let mut missed = false;

        for (i, surface) in trace_surfaces.iter().enumerate() {
            let (intersection, refract_dir) =
                surface.trace_ray_3d(&obj_pt, &ray_dir, &pending_medium, self.center_wavelength)?;

            if intersection.x.hypot(intersection.y) > surface.aperture_radius() {
                if !options.continue_after_ray_miss {
                    return Ok(TraceOutcome::Vignetted);
                }
                missed = true;
            }

            if let Some(callback) = on_segment.as_mut() {
                let global_offset = Vector3::new(0.0, 0.0, z + pending_thickness);
                callback(&TraceSegment {
                    src_pt: obj_pt + global_offset,
                    dest_pt: intersection + global_offset,
                    medium: pending_medium.clone(),
                    refract_dir,
                });
            }

            z += pending_thickness;
            pending_thickness = surface.thickness();
            pending_medium = surface.material().clone();
            if let Some((index, thickness)) = thickness_override {
                if i == index {
                    pending_thickness = thickness;
                }
            }

            obj_pt = intersection + Vector3::new(0.0, 0.0, -pending_thickness);
            ray_dir = refract_dir;
        }
        Ok(if missed {
            TraceOutcome::Vignetted
        } else {
            TraceOutcome::Completed
        })
    }

    /// Accumulated optical path length of a single ray from `obj_pt` to its
    /// intersection with the final surface: the sum over all segments of the
    /// exact geometric segment length weighted by the refractive index of the
    /// crossed medium at the design wavelength.
    ///
    /// Returns `Ok(None)` if the ray is vignetted before reaching the final
    /// surface.
    ///
    /// # Errors
    ///
    /// See [`Design::trace_ray_through_system`].
    pub fn optical_path_length(
        &self,
        obj_pt: &Point3<f64>,
        ray_dir: &Vector3<f64>,
    ) -> LensResult<Option<f64>> {
        let wavelength = self.center_wavelength;
        let mut opl = 0.0;
        let mut index_error = None;
        let mut accumulate = |segment: &TraceSegment| {
            match segment.medium.refractive_index(wavelength) {
                Ok(n) => opl += (segment.dest_pt - segment.src_pt).norm() * n,
                Err(e) => {
                    if index_error.is_none() {
                        index_error = Some(e);
                    }
                }
            }
        };
        let outcome = self.trace_ray_through_system(
            obj_pt,
            ray_dir,
            &TraceOptions::default(),
            Some(&mut accumulate),
        )?;
        if let Some(e) = index_error {
            return Err(e);
        }
        Ok(match outcome {
            TraceOutcome::Completed => Some(opl),
            TraceOutcome::Vignetted => None,
        })
    }

    /// Scan collimated candidate rays of increasing height through the system
    /// and return the axial intersection distance of the final segment of the
    /// *largest* ray height that passes all surfaces without vignetting: an
    /// approximate real (non-paraxial) marginal-ray image distance.
    ///
    /// Candidate heights are `h_k = k · (ap₀/limit) / 1000` for `k = 0..=1000`
    /// with `ap₀` the first surface's aperture radius. A candidate that clips
    /// an aperture or fails to refract is discarded and the scan continues;
    /// each completing candidate overwrites the stored result.
    ///
    /// # Errors
    ///
    /// This function returns an error if the surface list is empty or `limit`
    /// is not positive and finite.
    pub fn trace_marginal_ray_to_image_distance(&self, limit: f64) -> LensResult<f64> {
        if self.surfaces.is_empty() {
            return Err(SeqLensError::Configuration("surface list is empty".into()));
        }
        if limit <= 0.0 || !limit.is_finite() {
            return Err(SeqLensError::Configuration(
                "scan limit must be positive and finite".into(),
            ));
        }
        let initial_radius = self.surfaces[0].aperture_radius() / limit;
        let mut image_distance = 0.0;
        'candidates: for k in 0..=MARGINAL_SCAN_STEPS {
            #[allow(clippy::cast_precision_loss)]
            let height = k as f64 * (initial_radius / MARGINAL_SCAN_STEPS as f64);
            let start = MeridionalRay {
                z: MARGINAL_OBJECT_Z,
                y: height,
                angle: 0.0,
            };
            let mut ray = match self.surfaces[0].trace_ray_2d(
                &start,
                &self.env_initial_material,
                self.center_wavelength,
            ) {
                Ok(ray) => ray,
                Err(
                    SeqLensError::Geometry(_)
                    | SeqLensError::TotalInternalReflection(_)
                    | SeqLensError::ApertureMiss(_),
                ) => continue 'candidates,
                Err(e) => return Err(e),
            };
            let mut axial_offset = 0.0;
            for s in 1..self.surfaces.len() {
                axial_offset += self.surfaces[s - 1].thickness();
                let incoming = MeridionalRay {
                    z: ray.z - axial_offset,
                    y: ray.y,
                    angle: ray.angle,
                };
                if incoming.y.abs() > self.surfaces[s - 1].aperture_radius() {
                    continue 'candidates;
                }
                ray = match self.surfaces[s].trace_ray_2d(
                    &incoming,
                    self.surfaces[s - 1].material(),
                    self.center_wavelength,
                ) {
                    Ok(ray) => ray,
                    Err(
                        SeqLensError::Geometry(_)
                        | SeqLensError::TotalInternalReflection(_)
                        | SeqLensError::ApertureMiss(_),
                    ) => continue 'candidates,
                    Err(e) => return Err(e),
                };
                ray.z += axial_offset;
                if s == self.surfaces.len() - 1 {
                    // extrapolate the final segment y = m·x + b to the axis
                    let m = ray.angle.tan();
                    let b = ray.y - m * ray.z;
                    image_distance = -b / m;
                }
            }
        }
        Ok(image_distance)
    }

    /// Refocus the design: move the image plane implied by the last surface's
    /// thickness onto the marginal-ray image distance found by
    /// [`Design::trace_marginal_ray_to_image_distance`] with
    /// `limit = ap₀ / env_beam_radius`.
    ///
    /// This is the only core operation that mutates a [`Design`]; it writes
    /// exactly one field, the last surface's thickness. Returns the computed
    /// image distance.
    ///
    /// # Errors
    ///
    /// This function returns an error if the surface list is empty, the
    /// environment beam radius is not positive or the scan yields no finite
    /// image distance. On error the design is left unchanged.
    pub fn autofocus(&mut self) -> LensResult<f64> {
        if self.surfaces.is_empty() {
            return Err(SeqLensError::Configuration("surface list is empty".into()));
        }
        if self.env_beam_radius <= 0.0 || !self.env_beam_radius.is_finite() {
            return Err(SeqLensError::Configuration(
                "environment beam radius must be positive and finite".into(),
            ));
        }
        let limit = self.surfaces[0].aperture_radius() / self.env_beam_radius;
        let image_distance = self.trace_marginal_ray_to_image_distance(limit)?;
        let last = self.surfaces.len() - 1;
        let offset = self.distance_to_vertex(last);
        self.surfaces[last].set_thickness(image_distance - offset)?;
        Ok(image_distance)
    }
}
