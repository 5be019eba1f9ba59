//! Multilayer stack model and the per-grid calculation workspace.
//!
//! A [`Stack`] describes the physical filter: an incidence medium, a list of
//! layers (front first), a substrate and, when the back side is considered,
//! an exit medium behind a substrate of finite thickness.
//!
//! A [`Workspace`] owns every buffer needed to evaluate a stack on one
//! wavelength grid at one angle: index arrays, the Snell invariant, the
//! pre/post matrix products, amplitudes and ψ coefficients. It is refreshed
//! with [`Workspace::update`] and then answers value and derivative queries.

use std::fmt;
use std::sync::Arc;

use lamina_materials::DispersionModel;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::amplitude::RAndT;
use crate::derivatives::{PrePostMatrices, PsiMatrices};
use crate::matrices::Matrices;
use crate::spectrum::{BacksideSpectra, Spectrum, Substrate};
use crate::types::{
    material_error, Grid, IndexArray, OpticsError, Plane, Polarization, Sin2, SpectralSample,
};

/// One thin film.
#[derive(Debug, Clone)]
pub struct Layer {
    pub material: Arc<dyn DispersionModel>,
    /// Physical thickness (nm).
    pub thickness: f64,
    pub refine_thickness: bool,
    pub refine_index: bool,
    /// When refining the index, scale the thickness so that the optical
    /// thickness at the stack's reference wavelength stays constant.
    pub preserve_ot: bool,
}

impl Layer {
    pub fn new(material: Arc<dyn DispersionModel>, thickness: f64) -> Self {
        Self {
            material,
            thickness,
            refine_thickness: false,
            refine_index: false,
            preserve_ot: false,
        }
    }
}

/// A complete optical filter.
#[derive(Debug, Clone)]
pub struct Stack {
    /// Incidence medium.
    pub medium: Arc<dyn DispersionModel>,
    pub substrate: Arc<dyn DispersionModel>,
    /// Medium behind the substrate, used only with `consider_backside`.
    pub exit: Arc<dyn DispersionModel>,
    /// Substrate thickness (nm).
    pub substrate_thickness: f64,
    pub consider_backside: bool,
    /// Wavelength at which constant optical thickness is enforced (nm).
    pub reference_wavelength: f64,
    /// Layers from the incidence side to the substrate.
    pub layers: Vec<Layer>,
}

/// A refinable scalar of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackParameter {
    Thickness(usize),
    Index(usize),
    /// Index of the layer, with its thickness slaved to keep the optical
    /// thickness constant.
    IndexConstantOt(usize),
}

impl StackParameter {
    pub fn layer(self) -> usize {
        match self {
            StackParameter::Thickness(i)
            | StackParameter::Index(i)
            | StackParameter::IndexConstantOt(i) => i,
        }
    }
}

impl fmt::Display for StackParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackParameter::Thickness(i) => write!(f, "thickness[{i}]"),
            StackParameter::Index(i) => write!(f, "index[{i}]"),
            StackParameter::IndexConstantOt(i) => write!(f, "index_ot[{i}]"),
        }
    }
}

/// Spectral quantity computed by a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Reflectance,
    Transmittance,
    Absorptance,
    ReflectionPhase,
    TransmissionPhase,
    ReflectionGd,
    TransmissionGd,
    ReflectionGdd,
    TransmissionGdd,
}

impl Quantity {
    /// Phase-type quantities exist only for a pure polarization plane.
    pub fn needs_plane(self) -> bool {
        !matches!(
            self,
            Quantity::Reflectance | Quantity::Transmittance | Quantity::Absorptance
        )
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::Reflectance => "reflectance",
            Quantity::Transmittance => "transmittance",
            Quantity::Absorptance => "absorptance",
            Quantity::ReflectionPhase => "reflection phase",
            Quantity::TransmissionPhase => "transmission phase",
            Quantity::ReflectionGd => "reflection GD",
            Quantity::TransmissionGd => "transmission GD",
            Quantity::ReflectionGdd => "reflection GDD",
            Quantity::TransmissionGdd => "transmission GDD",
        };
        f.write_str(name)
    }
}

impl Stack {
    /// A bare substrate in `medium`, with the back side ignored.
    pub fn new(medium: Arc<dyn DispersionModel>, substrate: Arc<dyn DispersionModel>) -> Self {
        Self {
            exit: medium.clone(),
            medium,
            substrate,
            substrate_thickness: 1e6,
            consider_backside: false,
            reference_wavelength: 550.0,
            layers: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), OpticsError> {
        for (i, layer) in self.layers.iter().enumerate() {
            if !(layer.thickness.is_finite() && layer.thickness >= 0.0) {
                return Err(OpticsError::InvalidStack(format!(
                    "layer {i} has invalid thickness {}",
                    layer.thickness
                )));
            }
        }
        let thickness_ok = self.substrate_thickness.is_finite() && self.substrate_thickness >= 0.0;
        if self.consider_backside && !thickness_ok {
            return Err(OpticsError::InvalidStack(format!(
                "invalid substrate thickness {}",
                self.substrate_thickness
            )));
        }
        if !(self.reference_wavelength > 0.0) {
            return Err(OpticsError::InvalidStack(format!(
                "invalid reference wavelength {}",
                self.reference_wavelength
            )));
        }
        Ok(())
    }

    /// Parameters flagged for refinement, in layer order.
    pub fn refinable_parameters(&self) -> Vec<StackParameter> {
        let mut parameters = Vec::new();
        for (i, layer) in self.layers.iter().enumerate() {
            if layer.refine_thickness {
                parameters.push(StackParameter::Thickness(i));
            }
            if layer.refine_index {
                parameters.push(if layer.preserve_ot {
                    StackParameter::IndexConstantOt(i)
                } else {
                    StackParameter::Index(i)
                });
            }
        }
        parameters
    }

    pub fn parameter_value(&self, parameter: StackParameter) -> f64 {
        let layer = &self.layers[parameter.layer()];
        match parameter {
            StackParameter::Thickness(_) => layer.thickness,
            StackParameter::Index(_) | StackParameter::IndexConstantOt(_) => {
                layer.material.parameter()
            }
        }
    }

    pub fn parameter_bounds(&self, parameter: StackParameter) -> (f64, f64) {
        match parameter {
            StackParameter::Thickness(_) => (0.0, f64::INFINITY),
            StackParameter::Index(i) | StackParameter::IndexConstantOt(i) => {
                self.layers[i].material.parameter_bounds()
            }
        }
    }

    pub fn set_parameter(
        &mut self,
        parameter: StackParameter,
        value: f64,
    ) -> Result<(), OpticsError> {
        let reference = self.reference_wavelength;
        let layer = &mut self.layers[parameter.layer()];
        match parameter {
            StackParameter::Thickness(_) => layer.thickness = value,
            StackParameter::Index(_) => layer.material = layer.material.with_parameter(value),
            StackParameter::IndexConstantOt(_) => {
                let before = reference_index(layer.material.as_ref(), reference)?;
                let material = layer.material.with_parameter(value);
                let after = reference_index(material.as_ref(), reference)?;
                layer.thickness *= before.re / after.re;
                layer.material = material;
            }
        }
        Ok(())
    }

    /// R, T, A for `polarization` and the s/p reflection phase, GD and GDD
    /// at every wavelength.
    pub fn spectrum(
        &self,
        wavelengths_nm: &[f64],
        angle_deg: f64,
        polarization: Polarization,
    ) -> Result<Vec<SpectralSample>, OpticsError> {
        let ws = Workspace::new(self, wavelengths_nm, angle_deg)?;
        let reflectance = ws.reflectance(polarization);
        let transmittance = ws.transmittance(polarization);
        let mut absorptance = ws.empty();
        absorptance.calculate_absorptance(&reflectance, &transmittance);

        let [phase_s, phase_p] =
            Plane::BOTH.map(|plane| ws.phase(Quantity::ReflectionPhase, plane));
        let [gd_s, gd_p] = [&phase_s, &phase_p].map(|phase| {
            let mut gd = ws.empty();
            gd.calculate_group_delay(phase);
            gd
        });
        let [gdd_s, gdd_p] = [&gd_s, &gd_p].map(|gd| {
            let mut gdd = ws.empty();
            gdd.calculate_gdd(gd);
            gdd
        });

        Ok((0..wavelengths_nm.len())
            .map(|i| SpectralSample {
                wavelength_nm: wavelengths_nm[i],
                reflectance: reflectance.values()[i],
                transmittance: transmittance.values()[i],
                absorptance: absorptance.values()[i],
                r_phase_s: phase_s.values()[i],
                r_phase_p: phase_p.values()[i],
                gd_s: gd_s.values()[i],
                gd_p: gd_p.values()[i],
                gdd_s: gdd_s.values()[i],
                gdd_p: gdd_p.values()[i],
            })
            .collect())
    }
}

fn reference_index(
    material: &dyn DispersionModel,
    wavelength_nm: f64,
) -> Result<Complex64, OpticsError> {
    material
        .refractive_index(wavelength_nm)
        .map_err(|source| material_error(material, source))
}

/// Buffers and results for one stack on one grid at one angle.
#[derive(Debug, Clone)]
pub struct Workspace {
    grid: Grid,
    angle_deg: f64,
    consider_backside: bool,
    substrate_thickness: f64,

    n_medium: IndexArray,
    n_substrate: IndexArray,
    n_exit: IndexArray,
    n_layers: Vec<IndexArray>,
    sin2: Sin2,

    pre_post: PrePostMatrices,
    front: RAndT,
    front_reverse: RAndT,
    back: RAndT,
    psi: PsiMatrices,
    psi_reverse: PsiMatrices,

    // Derivative scratch space for the current parameter.
    dmi: Matrices,
    dm: Matrices,
    d_front: RAndT,
    d_front_reverse: RAndT,
}

impl Workspace {
    pub fn new(stack: &Stack, wavelengths_nm: &[f64], angle_deg: f64) -> Result<Self, OpticsError> {
        if wavelengths_nm.is_empty() {
            return Err(OpticsError::EmptyGrid);
        }
        if let Some(bad) = wavelengths_nm.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(OpticsError::InvalidStack(format!("invalid wavelength {bad} nm")));
        }
        let grid: Grid = Arc::from(wavelengths_nm);
        let nb_layers = stack.layers.len();
        let unit = IndexArray::constant(grid.clone(), Complex64::new(1.0, 0.0));

        let mut ws = Self {
            angle_deg,
            consider_backside: stack.consider_backside,
            substrate_thickness: stack.substrate_thickness,
            n_medium: unit.clone(),
            n_substrate: unit.clone(),
            n_exit: unit.clone(),
            n_layers: vec![unit.clone(); nb_layers],
            sin2: Sin2::normal_incidence(grid.clone()),
            pre_post: PrePostMatrices::new(grid.clone(), nb_layers),
            front: RAndT::new(grid.clone()),
            front_reverse: RAndT::new(grid.clone()),
            back: RAndT::new(grid.clone()),
            psi: PsiMatrices::new(grid.clone()),
            psi_reverse: PsiMatrices::new(grid.clone()),
            dmi: Matrices::new(grid.clone()),
            dm: Matrices::new(grid.clone()),
            d_front: RAndT::new(grid.clone()),
            d_front_reverse: RAndT::new(grid.clone()),
            grid,
        };
        ws.update(stack)?;
        Ok(ws)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn angle(&self) -> f64 {
        self.angle_deg
    }

    pub fn pre_post(&self) -> &PrePostMatrices {
        &self.pre_post
    }

    pub fn sin2(&self) -> &Sin2 {
        &self.sin2
    }

    pub fn medium_index(&self) -> &IndexArray {
        &self.n_medium
    }

    pub fn substrate_index(&self) -> &IndexArray {
        &self.n_substrate
    }

    /// Amplitudes of the coating between the medium and the substrate.
    pub fn front(&self) -> &RAndT {
        &self.front
    }

    /// Re-evaluate everything for the current state of `stack`.
    pub fn update(&mut self, stack: &Stack) -> Result<(), OpticsError> {
        stack.validate()?;
        if stack.layers.len() != self.pre_post.nb_layers() {
            return Err(OpticsError::InvalidStack(format!(
                "workspace built for {} layers, stack has {}",
                self.pre_post.nb_layers(),
                stack.layers.len()
            )));
        }
        self.consider_backside = stack.consider_backside;
        self.substrate_thickness = stack.substrate_thickness;

        self.n_medium = IndexArray::from_material(stack.medium.as_ref(), self.grid.clone())?;
        self.n_substrate = IndexArray::from_material(stack.substrate.as_ref(), self.grid.clone())?;
        self.sin2 = Sin2::new(&self.n_medium, self.angle_deg);

        for (i, layer) in stack.layers.iter().enumerate() {
            self.n_layers[i] =
                IndexArray::from_material(layer.material.as_ref(), self.grid.clone())?;
            self.pre_post
                .set_layer_matrices(i, &self.n_layers[i], layer.thickness, &self.sin2);
        }
        self.pre_post.multiply();

        let global = self.pre_post.global();
        self.front
            .calculate_r_and_t(global, &self.n_medium, &self.n_substrate, &self.sin2);
        self.psi
            .calculate_psi_matrices(global, &self.n_medium, &self.n_substrate, &self.sin2);

        if self.consider_backside {
            self.n_exit = IndexArray::from_material(stack.exit.as_ref(), self.grid.clone())?;
            self.front_reverse
                .calculate_r_and_t_reverse(global, &self.n_medium, &self.n_substrate, &self.sin2);
            self.psi_reverse.calculate_psi_matrices_reverse(
                global,
                &self.n_medium,
                &self.n_substrate,
                &self.sin2,
            );
            // The back side is a bare interface.
            let bare = Matrices::new(self.grid.clone());
            self.back
                .calculate_r_and_t(&bare, &self.n_substrate, &self.n_exit, &self.sin2);
        }
        Ok(())
    }

    pub fn empty(&self) -> Spectrum {
        Spectrum::new(self.grid.clone())
    }

    fn substrate(&self) -> Substrate<'_> {
        Substrate {
            n: &self.n_substrate,
            thickness: self.substrate_thickness,
            sin2: &self.sin2,
        }
    }

    /// The six intensities entering the backside formulas, for one plane.
    fn side_spectra(&self, plane: Plane) -> [Spectrum; 6] {
        let polarization = Polarization::from(plane);
        let mut r_front = self.empty();
        let mut t_front = self.empty();
        let mut r_front_reverse = self.empty();
        let mut t_front_reverse = self.empty();
        let mut r_back = self.empty();
        let mut t_back = self.empty();
        r_front.calculate_reflectance(&self.front, polarization);
        t_front.calculate_transmittance(
            &self.front,
            &self.n_medium,
            &self.n_substrate,
            &self.sin2,
            polarization,
        );
        r_front_reverse.calculate_reflectance(&self.front_reverse, polarization);
        t_front_reverse.calculate_transmittance(
            &self.front_reverse,
            &self.n_substrate,
            &self.n_medium,
            &self.sin2,
            polarization,
        );
        r_back.calculate_reflectance(&self.back, polarization);
        t_back.calculate_transmittance(
            &self.back,
            &self.n_substrate,
            &self.n_exit,
            &self.sin2,
            polarization,
        );
        [r_front, t_front, r_front_reverse, t_front_reverse, r_back, t_back]
    }

    /// Derivatives of the front intensities for one plane, from the current
    /// parameter's `dr`/`dt`. Back-side entries are zero.
    fn side_derivatives(&self, plane: Plane) -> [Spectrum; 6] {
        let polarization = Polarization::from(plane);
        let mut dr_front = self.empty();
        let mut dt_front = self.empty();
        let mut dr_front_reverse = self.empty();
        let mut dt_front_reverse = self.empty();
        dr_front.calculate_d_reflectance(&self.front, &self.d_front, polarization);
        dt_front.calculate_d_transmittance(
            &self.front,
            &self.d_front,
            &self.n_medium,
            &self.n_substrate,
            &self.sin2,
            polarization,
        );
        dr_front_reverse.calculate_d_reflectance(
            &self.front_reverse,
            &self.d_front_reverse,
            polarization,
        );
        dt_front_reverse.calculate_d_transmittance(
            &self.front_reverse,
            &self.d_front_reverse,
            &self.n_substrate,
            &self.n_medium,
            &self.sin2,
            polarization,
        );
        [dr_front, dt_front, dr_front_reverse, dt_front_reverse, self.empty(), self.empty()]
    }

    fn backside_planes<F>(&self, polarization: Polarization, mut per_plane: F) -> Spectrum
    where
        F: FnMut(Plane) -> Spectrum,
    {
        let s = per_plane(Plane::S);
        let p = per_plane(Plane::P);
        let mut mixed = self.empty();
        mixed.combine(&s, &p, polarization);
        mixed
    }

    pub fn reflectance(&self, polarization: Polarization) -> Spectrum {
        if !self.consider_backside {
            let mut r = self.empty();
            r.calculate_reflectance(&self.front, polarization);
            return r;
        }
        self.backside_planes(polarization, |plane| {
            let sides = self.side_spectra(plane);
            let mut r = self.empty();
            r.calculate_reflectance_with_backside(borrow_sides(&sides), self.substrate());
            r
        })
    }

    pub fn transmittance(&self, polarization: Polarization) -> Spectrum {
        if !self.consider_backside {
            let mut t = self.empty();
            t.calculate_transmittance(
                &self.front,
                &self.n_medium,
                &self.n_substrate,
                &self.sin2,
                polarization,
            );
            return t;
        }
        self.backside_planes(polarization, |plane| {
            let sides = self.side_spectra(plane);
            let mut t = self.empty();
            t.calculate_transmittance_with_backside(borrow_sides(&sides), self.substrate());
            t
        })
    }

    pub fn absorptance(&self, polarization: Polarization) -> Spectrum {
        let mut a = self.empty();
        a.calculate_absorptance(&self.reflectance(polarization), &self.transmittance(polarization));
        a
    }

    /// Reflection or transmission phase of the front coating.
    pub fn phase(&self, quantity: Quantity, plane: Plane) -> Spectrum {
        let mut phase = self.empty();
        match quantity {
            Quantity::TransmissionPhase | Quantity::TransmissionGd | Quantity::TransmissionGdd => {
                phase.calculate_t_phase(&self.front, plane)
            }
            _ => phase.calculate_r_phase(&self.front, plane),
        }
        phase
    }

    /// Any [`Quantity`]. Phase-type quantities need a pure polarization.
    pub fn value(
        &self,
        quantity: Quantity,
        polarization: Polarization,
    ) -> Result<Spectrum, OpticsError> {
        match quantity {
            Quantity::Reflectance => return Ok(self.reflectance(polarization)),
            Quantity::Transmittance => return Ok(self.transmittance(polarization)),
            Quantity::Absorptance => return Ok(self.absorptance(polarization)),
            _ => {}
        }
        let plane = polarization
            .plane()
            .ok_or_else(|| OpticsError::PlaneRequired(quantity.to_string()))?;
        let phase = self.phase(quantity, plane);
        match quantity {
            Quantity::ReflectionPhase | Quantity::TransmissionPhase => Ok(phase),
            Quantity::ReflectionGd | Quantity::TransmissionGd => {
                let mut gd = self.empty();
                gd.calculate_group_delay(&phase);
                Ok(gd)
            }
            _ => {
                let mut gd = self.empty();
                gd.calculate_group_delay(&phase);
                let mut gdd = self.empty();
                gdd.calculate_gdd(&gd);
                Ok(gdd)
            }
        }
    }

    /// Compute `dr`/`dt` (and their reverse when the back side is
    /// considered) for `parameter`. Must follow [`update`](Self::update) on
    /// the same stack.
    pub fn set_parameter_derivative(
        &mut self,
        stack: &Stack,
        parameter: StackParameter,
    ) -> Result<(), OpticsError> {
        let i = parameter.layer();
        let layer = stack
            .layers
            .get(i)
            .ok_or_else(|| OpticsError::InvalidStack(format!("no layer {i}")))?;
        let n = &self.n_layers[i];
        let material = layer.material.as_ref();
        match parameter {
            StackParameter::Thickness(_) => {
                self.dmi.set_dmi_thickness(n, layer.thickness, &self.sin2)
            }
            StackParameter::Index(_) => {
                let dn = IndexArray::derivative_from_material(material, self.grid.clone())?;
                self.dmi.set_dmi_index(n, &dn, layer.thickness, &self.sin2);
            }
            StackParameter::IndexConstantOt(_) => {
                let dn = IndexArray::derivative_from_material(material, self.grid.clone())?;
                let n_ref = reference_index(material, stack.reference_wavelength)?;
                let dn_ref = material
                    .index_derivative(stack.reference_wavelength)
                    .map_err(|source| material_error(material, source))?;
                self.dmi.set_dmi_index_with_constant_ot(
                    n,
                    &dn,
                    layer.thickness,
                    &self.sin2,
                    n_ref,
                    dn_ref,
                );
            }
        }
        self.dm.calculate_dm(&self.dmi, &self.pre_post, i);
        self.d_front.calculate_dr_and_dt(&self.dm, &self.psi);
        if self.consider_backside {
            self.d_front_reverse
                .calculate_dr_and_dt_reverse(&self.dm, &self.psi_reverse);
        }
        Ok(())
    }

    /// Derivative of `quantity` for the parameter last passed to
    /// [`set_parameter_derivative`](Self::set_parameter_derivative).
    pub fn derivative(
        &self,
        quantity: Quantity,
        polarization: Polarization,
    ) -> Result<Spectrum, OpticsError> {
        match quantity {
            Quantity::Reflectance => return Ok(self.d_reflectance(polarization)),
            Quantity::Transmittance => return Ok(self.d_transmittance(polarization)),
            Quantity::Absorptance => {
                let mut da = self.empty();
                da.calculate_d_absorptance(
                    &self.d_reflectance(polarization),
                    &self.d_transmittance(polarization),
                );
                return Ok(da);
            }
            _ => {}
        }
        let plane = polarization
            .plane()
            .ok_or_else(|| OpticsError::PlaneRequired(quantity.to_string()))?;
        let mut d_phase = self.empty();
        match quantity {
            Quantity::TransmissionPhase | Quantity::TransmissionGd | Quantity::TransmissionGdd => {
                d_phase.calculate_dt_phase(&self.front, &self.d_front, plane)
            }
            _ => d_phase.calculate_dr_phase(&self.front, &self.d_front, plane),
        }
        match quantity {
            Quantity::ReflectionPhase | Quantity::TransmissionPhase => Ok(d_phase),
            Quantity::ReflectionGd | Quantity::TransmissionGd => {
                let mut d_gd = self.empty();
                d_gd.calculate_d_group_delay(&d_phase);
                Ok(d_gd)
            }
            _ => {
                let mut d_gd = self.empty();
                d_gd.calculate_d_group_delay(&d_phase);
                let mut d_gdd = self.empty();
                d_gdd.calculate_d_gdd(&d_gd);
                Ok(d_gdd)
            }
        }
    }

    fn d_reflectance(&self, polarization: Polarization) -> Spectrum {
        if !self.consider_backside {
            let mut dr = self.empty();
            dr.calculate_d_reflectance(&self.front, &self.d_front, polarization);
            return dr;
        }
        self.backside_planes(polarization, |plane| {
            let sides = self.side_spectra(plane);
            let derivatives = self.side_derivatives(plane);
            let mut dr = self.empty();
            dr.calculate_d_reflectance_with_backside(
                borrow_sides(&sides),
                borrow_sides(&derivatives),
                self.substrate(),
            );
            dr
        })
    }

    fn d_transmittance(&self, polarization: Polarization) -> Spectrum {
        if !self.consider_backside {
            let mut dt = self.empty();
            dt.calculate_d_transmittance(
                &self.front,
                &self.d_front,
                &self.n_medium,
                &self.n_substrate,
                &self.sin2,
                polarization,
            );
            return dt;
        }
        self.backside_planes(polarization, |plane| {
            let sides = self.side_spectra(plane);
            let derivatives = self.side_derivatives(plane);
            let mut dt = self.empty();
            dt.calculate_d_transmittance_with_backside(
                borrow_sides(&sides),
                borrow_sides(&derivatives),
                self.substrate(),
            );
            dt
        })
    }
}

fn borrow_sides(sides: &[Spectrum; 6]) -> BacksideSpectra<'_> {
    let [r_front, t_front, r_front_reverse, t_front_reverse, r_back, t_back] = sides;
    BacksideSpectra {
        r_front,
        t_front,
        r_front_reverse,
        t_front_reverse,
        r_back,
        t_back,
    }
}
