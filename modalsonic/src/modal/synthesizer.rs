use super::ModalBasis;
use crate::collision::VertexImpulse;
use crate::config::SynthesizerConfig;
use crate::error::{ModalSonicError, Result};
use crate::math::Mat3;

/// Recurrence coefficients of one mode for a fixed sample interval.
#[derive(Debug, Clone, Copy, Default)]
struct ModeFilter {
    active: bool,
    /// `2·ε·cos θ`
    feedback1: f64,
    /// `ε²`
    feedback2: f64,
    /// Scale from modal force to amplitude at the forced sample
    input_gain: f64,
}

impl ModeFilter {
    fn new(omega: f64, xi: f64, h: f64) -> Self {
        let omega_d = omega * (1.0 - xi * xi).sqrt();
        let decay = (-xi * omega * h).exp();
        let theta = omega_d * h;
        let gamma = xi.asin();
        Self {
            active: true,
            feedback1: 2.0 * decay * theta.cos(),
            feedback2: decay * decay,
            input_gain: 2.0
                * decay
                * ((theta + gamma).cos() - decay * (2.0 * theta + gamma).cos())
                / (3.0 * omega * omega_d),
        }
    }
}

/// Audio samples produced for a physics tick of `dt` at sample interval `h`:
/// `max(1, floor(dt / h))`.
pub fn samples_per_tick(dt: f32, h: f32) -> usize {
    // The slack absorbs f32 rounding in dt and h, e.g. 0.01 s at 44.1 kHz.
    (dt as f64 / h as f64 + 1e-4).floor().max(1.0) as usize
}

/// Bank of per-mode damped oscillators driven by vertex impulses.
///
/// Each mode keeps its three most recent amplitudes in a circular buffer.
/// Impulses received during a tick act as a constant force over the tick's
/// first audio sample; every later sample is the free response.
#[derive(Debug, Clone)]
pub struct ModalSynthesizer {
    basis: ModalBasis,
    config: SynthesizerConfig,
    history: [Vec<f64>; 3],
    latest: usize,
    filters: Vec<ModeFilter>,
    filter_interval: Option<f32>,
    modal_forces: Vec<f64>,
}

impl ModalSynthesizer {
    pub fn new(basis: ModalBasis, config: SynthesizerConfig) -> Self {
        let modes = basis.mode_count();
        Self {
            basis,
            config,
            history: [vec![0.0; modes], vec![0.0; modes], vec![0.0; modes]],
            latest: 0,
            filters: vec![ModeFilter::default(); modes],
            filter_interval: None,
            modal_forces: vec![0.0; modes],
        }
    }

    pub fn basis(&self) -> &ModalBasis {
        &self.basis
    }

    pub fn config(&self) -> SynthesizerConfig {
        self.config
    }

    /// Most recent amplitude of every mode.
    pub fn amplitudes(&self) -> &[f64] {
        &self.history[self.latest]
    }

    /// Number of modes that currently ring.
    pub fn active_mode_count(&self) -> usize {
        let modes = self.basis.mode_count();
        (0..modes)
            .filter(|&i| self.config.is_selected(i, modes) && self.basis.is_underdamped(i))
            .count()
    }

    /// Silences every mode.
    pub fn reset(&mut self) {
        for slot in &mut self.history {
            slot.fill(0.0);
        }
    }

    /// Advances the filter bank by one physics tick.
    ///
    /// Produces `max(1, floor(dt / h))` samples and adds them to the front of
    /// `out`, growing it as needed, so several bodies can share one buffer.
    /// `rotation_inv` maps world-frame impulses into the body frame the mode
    /// shapes live in. Returns the number of samples produced.
    pub fn synthesize(
        &mut self,
        dt: f32,
        impulses: &[VertexImpulse],
        rotation_inv: Mat3,
        h: f32,
        out: &mut Vec<f32>,
    ) -> Result<usize> {
        if !(h > 0.0 && h.is_finite()) {
            return Err(ModalSonicError::InvalidTimeStep(h));
        }
        if !(dt > 0.0 && dt.is_finite()) {
            return Err(ModalSonicError::InvalidTimeStep(dt));
        }

        let samples = samples_per_tick(dt, h);
        if out.len() < samples {
            out.resize(samples, 0.0);
        }

        self.update_filters(h);
        self.accumulate_forces(impulses, rotation_inv, h)?;

        for (k, sample) in out.iter_mut().take(samples).enumerate() {
            let prev = self.latest;
            let prev2 = (self.latest + 2) % 3;
            let next = (self.latest + 1) % 3;

            let mut sum = 0.0f64;
            for (i, filter) in self.filters.iter().enumerate() {
                let q = if filter.active {
                    let mut q = filter.feedback1 * self.history[prev][i]
                        - filter.feedback2 * self.history[prev2][i];
                    if k == 0 {
                        q += filter.input_gain * self.modal_forces[i];
                    }
                    q
                } else {
                    0.0
                };
                self.history[next][i] = q;
                sum += q;
            }
            self.latest = next;

            if !sum.is_finite() {
                return Err(ModalSonicError::NumericalBlowUp(format!(
                    "modal amplitude became non-finite at sample {} of {}",
                    k, samples
                )));
            }
            *sample += sum as f32;
        }

        Ok(samples)
    }

    fn update_filters(&mut self, h: f32) {
        if self.filter_interval == Some(h) {
            return;
        }

        let modes = self.basis.mode_count();
        for (i, filter) in self.filters.iter_mut().enumerate() {
            *filter = if self.config.is_selected(i, modes) && self.basis.is_underdamped(i) {
                ModeFilter::new(self.basis.omega(i), self.basis.damping_ratio(i), h as f64)
            } else {
                ModeFilter::default()
            };
        }
        self.filter_interval = Some(h);

        log::debug!(
            "Modal filters rebuilt for h = {} s: {} of {} modes active",
            h,
            self.filters.iter().filter(|f| f.active).count(),
            modes
        );
    }

    /// Projects this tick's impulses onto every mode as forces over one sample.
    fn accumulate_forces(
        &mut self,
        impulses: &[VertexImpulse],
        rotation_inv: Mat3,
        h: f32,
    ) -> Result<()> {
        self.modal_forces.fill(0.0);
        for impulse in impulses {
            if impulse.vertex >= self.basis.vertex_count() {
                return Err(ModalSonicError::InvalidModalData(format!(
                    "impulse on vertex {} but the modal basis covers {} vertices",
                    impulse.vertex,
                    self.basis.vertex_count()
                )));
            }
            let force = rotation_inv * impulse.impulse / h;
            for (i, modal_force) in self.modal_forces.iter_mut().enumerate() {
                if self.filters[i].active {
                    *modal_force += self.basis.shape(i, impulse.vertex).dot(force) as f64;
                }
            }
        }
        Ok(())
    }
}
