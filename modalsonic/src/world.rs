//! Simulation world: bodies, the per-tick pipeline and the event channel.

use crate::body::RigidBody;
use crate::collision::{Boundary, CollisionResolver};
use crate::config::ModalSonicWorldDesc;
use crate::error::Result;
use crate::events::ModalSonicEvent;
use crate::handoff::{PushReport, SampleQueue};
use crate::math::Vec3;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

/// Lightweight, type-safe handle for rigid bodies.
///
/// Returned when adding a body to the world.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyId(pub(crate) u64);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BodyId({})", self.0)
    }
}

/// Summary of one simulation tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickReport {
    /// Time step actually integrated, after clamping
    pub dt: f32,
    /// Collision impulses applied across all bodies
    pub impulses: usize,
    /// Audio frames synthesized
    pub frames: usize,
    /// True if any body's collision loop was cut off
    pub iteration_limit_hit: bool,
    /// Largest output sample magnitude, after gain
    pub peak: f32,
    pub push: PushReport,
}

/// Rigid bodies inside a static box, rendered to sound as they collide.
///
/// `ModalSonicWorld` runs on the simulation thread. Each [`tick`](Self::tick)
/// integrates every body, synthesizes the impact sound of the tick and
/// publishes it to a [`SampleQueue`] that the audio thread drains through
/// [`ModalSonicEngine`](crate::engine::ModalSonicEngine).
///
/// # Architecture
///
/// - **Simulation thread**: owns the world, calls `tick` once per frame
/// - **Audio thread**: pops samples from the shared queue, never blocking
pub struct ModalSonicWorld {
    desc: ModalSonicWorldDesc,
    bodies: Vec<(BodyId, RigidBody)>,
    next_body_id: u64,
    resolver: CollisionResolver,
    queue: Arc<SampleQueue>,
    amplitudes: Vec<f32>,
    output: Vec<f32>,
    event_sender: Sender<ModalSonicEvent>,
    event_receiver: Receiver<ModalSonicEvent>,
}

impl ModalSonicWorld {
    pub fn new(desc: ModalSonicWorldDesc, boundary: Boundary) -> Result<Self> {
        desc.validate()?;

        let queue = Arc::new(SampleQueue::new(
            desc.queue_capacity(),
            desc.channels,
            desc.pad_samples(),
            desc.silence_threshold,
        ));
        let resolver =
            CollisionResolver::new(boundary, desc.restitution, desc.max_collision_iterations);
        let (event_sender, event_receiver) = crossbeam_channel::unbounded();

        log::info!(
            "Created world: {} Hz, {} channels, boundary {:?} to {:?}",
            desc.sample_rate,
            desc.channels,
            boundary.min(),
            boundary.max()
        );

        Ok(Self {
            desc,
            bodies: Vec::new(),
            next_body_id: 0,
            resolver,
            queue,
            amplitudes: Vec::new(),
            output: Vec::new(),
            event_sender,
            event_receiver,
        })
    }

    pub fn desc(&self) -> &ModalSonicWorldDesc {
        &self.desc
    }

    pub fn boundary(&self) -> &Boundary {
        self.resolver.boundary()
    }

    /// Shared handle to the queue the audio thread pops from.
    pub fn queue(&self) -> Arc<SampleQueue> {
        self.queue.clone()
    }

    /// Sender for other components, such as the audio engine, to report
    /// through [`poll_events`](Self::poll_events).
    pub fn event_sender(&self) -> Sender<ModalSonicEvent> {
        self.event_sender.clone()
    }

    /// Adds a body and returns its handle.
    ///
    /// A body whose center starts outside the boundary is still added, with a
    /// warning.
    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        let id = BodyId(self.next_body_id);
        self.next_body_id += 1;
        if !self.boundary().contains(body.position()) {
            log::warn!(
                "{} starts outside the boundary at {:?}",
                id,
                body.position()
            );
        }
        self.bodies.push((id, body));
        log::debug!("Added {} ({} bodies)", id, self.bodies.len());
        id
    }

    pub fn remove_body(&mut self, id: BodyId) -> Option<RigidBody> {
        let index = self.bodies.iter().position(|(body_id, _)| *body_id == id)?;
        Some(self.bodies.remove(index).1)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies
            .iter()
            .find(|(body_id, _)| *body_id == id)
            .map(|(_, body)| body)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies
            .iter_mut()
            .find(|(body_id, _)| *body_id == id)
            .map(|(_, body)| body)
    }

    pub fn body_ids(&self) -> Vec<BodyId> {
        self.bodies.iter().map(|(id, _)| *id).collect()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Advances the simulation by `frame_dt` seconds, clamped to the
    /// configured maximum step.
    ///
    /// Every body receives gravity plus `external_force`, has its wall
    /// contacts resolved and is integrated; the sound of the tick is summed
    /// over all bodies and pushed to the sample queue. A non-positive
    /// `frame_dt` does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`NumericalBlowUp`](crate::error::ModalSonicError::NumericalBlowUp)
    /// when a body's state or a modal amplitude stops being finite. The world
    /// should not be ticked again after that.
    pub fn tick(&mut self, frame_dt: f32, external_force: Vec3) -> Result<TickReport> {
        if !(frame_dt > 0.0) {
            return Ok(TickReport::default());
        }
        let dt = frame_dt.min(self.desc.max_time_step);

        let h = self.desc.sample_interval();
        let mut report = TickReport {
            dt,
            ..TickReport::default()
        };

        self.amplitudes.clear();
        for (id, body) in &mut self.bodies {
            body.apply_force(self.desc.gravity * body.mass() + external_force, dt);

            let resolution = self.resolver.resolve(body, dt);
            for impact in &resolution.impacts {
                emit(
                    &self.event_sender,
                    ModalSonicEvent::Impact {
                        body_id: *id,
                        vertex: impact.impulse.vertex,
                        wall: impact.wall,
                        impulse: impact.impulse.impulse,
                    },
                );
            }
            if resolution.iteration_limit_hit {
                report.iteration_limit_hit = true;
                emit(
                    &self.event_sender,
                    ModalSonicEvent::CollisionIterationLimit {
                        body_id: *id,
                        iterations: resolution.impacts.len(),
                    },
                );
            }
            report.impulses += resolution.impacts.len();

            body.step(dt)?;
            body.step_w(dt)?;

            let frames = body.step_audio(dt, &resolution.impulses(), h, &mut self.amplitudes)?;
            report.frames = report.frames.max(frames);
        }

        self.render_output(report.frames, &mut report);

        report.push = self.queue.push(&self.output, self.desc.pad_samples());
        if report.push.dropped > 0 {
            emit(
                &self.event_sender,
                ModalSonicEvent::QueueOverflow {
                    dropped: report.push.dropped,
                },
            );
        }

        log::debug!(
            "Tick dt {}: {} impulses, {} frames, peak {}, queue {}",
            dt,
            report.impulses,
            report.frames,
            report.peak,
            self.queue.len()
        );

        Ok(report)
    }

    /// Drains every event emitted since the last call.
    pub fn poll_events(&self) -> Vec<ModalSonicEvent> {
        self.event_receiver.try_iter().collect()
    }

    /// Scales the summed amplitudes into interleaved output samples.
    fn render_output(&mut self, frames: usize, report: &mut TickReport) {
        let channels = self.desc.channels as usize;
        let gain = self.desc.output_gain;

        self.output.clear();
        self.output.reserve(frames * channels);
        for &amplitude in self.amplitudes.iter().take(frames) {
            let sample = gain * amplitude;
            report.peak = report.peak.max(sample.abs());
            self.output.extend(std::iter::repeat_n(sample, channels));
        }

        if report.peak > 1.0 {
            log::warn!("Output clipped: peak sample magnitude {}", report.peak);
            emit(
                &self.event_sender,
                ModalSonicEvent::OutputClipped { peak: report.peak },
            );
        }
    }
}

fn emit(sender: &Sender<ModalSonicEvent>, event: ModalSonicEvent) {
    if let Err(e) = sender.send(event) {
        log::error!("Failed to send event: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::Wall;
    use crate::config::SynthesizerConfig;
    use crate::error::ModalSonicError;
    use crate::material::Material;
    use crate::mesh::Mesh;
    use crate::modal::ModalBasis;
    use std::f64::consts::TAU;

    fn ringing_cube(position: Vec3) -> RigidBody {
        let mesh = Mesh::cuboid(Vec3::splat(0.25));
        let vertex_count = mesh.vertex_count();
        let shapes: Vec<Vec3> = (0..2)
            .flat_map(|mode| {
                (0..vertex_count).map(move |v| {
                    let sign = if (v + mode) % 2 == 0 { 1.0 } else { -1.0 };
                    Vec3::new(0.2, sign, 0.1)
                })
            })
            .collect();
        let basis =
            ModalBasis::from_frequencies(vec![TAU * 440.0, TAU * 1250.0], shapes, vertex_count, 1.0, 1e-7)
                .unwrap();
        RigidBody::new(mesh, Material::new(1000.0, 1e9, 0.3))
            .unwrap()
            .with_modes(basis, SynthesizerConfig::all())
            .unwrap()
            .with_position(position)
    }

    fn world(desc: ModalSonicWorldDesc) -> ModalSonicWorld {
        let _ = env_logger::builder().is_test(true).try_init();
        ModalSonicWorld::new(desc, Boundary::centered_cube(1.0).unwrap()).unwrap()
    }

    fn drain(queue: &SampleQueue) -> Vec<f32> {
        let mut out = vec![0.0; queue.len()];
        queue.pop(&mut out);
        out
    }

    #[test]
    fn test_non_positive_dt_is_noop() {
        let mut world = world(ModalSonicWorldDesc::default());
        let id = world.add_body(ringing_cube(Vec3::ZERO));
        let queued = world.queue().len();

        for dt in [0.0, -0.01, f32::NAN] {
            let report = world.tick(dt, Vec3::ZERO).unwrap();
            assert_eq!(report, TickReport::default());
        }

        assert_eq!(world.queue().len(), queued);
        assert_eq!(world.body(id).unwrap().velocity(), Vec3::ZERO);
    }

    #[test]
    fn test_dt_is_clamped() {
        let mut world = world(ModalSonicWorldDesc::default());
        world.add_body(ringing_cube(Vec3::ZERO));
        let report = world.tick(0.25, Vec3::ZERO).unwrap();
        assert_eq!(report.dt, 0.01);
        assert_eq!(report.frames, 441);
    }

    #[test]
    fn test_gravity_accelerates_bodies() {
        let mut world = world(ModalSonicWorldDesc::default());
        let id = world.add_body(ringing_cube(Vec3::ZERO));
        for _ in 0..10 {
            world.tick(0.01, Vec3::ZERO).unwrap();
        }
        let v = world.body(id).unwrap().velocity();
        assert!((v.y + 0.981).abs() < 1e-3);
        assert!(v.x.abs() < 1e-6 && v.z.abs() < 1e-6);
    }

    #[test]
    fn test_external_force_is_applied() {
        let desc = ModalSonicWorldDesc::default().gravity(Vec3::ZERO);
        let mut world = world(desc);
        let id = world.add_body(ringing_cube(Vec3::ZERO));
        let mass = world.body(id).unwrap().mass();
        world.tick(0.01, Vec3::new(mass, 0.0, 0.0)).unwrap();
        assert!((world.body(id).unwrap().velocity().x - 0.01).abs() < 1e-5);
    }

    #[test]
    fn test_resting_world_is_silent() {
        let desc = ModalSonicWorldDesc::default().gravity(Vec3::ZERO);
        let mut world = world(desc);
        world.add_body(ringing_cube(Vec3::ZERO));
        for _ in 0..20 {
            let report = world.tick(0.01, Vec3::ZERO).unwrap();
            assert_eq!(report.impulses, 0);
            assert_eq!(report.peak, 0.0);
        }
        assert!(drain(&world.queue()).iter().all(|&s| s == 0.0));
        assert!(world.poll_events().is_empty());
    }

    #[test]
    fn test_dropped_body_rings_on_impact() {
        let mut world = world(ModalSonicWorldDesc::default());
        let id = world.add_body(ringing_cube(Vec3::ZERO));

        let mut impulses = 0;
        for _ in 0..60 {
            impulses += world.tick(0.01, Vec3::ZERO).unwrap().impulses;
        }
        assert!(impulses > 0);

        let events = world.poll_events();
        let first_impact = events
            .iter()
            .find(|e| matches!(e, ModalSonicEvent::Impact { .. }))
            .unwrap();
        match first_impact {
            ModalSonicEvent::Impact { body_id, wall, impulse, .. } => {
                assert_eq!(*body_id, id);
                assert_eq!(*wall, Wall::YMin);
                assert!(impulse.y > 0.0);
            }
            _ => unreachable!(),
        }

        let samples = drain(&world.queue());
        assert!(samples.iter().any(|&s| s.abs() > 0.0));
        // Stereo output duplicates every frame.
        assert!(samples.chunks(2).all(|frame| frame[0] == frame[1]));

        let body = world.body(id).unwrap();
        assert!(body.position().y > -1.0);
    }

    #[test]
    fn test_clipping_is_reported() {
        let desc = ModalSonicWorldDesc::default().output_gain(1e9);
        let mut world = world(desc);
        world.add_body(ringing_cube(Vec3::ZERO));
        for _ in 0..60 {
            world.tick(0.01, Vec3::ZERO).unwrap();
        }
        assert!(
            world
                .poll_events()
                .iter()
                .any(|e| matches!(e, ModalSonicEvent::OutputClipped { .. }))
        );
    }

    #[test]
    fn test_tick_stops_on_non_finite_body() {
        let mut world = world(ModalSonicWorldDesc::default());
        let id = world.add_body(ringing_cube(Vec3::ZERO));
        world
            .body_mut(id)
            .unwrap()
            .set_momentum(Vec3::new(0.0, f32::NAN, 0.0), Vec3::ZERO);

        let err = world.tick(0.01, Vec3::ZERO).unwrap_err();
        assert!(matches!(err, ModalSonicError::NumericalBlowUp(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_body_handles() {
        let mut world = world(ModalSonicWorldDesc::default());
        let a = world.add_body(ringing_cube(Vec3::ZERO));
        let b = world.add_body(ringing_cube(Vec3::new(0.5, 0.0, 0.0)));
        assert_ne!(a, b);
        assert_eq!(world.body_ids(), vec![a, b]);

        assert!(world.remove_body(a).is_some());
        assert!(world.body(a).is_none());
        assert!(world.body(b).is_some());
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_empty_world_pushes_nothing() {
        let mut world = world(ModalSonicWorldDesc::default());
        let queued = world.queue().len();
        let report = world.tick(0.01, Vec3::ZERO).unwrap();
        assert_eq!(report.frames, 0);
        assert_eq!(world.queue().len(), queued);
    }
}
