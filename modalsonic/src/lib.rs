//! # ModalSonic
//!
//! Real-time rigid-body simulation coupled to linear modal sound synthesis.
//!
//! Rigid bodies built from closed triangle meshes fall and tumble inside a
//! static axis-aligned box. Every wall contact applies an impulse to the body
//! and excites its precomputed vibration modes; a bank of per-mode recursive
//! filters turns those impulses into audio, which is handed to the output
//! device through a bounded sample queue.
//!
//! ## Quick Start
//!
//! ```no_run
//! use modalsonic::*;
//!
//! let desc = ModalSonicWorldDesc::default();
//! let mut world = ModalSonicWorld::new(desc.clone(), Boundary::centered_cube(1.0)?)?;
//!
//! // A 10 cm steel cube with a single 1 kHz mode shared by all vertices
//! let mesh = Mesh::cuboid(Vec3::splat(0.05));
//! let basis = ModalBasis::from_frequencies(
//!     vec![std::f64::consts::TAU * 1000.0],
//!     vec![Vec3::Y; mesh.vertex_count()],
//!     mesh.vertex_count(),
//!     1.0,
//!     1e-7,
//! )?;
//! let body = RigidBody::new(mesh, Material::STEEL)?
//!     .with_modes(basis, SynthesizerConfig::all())?;
//! world.add_body(body);
//!
//! // Play whatever the simulation produces
//! let mut engine = ModalSonicEngine::new(desc, world.queue())?;
//! engine.start()?;
//!
//! // Once per frame on the simulation thread
//! let report = world.tick(1.0 / 60.0, Vec3::ZERO)?;
//! for event in world.poll_events() {
//!     if let ModalSonicEvent::Impact { body_id, wall, .. } = event {
//!         println!("{} hit {:?}", body_id, wall);
//!     }
//! }
//! # let _ = report;
//! # Ok::<(), ModalSonicError>(())
//! ```
//!
//! ## Key Components
//!
//! - **[`mass_properties`]**: volume, center of mass and diagonal inertia of a mesh
//! - **[`RigidBody`]**: momenta, pose and the `step` / `step_w` integrators
//! - **[`CollisionResolver`]**: sequential impulses against a [`Boundary`]
//! - **[`ModalSynthesizer`]**: per-mode damped oscillators driven by impulses
//! - **[`SampleQueue`]**: bounded handoff to the audio thread with pad/trim slack control
//! - **[`ModalSonicWorld`]**: the per-tick pipeline tying the above together
//! - **[`ModalSonicEngine`]**: `cpal` output stream pulling from the queue
//!
//! ## Architecture
//!
//! 1. **Simulation thread**: owns `ModalSonicWorld`, integrates bodies and
//!    synthesizes audio outside any lock, then publishes the batch
//! 2. **Audio callback**: pops from the queue with `try_lock`, serving any
//!    shortfall as silence

pub mod body;
pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod handoff;
pub mod mass_properties;
pub mod material;
pub mod math;
pub mod mesh;
pub mod modal;
pub mod world;

pub use body::RigidBody;
pub use collision::{Boundary, CollisionResolver, Impact, Resolution, VertexImpulse, Wall};
pub use config::{ModalBasisOptions, ModalSonicWorldDesc, ModeSelection, SynthesizerConfig};
pub use engine::ModalSonicEngine;
pub use error::ModalSonicError;
pub use events::ModalSonicEvent;
pub use handoff::{PushReport, SampleQueue};
pub use mass_properties::MassProperties;
pub use material::Material;
pub use math::{Mat3, Pose, Quat, Vec3, Velocity};
pub use mesh::Mesh;
pub use modal::{ModalBasis, ModalBasisDesc, ModalSynthesizer};
pub use world::{BodyId, ModalSonicWorld, TickReport};
