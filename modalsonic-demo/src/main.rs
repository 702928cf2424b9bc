mod cli;
mod scene;

use anyhow::Result;
use cli::Options;
use modalsonic::{ModalSonicEngine, ModalSonicEvent, ModalSonicWorld, ModalSonicWorldDesc, Vec3};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Stats {
    ticks: usize,
    impacts: usize,
    frames: usize,
    peak: f32,
    clipped_ticks: usize,
    capped_ticks: usize,
    warnings: usize,
    underrun_samples: usize,
}

impl Stats {
    fn record_events(&mut self, events: Vec<ModalSonicEvent>) {
        for event in events {
            if event.is_warning() {
                self.warnings += 1;
            }
            match event {
                ModalSonicEvent::Impact { .. } => self.impacts += 1,
                ModalSonicEvent::OutputClipped { .. } => self.clipped_ticks += 1,
                ModalSonicEvent::CollisionIterationLimit { .. } => self.capped_ticks += 1,
                ModalSonicEvent::EngineError { error } => log::error!("Engine error: {}", error),
                other => log::debug!("Event: {:?}", other),
            }
        }
    }

    /// Counts one tick. Returns false once the world can no longer be ticked.
    fn record_tick(&mut self, world: &mut ModalSonicWorld, dt: f32) -> Result<bool> {
        match world.tick(dt, Vec3::ZERO) {
            Ok(report) => {
                self.ticks += 1;
                self.frames += report.frames;
                self.peak = self.peak.max(report.peak);
                Ok(true)
            }
            Err(e) if e.is_fatal() => {
                log::error!("Simulation stopped after {} ticks: {}", self.ticks, e);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn print(&self, world: &ModalSonicWorld, options: &Options) {
        println!("material:          {}", options.material_name);
        println!("ticks:             {}", self.ticks);
        println!("impacts:           {}", self.impacts);
        println!("audio frames:      {}", self.frames);
        println!("peak sample:       {:.4}", self.peak);
        println!("clipped ticks:     {}", self.clipped_ticks);
        println!("capped ticks:      {}", self.capped_ticks);
        println!("warnings:          {}", self.warnings);
        println!("underrun samples:  {}", self.underrun_samples);
        for id in world.body_ids() {
            if let Some(body) = world.body(id) {
                println!(
                    "{}: position {:.3?}, speed {:.3} m/s",
                    id,
                    body.position(),
                    body.velocity().length()
                );
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let Some(options) = cli::parse_args(std::env::args().skip(1))? else {
        println!("{}", cli::USAGE);
        return Ok(());
    };

    let desc = ModalSonicWorldDesc::default().output_gain(options.gain);
    let mut world = scene::build_world(desc.clone(), options.material)?;

    let stats = if options.headless {
        run_headless(&mut world, &desc, &options)?
    } else {
        run_realtime(&mut world, desc, &options)?
    };

    stats.print(&world, &options);
    Ok(())
}

/// Steps the world at a fixed rate as fast as possible and drains the queue
/// the way the device would.
fn run_headless(
    world: &mut ModalSonicWorld,
    desc: &ModalSonicWorldDesc,
    options: &Options,
) -> Result<Stats> {
    let frame_dt = 1.0 / options.fps;
    let ticks = (options.seconds * options.fps).ceil() as usize;
    let queue = world.queue();
    let mut stats = Stats::default();
    let mut device_buffer = Vec::new();
    let mut device_debt = 0.0f64;

    for _ in 0..ticks {
        if !stats.record_tick(world, frame_dt)? {
            break;
        }

        device_debt += frame_dt as f64 * desc.sample_rate as f64;
        let frames = device_debt.floor() as usize;
        device_debt -= frames as f64;
        device_buffer.resize(frames * desc.channels as usize, 0.0);
        let popped = queue.pop(&mut device_buffer);
        stats.underrun_samples += device_buffer.len() - popped;

        stats.record_events(world.poll_events());
    }

    stats.record_events(world.poll_events());
    Ok(stats)
}

/// Runs the simulation on this thread against the real output device.
fn run_realtime(
    world: &mut ModalSonicWorld,
    desc: ModalSonicWorldDesc,
    options: &Options,
) -> Result<Stats> {
    let mut engine =
        ModalSonicEngine::new(desc, world.queue())?.with_event_sender(world.event_sender());
    engine.start()?;

    let frame = Duration::from_secs_f32(1.0 / options.fps);
    let end = Instant::now() + Duration::from_secs_f32(options.seconds);
    let mut stats = Stats::default();
    let mut last = Instant::now();

    while Instant::now() < end {
        std::thread::sleep(frame);
        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32();
        last = now;

        let running = stats.record_tick(world, dt)?;
        stats.record_events(world.poll_events());
        if !running {
            break;
        }
    }

    engine.stop()?;
    stats.underrun_samples = engine.underrun_samples();
    stats.record_events(world.poll_events());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use modalsonic::Material;

    #[test]
    fn test_warnings_are_counted() {
        let mut stats = Stats::default();
        stats.record_events(vec![
            ModalSonicEvent::OutputClipped { peak: 1.2 },
            ModalSonicEvent::QueueOverflow { dropped: 8 },
            ModalSonicEvent::EngineStarted,
        ]);
        assert_eq!(stats.warnings, 2);
        assert_eq!(stats.clipped_ticks, 1);
    }

    #[test]
    fn test_fatal_tick_stops_the_run() {
        let mut world =
            scene::build_world(ModalSonicWorldDesc::default(), Material::STEEL).unwrap();
        let mut stats = Stats::default();
        assert!(stats.record_tick(&mut world, 0.01).unwrap());

        let id = world.body_ids()[0];
        world
            .body_mut(id)
            .unwrap()
            .set_momentum(Vec3::splat(f32::NAN), Vec3::ZERO);
        assert!(!stats.record_tick(&mut world, 0.01).unwrap());
        assert_eq!(stats.ticks, 1);
    }
}
