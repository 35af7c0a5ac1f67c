use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::DVec2;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use workshop_camera::Camera;
use workshop_common::WorkshopConfig;
use workshop_pacer::{Clock, FramePacer, ManualClock, SystemClock};
use workshop_render::{DebugTextRenderer, Renderer};
use workshop_sim::SimWorld;

#[derive(Parser)]
#[command(name = "workshop-cli", about = "Headless tools for the workshop harness")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and the effective configuration
    Info,
    /// Run the simulation under the frame pacer without a window
    Run {
        /// Number of frames to run
        #[arg(short, long, default_value = "120")]
        frames: u64,
        /// Target frame rate (overrides the config file)
        #[arg(long)]
        fps: Option<f64>,
        /// Simulated work per frame, in milliseconds
        #[arg(long, default_value = "0")]
        work_ms: f64,
        /// Use a virtual clock instead of sleeping for real
        #[arg(long)]
        virtual_clock: bool,
        /// Virtual clock: how late every sleep wakes up, in microseconds
        #[arg(long, default_value = "0", requires = "virtual_clock")]
        overshoot_us: u64,
        /// Print the world after the last frame
        #[arg(long)]
        dump: bool,
    },
    /// Map a point between screen pixels and world units
    Convert {
        /// Screen point (pixels, origin top-left) to map into the world
        #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true, conflicts_with = "world", required_unless_present = "world")]
        screen: Option<Vec<f64>>,
        /// World point to map onto the screen
        #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
        world: Option<Vec<f64>>,
        /// Viewport width (defaults to the configured window)
        #[arg(long)]
        width: Option<u32>,
        /// Viewport height (defaults to the configured window)
        #[arg(long)]
        height: Option<u32>,
        /// View center (defaults to the configured home framing)
        #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
        center: Option<Vec<f64>>,
        /// Zoom factor (defaults to the configured home zoom)
        #[arg(long)]
        zoom: Option<f64>,
    },
}

/// Frame-pacing summary of a headless run.
#[derive(Debug)]
struct RunSummary {
    frames: u64,
    elapsed: Duration,
    avg_frame: Duration,
    max_frame: Duration,
    fps: f64,
    sleep_adjust: f64,
    overruns: u64,
}

/// Step `world` once per frame and pace every frame with `pacer`.
///
/// `work` runs at the start of each frame to stand in for render time.
fn run_paced<C: Clock>(
    pacer: &mut FramePacer<C>,
    world: &mut SimWorld,
    frames: u64,
    mut work: impl FnMut(&mut C),
) -> RunSummary {
    let start = pacer.clock().now();
    let mut overruns = 0;
    pacer.restart();
    for _ in 0..frames {
        work(pacer.clock_mut());
        world.step();
        let report = pacer.pace();
        if report.sleep_time.is_zero() {
            overruns += 1;
        }
    }
    let stats = pacer.stats();
    RunSummary {
        frames,
        elapsed: pacer.clock().now().saturating_sub(start),
        avg_frame: stats.average(),
        max_frame: stats.max(),
        fps: stats.fps(),
        sleep_adjust: pacer.sleep_adjust(),
        overruns,
    }
}

fn print_summary(summary: &RunSummary, target: Duration) {
    let ms = |d: Duration| d.as_secs_f64() * 1e3;
    println!(
        "Ran {} frames in {:.1} ms (target {:.3} ms/frame)",
        summary.frames,
        ms(summary.elapsed),
        ms(target)
    );
    println!(
        "Frame: avg {:.3} ms, max {:.3} ms, {:.1} fps",
        ms(summary.avg_frame),
        ms(summary.max_frame),
        summary.fps
    );
    println!(
        "Sleep adjust: {:+.3} ms, overruns: {}",
        summary.sleep_adjust * 1e3,
        summary.overruns
    );
}

fn point(values: &[f64]) -> anyhow::Result<DVec2> {
    match values {
        [x, y] => Ok(DVec2::new(*x, *y)),
        _ => anyhow::bail!("expected two coordinates, got {}", values.len()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config =
        WorkshopConfig::load_or_default(cli.config.as_deref()).context("loading config")?;

    match cli.command {
        Commands::Info => {
            config.validate()?;
            println!("workshop-cli v{}", env!("CARGO_PKG_VERSION"));
            print!("{}", config.to_yaml()?);
        }
        Commands::Run {
            frames,
            fps,
            work_ms,
            virtual_clock,
            overshoot_us,
            dump,
        } => {
            if let Some(fps) = fps {
                config.pacer.target_fps = fps;
            }
            config.validate()?;
            anyhow::ensure!(
                work_ms >= 0.0 && work_ms.is_finite(),
                "--work-ms must be a non-negative number"
            );
            let work = Duration::from_secs_f64(work_ms / 1e3);
            let target = config.pacer.target_period();
            let mut world = SimWorld::from_config(&config.sim, target);

            tracing::info!(
                frames,
                fps = config.pacer.target_fps,
                virtual_clock,
                "headless run"
            );

            let summary = if virtual_clock {
                let clock = ManualClock::with_overshoot(Duration::from_micros(overshoot_us));
                let mut pacer = FramePacer::with_clock(&config.pacer, clock);
                run_paced(&mut pacer, &mut world, frames, |clock| clock.advance(work))
            } else {
                let mut pacer = FramePacer::with_clock(&config.pacer, SystemClock::new());
                run_paced(&mut pacer, &mut world, frames, |_| {
                    if !work.is_zero() {
                        std::thread::sleep(work);
                    }
                })
            };
            print_summary(&summary, target);

            if dump {
                let camera = Camera::new(&config.camera, config.window.width, config.window.height);
                print!("{}", DebugTextRenderer::new().render(&world, &camera));
            }
        }
        Commands::Convert {
            screen,
            world,
            width,
            height,
            center,
            zoom,
        } => {
            if let Some(c) = center {
                config.camera.center = point(&c)?;
            }
            if let Some(z) = zoom {
                config.camera.zoom = z;
            }
            let camera = Camera::new(
                &config.camera,
                width.unwrap_or(config.window.width),
                height.unwrap_or(config.window.height),
            );

            let c = camera.center();
            let (w, h) = camera.size();
            println!(
                "View: center=({}, {}) zoom={} viewport={w}x{h}",
                c.x,
                c.y,
                camera.zoom()
            );
            match (screen, world) {
                (Some(s), _) => {
                    let p = point(&s)?;
                    let out = camera.screen_to_world(p)?;
                    println!("screen ({}, {}) -> world ({:.6}, {:.6})", p.x, p.y, out.x, out.y);
                }
                (None, Some(wp)) => {
                    let p = point(&wp)?;
                    let out = camera.world_to_screen(p)?;
                    println!("world ({}, {}) -> screen ({:.6}, {:.6})", p.x, p.y, out.x, out.y);
                }
                (None, None) => anyhow::bail!("one of --screen or --world is required"),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use workshop_common::PacerConfig;

    #[test]
    fn virtual_run_holds_target_rate() {
        let config = PacerConfig::default();
        let mut pacer = FramePacer::with_clock(&config, ManualClock::new());
        let mut world = SimWorld::new(glam::Vec2::new(0.0, -10.0), config.target_period());
        let work = Duration::from_millis(5);
        let summary = run_paced(&mut pacer, &mut world, 60, |clock| clock.advance(work));

        assert_eq!(world.tick(), 60);
        assert_eq!(summary.overruns, 0);
        let expected = config.target_period().as_secs_f64() * 60.0;
        assert!((summary.elapsed.as_secs_f64() - expected).abs() < 1e-6);
    }

    #[test]
    fn virtual_run_counts_overruns() {
        let config = PacerConfig::default();
        let mut pacer = FramePacer::with_clock(&config, ManualClock::new());
        let mut world = SimWorld::new(glam::Vec2::ZERO, config.target_period());
        let summary = run_paced(&mut pacer, &mut world, 10, |clock| {
            clock.advance(Duration::from_millis(40))
        });
        assert_eq!(summary.overruns, 10);
        assert!(summary.fps < 30.0);
    }

    #[test]
    fn point_needs_two_values() {
        assert_eq!(point(&[1.0, -2.0]).unwrap(), DVec2::new(1.0, -2.0));
        assert!(point(&[1.0]).is_err());
    }

    #[test]
    fn convert_parses_negative_world_point() {
        let cli = Cli::parse_from(["workshop-cli", "convert", "--world", "-3", "4.5"]);
        match cli.command {
            Commands::Convert { world, screen, .. } => {
                assert!(screen.is_none());
                assert_eq!(world, Some(vec![-3.0, 4.5]));
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn overshoot_requires_virtual_clock() {
        assert!(Cli::try_parse_from(["workshop-cli", "run", "--overshoot-us", "100"]).is_err());
        assert!(
            Cli::try_parse_from(["workshop-cli", "run", "--virtual-clock", "--overshoot-us", "100"])
                .is_ok()
        );
    }
}
