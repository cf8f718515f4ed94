use anyhow::{bail, Context, Result};
use lumen_core::{demo_scene, load_scene, Cubemap, RenderSettings, SceneDescription, SkyboxSource};
use lumen_renderer::{Camera, FrameBuffer, MoveDirection, RenderState, WorkerPool};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const USAGE: &str = "Usage: lumen [SCENE.json] [--width W] [--height H] [--seconds S] \
[--workers N] [--output PATH] [--orbit]";

/// Display refresh interval (~60 Hz)
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Command line options
#[derive(Debug, Clone, PartialEq)]
struct Options {
    scene: Option<PathBuf>,
    width: u32,
    height: u32,
    seconds: f32,
    workers: Option<usize>,
    output: PathBuf,
    orbit: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            scene: None,
            width: 640,
            height: 360,
            seconds: 10.0,
            workers: None,
            output: PathBuf::from("lumen.png"),
            orbit: false,
        }
    }
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut options = Options::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--width" => options.width = parse_value(&arg, args.next())?,
                "--height" => options.height = parse_value(&arg, args.next())?,
                "--seconds" => options.seconds = parse_value(&arg, args.next())?,
                "--workers" => options.workers = Some(parse_value(&arg, args.next())?),
                "--output" => options.output = parse_value(&arg, args.next())?,
                "--orbit" => options.orbit = true,
                flag if flag.starts_with("--") => bail!("Unknown option '{flag}'\n{USAGE}"),
                path => {
                    if options.scene.is_some() {
                        bail!("Only one scene file may be given\n{USAGE}");
                    }
                    options.scene = Some(PathBuf::from(path));
                }
            }
        }

        if options.width == 0 || options.height == 0 {
            bail!("Resolution must be at least 1x1");
        }
        if !(options.seconds.is_finite() && options.seconds >= 0.0) {
            bail!("--seconds must be a non-negative number");
        }
        Ok(options)
    }
}

fn parse_value<T>(flag: &str, value: Option<String>) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = value.with_context(|| format!("Missing value for {flag}\n{USAGE}"))?;
    value
        .parse()
        .with_context(|| format!("Invalid value '{value}' for {flag}"))
}

fn load_description(options: &Options) -> Result<SceneDescription> {
    match &options.scene {
        Some(path) => load_scene(path)
            .with_context(|| format!("Failed to load scene '{}'", path.display())),
        None => {
            log::info!("No scene file given, rendering the demo scene");
            Ok(SceneDescription {
                scene: demo_scene(),
                settings: RenderSettings::default(),
                camera: Default::default(),
                skybox: SkyboxSource::default(),
            })
        }
    }
}

fn load_skybox(source: &SkyboxSource) -> Result<Cubemap> {
    match source {
        SkyboxSource::Color(color) => Ok(Cubemap::solid(*color)),
        SkyboxSource::Faces(paths) => {
            let skybox = Cubemap::load(paths).context("Failed to load skybox")?;
            log::info!(
                "Loaded skybox ({}x{}, {} channels)",
                skybox.width(),
                skybox.height(),
                skybox.channels()
            );
            Ok(skybox)
        }
    }
}

/// Step the camera sideways while turning it, roughly circling the view target.
fn orbit_step(camera: &mut Camera) {
    camera.yaw -= 0.1;
    camera.move_camera(MoveDirection::Right, 1.4);
}

fn save_frame(frame: &FrameBuffer, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(frame.width, frame.height, frame.to_rgba8())
        .context("Frame buffer size does not match its resolution")?;
    image
        .save(path)
        .with_context(|| format!("Failed to write '{}'", path.display()))?;
    log::info!("Saved {}x{} frame to {}", frame.width, frame.height, path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = Options::parse(std::env::args().skip(1))?;
    log::info!("Starting Lumen");

    let description = load_description(&options)?;
    let mut settings = description.settings;
    if let Some(workers) = options.workers {
        settings.worker_count = workers;
    }

    let skybox = load_skybox(&description.skybox)?;
    let camera = Camera::from(description.camera);
    let state = Arc::new(RenderState::new(description.scene, skybox, settings, camera));

    let mut pool = WorkerPool::spawn(Arc::clone(&state)).context("Failed to start render workers")?;
    let mut frame = FrameBuffer::default();

    let start = Instant::now();
    let run_time = Duration::from_secs_f32(options.seconds);
    let mut last_report = start;

    while start.elapsed() < run_time {
        state.update_frame(options.width, options.height, &mut frame);

        if last_report.elapsed() >= Duration::from_secs(1) {
            let stats = state.stats();
            log::info!(
                "{:.0}s: generation {}, accumulated weight {:.3}",
                start.elapsed().as_secs_f32(),
                stats.generation,
                stats.weight
            );
            if options.orbit {
                state.update_camera(orbit_step);
            }
            last_report = Instant::now();
        }

        thread::sleep(FRAME_INTERVAL);
    }

    pool.shutdown();
    state.update_frame(options.width, options.height, &mut frame);
    save_frame(&frame, &options.output)
}
