mod surface;

use std::{
    cell::Cell,
    path::{Path, PathBuf},
    rc::Rc,
    time::Instant,
};

use clap::{Parser, Subcommand};
use pulsehz_core::{
    Arrangement, ArrangementConfig, FrameReport, Generator, LoopGeometry, PulseError, RenderUnit,
    RenderUnitBuilder, Result, Tempo, UnitConfig,
};
use surface::TextSurface;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { output, force } => run_init(&output, force),
        Commands::Preview {
            config,
            frames,
            json,
        } => run_preview(config.as_deref(), frames, json),
        Commands::Play { config, bpm, steps } => run_play(config.as_deref(), bpm, steps),
    }
}

fn run_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(PulseError::msg(format!(
            "{} already exists, pass --force to overwrite",
            output.display()
        )));
    }
    let json = ArrangementConfig::live_defaults().to_json_pretty()?;
    std::fs::write(output, json)?;
    tracing::info!(?output, "wrote default arrangement");
    Ok(())
}

fn run_preview(config: Option<&Path>, frames: u32, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let mut board = Board::from_config(&config)?;
    tracing::info!(frames, units = config.units.len(), "previewing");

    for _ in 0..frames {
        let report = board.arrangement.step_forward();
        if json {
            println!("{}", serde_json::to_string(&board.arrangement.snapshot())?);
        } else {
            board.print(&report);
        }
    }
    Ok(())
}

fn run_play(config: Option<&Path>, bpm: Option<f64>, steps: u64) -> Result<()> {
    let config = load_config(config)?;
    let mut board = Board::from_config(&config)?;
    if let Some(bpm) = bpm {
        board.set_bpm(bpm)?;
    }
    tracing::info!(
        bpm = board.arrangement.bpm(),
        fps = board.arrangement.frames_per_second(),
        steps,
        "starting playback"
    );

    let end = i64::try_from(steps).unwrap_or(i64::MAX);
    board.arrangement.play();
    let mut last = Instant::now();

    while board.arrangement.sync_step() < end {
        if let Some(wait) = board.arrangement.time_until_next_tick() {
            std::thread::sleep(wait);
        }
        let now = Instant::now();
        let reports = board.arrangement.advance(now.duration_since(last));
        last = now;
        if let Some(report) = reports.last() {
            board.print(report);
        }
    }

    let report = board.arrangement.stop();
    board.print(&report);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ArrangementConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading arrangement");
            ArrangementConfig::load(path)
        }
        None => Ok(ArrangementConfig::live_defaults()),
    }
}

/// Arrangement plus the host side of every text surface it paints into.
struct Board {
    arrangement: Arrangement,
    lanes: Vec<(String, TextSurface)>,
    /// Tempo read by the fps/bpm readouts on every frame.
    tempo: Rc<Cell<Tempo>>,
}

impl Board {
    fn from_config(config: &ArrangementConfig) -> Result<Self> {
        config.validate()?;
        let arrangement = Arrangement::from_config(config)?;
        let mut board = Self {
            tempo: Rc::new(Cell::new(*arrangement.tempo())),
            arrangement,
            lanes: Vec::new(),
        };
        board.add_readouts()?;
        for unit in &config.units {
            board.add_meter(unit)?;
        }
        Ok(board)
    }

    /// Retimes the transport and the readouts that display its tempo.
    fn set_bpm(&mut self, bpm: f64) -> Result<()> {
        self.arrangement.set_bpm(bpm)?;
        self.tempo.set(*self.arrangement.tempo());
        Ok(())
    }

    fn add_readouts(&mut self) -> Result<()> {
        let fps = Rc::clone(&self.tempo);
        let bpm = Rc::clone(&self.tempo);

        let step = RenderUnit::builder()
            .label("sync step")
            .generator(Generator::Ramp)
            .surface(TextSurface::new())
            .paint(surface::step_readout);
        self.push_lane("step", step)?;

        let fps_lane = RenderUnit::builder()
            .label("fps")
            .generator(move |_: i64, _: f64, _: f64, _: f64, _: &LoopGeometry| -> Result<f64> {
                Ok(fps.get().frames_per_second())
            })
            .surface(TextSurface::new())
            .paint(surface::fps_readout);
        self.push_lane("fps", fps_lane)?;

        let bpm_lane = RenderUnit::builder()
            .label("bpm")
            .generator(move |_: i64, _: f64, _: f64, _: f64, _: &LoopGeometry| -> Result<f64> {
                Ok(bpm.get().bpm())
            })
            .surface(TextSurface::new())
            .paint(surface::bpm_readout);
        self.push_lane("bpm", bpm_lane)?;

        let spinner = RenderUnit::builder()
            .label("spinner")
            .generator(Generator::Ramp)
            .surface(TextSurface::new())
            .paint(surface::spinner);
        self.push_lane("spin", spinner)
    }

    fn add_meter(&mut self, unit: &UnitConfig) -> Result<()> {
        let meter = RenderUnit::builder()
            .label(unit.name.clone())
            .generator(unit.generator)
            .geometry(unit.geometry)
            .surface(TextSurface::new())
            .paint(surface::meter);
        self.push_lane(&unit.name, meter)
    }

    fn push_lane(&mut self, name: &str, builder: RenderUnitBuilder<TextSurface>) -> Result<()> {
        let unit = builder.build()?;
        self.lanes.push((name.to_string(), unit.surface().clone()));
        self.arrangement.add_render_unit(Box::new(unit));
        Ok(())
    }

    fn print(&self, report: &FrameReport) {
        let lanes: Vec<String> = self
            .lanes
            .iter()
            .map(|(name, surface)| format!("{name}: {}", surface.text()))
            .collect();
        println!("{}", lanes.join("  "));
        if !report.is_clean() {
            eprintln!(
                "step {}: {} unit failure(s)",
                report.step,
                report.failures.len()
            );
        }
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Tempo-locked generative step sequencer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the default arrangement as JSON so it can be edited.
    Init {
        /// Where to write the configuration file.
        output: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Step through frames without waiting on the clock.
    Preview {
        /// Arrangement file; the built-in two-lane setup when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of frames to render.
        #[arg(short, long, default_value_t = 16)]
        frames: u32,
        /// Print transport snapshots as JSON lines instead of the lanes.
        #[arg(long)]
        json: bool,
    },
    /// Run the transport in real time for a number of steps, then stop.
    Play {
        /// Arrangement file; the built-in two-lane setup when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Override the tempo from the arrangement file.
        #[arg(long)]
        bpm: Option<f64>,
        /// Steps to play before stopping.
        #[arg(short, long, default_value_t = 64)]
        steps: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_paints_readouts_and_meters() {
        let mut board = Board::from_config(&ArrangementConfig::live_defaults()).unwrap();
        assert_eq!(board.lanes.len(), 6);

        let report = board.arrangement.step_forward();
        assert!(report.is_clean());

        let text: Vec<String> = board.lanes.iter().map(|(_, s)| s.text()).collect();
        assert_eq!(text[0], "SS:000001");
        assert_eq!(text[1], "FPS:32.00");
        assert_eq!(text[2], "BPM:120.00");
        assert!(text[4].starts_with('['));
    }

    #[test]
    fn readouts_follow_tempo_changes() {
        let mut board = Board::from_config(&ArrangementConfig::live_defaults()).unwrap();
        board.arrangement.play();
        board.set_bpm(60.0).unwrap();
        board.arrangement.step_forward();

        assert_eq!(board.lanes[1].1.text(), "FPS:16.00");
        assert_eq!(board.lanes[2].1.text(), "BPM:60.00");

        assert!(board.set_bpm(0.0).is_err());
        board.arrangement.step_forward();
        assert_eq!(board.lanes[2].1.text(), "BPM:60.00");
    }

    #[test]
    fn cli_parses_play_overrides() {
        let cli = Cli::try_parse_from(["pulsehz", "play", "--bpm", "90", "--steps", "8"]).unwrap();
        match cli.command {
            Commands::Play { bpm, steps, config } => {
                assert_eq!(bpm, Some(90.0));
                assert_eq!(steps, 8);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
