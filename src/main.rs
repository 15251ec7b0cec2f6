use std::error::Error;
use std::fs;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use log::{info, LevelFilter};

mod raytracing;
use raytracing::parser::{ParsedScene, SceneParser};
use raytracing::renderer::Renderer;

#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// the input path to the scene file
    scene: String,
    /// the path where the rendered frame is saved as bitmap
    #[arg(short, long, default_value = "output.bmp")]
    output: String,
    /// render the same frame this many times, to time steady-state frames
    #[arg(long, default_value_t = 1)]
    frames: u32,
    #[arg(long, default_value = "info")]
    log_level: LogLevel,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.clone().into())
        .init();

    let content = fs::read_to_string(&args.scene)?;
    let mut parser = SceneParser::new(&content);
    let ParsedScene {
        width,
        height,
        scene,
    } = match parser.parse_scene() {
        Ok(parsed) => parsed,
        Err(parser_error) => {
            parser_error.print_error_location(&content);
            return Err(Box::from(format!("parser error: {}", parser_error)));
        }
    };

    info!(
        "rendering {} at {}x{}, {} object(s), {} light(s)",
        args.scene,
        width,
        height,
        scene.objects.len(),
        scene.lights.len()
    );

    let mut renderer = Renderer::new(width, height)?;
    let frames = args.frames.max(1);
    let start = Instant::now();
    for _ in 0..frames {
        renderer.render(&scene)?;
    }
    info!("rendered {} frame(s) in {:?}", frames, start.elapsed());

    renderer.save_to(&args.output)?;
    info!("saved {}", args.output);
    Ok(())
}
