use clap::Parser;
use log::{error, info};
use std::fs;
use std::process::ExitCode;
use tangent_rasterizer::app::{self, AppError};
use tangent_rasterizer::io::config::{Config, EXAMPLE_CONFIG};
use tangent_rasterizer::io::mesh_source::MeshFormat;

/// Headless normal-mapped mesh renderer.
#[derive(Parser, Debug)]
#[command(name = "tangent-rasterizer", version)]
#[command(about = "Imports a mesh, builds its tangent space and renders rotating normal-mapped frames")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Mesh file, overrides model.path
    #[arg(short, long, value_name = "FILE")]
    model: Option<String>,

    /// Mesh format, guessed from the extension when omitted
    #[arg(long, value_enum)]
    format: Option<MeshFormat>,

    /// Number of frames to render
    #[arg(short, long)]
    frames: Option<u32>,

    /// Directory for frame_NNNN.png output
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Diffuse texture, overrides model.diffuse_texture
    #[arg(long, value_name = "FILE")]
    diffuse: Option<String>,

    /// Normal map, overrides model.normal_texture
    #[arg(long, value_name = "FILE")]
    normal_map: Option<String>,

    /// Write an annotated example configuration to FILE and exit
    #[arg(long, value_name = "FILE")]
    write_example_config: Option<String>,
}

impl Cli {
    fn load_config(&self) -> Result<Config, AppError> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from '{}'", path);
                Config::load(path)?
            }
            None => {
                info!("No configuration file given, using defaults");
                Config::default()
            }
        };

        if let Some(model) = &self.model {
            config.model.path = model.clone();
        }
        if self.format.is_some() {
            config.model.format = self.format;
        }
        if let Some(frames) = self.frames {
            config.render.frames = frames;
        }
        if let Some(dir) = &self.output_dir {
            config.render.output_dir = dir.clone();
        }
        if let Some(diffuse) = &self.diffuse {
            config.model.diffuse_texture = diffuse.clone();
        }
        if let Some(normal_map) = &self.normal_map {
            config.model.normal_texture = normal_map.clone();
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_level(true)
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.write_example_config {
        return match fs::write(path, EXAMPLE_CONFIG) {
            Ok(()) => {
                info!("Example configuration written to '{}'", path);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to write example configuration '{}': {}", path, e);
                ExitCode::FAILURE
            }
        };
    }

    let result = cli.load_config().and_then(|config| app::run(&config));
    match result {
        Ok(summary) => {
            if let Some(last) = summary.saved.last() {
                info!("Last frame: {}", last.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
