use crate::io::mesh_source::MeshFormat;
use crate::scene::tangent::DeterminantFormula;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub light: LightConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Sub-samples per pixel axis; 1 disables supersampling.
    #[serde(default = "default_samples")]
    pub samples: u32,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_frames")]
    pub frames: u32,
    #[serde(default = "default_false")]
    pub save_every_frame: bool,
    #[serde(default)]
    pub clear_color: [f32; 4],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            samples: default_samples(),
            output_dir: default_output_dir(),
            frames: default_frames(),
            save_every_frame: false,
            clear_color: [0.0; 4],
        }
    }
}

fn default_width() -> u32 {
    600
}
fn default_height() -> u32 {
    600
}
fn default_samples() -> u32 {
    2
}
fn default_output_dir() -> String {
    "output".to_string()
}
fn default_frames() -> u32 {
    60
}
fn default_false() -> bool {
    false
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "default_eye")]
    pub eye: [f32; 3],
    #[serde(default)]
    pub target: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    #[serde(default = "default_fov")]
    pub fov: f32,
    #[serde(default = "default_near")]
    pub near: f32,
    #[serde(default = "default_far")]
    pub far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            eye: default_eye(),
            target: [0.0; 3],
            up: default_up(),
            fov: default_fov(),
            near: default_near(),
            far: default_far(),
        }
    }
}

fn default_eye() -> [f32; 3] {
    [0.0, 0.0, 6.0]
}
fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}
fn default_fov() -> f32 {
    45.0
}
fn default_near() -> f32 {
    0.1
}
fn default_far() -> f32 {
    10.0
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LightConfig {
    #[serde(default = "default_light_position")]
    pub position: [f32; 3],
    #[serde(default = "default_light_intensities")]
    pub intensities: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: default_light_position(),
            intensities: default_light_intensities(),
        }
    }
}

fn default_light_position() -> [f32; 3] {
    [-30.0, 30.0, 30.0]
}
fn default_light_intensities() -> [f32; 3] {
    [0.66, 0.66, 0.66]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_path")]
    pub path: String,
    /// Omitted means "guess from the extension".
    #[serde(default)]
    pub format: Option<MeshFormat>,
    #[serde(default = "default_diffuse")]
    pub diffuse_texture: String,
    #[serde(default = "default_normal")]
    pub normal_texture: String,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default)]
    pub translation: [f32; 3],
    #[serde(default)]
    pub tangent_formula: DeterminantFormula,
    #[serde(default = "default_true")]
    pub normal_mapping: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: default_model_path(),
            format: None,
            diffuse_texture: default_diffuse(),
            normal_texture: default_normal(),
            scale: default_scale(),
            translation: [0.0; 3],
            tangent_formula: DeterminantFormula::default(),
            normal_mapping: true,
        }
    }
}

fn default_model_path() -> String {
    "model.obj".to_string()
}
fn default_diffuse() -> String {
    "diffuse.jpg".to_string()
}
fn default_normal() -> String {
    "normal.jpg".to_string()
}
fn default_scale() -> f32 {
    0.42
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnimationConfig {
    /// Degrees added to the X, Y and Z angles per tick.
    #[serde(default = "default_increments")]
    pub increments: [f32; 3],
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Tick indices at which the pause flag is flipped (headless runs only).
    #[serde(default)]
    pub pause_toggles: Vec<u64>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            increments: default_increments(),
            interval_ms: default_interval_ms(),
            pause_toggles: Vec::new(),
        }
    }
}

fn default_increments() -> [f32; 3] {
    [0.4, 0.5, 0.6]
}
fn default_interval_ms() -> u64 {
    50
}

/// Annotated configuration equal to the built-in defaults.
pub const EXAMPLE_CONFIG: &str = r#"# Tangent rasterizer configuration

[render]
width = 600
height = 600
samples = 2                  # sub-samples per axis
output_dir = "output"
frames = 60
save_every_frame = false
clear_color = [0.0, 0.0, 0.0, 0.0]

[camera]
eye = [0.0, 0.0, 6.0]
target = [0.0, 0.0, 0.0]
up = [0.0, 1.0, 0.0]
fov = 45.0
near = 0.1
far = 10.0

[light]
position = [-30.0, 30.0, 30.0]
intensities = [0.66, 0.66, 0.66]

[model]
path = "model.obj"
# format = "obj"             # "obj" or "json"; guessed from the extension when omitted
diffuse_texture = "diffuse.jpg"
normal_texture = "normal.jpg"
scale = 0.42
translation = [0.0, 0.0, 0.0]
tangent_formula = "literal"  # or "standard"
normal_mapping = true

[animation]
increments = [0.4, 0.5, 0.6]
interval_ms = 50
pause_toggles = []
"#;
