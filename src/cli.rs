//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

use crate::renderer::LightModel;

/// Resolution bounds accepted on the command line.
const WIDTH_RANGE: (u32, u32) = (320, 4096);
const HEIGHT_RANGE: (u32, u32) = (240, 3072);

/// Log levels usable with clap's ValueEnum.
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Errors and warnings.
    Warn,
    /// Normal progress output.
    Info,
    /// Verbose diagnostics.
    Debug,
    /// Everything.
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

/// Light attenuation models selectable on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Model {
    /// No attenuation.
    None,
    /// Linear falloff.
    Linear,
    /// Quadratic falloff.
    Quadratic,
}

impl From<Model> for LightModel {
    fn from(model: Model) -> Self {
        match model {
            Model::None => LightModel::None,
            Model::Linear => LightModel::Linear,
            Model::Quadratic => LightModel::Quadratic,
        }
    }
}

/// Command line arguments.
#[derive(Parser)]
#[command(name = "prismray")]
#[command(version)]
#[command(about = "A recursive ray tracer for declarative scene files")]
pub struct Args {
    /// Scene description file
    pub scene: PathBuf,

    /// Output image path, in PNG format
    #[arg(short, long, default_value = "output.png")]
    pub output: PathBuf,

    /// Resolution of the rendered image, WIDTHxHEIGHT
    #[arg(short, long, default_value = "640x480", value_parser = parse_resolution)]
    pub resolution: (u32, u32),

    /// Field of vision in degrees
    #[arg(short, long, default_value_t = 70.0, value_parser = parse_fov)]
    pub fov: f64,

    /// Distance to quench light
    #[arg(short, long, default_value_t = 60.0, value_parser = parse_distance)]
    pub distance: f64,

    /// Light quenching model
    #[arg(short, long, value_enum, default_value_t = Model::Quadratic)]
    pub model: Model,

    /// Shadow factor
    #[arg(short, long, default_value_t = 0.25, value_parser = parse_shadow)]
    pub shadow: f64,

    /// Worker threads; 0 uses all cores
    #[arg(short, long, default_value_t = 0)]
    pub threads: usize,

    /// Logging level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

fn parse_resolution(value: &str) -> Result<(u32, u32), String> {
    let (width, height) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("'{value}' is not of the form WIDTHxHEIGHT"))?;

    let width: u32 = width
        .parse()
        .map_err(|_| format!("'{width}' is not a valid width"))?;
    let height: u32 = height
        .parse()
        .map_err(|_| format!("'{height}' is not a valid height"))?;

    if width < WIDTH_RANGE.0 || width > WIDTH_RANGE.1 {
        return Err(format!(
            "width must lie in {}..{}",
            WIDTH_RANGE.0, WIDTH_RANGE.1
        ));
    }
    if height < HEIGHT_RANGE.0 || height > HEIGHT_RANGE.1 {
        return Err(format!(
            "height must lie in {}..{}",
            HEIGHT_RANGE.0, HEIGHT_RANGE.1
        ));
    }
    Ok((width, height))
}

fn parse_fov(value: &str) -> Result<f64, String> {
    let fov: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid field of vision"))?;
    if !(50.0..=170.0).contains(&fov) {
        return Err(String::from("field of vision must lie in 50..170 degrees"));
    }
    Ok(fov)
}

fn parse_distance(value: &str) -> Result<f64, String> {
    let distance: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid distance"))?;
    if distance <= 0.0 {
        return Err(String::from("distance must be positive"));
    }
    Ok(distance)
}

fn parse_shadow(value: &str) -> Result<f64, String> {
    let shadow: f64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a valid shadow factor"))?;
    if !(0.0..=1.0).contains(&shadow) {
        return Err(String::from("shadow factor must lie in 0..1"));
    }
    Ok(shadow)
}
