use std::error::Error;

use clap::Parser;
use log::info;

use prismray::cli::Args;
use prismray::loader;
use prismray::logger::init_logger;
use prismray::output;
use prismray::renderer::{Renderer, RendererConfig};

fn main() {
    let args = Args::parse();

    init_logger(args.log_level.clone().into());
    info!("prismray {}", env!("CARGO_PKG_VERSION"));

    if let Err(error) = run(&args) {
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let scene = loader::load_scene(&args.scene)?;

    let (width, height) = args.resolution;
    let config = RendererConfig {
        field_of_vision: args.fov,
        max_distance: args.distance,
        shadow_bias: args.shadow,
        num_threads: args.threads,
        buffer_width: width,
        buffer_height: height,
        light_model: args.model.into(),
        ..RendererConfig::default()
    };

    let renderer = Renderer::new(&scene, config);
    let framebuffer = renderer.render();

    output::write_png(&framebuffer, width, height, &args.output)?;
    info!("image saved as {}", args.output.display());

    Ok(())
}
