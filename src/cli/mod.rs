use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};

use crate::config::EngineConfig;
use crate::controller::SignalGraphController;
use crate::media;
use crate::programs;

#[derive(Parser)]
#[command(name = "neuro-resonator")]
#[command(about = "432Hz neuro-entrainment signal engine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the built-in entrainment programs
    List {
        /// Filter by category (wealth, memory, healing, ...)
        #[arg(long)]
        category: Option<String>,
    },
    /// Play a built-in program
    Play {
        /// Program ID (see `list`)
        program: String,
        /// Playback duration in seconds
        #[arg(long, default_value_t = 30.0)]
        duration: f64,
        /// Master volume, 0.0 to 1.0
        #[arg(long, default_value_t = 0.8)]
        volume: f32,
        /// WAV file carrying the subliminal message track
        #[arg(long)]
        subliminal: Option<PathBuf>,
        /// Route the subliminal carrier into the audible band
        #[arg(long)]
        diagnostic: bool,
        /// Dump the live node inventory as JSON before playing
        #[arg(long)]
        show_nodes: bool,
        /// Engine configuration TOML
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Play a raw binaural tone
    Tone {
        /// Carrier frequency in Hz (440-standard; retuned to 432 internally)
        carrier: f32,
        /// Beat frequency in Hz
        beat: f32,
        /// Layer the gated isochronic carrier on top of the pair
        #[arg(long)]
        hybrid: bool,
        /// Playback duration in seconds
        #[arg(long, default_value_t = 30.0)]
        duration: f64,
        /// Master volume, 0.0 to 1.0
        #[arg(long, default_value_t = 0.8)]
        volume: f32,
        /// Spatial rotation rate in Hz (0 disables)
        #[arg(long, default_value_t = 0.0)]
        spatial: f32,
        /// Engine configuration TOML
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective engine configuration as TOML
    Config {
        /// Engine configuration TOML to merge over the defaults
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

pub fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::List { category } => list_programs(category),
        Commands::Play {
            program,
            duration,
            volume,
            subliminal,
            diagnostic,
            show_nodes,
            config,
        } => play_program(program, duration, volume, subliminal, diagnostic, show_nodes, config),
        Commands::Tone {
            carrier,
            beat,
            hybrid,
            duration,
            volume,
            spatial,
            config,
        } => play_tone(carrier, beat, hybrid, duration, volume, spatial, config),
        Commands::Config { config } => {
            let config = load_config(config)?;
            println!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn list_programs(category: Option<String>) -> Result<()> {
    let filter = category.map(|c| c.to_lowercase());

    println!(
        "{:<20} {:<20} {:<14} {:>8} {:>7}  {:<10} {}",
        "ID", "NAME", "CATEGORY", "CARRIER", "BEAT", "MODE", "SPATIAL"
    );
    for program in programs::builtin_programs() {
        if let Some(filter) = &filter {
            if program.category.name().to_lowercase() != *filter {
                continue;
            }
        }
        println!(
            "{:<20} {:<20} {:<14} {:>6}Hz {:>5}Hz  {:<10} {}",
            program.id,
            program.name,
            program.category.name(),
            program.carrier_hz,
            program.beat_hz,
            if program.mode.is_hybrid() { "isochronic" } else { "binaural" },
            if program.spatial { "yes" } else { "no" },
        );
    }
    Ok(())
}

fn play_program(
    program_id: String,
    duration: f64,
    volume: f32,
    subliminal: Option<PathBuf>,
    diagnostic: bool,
    show_nodes: bool,
    config: Option<PathBuf>,
) -> Result<()> {
    let program = programs::find_program(&program_id)
        .ok_or_else(|| anyhow!("unknown program: {}", program_id))?;

    let config = load_config(config)?;
    let mut controller = SignalGraphController::new(config);
    controller.initialize()?;

    controller.set_master_volume(volume);
    controller.set_entrainment_volume(1.0);
    controller.start_entrainment(program.carrier_hz, program.beat_hz, program.mode.is_hybrid());

    if program.spatial {
        controller.toggle_spatial_rotation(true, 0.1);
    }

    if let Some(path) = subliminal {
        match media::load_wav(&path) {
            Ok(buffer) => {
                controller.set_subliminal_buffer(Some(buffer));
            }
            Err(e) => eprintln!("Subliminal buffer unavailable, falling back to carrier only: {}", e),
        }
    }
    controller.set_subliminal_playback_rate(program.subliminal_rate);
    controller.set_subliminal_volume(program.subliminal_level);
    controller.start_subliminal(diagnostic);

    if show_nodes {
        println!("{}", serde_json::to_string_pretty(&controller.node_inventory())?);
    }

    println!(
        "Playing '{}' ({:.2}Hz carrier, {:.2}Hz beat) for {:.0}s",
        program.name, program.carrier_hz, program.beat_hz, duration
    );
    thread::sleep(Duration::from_secs_f64(duration));

    controller.stop_all();
    controller.shutdown();
    Ok(())
}

fn play_tone(
    carrier: f32,
    beat: f32,
    hybrid: bool,
    duration: f64,
    volume: f32,
    spatial: f32,
    config: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config)?;
    let mut controller = SignalGraphController::new(config);
    controller.initialize()?;

    controller.set_master_volume(volume);
    controller.set_entrainment_volume(1.0);
    controller.start_entrainment(carrier, beat, hybrid);

    if spatial > 0.0 {
        controller.toggle_spatial_rotation(true, spatial);
    }

    println!("Playing {:.2}Hz carrier / {:.2}Hz beat for {:.0}s", carrier, beat, duration);
    thread::sleep(Duration::from_secs_f64(duration));

    controller.stop_all();
    controller.shutdown();
    Ok(())
}
