pub mod audio;
pub mod cli;
pub mod config;
pub mod controller;
pub mod errors;
pub mod graph;
pub mod media;
pub mod nodes;
pub mod params;
pub mod programs;

pub use audio::AudioContext;
pub use config::{EngineConfig, LimiterConfig};
pub use controller::SignalGraphController;
pub use errors::{ConsoleLogger, LogLevel, Logger, SignalEngineError, SignalEngineResult};
pub use graph::{SignalGraph, StackState};
pub use media::{load_wav, AudioBuffer};
pub use nodes::{NodeCategory, NodeInfo};
pub use params::SmoothedParam;
pub use programs::{builtin_programs, find_program, EntrainmentMode, EntrainmentProgram, ProgramCategory};
