use serde::Serialize;
use uuid::Uuid;

pub mod buffer_source;
pub mod filter;
pub mod gain;
pub mod limiter;
pub mod oscillator;
pub mod panner;
pub mod spectrum_analyzer;

pub use buffer_source::BufferSourceNode;
pub use filter::{BiquadFilterNode, FilterMode};
pub use gain::GainNode;
pub use limiter::DynamicsLimiterNode;
pub use oscillator::{OscillatorNode, Waveform};
pub use panner::StereoPannerNode;
pub use spectrum_analyzer::SpectrumAnalyzerNode;

/// ノードカテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NodeCategory {
    Generator,
    Processor,
    Mixing,
    Analyzer,
}

/// ノード識別情報
///
/// Every live node carries an id and a type tag so the running graph can be
/// inventoried (CLI `info`, dashboards) without exposing node internals.
#[derive(Debug, Clone, Serialize)]
pub struct NodeInfo {
    pub id: Uuid,
    pub name: String,
    pub node_type: &'static str,
    pub category: NodeCategory,
}

impl NodeInfo {
    pub fn new(name: &str, node_type: &'static str, category: NodeCategory) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            node_type,
            category,
        }
    }
}
