use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{SignalEngineError, SignalEngineResult};

/// プログラムカテゴリ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgramCategory {
    Wealth,
    Memory,
    Healing,
    Performance,
    Reality,
    Social,
    Transcendence,
}

impl ProgramCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ProgramCategory::Wealth => "Wealth",
            ProgramCategory::Memory => "Memory",
            ProgramCategory::Healing => "Healing",
            ProgramCategory::Performance => "Performance",
            ProgramCategory::Reality => "Reality",
            ProgramCategory::Social => "Social",
            ProgramCategory::Transcendence => "Transcendence",
        }
    }
}

/// エントレインメントモード
///
/// Isochronic programs run the binaural pair with the gated carrier layered
/// on top (the hybrid stack); pure binaural programs skip the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrainmentMode {
    Binaural,
    Isochronic,
}

impl EntrainmentMode {
    pub fn is_hybrid(&self) -> bool {
        matches!(self, EntrainmentMode::Isochronic)
    }
}

/// エントレインメントプログラム - 内蔵プリセット
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrainmentProgram {
    pub id: String,
    pub name: String,
    pub category: ProgramCategory,
    pub description: String,
    pub carrier_hz: f32,
    pub beat_hz: f32,
    pub mode: EntrainmentMode,
    pub spatial: bool,
    pub subliminal_rate: f32,
    pub subliminal_level: f32,
}

#[allow(clippy::too_many_arguments)]
fn program(
    id: &str,
    name: &str,
    category: ProgramCategory,
    description: &str,
    carrier_hz: f32,
    beat_hz: f32,
    mode: EntrainmentMode,
    spatial: bool,
    subliminal_rate: f32,
    subliminal_level: f32,
) -> EntrainmentProgram {
    EntrainmentProgram {
        id: id.to_string(),
        name: name.to_string(),
        category,
        description: description.to_string(),
        carrier_hz,
        beat_hz,
        mode,
        spatial,
        subliminal_rate,
        subliminal_level,
    }
}

/// 内蔵プログラムカタログ
pub fn builtin_programs() -> Vec<EntrainmentProgram> {
    use EntrainmentMode::{Binaural, Isochronic};
    use ProgramCategory::*;

    vec![
        program(
            "money-magnet",
            "Money Magnet",
            Wealth,
            "Rewire poverty triggers into high-frequency abundance alignment.",
            432.0, 7.83, Binaural, true, 3.8, 0.2,
        ),
        program(
            "wealth-architect",
            "Wealth Architect",
            Wealth,
            "Structural reorganization of the wealth-mindset via architectural patterns.",
            432.0, 14.0, Isochronic, true, 4.5, 0.2,
        ),
        program(
            "wealth-singularity",
            "Wealth Singularity",
            Wealth,
            "Advanced alignment with global supply chains and universal flow.",
            852.0, 7.83, Binaural, true, 5.0, 0.2,
        ),
        program(
            "memory-genus-40hz",
            "GENUS 40Hz Memory",
            Memory,
            "40Hz Gamma protocol for peak synaptic plasticity and instant recall.",
            432.0, 40.0, Isochronic, true, 4.2, 0.15,
        ),
        program(
            "dna-regen",
            "DNA REGEN",
            Healing,
            "Surgical sub-mix for cellular reconstruction and genetic repair.",
            528.0, 4.5, Binaural, true, 4.8, 0.15,
        ),
        program(
            "vagus-reset",
            "Vagus Nerve Reset",
            Healing,
            "Instant parasympathetic activation and fight-or-flight shutdown.",
            174.0, 0.1, Binaural, false, 3.0, 0.2,
        ),
        program(
            "elevated-emotions",
            "Elevated Emotions",
            Healing,
            "Heart-brain coherence protocol for gratitude, bliss, and emotional alignment.",
            528.0, 10.0, Binaural, true, 3.5, 0.2,
        ),
        program(
            "restore-1.0",
            "Restore 1.0",
            Healing,
            "Pure 1Hz Delta for deep systemic reboot and restorative rest.",
            174.0, 1.0, Binaural, false, 3.0, 0.2,
        ),
        program(
            "habit-breaker",
            "Habit Breaker",
            Performance,
            "Dissolves deep-seated neural loops and conditioning.",
            432.0, 7.83, Isochronic, true, 4.5, 0.2,
        ),
        program(
            "dopamine-reset",
            "Dopamine Reset",
            Performance,
            "Neural fasting to restore focus and high-value motivation.",
            432.0, 10.0, Isochronic, false, 3.5, 0.2,
        ),
        program(
            "peak-flow",
            "Peak Flow",
            Performance,
            "Effortless action and the Alpha-state bridge.",
            432.0, 10.0, Binaural, true, 4.2, 0.2,
        ),
        program(
            "the-zone",
            "The Zone",
            Performance,
            "Elite athletic focus and deep motor-neuron coordination.",
            432.0, 12.5, Isochronic, true, 4.5, 0.2,
        ),
        program(
            "the-indestructible",
            "The Indestructible",
            Performance,
            "Unshakeable confidence and mental resilience protocol.",
            174.0, 15.0, Binaural, false, 4.0, 0.2,
        ),
        program(
            "magnetic-voice",
            "Magnetic Voice",
            Social,
            "Commanding articulation and effortlessly resonant speech.",
            741.0, 14.0, Isochronic, false, 5.0, 0.2,
        ),
        program(
            "executive-presence",
            "Executive Presence",
            Social,
            "The \"Immovable Center\" protocol for power and authority.",
            741.0, 15.0, Binaural, false, 4.0, 0.2,
        ),
        program(
            "soulmate-sync",
            "Soulmate Sync",
            Social,
            "Magnetic frequency for attracting a divine match or soulmate.",
            639.0, 6.3, Binaural, true, 3.0, 0.2,
        ),
        program(
            "the-negotiator",
            "The Negotiator",
            Social,
            "Winning outcomes through harmony and analytical precision.",
            639.0, 14.0, Isochronic, false, 4.5, 0.2,
        ),
        program(
            "heart-brain-sync",
            "Heart-Brain Sync",
            Reality,
            "Precision alignment between cardiac rhythm and neural oscillation.",
            528.0, 0.1, Binaural, true, 4.0, 0.2,
        ),
        program(
            "the-observer",
            "The Observer",
            Transcendence,
            "Advanced Ego-dissolution and non-dual awareness.",
            174.0, 0.5, Binaural, false, 2.5, 0.2,
        ),
        program(
            "quantum-aha",
            "Quantum Collapse",
            Transcendence,
            "Instantaneous manifestation via the collapse of the quantum wave.",
            963.0, 40.0, Isochronic, true, 6.0, 0.2,
        ),
    ]
}

/// IDでプログラムを検索
pub fn find_program(id: &str) -> Option<EntrainmentProgram> {
    builtin_programs().into_iter().find(|p| p.id == id)
}

/// JSONファイルからプログラムカタログを読み込む
pub fn load_programs<P: AsRef<Path>>(path: P) -> SignalEngineResult<Vec<EntrainmentProgram>> {
    let path_str = path.as_ref().display().to_string();
    let content = std::fs::read_to_string(&path).map_err(|e| SignalEngineError::FileIo {
        operation: "read programs".to_string(),
        path: path_str.clone(),
        reason: e.to_string(),
    })?;

    serde_json::from_str(&content).map_err(|e| SignalEngineError::ConfigParsing {
        file: path_str,
        reason: e.to_string(),
    })
}

/// プログラムカタログをJSONファイルへ保存
pub fn save_programs<P: AsRef<Path>>(
    path: P,
    programs: &[EntrainmentProgram],
) -> SignalEngineResult<()> {
    let path_str = path.as_ref().display().to_string();
    let json = serde_json::to_string_pretty(programs).map_err(|e| SignalEngineError::Internal {
        message: format!("Failed to serialize programs: {}", e),
    })?;

    std::fs::write(&path, json).map_err(|e| SignalEngineError::FileIo {
        operation: "write programs".to_string(),
        path: path_str,
        reason: e.to_string(),
    })
}
