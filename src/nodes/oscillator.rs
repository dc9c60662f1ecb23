/*
 * NeuroResonator - 432Hz Neuro-Entrainment Signal Engine
 * Copyright (c) 2025 MACHIKO LAB
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

use crate::nodes::{NodeCategory, NodeInfo};
use crate::params::SmoothedParam;

const TWO_PI: f32 = 2.0 * std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine = 0,
    Square = 1,
}

impl Waveform {
    pub fn name(&self) -> &'static str {
        match self {
            Waveform::Sine => "Sine",
            Waveform::Square => "Square",
        }
    }
}

/// エントレインメント用オシレーター
///
/// Generates the binaural pair, the isochronic carrier and pulser, the
/// subliminal carrier and the spatial LFO. Frequency is a smoothed
/// parameter: a live retune (spatial rotation rate change) ramps instead of
/// stepping.
pub struct OscillatorNode {
    node_info: NodeInfo,

    waveform: Waveform,
    frequency: SmoothedParam,

    // Internal state
    phase: f32,
    sample_rate: f32,
}

impl OscillatorNode {
    pub fn new(sample_rate: f32, name: &str, waveform: Waveform, frequency_hz: f32) -> Self {
        Self {
            node_info: NodeInfo::new(name, "oscillator", NodeCategory::Generator),
            waveform,
            // Instant-set by default; retunes opt into a ramp explicitly.
            frequency: SmoothedParam::new(frequency_hz, 0.01, sample_rate),
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency.target()
    }

    /// 周波数を即時設定
    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency.set_value(hz);
    }

    /// 周波数を指定時定数でランプ
    pub fn ramp_frequency(&mut self, hz: f32, time_constant: f32) {
        self.frequency.set_target_with_time_constant(hz, time_constant);
    }

    fn generate_sample(&self, phase: f32) -> f32 {
        match self.waveform {
            Waveform::Sine => phase.sin(),
            Waveform::Square => {
                let normalized_phase = phase / TWO_PI;
                if normalized_phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// 1ブロック分のサンプルを生成
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.generate_sample(self.phase);

            let frequency = self.frequency.tick();
            self.phase += TWO_PI * frequency / self.sample_rate;

            // Wrap phase to prevent accumulation errors
            while self.phase >= TWO_PI {
                self.phase -= TWO_PI;
            }
        }
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_output() {
        let sample_rate = 44100.0;
        let mut osc = OscillatorNode::new(sample_rate, "test", Waveform::Sine, 440.0);

        let mut out = vec![0.0; 512];
        osc.render(&mut out);

        // sample n should be sin(2pi f n / sr)
        let n = 25;
        let expected = (TWO_PI * 440.0 * n as f32 / sample_rate).sin();
        assert!(
            (out[n] - expected).abs() < 1e-4,
            "expected {}, got {}",
            expected,
            out[n]
        );
    }

    #[test]
    fn test_square_alternates() {
        let mut osc = OscillatorNode::new(100.0, "test", Waveform::Square, 10.0);

        // 10Hz at 100Hz sample rate: 5 samples high, 5 samples low
        let mut out = vec![0.0; 20];
        osc.render(&mut out);

        // Avoid the exact edge samples; phase accumulation is f32
        assert_eq!(out[0], 1.0);
        assert_eq!(out[4], 1.0);
        assert_eq!(out[6], -1.0);
        assert_eq!(out[9], -1.0);
        assert_eq!(out[11], 1.0);
    }

    #[test]
    fn test_frequency_ramp_is_gradual() {
        let mut osc = OscillatorNode::new(44100.0, "test", Waveform::Sine, 0.1);
        osc.ramp_frequency(1.0, 0.5);

        let mut out = vec![0.0; 64];
        osc.render(&mut out);

        // Target reported immediately, current value still ramping
        assert_eq!(osc.frequency(), 1.0);

        let has_signal = out.iter().any(|&s| s.abs() > 0.0);
        assert!(has_signal);
    }

    #[test]
    fn test_reset_restarts_phase() {
        let mut osc = OscillatorNode::new(44100.0, "test", Waveform::Sine, 440.0);
        let mut first = vec![0.0; 64];
        osc.render(&mut first);

        osc.reset();
        let mut second = vec![0.0; 64];
        osc.render(&mut second);

        assert_eq!(first, second);
    }
}
