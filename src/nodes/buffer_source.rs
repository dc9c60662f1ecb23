use std::sync::Arc;

use crate::media::AudioBuffer;
use crate::nodes::{NodeCategory, NodeInfo};
use crate::params::SmoothedParam;

/// ループ再生バッファソース
///
/// Plays a decoded message buffer with a variable playback rate. Rate
/// changes ramp rather than step, so a live rate update glides in pitch.
/// Playback is scheduled against the engine clock: a source stays silent
/// until its start time, which is how the paired momentum streams begin at
/// the exact same instant.
pub struct BufferSourceNode {
    node_info: NodeInfo,

    buffer: Arc<AudioBuffer>,
    playback_rate: SmoothedParam,
    looping: bool,

    // Internal state
    position: f64,
    start_time: f64,
    finished: bool,
    sample_rate: f32,
}

impl BufferSourceNode {
    pub fn new(
        sample_rate: f32,
        name: &str,
        buffer: Arc<AudioBuffer>,
        playback_rate: f32,
        rate_ramp_seconds: f32,
        looping: bool,
        start_time: f64,
    ) -> Self {
        Self {
            node_info: NodeInfo::new(name, "buffer_source", NodeCategory::Generator),
            buffer,
            playback_rate: SmoothedParam::new(playback_rate, rate_ramp_seconds, sample_rate),
            looping,
            position: 0.0,
            start_time,
            finished: false,
            sample_rate,
        }
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn playback_rate(&self) -> f32 {
        self.playback_rate.target()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 再生レートをランプで変更
    pub fn ramp_playback_rate(&mut self, rate: f32) {
        self.playback_rate.set_target(rate);
    }

    /// 再生レートを指定時定数でランプ
    pub fn ramp_playback_rate_with_time_constant(&mut self, rate: f32, time_constant: f32) {
        self.playback_rate
            .set_target_with_time_constant(rate, time_constant);
    }

    fn interpolated_sample(&self) -> f32 {
        let samples = self.buffer.samples();
        let index = self.position as usize;
        let frac = (self.position - index as f64) as f32;

        let a = samples[index];
        let b = if index + 1 < samples.len() {
            samples[index + 1]
        } else if self.looping {
            samples[0]
        } else {
            0.0
        };

        a + (b - a) * frac
    }

    /// 1ブロック分のサンプルを生成
    ///
    /// `block_start_time` is the engine time of `out[0]`. Samples before the
    /// scheduled start time are silent.
    pub fn render(&mut self, out: &mut [f32], block_start_time: f64) {
        let buffer_len = self.buffer.len() as f64;
        if buffer_len == 0.0 {
            out.fill(0.0);
            return;
        }

        let sample_period = 1.0 / self.sample_rate as f64;
        let rate_scale = self.buffer.sample_rate() as f64 / self.sample_rate as f64;

        for (i, sample) in out.iter_mut().enumerate() {
            let t = block_start_time + i as f64 * sample_period;
            if t < self.start_time || self.finished {
                *sample = 0.0;
                continue;
            }

            *sample = self.interpolated_sample();

            let rate = self.playback_rate.tick() as f64;
            self.position += rate * rate_scale;

            if self.position >= buffer_len {
                if self.looping {
                    self.position %= buffer_len;
                } else {
                    self.finished = true;
                }
            }
        }
    }

    pub fn reset(&mut self) {
        self.position = 0.0;
        self.finished = false;
    }
}
