use crate::nodes::{NodeCategory, NodeInfo};
use crate::params::SmoothedParam;

/// ゲインステージ
///
/// Serves three roles in the graph: plain level control (master,
/// entrainment, subliminal buses), amplitude gating (isochronic pulse gain,
/// driven by the square pulser) and amplitude modulation (subliminal
/// modulator, driven by the message streams). For the driven roles the
/// effective per-sample gain is `base + modulation`, matching a gain
/// parameter with a signal summed into it.
pub struct GainNode {
    node_info: NodeInfo,
    gain: SmoothedParam,
}

impl GainNode {
    pub fn new(sample_rate: f32, name: &str, initial_gain: f32, ramp_seconds: f32) -> Self {
        Self {
            node_info: NodeInfo::new(name, "gain", NodeCategory::Mixing),
            gain: SmoothedParam::new(initial_gain, ramp_seconds, sample_rate),
        }
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn gain_target(&self) -> f32 {
        self.gain.target()
    }

    pub fn gain_value(&self) -> f32 {
        self.gain.value()
    }

    /// ゲインを即時設定
    pub fn set_gain(&mut self, gain: f32) {
        self.gain.set_value(gain);
    }

    /// ゲインを既定の時定数でランプ
    pub fn ramp_gain(&mut self, gain: f32) {
        self.gain.set_target(gain);
    }

    /// ゲインを指定時定数でランプ
    pub fn ramp_gain_with_time_constant(&mut self, gain: f32, time_constant: f32) {
        self.gain.set_target_with_time_constant(gain, time_constant);
    }

    /// モノラルバッファにゲインを適用
    pub fn apply(&mut self, buf: &mut [f32]) {
        for sample in buf.iter_mut() {
            *sample *= self.gain.tick();
        }
    }

    /// 変調信号付きでゲインを適用（振幅変調）
    ///
    /// Effective gain per sample is `base + modulation[i]`.
    pub fn apply_modulated(&mut self, buf: &mut [f32], modulation: &[f32]) {
        for (i, sample) in buf.iter_mut().enumerate() {
            let base = self.gain.tick();
            let modulated = base + modulation.get(i).copied().unwrap_or(0.0);
            *sample *= modulated;
        }
    }

    /// ステレオバッファ対にゲインを適用（1フレームにつき1tick）
    pub fn apply_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let gain = self.gain.tick();
            *l *= gain;
            *r *= gain;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_scales_signal() {
        let mut gain = GainNode::new(44100.0, "test", 0.5, 0.05);
        let mut buf = vec![1.0; 64];
        gain.apply(&mut buf);
        assert!((buf[0] - 0.5).abs() < 1e-6);
        assert!((buf[63] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ramp_is_not_a_step() {
        let mut gain = GainNode::new(44100.0, "test", 0.0, 0.05);
        gain.ramp_gain(1.0);

        let mut buf = vec![1.0; 64];
        gain.apply(&mut buf);

        // Early samples are still near zero, not at the target
        assert!(buf[0] < 0.01);
        assert!(buf[63] < 0.1);
        assert!(buf[63] > buf[0]);
    }

    #[test]
    fn test_modulated_gain_gates_carrier() {
        // Base gain 1.0 plus a ±1 square produces a 0..2 gate
        let mut gain = GainNode::new(44100.0, "pulse", 1.0, 0.05);
        let carrier = vec![0.5; 4];
        let pulser = vec![1.0, 1.0, -1.0, -1.0];

        let mut buf = carrier.clone();
        gain.apply_modulated(&mut buf, &pulser);

        assert!((buf[0] - 1.0).abs() < 1e-6);
        assert!((buf[2] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_base_modulation() {
        // Subliminal modulator: base 0, signal drives the envelope directly
        let mut gain = GainNode::new(44100.0, "modulator", 0.0, 0.05);
        let mut buf = vec![1.0; 3];
        gain.apply_modulated(&mut buf, &[0.25, 0.5, 0.75]);

        assert!((buf[0] - 0.25).abs() < 1e-6);
        assert!((buf[1] - 0.5).abs() < 1e-6);
        assert!((buf[2] - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_stereo_applies_same_gain_per_frame() {
        let mut gain = GainNode::new(44100.0, "master", 0.25, 0.05);
        let mut left = vec![1.0; 16];
        let mut right = vec![-1.0; 16];
        gain.apply_stereo(&mut left, &mut right);

        for (l, r) in left.iter().zip(right.iter()) {
            assert!((l + r).abs() < 1e-6);
        }
    }
}
