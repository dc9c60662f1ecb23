use crate::config::LimiterConfig;
use crate::nodes::{NodeCategory, NodeInfo};

/// ダイナミクスリミッター - 最終段の保護用コンプレッサー
///
/// Sits after the master gain. The wide 40dB knee means compression starts
/// easing in well below the threshold, which protects listeners from sudden
/// summed-bus peaks without audible pumping. Stereo-linked: both channels
/// share one envelope so the stereo image does not wander under reduction.
pub struct DynamicsLimiterNode {
    node_info: NodeInfo,

    threshold: f32, // dB
    knee: f32,      // dB
    ratio: f32,
    attack: f32,  // seconds
    release: f32, // seconds

    // Internal state
    envelope: f32, // dB
    gain_reduction: f32,

    // Envelope follower coefficients
    attack_coeff: f32,
    release_coeff: f32,

    sample_rate: f32,
}

impl DynamicsLimiterNode {
    pub fn new(sample_rate: f32, name: &str, config: &LimiterConfig) -> Self {
        let mut limiter = Self {
            node_info: NodeInfo::new(name, "dynamics_limiter", NodeCategory::Processor),
            threshold: config.threshold_db,
            knee: config.knee_db,
            ratio: config.ratio,
            attack: config.attack_seconds,
            release: config.release_seconds,
            envelope: -100.0,
            gain_reduction: 0.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            sample_rate,
        };
        limiter.update_coefficients();
        limiter
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction
    }

    /// エンベロープフォロワーの係数を更新
    fn update_coefficients(&mut self) {
        self.attack_coeff = (-1.0 / (self.attack * self.sample_rate)).exp();
        self.release_coeff = (-1.0 / (self.release * self.sample_rate)).exp();
    }

    fn linear_to_db(linear: f32) -> f32 {
        if linear > 1e-10 {
            20.0 * linear.log10()
        } else {
            -100.0
        }
    }

    fn db_to_linear(db: f32) -> f32 {
        10.0_f32.powf(db / 20.0)
    }

    /// 1フレーム分のゲインリダクションを計算
    fn compute_gain(&mut self, peak: f32) -> f32 {
        let input_db = Self::linear_to_db(peak);

        // Peak-detecting envelope follower
        if input_db > self.envelope {
            self.envelope = input_db + (self.envelope - input_db) * self.attack_coeff;
        } else {
            self.envelope = input_db + (self.envelope - input_db) * self.release_coeff;
        }

        // Soft knee centered on the threshold
        let half_knee = self.knee / 2.0;
        let over = self.envelope - self.threshold;

        self.gain_reduction = if over <= -half_knee {
            0.0
        } else if over < half_knee && self.knee > 0.0 {
            let x = over + half_knee;
            -(1.0 - 1.0 / self.ratio) * x * x / (2.0 * self.knee)
        } else {
            -over * (1.0 - 1.0 / self.ratio)
        };

        Self::db_to_linear(self.gain_reduction)
    }

    /// ステレオバッファ対をステレオリンクで処理
    pub fn process_stereo(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let peak = l.abs().max(r.abs());
            let gain = self.compute_gain(peak);
            *l *= gain;
            *r *= gain;
        }
    }

    pub fn reset(&mut self) {
        self.envelope = -100.0;
        self.gain_reduction = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_config() -> LimiterConfig {
        LimiterConfig::default()
    }

    #[test]
    fn test_quiet_signal_within_knee_only() {
        let config = default_config();
        let mut limiter = DynamicsLimiterNode::new(44100.0, "test", &config);

        // -60dB signal, far below threshold minus half knee
        let mut left = vec![0.001; 512];
        let mut right = vec![0.001; 512];
        limiter.process_stereo(&mut left, &mut right);

        assert!((left[500] - 0.001).abs() < 1e-5, "quiet signal untouched: {}", left[500]);
    }

    #[test]
    fn test_loud_signal_is_reduced() {
        let config = default_config();
        let mut limiter = DynamicsLimiterNode::new(44100.0, "test", &config);

        // 0dB signal, 12dB above the -12dB threshold
        let mut left = vec![1.0; 4096];
        let mut right = vec![1.0; 4096];
        limiter.process_stereo(&mut left, &mut right);

        // After the envelope settles the output must be well below the input
        assert!(left[4000] < 0.8, "loud signal should be reduced: {}", left[4000]);
        assert!(left[4000] > 0.1, "but not silenced: {}", left[4000]);
        assert!(limiter.gain_reduction_db() < -1.0);
    }

    #[test]
    fn test_stereo_link_preserves_balance() {
        let config = default_config();
        let mut limiter = DynamicsLimiterNode::new(44100.0, "test", &config);

        // Loud left channel, quiet right: the ratio between them must survive
        let mut left = vec![1.0; 2048];
        let mut right = vec![0.25; 2048];
        limiter.process_stereo(&mut left, &mut right);

        let balance = right[2000] / left[2000];
        assert!((balance - 0.25).abs() < 1e-4, "stereo balance drifted: {}", balance);
    }

    #[test]
    fn test_output_is_finite() {
        let config = default_config();
        let mut limiter = DynamicsLimiterNode::new(44100.0, "test", &config);

        let mut left: Vec<f32> = (0..2048).map(|n| if n % 7 == 0 { 2.0 } else { 0.0 }).collect();
        let mut right = left.clone();
        limiter.process_stereo(&mut left, &mut right);

        assert!(left.iter().all(|s| s.is_finite()));
        assert!(right.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn test_reset_clears_envelope() {
        let config = default_config();
        let mut limiter = DynamicsLimiterNode::new(44100.0, "test", &config);

        let mut left = vec![1.0; 1024];
        let mut right = vec![1.0; 1024];
        limiter.process_stereo(&mut left, &mut right);
        assert!(limiter.gain_reduction_db() < 0.0);

        limiter.reset();
        assert_eq!(limiter.gain_reduction_db(), 0.0);
    }
}
