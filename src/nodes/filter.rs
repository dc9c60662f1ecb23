use crate::nodes::{NodeCategory, NodeInfo};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterMode {
    LowPass,
    HighPass,
}

impl FilterMode {
    pub fn name(&self) -> &'static str {
        match self {
            FilterMode::LowPass => "LowPass",
            FilterMode::HighPass => "HighPass",
        }
    }
}

/// バイクワッドフィルター（RBJ係数）
///
/// Two places in the graph: the 4kHz low-pass smoothing the momentum
/// stream, and the high-pass at the silent-carrier frequency that strips
/// the audible residue of the modulated subliminal chain.
pub struct BiquadFilterNode {
    node_info: NodeInfo,

    mode: FilterMode,
    frequency: f32,
    q: f32,
    sample_rate: f32,

    // Normalized coefficients
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // Direct form I state
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl BiquadFilterNode {
    pub fn new(sample_rate: f32, name: &str, mode: FilterMode, frequency_hz: f32, q: f32) -> Self {
        let mut filter = Self {
            node_info: NodeInfo::new(name, "biquad_filter", NodeCategory::Processor),
            mode,
            frequency: frequency_hz,
            q,
            sample_rate,
            b0: 0.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        };
        filter.update_coefficients();
        filter
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency = hz;
        self.update_coefficients();
    }

    /// RBJクックブック係数を再計算
    fn update_coefficients(&mut self) {
        // Keep cutoff strictly below Nyquist
        let frequency = self.frequency.min(self.sample_rate * 0.49).max(1.0);
        let omega = 2.0 * std::f32::consts::PI * frequency / self.sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * self.q.max(0.01));

        let (b0, b1, b2) = match self.mode {
            FilterMode::LowPass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterMode::HighPass => {
                let b1 = -(1.0 + cos_omega);
                ((1.0 + cos_omega) / 2.0, b1, (1.0 + cos_omega) / 2.0)
            }
        };

        let a0 = 1.0 + alpha;
        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = -2.0 * cos_omega / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// バッファをインプレースでフィルタリング
    pub fn process(&mut self, buf: &mut [f32]) {
        for sample in buf.iter_mut() {
            let x0 = *sample;
            let y0 = self.b0 * x0 + self.b1 * self.x1 + self.b2 * self.x2
                - self.a1 * self.y1
                - self.a2 * self.y2;

            self.x2 = self.x1;
            self.x1 = x0;
            self.y2 = self.y1;
            self.y1 = y0;

            *sample = y0;
        }
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
