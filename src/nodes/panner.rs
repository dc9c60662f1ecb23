use crate::nodes::{NodeCategory, NodeInfo};
use crate::params::SmoothedParam;

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

/// ステレオパンナー - 等パワーパンニング則
///
/// Pans an already-stereo bus. For pan <= 0 the right channel folds into the
/// left by the equal-power law and vice versa, so a centered pan is an exact
/// passthrough. The spatial rotation LFO drives the pan position as a
/// per-sample modulation on top of the smoothed base value.
pub struct StereoPannerNode {
    node_info: NodeInfo,
    pan: SmoothedParam,
}

impl StereoPannerNode {
    pub fn new(sample_rate: f32, name: &str, ramp_seconds: f32) -> Self {
        Self {
            node_info: NodeInfo::new(name, "stereo_panner", NodeCategory::Mixing),
            pan: SmoothedParam::new(0.0, ramp_seconds, sample_rate),
        }
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn pan_target(&self) -> f32 {
        self.pan.target()
    }

    pub fn pan_value(&self) -> f32 {
        self.pan.value()
    }

    /// パン位置を即時設定
    pub fn set_pan(&mut self, pan: f32) {
        self.pan.set_value(pan.clamp(-1.0, 1.0));
    }

    /// パン位置を既定の時定数でランプ（回転停止時のセンター復帰）
    pub fn ramp_pan(&mut self, pan: f32) {
        self.pan.set_target(pan.clamp(-1.0, 1.0));
    }

    fn pan_frame(left: f32, right: f32, pan: f32) -> (f32, f32) {
        if pan <= 0.0 {
            let x = (pan + 1.0) * FRAC_PI_2;
            (left + right * x.cos(), right * x.sin())
        } else {
            let x = pan * FRAC_PI_2;
            (left * x.cos(), right + left * x.sin())
        }
    }

    /// ステレオバッファ対をインプレースでパンニング
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        for (l, r) in left.iter_mut().zip(right.iter_mut()) {
            let pan = self.pan.tick().clamp(-1.0, 1.0);
            let (out_l, out_r) = Self::pan_frame(*l, *r, pan);
            *l = out_l;
            *r = out_r;
        }
    }

    /// モノラル入力を等パワー則でステレオバスへ加算
    ///
    /// Used for the hard-panned binaural pair: pan -1 lands entirely in the
    /// left bus, +1 entirely in the right.
    pub fn add_panned_mono(&mut self, input: &[f32], left: &mut [f32], right: &mut [f32]) {
        for (i, &sample) in input.iter().enumerate() {
            let pan = self.pan.tick().clamp(-1.0, 1.0);
            let x = (pan + 1.0) * FRAC_PI_4;
            left[i] += sample * x.cos();
            right[i] += sample * x.sin();
        }
    }

    /// LFO変調付きパンニング - 実効パンは `base + modulation`
    pub fn process_modulated(&mut self, left: &mut [f32], right: &mut [f32], modulation: &[f32]) {
        for (i, (l, r)) in left.iter_mut().zip(right.iter_mut()).enumerate() {
            let base = self.pan.tick();
            let pan = (base + modulation.get(i).copied().unwrap_or(0.0)).clamp(-1.0, 1.0);
            let (out_l, out_r) = Self::pan_frame(*l, *r, pan);
            *l = out_l;
            *r = out_r;
        }
    }
}
