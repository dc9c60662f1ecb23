use std::fmt;

/// スムージング付きパラメーター - クリックノイズ防止のための指数的ランプ
///
/// A live gain or frequency parameter must never jump: an instantaneous
/// change on a running node is audible as a click. `SmoothedParam` keeps a
/// current value that approaches its target exponentially, one step per
/// sample frame, with a configurable time constant.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    coeff: f32,
    time_constant: f32,
    sample_rate: f32,
}

impl SmoothedParam {
    pub fn new(initial: f32, time_constant: f32, sample_rate: f32) -> Self {
        let mut param = Self {
            current: initial,
            target: initial,
            coeff: 0.0,
            time_constant,
            sample_rate,
        };
        param.update_coefficient();
        param
    }

    /// ランプ係数を更新
    fn update_coefficient(&mut self) {
        // One-pole coefficient: after `time_constant` seconds the value has
        // covered ~63% of the distance to the target.
        let samples = (self.time_constant * self.sample_rate).max(1.0);
        self.coeff = 1.0 - (-1.0 / samples).exp();
    }

    /// 即時に値を設定（ランプなし）
    pub fn set_value(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    /// 目標値に向けてランプ開始
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// 時定数を変更して目標値に向けてランプ開始
    pub fn set_target_with_time_constant(&mut self, target: f32, time_constant: f32) {
        self.time_constant = time_constant;
        self.update_coefficient();
        self.target = target;
    }

    /// 1サンプル分進めて現在値を返す
    #[inline]
    pub fn tick(&mut self) -> f32 {
        self.current += self.coeff * (self.target - self.current);
        self.current
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn time_constant(&self) -> f32 {
        self.time_constant
    }

    /// 目標値に十分近いか
    pub fn is_settled(&self) -> bool {
        (self.target - self.current).abs() < 1e-5
    }
}

impl fmt::Display for SmoothedParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} -> {:.4} (tc {:.3}s)", self.current, self.target, self.time_constant)
    }
}
