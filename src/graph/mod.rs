use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::media::AudioBuffer;
use crate::nodes::{
    BiquadFilterNode, BufferSourceNode, DynamicsLimiterNode, FilterMode, GainNode, NodeInfo,
    OscillatorNode, SpectrumAnalyzerNode, StereoPannerNode, Waveform,
};

/// スタック稼働状態
///
/// Kept explicit rather than inferred from the option fields; the two are
/// updated together by the graph operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum StackState {
    Idle,
    Running,
}

impl StackState {
    pub fn is_running(&self) -> bool {
        matches!(self, StackState::Running)
    }
}

/// アイソクロニックレイヤー - キャリアを矩形波でゲート
struct IsochronicLayer {
    carrier: OscillatorNode,
    pulser: OscillatorNode,
    pulse_gain: GainNode,
}

/// エントレインメントスタック - ハードパンされたバイノーラルペア
struct EntrainmentStack {
    osc_left: OscillatorNode,
    osc_right: OscillatorNode,
    panner_left: StereoPannerNode,
    panner_right: StereoPannerNode,
    isochronic: Option<IsochronicLayer>,
}

/// メッセージストリームペア - AとB（モメンタム）
struct MessageStreams {
    source_a: BufferSourceNode,
    source_b: BufferSourceNode,
    momentum_filter: BiquadFilterNode,
    momentum_trim: GainNode,
}

/// サブリミナルスタック - 超音波キャリアの振幅変調
struct SubliminalStack {
    carrier: OscillatorNode,
    modulator: GainNode,
    highpass: Option<BiquadFilterNode>,
    streams: Option<MessageStreams>,
}

/// 固定トポロジーのミックスバス
struct MixBus {
    entrainment_gain: GainNode,
    subliminal_gain: GainNode,
    panner: StereoPannerNode,
    master_gain: GainNode,
    limiter: DynamicsLimiterNode,
    analyzer: SpectrumAnalyzerNode,
}

/// 再利用スクラッチバッファ - コールバック中の割り当て回避
struct ScratchBuffers {
    mono_a: Vec<f32>,
    mono_b: Vec<f32>,
    mono_c: Vec<f32>,
    ent_left: Vec<f32>,
    ent_right: Vec<f32>,
    bus_left: Vec<f32>,
    bus_right: Vec<f32>,
    lfo: Vec<f32>,
}

impl ScratchBuffers {
    fn new() -> Self {
        Self {
            mono_a: Vec::new(),
            mono_b: Vec::new(),
            mono_c: Vec::new(),
            ent_left: Vec::new(),
            ent_right: Vec::new(),
            bus_left: Vec::new(),
            bus_right: Vec::new(),
            lfo: Vec::new(),
        }
    }

    fn ensure(&mut self, frames: usize) {
        for buf in [
            &mut self.mono_a,
            &mut self.mono_b,
            &mut self.mono_c,
            &mut self.ent_left,
            &mut self.ent_right,
            &mut self.bus_left,
            &mut self.bus_right,
            &mut self.lfo,
        ] {
            if buf.len() < frames {
                buf.resize(frames, 0.0);
            }
        }
    }
}

/// シグナルグラフ - エンジンの全ノード状態
///
/// The controller mutates this under a mutex; the audio callback locks it,
/// renders one block and advances the frame clock. Topology is fixed: the
/// two stacks and the spatial LFO are the only optional parts.
///
/// Signal flow:
///
///   entrainment stack ──> entrainment gain ─┐
///                                           ├─> panner -> master -> limiter -> out
///   subliminal stack ───> subliminal gain ──┘                          │
///                                                                 analyzer tap
pub struct SignalGraph {
    config: EngineConfig,
    sample_rate: f32,

    entrainment: Option<EntrainmentStack>,
    entrainment_state: StackState,

    subliminal: Option<SubliminalStack>,
    subliminal_state: StackState,

    spatial_lfo: Option<OscillatorNode>,

    bus: MixBus,
    scratch: ScratchBuffers,

    frames_rendered: u64,
}

impl SignalGraph {
    pub fn new(sample_rate: f32, config: &EngineConfig) -> Self {
        let bus = MixBus {
            entrainment_gain: GainNode::new(
                sample_rate,
                "entrainment_gain",
                0.0,
                config.entrainment_ramp_seconds,
            ),
            subliminal_gain: GainNode::new(
                sample_rate,
                "subliminal_gain",
                0.0,
                config.subliminal_ramp_seconds,
            ),
            panner: StereoPannerNode::new(sample_rate, "spatial_panner", config.pan_ramp_seconds),
            master_gain: GainNode::new(sample_rate, "master_gain", 1.0, config.master_ramp_seconds),
            limiter: DynamicsLimiterNode::new(sample_rate, "output_limiter", &config.limiter),
            analyzer: SpectrumAnalyzerNode::new(sample_rate, "output_analyzer", config.fft_size),
        };

        Self {
            config: config.clone(),
            sample_rate,
            entrainment: None,
            entrainment_state: StackState::Idle,
            subliminal: None,
            subliminal_state: StackState::Idle,
            spatial_lfo: None,
            bus,
            scratch: ScratchBuffers::new(),
            frames_rendered: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// レンダリング済みフレーム数から導出したエンジン時刻（秒）
    pub fn current_time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn entrainment_state(&self) -> StackState {
        self.entrainment_state
    }

    pub fn subliminal_state(&self) -> StackState {
        self.subliminal_state
    }

    pub fn spatial_rotation_active(&self) -> bool {
        self.spatial_lfo.is_some()
    }

    // ---- Entrainment stack -------------------------------------------------

    /// バイノーラルペアを起動（再起動はスタック差し替え）
    ///
    /// Left and right run at `carrier * tuning_ratio -/+ beat/2`, hard-panned
    /// to their own channels. `hybrid` layers the gated isochronic carrier on
    /// top of the pair, centered.
    pub fn start_entrainment(&mut self, carrier_hz: f32, beat_hz: f32, hybrid: bool) {
        let tuned = carrier_hz * self.config.tuning_ratio;
        let half_beat = beat_hz / 2.0;

        let mut panner_left = StereoPannerNode::new(self.sample_rate, "binaural_pan_l", 0.01);
        panner_left.set_pan(-1.0);
        let mut panner_right = StereoPannerNode::new(self.sample_rate, "binaural_pan_r", 0.01);
        panner_right.set_pan(1.0);

        let isochronic = if hybrid {
            Some(IsochronicLayer {
                carrier: OscillatorNode::new(self.sample_rate, "iso_carrier", Waveform::Sine, tuned),
                pulser: OscillatorNode::new(self.sample_rate, "iso_pulser", Waveform::Square, beat_hz),
                // Base 1.0 plus the +/-1 square gives a 0..2 amplitude gate
                pulse_gain: GainNode::new(self.sample_rate, "iso_pulse_gain", 1.0, 0.01),
            })
        } else {
            None
        };

        self.entrainment = Some(EntrainmentStack {
            osc_left: OscillatorNode::new(
                self.sample_rate,
                "binaural_osc_l",
                Waveform::Sine,
                tuned - half_beat,
            ),
            osc_right: OscillatorNode::new(
                self.sample_rate,
                "binaural_osc_r",
                Waveform::Sine,
                tuned + half_beat,
            ),
            panner_left,
            panner_right,
            isochronic,
        });
        self.entrainment_state = StackState::Running;
    }

    pub fn stop_entrainment(&mut self) {
        self.entrainment = None;
        self.entrainment_state = StackState::Idle;
    }

    /// バイノーラルペアの周波数ターゲット（左, 右）
    pub fn entrainment_frequencies(&self) -> Option<(f32, f32)> {
        self.entrainment
            .as_ref()
            .map(|stack| (stack.osc_left.frequency(), stack.osc_right.frequency()))
    }

    /// アイソクロニックレイヤーの周波数（キャリア, パルス）
    pub fn isochronic_frequencies(&self) -> Option<(f32, f32)> {
        self.entrainment
            .as_ref()
            .and_then(|stack| stack.isochronic.as_ref())
            .map(|iso| (iso.carrier.frequency(), iso.pulser.frequency()))
    }

    // ---- Subliminal stack --------------------------------------------------

    /// サブリミナルスタックを起動
    ///
    /// With a message buffer, stream A plays at `base_rate` and stream B at
    /// `base_rate * momentum_rate_ratio` through the momentum low-pass and
    /// trim; both are scheduled at the identical instant `now + lead` so
    /// their first frames align. Without a buffer the modulator holds the
    /// constant carrier-only level and no sources exist.
    pub fn start_subliminal(
        &mut self,
        diagnostic: bool,
        buffer: Option<Arc<AudioBuffer>>,
        base_rate: f32,
    ) {
        let carrier_hz = if diagnostic {
            self.config.diagnostic_carrier_hz
        } else {
            self.config.silent_carrier_hz * self.config.tuning_ratio
        };

        let carrier =
            OscillatorNode::new(self.sample_rate, "subliminal_carrier", Waveform::Sine, carrier_hz);

        let highpass = if diagnostic {
            None
        } else {
            Some(BiquadFilterNode::new(
                self.sample_rate,
                "subliminal_highpass",
                FilterMode::HighPass,
                self.config.silent_carrier_hz,
                1.0,
            ))
        };

        let (modulator, streams) = match buffer {
            Some(buffer) => {
                let start_time = self.current_time() + self.config.stream_lead_seconds;
                let momentum_trim =
                    GainNode::new(self.sample_rate, "momentum_trim", self.config.momentum_trim, 0.01);

                let streams = MessageStreams {
                    source_a: BufferSourceNode::new(
                        self.sample_rate,
                        "message_stream_a",
                        Arc::clone(&buffer),
                        base_rate,
                        self.config.rate_ramp_seconds,
                        true,
                        start_time,
                    ),
                    source_b: BufferSourceNode::new(
                        self.sample_rate,
                        "message_stream_b",
                        buffer,
                        base_rate * self.config.momentum_rate_ratio,
                        self.config.rate_ramp_seconds,
                        true,
                        start_time,
                    ),
                    momentum_filter: BiquadFilterNode::new(
                        self.sample_rate,
                        "momentum_lowpass",
                        FilterMode::LowPass,
                        self.config.momentum_lowpass_hz,
                        0.707,
                    ),
                    momentum_trim,
                };

                // Base gain 0: the message streams drive the envelope alone
                let modulator =
                    GainNode::new(self.sample_rate, "subliminal_modulator", 0.0, 0.01);
                (modulator, Some(streams))
            }
            None => {
                // Carrier-only: steady tone at the configured level
                let modulator = GainNode::new(
                    self.sample_rate,
                    "subliminal_modulator",
                    self.config.carrier_only_level,
                    0.01,
                );
                (modulator, None)
            }
        };

        self.subliminal = Some(SubliminalStack {
            carrier,
            modulator,
            highpass,
            streams,
        });
        self.subliminal_state = StackState::Running;
    }

    pub fn stop_subliminal(&mut self) {
        self.subliminal = None;
        self.subliminal_state = StackState::Idle;
    }

    pub fn stop_all(&mut self) {
        self.stop_entrainment();
        self.stop_subliminal();
    }

    pub fn subliminal_carrier_frequency(&self) -> Option<f32> {
        self.subliminal.as_ref().map(|stack| stack.carrier.frequency())
    }

    pub fn subliminal_has_streams(&self) -> bool {
        self.subliminal
            .as_ref()
            .map(|stack| stack.streams.is_some())
            .unwrap_or(false)
    }

    pub fn subliminal_modulator_level(&self) -> Option<f32> {
        self.subliminal.as_ref().map(|stack| stack.modulator.gain_target())
    }

    /// 両ストリームのスケジュール開始時刻（A, B）
    pub fn subliminal_start_times(&self) -> Option<(f64, f64)> {
        self.subliminal
            .as_ref()
            .and_then(|stack| stack.streams.as_ref())
            .map(|streams| (streams.source_a.start_time(), streams.source_b.start_time()))
    }

    /// 両ストリームの再生レートターゲット（A, B）
    pub fn subliminal_rate_targets(&self) -> Option<(f32, f32)> {
        self.subliminal
            .as_ref()
            .and_then(|stack| stack.streams.as_ref())
            .map(|streams| {
                (
                    streams.source_a.playback_rate(),
                    streams.source_b.playback_rate(),
                )
            })
    }

    /// ライブストリームの再生レートをランプで変更（比率維持）
    pub fn set_subliminal_playback_rate(&mut self, base_rate: f32) {
        let ratio = self.config.momentum_rate_ratio;
        let tc = self.config.rate_ramp_seconds;
        if let Some(streams) = self.subliminal.as_mut().and_then(|s| s.streams.as_mut()) {
            streams
                .source_a
                .ramp_playback_rate_with_time_constant(base_rate, tc);
            streams
                .source_b
                .ramp_playback_rate_with_time_constant(base_rate * ratio, tc);
        }
    }

    // ---- Spatial rotation --------------------------------------------------

    /// 空間ローテーションの有効化/無効化
    ///
    /// Enabling with no LFO creates a fresh sine at `rate_hz`; enabling with
    /// a live LFO retunes it over the slow spatial time constant. Disabling
    /// drops the LFO and ramps the pan back to center.
    pub fn set_spatial_rotation(&mut self, enabled: bool, rate_hz: f32) {
        if enabled {
            match self.spatial_lfo.as_mut() {
                Some(lfo) => lfo.ramp_frequency(rate_hz, self.config.spatial_retune_seconds),
                None => {
                    self.spatial_lfo = Some(OscillatorNode::new(
                        self.sample_rate,
                        "spatial_lfo",
                        Waveform::Sine,
                        rate_hz,
                    ));
                }
            }
        } else {
            self.spatial_lfo = None;
            self.bus.panner.ramp_pan(0.0);
        }
    }

    pub fn spatial_rotation_rate(&self) -> Option<f32> {
        self.spatial_lfo.as_ref().map(|lfo| lfo.frequency())
    }

    pub fn pan_target(&self) -> f32 {
        self.bus.panner.pan_target()
    }

    // ---- Bus levels --------------------------------------------------------

    /// マスターゲインターゲットをランプ設定（カーブ適用済みの値）
    pub fn ramp_master_gain(&mut self, gain: f32) {
        self.bus.master_gain.ramp_gain(gain);
    }

    pub fn ramp_entrainment_gain(&mut self, gain: f32) {
        self.bus.entrainment_gain.ramp_gain(gain);
    }

    pub fn ramp_subliminal_gain(&mut self, gain: f32) {
        self.bus.subliminal_gain.ramp_gain(gain);
    }

    pub fn master_gain_target(&self) -> f32 {
        self.bus.master_gain.gain_target()
    }

    pub fn entrainment_gain_target(&self) -> f32 {
        self.bus.entrainment_gain.gain_target()
    }

    pub fn entrainment_gain_value(&self) -> f32 {
        self.bus.entrainment_gain.gain_value()
    }

    pub fn subliminal_gain_target(&self) -> f32 {
        self.bus.subliminal_gain.gain_target()
    }

    // ---- Monitoring --------------------------------------------------------

    /// 出力バスの振幅スペクトラム
    pub fn output_spectrum(&self) -> Vec<f32> {
        self.bus.analyzer.magnitude_spectrum()
    }

    pub fn output_peak_frequency(&self) -> f32 {
        self.bus.analyzer.peak_frequency()
    }

    /// 稼働中の全ノードの識別情報
    pub fn node_inventory(&self) -> Vec<NodeInfo> {
        let mut inventory = vec![
            self.bus.entrainment_gain.node_info().clone(),
            self.bus.subliminal_gain.node_info().clone(),
            self.bus.panner.node_info().clone(),
            self.bus.master_gain.node_info().clone(),
            self.bus.limiter.node_info().clone(),
            self.bus.analyzer.node_info().clone(),
        ];

        if let Some(stack) = &self.entrainment {
            inventory.push(stack.osc_left.node_info().clone());
            inventory.push(stack.osc_right.node_info().clone());
            inventory.push(stack.panner_left.node_info().clone());
            inventory.push(stack.panner_right.node_info().clone());
            if let Some(iso) = &stack.isochronic {
                inventory.push(iso.carrier.node_info().clone());
                inventory.push(iso.pulser.node_info().clone());
                inventory.push(iso.pulse_gain.node_info().clone());
            }
        }

        if let Some(stack) = &self.subliminal {
            inventory.push(stack.carrier.node_info().clone());
            inventory.push(stack.modulator.node_info().clone());
            if let Some(highpass) = &stack.highpass {
                inventory.push(highpass.node_info().clone());
            }
            if let Some(streams) = &stack.streams {
                inventory.push(streams.source_a.node_info().clone());
                inventory.push(streams.source_b.node_info().clone());
                inventory.push(streams.momentum_filter.node_info().clone());
                inventory.push(streams.momentum_trim.node_info().clone());
            }
        }

        if let Some(lfo) = &self.spatial_lfo {
            inventory.push(lfo.node_info().clone());
        }

        inventory
    }

    // ---- Rendering ---------------------------------------------------------

    /// 1ブロックをインターリーブ出力へレンダリング
    pub fn render(&mut self, output: &mut [f32], channels: usize) {
        let channels = channels.max(1);
        let frames = output.len() / channels;
        if frames == 0 {
            return;
        }

        self.scratch.ensure(frames);
        let block_start_time = self.current_time();

        let Self {
            entrainment,
            entrainment_state,
            subliminal,
            subliminal_state,
            spatial_lfo,
            bus,
            scratch,
            ..
        } = self;

        scratch.bus_left[..frames].fill(0.0);
        scratch.bus_right[..frames].fill(0.0);

        // Entrainment stack -> entrainment gain -> bus
        if let (Some(stack), true) = (entrainment.as_mut(), entrainment_state.is_running()) {
            scratch.ent_left[..frames].fill(0.0);
            scratch.ent_right[..frames].fill(0.0);

            stack.osc_left.render(&mut scratch.mono_a[..frames]);
            stack.panner_left.add_panned_mono(
                &scratch.mono_a[..frames],
                &mut scratch.ent_left[..frames],
                &mut scratch.ent_right[..frames],
            );

            stack.osc_right.render(&mut scratch.mono_a[..frames]);
            stack.panner_right.add_panned_mono(
                &scratch.mono_a[..frames],
                &mut scratch.ent_left[..frames],
                &mut scratch.ent_right[..frames],
            );

            if let Some(iso) = stack.isochronic.as_mut() {
                iso.carrier.render(&mut scratch.mono_a[..frames]);
                iso.pulser.render(&mut scratch.mono_b[..frames]);
                iso.pulse_gain
                    .apply_modulated(&mut scratch.mono_a[..frames], &scratch.mono_b[..frames]);

                for i in 0..frames {
                    scratch.ent_left[i] += scratch.mono_a[i];
                    scratch.ent_right[i] += scratch.mono_a[i];
                }
            }

            bus.entrainment_gain
                .apply_stereo(&mut scratch.ent_left[..frames], &mut scratch.ent_right[..frames]);

            for i in 0..frames {
                scratch.bus_left[i] += scratch.ent_left[i];
                scratch.bus_right[i] += scratch.ent_right[i];
            }
        }

        // Subliminal stack -> subliminal gain -> bus (both channels)
        if let (Some(stack), true) = (subliminal.as_mut(), subliminal_state.is_running()) {
            stack.carrier.render(&mut scratch.mono_a[..frames]);

            match stack.streams.as_mut() {
                Some(streams) => {
                    streams
                        .source_a
                        .render(&mut scratch.mono_b[..frames], block_start_time);
                    streams
                        .source_b
                        .render(&mut scratch.mono_c[..frames], block_start_time);
                    streams.momentum_filter.process(&mut scratch.mono_c[..frames]);
                    streams.momentum_trim.apply(&mut scratch.mono_c[..frames]);

                    for i in 0..frames {
                        scratch.mono_b[i] += scratch.mono_c[i];
                    }

                    stack
                        .modulator
                        .apply_modulated(&mut scratch.mono_a[..frames], &scratch.mono_b[..frames]);
                }
                None => {
                    stack.modulator.apply(&mut scratch.mono_a[..frames]);
                }
            }

            if let Some(highpass) = stack.highpass.as_mut() {
                highpass.process(&mut scratch.mono_a[..frames]);
            }

            bus.subliminal_gain.apply(&mut scratch.mono_a[..frames]);

            for i in 0..frames {
                scratch.bus_left[i] += scratch.mono_a[i];
                scratch.bus_right[i] += scratch.mono_a[i];
            }
        }

        // Spatial rotation, master level, limiter
        match spatial_lfo.as_mut() {
            Some(lfo) => {
                lfo.render(&mut scratch.lfo[..frames]);
                bus.panner.process_modulated(
                    &mut scratch.bus_left[..frames],
                    &mut scratch.bus_right[..frames],
                    &scratch.lfo[..frames],
                );
            }
            None => {
                bus.panner
                    .process(&mut scratch.bus_left[..frames], &mut scratch.bus_right[..frames]);
            }
        }

        bus.master_gain
            .apply_stereo(&mut scratch.bus_left[..frames], &mut scratch.bus_right[..frames]);
        bus.limiter
            .process_stereo(&mut scratch.bus_left[..frames], &mut scratch.bus_right[..frames]);

        // Analyzer taps the post-limiter mono mix
        for i in 0..frames {
            scratch.mono_a[i] = 0.5 * (scratch.bus_left[i] + scratch.bus_right[i]);
        }
        bus.analyzer.push_samples(&scratch.mono_a[..frames]);

        // Interleave to the device layout
        if channels == 1 {
            output[..frames].copy_from_slice(&scratch.mono_a[..frames]);
        } else {
            for i in 0..frames {
                let base = i * channels;
                output[base] = scratch.bus_left[i];
                output[base + 1] = scratch.bus_right[i];
                for ch in 2..channels {
                    output[base + ch] = 0.0;
                }
            }
        }

        self.frames_rendered += frames as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44100.0;

    fn graph() -> SignalGraph {
        SignalGraph::new(SR, &EngineConfig::default())
    }

    fn render_block(graph: &mut SignalGraph, frames: usize) -> (Vec<f32>, Vec<f32>) {
        let mut out = vec![0.0; frames * 2];
        graph.render(&mut out, 2);
        let left = out.iter().step_by(2).copied().collect();
        let right = out.iter().skip(1).step_by(2).copied().collect();
        (left, right)
    }

    #[test]
    fn test_binaural_frequency_targets() {
        let mut graph = graph();
        graph.start_entrainment(432.0, 10.0, false);

        let tuned = 432.0 * (432.0 / 440.0);
        let (left, right) = graph.entrainment_frequencies().unwrap();
        assert!((left - (tuned - 5.0)).abs() < 1e-3, "left {}", left);
        assert!((right - (tuned + 5.0)).abs() < 1e-3, "right {}", right);
        assert!(graph.isochronic_frequencies().is_none());
        assert!(graph.entrainment_state().is_running());
    }

    #[test]
    fn test_hybrid_layer_frequencies() {
        let mut graph = graph();
        graph.start_entrainment(528.0, 7.83, true);

        let tuned = 528.0 * (432.0 / 440.0);
        let (carrier, pulser) = graph.isochronic_frequencies().unwrap();
        assert!((carrier - tuned).abs() < 1e-3);
        assert!((pulser - 7.83).abs() < 1e-4);
    }

    #[test]
    fn test_restart_replaces_stack() {
        let mut graph = graph();
        graph.start_entrainment(432.0, 10.0, true);
        graph.start_entrainment(200.0, 4.0, false);

        let tuned = 200.0 * (432.0 / 440.0);
        let (left, right) = graph.entrainment_frequencies().unwrap();
        assert!((left - (tuned - 2.0)).abs() < 1e-3);
        assert!((right - (tuned + 2.0)).abs() < 1e-3);
        // The hybrid layer from the first start must be gone
        assert!(graph.isochronic_frequencies().is_none());
    }

    #[test]
    fn test_entrainment_renders_hard_panned_tones() {
        let mut graph = graph();
        graph.start_entrainment(432.0, 10.0, false);
        graph.ramp_entrainment_gain(1.0);

        // Let the gain ramp settle, then inspect a block
        for _ in 0..50 {
            render_block(&mut graph, 512);
        }
        let (left, right) = render_block(&mut graph, 512);

        let peak_l = left.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        let peak_r = right.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(peak_l > 0.1, "left channel should carry signal: {}", peak_l);
        assert!(peak_r > 0.1, "right channel should carry signal: {}", peak_r);
    }

    #[test]
    fn test_idle_graph_renders_silence() {
        let mut graph = graph();
        let (left, right) = render_block(&mut graph, 256);
        assert!(left.iter().all(|&s| s == 0.0));
        assert!(right.iter().all(|&s| s == 0.0));
        assert_eq!(graph.frames_rendered(), 256);
    }

    #[test]
    fn test_subliminal_streams_share_start_time() {
        let mut graph = graph();
        // Advance the clock so `now` is not trivially zero
        render_block(&mut graph, 512);

        let buffer = Arc::new(AudioBuffer::new(vec![0.1; 4410], SR));
        graph.start_subliminal(false, Some(buffer), 1.0);

        let (start_a, start_b) = graph.subliminal_start_times().unwrap();
        assert_eq!(start_a, start_b, "streams must be scheduled identically");
        assert!((start_a - (512.0 / SR as f64 + 0.05)).abs() < 1e-9);
    }

    #[test]
    fn test_subliminal_momentum_ratio() {
        let mut graph = graph();
        let buffer = Arc::new(AudioBuffer::new(vec![0.1; 4410], SR));
        graph.start_subliminal(false, Some(buffer), 0.8);

        let (rate_a, rate_b) = graph.subliminal_rate_targets().unwrap();
        assert!((rate_a - 0.8).abs() < 1e-6);
        assert!((rate_b / rate_a - 2.1).abs() < 1e-5);

        // Ratio holds across a live rate change
        graph.set_subliminal_playback_rate(1.3);
        let (rate_a, rate_b) = graph.subliminal_rate_targets().unwrap();
        assert!((rate_a - 1.3).abs() < 1e-6);
        assert!((rate_b / rate_a - 2.1).abs() < 1e-5);
    }

    #[test]
    fn test_subliminal_without_buffer_is_carrier_only() {
        let mut graph = graph();
        graph.start_subliminal(false, None, 1.0);

        assert!(!graph.subliminal_has_streams());
        assert!((graph.subliminal_modulator_level().unwrap() - 0.15).abs() < 1e-6);
        let carrier = graph.subliminal_carrier_frequency().unwrap();
        assert!((carrier - 15000.0 * (432.0 / 440.0)).abs() < 1e-2);
    }

    #[test]
    fn test_diagnostic_mode_is_audible_and_unfiltered() {
        let mut graph = graph();
        graph.start_subliminal(true, None, 1.0);

        assert_eq!(graph.subliminal_carrier_frequency().unwrap(), 3000.0);
        // Diagnostic skips the high-pass; the 3kHz carrier must reach the bus
        graph.ramp_subliminal_gain(1.0);
        for _ in 0..50 {
            render_block(&mut graph, 512);
        }
        let (left, _) = render_block(&mut graph, 512);
        let peak = left.iter().fold(0.0f32, |a, &s| a.max(s.abs()));
        assert!(peak > 0.05, "diagnostic carrier should be present: {}", peak);
    }

    #[test]
    fn test_spatial_enable_retune_disable() {
        let mut graph = graph();
        assert!(!graph.spatial_rotation_active());

        graph.set_spatial_rotation(true, 0.1);
        assert!(graph.spatial_rotation_active());
        assert!((graph.spatial_rotation_rate().unwrap() - 0.1).abs() < 1e-6);

        // Retune keeps the same oscillator, new target
        graph.set_spatial_rotation(true, 0.3);
        assert!((graph.spatial_rotation_rate().unwrap() - 0.3).abs() < 1e-6);

        // Disable drops the LFO and recenters the pan
        graph.set_spatial_rotation(false, 0.0);
        assert!(!graph.spatial_rotation_active());
        assert_eq!(graph.pan_target(), 0.0);
    }

    #[test]
    fn test_stop_all_from_every_state() {
        let mut graph = graph();
        graph.stop_all(); // nothing running

        graph.start_entrainment(432.0, 10.0, false);
        graph.start_subliminal(false, None, 1.0);
        graph.stop_all();
        assert_eq!(graph.entrainment_state(), StackState::Idle);
        assert_eq!(graph.subliminal_state(), StackState::Idle);

        graph.stop_all(); // idempotent
        let (left, _) = render_block(&mut graph, 128);
        assert!(left.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_gain_ramps_do_not_step() {
        let mut graph = graph();
        graph.start_entrainment(528.0, 7.83, true);
        graph.ramp_entrainment_gain(0.125);

        assert!((graph.entrainment_gain_target() - 0.125).abs() < 1e-6);
        // Immediately after the ramp starts the value is still near zero
        render_block(&mut graph, 64);
        assert!(graph.entrainment_gain_value() < 0.01);
        assert!(graph.entrainment_gain_value() > 0.0);
    }

    #[test]
    fn test_clock_advances_with_rendering() {
        let mut graph = graph();
        assert_eq!(graph.current_time(), 0.0);
        render_block(&mut graph, 4410);
        assert!((graph.current_time() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_analyzer_sees_entrainment_tone() {
        let mut graph = graph();
        graph.start_entrainment(432.0, 0.0, false);
        graph.ramp_entrainment_gain(1.0);

        for _ in 0..100 {
            render_block(&mut graph, 512);
        }

        let tuned = 432.0 * (432.0 / 440.0);
        let peak = graph.output_peak_frequency();
        let resolution = SR / 2048.0;
        assert!(
            (peak - tuned).abs() < 2.0 * resolution,
            "analyzer peak {} should be near {}",
            peak,
            tuned
        );
    }

    #[test]
    fn test_node_inventory_grows_with_stacks() {
        let mut graph = graph();
        let base = graph.node_inventory().len();
        assert_eq!(base, 6);

        graph.start_entrainment(432.0, 10.0, true);
        graph.start_subliminal(false, None, 1.0);
        graph.set_spatial_rotation(true, 0.1);

        let full = graph.node_inventory();
        // 6 bus + 7 entrainment (pair, panners, iso) + 3 subliminal + 1 LFO
        assert_eq!(full.len(), 17);
    }
}
