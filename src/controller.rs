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

use std::sync::Arc;

use crate::audio::AudioContext;
use crate::config::EngineConfig;
use crate::errors::{ConsoleLogger, LogLevel, Logger, SignalEngineResult};
use crate::graph::{SignalGraph, StackState};
use crate::log_info;
use crate::media::AudioBuffer;
use crate::nodes::NodeInfo;

/// シグナルグラフコントローラー - エンジンの公開ライフサイクル操作
///
/// Explicitly constructed and owned by the caller; there is no ambient
/// singleton. Every operation besides `initialize` is a silent no-op while
/// the context is absent, so UI-driven callers never have to guard their
/// event handlers.
pub struct SignalGraphController {
    config: EngineConfig,
    context: Option<AudioContext>,

    // Pending subliminal state, applied at the next start_subliminal
    subliminal_buffer: Option<Arc<AudioBuffer>>,
    subliminal_rate: f32,
    buffer_epoch: u64,

    logger: Box<dyn Logger>,
}

/// マスター/エントレインメント音量カーブ（v³）
fn entrainment_curve(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    v.powi(3)
}

/// サブリミナル音量カーブ（v⁴） - 低域での分解能をさらに確保
fn subliminal_curve(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    v.powi(4)
}

impl SignalGraphController {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_logger(config, Box::new(ConsoleLogger::new(LogLevel::Info)))
    }

    pub fn with_logger(config: EngineConfig, logger: Box<dyn Logger>) -> Self {
        Self {
            config,
            context: None,
            subliminal_buffer: None,
            subliminal_rate: 1.0,
            buffer_epoch: 0,
            logger,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.context.is_some()
    }

    /// レンダリング済みフレーム数から導出したエンジン時刻（秒）
    pub fn current_time(&self) -> f64 {
        self.context.as_ref().map(|c| c.current_time()).unwrap_or(0.0)
    }

    /// グラフ操作のヘルパー - 未初期化なら何もしない
    fn with_graph<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut SignalGraph) -> R,
    {
        match &self.context {
            Some(context) => {
                let graph = context.graph();
                let result = match graph.lock() {
                    Ok(mut graph) => Some(f(&mut graph)),
                    Err(_) => None,
                };
                result
            }
            None => {
                self.logger.debug("operation ignored: engine not initialized");
                None
            }
        }
    }

    // ---- Lifecycle ---------------------------------------------------------

    /// コンテキストと固定ミックスバスを作成（冪等）
    ///
    /// Initialization failures (no device, stream build error) surface once
    /// here; every later operation degrades to a no-op instead of erroring.
    pub fn initialize(&mut self) -> SignalEngineResult<()> {
        if self.context.is_some() {
            return Ok(());
        }

        let mut context = AudioContext::new(&self.config)?;
        context.start()?;

        log_info!(
            self.logger,
            "Engine initialized: {} @ {} Hz",
            context.device_name(),
            context.sample_rate()
        );

        self.context = Some(context);
        Ok(())
    }

    /// コンテキストとグラフを解放して未初期化状態へ戻す
    pub fn shutdown(&mut self) {
        if self.context.take().is_some() {
            log_info!(self.logger, "Engine shut down");
        }
    }

    // ---- Entrainment -------------------------------------------------------

    /// バイノーラルペアを起動（再入時はスタック差し替え）
    pub fn start_entrainment(&mut self, carrier_hz: f32, beat_hz: f32, hybrid: bool) {
        self.with_graph(|graph| graph.start_entrainment(carrier_hz, beat_hz, hybrid));
    }

    pub fn stop_entrainment(&mut self) {
        self.with_graph(|graph| graph.stop_entrainment());
    }

    // ---- Subliminal --------------------------------------------------------

    /// 次回start_subliminal用のバッファを設定（Noneでキャリアのみへ）
    ///
    /// Bumps the buffer epoch. Off-thread loaders must capture the epoch
    /// before decoding and hand it back through
    /// `set_subliminal_buffer_if_epoch`, so a slow load can never overwrite
    /// a newer selection.
    pub fn set_subliminal_buffer(&mut self, buffer: Option<Arc<AudioBuffer>>) -> u64 {
        self.subliminal_buffer = buffer;
        self.buffer_epoch += 1;
        self.buffer_epoch
    }

    /// エポックが一致する場合のみバッファを適用（古いロードは破棄）
    pub fn set_subliminal_buffer_if_epoch(
        &mut self,
        buffer: Option<Arc<AudioBuffer>>,
        epoch: u64,
    ) -> bool {
        if epoch != self.buffer_epoch {
            self.logger.debug("stale buffer load discarded");
            return false;
        }
        self.set_subliminal_buffer(buffer);
        true
    }

    pub fn buffer_epoch(&self) -> u64 {
        self.buffer_epoch
    }

    pub fn has_subliminal_buffer(&self) -> bool {
        self.subliminal_buffer.is_some()
    }

    /// サブリミナルスタックを起動
    pub fn start_subliminal(&mut self, diagnostic: bool) {
        let buffer = self.subliminal_buffer.clone();
        let rate = self.subliminal_rate;
        self.with_graph(|graph| graph.start_subliminal(diagnostic, buffer, rate));
    }

    pub fn stop_subliminal(&mut self) {
        self.with_graph(|graph| graph.stop_subliminal());
    }

    pub fn stop_all(&mut self) {
        self.with_graph(|graph| graph.stop_all());
    }

    /// ベース再生レートを保存し、ライブストリームをランプで追従させる
    pub fn set_subliminal_playback_rate(&mut self, rate: f32) {
        self.subliminal_rate = rate;
        self.with_graph(|graph| graph.set_subliminal_playback_rate(rate));
    }

    pub fn subliminal_playback_rate(&self) -> f32 {
        self.subliminal_rate
    }

    // ---- Levels ------------------------------------------------------------

    /// マスター音量 [0,1]（v³カーブ、~50msランプ）
    pub fn set_master_volume(&mut self, volume: f32) {
        let gain = entrainment_curve(volume);
        self.with_graph(|graph| graph.ramp_master_gain(gain));
    }

    /// エントレインメント音量 [0,1]（v³カーブ、~50msランプ）
    pub fn set_entrainment_volume(&mut self, volume: f32) {
        let gain = entrainment_curve(volume);
        self.with_graph(|graph| graph.ramp_entrainment_gain(gain));
    }

    /// サブリミナル音量 [0,1]（v⁴カーブ、~30msランプ）
    pub fn set_subliminal_volume(&mut self, volume: f32) {
        let gain = subliminal_curve(volume);
        self.with_graph(|graph| graph.ramp_subliminal_gain(gain));
    }

    // ---- Spatial rotation --------------------------------------------------

    /// 空間ローテーションの有効化/無効化
    pub fn toggle_spatial_rotation(&mut self, enabled: bool, rate_hz: f32) {
        self.with_graph(|graph| graph.set_spatial_rotation(enabled, rate_hz));
    }

    // ---- Monitoring --------------------------------------------------------

    pub fn entrainment_state(&self) -> StackState {
        self.with_graph(|graph| graph.entrainment_state())
            .unwrap_or(StackState::Idle)
    }

    pub fn subliminal_state(&self) -> StackState {
        self.with_graph(|graph| graph.subliminal_state())
            .unwrap_or(StackState::Idle)
    }

    /// 稼働中の全ノードの識別情報
    pub fn node_inventory(&self) -> Vec<NodeInfo> {
        self.with_graph(|graph| graph.node_inventory())
            .unwrap_or_default()
    }

    /// 出力バスの振幅スペクトラム
    pub fn output_spectrum(&self) -> Vec<f32> {
        self.with_graph(|graph| graph.output_spectrum())
            .unwrap_or_default()
    }

    pub fn output_peak_frequency(&self) -> f32 {
        self.with_graph(|graph| graph.output_peak_frequency())
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SignalGraphController {
        SignalGraphController::new(EngineConfig::default())
    }

    #[test]
    fn test_volume_curve_endpoints() {
        assert_eq!(entrainment_curve(0.0), 0.0);
        assert_eq!(entrainment_curve(1.0), 1.0);
        assert_eq!(subliminal_curve(0.0), 0.0);
        assert_eq!(subliminal_curve(1.0), 1.0);
    }

    #[test]
    fn test_volume_curve_shapes() {
        assert!((entrainment_curve(0.5) - 0.125).abs() < 1e-6);
        assert!((subliminal_curve(0.5) - 0.0625).abs() < 1e-6);
        // Subliminal drops off faster at equal control positions
        assert!(subliminal_curve(0.3) < entrainment_curve(0.3));
    }

    #[test]
    fn test_volume_curve_clamps() {
        assert_eq!(entrainment_curve(-0.5), 0.0);
        assert_eq!(entrainment_curve(1.5), 1.0);
        assert_eq!(subliminal_curve(2.0), 1.0);
    }

    #[test]
    fn test_uninitialized_operations_are_no_ops() {
        let mut controller = controller();
        assert!(!controller.is_initialized());

        // None of these may panic or error while uninitialized
        controller.start_entrainment(432.0, 10.0, true);
        controller.stop_entrainment();
        controller.start_subliminal(false);
        controller.stop_subliminal();
        controller.stop_all();
        controller.set_master_volume(0.5);
        controller.set_entrainment_volume(0.5);
        controller.set_subliminal_volume(0.5);
        controller.set_subliminal_playback_rate(1.2);
        controller.toggle_spatial_rotation(true, 0.1);
        controller.shutdown();

        assert_eq!(controller.current_time(), 0.0);
        assert_eq!(controller.entrainment_state(), StackState::Idle);
        assert!(controller.node_inventory().is_empty());
    }

    #[test]
    fn test_buffer_epoch_bumps_on_set() {
        let mut controller = controller();
        assert_eq!(controller.buffer_epoch(), 0);

        let buffer = Arc::new(AudioBuffer::new(vec![0.0; 128], 44100.0));
        let epoch = controller.set_subliminal_buffer(Some(buffer));
        assert_eq!(epoch, 1);
        assert!(controller.has_subliminal_buffer());

        controller.set_subliminal_buffer(None);
        assert_eq!(controller.buffer_epoch(), 2);
        assert!(!controller.has_subliminal_buffer());
    }

    #[test]
    fn test_stale_buffer_load_is_discarded() {
        let mut controller = controller();
        let stale_epoch = controller.buffer_epoch();

        // A newer selection lands while the slow load is in flight
        controller.set_subliminal_buffer(None);

        let late_buffer = Arc::new(AudioBuffer::new(vec![0.1; 128], 44100.0));
        let applied = controller.set_subliminal_buffer_if_epoch(Some(late_buffer), stale_epoch);
        assert!(!applied);
        assert!(!controller.has_subliminal_buffer());
    }

    #[test]
    fn test_current_epoch_load_is_applied() {
        let mut controller = controller();
        let epoch = controller.buffer_epoch();

        let buffer = Arc::new(AudioBuffer::new(vec![0.1; 128], 44100.0));
        assert!(controller.set_subliminal_buffer_if_epoch(Some(buffer), epoch));
        assert!(controller.has_subliminal_buffer());
    }

    #[test]
    fn test_playback_rate_is_stored_while_uninitialized() {
        let mut controller = controller();
        controller.set_subliminal_playback_rate(0.85);
        assert!((controller.subliminal_playback_rate() - 0.85).abs() < 1e-6);
    }
}
