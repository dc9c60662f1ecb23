use serde::{Deserialize, Serialize};

use crate::errors::{SignalEngineError, SignalEngineResult};

/// 信号経路の設計定数 - すべて設定ファイルで上書き可能
///
/// The signal-path constants are deliberate design values, not derived
/// quantities. They are kept configurable so a deployment can retune them
/// without a rebuild, but the defaults reproduce the reference signal stack
/// exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 440Hz標準ピッチを432Hz基準へ変換する係数
    pub tuning_ratio: f32,

    /// サブリミナルキャリア周波数（非可聴域）
    pub silent_carrier_hz: f32,

    /// 診断モード用キャリア周波数（可聴域）
    pub diagnostic_carrier_hz: f32,

    /// モメンタムストリームの再生レート倍率
    pub momentum_rate_ratio: f32,

    /// モメンタムストリームの相対ゲイン
    pub momentum_trim: f32,

    /// モメンタムストリーム用ローパスのカットオフ
    pub momentum_lowpass_hz: f32,

    /// バッファなし時のキャリア振幅（定常トーン）
    pub carrier_only_level: f32,

    /// 両ストリーム同期開始までのリード時間（秒）
    pub stream_lead_seconds: f64,

    /// マスター音量ランプの時定数（秒）
    pub master_ramp_seconds: f32,

    /// エントレインメント音量ランプの時定数（秒）
    pub entrainment_ramp_seconds: f32,

    /// サブリミナル音量ランプの時定数（秒）
    pub subliminal_ramp_seconds: f32,

    /// 再生レートランプの時定数（秒）
    pub rate_ramp_seconds: f32,

    /// パン復帰ランプの時定数（秒）
    pub pan_ramp_seconds: f32,

    /// 空間LFOリチューンの時定数（秒）
    pub spatial_retune_seconds: f32,

    /// リミッター設定
    pub limiter: LimiterConfig,

    /// スペクトラムアナライザーのFFTサイズ
    pub fft_size: usize,
}

/// ダイナミクスリミッターの固定パラメーター
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack_seconds: f32,
    pub release_seconds: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tuning_ratio: 432.0 / 440.0,
            silent_carrier_hz: 15000.0,
            diagnostic_carrier_hz: 3000.0,
            momentum_rate_ratio: 2.1,
            momentum_trim: 0.7,
            momentum_lowpass_hz: 4000.0,
            carrier_only_level: 0.15,
            stream_lead_seconds: 0.05,
            master_ramp_seconds: 0.05,
            entrainment_ramp_seconds: 0.05,
            subliminal_ramp_seconds: 0.03,
            rate_ramp_seconds: 0.1,
            pan_ramp_seconds: 0.1,
            spatial_retune_seconds: 0.5,
            limiter: LimiterConfig::default(),
            fft_size: 2048,
        }
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            threshold_db: -12.0,
            knee_db: 40.0,
            ratio: 12.0,
            attack_seconds: 0.005,
            release_seconds: 0.25,
        }
    }
}

impl EngineConfig {
    /// TOML文字列から設定を読み込む
    pub fn from_toml_str(content: &str) -> SignalEngineResult<Self> {
        toml::from_str(content).map_err(|e| SignalEngineError::ConfigParsing {
            file: "<string>".to_string(),
            reason: e.to_string(),
        })
    }

    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> SignalEngineResult<Self> {
        let path_str = path.as_ref().display().to_string();
        let content = std::fs::read_to_string(&path).map_err(|e| SignalEngineError::FileIo {
            operation: "read config".to_string(),
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| SignalEngineError::ConfigParsing {
            file: path_str,
            reason: e.to_string(),
        })
    }

    pub fn to_toml_string(&self) -> SignalEngineResult<String> {
        toml::to_string_pretty(self).map_err(|e| SignalEngineError::Internal {
            message: format!("Failed to serialize config: {}", e),
        })
    }
}
