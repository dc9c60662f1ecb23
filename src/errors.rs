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

use std::fmt;

/// NeuroResonator全体のエラー型
#[derive(Debug, Clone)]
pub enum SignalEngineError {
    /// オーディオデバイスエラー
    AudioDevice {
        device_name: Option<String>,
        reason: String,
    },

    /// サブリミナルバッファのデコード失敗
    BufferDecode {
        path: String,
        reason: String,
    },

    /// ファイルI/Oエラー
    FileIo {
        operation: String,
        path: String,
        reason: String,
    },

    /// 設定の解析エラー
    ConfigParsing {
        file: String,
        reason: String,
    },

    /// 内部エラー（予期しない状況）
    Internal {
        message: String,
    },
}

impl fmt::Display for SignalEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalEngineError::AudioDevice { device_name, reason } => {
                if let Some(name) = device_name {
                    write!(f, "Audio device error on '{}': {}", name, reason)
                } else {
                    write!(f, "Audio device error: {}", reason)
                }
            }
            SignalEngineError::BufferDecode { path, reason } => {
                write!(f, "Failed to decode audio buffer '{}': {}", path, reason)
            }
            SignalEngineError::FileIo { operation, path, reason } => {
                write!(f, "File I/O error during {}: {} - {}", operation, path, reason)
            }
            SignalEngineError::ConfigParsing { file, reason } => {
                write!(f, "Config parsing error in {}: {}", file, reason)
            }
            SignalEngineError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for SignalEngineError {}

impl From<std::io::Error> for SignalEngineError {
    fn from(error: std::io::Error) -> Self {
        SignalEngineError::FileIo {
            operation: "unknown".to_string(),
            path: "unknown".to_string(),
            reason: error.to_string(),
        }
    }
}

/// 結果型のエイリアス
pub type SignalEngineResult<T> = Result<T, SignalEngineError>;

/// エラーログのレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// ロギングトレイト
pub trait Logger: Send + Sync {
    fn log(&self, level: LogLevel, message: &str);

    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message);
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// シンプルなコンソールロガー
pub struct ConsoleLogger {
    min_level: LogLevel,
}

impl ConsoleLogger {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Logger for ConsoleLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level >= self.min_level {
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();

            println!(
                "[{:.3}] [{}] {}",
                timestamp.as_secs_f64(),
                level,
                message
            );
        }
    }
}

/// エラーハンドリングのヘルパーマクロ
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $error:expr) => {
        $logger.error(&format!("Error: {}", $error));
    };
    ($logger:expr, $error:expr, $context:expr) => {
        $logger.error(&format!("Error in {}: {}", $context, $error));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $message:expr) => {
        $logger.warn($message);
    };
    ($logger:expr, $format:expr, $($args:expr),*) => {
        $logger.warn(&format!($format, $($args),*));
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $message:expr) => {
        $logger.info($message);
    };
    ($logger:expr, $format:expr, $($args:expr),*) => {
        $logger.info(&format!($format, $($args),*));
    };
}

/// カスタムエラー作成のヘルパー
impl SignalEngineError {
    pub fn audio_device(reason: &str) -> Self {
        SignalEngineError::AudioDevice {
            device_name: None,
            reason: reason.to_string(),
        }
    }

    pub fn buffer_decode(path: &str, reason: &str) -> Self {
        SignalEngineError::BufferDecode {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn internal(message: &str) -> Self {
        SignalEngineError::Internal {
            message: message.to_string(),
        }
    }
}
