/*
 * NeuroResonator - 432Hz Neuro-Entrainment Signal Engine
 * Copyright (c) 2025 MACHIKO LAB
 *
 * Audio context - cpal device and output stream around the shared signal graph
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};

use crate::config::EngineConfig;
use crate::errors::{SignalEngineError, SignalEngineResult};
use crate::graph::SignalGraph;

/// オーディオコンテキスト
///
/// Owns the output device and stream. All node state lives in the
/// `SignalGraph` behind a mutex shared with the callback; the callback
/// publishes the frame count through an atomic so `current_time()` never
/// takes the graph lock.
pub struct AudioContext {
    device: Device,
    device_name: String,
    stream: Option<Stream>,
    sample_rate: f32,
    channels: usize,
    graph: Arc<Mutex<SignalGraph>>,
    clock_frames: Arc<AtomicU64>,
}

impl AudioContext {
    pub fn new(config: &EngineConfig) -> SignalEngineResult<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| SignalEngineError::audio_device("no output device available"))?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let stream_config = device.default_output_config().map_err(|e| {
            SignalEngineError::AudioDevice {
                device_name: Some(device_name.clone()),
                reason: format!("failed to query default output config: {}", e),
            }
        })?;

        let sample_rate = stream_config.sample_rate().0 as f32;
        let channels = (stream_config.channels() as usize).max(1);

        let graph = Arc::new(Mutex::new(SignalGraph::new(sample_rate, config)));

        Ok(Self {
            device,
            device_name,
            stream: None,
            sample_rate,
            channels,
            graph,
            clock_frames: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn graph(&self) -> Arc<Mutex<SignalGraph>> {
        Arc::clone(&self.graph)
    }

    /// レンダリング済みフレーム数から導出したエンジン時刻（秒）
    pub fn current_time(&self) -> f64 {
        self.clock_frames.load(Ordering::Relaxed) as f64 / self.sample_rate as f64
    }

    /// 出力ストリームを開始（起動済みなら何もしない）
    pub fn start(&mut self) -> SignalEngineResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let config = StreamConfig {
            channels: self.channels as u16,
            sample_rate: cpal::SampleRate(self.sample_rate as u32),
            buffer_size: cpal::BufferSize::Default,
        };

        let graph = Arc::clone(&self.graph);
        let clock = Arc::clone(&self.clock_frames);
        let channels = self.channels;

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Skip the buffer rather than block if the lock is poisoned
                    let mut graph = match graph.lock() {
                        Ok(g) => g,
                        Err(_) => {
                            data.fill(0.0);
                            return;
                        }
                    };
                    graph.render(data, channels);
                    clock.store(graph.frames_rendered(), Ordering::Relaxed);
                },
                |err| {
                    eprintln!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| SignalEngineError::AudioDevice {
                device_name: Some(self.device_name.clone()),
                reason: format!("failed to build output stream: {}", e),
            })?;

        stream.play().map_err(|e| SignalEngineError::AudioDevice {
            device_name: Some(self.device_name.clone()),
            reason: format!("failed to start output stream: {}", e),
        })?;

        self.stream = Some(stream);
        Ok(())
    }

    /// 出力ストリームを停止
    pub fn stop(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.pause();
        }
    }
}

impl Drop for AudioContext {
    fn drop(&mut self) {
        self.stop();
    }
}
