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

use crate::nodes::{NodeCategory, NodeInfo};

const TWO_PI: f32 = 2.0 * std::f32::consts::PI;

/// スペクトラムアナライザー - 出力バスの周波数モニタリング
///
/// Taps the post-limiter mix and keeps the most recent `fft_size` samples.
/// The FFT runs on demand when a caller asks for a spectrum, never inside
/// the audio callback.
pub struct SpectrumAnalyzerNode {
    node_info: NodeInfo,

    fft_size: usize,
    sample_rate: f32,

    // Ring of the latest samples
    ring: Vec<f32>,
    write_pos: usize,
}

impl SpectrumAnalyzerNode {
    pub fn new(sample_rate: f32, name: &str, fft_size: usize) -> Self {
        // Power-of-two sizes only; fall back rather than panic in the graph
        let fft_size = if fft_size.is_power_of_two() && fft_size >= 32 {
            fft_size
        } else {
            2048
        };

        Self {
            node_info: NodeInfo::new(name, "spectrum_analyzer", NodeCategory::Analyzer),
            fft_size,
            sample_rate,
            ring: vec![0.0; fft_size],
            write_pos: 0,
        }
    }

    pub fn node_info(&self) -> &NodeInfo {
        &self.node_info
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// 分解能（ビンあたりのHz）
    pub fn bin_resolution_hz(&self) -> f32 {
        self.sample_rate / self.fft_size as f32
    }

    /// オーディオコールバックから最新サンプルを取り込む
    pub fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.ring[self.write_pos] = sample;
            self.write_pos = (self.write_pos + 1) % self.fft_size;
        }
    }

    /// 振幅スペクトラムを計算（長さ fft_size/2）
    ///
    /// Hann-windowed radix-2 FFT over the ring contents, oldest sample
    /// first. Magnitudes are normalized by the window's coherent gain so a
    /// full-scale sine reads close to 1.0 in its bin.
    pub fn magnitude_spectrum(&self) -> Vec<f32> {
        let n = self.fft_size;

        // Unroll the ring into time order and apply the Hann window
        let mut real = vec![0.0f32; n];
        let mut imag = vec![0.0f32; n];
        for i in 0..n {
            let sample = self.ring[(self.write_pos + i) % n];
            let window = 0.5 * (1.0 - (TWO_PI * i as f32 / (n - 1) as f32).cos());
            real[i] = sample * window;
        }

        Self::fft_in_place(&mut real, &mut imag);

        // Hann coherent gain is 0.5; the 2/N recovers single-sided amplitude
        let scale = 2.0 / (n as f32 * 0.5);
        (0..n / 2)
            .map(|k| (real[k] * real[k] + imag[k] * imag[k]).sqrt() * scale)
            .collect()
    }

    /// 最大振幅ビンの中心周波数
    pub fn peak_frequency(&self) -> f32 {
        let spectrum = self.magnitude_spectrum();
        let mut peak_bin = 0;
        let mut peak_mag = 0.0;
        for (bin, &mag) in spectrum.iter().enumerate() {
            if mag > peak_mag {
                peak_mag = mag;
                peak_bin = bin;
            }
        }
        peak_bin as f32 * self.bin_resolution_hz()
    }

    /// 反復版Cooley-Tukey FFT（基数2、インプレース）
    fn fft_in_place(real: &mut [f32], imag: &mut [f32]) {
        let n = real.len();
        if n <= 1 {
            return;
        }

        // Bit-reversal permutation
        let bits = n.trailing_zeros();
        for i in 0..n {
            let j = i.reverse_bits() >> (usize::BITS - bits);
            if i < j {
                real.swap(i, j);
                imag.swap(i, j);
            }
        }

        // Butterfly stages
        let mut len = 2;
        while len <= n {
            let angle_step = -TWO_PI / len as f32;
            for start in (0..n).step_by(len) {
                for k in 0..len / 2 {
                    let angle = angle_step * k as f32;
                    let (w_im, w_re) = angle.sin_cos();

                    let even_re = real[start + k];
                    let even_im = imag[start + k];
                    let odd_re = real[start + k + len / 2];
                    let odd_im = imag[start + k + len / 2];

                    let t_re = w_re * odd_re - w_im * odd_im;
                    let t_im = w_re * odd_im + w_im * odd_re;

                    real[start + k] = even_re + t_re;
                    imag[start + k] = even_im + t_im;
                    real[start + k + len / 2] = even_re - t_re;
                    imag[start + k + len / 2] = even_im - t_im;
                }
            }
            len *= 2;
        }
    }

    pub fn reset(&mut self) {
        self.ring.fill(0.0);
        self.write_pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_fft_size_falls_back() {
        let analyzer = SpectrumAnalyzerNode::new(44100.0, "test", 1000);
        assert_eq!(analyzer.fft_size(), 2048);
    }

    #[test]
    fn test_peak_frequency_of_sine() {
        let sample_rate = 44100.0;
        let mut analyzer = SpectrumAnalyzerNode::new(sample_rate, "test", 2048);

        // Pick a frequency landing exactly on a bin center
        let bin = 32;
        let freq = bin as f32 * sample_rate / 2048.0;
        let samples: Vec<f32> = (0..2048)
            .map(|n| (TWO_PI * freq * n as f32 / sample_rate).sin())
            .collect();
        analyzer.push_samples(&samples);

        let peak = analyzer.peak_frequency();
        assert!(
            (peak - freq).abs() < analyzer.bin_resolution_hz(),
            "expected peak near {}, got {}",
            freq,
            peak
        );
    }

    #[test]
    fn test_full_scale_sine_magnitude() {
        let sample_rate = 44100.0;
        let mut analyzer = SpectrumAnalyzerNode::new(sample_rate, "test", 1024);

        let bin = 16;
        let freq = bin as f32 * sample_rate / 1024.0;
        let samples: Vec<f32> = (0..1024)
            .map(|n| (TWO_PI * freq * n as f32 / sample_rate).sin())
            .collect();
        analyzer.push_samples(&samples);

        let spectrum = analyzer.magnitude_spectrum();
        assert!(
            (spectrum[bin] - 1.0).abs() < 0.05,
            "bin magnitude should be near 1.0: {}",
            spectrum[bin]
        );
    }

    #[test]
    fn test_silence_has_flat_spectrum() {
        let analyzer = SpectrumAnalyzerNode::new(44100.0, "test", 512);
        let spectrum = analyzer.magnitude_spectrum();
        assert!(spectrum.iter().all(|&m| m < 1e-6));
    }

    #[test]
    fn test_ring_keeps_latest_samples() {
        let mut analyzer = SpectrumAnalyzerNode::new(44100.0, "test", 256);

        // Flood with DC, then overwrite with silence
        analyzer.push_samples(&vec![1.0; 256]);
        analyzer.push_samples(&vec![0.0; 256]);

        let spectrum = analyzer.magnitude_spectrum();
        assert!(spectrum[0] < 1e-6, "old samples should be evicted");
    }
}
