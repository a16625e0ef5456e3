//! Dynamic-programming beat tracker.
//!
//! Beats are placed to maximize onset strength at the beat positions while
//! keeping inter-beat intervals close to the period implied by the tempo.

use crate::audio::stft::hann_window;

/// Inter-beat period in frames for `bpm` at `frame_rate` frames per second.
pub fn beat_period(bpm: f64, frame_rate: f64) -> usize {
    (60.0 * frame_rate / bpm).round_ties_even().max(1.0) as usize
}

/// Onset envelope scaled to unit standard deviation and smoothed with a
/// Gaussian whose width is 1/32 of a beat.
pub fn local_score(envelope: &[f32], period: usize) -> Vec<f64> {
    let n = envelope.len();
    let x: Vec<f64> = envelope.iter().map(|&v| v as f64).collect();

    let std = if n > 1 {
        let mean = x.iter().sum::<f64>() / n as f64;
        (x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        0.0
    };
    let norm = std + f64::MIN_POSITIVE;

    let p = period as isize;
    let kernel: Vec<f64> = (-p..=p)
        .map(|k| (-0.5 * (k as f64 * 32.0 / period as f64).powi(2)).exp())
        .collect();

    (0..n as isize)
        .map(|i| {
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, &w)| {
                    let idx = i + j as isize - p;
                    (0..n as isize).contains(&idx).then(|| x[idx as usize] * w)
                })
                .sum::<f64>()
                / norm
        })
        .collect()
}

/// Forward pass: cumulative score and best predecessor of every frame.
///
/// Predecessors are searched from `period / 2` to `2 * period` frames back.
/// Leading frames whose local score is below 1 % of the maximum are not
/// linked to anything.
fn track_dp(local: &[f64], period: usize, tightness: f64) -> (Vec<isize>, Vec<f64>) {
    let n = local.len();
    let mut backlink = vec![-1isize; n];
    let mut cumscore = vec![0.0f64; n];

    let max_local = local.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold = 0.01 * max_local;
    let nearest = (period as f64 / 2.0).round_ties_even() as usize;
    let farthest = 2 * period;
    let log_period = (period as f64).ln();
    let mut first_beat = true;

    for i in 0..n {
        let mut best_score = f64::NEG_INFINITY;
        let mut best_loc: isize = -1;

        for gap in nearest..=farthest {
            let Some(loc) = i.checked_sub(gap) else {
                break;
            };
            let score = cumscore[loc] - tightness * ((gap as f64).ln() - log_period).powi(2);
            if score > best_score {
                best_score = score;
                best_loc = loc as isize;
            }
        }

        cumscore[i] = if best_loc >= 0 {
            local[i] + best_score
        } else {
            local[i]
        };

        if first_beat && local[i] < threshold {
            backlink[i] = -1;
        } else {
            backlink[i] = best_loc;
            first_beat = false;
        }
    }

    (backlink, cumscore)
}

/// `x[i] > x[i - 1] && x[i] >= x[i + 1]`, with the ends edge-padded.
fn local_maxima(x: &[f64]) -> Vec<bool> {
    let n = x.len();
    (0..n)
        .map(|i| {
            let prev = if i == 0 { x[0] } else { x[i - 1] };
            let next = if i + 1 == n { x[n - 1] } else { x[i + 1] };
            x[i] > prev && x[i] >= next
        })
        .collect()
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        0.5 * (values[mid - 1] + values[mid])
    } else {
        values[mid]
    })
}

/// Last local maximum of the cumulative score above half the median
/// local-maximum score.
fn last_beat(cumscore: &[f64]) -> usize {
    let n = cumscore.len();
    let maxima = local_maxima(cumscore);
    let mut peaks: Vec<f64> = cumscore
        .iter()
        .zip(&maxima)
        .filter_map(|(&s, &m)| m.then_some(s))
        .collect();
    let Some(med) = median(&mut peaks) else {
        return n.saturating_sub(1);
    };

    (0..n)
        .rev()
        .find(|&i| maxima[i] && 2.0 * cumscore[i] > med)
        .unwrap_or(n.saturating_sub(1))
}

/// Drop weak beats from both ends.
///
/// The local score at the beats is convolved with a periodic 5-point Hann
/// window. The kept span starts at the first beat whose smoothed score
/// exceeds half its RMS and stops before the last one.
fn trim_beats(local: &[f64], beats: &[usize]) -> Vec<usize> {
    let hann: Vec<f64> = hann_window(5).into_iter().map(f64::from).collect();

    let at_beats: Vec<f64> = beats.iter().map(|&b| local[b]).collect();
    let m = at_beats.len();
    let smooth: Vec<f64> = (0..m as isize)
        .map(|i| {
            hann.iter()
                .enumerate()
                .filter_map(|(j, &w)| {
                    let idx = i + 2 - j as isize;
                    (0..m as isize).contains(&idx).then(|| at_beats[idx as usize] * w)
                })
                .sum()
        })
        .collect();

    if smooth.is_empty() {
        return Vec::new();
    }
    let rms = (smooth.iter().map(|v| v * v).sum::<f64>() / m as f64).sqrt();
    let threshold = 0.5 * rms;

    let first = smooth.iter().position(|&v| v > threshold);
    let last = smooth.iter().rposition(|&v| v > threshold);
    match (first, last) {
        (Some(a), Some(b)) => beats[a..b].to_vec(),
        _ => Vec::new(),
    }
}

/// Beat frame indices for an onset envelope at a known tempo.
///
/// `frame_rate` is envelope frames per second.
pub fn track_beats(envelope: &[f32], bpm: f64, frame_rate: f64, tightness: f64) -> Vec<usize> {
    if envelope.is_empty() || bpm.is_nan() || bpm <= 0.0 {
        return Vec::new();
    }

    let period = beat_period(bpm, frame_rate);
    let local = local_score(envelope, period);
    let (backlink, cumscore) = track_dp(&local, period, tightness);

    let mut beats = Vec::new();
    let mut cursor = last_beat(&cumscore) as isize;
    while cursor >= 0 {
        beats.push(cursor as usize);
        cursor = backlink[cursor as usize];
    }
    beats.reverse();

    trim_beats(&local, &beats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(len: usize, period: usize, offset: usize) -> Vec<f32> {
        let mut env = vec![0.0f32; len];
        for i in (offset..len).step_by(period) {
            env[i] = 1.0;
        }
        env
    }

    #[test]
    fn test_beat_period_rounding() {
        let frame_rate = 22050.0 / 1024.0;
        assert_eq!(beat_period(120.0, frame_rate), 11);
        assert_eq!(beat_period(60.0, frame_rate), 22);
    }

    #[test]
    fn test_local_maxima_edges() {
        let m = local_maxima(&[3.0, 1.0, 2.0, 2.0, 0.0, 5.0]);
        assert_eq!(m, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn test_tracks_regular_pulses() {
        let env = pulse_train(400, 20, 5);
        let frame_rate = 22050.0 / 1024.0;
        let bpm = 60.0 * frame_rate / 20.0;
        let beats = track_beats(&env, bpm, frame_rate, 100.0);

        assert!(beats.len() >= 15, "got {} beats", beats.len());
        for pair in beats.windows(2) {
            assert_eq!(pair[1] - pair[0], 20);
        }
        assert!(beats.iter().all(|b| (b - 5) % 20 == 0));
    }

    #[test]
    fn test_silence_and_bad_tempo() {
        assert!(track_beats(&[], 120.0, 21.5, 100.0).is_empty());
        assert!(track_beats(&[1.0, 0.0, 1.0], 0.0, 21.5, 100.0).is_empty());
    }

    #[test]
    fn test_trim_drops_weak_edges() {
        let mut local = vec![0.0f64; 100];
        for b in [10, 20, 30, 40, 50, 60, 70] {
            local[b] = 1.0;
        }
        let beats = vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90];
        let trimmed = trim_beats(&local, &beats);
        assert_eq!(trimmed, vec![10, 20, 30, 40, 50, 60, 70]);
    }

    #[test]
    fn test_trim_stops_before_last_strong_beat() {
        let local = vec![1.0f64; 50];
        let beats = vec![0, 10, 20, 30, 40];
        // Every smoothed score clears the threshold; the final beat is still cut.
        assert_eq!(trim_beats(&local, &beats), vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_last_beat_needs_more_than_half_the_median() {
        // Maxima at 1, 3 and 5 with scores 4, 4 and 2: median 4, and 2 * 2 is not above it.
        let cumscore = [0.0, 4.0, 0.0, 4.0, 0.0, 2.0, 0.0];
        assert_eq!(last_beat(&cumscore), 3);
    }
}
