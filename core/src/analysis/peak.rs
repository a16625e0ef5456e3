//! Local-maximum peak picking over a 1-D envelope.

/// Window sizes and threshold for [`peak_pick`], all in frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakPickParams {
    pub pre_max: usize,
    pub post_max: usize,
    pub pre_avg: usize,
    pub post_avg: usize,
    pub delta: f32,
    pub wait: usize,
}

fn window(len: usize, n: usize, before: usize, after: usize) -> std::ops::Range<usize> {
    n.saturating_sub(before)..(n + after).min(len)
}

/// Indices of the peaks of `x`.
///
/// Sample `n` is a peak when all of these hold:
/// 1. `x[n] == max(x[n - pre_max .. n + post_max])`
/// 2. `x[n] >= mean(x[n - pre_avg .. n + post_avg]) + delta`
/// 3. `x[n]` is non-zero
/// 4. more than `wait` samples have passed since the previous peak
///
/// Windows are truncated at the ends of the signal.
pub fn peak_pick(x: &[f32], params: &PeakPickParams) -> Vec<usize> {
    let len = x.len();
    let mut peaks = Vec::new();
    let mut last: Option<usize> = None;

    for n in 0..len {
        let value = x[n];
        if value == 0.0 {
            continue;
        }

        let max_range = window(len, n, params.pre_max, params.post_max.max(1));
        let local_max = x[max_range].iter().copied().fold(f32::NEG_INFINITY, f32::max);
        if value != local_max {
            continue;
        }

        let avg_range = window(len, n, params.pre_avg, params.post_avg.max(1));
        let count = avg_range.len() as f32;
        let mean = x[avg_range].iter().sum::<f32>() / count;
        if value < mean + params.delta {
            continue;
        }

        if last.map_or(true, |prev| n > prev + params.wait) {
            peaks.push(n);
            last = Some(n);
        }
    }

    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> PeakPickParams {
        PeakPickParams {
            pre_max: 3,
            post_max: 3,
            pre_avg: 3,
            post_avg: 3,
            delta: 0.1,
            wait: 0,
        }
    }

    #[test]
    fn test_isolated_peaks() {
        let mut x = vec![0.0f32; 40];
        x[5] = 1.0;
        x[20] = 0.8;
        x[21] = 0.4;
        x[33] = 0.6;
        assert_eq!(peak_pick(&x, &params()), vec![5, 20, 33]);
    }

    #[test]
    fn test_delta_rejects_flat_bumps() {
        let x = vec![0.5f32; 20];
        assert!(peak_pick(&x, &params()).is_empty());
    }

    #[test]
    fn test_wait_suppresses_close_peaks() {
        let mut x = vec![0.0f32; 30];
        x[5] = 1.0;
        x[9] = 1.0;
        let mut p = params();
        p.pre_max = 1;
        p.post_max = 1;
        assert_eq!(peak_pick(&x, &p), vec![5, 9]);
        p.wait = 5;
        assert_eq!(peak_pick(&x, &p), vec![5]);
    }
}
