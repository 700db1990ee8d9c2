//! Linear-interpolation resampler
//!
//! For output index `i` the source position is `carry + i * (src/dst)`; the
//! sample is interpolated between the two neighboring source samples. The
//! fractional position and the last source sample are carried across calls
//! so chunk boundaries introduce no discontinuity.

/// Streaming resampler from an arbitrary source rate to a fixed target rate.
pub struct LinearResampler {
    /// Source samples consumed per output sample.
    ratio: f64,
    /// Fractional read position relative to the retained tail sample.
    carry: f64,
    /// Last source sample of the previous call, kept for interpolation
    /// across the buffer boundary.
    tail: Option<f32>,
}

impl LinearResampler {
    pub fn new(src_rate_hz: u32, dst_rate_hz: u32) -> Self {
        assert!(src_rate_hz > 0 && dst_rate_hz > 0);
        Self {
            ratio: src_rate_hz as f64 / dst_rate_hz as f64,
            carry: 0.0,
            tail: None,
        }
    }

    /// Resample one buffer. Returns as many output samples as the combined
    /// carried tail and `input` cover; the remainder of the read position is
    /// carried into the next call.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }

        // Conceptual source slice: the retained tail (if any) followed by
        // this input. Positions index into that slice.
        let tail = self.tail;
        let offset = usize::from(tail.is_some());
        let len = offset + input.len();
        let at = move |i: usize| -> f32 {
            if i < offset {
                tail.unwrap_or(0.0)
            } else {
                input[i - offset]
            }
        };

        let mut out = Vec::with_capacity((len as f64 / self.ratio) as usize + 1);
        let mut pos = self.carry;

        loop {
            let i0 = pos.floor() as usize;
            let frac = (pos - pos.floor()) as f32;
            if i0 + 1 < len {
                let a = at(i0);
                let b = at(i0 + 1);
                out.push(a + (b - a) * frac);
            } else if i0 + 1 == len && frac == 0.0 {
                // Landed exactly on the final sample; nothing to interpolate.
                out.push(at(i0));
            } else {
                break;
            }
            pos += self.ratio;
        }

        // Re-anchor the position on the new tail sample (index len-1).
        self.carry = pos - (len - 1) as f64;
        self.tail = Some(at(len - 1));

        out
    }

    /// Drop carried state, e.g. when the microphone stream restarts.
    pub fn reset(&mut self) {
        self.carry = 0.0;
        self.tail = None;
    }
}
