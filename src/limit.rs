use num_traits::Float;

use crate::Sample;

/// Treatment applied to each mixed sample before it reaches the device
///
/// Many loud buffers playing at once can sum to arbitrarily large values. Mixing itself never
/// clamps; the limiter runs once over each finished period.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Limiter {
    /// Leave samples untouched
    PassThrough,
    /// Hard clip into [-1, 1]
    #[default]
    Clamp,
    /// Smoothly map into (-1, 1) with `x / (1 + |x|)`
    Reinhard,
    /// Smoothly map into (-1, 1) with `tanh(x)`
    ///
    /// Distorts quiet sounds less than [`Reinhard`](Self::Reinhard), and loud sounds more.
    Tanh,
}

impl Limiter {
    /// Apply the limiter to every sample in `samples`
    pub fn apply(self, samples: &mut [Sample]) {
        match self {
            Limiter::PassThrough => {}
            Limiter::Clamp => {
                for x in samples {
                    *x = x.clamp(-1.0, 1.0);
                }
            }
            Limiter::Reinhard => {
                for x in samples {
                    *x /= 1.0 + x.abs();
                }
            }
            Limiter::Tanh => {
                for x in samples {
                    *x = Float::tanh(*x);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp() {
        let mut xs = [-3.0, -0.5, 0.75, 1.5];
        Limiter::Clamp.apply(&mut xs);
        assert_eq!(xs, [-1.0, -0.5, 0.75, 1.0]);
    }

    #[test]
    fn smooth_limiters_stay_in_range() {
        for limiter in [Limiter::Reinhard, Limiter::Tanh] {
            let mut xs = [-4.0, -1.0, 0.0, 1.0, 4.0];
            limiter.apply(&mut xs);
            assert!(xs.iter().all(|x| x.abs() < 1.0));
            assert_eq!(xs[2], 0.0);
            assert!(xs.windows(2).all(|w| w[0] < w[1]));
        }
        let mut xs = [1.0];
        Limiter::Reinhard.apply(&mut xs);
        assert_eq!(xs, [0.5]);
    }

    #[test]
    fn pass_through() {
        let mut xs = [2.5, -7.0];
        Limiter::PassThrough.apply(&mut xs);
        assert_eq!(xs, [2.5, -7.0]);
    }
}
