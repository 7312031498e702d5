use ogn_map::Rgba;

use crate::selection::ColourScheme;

pub const STOPS: usize = 25;
/// Lower threshold of the strongest band.
pub const STRONGEST: f64 = 250.0;
/// Values at or above this are not painted.
pub const UPPER_LIMIT: f64 = 1_000_000.0;
pub const BAND_WIDTH: f64 = 10.0;
/// Values below the weakest band's threshold are not painted.
pub const WEAKEST: f64 = 10.0;

/// Colour ramp for coverage bands: stop 0 is the max endpoint, the last
/// stop is the min endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    stops: [Rgba; STOPS],
}

impl Gradient {
    pub fn new(min: Rgba, max: Rgba) -> Self {
        let last = (STOPS - 1) as f64;
        let mut stops = [max; STOPS];
        for (index, stop) in stops.iter_mut().enumerate() {
            *stop = max.lerp(min, index as f64 / last);
        }
        Self { stops }
    }

    pub fn from_scheme(scheme: &ColourScheme) -> Option<Self> {
        scheme.endpoints().ok().map(|(min, max)| Self::new(min, max))
    }

    pub fn stop(&self, index: usize) -> Rgba {
        self.stops[index.min(STOPS - 1)]
    }

    pub fn stops(&self) -> &[Rgba; STOPS] {
        &self.stops
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self::from_scheme(&ColourScheme::default())
            .unwrap_or_else(|| Self::new(Rgba::TRANSPARENT, Rgba::RED))
    }
}

/// Band index for a signal value: band 0 holds `[250, 1 000 000)`, band
/// n holds `[250 - 10n, 260 - 10n)`.
pub fn band_of(value: f64) -> Option<usize> {
    if !value.is_finite() || value < WEAKEST || value >= UPPER_LIMIT {
        return None;
    }
    if value >= STRONGEST {
        return Some(0);
    }
    Some(((STRONGEST - value) / BAND_WIDTH).ceil() as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_and_monotonic_channels() {
        let min = Rgba::opaque(255, 0, 0);
        let max = Rgba::opaque(0, 255, 0);
        let gradient = Gradient::new(min, max);
        assert_eq!(gradient.stop(0), max);
        assert_eq!(gradient.stop(STOPS - 1), min);
        for pair in gradient.stops().windows(2) {
            assert!(pair[0].r <= pair[1].r);
            assert!(pair[0].g >= pair[1].g);
            assert_eq!(pair[1].a, 255);
        }
    }

    #[test]
    fn bands_step_by_ten() {
        assert_eq!(band_of(1000.0), Some(0));
        assert_eq!(band_of(999_999.0), Some(0));
        assert_eq!(band_of(1_000_000.0), None);
        assert_eq!(band_of(2_000_000.0), None);
        assert_eq!(band_of(250.0), Some(0));
        assert_eq!(band_of(249.9), Some(1));
        assert_eq!(band_of(240.0), Some(1));
        assert_eq!(band_of(239.0), Some(2));
        assert_eq!(band_of(10.0), Some(24));
        assert_eq!(band_of(9.9), None);
        assert_eq!(band_of(f64::NAN), None);
    }
}
