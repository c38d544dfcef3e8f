//! Per-channel gamma lookup tables.
//!
//! Each table maps a raw 8-bit intensity to its corrected value. Tables
//! are built once at configuration time and then only read.

use crate::Color;

/// A 256-entry lookup table for one color channel.
#[derive(Clone, PartialEq, Eq)]
pub struct GammaTable {
    lut: [u8; 256],
}

impl GammaTable {
    /// Build a table for `gamma`, or `None` when the exponent disables
    /// correction (non-positive or not finite).
    ///
    /// `table[i] = round(255 * (i / 255) ^ (1 / gamma))`
    pub fn new(gamma: f64) -> Option<Self> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return None;
        }

        let exponent = 1.0 / gamma;
        let mut lut = [0u8; 256];
        for (i, slot) in lut.iter_mut().enumerate() {
            let value = (255.0 * (i as f64 / 255.0).powf(exponent)).round();
            *slot = value.clamp(0.0, 255.0) as u8;
        }

        Some(Self { lut })
    }

    pub fn apply(&self, intensity: u8) -> u8 {
        self.lut[intensity as usize]
    }
}

impl std::fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaTable")
            .field("midpoint", &self.lut[128])
            .finish()
    }
}

/// Optional tables for the red, green and blue channels.
///
/// A channel without a table passes its intensity through unchanged.
#[derive(Clone, Debug, Default)]
pub struct GammaCorrection {
    pub red: Option<GammaTable>,
    pub green: Option<GammaTable>,
    pub blue: Option<GammaTable>,
}

impl GammaCorrection {
    pub fn new(red: f64, green: f64, blue: f64) -> Self {
        Self {
            red: GammaTable::new(red),
            green: GammaTable::new(green),
            blue: GammaTable::new(blue),
        }
    }

    pub fn correct(&self, c: Color) -> Color {
        Color {
            r: apply(self.red.as_ref(), c.r),
            g: apply(self.green.as_ref(), c.g),
            b: apply(self.blue.as_ref(), c.b),
        }
    }
}

/// Map `intensity` through `table`, or return it unchanged when there is none.
pub fn apply(table: Option<&GammaTable>, intensity: u8) -> u8 {
    match table {
        Some(t) => t.apply(intensity),
        None => intensity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn gamma_one_is_identity() {
        let table = GammaTable::new(1.0).unwrap();
        for i in 0..=255u8 {
            assert_eq!(table.apply(i), i);
        }
    }

    #[rstest]
    #[case(0.0)]
    #[case(-1.0)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn non_positive_or_non_finite_gamma_disables_table(#[case] gamma: f64) {
        assert!(GammaTable::new(gamma).is_none());
    }

    #[rstest]
    #[case(1.6)]
    #[case(2.2)]
    #[case(0.5)]
    fn endpoints_are_fixed(#[case] gamma: f64) {
        let table = GammaTable::new(gamma).unwrap();
        assert_eq!(table.apply(0), 0);
        assert_eq!(table.apply(255), 255);
    }

    #[test]
    fn gamma_above_one_lifts_midtones() {
        // 255 * (128/255)^(1/2) = 180.67
        let table = GammaTable::new(2.0).unwrap();
        assert_eq!(table.apply(128), 181);
        assert!(table.apply(64) > 64);
    }

    #[test]
    fn table_is_monotonic() {
        let table = GammaTable::new(1.6).unwrap();
        for i in 1..=255u8 {
            assert!(table.apply(i) >= table.apply(i - 1));
        }
    }

    #[test]
    fn apply_without_table_is_identity() {
        assert_eq!(apply(None, 77), 77);
    }

    #[test]
    fn correction_uses_each_channels_own_table() {
        let correction = GammaCorrection::new(2.0, -1.0, 1.0);
        let c = correction.correct(Color::new(128, 128, 128));
        assert_eq!(c, Color::new(181, 128, 128));
    }
}
