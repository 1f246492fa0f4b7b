//! Analytic illuminant generators.
//!
//! Two families of light sources can be synthesised without any data files:
//!
//! - **Daylight** (CIE D-series), reconstructed from the S0/S1/S2 basis
//!   vectors for CCTs between 4000 K and 25000 K. Hundreds-of-Kelvin
//!   shorthand (40..250, e.g. `D65` = 65) is accepted for compatibility and
//!   corrected by the historical `1.4387752 / 1.438` radiation-constant
//!   ratio.
//! - **Blackbody** (Planckian radiators) for CCTs between 1500 K and 3999 K.
//!
//! Out-of-range temperatures are reported as recoverable errors.

use rta_math::interp_linear;

use crate::{Error, Result, Shape, SpectralData, Spectrum};

/// Planck constant, J*s.
const PLANCKS_CONSTANT: f64 = 6.62607015e-34;
/// Speed of light in vacuum, m/s.
const LIGHT_SPEED: f64 = 299_792_458.0;
/// Boltzmann constant, J/K.
const BOLTZMANN_CONSTANT: f64 = 1.380649e-23;

/// One row of the CIE daylight basis: wavelength and the S0/S1/S2 components.
struct SBasis {
    wl: f64,
    s: [f64; 3],
}

/// CIE daylight components S0, S1, S2, tabulated from 300 nm to 830 nm in
/// 10 nm steps.
#[rustfmt::skip]
const S_SERIES: [SBasis; 54] = [
    SBasis { wl: 300.0, s: [  0.04,   0.02,  0.0 ] },
    SBasis { wl: 310.0, s: [  6.0,    4.5,   2.0 ] },
    SBasis { wl: 320.0, s: [ 29.6,   22.4,   4.0 ] },
    SBasis { wl: 330.0, s: [ 55.3,   42.0,   8.5 ] },
    SBasis { wl: 340.0, s: [ 57.3,   40.6,   7.8 ] },
    SBasis { wl: 350.0, s: [ 61.8,   41.6,   6.7 ] },
    SBasis { wl: 360.0, s: [ 61.5,   38.0,   5.3 ] },
    SBasis { wl: 370.0, s: [ 68.8,   42.4,   6.1 ] },
    SBasis { wl: 380.0, s: [ 63.4,   38.5,   3.0 ] },
    SBasis { wl: 390.0, s: [ 65.8,   35.0,   1.2 ] },
    SBasis { wl: 400.0, s: [ 94.8,   43.4,  -1.1 ] },
    SBasis { wl: 410.0, s: [104.8,   46.3,  -0.5 ] },
    SBasis { wl: 420.0, s: [105.9,   43.9,  -0.7 ] },
    SBasis { wl: 430.0, s: [ 96.8,   37.1,  -1.2 ] },
    SBasis { wl: 440.0, s: [113.9,   36.7,  -2.6 ] },
    SBasis { wl: 450.0, s: [125.6,   35.9,  -2.9 ] },
    SBasis { wl: 460.0, s: [125.5,   32.6,  -2.8 ] },
    SBasis { wl: 470.0, s: [121.3,   27.9,  -2.6 ] },
    SBasis { wl: 480.0, s: [121.3,   24.3,  -2.6 ] },
    SBasis { wl: 490.0, s: [113.5,   20.1,  -1.8 ] },
    SBasis { wl: 500.0, s: [113.1,   16.2,  -1.5 ] },
    SBasis { wl: 510.0, s: [110.8,   13.2,  -1.3 ] },
    SBasis { wl: 520.0, s: [106.5,    8.6,  -1.2 ] },
    SBasis { wl: 530.0, s: [108.8,    6.1,  -1.0 ] },
    SBasis { wl: 540.0, s: [105.3,    4.2,  -0.5 ] },
    SBasis { wl: 550.0, s: [104.4,    1.9,  -0.3 ] },
    SBasis { wl: 560.0, s: [100.0,    0.0,   0.0 ] },
    SBasis { wl: 570.0, s: [ 96.0,   -1.6,   0.2 ] },
    SBasis { wl: 580.0, s: [ 95.1,   -3.5,   0.5 ] },
    SBasis { wl: 590.0, s: [ 89.1,   -3.5,   2.1 ] },
    SBasis { wl: 600.0, s: [ 90.5,   -5.8,   3.2 ] },
    SBasis { wl: 610.0, s: [ 90.3,   -7.2,   4.1 ] },
    SBasis { wl: 620.0, s: [ 88.4,   -8.6,   4.7 ] },
    SBasis { wl: 630.0, s: [ 84.0,   -9.5,   5.1 ] },
    SBasis { wl: 640.0, s: [ 85.1,  -10.9,   6.7 ] },
    SBasis { wl: 650.0, s: [ 81.9,  -10.7,   7.3 ] },
    SBasis { wl: 660.0, s: [ 82.6,  -12.0,   8.6 ] },
    SBasis { wl: 670.0, s: [ 84.9,  -14.0,   9.8 ] },
    SBasis { wl: 680.0, s: [ 81.3,  -13.6,  10.2 ] },
    SBasis { wl: 690.0, s: [ 71.9,  -12.0,   8.3 ] },
    SBasis { wl: 700.0, s: [ 74.3,  -13.3,   9.6 ] },
    SBasis { wl: 710.0, s: [ 76.4,  -12.9,   8.5 ] },
    SBasis { wl: 720.0, s: [ 63.3,  -10.6,   7.0 ] },
    SBasis { wl: 730.0, s: [ 71.7,  -11.6,   7.6 ] },
    SBasis { wl: 740.0, s: [ 77.0,  -12.2,   8.0 ] },
    SBasis { wl: 750.0, s: [ 65.2,  -10.2,   6.7 ] },
    SBasis { wl: 760.0, s: [ 47.7,   -7.8,   5.2 ] },
    SBasis { wl: 770.0, s: [ 68.6,  -11.2,   7.4 ] },
    SBasis { wl: 780.0, s: [ 65.0,  -10.4,   6.8 ] },
    SBasis { wl: 790.0, s: [ 66.0,  -10.6,   7.0 ] },
    SBasis { wl: 800.0, s: [ 61.0,   -9.7,   6.4 ] },
    SBasis { wl: 810.0, s: [ 53.3,   -8.3,   5.5 ] },
    SBasis { wl: 820.0, s: [ 58.9,   -9.3,   6.1 ] },
    SBasis { wl: 830.0, s: [ 61.9,   -9.8,   6.5 ] },
];

/// Calculates the chromaticity (x, y) of a daylight illuminant from its CCT.
///
/// Two empirical polynomials cover the two halves of the D-series range; the
/// crossover sits near 7000 K.
fn cct_to_xy(cct: f64) -> (f64, f64) {
    let x = if (4002.15..=7003.77).contains(&cct) {
        0.244063 + 99.11 / cct + 2.9678 * 1e6 / cct.powi(2) - 4.6070 * 1e9 / cct.powi(3)
    } else {
        0.237040 + 247.48 / cct + 1.9018 * 1e6 / cct.powi(2) - 2.0064 * 1e9 / cct.powi(3)
    };

    let y = -3.0 * x.powi(2) + 2.87 * x - 0.275;

    (x, y)
}

/// Calculates a daylight (CIE D-series) spectral power distribution.
///
/// `cct_input` is either Kelvin in `[4000, 25000]`, or the legacy
/// hundreds-of-Kelvin shorthand in `[40, 250]` (so `65` means D65). The
/// result is sampled on [`Shape::REFERENCE`].
pub fn daylight_spd(cct_input: i32) -> Result<Spectrum> {
    let cct = if (40..=250).contains(&cct_input) {
        // Shorthand: the historical D-series tables were tabulated with the
        // older value of the second radiation constant.
        cct_input as f64 * 100.0 * 1.4387752 / 1.438
    } else if (4000..=25000).contains(&cct_input) {
        cct_input as f64
    } else {
        return Err(Error::TemperatureOutOfRange {
            cct: cct_input,
            generator: "daylight",
            min: 4000,
            max: 25000,
        });
    };

    let (x, y) = cct_to_xy(cct);

    let m0 = 0.0241 + 0.2562 * x - 0.7341 * y;
    let m1 = (-1.3515 - 1.7703 * x + 5.9114 * y) / m0;
    let m2 = (0.03000 - 31.4424 * x + 30.0717 * y) / m0;

    let wavelengths: Vec<f64> = S_SERIES.iter().map(|b| b.wl).collect();
    let s0: Vec<f64> = S_SERIES.iter().map(|b| b.s[0]).collect();
    let s1: Vec<f64> = S_SERIES.iter().map(|b| b.s[1]).collect();
    let s2: Vec<f64> = S_SERIES.iter().map(|b| b.s[2]).collect();

    let step = Shape::REFERENCE.step;
    let count = ((S_SERIES[53].wl - S_SERIES[0].wl) / step) as usize + 1;
    let grid: Vec<f64> = (0..count).map(|i| S_SERIES[0].wl + step * i as f64).collect();

    let s0i = interp_linear(&wavelengths, &s0, &grid);
    let s1i = interp_linear(&wavelengths, &s1, &grid);
    let s2i = interp_linear(&wavelengths, &s2, &grid);

    // Clip the basis range (300-830) to the working range (380-780).
    let mut values = Vec::with_capacity(Shape::REFERENCE.sample_count());
    for (i, &wl) in grid.iter().enumerate() {
        if (Shape::REFERENCE.first..=Shape::REFERENCE.last).contains(&wl) {
            values.push(s0i[i] + m1 * s1i[i] + m2 * s2i[i]);
        }
    }

    Ok(Spectrum::from_values(Shape::REFERENCE, values))
}

/// Calculates a Planckian (blackbody) spectral power distribution.
///
/// `cct` must be in `[1500, 4000)` Kelvin. The result is spectral radiance
/// per the Planck law, sampled on [`Shape::REFERENCE`].
pub fn blackbody_spd(cct: i32) -> Result<Spectrum> {
    if !(1500..4000).contains(&cct) {
        return Err(Error::TemperatureOutOfRange {
            cct,
            generator: "blackbody",
            min: 1500,
            max: 3999,
        });
    }

    let mut values = Vec::with_capacity(Shape::REFERENCE.sample_count());

    let mut wavelength = Shape::REFERENCE.first;
    while wavelength <= Shape::REFERENCE.last {
        let lambda = wavelength / 1e9;
        let c1 = 2.0 * PLANCKS_CONSTANT * LIGHT_SPEED.powi(2);
        let c2 = PLANCKS_CONSTANT * LIGHT_SPEED / (BOLTZMANN_CONSTANT * lambda * cct as f64);
        values.push(c1 * std::f64::consts::PI / (lambda.powi(5) * (c2.exp() - 1.0)));
        wavelength += Shape::REFERENCE.step;
    }

    Ok(Spectrum::from_values(Shape::REFERENCE, values))
}

/// Generates a complete illuminant [`SpectralData`] record with a single
/// `power` channel in the `main` set.
///
/// `is_daylight` selects the generator; `type_name` becomes the record's
/// type string (e.g. `"d65"` or `"3200k"`).
pub fn generate_illuminant(cct: i32, type_name: &str, is_daylight: bool) -> Result<SpectralData> {
    let power = if is_daylight {
        daylight_spd(cct)?
    } else {
        blackbody_spd(cct)?
    };

    let mut illuminant = SpectralData {
        data_type: type_name.to_string(),
        ..Default::default()
    };
    illuminant
        .data
        .insert("main".to_string(), vec![("power".to_string(), power)]);

    Ok(illuminant)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daylight_shape() {
        let spd = daylight_spd(6500).unwrap();
        assert_eq!(spd.shape, Shape::REFERENCE);
        assert_eq!(spd.values.len(), 81);
        // Daylight SPDs are strictly positive over the visible range.
        assert!(spd.values.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_daylight_shorthand_matches_kelvin() {
        // D65 via shorthand lands near 6504 K; compare against the direct
        // Kelvin evaluation of the corrected temperature.
        let shorthand = daylight_spd(65).unwrap();
        let direct = daylight_spd(6504).unwrap();

        for (a, b) in shorthand.values.iter().zip(direct.values.iter()) {
            assert!((a - b).abs() / b.abs() < 1e-3);
        }
    }

    #[test]
    fn test_daylight_range() {
        assert!(daylight_spd(3999).is_err());
        assert!(daylight_spd(25001).is_err());
        assert!(daylight_spd(251).is_err());
        assert!(daylight_spd(4000).is_ok());
        assert!(daylight_spd(25000).is_ok());
        assert!(daylight_spd(40).is_ok());
    }

    #[test]
    fn test_blackbody_shape_and_range() {
        let spd = blackbody_spd(3200).unwrap();
        assert_eq!(spd.values.len(), 81);
        assert!(spd.values.iter().all(|&v| v > 0.0));

        assert!(blackbody_spd(1499).is_err());
        assert!(blackbody_spd(4000).is_err());
        assert!(blackbody_spd(1500).is_ok());
        assert!(blackbody_spd(3999).is_ok());
    }

    #[test]
    fn test_blackbody_warmer_is_redder() {
        // Lower color temperature concentrates energy at longer wavelengths.
        let warm = blackbody_spd(2000).unwrap();
        let ratio_warm = warm.values[80] / warm.values[0];
        let hot = blackbody_spd(3900).unwrap();
        let ratio_hot = hot.values[80] / hot.values[0];
        assert!(ratio_warm > ratio_hot);
    }

    #[test]
    fn test_daylight_blackbody_crossover() {
        // The regimes meet near 4000 K; both produce smooth positive SPDs
        // with a red-leaning slope. Document the crossover rather than
        // forcing exact agreement.
        let d = daylight_spd(4000).unwrap();
        let b = blackbody_spd(3999).unwrap();

        let d_slope = d.values[80] / d.values[40];
        let b_slope = b.values[80] / b.values[40];
        assert!(d_slope > 0.5 && b_slope > 0.5);
    }

    #[test]
    fn test_generate_illuminant() {
        let illuminant = generate_illuminant(6500, "d65", true).unwrap();
        assert_eq!(illuminant.data_type, "d65");
        assert_eq!(illuminant.main_channel_count(), 1);
        assert!(illuminant.main("power").is_ok());

        assert!(generate_illuminant(100, "100k", false).is_err());
    }
}
