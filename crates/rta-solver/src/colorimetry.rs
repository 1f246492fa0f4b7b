//! Shared colorimetry: constant tables and color space conversions.
//!
//! Everything in here is process-wide immutable data or pure functions over
//! it: the Robertson correlated-color-temperature table, CIE 1960 uv
//! conversions, CIELAB, the ACES AP0 primaries and the canonical conversion
//! matrices used by both solvers.

use rta_math::{adapt_matrix, Mat3, Vec3, ACES_WHITE, BRADFORD, D65_WHITE};

// ============================================================================
// ACES constants
// ============================================================================

/// ACES AP0 chromaticities: R, G, B primaries and the white point, as CIE xy.
pub const ACES_CHROMATICITIES: [[f64; 2]; 4] = [
    [0.7347, 0.2653],
    [0.0, 1.0],
    [0.0001, -0.0770],
    [0.32168, 0.33767],
];

/// Conversion from D65-referenced XYZ to ACES AP0 RGB.
///
/// The fixed matrix used by the metadata (DNG) path when assembling the final
/// input transform.
pub const XYZ_D65_TO_ACES_RGB: Mat3 = Mat3::from_rows([
    [1.0634731317028, 0.00639793641966071, -0.0157891874506841],
    [-0.492082784686793, 1.36823709310019, 0.0913444629573544],
    [-0.0028137154424595, 0.00463991165243123, 0.91649468506889],
]);

/// Conversion from ACES-white-referenced XYZ to ACES AP0 RGB.
///
/// Applied by the pixel pipeline after the CAT when the decoder outputs XYZ.
pub const XYZ_TO_ACES: Mat3 = Mat3::from_rows([
    [1.0498110175, 0.0, -0.0000974845],
    [-0.4959030231, 1.3733130458, 0.0982400361],
    [0.0, 0.0, 0.9912520182],
]);

// ============================================================================
// Robertson table
// ============================================================================

/// Robertson's (u, v, slope) isotemperature lines.
///
/// Rows correspond one-to-one with [`ROBERTSON_MIRED`].
#[rustfmt::skip]
pub const ROBERTSON_UVT: [[f64; 3]; 31] = [
    [0.18006, 0.26352,   -0.24341],
    [0.18066, 0.26589,   -0.25479],
    [0.18133, 0.26846,   -0.26876],
    [0.18208, 0.27119,   -0.28539],
    [0.18293, 0.27407,   -0.30470],
    [0.18388, 0.27709,   -0.32675],
    [0.18494, 0.28021,   -0.35156],
    [0.18611, 0.28342,   -0.37915],
    [0.18740, 0.28668,   -0.40955],
    [0.18880, 0.28997,   -0.44278],
    [0.19032, 0.29326,   -0.47888],
    [0.19462, 0.30141,   -0.58204],
    [0.19962, 0.30921,   -0.70471],
    [0.20525, 0.31647,   -0.84901],
    [0.21142, 0.32312,   -1.0182 ],
    [0.21807, 0.32909,   -1.2168 ],
    [0.22511, 0.33439,   -1.4512 ],
    [0.23247, 0.33904,   -1.7298 ],
    [0.24010, 0.34308,   -2.0637 ],
    [0.24792, 0.34655,   -2.4681 ],
    [0.25591, 0.34951,   -2.9641 ],
    [0.26400, 0.35200,   -3.5814 ],
    [0.27218, 0.35407,   -4.3633 ],
    [0.28039, 0.35577,   -5.3762 ],
    [0.28863, 0.35714,   -6.7262 ],
    [0.29685, 0.35823,   -8.5955 ],
    [0.30505, 0.35907,  -11.324  ],
    [0.31320, 0.35968,  -15.628  ],
    [0.32129, 0.36011,  -23.325  ],
    [0.32931, 0.36038,  -40.770  ],
    [0.33724, 0.36051, -116.45   ],
];

/// Mired values of the Robertson table rows.
#[rustfmt::skip]
pub const ROBERTSON_MIRED: [f64; 31] = [
      0.0,  10.0,  20.0,  30.0,  40.0,  50.0,  60.0,  70.0,  80.0,  90.0,
    100.0, 125.0, 150.0, 175.0, 200.0, 225.0, 250.0, 275.0, 300.0, 325.0,
    350.0, 375.0, 400.0, 425.0, 450.0, 475.0, 500.0, 525.0, 550.0, 575.0,
    600.0,
];

// ============================================================================
// Temperature conversions
// ============================================================================

/// Converts a correlated color temperature in Kelvin to Mired.
#[inline]
pub fn cct_to_mired(cct: f64) -> f64 {
    1.0e6 / cct
}

/// Converts a Mired value back to Kelvin.
#[inline]
pub fn mired_to_cct(mired: f64) -> f64 {
    1.0e6 / mired
}

/// Converts XYZ to CIE 1960 (u, v) coordinates.
pub fn xyz_to_uv(xyz: Vec3) -> (f64, f64) {
    let denom = xyz.x + 15.0 * xyz.y + 3.0 * xyz.z;
    (4.0 * xyz.x / denom, 6.0 * xyz.y / denom)
}

/// Converts CIE 1960 (u, v) coordinates back to XYZ with Y = 1.
pub fn uv_to_xyz(u: f64, v: f64) -> Vec3 {
    let denom = 2.0 * u - 8.0 * v + 4.0;
    let x = 3.0 * u / denom;
    let y = 2.0 * v / denom;
    xy_to_xyz(x, y)
}

/// Converts xy chromaticity to XYZ with Y = 1.
pub fn xy_to_xyz(x: f64, y: f64) -> Vec3 {
    if y.abs() < 1e-10 {
        Vec3::ZERO
    } else {
        Vec3::new(x / y, 1.0, (1.0 - x - y) / y)
    }
}

/// Signed perpendicular distance between a (u, v) point and a Robertson
/// isotemperature line.
fn robertson_length(uv: (f64, f64), uvt: &[f64; 3]) -> f64 {
    let t = uvt[2];
    let sign = if t < 0.0 {
        -1.0
    } else if t > 0.0 {
        1.0
    } else {
        0.0
    };

    let slope_u = -sign / (1.0 + t * t).sqrt();
    let slope_v = t * slope_u;

    let du = uv.0 - uvt[0];
    let dv = uv.1 - uvt[1];

    // 2D cross product of the line direction with the offset
    slope_u * dv - slope_v * du
}

/// Estimates the correlated color temperature of an XYZ value.
///
/// Scans the Robertson table for the sign flip of the perpendicular distance
/// and linearly interpolates the Mired value at the zero crossing. The result
/// is clamped to [2000, 50000] Kelvin.
pub fn xyz_to_cct(xyz: Vec3) -> f64 {
    let uv = xyz_to_uv(xyz);

    let mut distance_this = 0.0;
    let mut distance_prev = 0.0;
    let mut index = ROBERTSON_UVT.len();

    for (i, row) in ROBERTSON_UVT.iter().enumerate() {
        distance_this = robertson_length(uv, row);
        if distance_this <= 0.0 {
            index = i;
            break;
        }
        distance_prev = distance_this;
    }

    let mired = if index == 0 {
        ROBERTSON_MIRED[0]
    } else if index >= ROBERTSON_UVT.len() {
        ROBERTSON_MIRED[ROBERTSON_MIRED.len() - 1]
    } else {
        ROBERTSON_MIRED[index - 1]
            + distance_prev * (ROBERTSON_MIRED[index] - ROBERTSON_MIRED[index - 1])
                / (distance_prev - distance_this)
    };

    mired_to_cct(mired).clamp(2000.0, 50000.0)
}

/// Estimates the XYZ value of a correlated color temperature.
///
/// Locates the bracketing Robertson rows by Mired, linearly interpolates
/// (u, v) and projects back to XYZ.
pub fn cct_to_xyz(cct: f64) -> Vec3 {
    let mired = cct_to_mired(cct);

    let index = ROBERTSON_MIRED.partition_point(|&m| m < mired);

    let (u, v) = if index == 0 {
        (ROBERTSON_UVT[0][0], ROBERTSON_UVT[0][1])
    } else if index >= ROBERTSON_MIRED.len() {
        let last = &ROBERTSON_UVT[ROBERTSON_UVT.len() - 1];
        (last[0], last[1])
    } else {
        let weight = (mired - ROBERTSON_MIRED[index - 1])
            / (ROBERTSON_MIRED[index] - ROBERTSON_MIRED[index - 1]);
        let lo = &ROBERTSON_UVT[index - 1];
        let hi = &ROBERTSON_UVT[index];
        (
            hi[0] * weight + lo[0] * (1.0 - weight),
            hi[1] * weight + lo[1] * (1.0 - weight),
        )
    };

    uv_to_xyz(u, v)
}

/// Maps an EXIF LightSource tag to a correlated color temperature in Kelvin.
///
/// Tags of 32768 and above encode the temperature directly as `tag - 32768`;
/// unknown tags default to 5500 K.
pub fn light_source_to_cct(tag: u16) -> f64 {
    if tag >= 32768 {
        return f64::from(tag) - 32768.0;
    }

    const EXIF_LIGHT_SOURCE_CCT: [(u16, f64); 11] = [
        (0, 5500.0),
        (1, 5500.0),
        (2, 3500.0),
        (3, 3400.0),
        (10, 5550.0),
        (17, 2856.0),
        (18, 4874.0),
        (19, 6774.0),
        (20, 5500.0),
        (21, 6500.0),
        (22, 7500.0),
    ];

    EXIF_LIGHT_SOURCE_CCT
        .iter()
        .find(|(t, _)| *t == tag)
        .map_or(5500.0, |(_, cct)| *cct)
}

// ============================================================================
// CIELAB and matrix construction
// ============================================================================

/// Converts XYZ to CIELAB with the given reference white.
pub fn xyz_to_lab(xyz: Vec3, white: Vec3) -> Vec3 {
    const EPSILON: f64 = 216.0 / 24389.0;
    const KAPPA: f64 = 24389.0 / 27.0;

    let f = |t: f64| {
        if t > EPSILON {
            t.cbrt()
        } else {
            (KAPPA * t + 16.0) / 116.0
        }
    };

    let fx = f(xyz.x / white.x);
    let fy = f(xyz.y / white.y);
    let fz = f(xyz.z / white.z);

    Vec3::new(116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Builds the RGB-to-XYZ matrix implied by a set of primaries and a white
/// point, all given as xy chromaticities `[R, G, B, W]`.
///
/// Standard construction: primaries as XYZ columns, channel gains solved so
/// that RGB (1, 1, 1) lands on the white point.
pub fn rgb_to_xyz_matrix(chromaticities: &[[f64; 2]; 4]) -> Mat3 {
    let r = xy_to_xyz(chromaticities[0][0], chromaticities[0][1]);
    let g = xy_to_xyz(chromaticities[1][0], chromaticities[1][1]);
    let b = xy_to_xyz(chromaticities[2][0], chromaticities[2][1]);
    let mut w = xy_to_xyz(chromaticities[3][0], chromaticities[3][1]);

    let m = Mat3::from_col_vecs(r, g, b);
    w = w / w.y;

    let gains = m.inverse().unwrap_or(Mat3::IDENTITY) * w;
    Mat3::from_col_vecs(r * gains.x, g * gains.y, b * gains.z)
}

/// The ACES AP0 RGB-to-XYZ matrix built from [`ACES_CHROMATICITIES`].
pub fn aces_rgb_to_xyz_matrix() -> Mat3 {
    rgb_to_xyz_matrix(&ACES_CHROMATICITIES)
}

/// Bradford chromatic adaptation between two white points.
pub fn calculate_cat(src_white: Vec3, dst_white: Vec3) -> Mat3 {
    adapt_matrix(BRADFORD, src_white, dst_white)
}

/// The fixed Bradford adaptation from D65 to the ACES white point, used when
/// the decoder emits D65-referenced XYZ and no per-image adaptation exists.
pub fn cat_d65_to_aces() -> Mat3 {
    calculate_cat(D65_WHITE, ACES_WHITE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mired_roundtrip() {
        for cct in [2000.0, 3200.0, 5500.0, 6500.0, 50000.0] {
            let roundtrip = mired_to_cct(cct_to_mired(cct));
            assert!((roundtrip - cct).abs() / cct < 1e-9);
        }
    }

    #[test]
    fn test_uv_roundtrip() {
        let xyz = Vec3::new(0.95047, 1.0, 1.08883);
        let (u, v) = xyz_to_uv(xyz);
        let back = uv_to_xyz(u, v);
        assert!((back.x - xyz.x).abs() < 1e-9);
        assert!((back.y - xyz.y).abs() < 1e-9);
        assert!((back.z - xyz.z).abs() < 1e-9);
    }

    #[test]
    fn test_xyz_to_cct_d65() {
        // D65 sits near 6504 K on the daylight side of the locus.
        let cct = xyz_to_cct(Vec3::new(0.95047, 1.0, 1.08883));
        assert!((cct - 6500.0).abs() < 120.0, "cct = {cct}");
    }

    #[test]
    fn test_xyz_to_cct_illuminant_a() {
        // Illuminant A is a 2856 K Planckian radiator.
        let cct = xyz_to_cct(Vec3::new(1.09850, 1.0, 0.35585));
        assert!((cct - 2856.0).abs() < 60.0, "cct = {cct}");
    }

    #[test]
    fn test_cct_to_xyz_roundtrip_near_locus() {
        // XYZ -> CCT -> XYZ is approximately the identity for on-locus
        // colors.
        for cct in [2500.0, 4000.0, 6500.0, 10000.0] {
            let xyz = cct_to_xyz(cct);
            let back = cct_to_xyz(xyz_to_cct(xyz));
            assert!((back.x - xyz.x).abs() < 5e-3, "cct = {cct}");
            assert!((back.z - xyz.z).abs() < 5e-3, "cct = {cct}");
        }
    }

    #[test]
    fn test_cct_clamped() {
        // A deep-red XYZ is far beyond the hot end of the table.
        let cct = xyz_to_cct(Vec3::new(0.2, 1.0, 3.0));
        assert!(cct <= 50000.0);
        let cct = xyz_to_cct(Vec3::new(3.0, 1.0, 0.05));
        assert!(cct >= 2000.0);
    }

    #[test]
    fn test_light_source_map() {
        assert_eq!(light_source_to_cct(0), 5500.0);
        assert_eq!(light_source_to_cct(3), 3400.0);
        assert_eq!(light_source_to_cct(17), 2856.0);
        assert_eq!(light_source_to_cct(22), 7500.0);
        // Unknown tag defaults
        assert_eq!(light_source_to_cct(7), 5500.0);
        // Direct-Kelvin encoding
        assert_eq!(light_source_to_cct(32768 + 3200), 3200.0);
    }

    #[test]
    fn test_lab_white_is_origin() {
        let white = rta_math::ACES_WHITE;
        let lab = xyz_to_lab(white, white);
        assert!((lab.x - 100.0).abs() < 1e-9);
        assert!(lab.y.abs() < 1e-9);
        assert!(lab.z.abs() < 1e-9);
    }

    #[test]
    fn test_lab_known_value() {
        // Mid-gray: L* of Y = 0.18 under any white is ~49.5
        let white = Vec3::new(0.95047, 1.0, 1.08883);
        let lab = xyz_to_lab(white * 0.18, white);
        assert!((lab.x - 49.496).abs() < 0.01);
    }

    #[test]
    fn test_aces_matrix_maps_white() {
        let m = aces_rgb_to_xyz_matrix();
        let white = m * Vec3::ONE;
        assert!((white.x - rta_math::ACES_WHITE.x).abs() < 1e-9);
        assert!((white.y - 1.0).abs() < 1e-9);
        assert!((white.z - rta_math::ACES_WHITE.z).abs() < 1e-9);
    }

    #[test]
    fn test_cat_d65_to_aces_matches_reference() {
        // Cross-check against the widely published Bradford D65 -> D60
        // values.
        let reference = [
            [1.0130349, 0.0061053, -0.0149710],
            [0.0076982, 0.9981648, -0.0050321],
            [-0.0028413, 0.0046261, 0.9245276],
        ];
        let m = cat_d65_to_aces();
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (m.m[i][j] - reference[i][j]).abs() < 1e-3,
                    "m[{i}][{j}] = {}",
                    m.m[i][j]
                );
            }
        }
    }

    #[test]
    fn test_xyz_d65_to_aces_rgb_sanity() {
        // D65 white through the fixed matrix lands close to RGB (1, 1, 1).
        let rgb = XYZ_D65_TO_ACES_RGB * Vec3::new(0.95047, 1.0, 1.08883);
        assert!((rgb.x - 1.0).abs() < 0.02);
        assert!((rgb.y - 1.0).abs() < 0.02);
        assert!((rgb.z - 1.0).abs() < 0.02);
    }
}
