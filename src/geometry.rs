//! Integer frame geometry.
//!
//! Pure functions computing target dimensions from a source size, a size
//! constraint, and a rounding precision. Aspect ratio is preserved up to
//! integer rounding; negative precisions round to multiples of a power of
//! two, which is how codec macroblock alignment requirements are satisfied
//! (precision -1 keeps sides even).

/// A scaled frame size together with the coefficient that produced it.
///
/// `scale_coef` is 1.0 when the source was not scaled, and greater than 1.0
/// otherwise (source side / bound).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaled {
    pub width: u32,
    pub height: u32,
    pub scale_coef: f64,
}

impl Scaled {
    /// The size as a (width, height) pair.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// Round to a power-of-two grid.
///
/// `precision > 0` rounds to 1/2^precision, `precision < 0` rounds to the
/// nearest multiple of 2^|precision|, `precision == 0` rounds to the
/// nearest integer.
pub fn bit_round(number: f64, precision: i32) -> f64 {
    if precision == 0 {
        return number.round();
    }
    let scale = 2f64.powi(precision.abs());
    if precision > 0 {
        (number * scale).round() / scale
    } else {
        (number / scale).round() * scale
    }
}

fn it_fits_in(value: u32, limit: u32) -> bool {
    value <= limit
}

fn rounded(value: f64, precision: i32) -> u32 {
    bit_round(value, precision) as u32
}

/// Scale down so the shorter side becomes exactly `min_size`.
///
/// If the shorter side is already within `min_size` the source size is
/// returned (rounded to the requested precision) with a coefficient of 1.
pub fn scale_down_to_fill(source_size: (u32, u32), min_size: u32, precision: i32) -> Scaled {
    let (width_orig, height_orig) = source_size;

    if height_orig <= width_orig {
        // landscape or square
        if it_fits_in(height_orig, min_size) {
            Scaled {
                width: rounded(width_orig as f64, precision),
                height: rounded(height_orig as f64, precision),
                scale_coef: 1.0,
            }
        } else {
            let scale_coef = height_orig as f64 / min_size as f64;
            Scaled {
                width: rounded(width_orig as f64 / scale_coef, precision),
                height: min_size,
                scale_coef,
            }
        }
    } else {
        if it_fits_in(width_orig, min_size) {
            Scaled {
                width: rounded(width_orig as f64, precision),
                height: rounded(height_orig as f64, precision),
                scale_coef: 1.0,
            }
        } else {
            let scale_coef = width_orig as f64 / min_size as f64;
            Scaled {
                width: min_size,
                height: rounded(height_orig as f64 / scale_coef, precision),
                scale_coef,
            }
        }
    }
}

/// Scale down so the longer side becomes exactly `max_size`.
///
/// If the longer side is already within `max_size` the source size is
/// returned (rounded to the requested precision) with a coefficient of 1.
pub fn scale_down_fit_in(source_size: (u32, u32), max_size: u32, precision: i32) -> Scaled {
    let (width_orig, height_orig) = source_size;

    if height_orig <= width_orig {
        if it_fits_in(width_orig, max_size) {
            Scaled {
                width: rounded(width_orig as f64, precision),
                height: rounded(height_orig as f64, precision),
                scale_coef: 1.0,
            }
        } else {
            let scale_coef = width_orig as f64 / max_size as f64;
            Scaled {
                width: max_size,
                height: rounded(height_orig as f64 / scale_coef, precision),
                scale_coef,
            }
        }
    } else {
        if it_fits_in(height_orig, max_size) {
            Scaled {
                width: rounded(width_orig as f64, precision),
                height: rounded(height_orig as f64, precision),
                scale_coef: 1.0,
            }
        } else {
            let scale_coef = height_orig as f64 / max_size as f64;
            Scaled {
                width: rounded(width_orig as f64 / scale_coef, precision),
                height: max_size,
                scale_coef,
            }
        }
    }
}

fn size_fills_in(current: (u32, u32), bound: (u32, u32)) -> bool {
    current.0 <= bound.0 && current.1 <= bound.1
}

/// Scale down to satisfy both a minimum-quality floor and a maximum-size
/// ceiling.
///
/// The fill result (shorter side pinned to `min_size`) wins when it also
/// fits the `max_size` ceiling on the longer side; otherwise the fit-in
/// result applies.
pub fn scale_down(source_size: (u32, u32), size_limit: (u32, u32), precision: i32) -> Scaled {
    let (width_orig, height_orig) = source_size;
    let (min_size, max_size) = size_limit;

    let filled = scale_down_to_fill(source_size, min_size, precision);

    let fills_in = if height_orig <= width_orig {
        size_fills_in(filled.size(), (max_size, min_size))
    } else {
        size_fills_in(filled.size(), (min_size, max_size))
    };

    if fills_in {
        filled
    } else {
        scale_down_fit_in(source_size, max_size, precision)
    }
}

/// Paired DASH tier sizes: the low tier and the high tier it was derived
/// from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashTierSizes {
    pub large: (u32, u32),
    pub small: (u32, u32),
}

impl DashTierSizes {
    /// Whether the two tiers collapsed to a single rendition.
    pub fn collapsed(&self) -> bool {
        self.large == self.small
    }
}

/// Compute the paired tier sizes for a two-rung DASH encode.
///
/// The small tier fill-scales the shorter side to `min_size`; the large
/// tier is recovered by re-multiplying the small tier with the scale
/// coefficient rounded at decreasing bit precision until the aspect ratio
/// of the recovered size matches the small tier exactly. A coefficient
/// that rounds back to 1 degrades to the unscaled (precision-rounded)
/// source size for both tiers.
pub fn dash_tier_sizes(source_size: (u32, u32), min_size: u32, precision: i32) -> DashTierSizes {
    let filled = scale_down_to_fill(source_size, min_size, precision);

    if filled.scale_coef == 1.0 {
        return DashTierSizes {
            large: filled.size(),
            small: filled.size(),
        };
    }

    let small = filled.size();
    let aspect_ratio = small.0 as f64 / small.1 as f64;

    let scale_size = |scale: f64| -> (u32, u32) {
        (
            (small.0 as f64 * scale).round() as u32,
            (small.1 as f64 * scale).round() as u32,
        )
    };

    let mut scale_precision = 6;
    let mut rounded_coef = filled.scale_coef;
    let mut large = scale_size(rounded_coef);

    while large.1 != 0 && large.0 as f64 / large.1 as f64 != aspect_ratio {
        scale_precision -= 1;
        rounded_coef = bit_round(filled.scale_coef, scale_precision);
        if rounded_coef <= 1.0 {
            break;
        }
        large = scale_size(rounded_coef);
    }

    if rounded_coef <= 1.0 {
        let fallback = (
            rounded(source_size.0 as f64, precision),
            rounded(source_size.1 as f64, precision),
        );
        return DashTierSizes {
            large: fallback,
            small: fallback,
        };
    }

    DashTierSizes { large, small }
}

/// Halve a frame rate until it is within `limit`.
///
/// Returns the limited rate and whether the source rate was already valid.
pub fn limit_fps(fps: f64, limit: f64) -> (f64, bool) {
    let mut fps = fps;
    let valid = fps <= limit;
    while fps > limit {
        fps /= 2.0;
    }
    (fps, valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_round() {
        assert_eq!(bit_round(1279.6, 0), 1280.0);
        // precision -1: nearest even
        assert_eq!(bit_round(1279.0, -1), 1280.0);
        assert_eq!(bit_round(1277.0, -1), 1276.0);
        // precision -2: nearest multiple of 4
        assert_eq!(bit_round(1278.0, -2), 1280.0);
        // positive precision: fractional grid
        assert_eq!(bit_round(1.26, 2), 1.25);
    }

    #[test]
    fn test_scale_down_to_fill_landscape() {
        // shorter side 1080 > 720 -> coef 1.5 -> width 1280
        let scaled = scale_down_to_fill((1920, 1080), 720, -1);
        assert_eq!(scaled.size(), (1280, 720));
        assert_eq!(scaled.scale_coef, 1.5);
    }

    #[test]
    fn test_scale_down_to_fill_portrait() {
        let scaled = scale_down_to_fill((1080, 1920), 720, -1);
        assert_eq!(scaled.size(), (720, 1280));
        assert_eq!(scaled.scale_coef, 1.5);
    }

    #[test]
    fn test_scale_down_to_fill_already_small() {
        let scaled = scale_down_to_fill((640, 360), 720, -1);
        assert_eq!(scaled.size(), (640, 360));
        assert_eq!(scaled.scale_coef, 1.0);
    }

    #[test]
    fn test_scale_down_fit_in() {
        let scaled = scale_down_fit_in((3840, 2160), 1920, -1);
        assert_eq!(scaled.size(), (1920, 1080));
        assert_eq!(scaled.scale_coef, 2.0);

        let unscaled = scale_down_fit_in((1280, 720), 1920, -1);
        assert_eq!(unscaled.size(), (1280, 720));
        assert_eq!(unscaled.scale_coef, 1.0);
    }

    #[test]
    fn test_scale_down_prefers_fill() {
        // 16:9 source: filling min side 1080 lands inside the 1920 ceiling
        let scaled = scale_down((3840, 2160), (1080, 1920), -1);
        assert_eq!(scaled.size(), (1920, 1080));
    }

    #[test]
    fn test_scale_down_falls_back_to_fit() {
        // ultrawide: filling the short side would leave the long side
        // beyond the ceiling
        let scaled = scale_down((5120, 1440), (1080, 1920), -1);
        assert_eq!(scaled.width, 1920);
        assert!(scaled.height <= 1080);
    }

    #[test]
    fn test_aspect_ratio_preserved_within_rounding() {
        let source = (1919, 1079);
        let scaled = scale_down_to_fill(source, 720, -1);
        let src_ar = source.0 as f64 / source.1 as f64;
        let out_ar = scaled.width as f64 / scaled.height as f64;
        // one even-rounding step of slack on a 720-tall frame
        assert!((src_ar - out_ar).abs() < 2.0 / 720.0 * src_ar);
    }

    #[test]
    fn test_dash_tier_sizes_paired() {
        let tiers = dash_tier_sizes((1920, 1080), 720, -1);
        assert_eq!(tiers.small, (1280, 720));
        assert_eq!(tiers.large, (1920, 1080));
        assert!(!tiers.collapsed());
    }

    #[test]
    fn test_dash_tier_sizes_collapse_when_small() {
        let tiers = dash_tier_sizes((960, 540), 720, -1);
        assert_eq!(tiers.small, (960, 540));
        assert!(tiers.collapsed());
    }

    #[test]
    fn test_limit_fps() {
        assert_eq!(limit_fps(24.0, 30.0), (24.0, true));
        assert_eq!(limit_fps(60.0, 30.0), (30.0, false));
        assert_eq!(limit_fps(100.0, 30.0), (25.0, false));
    }
}
