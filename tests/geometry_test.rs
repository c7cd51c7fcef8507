//! Property-style sweeps over the scaling functions.

use clsrs::geometry::{scale_down, scale_down_fit_in, scale_down_to_fill};

const SOURCES: [(u32, u32); 10] = [
    (1920, 1080),
    (1080, 1920),
    (3840, 2160),
    (1280, 720),
    (640, 480),
    (4000, 3000),
    (5120, 1440),
    (1440, 5120),
    (333, 777),
    (7680, 4320),
];

#[test]
fn fill_never_undershoots_the_bound() {
    for &source in &SOURCES {
        for bound in [360u32, 720, 1080, 2160] {
            let scaled = scale_down_to_fill(source, bound, -1);
            let short_side = scaled.width.min(scaled.height);
            let source_short = source.0.min(source.1);

            if source_short <= bound {
                // unscaled, up to even rounding of the original
                assert_eq!(scaled.scale_coef, 1.0, "source {:?} bound {}", source, bound);
            } else {
                // the pinned side is exact; the other may round by one step
                assert!(
                    short_side >= bound - 2,
                    "source {:?} bound {} gave {:?}",
                    source,
                    bound,
                    scaled.size()
                );
            }
        }
    }
}

#[test]
fn fit_in_never_overshoots_the_bound() {
    for &source in &SOURCES {
        for bound in [720u32, 1280, 1920, 3840] {
            let scaled = scale_down_fit_in(source, bound, -1);
            if source.0.max(source.1) > bound {
                assert!(
                    scaled.width.max(scaled.height) <= bound + 2,
                    "source {:?} bound {} gave {:?}",
                    source,
                    bound,
                    scaled.size()
                );
            }
        }
    }
}

#[test]
fn aspect_ratio_survives_within_rounding() {
    for &source in &SOURCES {
        let scaled = scale_down(source, (1080, 1920), -1);
        let src_ar = source.0 as f64 / source.1 as f64;
        let out_ar = scaled.width as f64 / scaled.height as f64;
        let short = scaled.width.min(scaled.height) as f64;
        // even-rounding moves a side by at most 1 pixel
        let tolerance = src_ar * 2.5 / short;
        assert!(
            (src_ar - out_ar).abs() <= tolerance,
            "source {:?} -> {:?}: {} vs {}",
            source,
            scaled.size(),
            src_ar,
            out_ar
        );
    }
}

#[test]
fn combined_policy_respects_both_bounds() {
    for &source in &SOURCES {
        let scaled = scale_down(source, (1080, 1920), -1);
        assert!(
            scaled.width.max(scaled.height) <= 1920 + 2,
            "source {:?} gave {:?}",
            source,
            scaled.size()
        );
    }
}

#[test]
fn even_rounding_for_codec_alignment() {
    for &source in &SOURCES {
        let scaled = scale_down(source, (1080, 1920), -1);
        // the computed (non-pinned) side lands on the even grid
        assert!(
            scaled.width % 2 == 0 || scaled.height % 2 == 0,
            "source {:?} gave {:?}",
            source,
            scaled.size()
        );
    }
}
