//! Property tests for the affine transform: inversion round trips and
//! decompose/recompose in the canonical translate → rotate → skew → scale
//! order.

use proptest::prelude::*;
use strata_core::kurbo::Point;
use strata_core::settings;
use strata_core::transform::Transform;

const EPS: f64 = 1e-6;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPS * (1.0 + a.abs().max(b.abs()))
}

fn invertible() -> impl Strategy<Value = Transform> {
    (
        -500.0..500.0f64,
        -500.0..500.0f64,
        -3.0..3.0f64,
        0.1..8.0f64,
        0.1..8.0f64,
        -1.5..1.5f64,
    )
        .prop_map(|(x, y, rot, sx, sy, kx)| {
            let mut t = Transform::IDENTITY;
            t.translate(x, y).rotate(rot).skew(kx, 0.0).scale(sx, sy);
            t
        })
}

proptest! {
    #[test]
    fn double_invert_is_identity(t in invertible()) {
        let mut twice = t.copy();
        twice.invert().invert();
        for (a, b) in twice.m.iter().zip(t.m.iter()) {
            prop_assert!(close(*a, *b), "{:?} vs {:?}", twice.m, t.m);
        }
    }

    #[test]
    fn inverse_maps_points_back(t in invertible(), px in -1000.0..1000.0f64, py in -1000.0..1000.0f64) {
        let p = Point::new(px, py);
        let inv = t.try_invert().expect("strategy only yields invertible matrices");
        let back = inv.point(t.point(p));
        prop_assert!(close(back.x, p.x) && close(back.y, p.y), "{back:?} vs {p:?}");
    }

    #[test]
    fn decompose_recovers_components(
        x in -500.0..500.0f64,
        y in -500.0..500.0f64,
        rot in -3.0..3.0f64,
        sx in 0.1..8.0f64,
        sy in 0.1..8.0f64,
        kx in -1.5..1.5f64,
    ) {
        let mut t = Transform::IDENTITY;
        t.translate(x, y).rotate(rot).skew(kx, 0.0).scale(sx, sy);
        let d = t.decompose();
        let rotation = settings::angle_unit().to_radians(d.rotation);

        prop_assert!(close(d.x, x) && close(d.y, y));
        prop_assert!(close(rotation, rot), "rotation {rotation} vs {rot}");
        prop_assert!(close(d.scale_x, sx), "scale_x {} vs {sx}", d.scale_x);
        prop_assert!(close(d.scale_y, sy), "scale_y {} vs {sy}", d.scale_y);
        prop_assert!(close(d.skew_x, kx), "skew_x {} vs {kx}", d.skew_x);
        prop_assert_eq!(d.skew_y, 0.0);
    }
}
