mod common;

use approx::assert_abs_diff_eq;
use insardine::{Baseline, BaselineQuantity, Point};

fn model(offset: Point) -> Baseline {
    let image = common::test_image();
    Baseline::model(&image, &image, &common::master_orbit(), &common::slave_orbit(offset))
        .expect("baseline model")
}

#[test]
fn test_horizontal_baseline_model_vs_exact() {
    common::init_logging();

    let baseline = model(Point::new(0.0, 200.0, 0.0));
    println!("=== Horizontal 200 m baseline ===");
    println!("  max Bperp residual: {:.4e} m", baseline.max_bperp_residual());
    assert!(baseline.max_bperp_residual() < 0.05);

    let samples = [(11111.0, 111.0), (12000.0, 14000.0), (5000.0, 20000.0), (18000.0, 3000.0)];
    for &(line, pixel) in &samples {
        let modelled = baseline.dump(line, pixel, 0.0);
        let exact = baseline.exact(line, pixel, 0.0).expect("exact baseline");

        println!(
            "  ({}, {}): Bperp {:.3} / {:.3}, Bpar {:.3} / {:.3}, hAmb {:.3} / {:.3}",
            line,
            pixel,
            modelled.bperp,
            exact.bperp,
            modelled.bpar,
            exact.bpar,
            modelled.hamb,
            exact.hamb
        );

        assert_abs_diff_eq!(modelled.bperp, exact.bperp, epsilon = 0.05);
        assert_abs_diff_eq!(modelled.bpar, exact.bpar, epsilon = 0.5);
        assert_abs_diff_eq!(modelled.hamb, exact.hamb, epsilon = 0.5);

        assert!(modelled.bperp > 0.0);
        assert!(modelled.alpha.abs() < 1e-2);
        assert_abs_diff_eq!(modelled.bhor, 200.0, epsilon = 0.5);
        assert!(modelled.bvert.abs() < 0.5);
        assert!(modelled.hamb < 0.0, "height of ambiguity should be negative");

        assert_eq!(modelled.bperp, baseline.get_bperp(line, pixel));
        assert_eq!(modelled.hamb, baseline.get_hamb(line, pixel));
    }
}

#[test]
fn test_bperp_is_continuous() {
    let baseline = model(Point::new(0.0, 200.0, 0.0));

    assert!((baseline.get_bperp(11111.0, 111.0) - baseline.get_bperp(11112.0, 112.0)).abs() < 0.01);

    // no jumps anywhere along a diagonal through the image
    let mut previous = baseline.get_bperp(1.0, 1.0);
    for step in 1..=1000 {
        let line = 1.0 + 20.0 * step as f64;
        let pixel = 1.0 + 25.0 * step as f64;
        let bperp = baseline.get_bperp(line, pixel);
        let jump = bperp - previous;
        assert!(jump.abs() < 0.05, "jump of {} m at ({}, {})", jump, line, pixel);
        previous = bperp;
    }
}

#[test]
fn test_vertical_baseline() {
    let baseline = model(Point::new(200.0, 0.0, 0.0));

    let c = baseline.dump(10001.0, 12500.0, 0.0);
    println!("=== Vertical 200 m baseline: {:?}", c);

    assert_abs_diff_eq!(c.alpha, std::f64::consts::FRAC_PI_2, epsilon = 1e-2);
    assert_abs_diff_eq!(c.bvert, 200.0, epsilon = 0.5);
    assert!(c.bhor.abs() < 2.0);
    assert!(c.bpar < 0.0);
    assert!(c.bperp > 0.0);
    assert!(c.hamb < 0.0);
}

#[test]
fn test_baseline_sign_flips_with_side() {
    let baseline = model(Point::new(0.0, -150.0, 0.0));

    let c = baseline.dump(10001.0, 12500.0, 0.0);
    assert!(c.bperp < 0.0);
    assert!(c.hamb > 0.0);
    assert_abs_diff_eq!(c.bhor, -150.0, epsilon = 0.5);
    assert!(c.bvert.abs() < 0.5);
}

#[test]
fn test_model_is_deterministic() {
    let first = model(Point::new(0.0, 200.0, 0.0));
    let second = model(Point::new(0.0, 200.0, 0.0));
    assert_eq!(first.bperp_coeffs(), second.bperp_coeffs());

    let lines = [1.0, 5000.0, 10001.0, 20001.0];
    let pixels = [1.0, 12500.0, 25000.0];
    let grid = first.evaluate_grid(BaselineQuantity::Perpendicular, &lines, &pixels);
    assert_eq!(grid.dim(), (4, 3));
    for (i, &l) in lines.iter().enumerate() {
        for (j, &p) in pixels.iter().enumerate() {
            assert_eq!(grid[[i, j]], second.get_bperp(l, p));
        }
    }

    let hamb = first.evaluate_grid(BaselineQuantity::HeightAmbiguity, &lines, &pixels);
    assert!(hamb.iter().all(|&h| h < 0.0));
}

#[test]
fn test_height_dependence() {
    let baseline = model(Point::new(0.0, 200.0, 0.0));

    let low = baseline.get_bperp_3d(10001.0, 12500.0, 0.0);
    let high = baseline.get_bperp_3d(10001.0, 12500.0, 4000.0);
    let exact_high = baseline.exact(10001.0, 12500.0, 4000.0).expect("exact");
    assert_ne!(low, high);
    assert_abs_diff_eq!(high, exact_high.bperp, epsilon = 0.05);
    assert_abs_diff_eq!(
        baseline.get_theta_inc_point(&Point::new(12500.0, 10001.0, 4000.0)),
        exact_high.theta_inc,
        epsilon = 1e-3
    );
}
