mod common;

use approx::assert_abs_diff_eq;
use insardine::{Geodetic, Point, WGS84};

#[test]
fn test_geocoding_closed_loop() {
    common::init_logging();

    let orbit = common::master_orbit();
    let image = common::test_image();

    println!("=== Geocoding closed loop: xyz -> t -> line/pixel -> xyz ===");
    let targets = [
        Geodetic::from_degrees(0.2, 3.0, 0.0),
        Geodetic::from_degrees(0.1, 2.8, 0.0),
        Geodetic::from_degrees(0.3, 3.2, 0.0),
        Geodetic::from_degrees(0.25, 3.1, 1200.0),
    ];

    for geo in &targets {
        let xyz = WGS84.ell2xyz(geo);

        let radar = orbit.xyz2lp(&xyz, &image).expect("xyz2lp");
        assert!(radar.converged, "xyz2lp did not converge for {:?}", geo);
        let (pixel, line) = (radar.value.x, radar.value.y);

        let back = orbit
            .lph2xyz(line, pixel, geo.height, &image)
            .expect("lph2xyz")
            .into_result()
            .expect("lph2xyz converged");
        let error = back.distance(&xyz);

        println!(
            "  {:?} -> line {:.3}, pixel {:.3} -> error {:.3e} m",
            geo.to_degrees(),
            line,
            pixel,
            error
        );
        assert!(error < 1e-3, "closed loop error {} m", error);
    }
}

#[test]
fn test_scene_centre_radar_coordinates() {
    let orbit = common::master_orbit();
    let image = common::test_image();

    let radar = orbit
        .ell2lp(&image.scene_centre, &image)
        .expect("ell2lp")
        .into_result()
        .expect("converged");

    assert_abs_diff_eq!(radar.y, 13277.75, epsilon = 0.5);
    assert_abs_diff_eq!(radar.x, 14489.47, epsilon = 0.5);

    let times = orbit
        .xyz2t(&image.approx_xyz_centre(&WGS84), &image)
        .expect("xyz2t")
        .value();
    let slant_range = insardine::SOL * times.range_time / 2.0;
    assert_abs_diff_eq!(slant_range, image.pix2range(radar.x), epsilon = 1e-6);
    assert!((780_000.0..786_000.0).contains(&slant_range));
}

#[test]
fn test_height_is_respected() {
    let orbit = common::master_orbit();
    let image = common::test_image();

    let geo = orbit.lph2ell(13000.0, 14000.0, 1500.0, &image).expect("lph2ell");
    assert!(geo.converged);
    assert!(geo.iterations <= insardine::core::MAX_ITERATIONS);
    assert_abs_diff_eq!(geo.value.height, 1500.0, epsilon = 1e-3);

    let on_ellipsoid = orbit.lp2ell(13000.0, 14000.0, &image).expect("lp2ell").value();
    assert_abs_diff_eq!(on_ellipsoid.height, 0.0, epsilon = 1e-3);

    // same satellite and slant range: the raised target sits farther from the ground track
    assert!(geo.value.lambda > on_ellipsoid.lambda);

    let satellite = orbit.get_xyz(image.line2ta(13000.0));
    let high = orbit.lph2xyz(13000.0, 14000.0, 1500.0, &image).expect("lph2xyz").value();
    let low = orbit.lp2xyz(13000.0, 14000.0, &image).expect("lp2xyz").value();
    assert_abs_diff_eq!(high.distance(&satellite), image.pix2range(14000.0), epsilon = 1e-3);
    assert_abs_diff_eq!(low.distance(&satellite), image.pix2range(14000.0), epsilon = 1e-3);
}

#[test]
fn test_lp2xyz_distinct_points() {
    let orbit = common::master_orbit();
    let image = common::test_image();

    let p11 = orbit.lp2xyz(1.0, 1.0, &image).expect("lp2xyz").value();
    let p22 = orbit.lp2xyz(2.0, 2.0, &image).expect("lp2xyz").value();
    assert_ne!(p11, p22);
    // one line and one pixel apart: metres, not kilometres
    assert!(p11.distance(&p22) < 20.0);
}

#[test]
fn test_lp2orb_is_satellite_at_line_time() {
    let orbit = common::master_orbit();
    let image = common::test_image();

    let line = 7000.0;
    let sat = orbit.lp2orb(line, 9000.0, &image).expect("lp2orb");
    assert!(sat.converged);
    assert!(sat.value.distance(&orbit.get_xyz(image.line2ta(line))) < 1e-3);
}

#[test]
fn test_ellipsoid_round_trip() {
    let samples = [
        (0.2, 3.0, 0.0),
        (45.0, 7.0, 350.0),
        (-70.0, -120.0, 2500.0),
        (89.5, 45.0, 10.0),
    ];
    for &(lat, lon, h) in &samples {
        let geo = Geodetic::from_degrees(lat, lon, h);
        let xyz = WGS84.ell2xyz(&geo);
        let back = WGS84.xyz2ell(&xyz);
        assert_abs_diff_eq!(back.phi, geo.phi, epsilon = 1e-6);
        assert_abs_diff_eq!(back.lambda, geo.lambda, epsilon = 1e-6);
        assert_abs_diff_eq!(back.height, geo.height, epsilon = 1e-3);
        assert!(WGS84.ell2xyz(&back).distance(&xyz) < 1e-3);
    }
}

#[test]
fn test_shared_orbit_across_threads() {
    let orbit = common::master_orbit();
    let image = common::test_image();

    let lines = [2000.0, 6000.0, 10000.0, 14000.0, 18000.0];
    let sequential: Vec<Point> = lines
        .iter()
        .map(|&l| orbit.lp2xyz(l, 12000.0, &image).expect("lp2xyz").value())
        .collect();

    let threaded: Vec<Point> = std::thread::scope(|scope| {
        let handles: Vec<_> = lines
            .iter()
            .map(|&l| {
                let (orbit, image) = (&orbit, &image);
                scope.spawn(move || orbit.lp2xyz(l, 12000.0, image).expect("lp2xyz").value())
            })
            .collect();
        handles.into_iter().map(|h| h.join().expect("worker")).collect()
    });

    assert_eq!(sequential, threaded);
}
