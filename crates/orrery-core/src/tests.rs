use crate::constants::*;
use crate::coordinates::*;
use glam::DVec3;

#[test]
fn test_cartesian_to_spherical_roundtrip() {
    let positions = [
        DVec3::new(1.0, 0.0, 0.0),
        DVec3::new(0.0, 1.0, 0.0),
        DVec3::new(0.0, 0.0, 1.0),
        DVec3::new(1.0, 1.0, 1.0),
        from_au(1.0, 0.0, 0.0),
        from_au(5.2, 0.3, -0.1),
    ];

    for pos in positions {
        let spherical = SphericalPosition::from_cartesian(pos);
        let back = spherical.to_cartesian();

        let tolerance = pos.length() * 1e-10; // Relative tolerance
        assert!((pos.x - back.x).abs() < tolerance, "x mismatch");
        assert!((pos.y - back.y).abs() < tolerance, "y mismatch");
        assert!((pos.z - back.z).abs() < tolerance, "z mismatch");
    }
}

#[test]
fn test_vernal_equinox_direction() {
    // The +x ecliptic axis is the vernal equinox: RA 0, Dec 0
    let eq = EquatorialCoordinate::from_ecliptic(DVec3::X * AU);
    assert!(eq.ra.abs() < 1e-12 || (eq.ra - std::f64::consts::TAU).abs() < 1e-12);
    assert!(eq.dec.abs() < 1e-12);
}

#[test]
fn test_ecliptic_pole_declination() {
    // North ecliptic pole sits at RA 18h, Dec 90° - ε
    let eq = EquatorialCoordinate::from_ecliptic(DVec3::Z);
    assert!((eq.ra.to_degrees() - 270.0).abs() < 1e-9, "ra = {}", eq.ra.to_degrees());
    assert!((eq.dec - (std::f64::consts::FRAC_PI_2 - OBLIQUITY_J2000)).abs() < 1e-12);
}

#[test]
fn test_equatorial_roundtrip() {
    for (ra, dec) in [(0.3, 0.2), (4.0, -1.1), (6.0, 1.5)] {
        let eq = EquatorialCoordinate { ra, dec };
        let back = EquatorialCoordinate::from_ecliptic(eq.to_ecliptic());
        assert!((back.ra - ra).abs() < 1e-10);
        assert!((back.dec - dec).abs() < 1e-10);
    }
}

#[test]
fn test_horizontal_zenith_and_north() {
    let up = DVec3::X;
    let pole = DVec3::Z;

    let zenith = HorizontalCoordinate::from_vector(DVec3::X * 5.0, up, pole).unwrap();
    assert!((zenith.altitude - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

    // Toward the pole from the equator is due north on the horizon
    let north = HorizontalCoordinate::from_vector(DVec3::Z, up, pole).unwrap();
    assert!(north.altitude.abs() < 1e-12);
    assert!(north.azimuth.abs() < 1e-12 || (north.azimuth - std::f64::consts::TAU).abs() < 1e-12);

    // East is pole × up
    let east = HorizontalCoordinate::from_vector(DVec3::Y, up, pole).unwrap();
    assert!((east.azimuth - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
}

#[test]
fn test_horizontal_roundtrip() {
    let up = DVec3::new(0.3, -0.8, 0.2);
    let pole = DVec3::new(0.1, 0.2, 1.0);
    let hz = HorizontalCoordinate { azimuth: 2.2, altitude: 0.4 };
    let v = hz.to_vector(up, pole).unwrap();
    let back = HorizontalCoordinate::from_vector(v, up, pole).unwrap();
    assert!((back.azimuth - hz.azimuth).abs() < 1e-10);
    assert!((back.altitude - hz.altitude).abs() < 1e-10);
}

#[test]
fn test_horizontal_undefined_at_pole() {
    assert!(HorizontalCoordinate::from_vector(DVec3::X, DVec3::Z, DVec3::Z).is_none());
}
