//! Observer locations and the ephemeris boundary.
//!
//! Target selection needs altitude and azimuth for each catalog entry at a
//! given instant. That computation lives behind [`Ephemeris`]. The bundled
//! [`SiderealEphemeris`] is a low-precision horizon transform (mean
//! sidereal time, no precession, nutation or refraction), which is ample for
//! picking stars inside a tens-of-degrees altitude window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::CatalogEntry;
use crate::error::{ExerciseError, Result};
use crate::types::Target;

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// Geodetic observer position. Longitude is positive east.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
}

impl Location {
    /// Dragonfly site at New Mexico Skies: 32:54.0 N, 105:32.0 W, 2000 m.
    pub fn new_mexico_skies() -> Self {
        Self {
            latitude: 32.0 + 54.0 / 60.0,
            longitude: -(105.0 + 32.0 / 60.0),
            elevation: 2000.0,
        }
    }

    pub fn toronto() -> Self {
        Self {
            latitude: 43.6532,
            longitude: -79.3832,
            elevation: 76.0,
        }
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name {
            "NewMexicoSkies" => Ok(Self::new_mexico_skies()),
            "Toronto" => Ok(Self::toronto()),
            other => Err(ExerciseError::UnknownLocation(other.to_string())),
        }
    }
}

/// A location as written in the config file: a preset name or coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocationSpec {
    Preset(String),
    Coordinates(Location),
}

impl Default for LocationSpec {
    fn default() -> Self {
        LocationSpec::Preset("NewMexicoSkies".to_string())
    }
}

impl LocationSpec {
    pub fn resolve(&self) -> Result<Location> {
        match self {
            LocationSpec::Preset(name) => Location::preset(name),
            LocationSpec::Coordinates(loc) => {
                if !(-90.0..=90.0).contains(&loc.latitude) {
                    return Err(ExerciseError::InvalidConfig(format!(
                        "latitude {} is outside [-90, 90]",
                        loc.latitude
                    )));
                }
                Ok(loc.clone())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Ephemeris
// ---------------------------------------------------------------------------

/// Computes where a catalog object sits for an observer at an instant.
pub trait Ephemeris {
    fn observe(&self, entry: &CatalogEntry, location: &Location, time: DateTime<Utc>) -> Target;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SiderealEphemeris;

impl SiderealEphemeris {
    /// Greenwich mean sidereal time in degrees, [0, 360).
    pub fn gmst_degrees(time: DateTime<Utc>) -> f64 {
        let jd = julian_date(time);
        let d = jd - 2_451_545.0;
        let t = d / 36_525.0;
        let gmst = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
            - t * t * t / 38_710_000.0;
        gmst.rem_euclid(360.0)
    }

    /// Local sidereal time in degrees, [0, 360).
    pub fn lst_degrees(time: DateTime<Utc>, location: &Location) -> f64 {
        (Self::gmst_degrees(time) + location.longitude).rem_euclid(360.0)
    }
}

impl Ephemeris for SiderealEphemeris {
    fn observe(&self, entry: &CatalogEntry, location: &Location, time: DateTime<Utc>) -> Target {
        let lst = Self::lst_degrees(time, location);
        let ha_deg = (lst - entry.right_ascension).rem_euclid(360.0);

        let ha = ha_deg.to_radians();
        let dec = entry.declination.to_radians();
        let lat = location.latitude.to_radians();

        let sin_alt = dec.sin() * lat.sin() + dec.cos() * lat.cos() * ha.cos();
        let altitude = sin_alt.clamp(-1.0, 1.0).asin();

        // Azimuth measured from north through east.
        let y = -ha.sin() * dec.cos();
        let x = dec.sin() * lat.cos() - dec.cos() * lat.sin() * ha.cos();
        let azimuth = y.atan2(x).to_degrees().rem_euclid(360.0);

        let mut hour_angle = ha_deg / 15.0;
        if hour_angle > 12.0 {
            hour_angle -= 24.0;
        }

        Target {
            name: entry.name.clone(),
            altitude: altitude.to_degrees(),
            azimuth,
            right_ascension: entry.right_ascension,
            declination: entry.declination,
            hour_angle,
            local_sidereal_time: lst / 15.0,
            magnitude: entry.magnitude,
        }
    }
}

fn julian_date(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86_400.0 + 2_440_587.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(name: &str, ra: f64, dec: f64) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            right_ascension: ra,
            declination: dec,
            magnitude: 1.0,
        }
    }

    #[test]
    fn gmst_at_j2000_epoch() {
        let epoch = Utc.with_ymd_and_hms(2000, 1, 1, 12, 0, 0).unwrap();
        let gmst = SiderealEphemeris::gmst_degrees(epoch);
        assert!((gmst - 280.460_618_37).abs() < 1e-6, "gmst = {gmst}");
    }

    #[test]
    fn celestial_pole_sits_at_observer_latitude() {
        let loc = Location::new_mexico_skies();
        let pole = entry("pole", 0.0, 90.0);
        for hour in [0, 6, 13, 21] {
            let time = Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap();
            let t = SiderealEphemeris.observe(&pole, &loc, time);
            assert!((t.altitude - loc.latitude).abs() < 1e-6, "alt = {}", t.altitude);
            assert!(t.azimuth < 1e-6 || (360.0 - t.azimuth) < 1e-6);
        }
    }

    #[test]
    fn transiting_star_is_due_south() {
        let loc = Location::new_mexico_skies();
        let time = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        let lst = SiderealEphemeris::lst_degrees(time, &loc);
        // On the meridian, ten degrees south of the zenith.
        let star = entry("meridian", lst, loc.latitude - 10.0);
        let t = SiderealEphemeris.observe(&star, &loc, time);
        assert!((t.altitude - 80.0).abs() < 1e-6, "alt = {}", t.altitude);
        assert!((t.azimuth - 180.0).abs() < 1e-6, "az = {}", t.azimuth);
        assert!(t.hour_angle.abs() < 1e-6);
    }

    #[test]
    fn rising_star_is_in_the_east_with_negative_hour_angle() {
        let loc = Location::new_mexico_skies();
        let time = Utc.with_ymd_and_hms(2024, 6, 1, 6, 0, 0).unwrap();
        let lst = SiderealEphemeris::lst_degrees(time, &loc);
        let star = entry("rising", (lst + 45.0).rem_euclid(360.0), 0.0);
        let t = SiderealEphemeris.observe(&star, &loc, time);
        assert!((t.hour_angle + 3.0).abs() < 1e-6, "ha = {}", t.hour_angle);
        assert!(t.azimuth > 0.0 && t.azimuth < 180.0, "az = {}", t.azimuth);
    }

    #[test]
    fn presets_resolve_and_unknown_is_rejected() {
        assert_eq!(
            LocationSpec::default().resolve().unwrap(),
            Location::new_mexico_skies()
        );
        assert_eq!(Location::preset("Toronto").unwrap(), Location::toronto());
        let err = Location::preset("Atlantis").unwrap_err();
        assert!(matches!(err, ExerciseError::UnknownLocation(ref n) if n == "Atlantis"));
    }

    #[test]
    fn location_spec_accepts_name_or_coordinates() {
        let named: LocationSpec = serde_yaml::from_str("Toronto").unwrap();
        assert_eq!(named, LocationSpec::Preset("Toronto".into()));

        let coords: LocationSpec =
            serde_yaml::from_str("latitude: -30.2\nlongitude: -70.7\nelevation: 2200\n").unwrap();
        let loc = coords.resolve().unwrap();
        assert_eq!(loc.latitude, -30.2);
        assert_eq!(loc.elevation, 2200.0);

        let bad = LocationSpec::Coordinates(Location {
            latitude: 120.0,
            longitude: 0.0,
            elevation: 0.0,
        });
        assert!(bad.resolve().is_err());
    }
}
