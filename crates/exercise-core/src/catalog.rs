use crate::error::{ExerciseError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A fixed object with J2000 equatorial coordinates in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(alias = "ra")]
    pub right_ascension: f64,
    #[serde(alias = "dec")]
    pub declination: f64,
    #[serde(default, alias = "mag")]
    pub magnitude: f64,
}

/// Bright navigation stars: name, RA (deg), Dec (deg), V magnitude.
const BRIGHT_STARS: &[(&str, f64, f64, f64)] = &[
    ("Sirius", 101.2872, -16.7161, -1.46),
    ("Canopus", 95.9880, -52.6957, -0.74),
    ("Arcturus", 213.9153, 19.1824, -0.05),
    ("Vega", 279.2347, 38.7837, 0.03),
    ("Capella", 79.1723, 45.9980, 0.08),
    ("Rigel", 78.6345, -8.2016, 0.13),
    ("Procyon", 114.8255, 5.2250, 0.34),
    ("Betelgeuse", 88.7929, 7.4071, 0.42),
    ("Achernar", 24.4285, -57.2368, 0.46),
    ("Altair", 297.6958, 8.8683, 0.76),
    ("Aldebaran", 68.9802, 16.5093, 0.86),
    ("Antares", 247.3519, -26.4320, 0.96),
    ("Spica", 201.2983, -11.1613, 0.97),
    ("Pollux", 116.3290, 28.0262, 1.14),
    ("Fomalhaut", 344.4127, -29.6222, 1.16),
    ("Deneb", 310.3580, 45.2803, 1.25),
    ("Regulus", 152.0930, 11.9672, 1.40),
    ("Adhara", 104.6565, -28.9721, 1.50),
    ("Castor", 113.6494, 31.8883, 1.58),
    ("Shaula", 263.4022, -37.1038, 1.62),
    ("Bellatrix", 81.2828, 6.3497, 1.64),
    ("Elnath", 81.5730, 28.6074, 1.65),
    ("Alnilam", 84.0534, -1.2019, 1.69),
    ("Alioth", 193.5073, 55.9598, 1.76),
    ("Alnitak", 85.1897, -1.9426, 1.77),
    ("Dubhe", 165.9320, 61.7510, 1.79),
    ("Mirfak", 51.0807, 49.8612, 1.79),
    ("Alkaid", 206.8852, 49.3133, 1.86),
    ("Menkalinan", 89.8822, 44.9474, 1.90),
    ("Alhena", 99.4280, 16.3993, 1.92),
    ("Polaris", 37.9546, 89.2641, 1.98),
    ("Hamal", 31.7934, 23.4624, 2.00),
    ("Mizar", 200.9814, 54.9254, 2.04),
    ("Alpheratz", 2.0969, 29.0904, 2.06),
    ("Rasalhague", 263.7336, 12.5600, 2.08),
    ("Kochab", 222.6764, 74.1555, 2.08),
    ("Denebola", 177.2649, 14.5721, 2.13),
    ("Eltanin", 269.1516, 51.4889, 2.23),
    ("Alphecca", 233.6720, 26.7147, 2.23),
    ("Schedar", 10.1268, 56.5373, 2.24),
    ("Caph", 2.2945, 59.1498, 2.28),
    ("Enif", 326.0465, 9.8750, 2.38),
    ("Markab", 346.1902, 15.2053, 2.48),
];

/// Read-only list of candidate targets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn bright_stars() -> Self {
        let entries = BRIGHT_STARS
            .iter()
            .map(|&(name, ra, dec, mag)| CatalogEntry {
                name: name.to_string(),
                right_ascension: ra,
                declination: dec,
                magnitude: mag,
            })
            .collect();
        Self { entries }
    }

    /// Load a catalog file.
    ///
    /// `.yaml`/`.yml` files hold full entries. Anything else is a list of
    /// star names, one per line, looked up in the built-in catalog; blank
    /// lines and `#` comments are ignored.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&data),
            _ => Self::from_names(&data, &Self::bright_stars()),
        }
    }

    pub fn from_yaml(data: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_yaml::from_str(data)?;
        Ok(Self { entries })
    }

    pub fn from_names(data: &str, reference: &Catalog) -> Result<Self> {
        let entries = data
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(|name| {
                reference
                    .find(name)
                    .cloned()
                    .ok_or_else(|| ExerciseError::UnknownStar(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Case-insensitive lookup by name.
    pub fn find(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
