//! Vendor identification from a manufacturer string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Normalized vendor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Huawei,
    Mellanox,
    Depo,
    /// Cisco and anything unrecognised.
    Cisco,
}

/// Substrings tried, in order, against the lowercased manufacturer name.
const MANUFACTURER_HINTS: &[(&str, Vendor)] = &[
    ("huawei", Vendor::Huawei),
    ("mellanox", Vendor::Mellanox),
    ("depo", Vendor::Depo),
    ("cisco", Vendor::Cisco),
];

impl Vendor {
    /// Detect the vendor family by case-insensitive substring match.
    ///
    /// Unmatched manufacturers fall back to [`Vendor::Cisco`].
    pub fn detect(manufacturer: &str) -> Self {
        let manufacturer = manufacturer.to_lowercase();
        MANUFACTURER_HINTS
            .iter()
            .find(|(hint, _)| manufacturer.contains(hint))
            .map(|&(_, vendor)| vendor)
            .unwrap_or(Vendor::Cisco)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Huawei => "huawei",
            Vendor::Mellanox => "mellanox",
            Vendor::Depo => "depo",
            Vendor::Cisco => "cisco",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_known_vendors() {
        assert_eq!(Vendor::detect("Huawei Technologies"), Vendor::Huawei);
        assert_eq!(Vendor::detect("NVIDIA Mellanox"), Vendor::Mellanox);
        assert_eq!(Vendor::detect("DEPO Computers"), Vendor::Depo);
        assert_eq!(Vendor::detect("Cisco Systems"), Vendor::Cisco);
    }

    #[test]
    fn test_unknown_falls_back_to_cisco() {
        assert_eq!(Vendor::detect("Arista Networks"), Vendor::Cisco);
        assert_eq!(Vendor::detect(""), Vendor::Cisco);
    }
}
