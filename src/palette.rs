use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }

    /// Parse `#rrggbb` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Rgb(r, g, b))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Perceptually uniform color ramps
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Palette {
    Viridis,
    Magma,
}

const VIRIDIS: [(u8, u8, u8); 9] = [
    (68, 1, 84),
    (71, 44, 122),
    (59, 81, 139),
    (44, 113, 142),
    (33, 144, 141),
    (39, 173, 129),
    (92, 200, 99),
    (170, 220, 50),
    (253, 231, 37),
];

const MAGMA: [(u8, u8, u8); 9] = [
    (0, 0, 4),
    (28, 16, 68),
    (79, 18, 123),
    (129, 37, 129),
    (181, 54, 122),
    (229, 80, 100),
    (251, 135, 97),
    (254, 194, 135),
    (252, 253, 191),
];

impl Palette {
    fn anchors(self) -> &'static [(u8, u8, u8)] {
        match self {
            Palette::Viridis => &VIRIDIS,
            Palette::Magma => &MAGMA,
        }
    }

    /// Sample the ramp at `t` in [0, 1]
    pub fn at(self, t: f64) -> Rgb {
        let c = self.anchors();
        let t = t.clamp(0.0, 1.0);
        let x = t * (c.len() - 1) as f64;
        let i = x.floor() as usize;
        if i >= c.len() - 1 {
            let (r, g, b) = c[c.len() - 1];
            return Rgb(r, g, b);
        }
        let f = x - i as f64;
        let (r0, g0, b0) = c[i];
        let (r1, g1, b1) = c[i + 1];
        let lerp = |a: u8, b: u8| (a as f64 + f * (b as f64 - a as f64)).round() as u8;
        Rgb(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
    }

    /// `n` evenly spaced colors from the dark end to the light end,
    /// or light to dark when `reverse` is set
    pub fn colors(self, n: usize, reverse: bool) -> Vec<Rgb> {
        let mut colors: Vec<Rgb> = match n {
            0 => Vec::new(),
            1 => vec![self.at(0.0)],
            _ => (0..n).map(|i| self.at(i as f64 / (n - 1) as f64)).collect(),
        };
        if reverse {
            colors.reverse();
        }
        colors
    }
}

/// Palette choice and direction. A non-empty `custom` list of hex colors
/// replaces the ramp and is used verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub name: Palette,
    pub reverse: bool,
    pub custom: Vec<String>,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            name: Palette::Viridis,
            reverse: true,
            custom: Vec::new(),
        }
    }
}

impl PaletteConfig {
    /// Colors for `n` intervals. Custom lists are returned as given, so
    /// their length may differ from `n`.
    pub fn colors(&self, n: usize) -> Result<Vec<Rgb>, String> {
        if self.custom.is_empty() {
            return Ok(self.name.colors(n, self.reverse));
        }
        self.custom
            .iter()
            .map(|hex| Rgb::from_hex(hex).ok_or_else(|| format!("invalid color '{hex}'")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_endpoints() {
        assert_eq!(Palette::Viridis.at(0.0), Rgb(68, 1, 84));
        assert_eq!(Palette::Viridis.at(1.0), Rgb(253, 231, 37));
        assert_eq!(Palette::Viridis.at(1.0).to_hex(), "#fde725");
    }

    #[test]
    fn test_reverse_starts_light() {
        let colors = PaletteConfig::default().colors(5).unwrap();
        assert_eq!(colors.len(), 5);
        assert_eq!(colors[0], Rgb(253, 231, 37));
        assert_eq!(colors[4], Rgb(68, 1, 84));
    }

    #[test]
    fn test_custom_colors_are_verbatim() {
        let config = PaletteConfig {
            custom: vec!["#000000".into(), "ffffff".into()],
            ..Default::default()
        };
        assert_eq!(config.colors(10).unwrap(), [Rgb(0, 0, 0), Rgb(255, 255, 255)]);

        let bad = PaletteConfig {
            custom: vec!["#12345".into()],
            ..Default::default()
        };
        assert!(bad.colors(1).is_err());
    }

    #[test]
    fn test_colors_are_distinct() {
        for palette in [Palette::Viridis, Palette::Magma] {
            let colors = palette.colors(12, false);
            let unique: HashSet<_> = colors.iter().collect();
            assert_eq!(unique.len(), 12);
        }
    }
}
