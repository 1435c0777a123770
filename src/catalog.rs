//! Bead color catalog: palette entries, key lookup and brand code mapping.

use std::cmp::Ordering;
use std::collections::HashMap;

use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An 8-bit RGB triple. Transparency is tracked separately by the grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Uppercase `#RRGGBB` form.
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl From<Srgb<u8>> for RgbColor {
    fn from(c: Srgb<u8>) -> Self {
        Self::new(c.red, c.green, c.blue)
    }
}

impl From<RgbColor> for Srgb<u8> {
    fn from(c: RgbColor) -> Self {
        Srgb::new(c.r, c.g, c.b)
    }
}

/// Parse `#RRGGBB` or `RRGGBB`.
pub fn parse_hex(s: &str) -> Result<RgbColor> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(Error::InvalidHex(s.to_string()));
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).map_err(|_| Error::InvalidHex(s.to_string()))
    };
    Ok(RgbColor::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// One bead color of a catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaletteColor {
    pub key: String,
    pub display_hex: String,
    pub rgb: RgbColor,
    pub name: String,
    pub category: String,
}

impl PaletteColor {
    /// Entry with only a key and a color; display hex is derived from `rgb`.
    pub fn new(key: impl Into<String>, rgb: RgbColor) -> Self {
        let key = key.into();
        Self {
            display_hex: rgb.to_hex(),
            name: key.clone(),
            key,
            rgb,
            category: String::new(),
        }
    }
}

/// Shape of one record in a JSON color catalog.
#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(alias = "key")]
    id: String,
    #[serde(default)]
    name: Option<String>,
    hex: String,
    #[serde(default)]
    rgb: Option<[u8; 3]>,
    #[serde(default)]
    category: String,
}

/// Ordered, non-empty set of palette colors with unique keys.
///
/// Iteration order is significant: nearest-color ties are resolved in favor
/// of the earlier entry.
#[derive(Clone, Debug)]
pub struct Palette {
    colors: Vec<PaletteColor>,
    index: HashMap<String, usize>,
}

impl Palette {
    pub fn new(colors: Vec<PaletteColor>) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::EmptyPalette);
        }
        let mut index = HashMap::with_capacity(colors.len());
        for (i, color) in colors.iter().enumerate() {
            if index.insert(color.key.clone(), i).is_some() {
                return Err(Error::DuplicateKey(color.key.clone()));
            }
        }
        Ok(Self { colors, index })
    }

    /// Load a catalog given as a JSON array of `{id, name, hex, rgb, category}`.
    ///
    /// `rgb` may be omitted, in which case it is taken from `hex`.
    pub fn from_catalog_json(json: &str) -> Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        let colors = entries
            .into_iter()
            .map(|e| {
                let rgb = match e.rgb {
                    Some([r, g, b]) => RgbColor::new(r, g, b),
                    None => parse_hex(&e.hex)?,
                };
                Ok(PaletteColor {
                    name: e.name.unwrap_or_else(|| e.id.clone()),
                    key: e.id,
                    display_hex: e.hex,
                    rgb,
                    category: e.category,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors)
    }

    /// Palette made of plain hex colors, each keyed by its normalized hex.
    pub fn from_hex_list<S: AsRef<str>>(hexes: &[S]) -> Result<Self> {
        let colors = hexes
            .iter()
            .map(|s| {
                let rgb = parse_hex(s.as_ref())?;
                Ok(PaletteColor::new(rgb.to_hex(), rgb))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(colors)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&PaletteColor> {
        self.colors.get(index)
    }

    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub fn by_key(&self, key: &str) -> Option<&PaletteColor> {
        self.index_of(key).map(|i| &self.colors[i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PaletteColor> {
        self.colors.iter()
    }

    pub fn as_slice(&self) -> &[PaletteColor] {
        &self.colors
    }
}

/// Bead brands whose codes can be looked up from a hex value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSystem {
    #[serde(rename = "MARD")]
    Mard,
    #[serde(rename = "COCO")]
    Coco,
    #[serde(rename = "漫漫")]
    Manman,
    #[serde(rename = "盼盼")]
    Panpan,
    #[serde(rename = "咪小窝")]
    Mixiaowo,
}

impl ColorSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorSystem::Mard => "MARD",
            ColorSystem::Coco => "COCO",
            ColorSystem::Manman => "漫漫",
            ColorSystem::Panpan => "盼盼",
            ColorSystem::Mixiaowo => "咪小窝",
        }
    }
}

/// Mapping `hex -> { brand -> code }` as shipped with the catalog.
#[derive(Clone, Debug, Default)]
pub struct ColorSystemMapping(HashMap<String, HashMap<String, String>>);

impl ColorSystemMapping {
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, String>> = serde_json::from_str(json)?;
        // Keys are compared uppercase.
        Ok(Self(
            raw.into_iter()
                .map(|(hex, codes)| (hex.to_uppercase(), codes))
                .collect(),
        ))
    }

    /// Brand code for `hex`, or `"?"` when the color or brand is unknown.
    pub fn code_for_hex(&self, hex: &str, system: ColorSystem) -> &str {
        self.0
            .get(&hex.to_uppercase())
            .and_then(|codes| codes.get(system.as_str()))
            .map(String::as_str)
            .unwrap_or("?")
    }
}

fn hsl_of(rgb: RgbColor) -> (f32, f32, f32) {
    let hsl: Hsl = Srgb::<u8>::from(rgb).into_format::<f32>().into_color();
    (
        hsl.hue.into_positive_degrees(),
        hsl.lightness,
        hsl.saturation,
    )
}

/// Order colors by hue, then lightness, then saturation, each rounded to
/// whole degrees or percent.
pub fn sort_by_hue(colors: &mut [PaletteColor]) {
    colors.sort_by_cached_key(|c| {
        let (h, l, s) = hsl_of(c.rgb);
        (h.round() as i32, (l * 100.0).round() as i32, (s * 100.0).round() as i32)
    });
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum CodeKey {
    Coded(String, u64),
    Plain(String),
}

fn code_key(key: &str) -> CodeKey {
    let split = key.find(|c: char| !c.is_ascii_uppercase()).unwrap_or(key.len());
    let (letters, digits) = key.split_at(split);
    if !letters.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = digits.parse() {
            return CodeKey::Coded(letters.to_string(), n);
        }
    }
    CodeKey::Plain(key.to_string())
}

/// Order colors by bead code: `A1 < A2 < A10 < B1`, other keys last.
pub fn sort_by_code(colors: &mut [PaletteColor]) {
    colors.sort_by(|a, b| match code_key(&a.key).cmp(&code_key(&b.key)) {
        Ordering::Equal => a.key.cmp(&b.key),
        other => other,
    });
}
