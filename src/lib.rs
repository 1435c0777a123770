//! Turn raster images into bead-art patterns.
//!
//! The image is split into a square grid, every cell is reduced to one
//! color, that color is snapped to the nearest bead of a catalog, and (in
//! dominant mode) rare colors are folded into similar frequent ones. The
//! result carries the key grid, the beads used and how many of each.
//!
//! Native callers use [`convert`], [`convert_bytes`] or [`convert_rgba`];
//! JavaScript callers use the `wasm-bindgen` exports [`beadify`] and
//! [`beadify_rgba`].

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::prelude::*;

pub mod catalog;
pub mod cluster;
pub mod error;
pub mod grid;
pub mod matcher;
pub mod merge;
pub mod pipeline;
pub mod result;
pub mod sampler;

pub use catalog::{ColorSystem, ColorSystemMapping, Palette, PaletteColor, RgbColor};
pub use error::{Error, Result};
pub use grid::{Cell, Grid, pixelate};
pub use matcher::{color_distance, find_closest};
pub use merge::{MergeReport, merge_colors, merge_colors_with_report};
pub use pipeline::{ConversionMode, ConvertOptions, convert, convert_bytes, convert_rgba};
pub use result::{PatternResult, assemble, bead_chart};
pub use sampler::{PixelationMode, sample_cell};

#[cfg(target_arch = "wasm32")]
fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| wasm_logger::init(wasm_logger::Config::default()));
}

#[cfg(not(target_arch = "wasm32"))]
fn init_logging() {}

fn js_err(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn parse_options(options_json: Option<String>) -> std::result::Result<ConvertOptions, JsValue> {
    match options_json.as_deref().map(str::trim) {
        None | Some("") => Ok(ConvertOptions::default()),
        Some(json) => serde_json::from_str(json).map_err(|e| js_err(Error::Catalog(e))),
    }
}

fn set(target: &Object, key: &str, value: &JsValue) -> std::result::Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

/// Build the JS object handed back to the page.
fn to_js(result: &PatternResult) -> std::result::Result<Object, JsValue> {
    let pixels = Array::new();
    for row in &result.pixels {
        let js_row = Array::new();
        for key in row {
            js_row.push(&key.as_deref().map_or(JsValue::NULL, JsValue::from_str));
        }
        pixels.push(&js_row);
    }

    let palette = Array::new();
    for color in &result.color_palette {
        let entry = Object::new();
        set(&entry, "key", &JsValue::from_str(&color.key))?;
        set(&entry, "hex", &JsValue::from_str(&color.display_hex))?;
        set(&entry, "name", &JsValue::from_str(&color.name))?;
        set(&entry, "category", &JsValue::from_str(&color.category))?;
        let rgb = Array::new();
        for channel in [color.rgb.r, color.rgb.g, color.rgb.b] {
            rgb.push(&JsValue::from(channel));
        }
        set(&entry, "rgb", &rgb)?;
        palette.push(&entry);
    }

    let usage = Object::new();
    for (key, count) in &result.color_usage {
        set(&usage, key, &JsValue::from(*count as u32))?;
    }

    let out = Object::new();
    set(&out, "gridSize", &JsValue::from(result.grid_size as u32))?;
    set(&out, "mode", &JsValue::from_str(result.mode.as_str()))?;
    set(&out, "pixels", &pixels)?;
    set(&out, "colorPalette", &palette)?;
    set(&out, "colorUsage", &usage)?;
    set(&out, "totalBeads", &JsValue::from(result.total_beads as u32))?;
    set(&out, "transparentPixels", &JsValue::from(result.transparent_pixels as u32))?;
    Ok(out)
}

/// Convert an encoded image (PNG, JPEG, ...) into a bead pattern.
///
/// `catalog_json` is the bead catalog (array of `{id, name, hex, rgb,
/// category}`); `options_json` is an optional partial [`ConvertOptions`]
/// object such as `{"gridSize": 52, "mode": "average"}`.
#[wasm_bindgen]
pub fn beadify(
    input: Vec<u8>,
    catalog_json: &str,
    options_json: Option<String>,
) -> std::result::Result<Object, JsValue> {
    init_logging();
    let palette = Palette::from_catalog_json(catalog_json).map_err(js_err)?;
    let options = parse_options(options_json)?;
    let result = convert_bytes(&input, &palette, &options).map_err(js_err)?;
    to_js(&result)
}

/// Convert raw RGBA pixels (e.g. canvas `ImageData.data`) into a bead pattern.
#[wasm_bindgen]
pub fn beadify_rgba(
    rgba: Vec<u8>,
    width: u32,
    height: u32,
    catalog_json: &str,
    options_json: Option<String>,
) -> std::result::Result<Object, JsValue> {
    init_logging();
    let palette = Palette::from_catalog_json(catalog_json).map_err(js_err)?;
    let options = parse_options(options_json)?;
    let result = convert_rgba(rgba, width, height, &palette, &options).map_err(js_err)?;
    to_js(&result)
}
