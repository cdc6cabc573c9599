//! Named chart colors and their palette indices.

use crate::error::{Error, Result};

/// `(name, hex)` in palette index order.
pub const PALETTE: [(&str, &str); 21] = [
    ("gray", "#999999"),
    ("blue", "#0077c2"),
    ("azure", "#00b9ff"),
    ("navy", "#6ca2b7"),
    ("brown", "#b04600"),
    ("orange", "#f47e00"),
    ("yellow", "#e5b312"),
    ("magenta", "#bd468d"),
    ("purple", "#e9008a"),
    ("pink", "#ff8dd1"),
    ("violet", "#876ff3"),
    ("lilac", "#a747ff"),
    ("iris", "#ab99bc"),
    ("emerald", "#007c1d"),
    ("green", "#05ce00"),
    ("aquamarine", "#0dba8f"),
    ("red", "#ea1849"),
    ("gold", "#eac24b"),
    ("greenyellow", "#e5e517"),
    ("chartreuse", "#acef7f"),
    ("jade", "#6bd37e"),
];

/// Palette index of a color name.
#[must_use]
pub fn index_of(name: &str) -> Option<u32> {
    PALETTE
        .iter()
        .position(|(candidate, _)| *candidate == name)
        .and_then(|index| u32::try_from(index).ok())
}

/// Color name at a palette index.
#[must_use]
pub fn name_of(index: u32) -> Option<&'static str> {
    PALETTE.get(index as usize).map(|(name, _)| *name)
}

/// Hex value of a color name.
#[must_use]
pub fn hex_of(name: &str) -> Option<&'static str> {
    PALETTE
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, hex)| *hex)
}

/// Checks that `name` is a palette color.
///
/// # Errors
///
/// Returns a validation error listing the palette if `name` is unknown.
pub fn validate_color_name(field: &str, name: &str) -> Result<()> {
    if index_of(name).is_some() {
        return Ok(());
    }
    let names: Vec<&str> = PALETTE.iter().map(|(name, _)| *name).collect();
    Err(Error::validation(
        field,
        format!("'{name}' is not one of: {}", names.join(", ")),
    ))
}

/// Palette index for an optional color, validating it.
///
/// # Errors
///
/// Returns a validation error for unknown color names.
pub fn optional_index(field: &str, name: Option<&str>) -> Result<Option<u32>> {
    name.map(|name| {
        validate_color_name(field, name)?;
        Ok(index_of(name).unwrap_or_default())
    })
    .transpose()
}
