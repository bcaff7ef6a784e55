//! Parsing and utility functions

use crate::types::{CellValue, Rgb};

/// Host column width to output column width ratio (1150 / 7.5).
/// Fitted against the host's rendering; not a physical unit conversion.
const WIDTH_SCALE_NUMERATOR: f64 = 1150.0;
const WIDTH_SCALE_DENOMINATOR: f64 = 7.5;

/// Excel sheet name maximum length
pub(crate) const SHEET_NAME_MAX_LEN: usize = 31;

/// Characters not allowed in sheet names
const SHEET_NAME_ILLEGAL: [char; 7] = ['*', ':', '?', '/', '\\', '[', ']'];

/// Classify cell text as a number or literal text.
///
/// Empty text becomes a single space so merged areas never hold a truly
/// empty cell. Text starting with `0` stays text ("0123" keeps its leading
/// zero, and so does "0.5"). Everything else that parses as a finite float
/// is stored as a number; `,` thousands separators are accepted in the
/// integer part ("1,234" is 1234).
pub fn infer_value(text: &str) -> CellValue {
    if text.is_empty() {
        return CellValue::Text(" ".to_string());
    }

    if !text.starts_with('0') {
        let number = strip_group_separators(text.trim())
            .and_then(|plain| plain.parse::<f64>().ok())
            .filter(|n| n.is_finite());
        if let Some(number) = number {
            return CellValue::Number(number);
        }
    }

    CellValue::Text(text.to_string())
}

/// Remove `,` thousands separators from the integer part of a number.
///
/// Groups must be well formed: a leading group of 1-3 digits followed by
/// groups of exactly 3. Returns `None` for misplaced separators.
fn strip_group_separators(text: &str) -> Option<String> {
    if !text.contains(',') {
        return Some(text.to_string());
    }

    let unsigned = text.trim_start_matches(['+', '-']);
    let sign = &text[..text.len() - unsigned.len()];
    let int_end = unsigned
        .find(|c: char| c == '.' || c == 'e' || c == 'E')
        .unwrap_or(unsigned.len());
    let (int_part, rest) = unsigned.split_at(int_end);
    if rest.contains(',') {
        return None;
    }

    let mut groups = int_part.split(',');
    let lead = groups.next()?;
    if lead.is_empty() || lead.len() > 3 || !lead.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut plain = String::with_capacity(text.len());
    plain.push_str(sign);
    plain.push_str(lead);
    for group in groups {
        if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        plain.push_str(group);
    }
    plain.push_str(rest);
    Some(plain)
}

/// Convert a host column width into an output column width
pub fn scale_column_width(source_width: f64) -> f64 {
    source_width * WIDTH_SCALE_NUMERATOR / WIDTH_SCALE_DENOMINATOR
}

/// Parse a host text size. Unreadable input yields NaN, which the style
/// translator replaces with the default size.
pub(crate) fn parse_text_size(size_str: &str) -> f64 {
    size_str.trim().parse::<f64>().unwrap_or(f64::NAN)
}

/// Parse color string (hex #RRGGBB or named color)
pub(crate) fn parse_color(color_str: &str) -> Result<Rgb, String> {
    let color = color_str.trim();
    if let Some(hex) = color.strip_prefix('#') {
        if hex.len() != 6 {
            return Err(format!(
                "Invalid hex color '{}': expected 6 characters after #, got {}",
                color,
                hex.len()
            ));
        }
        u32::from_str_radix(hex, 16)
            .map(Rgb::from_u32)
            .map_err(|_| format!("Invalid hex color: {}", color))
    } else {
        let packed = match color.to_lowercase().as_str() {
            "white" => 0xFFFFFF,
            "black" => 0x000000,
            "red" => 0xFF0000,
            "green" => 0x00FF00,
            "blue" => 0x0000FF,
            "yellow" => 0xFFFF00,
            "cyan" => 0x00FFFF,
            "magenta" => 0xFF00FF,
            "gray" | "grey" => 0x808080,
            "silver" => 0xC0C0C0,
            "orange" => 0xFFA500,
            "purple" => 0x800080,
            "navy" => 0x000080,
            "teal" => 0x008080,
            "maroon" => 0x800000,
            _ => return Err(format!("Unknown color: {}", color)),
        };
        Ok(Rgb::from_u32(packed))
    }
}

/// Make a string usable as a worksheet name
pub(crate) fn sanitize_sheet_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if SHEET_NAME_ILLEGAL.contains(&c) { '_' } else { c })
        .collect();
    let trimmed = replaced.trim();
    if trimmed.is_empty() {
        return "Sheet".to_string();
    }
    trimmed.chars().take(SHEET_NAME_MAX_LEN).collect()
}
