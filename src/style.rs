//! Translation of host cell styles into output cell formats

use crate::types::{CellStyle, HorizontalAlign, Rgb, VerticalAlign};

/// Font size used when the host size cannot be converted
pub const DEFAULT_FONT_SIZE: f64 = 10.0;

/// Horizontal alignment of an output cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputHorizontal {
    Left,
    Right,
    Center,
    General,
}

/// Vertical alignment of an output cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputVertical {
    Top,
    Center,
    Bottom,
}

/// Border line applied to the four edges of an output cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderLine {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dotted,
    Dashed,
    Double,
}

/// Per-edge borders of an output cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellBorders {
    pub top: BorderLine,
    pub bottom: BorderLine,
    pub left: BorderLine,
    pub right: BorderLine,
}

impl CellBorders {
    pub fn is_none(&self) -> bool {
        *self == CellBorders::default()
    }
}

/// Decides the borders of an output cell from its host style.
///
/// Host border styles carry line weight and pattern that have no agreed
/// mapping yet, so the only shipped policy draws no borders.
pub trait BorderPolicy {
    fn borders(&self, style: &CellStyle) -> CellBorders;
}

/// Border policy that never draws borders
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBorders;

impl BorderPolicy for NoBorders {
    fn borders(&self, _style: &CellStyle) -> CellBorders {
        CellBorders::default()
    }
}

/// Complete output style of one cell
#[derive(Debug, Clone, PartialEq)]
pub struct CellFormat {
    pub font_name: String,
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font_color: Rgb,
    /// Solid fill; `None` leaves the cell unfilled
    pub fill: Option<Rgb>,
    pub horizontal: OutputHorizontal,
    pub vertical: OutputVertical,
    pub wrap_text: bool,
    pub borders: CellBorders,
}

/// Unrecognized host values are already folded into `General` by
/// [`HorizontalAlign::from_host`].
pub fn translate_horizontal(align: HorizontalAlign) -> OutputHorizontal {
    match align {
        HorizontalAlign::Left => OutputHorizontal::Left,
        HorizontalAlign::Right => OutputHorizontal::Right,
        HorizontalAlign::Center => OutputHorizontal::Center,
        HorizontalAlign::General => OutputHorizontal::General,
    }
}

pub fn translate_vertical(align: VerticalAlign) -> OutputVertical {
    match align {
        VerticalAlign::Top => OutputVertical::Top,
        VerticalAlign::Middle => OutputVertical::Center,
        VerticalAlign::Bottom => OutputVertical::Bottom,
    }
}

/// Convert a host text size to a font size, falling back to
/// [`DEFAULT_FONT_SIZE`] when the value is not a usable point size.
pub fn font_size_points(text_size: f64) -> f64 {
    if text_size.is_finite() && text_size > 0.0 && text_size <= f64::from(u16::MAX) {
        text_size
    } else {
        tracing::debug!(text_size, "unusable text size, using default font size");
        DEFAULT_FONT_SIZE
    }
}

/// Translate a host cell style into the output format of that cell
pub fn translate_style(style: &CellStyle, border_policy: &dyn BorderPolicy) -> CellFormat {
    let fill = if style.background_color != Rgb::WHITE {
        Some(style.background_color)
    } else {
        None
    };

    CellFormat {
        font_name: style.font_name.clone(),
        font_size: font_size_points(style.text_size),
        bold: style.bold,
        italic: style.italic,
        underline: style.underline,
        font_color: style.text_color,
        fill,
        horizontal: translate_horizontal(style.horizontal),
        vertical: translate_vertical(style.vertical),
        wrap_text: true,
        borders: border_policy.borders(style),
    }
}
