//! Colors and pens for blocks and edges.
//!
//! Everything here is plain data handed to the renderer at construction time.

use blockview_core::EdgeClass;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color, serialized as `#rrggbb` or `#rrggbbaa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn darken(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) * (1.0 - factor)) as u8,
            g: ((self.g as f32) * (1.0 - factor)) as u8,
            b: ((self.b as f32) * (1.0 - factor)) as u8,
            a: self.a,
        }
    }

    pub fn lighten(&self, factor: f32) -> Self {
        Self {
            r: ((self.r as f32) + (255.0 - self.r as f32) * factor) as u8,
            g: ((self.g as f32) + (255.0 - self.g as f32) * factor) as u8,
            b: ((self.b as f32) + (255.0 - self.b as f32) * factor) as u8,
            a: self.a,
        }
    }

    pub fn from_hex(text: &str) -> Option<Self> {
        let digits = text.strip_prefix('#').unwrap_or(text);
        if !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
        match digits.len() {
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, channel(6)?)),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value).ok_or_else(|| format!("invalid color '{value}'"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

pub const COLOR_BACK_EDGE: Color = Color::rgb(0xf9, 0xd5, 0x77);
pub const COLOR_TRUE_EDGE: Color = Color::rgb(0x79, 0xcc, 0xcd);
pub const COLOR_FALSE_EDGE: Color = Color::rgb(0xf1, 0x66, 0x64);
pub const COLOR_NORMAL_EDGE: Color = Color::rgb(0x56, 0x5a, 0x5c);

/// Pen for one edge class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub arrow_head: bool,
}

/// Palette and pens shared by the graph and linear views.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Color,
    pub block_fill: Color,
    /// Fill used instead of text when zoomed out past the detail threshold.
    pub block_silhouette: Color,
    pub block_border: Color,
    pub selected_instruction: Color,
    pub selected_operand: Color,
    pub address_text: Color,
    pub mnemonic_text: Color,
    pub operand_text: Color,
    pub branch_target_text: Color,
    pub label_text: Color,
    pub comment_text: Color,
    pub string_text: Color,
    pub variable_text: Color,
    pub back_edge: Color,
    pub true_edge: Color,
    pub false_edge: Color,
    pub normal_edge: Color,
    pub edge_width: f32,
    pub arrow_size: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::rgb(0xff, 0xff, 0xff),
            block_fill: Color::rgb(0xfa, 0xfa, 0xfa),
            block_silhouette: Color::rgb(0xda, 0xda, 0xda),
            block_border: Color::rgb(0xf0, 0xf0, 0xf0),
            selected_instruction: Color::rgb(0xef, 0xbf, 0xba),
            selected_operand: Color::rgb(0xff, 0xe0, 0x8a),
            address_text: Color::rgb(0x00, 0x00, 0x80),
            mnemonic_text: Color::rgb(0x00, 0x00, 0x80),
            operand_text: Color::rgb(0x00, 0x00, 0x80),
            branch_target_text: Color::rgb(0x00, 0x80, 0x00),
            label_text: Color::rgb(0x00, 0x00, 0xff),
            comment_text: Color::rgb(0x37, 0x3d, 0x3f),
            string_text: Color::rgb(0xa0, 0x60, 0x00),
            variable_text: Color::rgb(0x80, 0x00, 0x80),
            back_edge: COLOR_BACK_EDGE,
            true_edge: COLOR_TRUE_EDGE,
            false_edge: COLOR_FALSE_EDGE,
            normal_edge: COLOR_NORMAL_EDGE,
            edge_width: 2.0,
            arrow_size: 6.0,
        }
    }
}

impl Theme {
    pub fn edge_color(&self, class: EdgeClass) -> Color {
        match class {
            EdgeClass::BackEdge => self.back_edge,
            EdgeClass::TrueBranch => self.true_edge,
            EdgeClass::FalseBranch => self.false_edge,
            EdgeClass::Normal => self.normal_edge,
        }
    }

    /// Arrowheads are fine detail and disappear with the text.
    pub fn edge_style(&self, class: EdgeClass, full_detail: bool) -> EdgeStyle {
        EdgeStyle {
            color: self.edge_color(class),
            width: self.edge_width,
            arrow_head: full_detail,
        }
    }
}
