use serde::{Deserialize, Serialize};

/// Monospace text metrics used to size render elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontMetrics {
    pub char_width: f32,
    pub line_height: f32,
    /// Baseline offset from the top of a row.
    pub ascent: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 16.0,
            ascent: 12.0,
        }
    }
}

impl FontMetrics {
    /// Metrics of a monospace font rasterized at `px`.
    pub fn from_font(font: &fontdue::Font, px: f32) -> Self {
        let char_width = font.metrics('M', px).advance_width;
        match font.horizontal_line_metrics(px) {
            Some(line) => Self {
                char_width,
                line_height: line.new_line_size.ceil(),
                ascent: line.ascent.ceil(),
            },
            None => Self {
                char_width,
                line_height: (px * 1.25).ceil(),
                ascent: px.ceil(),
            },
        }
    }

    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.char_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width_counts_chars() {
        let metrics = FontMetrics::default();
        assert_eq!(metrics.text_width("mov"), 21.0);
        assert_eq!(metrics.text_width(""), 0.0);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let metrics: FontMetrics = serde_json::from_str(r#"{"char_width": 8.0}"#).unwrap();
        assert_eq!(metrics.char_width, 8.0);
        assert_eq!(metrics.line_height, 16.0);
    }
}
