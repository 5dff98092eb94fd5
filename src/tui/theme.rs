use ratatui::style::{Color, Style};

/// Kiosk color palette
pub struct KioskTheme {
    pub primary: Color,
    pub text_primary: Color,
    pub text_dim: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for KioskTheme {
    fn default() -> Self {
        Self {
            primary: Color::Rgb(130, 71, 229),       // #8247E5
            text_primary: Color::Rgb(224, 224, 224), // #E0E0E0
            text_dim: Color::Rgb(128, 128, 128),     // #808080
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl KioskTheme {
    /// Titles and active elements
    pub fn primary_style(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn text_primary_style(&self) -> Style {
        Style::default().fg(self.text_primary)
    }

    pub fn text_dim_style(&self) -> Style {
        Style::default().fg(self.text_dim)
    }

    pub fn highlight_style(&self) -> Style {
        Style::default().fg(self.success)
    }
}
