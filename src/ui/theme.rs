use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    pub header_accent_bg: Color,
    pub header_accent_fg: Color,
    pub status_ok: Color,
    pub status_err: Color,
    pub statusbar_bg: Color,
    pub overlay_border: Color,
    pub text_primary: Color,
    pub text_secondary: Color,
    pub accent: Color,
    pub pill_key_bg: Color,
    pub pill_key_fg: Color,
    pub pill_desc_fg: Color,
    pub surface_bg: Color,
    pub gauge_filled: Color,
    pub gauge_unfilled: Color,
    pub table_header_fg: Color,
    pub selection_bg: Color,
    pub selection_fg: Color,
    pub hot_fg: Color,
    /// Idle, warm and busy CPU shades for the CPU column.
    pub heat_colors: [Color; 3],
}

impl Theme {
    pub fn from_config(theme_name: &str) -> Self {
        match theme_name.to_lowercase().as_str() {
            "light" => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn dark() -> Self {
        Theme {
            name: "dark",
            header_accent_bg: Color::Green,
            header_accent_fg: Color::Black,
            status_ok: Color::Green,
            status_err: Color::Red,
            statusbar_bg: Color::DarkGray,
            overlay_border: Color::DarkGray,
            text_primary: Color::White,
            text_secondary: Color::Gray,
            accent: Color::Green,
            pill_key_bg: Color::Yellow,
            pill_key_fg: Color::Black,
            pill_desc_fg: Color::White,
            surface_bg: Color::DarkGray,
            gauge_filled: Color::Rgb(103, 232, 249),
            gauge_unfilled: Color::DarkGray,
            table_header_fg: Color::Yellow,
            selection_bg: Color::Rgb(55, 65, 81),
            selection_fg: Color::White,
            hot_fg: Color::Rgb(239, 68, 68),
            heat_colors: [
                Color::Gray,
                Color::Rgb(249, 115, 22),
                Color::Rgb(239, 68, 68),
            ],
        }
    }

    pub fn light() -> Self {
        Theme {
            name: "light",
            header_accent_bg: Color::Blue,
            header_accent_fg: Color::White,
            status_ok: Color::Rgb(0, 120, 0),
            status_err: Color::Red,
            statusbar_bg: Color::Rgb(220, 220, 220),
            overlay_border: Color::Rgb(150, 150, 150),
            text_primary: Color::Black,
            text_secondary: Color::DarkGray,
            accent: Color::Blue,
            pill_key_bg: Color::Blue,
            pill_key_fg: Color::White,
            pill_desc_fg: Color::Black,
            surface_bg: Color::Rgb(200, 200, 200),
            gauge_filled: Color::Rgb(70, 130, 180),
            gauge_unfilled: Color::Rgb(200, 200, 200),
            table_header_fg: Color::Blue,
            selection_bg: Color::Rgb(190, 210, 235),
            selection_fg: Color::Black,
            hot_fg: Color::Rgb(200, 60, 60),
            heat_colors: [
                Color::DarkGray,
                Color::Rgb(220, 120, 80),
                Color::Rgb(200, 60, 60),
            ],
        }
    }

    /// Shade for a CPU percentage. Anything at or above `threshold` uses the
    /// hottest shade; a zero threshold disables highlighting entirely.
    pub fn cpu_color(&self, cpu_percent: f32, threshold: f32) -> Color {
        if threshold <= 0.0 {
            return self.text_primary;
        }
        if cpu_percent >= threshold {
            self.heat_colors[2]
        } else if cpu_percent >= threshold / 2.0 {
            self.heat_colors[1]
        } else {
            self.heat_colors[0]
        }
    }
}
