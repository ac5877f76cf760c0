use ratatui::style::Color;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Theme {
    pub pane_bg: Color,
    pub status_bg: Color,
    pub text_fg: Color,
    pub muted_fg: Color,
    pub accent_fg: Color,
    pub paused_fg: Color,
    pub dialog_bg: Color,
    pub modal_bg: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            pane_bg: Color::Rgb(40, 40, 40),
            status_bg: Color::Rgb(30, 30, 30),
            text_fg: Color::Rgb(225, 225, 225),
            muted_fg: Color::Rgb(150, 150, 150),
            accent_fg: Color::Rgb(90, 145, 200),
            paused_fg: Color::Rgb(230, 180, 80),
            dialog_bg: Color::Rgb(70, 40, 40),
            modal_bg: Color::Rgb(52, 52, 60),
        }
    }
}

/// `[colors]` table of the config file. Missing entries keep the default color.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeOverrides {
    pub pane_bg: Option<RgbToml>,
    pub status_bg: Option<RgbToml>,
    pub text_fg: Option<RgbToml>,
    pub muted_fg: Option<RgbToml>,
    pub accent_fg: Option<RgbToml>,
    pub paused_fg: Option<RgbToml>,
    pub dialog_bg: Option<RgbToml>,
    pub modal_bg: Option<RgbToml>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RgbToml {
    r: u8,
    g: u8,
    b: u8,
}

impl RgbToml {
    fn to_color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }
}

impl Theme {
    pub fn from_overrides(overrides: &ThemeOverrides) -> Self {
        let base = Self::default();
        let pick = |value: Option<RgbToml>, fallback: Color| value.map_or(fallback, RgbToml::to_color);
        Self {
            pane_bg: pick(overrides.pane_bg, base.pane_bg),
            status_bg: pick(overrides.status_bg, base.status_bg),
            text_fg: pick(overrides.text_fg, base.text_fg),
            muted_fg: pick(overrides.muted_fg, base.muted_fg),
            accent_fg: pick(overrides.accent_fg, base.accent_fg),
            paused_fg: pick(overrides.paused_fg, base.paused_fg),
            dialog_bg: pick(overrides.dialog_bg, base.dialog_bg),
            modal_bg: pick(overrides.modal_bg, base.modal_bg),
        }
    }
}
