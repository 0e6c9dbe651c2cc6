//! # Theme Tokens
//!
//! Global style tokens shared by every page of a project. A [`Theme`] may
//! leave any token unset; [`apply_theme`] always produces a fully concrete
//! [`ResolvedTheme`] by layering page overrides over the project theme over
//! the built-in defaults, so rendering never fails on a missing token.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_PRIMARY: &str = "#2563eb";
pub const DEFAULT_SECONDARY: &str = "#7c3aed";
pub const DEFAULT_BACKGROUND: &str = "#ffffff";
pub const DEFAULT_TEXT: &str = "#111827";

/// Named colors accepted in place of a hex value
const NAMED_COLORS: &[(&str, &str)] = &[
    ("black", "#000000"),
    ("white", "#ffffff"),
    ("slate", "#475569"),
    ("gray", "#6b7280"),
    ("red", "#dc2626"),
    ("orange", "#ea580c"),
    ("amber", "#d97706"),
    ("green", "#16a34a"),
    ("teal", "#0d9488"),
    ("blue", "#2563eb"),
    ("indigo", "#4f46e5"),
    ("violet", "#7c3aed"),
    ("pink", "#db2777"),
];

/// A validated color: `#rgb`, `#rrggbb` or a name from the fixed palette
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorToken(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color token `{0}`: expected #rgb, #rrggbb or a palette name")]
pub struct InvalidColor(pub String);

impl ColorToken {
    pub fn parse(value: &str) -> Result<Self, InvalidColor> {
        let normalized = value.trim().to_ascii_lowercase();

        if let Some(hex) = normalized.strip_prefix('#') {
            if matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Ok(Self(normalized));
            }
        } else if NAMED_COLORS.iter().any(|(name, _)| *name == normalized) {
            return Ok(Self(normalized));
        }

        Err(InvalidColor(value.to_string()))
    }

    /// The token as written (normalized to lowercase)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// CSS value of the token; named colors resolve to their hex value
    pub fn css_value(&self) -> &str {
        NAMED_COLORS
            .iter()
            .find(|(name, _)| *name == self.0)
            .map(|(_, hex)| *hex)
            .unwrap_or(&self.0)
    }
}

impl TryFrom<String> for ColorToken {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ColorToken> for String {
    fn from(token: ColorToken) -> Self {
        token.0
    }
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Font family tokens. Each maps to a system font stack so published pages
/// never load remote fonts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FontToken {
    #[default]
    SystemSans,
    SystemSerif,
    Humanist,
    Geometric,
    Monospace,
}

impl FontToken {
    pub fn css_stack(self) -> &'static str {
        match self {
            FontToken::SystemSans => {
                "system-ui, -apple-system, \"Segoe UI\", Roboto, \"Helvetica Neue\", Arial, sans-serif"
            }
            FontToken::SystemSerif => "Georgia, Cambria, \"Times New Roman\", Times, serif",
            FontToken::Humanist => "Seravek, \"Gill Sans Nova\", Ubuntu, Calibri, \"DejaVu Sans\", sans-serif",
            FontToken::Geometric => "Avenir, Montserrat, Corbel, \"URW Gothic\", source-sans-pro, sans-serif",
            FontToken::Monospace => "ui-monospace, \"Cascadia Code\", \"Source Code Pro\", Menlo, Consolas, monospace",
        }
    }
}

/// Spacing scale; sets the base unit every padding class multiplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SpacingScale {
    Compact,
    #[default]
    Comfortable,
    Spacious,
}

impl SpacingScale {
    pub fn unit(self) -> &'static str {
        match self {
            SpacingScale::Compact => "0.75rem",
            SpacingScale::Comfortable => "1rem",
            SpacingScale::Spacious => "1.25rem",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Palette {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<ColorToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<ColorToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<ColorToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<ColorToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Typography {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<FontToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<FontToken>,
}

/// Project theme. Every token is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Theme {
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub typography: Typography,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing: Option<SpacingScale>,
}

/// Page-level overrides share the theme's shape; set tokens win
pub type ThemeOverrides = Theme;

/// Fully concrete token set consumed by the renderer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTheme {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
    pub heading_font: &'static str,
    pub body_font: &'static str,
    pub spacing_unit: &'static str,
}

impl Default for ResolvedTheme {
    fn default() -> Self {
        apply_theme(&Theme::default(), None)
    }
}

impl ResolvedTheme {
    /// Same tokens with the section background replaced by a block override
    pub fn with_block_background(&self, background: Option<&ColorToken>) -> ResolvedTheme {
        let mut resolved = self.clone();
        if let Some(color) = background {
            resolved.background = color.css_value().to_string();
        }
        resolved
    }
}

/// Resolve a project theme plus optional overrides into concrete tokens
pub fn apply_theme(theme: &Theme, overrides: Option<&ThemeOverrides>) -> ResolvedTheme {
    let color = |pick: fn(&Palette) -> Option<&ColorToken>, default: &str| -> String {
        overrides
            .and_then(|o| pick(&o.palette))
            .or_else(|| pick(&theme.palette))
            .map(|c| c.css_value().to_string())
            .unwrap_or_else(|| default.to_string())
    };
    let font = |pick: fn(&Typography) -> Option<FontToken>| -> &'static str {
        overrides
            .and_then(|o| pick(&o.typography))
            .or_else(|| pick(&theme.typography))
            .unwrap_or_default()
            .css_stack()
    };
    let spacing = overrides
        .and_then(|o| o.spacing)
        .or(theme.spacing)
        .unwrap_or_default();

    ResolvedTheme {
        primary: color(|p| p.primary.as_ref(), DEFAULT_PRIMARY),
        secondary: color(|p| p.secondary.as_ref(), DEFAULT_SECONDARY),
        background: color(|p| p.background.as_ref(), DEFAULT_BACKGROUND),
        text: color(|p| p.text.as_ref(), DEFAULT_TEXT),
        heading_font: font(|t| t.heading),
        body_font: font(|t| t.body),
        spacing_unit: spacing.unit(),
    }
}
