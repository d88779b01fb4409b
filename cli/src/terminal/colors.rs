use colored::Color;

pub const PRIMARY: Color = Color::TrueColor { r: 120, g: 200, b: 255 };
pub const ACCENT: Color = Color::TrueColor { r: 255, g: 190, b: 90 };
pub const SEPARATOR: Color = Color::BrightBlack;
pub const TEXT_DEFAULT: Color = Color::TrueColor { r: 210, g: 210, b: 210 };
pub const IPV4_ADDR: Color = Color::TrueColor { r: 100, g: 220, b: 160 };
pub const IPV4_PREFIX: Color = Color::TrueColor { r: 60, g: 170, b: 120 };
pub const MAC_ADDR: Color = Color::TrueColor { r: 240, g: 140, b: 200 };
pub const VENDOR: Color = Color::TrueColor { r: 180, g: 160, b: 255 };
pub const PORT: Color = Color::TrueColor { r: 255, g: 220, b: 120 };
