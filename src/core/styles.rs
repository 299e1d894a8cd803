//! Style roles for CLI output
//!
//! Each logical role maps to an optional `colored::Color`. Colouring is applied
//! only when the caller passes `enabled = true`, so no global colour state is
//! kept. The same roles drive prettytable cell specs and clap help styles.
//!
//! ```
//! use hookwork::core::styles::StyleRole;
//! assert_eq!(StyleRole::Header.paint("Module", false), "Module");
//! assert!(StyleRole::Header.paint("Module", true).starts_with("\x1b[33m"));
//! ```

use clap::builder::styling::AnsiColor;
use colored::Color;

macro_rules! style {
    ( $( $variant:ident => $color:expr ),+ $(,)? ) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum StyleRole { $( $variant ),+ }

        impl StyleRole {
            pub fn color(self) -> Option<Color> {
                match self { $( StyleRole::$variant => $color ),+ }
            }
        }
    }
}

style! {
    Header   => Some(Color::Yellow),
    Module   => Some(Color::Cyan),
    Feature  => Some(Color::Green),
    Enabled  => Some(Color::BrightGreen),
    Disabled => Some(Color::BrightBlack),
    Forced   => Some(Color::Blue),
    Error    => Some(Color::BrightRed),
    Value    => None,
}

impl StyleRole {
    pub fn ansi_code(self) -> Option<String> {
        map_color_code(self.color()?)
    }

    pub fn paint(self, text: &str, enabled: bool) -> String {
        match self.ansi_code() {
            Some(code) if enabled => format!("\x1b[{}m{}\x1b[0m", code, text),
            _ => text.to_string(),
        }
    }

    /// Foreground spec for `prettytable::Cell::style_spec`
    pub fn to_prettytable_spec(self) -> Option<String> {
        let spec_char = match self.color()? {
            Color::Black => "k",
            Color::Red => "r",
            Color::Green => "g",
            Color::Yellow => "y",
            Color::Blue => "b",
            Color::Magenta => "m",
            Color::Cyan => "c",
            Color::White => "w",
            Color::BrightBlack => "K",
            Color::BrightRed => "R",
            Color::BrightGreen => "G",
            Color::BrightYellow => "Y",
            Color::BrightBlue => "B",
            Color::BrightMagenta => "M",
            Color::BrightCyan => "C",
            Color::BrightWhite => "W",
            Color::TrueColor { .. } => return None,
        };
        Some(format!("F{}", spec_char))
    }
}

fn map_color_code(c: Color) -> Option<String> {
    use Color::*;
    let code = match c {
        Black => "30",
        Red => "31",
        Green => "32",
        Yellow => "33",
        Blue => "34",
        Magenta => "35",
        Cyan => "36",
        White => "37",
        BrightBlack => "90",
        BrightRed => "91",
        BrightGreen => "92",
        BrightYellow => "93",
        BrightBlue => "94",
        BrightMagenta => "95",
        BrightCyan => "96",
        BrightWhite => "97",
        TrueColor { r, g, b } => return Some(format!("38;2;{};{};{}", r, g, b)),
    };
    Some(code.to_string())
}

fn color_to_ansi(c: Color) -> Option<AnsiColor> {
    use AnsiColor as A;
    use Color::*;
    Some(match c {
        Black => A::Black,
        Red => A::Red,
        Green => A::Green,
        Yellow => A::Yellow,
        Blue => A::Blue,
        Magenta => A::Magenta,
        Cyan => A::Cyan,
        White => A::White,
        BrightBlack => A::BrightBlack,
        BrightRed => A::BrightRed,
        BrightGreen => A::BrightGreen,
        BrightYellow => A::BrightYellow,
        BrightBlue => A::BrightBlue,
        BrightMagenta => A::BrightMagenta,
        BrightCyan => A::BrightCyan,
        BrightWhite => A::BrightWhite,
        TrueColor { .. } => return None,
    })
}

/// clap help styles built from the same roles
pub fn palette_to_clap(enabled: bool) -> clap::builder::Styles {
    use clap::builder::styling::{Color as ClapColor, Style};
    if !enabled {
        return clap::builder::Styles::plain();
    }

    let style = |role: StyleRole, bold: bool| {
        let mut s = Style::new();
        if let Some(col) = role.color().and_then(color_to_ansi) {
            s = s.fg_color(Some(ClapColor::Ansi(col)));
        }
        if bold {
            s = s.bold();
        }
        s
    };

    clap::builder::Styles::styled()
        .header(style(StyleRole::Header, true))
        .usage(style(StyleRole::Header, true))
        .literal(style(StyleRole::Module, false))
        .placeholder(style(StyleRole::Feature, false))
        .error(style(StyleRole::Error, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ansi_codes() {
        assert_eq!(StyleRole::Header.ansi_code(), Some("33".to_string()));
        assert_eq!(StyleRole::Disabled.ansi_code(), Some("90".to_string()));
        assert_eq!(StyleRole::Value.ansi_code(), None);
    }

    #[test]
    fn test_paint_respects_enabled_flag() {
        let painted = StyleRole::Module.paint("seo", true);
        assert_eq!(painted, "\x1b[36mseo\x1b[0m");
        assert_eq!(StyleRole::Module.paint("seo", false), "seo");
        assert_eq!(StyleRole::Value.paint("seo", true), "seo");
    }

    #[test]
    fn test_prettytable_specs() {
        assert_eq!(StyleRole::Feature.to_prettytable_spec().as_deref(), Some("Fg"));
        assert_eq!(StyleRole::Error.to_prettytable_spec().as_deref(), Some("FR"));
        assert_eq!(StyleRole::Value.to_prettytable_spec(), None);
    }

    #[test]
    fn test_truecolor_code() {
        assert_eq!(
            map_color_code(Color::TrueColor { r: 1, g: 2, b: 3 }),
            Some("38;2;1;2;3".to_string())
        );
        assert_eq!(color_to_ansi(Color::TrueColor { r: 1, g: 2, b: 3 }), None);
    }
}
