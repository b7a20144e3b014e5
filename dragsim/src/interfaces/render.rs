use crate::core::session::Season;
use anyhow::Context;

/// Opaque drawable handles supplied by the asset provider. The core only ever places them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpriteId {
    PlayerCar,
    OpponentCar,
    Background(Season),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> RgbColor {
        RgbColor { r, g, b }
    }

    pub const fn with_alpha(self, a: u8) -> RgbaColor {
        RgbaColor {
            r: self.r,
            g: self.g,
            b: self.b,
            a,
        }
    }

    /// from_css parses CSS colour notation, e.g. "#e03030" or "rgb(0, 80, 200)". The alpha part
    /// of the notation is ignored.
    pub fn from_css(css: &str) -> anyhow::Result<RgbColor> {
        let tmp_color = css
            .parse::<css_color_parser::Color>()
            .context(format!("Could not parse color {}!", css))?;
        Ok(RgbColor::new(tmp_color.r, tmp_color.g, tmp_color.b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbaColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<RgbColor> for RgbaColor {
    fn from(c: RgbColor) -> Self {
        c.with_alpha(255)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    Small,
    Large,
}

/// RenderSink accepts draw primitives in screen coordinates (pixels, y pointing down). Angles are
/// in degrees, counter-clockwise positive. Implementations never feed anything back to the
/// caller.
pub trait RenderSink {
    fn blit(&mut self, sprite: SpriteId, x: f64, y: f64);
    fn blit_rotated(&mut self, sprite: SpriteId, x: f64, y: f64, angle: f64);
    fn circle(&mut self, color: RgbaColor, center: (f64, f64), radius: f64);
    fn rect(&mut self, color: RgbaColor, x: f64, y: f64, w: f64, h: f64);
    fn line(&mut self, color: RgbaColor, from: (f64, f64), to: (f64, f64), width: f64);
    fn polygon(&mut self, color: RgbaColor, points: &[(f64, f64)]);
    fn text(&mut self, text: &str, x: f64, y: f64, size: TextSize, color: RgbaColor);
}

/// DrawCmd is the recorded form of a single RenderSink call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCmd {
    Blit {
        sprite: SpriteId,
        x: f64,
        y: f64,
    },
    BlitRotated {
        sprite: SpriteId,
        x: f64,
        y: f64,
        angle: f64,
    },
    Circle {
        color: RgbaColor,
        center: (f64, f64),
        radius: f64,
    },
    Rect {
        color: RgbaColor,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
    },
    Line {
        color: RgbaColor,
        from: (f64, f64),
        to: (f64, f64),
        width: f64,
    },
    Polygon {
        color: RgbaColor,
        points: Vec<(f64, f64)>,
    },
    Text {
        text: String,
        x: f64,
        y: f64,
        size: TextSize,
        color: RgbaColor,
    },
}

/// DrawList records draw commands in call order so that a frame can be shipped to another
/// thread or inspected.
#[derive(Debug, Clone, Default)]
pub struct DrawList {
    pub cmds: Vec<DrawCmd>,
}

impl DrawList {
    pub fn new() -> DrawList {
        DrawList { cmds: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.cmds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cmds.is_empty()
    }
}

impl RenderSink for DrawList {
    fn blit(&mut self, sprite: SpriteId, x: f64, y: f64) {
        self.cmds.push(DrawCmd::Blit { sprite, x, y });
    }

    fn blit_rotated(&mut self, sprite: SpriteId, x: f64, y: f64, angle: f64) {
        self.cmds.push(DrawCmd::BlitRotated {
            sprite,
            x,
            y,
            angle,
        });
    }

    fn circle(&mut self, color: RgbaColor, center: (f64, f64), radius: f64) {
        self.cmds.push(DrawCmd::Circle {
            color,
            center,
            radius,
        });
    }

    fn rect(&mut self, color: RgbaColor, x: f64, y: f64, w: f64, h: f64) {
        self.cmds.push(DrawCmd::Rect { color, x, y, w, h });
    }

    fn line(&mut self, color: RgbaColor, from: (f64, f64), to: (f64, f64), width: f64) {
        self.cmds.push(DrawCmd::Line {
            color,
            from,
            to,
            width,
        });
    }

    fn polygon(&mut self, color: RgbaColor, points: &[(f64, f64)]) {
        self.cmds.push(DrawCmd::Polygon {
            color,
            points: points.to_vec(),
        });
    }

    fn text(&mut self, text: &str, x: f64, y: f64, size: TextSize, color: RgbaColor) {
        self.cmds.push(DrawCmd::Text {
            text: text.to_owned(),
            x,
            y,
            size,
            color,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        let c = RgbColor::from_css("#e03030").unwrap();
        assert_eq!(c, RgbColor::new(0xe0, 0x30, 0x30));
        assert!(RgbColor::from_css("not-a-color").is_err());
    }

    #[test]
    fn draw_list_keeps_call_order() {
        let mut list = DrawList::new();
        list.circle(RgbColor::new(1, 2, 3).into(), (0.0, 0.0), 2.0);
        list.blit(SpriteId::PlayerCar, 5.0, 6.0);
        assert_eq!(list.len(), 2);
        assert!(matches!(list.cmds[0], DrawCmd::Circle { .. }));
        assert!(matches!(
            list.cmds[1],
            DrawCmd::Blit {
                sprite: SpriteId::PlayerCar,
                ..
            }
        ));
    }
}
