use fixed::types::I32F32;

/// Layout length in points, held as fixed-point and quantized to 1/1000 pt so
/// that identical inputs always produce identical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Pt(I32F32);

impl Pt {
    pub const ZERO: Pt = Pt(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Pt {
        if !value.is_finite() {
            return Pt::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Pt::from_milli_i64(milli)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn from_milli_i64(milli: i64) -> Pt {
        let denom = 1i128 << 32;
        let milli = milli as i128;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Pt(I32F32::from_bits(bits))
    }

    pub fn max(self, other: Pt) -> Pt {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Pt) -> Pt {
        if self <= other { self } else { other }
    }

    pub fn is_positive(self) -> bool {
        self > Pt::ZERO
    }
}

impl std::ops::Add for Pt {
    type Output = Pt;
    fn add(self, rhs: Pt) -> Pt {
        Pt::from_milli_i64(self.to_milli_i64().saturating_add(rhs.to_milli_i64()))
    }
}

impl std::ops::AddAssign for Pt {
    fn add_assign(&mut self, rhs: Pt) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Pt {
    type Output = Pt;
    fn sub(self, rhs: Pt) -> Pt {
        Pt::from_milli_i64(self.to_milli_i64().saturating_sub(rhs.to_milli_i64()))
    }
}

impl std::ops::SubAssign for Pt {
    fn sub_assign(&mut self, rhs: Pt) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<f32> for Pt {
    type Output = Pt;
    fn mul(self, rhs: f32) -> Pt {
        if !rhs.is_finite() {
            return Pt::ZERO;
        }
        Pt::from_f32(self.to_f32() * rhs)
    }
}

impl std::ops::Div<f32> for Pt {
    type Output = Pt;
    fn div(self, rhs: f32) -> Pt {
        if rhs == 0.0 || !rhs.is_finite() {
            Pt::ZERO
        } else {
            Pt::from_f32(self.to_f32() / rhs)
        }
    }
}

impl std::ops::Neg for Pt {
    type Output = Pt;
    fn neg(self) -> Pt {
        Pt::from_milli_i64(-self.to_milli_i64())
    }
}

impl std::iter::Sum for Pt {
    fn sum<I: Iterator<Item = Pt>>(iter: I) -> Pt {
        iter.fold(Pt::ZERO, |acc, v| acc + v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Pt,
    pub height: Pt,
}

impl Size {
    pub fn a4() -> Self {
        Self {
            width: Pt::from_f32(595.28),
            height: Pt::from_f32(841.89),
        }
    }

    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: Pt::from_f32(width),
            height: Pt::from_f32(height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Pt,
    pub y: Pt,
    pub width: Pt,
    pub height: Pt,
}

impl Rect {
    pub fn inset(self, edges: Margins) -> Rect {
        Rect {
            x: self.x + edges.left,
            y: self.y + edges.top,
            width: (self.width - edges.left - edges.right).max(Pt::ZERO),
            height: (self.height - edges.top - edges.bottom).max(Pt::ZERO),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: Pt,
    pub right: Pt,
    pub bottom: Pt,
    pub left: Pt,
}

impl Margins {
    pub fn all(value: f32) -> Self {
        let v = Pt::from_f32(value);
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(self) -> Pt {
        self.left + self.right
    }

    pub fn vertical(self) -> Pt {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub const fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xFF) as f32 / 255.0,
            g: ((value >> 8) & 0xFF) as f32 / 255.0,
            b: (value & 0xFF) as f32 / 255.0,
        }
    }
}

/// Material palette entries used by the valuation template.
pub mod palette {
    use super::Color;

    pub const GREEN_MEDIUM: Color = Color::hex(0x4CAF50);
    pub const GREEN_DARKEN1: Color = Color::hex(0x43A047);
    pub const RED_MEDIUM: Color = Color::hex(0xF44336);
    pub const RED_DARKEN1: Color = Color::hex(0xE53935);
    pub const RED_DARKEN4: Color = Color::hex(0xB71C1C);
    pub const BLUE_MEDIUM: Color = Color::hex(0x2196F3);
    pub const BLUE_DARKEN1: Color = Color::hex(0x1E88E5);
    pub const BLUE_DARKEN2: Color = Color::hex(0x1976D2);
    pub const BLUE_LIGHTEN4: Color = Color::hex(0xBBDEFB);
    pub const GREY_LIGHTEN5: Color = Color::hex(0xFAFAFA);
    pub const GREY_LIGHTEN2: Color = Color::hex(0xE0E0E0);
    pub const GREY_LIGHTEN1: Color = Color::hex(0xBDBDBD);
    pub const GREY_MEDIUM: Color = Color::hex(0x9E9E9E);
    pub const GREY_DARKEN2: Color = Color::hex(0x616161);
    pub const BROWN_DARKEN1: Color = Color::hex(0x6D4C41);
    pub const PURPLE_DARKEN1: Color = Color::hex(0x8E24AA);
    pub const ORANGE_LIGHTEN3: Color = Color::hex(0xFFB74D);
    pub const ORANGE_DARKEN1: Color = Color::hex(0xFB8C00);
    pub const YELLOW_MEDIUM: Color = Color::hex(0xFFEB3B);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pt_quantizes_to_milli_points() {
        assert_eq!(Pt::from_f32(1.0004).to_milli_i64(), 1000);
        assert_eq!(Pt::from_f32(1.0006).to_milli_i64(), 1001);
        assert_eq!(Pt::from_f32(f32::NAN), Pt::ZERO);
    }

    #[test]
    fn pt_arithmetic_stays_on_milli_grid() {
        let a = Pt::from_f32(0.1);
        let b = Pt::from_f32(0.2);
        assert_eq!((a + b).to_milli_i64(), 300);
        assert_eq!((b - a).to_milli_i64(), 100);
        assert_eq!((Pt::from_f32(10.0) / 3.0).to_milli_i64(), 3333);
        assert_eq!(Pt::from_f32(7.0) / 0.0, Pt::ZERO);
    }

    #[test]
    fn rect_inset_never_goes_negative() {
        let rect = Rect {
            x: Pt::ZERO,
            y: Pt::ZERO,
            width: Pt::from_f32(10.0),
            height: Pt::from_f32(10.0),
        };
        let inner = rect.inset(Margins::all(8.0));
        assert_eq!(inner.width, Pt::ZERO);
        assert_eq!(inner.x.to_milli_i64(), 8000);
    }

    #[test]
    fn hex_colors_map_to_unit_channels() {
        let c = Color::hex(0xFF0080);
        assert_eq!(c.r, 1.0);
        assert_eq!(c.g, 0.0);
        assert!((c.b - 128.0 / 255.0).abs() < 1e-6);
    }
}
