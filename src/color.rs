use crate::Error;
use bytemuck::{Pod, Zeroable};
use std::{fmt, str::FromStr};

/// Straight (not premultiplied) sRGBA color with 8-bit channels
///
/// The painter only looks at the alpha channel, it becomes the opacity of the
/// painted shape. Other channels are passed through to the compositor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct ColorU8(pub [u8; 4]);

impl ColorU8 {
    pub const WHITE: ColorU8 = ColorU8::new(255, 255, 255, 255);
    pub const BLACK: ColorU8 = ColorU8::new(0, 0, 0, 255);
    pub const TRANSPARENT: ColorU8 = ColorU8::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self([r, g, b, a])
    }

    pub const fn red(self) -> u8 {
        self.0[0]
    }

    pub const fn green(self) -> u8 {
        self.0[1]
    }

    pub const fn blue(self) -> u8 {
        self.0[2]
    }

    pub const fn alpha(self) -> u8 {
        self.0[3]
    }

    /// Same color with alpha replaced
    pub const fn with_alpha(self, alpha: u8) -> Self {
        let [r, g, b, _] = self.0;
        Self([r, g, b, alpha])
    }

    /// Same color with alpha multiplied by `factor` in `0.0..=1.0`
    ///
    /// Never fades a visible color to fully transparent.
    pub fn fade(self, factor: f64) -> Self {
        let alpha = self.alpha();
        if alpha == 0 {
            return self;
        }
        let faded = (alpha as f64 * factor.clamp(0.0, 1.0) + 0.5) as u8;
        self.with_alpha(faded.max(1))
    }

    /// Convert color to sRGBA list
    pub const fn to_rgba(self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Debug for ColorU8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ColorU8({})", self)
    }
}

impl fmt::Display for ColorU8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba();
        write!(f, "#{:02x}{:02x}{:02x}", r, g, b)?;
        if a != 255 {
            write!(f, "{:02x}", a)?;
        }
        Ok(())
    }
}

impl FromStr for ColorU8 {
    type Err = Error;

    fn from_str(color: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidColor(color.to_owned());
        let hex = match color.strip_prefix('#') {
            Some(hex) if hex.is_ascii() && (hex.len() == 6 || hex.len() == 8) => hex,
            _ => return Err(invalid()),
        };
        let mut rgba = [255u8; 4];
        for (index, value) in rgba.iter_mut().enumerate().take(hex.len() / 2) {
            *value = u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(rgba))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ColorU8 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ColorU8 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let color = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        color.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_u8() {
        let c = ColorU8::new(1, 2, 3, 4);
        assert_eq!([1, 2, 3, 4], c.to_rgba());
        assert_eq!(1, c.red());
        assert_eq!(2, c.green());
        assert_eq!(3, c.blue());
        assert_eq!(4, c.alpha());
        let bytes: &[u8] = bytemuck::cast_slice(std::slice::from_ref(&c));
        assert_eq!(bytes, &[1, 2, 3, 4]);
    }

    #[test]
    fn test_display_parse() -> Result<(), Error> {
        let c: ColorU8 = "#01020304".parse()?;
        assert_eq!(c, ColorU8::new(1, 2, 3, 4));
        assert_eq!(c.to_string(), "#01020304");

        let c: ColorU8 = "#aabbcc".parse()?;
        assert_eq!(c, ColorU8::new(170, 187, 204, 255));
        assert_eq!(c.to_string(), "#aabbcc");

        assert!("#abc".parse::<ColorU8>().is_err());
        assert!("#gg0000".parse::<ColorU8>().is_err());
        assert!("112233".parse::<ColorU8>().is_err());
        Ok(())
    }

    #[test]
    fn test_fade() {
        let c = ColorU8::new(10, 20, 30, 200);
        assert_eq!(c.fade(0.5).alpha(), 100);
        assert_eq!(c.fade(0.0).alpha(), 1);
        assert_eq!(c.fade(2.0).alpha(), 200);
        assert_eq!(ColorU8::TRANSPARENT.fade(0.5).alpha(), 0);
    }
}
