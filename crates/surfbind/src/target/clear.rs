use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Which planes to clear when a pass starts.
///
/// Bit values match the GL clear mask bits so the framebuffer backend can pass
/// them straight through.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct Clear(u32);

impl Clear {
    pub const NONE: Clear = Clear(0);
    pub const DEPTH: Clear = Clear(0x0100);
    pub const STENCIL: Clear = Clear(0x0400);
    pub const COLOR: Clear = Clear(0x4000);
    pub const COLOR_DEPTH: Clear = Clear(0x4100);
    pub const COLOR_STENCIL: Clear = Clear(0x4400);
    pub const DEPTH_STENCIL: Clear = Clear(0x0500);
    pub const ALL: Clear = Clear(0x4500);

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Keeps only the known plane bits.
    #[inline]
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Clear(bits & Self::ALL.0)
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn contains(self, other: Clear) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl From<bool> for Clear {
    #[inline]
    fn from(clear: bool) -> Self {
        if clear { Clear::ALL } else { Clear::NONE }
    }
}

impl BitOr for Clear {
    type Output = Clear;
    #[inline]
    fn bitor(self, rhs: Clear) -> Clear {
        Clear(self.0 | rhs.0)
    }
}

impl BitOrAssign for Clear {
    #[inline]
    fn bitor_assign(&mut self, rhs: Clear) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Clear {
    type Output = Clear;
    #[inline]
    fn bitand(self, rhs: Clear) -> Clear {
        Clear(self.0 & rhs.0)
    }
}

impl core::fmt::Debug for Clear {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_none() {
            return f.write_str("Clear(NONE)");
        }
        let mut parts = Vec::with_capacity(3);
        if self.contains(Clear::COLOR) {
            parts.push("COLOR");
        }
        if self.contains(Clear::DEPTH) {
            parts.push("DEPTH");
        }
        if self.contains(Clear::STENCIL) {
            parts.push("STENCIL");
        }
        write!(f, "Clear({})", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_maps_to_all_or_none() {
        assert_eq!(Clear::from(true), Clear::ALL);
        assert_eq!(Clear::from(false), Clear::NONE);
    }

    #[test]
    fn combos_are_unions() {
        assert_eq!(Clear::COLOR | Clear::DEPTH, Clear::COLOR_DEPTH);
        assert_eq!(Clear::DEPTH | Clear::STENCIL, Clear::DEPTH_STENCIL);
        assert_eq!(Clear::COLOR | Clear::DEPTH | Clear::STENCIL, Clear::ALL);
    }

    #[test]
    fn contains_checks_planes() {
        assert!(Clear::ALL.contains(Clear::STENCIL));
        assert!(!Clear::COLOR.contains(Clear::STENCIL));
        assert!(!Clear::COLOR.contains(Clear::NONE));
    }

    #[test]
    fn matches_gl_bits() {
        assert_eq!(Clear::COLOR.bits(), glow::COLOR_BUFFER_BIT);
        assert_eq!(Clear::DEPTH.bits(), glow::DEPTH_BUFFER_BIT);
        assert_eq!(Clear::STENCIL.bits(), glow::STENCIL_BUFFER_BIT);
    }

    #[test]
    fn truncates_unknown_bits() {
        assert_eq!(Clear::from_bits_truncate(0xffff_ffff), Clear::ALL);
    }
}
