use std::fmt;

/// Bit indices of the processing flag band
pub const FLAG_INDEX_RTOSA_OOS: u32 = 0;
pub const FLAG_INDEX_RTOSA_OOR: u32 = 1;
pub const FLAG_INDEX_RHOW_OOR: u32 = 2;
pub const FLAG_INDEX_VALID_PE: u32 = 31;

/// Bitmask of independent per-pixel conditions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct InversionFlags(u32);

impl InversionFlags {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Set or clear one bit
    pub fn set(&mut self, index: u32, value: bool) {
        debug_assert!(index < 32);
        if value {
            self.0 |= 1 << index;
        } else {
            self.0 &= !(1 << index);
        }
    }

    pub fn with(mut self, index: u32, value: bool) -> Self {
        self.set(index, value);
        self
    }

    pub fn is_set(self, index: u32) -> bool {
        self.0 & (1 << index) != 0
    }

    pub fn tosa_out_of_scope(self) -> bool {
        self.is_set(FLAG_INDEX_RTOSA_OOS)
    }

    pub fn tosa_out_of_range(self) -> bool {
        self.is_set(FLAG_INDEX_RTOSA_OOR)
    }

    pub fn rhow_out_of_range(self) -> bool {
        self.is_set(FLAG_INDEX_RHOW_OOR)
    }

    pub fn valid(self) -> bool {
        self.is_set(FLAG_INDEX_VALID_PE)
    }
}

impl From<InversionFlags> for u32 {
    fn from(flags: InversionFlags) -> u32 {
        flags.0
    }
}

impl fmt::Display for InversionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        for (index, name) in FLAG_CODING {
            if self.is_set(*index) {
                names.push(*name);
            }
        }
        write!(f, "[{}]", names.join(", "))
    }
}

/// Flag names and descriptions, in the order they are written to the flag band
pub const FLAG_CODING: &[(u32, &str)] = &[
    (FLAG_INDEX_RTOSA_OOS, "Rtosa_OOS"),
    (FLAG_INDEX_RTOSA_OOR, "Rtosa_OOR"),
    (FLAG_INDEX_RHOW_OOR, "Rhow_OOR"),
    (FLAG_INDEX_VALID_PE, "Valid_PE"),
];

/// True if any element of `input` lies outside `[min[i], max[i]]`
pub fn is_out_of_range(input: &[f64], min: &[f64], max: &[f64]) -> bool {
    input
        .iter()
        .zip(min.iter().zip(max))
        .any(|(&v, (&lo, &hi))| v < lo || v > hi || v.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_clear() {
        let mut flags = InversionFlags::empty();
        flags.set(FLAG_INDEX_RHOW_OOR, true);
        flags.set(FLAG_INDEX_VALID_PE, true);
        assert_eq!(flags.bits(), (1 << 2) | (1 << 31));
        assert!(flags.rhow_out_of_range());
        assert!(!flags.tosa_out_of_scope());

        flags.set(FLAG_INDEX_RHOW_OOR, false);
        assert_eq!(flags.bits(), 1 << 31);
    }

    #[test]
    fn test_display_lists_set_flags() {
        let flags = InversionFlags::empty()
            .with(FLAG_INDEX_RTOSA_OOS, true)
            .with(FLAG_INDEX_VALID_PE, true);
        assert_eq!(flags.to_string(), "[Rtosa_OOS, Valid_PE]");
    }

    #[test]
    fn test_range_check() {
        let min = [0.0, 0.0];
        let max = [1.0, 1.0];
        assert!(!is_out_of_range(&[0.0, 1.0], &min, &max));
        assert!(is_out_of_range(&[0.5, 2.0], &min, &max));
        assert!(is_out_of_range(&[-0.1, 0.5], &min, &max));
        assert!(is_out_of_range(&[f64::NAN, 0.5], &min, &max));
    }
}
