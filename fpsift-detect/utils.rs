//! Border and rounding helpers shared by the enhancement filters.

/// Reflect-101 border index (`gfedcb|abcdefgh|gfedcba`).
#[inline]
pub fn reflect_101(index: isize, len: usize) -> usize {
    let len = len as isize;
    if len == 1 {
        return 0;
    }
    let mut i = index;
    loop {
        if i < 0 {
            i = -i;
        } else if i >= len {
            i = 2 * len - 2 - i;
        } else {
            return i as usize;
        }
    }
}

/// Round and clamp to the u8 range.
#[inline]
pub fn saturate_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflect_101() {
        assert_eq!(reflect_101(-1, 5), 1);
        assert_eq!(reflect_101(-2, 5), 2);
        assert_eq!(reflect_101(5, 5), 3);
        assert_eq!(reflect_101(6, 5), 2);
        assert_eq!(reflect_101(2, 5), 2);
        assert_eq!(reflect_101(-3, 1), 0);
    }

    #[test]
    fn test_saturate_u8() {
        assert_eq!(saturate_u8(-3.0), 0);
        assert_eq!(saturate_u8(254.6), 255);
        assert_eq!(saturate_u8(300.0), 255);
        assert_eq!(saturate_u8(12.4), 12);
    }

    proptest::proptest! {
        #[test]
        fn prop_reflect_101_in_bounds(index in -500isize..500, len in 1usize..64) {
            let i = reflect_101(index, len);
            proptest::prop_assert!(i < len);
        }
    }
}
