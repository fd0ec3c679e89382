//! The two-way bijection between color numbers and register names used by
//! the allocator (spec.md §3's "auxiliary entities").

use super::x86::Register;

/// `color_to_register(c)` and `Register::precolor` are the two halves of the
/// bijection; kept as a free function alongside `Register::precolor` rather
/// than a generic map type, since the domain is the fixed 11-register set.
pub fn color_to_register(color: i64) -> Option<Register> {
    if color < 0 {
        return None;
    }
    Register::ALLOCATABLE.get(color as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bijection_round_trips() {
        for (i, r) in Register::ALLOCATABLE.iter().enumerate() {
            assert_eq!(r.precolor(), i as i64);
            assert_eq!(color_to_register(i as i64), Some(*r));
        }
    }
}
