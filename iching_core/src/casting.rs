//! Casting engine: six random lines in, hexagram numbers out.
//!
//! Resolution works on the binary signature of a cast. Each line contributes
//! `1` when solid (7 or 9) and `0` when broken (6 or 8), read from the top
//! line down. That orientation is the one used by `binary_code` in the
//! reference table.

use crate::error::HexagramRole;
use crate::types::{Cast, HexagramPair, LineValue, Signatures, LINE_COUNT};
use crate::{Error, Result};
use rand::Rng;
use std::collections::HashMap;

/// Cast six lines, each drawn independently and uniformly from 6/7/8/9
pub fn cast_lines<R: Rng + ?Sized>(rng: &mut R) -> Cast {
    let mut lines = [LineValue::YoungYang; LINE_COUNT];
    for line in lines.iter_mut() {
        *line = LineValue::ALL[rng.random_range(0..LineValue::ALL.len())];
    }
    tracing::debug!("Cast lines {:?}", lines.map(LineValue::value));
    Cast::new(lines)
}

/// Compute the primary signature, the secondary signature (when any line is
/// changing) and the changing-line positions of a cast
pub fn resolve_signatures(cast: &Cast) -> Signatures {
    Signatures {
        primary: cast.signature(),
        secondary: cast.secondary().map(|settled| settled.signature()),
        changing_lines: cast.changing_positions(),
    }
}

/// Map signatures to hexagram numbers through the table's signature index
///
/// A miss is never papered over with a default hexagram: it is reported as
/// `HexagramNotFound` with the role that failed.
pub fn resolve_hexagram_numbers(
    signatures: &Signatures,
    signature_index: &HashMap<String, u8>,
) -> Result<HexagramPair> {
    let primary = signature_index
        .get(&signatures.primary)
        .copied()
        .ok_or_else(|| Error::HexagramNotFound {
            role: HexagramRole::Primary,
            signature: signatures.primary.clone(),
        })?;

    let secondary = match &signatures.secondary {
        Some(signature) => Some(signature_index.get(signature).copied().ok_or_else(|| {
            Error::HexagramNotFound {
                role: HexagramRole::Secondary,
                signature: signature.clone(),
            }
        })?),
        None => None,
    };

    tracing::debug!(
        "Resolved {} -> {} and {:?} -> {:?}",
        signatures.primary,
        primary,
        signatures.secondary,
        secondary
    );

    Ok(HexagramPair { primary, secondary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ReferenceTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn cast(values: &[u8]) -> Cast {
        Cast::from_values(values).unwrap()
    }

    #[test]
    fn test_cast_lines_is_deterministic_with_seed() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..20 {
            assert_eq!(cast_lines(&mut a), cast_lines(&mut b));
        }
    }

    #[test]
    fn test_cast_lines_produces_all_values() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut counts = [0usize; 4];
        for _ in 0..500 {
            for line in cast_lines(&mut rng).lines() {
                counts[(line.value() - 6) as usize] += 1;
            }
        }
        // 3000 draws; each value should land near 750
        for count in counts {
            assert!(count > 600 && count < 900, "counts: {:?}", counts);
        }
    }

    #[test]
    fn test_signatures_are_six_binary_chars() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let sigs = resolve_signatures(&cast_lines(&mut rng));
            assert_eq!(sigs.primary.len(), 6);
            assert!(sigs.primary.chars().all(|c| c == '0' || c == '1'));
            if let Some(secondary) = &sigs.secondary {
                assert_eq!(secondary.len(), 6);
                assert!(secondary.chars().all(|c| c == '0' || c == '1'));
            }
        }
    }

    #[test]
    fn test_changing_positions_match_old_lines() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..200 {
            let c = cast_lines(&mut rng);
            let expected: Vec<usize> = c
                .lines()
                .iter()
                .enumerate()
                .filter(|(_, l)| matches!(l.value(), 6 | 9))
                .map(|(i, _)| i)
                .collect();
            assert_eq!(resolve_signatures(&c).changing_lines, expected);
        }
    }

    #[test]
    fn test_stable_cast_has_no_secondary() {
        let sigs = resolve_signatures(&cast(&[7, 8, 8, 7, 7, 8]));
        assert_eq!(sigs.secondary, None);
        assert!(sigs.changing_lines.is_empty());
        assert_eq!(sigs.primary, "011001");
    }

    #[test]
    fn test_all_young_yang() {
        let sigs = resolve_signatures(&cast(&[7, 7, 7, 7, 7, 7]));
        assert_eq!(sigs.primary, "111111");
        assert_eq!(sigs.secondary, None);
        assert!(sigs.changing_lines.is_empty());

        let table = ReferenceTable::bundled().unwrap();
        let pair = resolve_hexagram_numbers(&sigs, table.signature_index()).unwrap();
        assert_eq!(pair.primary, 1);
        assert_eq!(pair.secondary, None);
    }

    #[test]
    fn test_single_changing_bottom_line() {
        let c = cast(&[6, 7, 8, 7, 8, 7]);
        let sigs = resolve_signatures(&c);

        assert_eq!(sigs.changing_lines, vec![0]);
        assert_eq!(c.secondary(), Some(cast(&[7, 7, 8, 7, 8, 7])));
        assert_eq!(sigs.primary, "101010");
        assert_eq!(sigs.secondary.as_deref(), Some("101011"));

        // The bottom line is the last character of a topmost-first signature
        let differing: Vec<usize> = sigs
            .primary
            .chars()
            .zip(sigs.secondary.as_deref().unwrap().chars())
            .enumerate()
            .filter(|(_, (a, b))| a != b)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(differing, vec![5]);

        let table = ReferenceTable::bundled().unwrap();
        let pair = resolve_hexagram_numbers(&sigs, table.signature_index()).unwrap();
        assert_eq!(pair.primary, 64);
        assert_eq!(pair.secondary, Some(38));
    }

    #[test]
    fn test_secondary_differs_exactly_at_changing_lines() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..200 {
            let c = cast_lines(&mut rng);
            let sigs = resolve_signatures(&c);
            let Some(secondary) = sigs.secondary else {
                continue;
            };
            let mut flipped: Vec<usize> = sigs
                .primary
                .chars()
                .zip(secondary.chars())
                .enumerate()
                .filter(|(_, (a, b))| a != b)
                .map(|(i, _)| LINE_COUNT - 1 - i)
                .collect();
            flipped.sort_unstable();
            assert_eq!(flipped, sigs.changing_lines);
        }
    }

    #[test]
    fn test_every_cast_resolves_against_bundled_table() {
        let table = ReferenceTable::bundled().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..500 {
            let sigs = resolve_signatures(&cast_lines(&mut rng));
            let pair = resolve_hexagram_numbers(&sigs, table.signature_index()).unwrap();
            assert!((1..=64).contains(&pair.primary));
            assert_eq!(pair.secondary.is_some(), sigs.secondary.is_some());
        }
    }

    #[test]
    fn test_lookup_miss_on_empty_table() {
        let empty = HashMap::new();
        let sigs = resolve_signatures(&cast(&[7, 7, 7, 7, 7, 7]));
        let err = resolve_hexagram_numbers(&sigs, &empty).unwrap_err();
        assert!(matches!(
            err,
            Error::HexagramNotFound {
                role: HexagramRole::Primary,
                ref signature,
            } if signature == "111111"
        ));
    }

    #[test]
    fn test_secondary_miss_is_distinguishable() {
        let mut index = HashMap::new();
        index.insert("101010".to_string(), 64);

        let sigs = resolve_signatures(&cast(&[6, 7, 8, 7, 8, 7]));
        let err = resolve_hexagram_numbers(&sigs, &index).unwrap_err();
        assert!(matches!(
            err,
            Error::HexagramNotFound {
                role: HexagramRole::Secondary,
                ..
            }
        ));
    }
}
