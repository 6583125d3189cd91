//! Completeness scoring

use crate::types::DataType;

/// Weighted share (0-100) of data types resolved
///
/// Each weighted type counts once however many times it appears.
pub fn completeness_score<'a, I>(resolved: I) -> u8
where
    I: IntoIterator<Item = &'a DataType>,
{
    let mut seen: Vec<DataType> = Vec::new();
    let mut total: u32 = 0;
    for data_type in resolved {
        if !seen.contains(data_type) {
            seen.push(*data_type);
            total += data_type.completeness_weight() as u32;
        }
    }
    total.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(completeness_score(std::iter::empty()), 0);
    }

    #[test]
    fn test_all_types_is_100() {
        assert_eq!(completeness_score(&DataType::ALL), 100);
    }

    #[test]
    fn test_comprehensive_adds_nothing() {
        assert_eq!(
            completeness_score(&[DataType::Basic, DataType::Comprehensive]),
            30
        );
    }

    #[test]
    fn test_duplicates_counted_once() {
        assert_eq!(completeness_score(&[DataType::Mot, DataType::Mot]), 20);
    }

    #[test]
    fn test_monotonic_in_resolved_types() {
        let mut resolved = Vec::new();
        let mut previous = 0;
        for data_type in DataType::ALL {
            resolved.push(data_type);
            let score = completeness_score(&resolved);
            assert!(score >= previous);
            previous = score;
        }
    }
}
