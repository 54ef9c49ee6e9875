use std::collections::HashMap;

use crate::domain::{CorrelatedResult, IdentifierRecord, TitleRecord};

/// One entry per identifier, in identifier order. When a title payload
/// repeats an identifier, the later entry wins.
pub fn correlate(identifiers: &[IdentifierRecord], titles: &[TitleRecord]) -> Vec<CorrelatedResult> {
    let mut lookup = HashMap::with_capacity(titles.len());
    for title in titles {
        lookup.insert(title.identifier.as_str(), title);
    }
    identifiers
        .iter()
        .map(|record| match lookup.get(record.identifier.as_str()) {
            Some(found) => {
                let result = CorrelatedResult::new(record.identifier.as_str(), found.title.as_str());
                match &found.accession {
                    Some(accession) => result.with_accession(accession.as_str()),
                    None => result,
                }
            }
            None => CorrelatedResult::new(record.identifier.as_str(), ""),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<IdentifierRecord> {
        values.iter().copied().map(IdentifierRecord::new).collect()
    }

    #[test]
    fn order_follows_identifiers() {
        let titles = vec![TitleRecord::new("B", "Water")];
        let results = correlate(&ids(&["A", "B", "C"]), &titles);
        assert_eq!(
            results,
            vec![
                CorrelatedResult::new("A", ""),
                CorrelatedResult::new("B", "Water"),
                CorrelatedResult::new("C", ""),
            ]
        );
    }

    #[test]
    fn title_order_is_irrelevant() {
        let titles = vec![
            TitleRecord::new("2XYZ", "Myoglobin"),
            TitleRecord::new("1ABC", "Hemoglobin"),
        ];
        let results = correlate(&ids(&["1ABC", "2XYZ"]), &titles);
        assert_eq!(results[0].title, "Hemoglobin");
        assert_eq!(results[1].title, "Myoglobin");
    }

    #[test]
    fn repeated_title_last_write_wins() {
        let titles = vec![
            TitleRecord::new("1ABC", "first"),
            TitleRecord::new("1ABC", "second"),
        ];
        let results = correlate(&ids(&["1ABC"]), &titles);
        assert_eq!(results[0].title, "second");
    }

    #[test]
    fn identifiers_match_case_sensitively() {
        let titles = vec![TitleRecord::new("1abc", "lower")];
        let results = correlate(&ids(&["1ABC"]), &titles);
        assert!(!results[0].has_title());
    }

    #[test]
    fn repeated_identifiers_are_neither_merged_nor_dropped() {
        let titles = vec![TitleRecord::new("A", "Alpha")];
        let results = correlate(&ids(&["A", "B", "A"]), &titles);
        assert_eq!(results.len(), 3);
        assert_eq!(results[2], CorrelatedResult::new("A", "Alpha"));
    }

    #[test]
    fn accession_travels_with_its_title() {
        let titles = vec![
            TitleRecord::new("1159487", "Deoxy Human Hemoglobin").with_accession("1A3N"),
            TitleRecord::new("1159487", "Deoxy Human Hemoglobin, refined").with_accession("1A3N"),
        ];
        let results = correlate(&ids(&["64830", "1159487"]), &titles);
        assert_eq!(
            results,
            vec![
                CorrelatedResult::new("64830", ""),
                CorrelatedResult::new("1159487", "Deoxy Human Hemoglobin, refined")
                    .with_accession("1A3N"),
            ]
        );
    }

    #[test]
    fn unknown_titles_are_ignored() {
        let titles = vec![TitleRecord::new("Z", "Stray")];
        let results = correlate(&ids(&["A"]), &titles);
        assert_eq!(results, vec![CorrelatedResult::new("A", "")]);
    }
}
