use crate::candidate::EpsCandidate;

/// Reconcile table and text results for the same table.
///
/// When both strategies produced candidates, keep the table candidates whose
/// `(clean_year, eps_value)` the text strategy also found. When only one of
/// them produced anything there is nothing to check against, and its output
/// is returned as is.
pub fn cross_validate(table: Vec<EpsCandidate>, text: Vec<EpsCandidate>) -> Vec<EpsCandidate> {
    if table.is_empty() {
        return text;
    }
    if text.is_empty() {
        return table;
    }

    let before = table.len();
    let agreed: Vec<EpsCandidate> = table
        .into_iter()
        .filter(|t| text.iter().any(|x| t.same_observation(x)))
        .collect();
    tracing::debug!(
        table = before,
        text = text.len(),
        agreed = agreed.len(),
        "cross-validated table against text"
    );
    agreed
}

#[cfg(test)]
mod tests {
    use super::*;
    use eps_harvest_core::EpsValue;

    fn cand(year: &str, eps: i64) -> EpsCandidate {
        EpsCandidate {
            raw_year: year.to_string(),
            clean_year: year.to_string(),
            eps_value: EpsValue::Integer(eps),
            is_forecast: true,
        }
    }

    #[test]
    fn test_intersection() {
        let table = vec![cand("2023", 4000)];
        let text = vec![cand("2023", 4000), cand("2024", 4500)];
        assert_eq!(cross_validate(table, text), vec![cand("2023", 4000)]);
    }

    #[test]
    fn test_disagreement_drops_value() {
        let table = vec![cand("2023", 4000), cand("2024", 4600)];
        let text = vec![cand("2023", 4000), cand("2024", 4500)];
        assert_eq!(cross_validate(table, text), vec![cand("2023", 4000)]);
    }

    #[test]
    fn test_one_sided_results_pass_through() {
        let only = vec![cand("2023", 4000)];
        assert_eq!(cross_validate(only.clone(), Vec::new()), only);
        assert_eq!(cross_validate(Vec::new(), only.clone()), only);
        assert!(cross_validate(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_integer_and_decimal_agree() {
        let mut decimal = cand("2023", 0);
        decimal.eps_value = EpsValue::Decimal(4000.0);
        let table = vec![cand("2023", 4000)];
        assert_eq!(cross_validate(table, vec![decimal]).len(), 1);
    }
}
