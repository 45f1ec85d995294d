use std::cmp::Ordering;

use crate::model::Numero;

fn suffix(numero: &Numero) -> Option<&str> {
    numero.suffixe.as_deref().filter(|s| !s.is_empty())
}

/// Orders by numeric value, then by suffix with the bare number first.
pub fn compare_numeros(a: &Numero, b: &Numero) -> Ordering {
    a.numero
        .cmp(&b.numero)
        .then_with(|| suffix(a).cmp(&suffix(b)))
}

/// Stable sort of numeros along a voie.
pub fn sort_by_numero(mut numeros: Vec<Numero>) -> Vec<Numero> {
    numeros.sort_by(compare_numeros);
    numeros
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(numeros: &[Numero]) -> Vec<(u32, Option<&str>)> {
        numeros
            .iter()
            .map(|n| (n.numero, n.suffixe.as_deref()))
            .collect()
    }

    #[test]
    fn test_value_then_suffix() {
        let sorted = sort_by_numero(vec![
            Numero::new(12, Some("bis")),
            Numero::new(12, None),
            Numero::new(5, None),
        ]);
        assert_eq!(
            keys(&sorted),
            vec![(5, None), (12, None), (12, Some("bis"))]
        );
    }

    #[test]
    fn test_suffixes_are_lexicographic() {
        let sorted = sort_by_numero(vec![
            Numero::new(3, Some("ter")),
            Numero::new(3, Some("a")),
            Numero::new(3, Some("bis")),
            Numero::new(2, Some("ter")),
        ]);
        assert_eq!(
            keys(&sorted),
            vec![(2, Some("ter")), (3, Some("a")), (3, Some("bis")), (3, Some("ter"))]
        );
    }

    #[test]
    fn test_empty_suffix_counts_as_absent() {
        let sorted = sort_by_numero(vec![Numero::new(7, Some("a")), Numero::new(7, Some(""))]);
        assert_eq!(keys(&sorted), vec![(7, Some("")), (7, Some("a"))]);
    }

    #[test]
    fn test_stable_for_equal_keys() {
        let mut first = Numero::new(4, Some("bis"));
        first.source = Some("first".into());
        let mut second = Numero::new(4, Some("bis"));
        second.source = Some("second".into());
        let sorted = sort_by_numero(vec![first, Numero::new(1, None), second]);
        let sources: Vec<_> = sorted.iter().map(|n| n.source.as_deref()).collect();
        assert_eq!(sources, vec![None, Some("first"), Some("second")]);
    }
}
