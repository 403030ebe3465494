use crate::{
    normalize::Normalized,
    position::{Custody, Namespace},
};

/// Concatenates the positions held in the wallet with the ones deposited in
/// the current and the legacy farming center.
///
/// The merged list only exists once all three groups resolved; loading is
/// reported while any of them is loading. Farmed records are tagged here,
/// during concatenation.
pub fn merge(native: Normalized, farmed: Normalized, old_farmed: Normalized) -> Normalized {
    let loading = native.loading || farmed.loading || old_farmed.loading;
    let positions = match (native.positions, farmed.positions, old_farmed.positions) {
        (Some(native), Some(farmed), Some(old_farmed)) => Some(
            native
                .into_iter()
                .chain(farmed.into_iter().map(|mut position| {
                    position.custody = Custody::Farming;
                    position
                }))
                .chain(old_farmed.into_iter().map(|mut position| {
                    position.custody = Custody::OldFarming;
                    position
                }))
                .collect(),
        ),
        _ => None,
    };
    Normalized { loading, positions }
}

/// The alternate manager has no farming center, so its positions are only
/// tagged with their namespace.
pub fn merge_alternate(normalized: Normalized) -> Normalized {
    Normalized {
        loading: normalized.loading,
        positions: normalized.positions.map(|positions| {
            positions
                .into_iter()
                .map(|mut position| {
                    position.namespace = Namespace::Alternate;
                    position
                })
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::position::{PositionRecord, RawPosition},
        alloy::primitives::U256,
    };

    fn group(ids: &[u64]) -> Normalized {
        Normalized::loaded(
            ids.iter()
                .map(|id| {
                    PositionRecord::new(U256::from(*id), RawPosition::default(), Namespace::Primary)
                })
                .collect(),
        )
    }

    #[test]
    fn concatenates_in_source_order() {
        let merged = merge(group(&[1, 2]), group(&[3]), group(&[4, 5, 6]));
        let positions = merged.positions.unwrap();
        assert_eq!(positions.len(), 6);
        assert_eq!(
            positions.iter().map(|p| p.custody).collect::<Vec<_>>(),
            vec![
                Custody::Wallet,
                Custody::Wallet,
                Custody::Farming,
                Custody::OldFarming,
                Custody::OldFarming,
                Custody::OldFarming,
            ]
        );
        assert!(positions[2].on_farming());
        assert!(positions[3].old_farming());
    }

    #[test]
    fn missing_group_hides_the_merge() {
        for merged in [
            merge(Normalized::default(), group(&[1]), group(&[2])),
            merge(group(&[1]), Normalized::default(), group(&[2])),
            merge(group(&[1]), group(&[2]), Normalized::default()),
        ] {
            assert_eq!(merged.positions, None);
        }
    }

    #[test]
    fn loading_is_or_of_all_groups() {
        let loading = Normalized {
            loading: true,
            positions: None,
        };
        assert!(merge(group(&[]), group(&[]), loading.clone()).loading);
        assert!(merge(loading, group(&[]), group(&[])).loading);
        assert!(!merge(group(&[]), group(&[]), group(&[])).loading);
    }

    #[test]
    fn alternate_positions_are_tagged() {
        let merged = merge_alternate(group(&[1, 2]));
        let positions = merged.positions.unwrap();
        assert!(positions.iter().all(PositionRecord::is_alternate));
        assert!(positions.iter().all(|p| p.custody == Custody::Wallet));

        assert_eq!(merge_alternate(Normalized::default()).positions, None);
    }
}
