//! Maps position detail lookups into [`PositionRecord`]s.

use {
    crate::{
        position::{Namespace, PositionRecord, RawPosition},
        read::{self, CallState},
    },
    alloy::primitives::U256,
};

/// Output shared by the normalizer, the merger and the retention policy.
///
/// `positions` is `None` while the set is unavailable: still loading, failed,
/// or not requested yet. It is never a partial list.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Normalized {
    pub loading: bool,
    pub positions: Option<Vec<PositionRecord>>,
}

impl Normalized {
    pub fn loaded(positions: Vec<PositionRecord>) -> Self {
        Self {
            loading: false,
            positions: Some(positions),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positions.as_ref().is_none_or(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.positions.as_ref().map_or(0, Vec::len)
    }
}

/// Builds one record per token id, in token id order.
///
/// Loading is all-or-nothing: a single pending lookup hides the whole set.
/// Any failed lookup makes the whole set unavailable since partial position
/// data would misstate the exposure of the owner.
pub fn normalize(
    token_ids: Option<&[U256]>,
    results: &[CallState<RawPosition>],
    namespace: Namespace,
) -> Normalized {
    let loading = read::any_loading(results);
    if loading {
        return Normalized {
            loading,
            positions: None,
        };
    }
    let Some(token_ids) = token_ids else {
        return Normalized::default();
    };
    if read::any_error(results) {
        tracing::debug!(namespace = namespace.as_str(), "position details unavailable");
        return Normalized::default();
    }
    if token_ids.len() != results.len() {
        tracing::warn!(
            namespace = namespace.as_str(),
            ids = token_ids.len(),
            results = results.len(),
            "position detail batch does not match the requested ids"
        );
        return Normalized::default();
    }

    let positions = token_ids
        .iter()
        .zip(results)
        .map(|(token_id, call)| {
            call.value()
                .map(|raw| PositionRecord::new(*token_id, raw.clone(), namespace))
        })
        .collect::<Option<Vec<_>>>();
    Normalized {
        loading: false,
        positions,
    }
}

/// Single position variant of [`normalize`].
pub fn normalize_one(
    token_id: Option<U256>,
    result: Option<&CallState<RawPosition>>,
    namespace: Namespace,
) -> (bool, Option<PositionRecord>) {
    let ids = token_id.map(|id| vec![id]);
    let results = result.cloned().into_iter().collect::<Vec<_>>();
    let normalized = normalize(ids.as_deref(), &results, namespace);
    (
        normalized.loading,
        normalized
            .positions
            .and_then(|positions| positions.into_iter().next()),
    )
}

#[cfg(test)]
mod tests {
    use {super::*, crate::position::Custody};

    fn raw(liquidity: u128) -> RawPosition {
        RawPosition {
            fee: 500,
            tick_lower: -60,
            tick_upper: 60,
            liquidity,
            ..Default::default()
        }
    }

    fn ids(ids: &[u64]) -> Vec<U256> {
        ids.iter().copied().map(U256::from).collect()
    }

    #[test]
    fn maps_all_results_in_order() {
        let token_ids = ids(&[0, 1, 2]);
        let results = vec![
            CallState::loaded(raw(1)),
            CallState::loaded(raw(2)),
            CallState::loaded(raw(3)),
        ];
        let normalized = normalize(Some(&token_ids), &results, Namespace::Primary);

        assert!(!normalized.loading);
        let positions = normalized.positions.unwrap();
        assert_eq!(
            positions.iter().map(|p| p.token_id).collect::<Vec<_>>(),
            token_ids
        );
        assert_eq!(
            positions.iter().map(|p| p.liquidity).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(positions.iter().all(|p| p.custody == Custody::Wallet));
        assert!(positions.iter().all(|p| p.namespace == Namespace::Primary));
    }

    #[test]
    fn one_pending_lookup_hides_the_whole_set() {
        let token_ids = ids(&[0, 1, 2]);
        let results = vec![
            CallState::loaded(raw(1)),
            CallState::loading(),
            CallState::loaded(raw(3)),
        ];
        let normalized = normalize(Some(&token_ids), &results, Namespace::Primary);
        assert!(normalized.loading);
        assert_eq!(normalized.positions, None);
    }

    #[test]
    fn one_failed_lookup_makes_the_set_unavailable() {
        let token_ids = ids(&[0, 1]);
        let results = vec![CallState::loaded(raw(1)), CallState::failed()];
        let normalized = normalize(Some(&token_ids), &results, Namespace::Primary);
        assert!(!normalized.loading);
        assert_eq!(normalized.positions, None);
    }

    #[test]
    fn tags_the_alternate_namespace() {
        let token_ids = ids(&[9]);
        let results = vec![CallState::loaded(raw(1))];
        let normalized = normalize(Some(&token_ids), &results, Namespace::Alternate);
        assert!(normalized.positions.unwrap()[0].is_alternate());
    }

    #[test]
    fn empty_and_missing_inputs() {
        assert_eq!(
            normalize(Some(&[]), &[], Namespace::Primary),
            Normalized::loaded(vec![])
        );
        assert_eq!(normalize(None, &[], Namespace::Primary), Normalized::default());
    }

    #[test]
    fn single_position_lookup() {
        let call = CallState::loaded(raw(4));
        let (loading, position) =
            normalize_one(Some(U256::from(5)), Some(&call), Namespace::Primary);
        assert!(!loading);
        assert_eq!(position.unwrap().token_id, U256::from(5));

        let (loading, position) = normalize_one(None, None, Namespace::Primary);
        assert!(!loading);
        assert!(position.is_none());
    }
}
