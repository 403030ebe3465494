use crate::{position::PositionRecord, retention::CountRetention};

/// Inputs of the concentrated liquidity position count.
#[derive(Clone, Debug, Default)]
pub struct CountInputs<'a> {
    pub loading: bool,
    pub primary: Option<&'a [PositionRecord]>,
    pub alternate: Option<&'a [PositionRecord]>,
    /// Number of ids deposited in the current farming center.
    pub farmed: usize,
    /// Number of ids deposited in the legacy farming center.
    pub old_farmed: usize,
    pub hide_closed: bool,
    pub hide_farming: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PositionCount {
    pub loading: bool,
    pub count: usize,
}

/// Counts the positions of both namespaces plus the farmed ones.
///
/// Farmed positions are counted by id only since their details are not
/// needed to know they exist. A total of zero falls back to the previously
/// reported total.
pub fn position_count(inputs: CountInputs, previous: &mut CountRetention) -> PositionCount {
    let visible = |positions: Option<&[PositionRecord]>| {
        positions.map_or(0, |positions| {
            positions
                .iter()
                .filter(|position| !inputs.hide_closed || !position.is_closed())
                .count()
        })
    };
    let farming = if inputs.hide_farming {
        0
    } else {
        inputs.farmed + inputs.old_farmed
    };
    let total = visible(inputs.primary) + visible(inputs.alternate) + farming;

    PositionCount {
        loading: inputs.loading,
        count: previous.apply(total),
    }
}
