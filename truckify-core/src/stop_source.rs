//! Pending stops awaiting assignment, grouped by depot.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::{DepotId, Stop};

/// Source of stops not yet planned.
pub trait StopSource: Send + Sync {
    /// Stops waiting to be served from `depot`, in submission order.
    fn pending_stops(&self, depot: &DepotId) -> Vec<Stop>;
}

/// Stop source held in memory.
#[derive(Debug, Default)]
pub struct InMemoryStopSource {
    stops: RwLock<HashMap<DepotId, Vec<Stop>>>,
}

impl InMemoryStopSource {
    /// Queue `stops` under `depot`.
    pub fn submit<I>(&self, depot: impl Into<DepotId>, stops: I)
    where
        I: IntoIterator<Item = Stop>,
    {
        self.stops
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(depot.into())
            .or_default()
            .extend(stops);
    }

    /// Drop every pending stop for `depot`, returning them.
    pub fn drain(&self, depot: &DepotId) -> Vec<Stop> {
        self.stops
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(depot)
            .unwrap_or_default()
    }
}

impl StopSource for InMemoryStopSource {
    fn pending_stops(&self, depot: &DepotId) -> Vec<Stop> {
        self.stops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(depot)
            .cloned()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StopId;
    use geo::Coord;
    use rstest::rstest;

    #[rstest]
    fn stops_are_grouped_by_depot() {
        let source = InMemoryStopSource::default();
        source.submit("north", [Stop::new("S1", Coord { x: 0.0, y: 0.0 }, 1)]);
        source.submit("north", [Stop::new("S2", Coord { x: 0.0, y: 0.0 }, 1)]);
        source.submit("south", [Stop::new("S3", Coord { x: 0.0, y: 0.0 }, 1)]);

        let north: Vec<_> = source
            .pending_stops(&"north".into())
            .into_iter()
            .map(|stop| stop.id)
            .collect();
        assert_eq!(north, vec![StopId::from("S1"), StopId::from("S2")]);
        assert!(source.pending_stops(&"east".into()).is_empty());

        assert_eq!(source.drain(&"south".into()).len(), 1);
        assert!(source.pending_stops(&"south".into()).is_empty());
    }
}
