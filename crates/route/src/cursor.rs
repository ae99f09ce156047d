use crate::RoutePoint;

/// Forward-only cursor over a trip's waypoints.
#[derive(Debug, Clone, Default)]
pub struct RouteCursor {
    points: Vec<RoutePoint>,
    index: usize,
}

impl RouteCursor {
    #[must_use]
    pub const fn new(points: Vec<RoutePoint>) -> Self {
        Self { points, index: 0 }
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.index < self.points.len()
    }

    /// Index of the next point to be returned.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Iterator for RouteCursor {
    type Item = RoutePoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.points.get(self.index).copied()?;
        self.index += 1;
        Some(point)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.points.len() - self.index;
        (remaining, Some(remaining))
    }
}
