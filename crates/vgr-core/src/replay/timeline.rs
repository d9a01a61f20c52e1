use serde::{Deserialize, Serialize};

/// Step mapping from byte offset to elapsed match seconds
///
/// Built from records that carry their own timestamp. Time never runs
/// backwards: a point earlier than its predecessor is raised to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    points: Vec<(usize, f32)>,
}

impl Timeline {
    pub fn from_points(mut points: Vec<(usize, f32)>) -> Self {
        points.retain(|(_, t)| t.is_finite());
        points.sort_by_key(|(offset, _)| *offset);

        let mut latest = f32::MIN;
        for (_, t) in points.iter_mut() {
            latest = latest.max(*t);
            *t = latest;
        }
        Self { points }
    }

    /// Elapsed time at `offset`, from the nearest timestamped record at or before it
    pub fn at(&self, offset: usize) -> Option<f32> {
        let after = self.points.partition_point(|(o, _)| *o <= offset);
        after.checked_sub(1).map(|i| self.points[i].1)
    }

    /// Latest timestamp seen
    pub fn end(&self) -> Option<f32> {
        self.points.last().map(|(_, t)| *t)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_steps() {
        let timeline = Timeline::from_points(vec![(500, 30.0), (100, 10.0), (300, 25.0)]);
        assert_eq!(timeline.at(50), None);
        assert_eq!(timeline.at(100), Some(10.0));
        assert_eq!(timeline.at(299), Some(10.0));
        assert_eq!(timeline.at(10_000), Some(30.0));
        assert_eq!(timeline.end(), Some(30.0));
    }

    #[test]
    fn test_timeline_is_monotone() {
        let timeline = Timeline::from_points(vec![(0, 50.0), (10, 40.0), (20, f32::NAN)]);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.at(10), Some(50.0));
    }
}
