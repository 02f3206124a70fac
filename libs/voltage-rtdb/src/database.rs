//! Fixed-size analog point database
//!
//! # Architecture
//!
//! ```text
//! PointDatabase
//!   └─ points: Box<[Point]>  (contiguous, slot == index)
//! ```
//!
//! The database only exists in its initialized form: `initialize` is the sole
//! constructor and refuses a partial point map, so every slot holds a defined
//! value and quality for the lifetime of the database.

use crate::point::{Flags, Point, Timestamp};
use errors::{VoltageError, VoltageResult};
use tracing::{debug, error};

/// Analog point database with a size fixed at configuration time
#[derive(Debug, Clone)]
pub struct PointDatabase {
    points: Box<[Point]>,
}

impl PointDatabase {
    /// Build the database from initial values
    ///
    /// Every index in `[0, size)` must receive exactly one value. Points are
    /// created `ONLINE` with the given timestamp.
    ///
    /// # Errors
    /// * `PointIndexOutOfRange` - an index is `>= size`
    /// * `DuplicatePoint` - an index appears twice
    /// * `MissingConfig` - an index in range has no initial value
    pub fn initialize<I>(size: u16, values: I, time: Timestamp) -> VoltageResult<Self>
    where
        I: IntoIterator<Item = (u16, f64)>,
    {
        let mut slots: Vec<Option<Point>> = vec![None; size as usize];

        for (index, value) in values {
            let slot = slots
                .get_mut(index as usize)
                .ok_or(VoltageError::PointIndexOutOfRange { index, size })?;
            if slot.is_some() {
                return Err(VoltageError::DuplicatePoint(index));
            }
            *slot = Some(Point::online(index, value, time));
        }

        let points = slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| {
                    VoltageError::MissingConfig(format!("initial value for point {}", index))
                })
            })
            .collect::<VoltageResult<Vec<_>>>()?;

        debug!(size, "Point database initialized");
        Ok(Self {
            points: points.into_boxed_slice(),
        })
    }

    /// Number of points
    #[inline]
    pub fn size(&self) -> u16 {
        self.points.len() as u16
    }

    /// Check whether `index` addresses a point
    #[inline]
    pub fn contains(&self, index: u16) -> bool {
        (index as usize) < self.points.len()
    }

    /// Get a point without error reporting
    #[inline]
    pub fn get(&self, index: u16) -> Option<&Point> {
        self.points.get(index as usize)
    }

    /// Read the current point at `index`
    pub fn read(&self, index: u16) -> VoltageResult<&Point> {
        self.get(index).ok_or(VoltageError::PointIndexOutOfRange {
            index,
            size: self.size(),
        })
    }

    /// Overwrite the point at `index`
    ///
    /// The new point is observable by the next `read`. Returns the stored point.
    pub fn commit(
        &mut self,
        index: u16,
        value: f64,
        flags: Flags,
        time: Timestamp,
    ) -> VoltageResult<Point> {
        let size = self.size();
        let Some(slot) = self.points.get_mut(index as usize) else {
            error!(index, size, "Commit rejected: point index out of range");
            return Err(VoltageError::PointIndexOutOfRange { index, size });
        };
        *slot = Point::new(index, value, flags, time);
        Ok(*slot)
    }

    /// Iterate points in index order
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.points.iter()
    }

    /// Copy of all points in index order
    pub fn snapshot(&self) -> Vec<Point> {
        self.points.to_vec()
    }

    /// Values in index order (convenience for assertions and reporting)
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    fn db(values: &[(u16, f64)], size: u16) -> VoltageResult<PointDatabase> {
        PointDatabase::initialize(size, values.iter().copied(), Timestamp::ZERO)
    }

    #[test]
    fn test_initialize_populates_every_index() {
        let db = db(&[(2, 3.0), (0, 1.0), (1, 2.0)], 3).unwrap();
        assert_eq!(db.size(), 3);
        assert_eq!(db.values(), vec![1.0, 2.0, 3.0]);
        assert!(db.iter().all(|p| p.flags.is_online()));
        assert!(db.iter().enumerate().all(|(i, p)| p.index as usize == i));
    }

    #[test]
    fn test_initialize_rejects_out_of_range_index() {
        let err = db(&[(0, 1.0), (3, 2.0)], 3).unwrap_err();
        assert!(matches!(
            err,
            VoltageError::PointIndexOutOfRange { index: 3, size: 3 }
        ));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_initialize_rejects_partial_database() {
        let err = db(&[(0, 1.0), (2, 3.0)], 3).unwrap_err();
        assert!(matches!(err, VoltageError::MissingConfig(ref m) if m.contains("point 1")));
    }

    #[test]
    fn test_initialize_rejects_duplicate_index() {
        let err = db(&[(0, 1.0), (0, 5.0)], 1).unwrap_err();
        assert!(matches!(err, VoltageError::DuplicatePoint(0)));
    }

    #[test]
    fn test_empty_database() {
        let db = db(&[], 0).unwrap();
        assert_eq!(db.size(), 0);
        assert!(!db.contains(0));
    }

    #[test]
    fn test_commit_is_observable() {
        let mut db = db(&[(0, 1.0), (1, 2.0)], 2).unwrap();
        let time = Timestamp::from_millis(1_700_000_000_000);
        let stored = db.commit(1, 42.0, Flags::ONLINE, time).unwrap();

        assert_eq!(stored.value, 42.0);
        let point = db.read(1).unwrap();
        assert_eq!(point.value, 42.0);
        assert_eq!(point.time, time);
        assert_eq!(db.read(0).unwrap().value, 1.0);
    }

    #[test]
    fn test_commit_and_read_out_of_range() {
        let mut db = db(&[(0, 1.0)], 1).unwrap();
        assert!(db.commit(1, 9.0, Flags::ONLINE, Timestamp::ZERO).is_err());
        assert!(matches!(
            db.read(7),
            Err(VoltageError::PointIndexOutOfRange { index: 7, size: 1 })
        ));
        assert_eq!(db.values(), vec![1.0]);
    }
}
