//! Run-length form of a region: one `LineRun` per maximal horizontal block of
//! pixels. This is what ships in form files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Point, PointSet, RegionError};

/// Largest pixel count a single region may decode to.
pub const MAX_REGION_PIXELS: usize = 1 << 28;

/// All pixels `(x, y)` with `start_x <= x <= end_x`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineRun {
    #[serde(rename = "startX")]
    pub start_x: i32,
    #[serde(rename = "endX")]
    pub end_x: i32,
    pub y: i32,
}

impl LineRun {
    pub const fn new(y: i32, start_x: i32, end_x: i32) -> Self {
        Self { start_x, end_x, y }
    }

    /// Pixel count, or 0 for a malformed run.
    pub fn len(&self) -> usize {
        if self.end_x < self.start_x {
            0
        } else {
            (self.end_x.abs_diff(self.start_x) as usize).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn validate(&self) -> Result<(), RegionError> {
        if self.end_x < self.start_x {
            return Err(RegionError::MalformedRun {
                y: self.y,
                start_x: self.start_x,
                end_x: self.end_x,
            });
        }
        Ok(())
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        (self.start_x..=self.end_x).map(move |x| Point::new(x, self.y))
    }
}

/// Compress a point set into runs sorted by `(y, start_x)`. Repeated points
/// are collapsed.
pub fn encode<I>(points: I) -> Vec<LineRun>
where
    I: IntoIterator<Item = Point>,
{
    let mut rows: BTreeMap<i32, Vec<i32>> = BTreeMap::new();
    for p in points {
        rows.entry(p.y).or_default().push(p.x);
    }

    let mut runs = Vec::new();
    for (y, mut xs) in rows {
        xs.sort_unstable();
        xs.dedup();
        let mut start = xs[0];
        let mut end = start;
        for &x in &xs[1..] {
            if x == end + 1 {
                end = x;
            } else {
                runs.push(LineRun::new(y, start, end));
                start = x;
                end = x;
            }
        }
        runs.push(LineRun::new(y, start, end));
    }
    runs
}

/// Expand runs back into their point set. Any run with `end_x < start_x`,
/// or a total above [`MAX_REGION_PIXELS`], fails the whole decode.
pub fn decode(runs: &[LineRun]) -> Result<PointSet, RegionError> {
    let mut total: usize = 0;
    for run in runs {
        run.validate()?;
        total = total.saturating_add(run.len());
    }
    if total > MAX_REGION_PIXELS {
        return Err(RegionError::RegionTooLarge {
            pixels: total,
            limit: MAX_REGION_PIXELS,
        });
    }

    let mut points = PointSet::with_capacity(total);
    for run in runs {
        points.extend(run.points());
    }
    Ok(points)
}

/// True when no two runs on a row touch or overlap and the list is in
/// canonical `(y, start_x)` order.
pub fn is_minimal(runs: &[LineRun]) -> bool {
    runs.windows(2).all(|pair| {
        let (a, b) = (pair[0], pair[1]);
        a.y < b.y || (a.y == b.y && (a.end_x as i64) + 1 < b.start_x as i64)
    })
}
