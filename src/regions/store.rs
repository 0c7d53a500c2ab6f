use rayon::prelude::*;

use super::{LineRun, Palette, Point, Region, RegionError, decode};
use crate::log_info;

/// Runtime lookup of decoded regions.
///
/// Lookup is a linear scan with O(1) hash membership per region. Region
/// counts stay small next to per-region pixel counts, so no spatial index.
#[derive(Clone, Debug, Default)]
pub struct RegionStore {
    regions: Vec<Region>,
}

impl RegionStore {
    pub fn new(regions: Vec<Region>) -> Self {
        Self { regions }
    }

    /// Decode every form's runs (in parallel) and color each region from
    /// `palette` by its position in `forms`. A malformed run anywhere fails
    /// the whole load; no partial store is returned.
    pub fn from_forms(forms: &[Vec<LineRun>], palette: &Palette) -> Result<Self, RegionError> {
        let decoded: Vec<_> = forms
            .par_iter()
            .map(|runs| decode(runs))
            .collect::<Result<Vec<_>, RegionError>>()?;

        let regions: Vec<Region> = decoded
            .into_iter()
            .enumerate()
            .map(|(i, points)| Region::from_points(i, palette.color_for(i), points))
            .collect();

        log_info!(
            "region store: loaded {} regions ({} pixels)",
            regions.len(),
            regions.iter().map(Region::len).sum::<usize>()
        );
        Ok(Self { regions })
    }

    /// Encode every region (in parallel), preserving region order.
    pub fn to_forms(&self) -> Vec<Vec<LineRun>> {
        self.regions.par_iter().map(Region::encode).collect()
    }

    /// The first region containing `p`, if any.
    pub fn find_region(&self, p: Point) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(p))
    }

    pub fn find_region_index(&self, p: Point) -> Option<usize> {
        self.regions.iter().position(|r| r.contains(p))
    }

    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Reassign colors by position, e.g. after switching palettes.
    pub fn recolor(&mut self, palette: &Palette) {
        for (i, r) in self.regions.iter_mut().enumerate() {
            r.color = palette.color_for(i);
        }
    }
}
