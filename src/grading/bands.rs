//! Qualitative band lookup and coverage analysis.
//!
//! Lookup is total: an average that matches no band is simply unlabeled.
//! Coverage analysis finds the averages that would end up unlabeled (gaps) and
//! the averages that more than one band claims (overlaps), so validation can
//! warn about both before any grades are entered.

use std::cmp::Ordering;

use crate::domain::{BandPolicy, QualitativeBand, ScaleSpec};

const EPS: f64 = 1e-9;

/// Slack in grid units when snapping a bound onto the display grid.
const GRID_EPS: f64 = 1e-6;

/// Resolve `average` to a band label.
///
/// `FirstMatch` scans in list order and returns the first band containing the
/// average. `HighestFloor` returns the band with the greatest `min` not above
/// the average (earliest in the list on ties); an average below every floor
/// falls through to the band with the lowest `min`, so any average gets a
/// label as long as one band exists.
pub fn label_for(average: f64, bands: &[QualitativeBand], policy: BandPolicy) -> Option<&str> {
    if !average.is_finite() {
        return None;
    }
    let band = match policy {
        BandPolicy::FirstMatch => bands.iter().find(|b| b.contains(average)),
        BandPolicy::HighestFloor => highest_floor(bands.iter().filter(|b| b.min <= average))
            .or_else(|| lowest_floor(bands.iter())),
    };
    band.map(|b| b.label.as_str())
}

fn highest_floor<'b>(bands: impl Iterator<Item = &'b QualitativeBand>) -> Option<&'b QualitativeBand> {
    bands.fold(None, |best, b| match best {
        Some(cur) if cur.min >= b.min => Some(cur),
        _ => Some(b),
    })
}

fn lowest_floor<'b>(bands: impl Iterator<Item = &'b QualitativeBand>) -> Option<&'b QualitativeBand> {
    bands.fold(None, |best, b| match best {
        Some(cur) if cur.min <= b.min => Some(cur),
        _ => Some(b),
    })
}

/// A stretch of the scale that no band claims.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gap {
    /// `[scale.min, to)` is uncovered.
    Below { to: f64 },
    /// `(from, to)` is uncovered.
    Between { from: f64, to: f64 },
    /// `(from, scale.max]` is uncovered.
    Above { from: f64 },
}

/// Two bands (by list index) that claim some of the same averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub first: usize,
    pub second: usize,
    /// Index of the band the lookup policy resolves the shared range to.
    pub winner: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coverage {
    pub gaps: Vec<Gap>,
    pub overlaps: Vec<Overlap>,
}

/// Find gaps and overlaps in `bands` over the whole scale.
///
/// Malformed bands (non-finite or `min > max`) are ignored here; validation
/// reports them separately. Averages are looked up after rounding, so a gap is
/// only reported when some value on the display grid (multiples of
/// `scale.step()`) inside the scale falls outside every band.
pub fn analyze_coverage(bands: &[QualitativeBand], scale: &ScaleSpec, policy: BandPolicy) -> Coverage {
    let usable: Vec<(usize, &QualitativeBand)> = bands
        .iter()
        .enumerate()
        .filter(|(_, b)| b.min.is_finite() && b.max.is_finite() && b.min <= b.max)
        .collect();

    Coverage {
        gaps: find_gaps(&usable, scale, policy),
        overlaps: find_overlaps(&usable, policy),
    }
}

fn find_gaps(usable: &[(usize, &QualitativeBand)], scale: &ScaleSpec, policy: BandPolicy) -> Vec<Gap> {
    if policy == BandPolicy::HighestFloor {
        // Every average resolves to some band, the lowest floor catching the rest.
        return Vec::new();
    }

    let mut sorted: Vec<&QualitativeBand> = usable.iter().map(|(_, b)| *b).collect();
    sorted.sort_by(|a, b| {
        a.min
            .partial_cmp(&b.min)
            .unwrap_or(Ordering::Equal)
            .then(a.max.partial_cmp(&b.max).unwrap_or(Ordering::Equal))
    });

    let Some(first) = sorted.first() else {
        return Vec::new();
    };

    let step = scale.step();
    let lowest = grid_at_or_above(scale.min, step);
    let highest = grid_at_or_below(scale.max, step);

    let mut gaps = Vec::new();
    if lowest < first.min - EPS && lowest <= highest + EPS {
        gaps.push(Gap::Below { to: first.min });
    }

    let mut reach = first.max;
    for band in &sorted[1..] {
        let next = grid_above(reach, step);
        if next < band.min - EPS && next <= highest + EPS {
            gaps.push(Gap::Between {
                from: reach,
                to: band.min,
            });
        }
        reach = reach.max(band.max);
    }
    if grid_above(reach, step) <= highest + EPS {
        gaps.push(Gap::Above { from: reach });
    }

    gaps
}

/// Smallest display value strictly above `value`.
fn grid_above(value: f64, step: f64) -> f64 {
    ((value / step + GRID_EPS).floor() + 1.0) * step
}

/// Smallest display value at or above `value`.
fn grid_at_or_above(value: f64, step: f64) -> f64 {
    (value / step - GRID_EPS).ceil() * step
}

/// Largest display value at or below `value`.
fn grid_at_or_below(value: f64, step: f64) -> f64 {
    (value / step + GRID_EPS).floor() * step
}

fn find_overlaps(usable: &[(usize, &QualitativeBand)], policy: BandPolicy) -> Vec<Overlap> {
    let mut out = Vec::new();
    for (pos, &(i, a)) in usable.iter().enumerate() {
        for &(j, b) in &usable[pos + 1..] {
            if a.min <= b.max && b.min <= a.max {
                let winner = match policy {
                    BandPolicy::FirstMatch => i,
                    BandPolicy::HighestFloor if b.min > a.min => j,
                    BandPolicy::HighestFloor => i,
                };
                out.push(Overlap {
                    first: i,
                    second: j,
                    winner,
                });
            }
        }
    }
    out
}
