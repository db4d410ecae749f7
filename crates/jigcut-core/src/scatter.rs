//! Random initial layout of free pieces.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::types::{PieceId, Point};

/// Rectangle pieces are scattered into, typically the space below the
/// board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterArea {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// Draw an offset in `[0, span)`, or 0 when the piece does not fit.
fn offset(rng: &mut Pcg32, span: f64) -> f64 {
    if span > 0.0 {
        rng.random_range(0.0..span)
    } else {
        0.0
    }
}

/// Shuffle `pieces` (id, width, height) and give each a random top-left
/// such that it lies inside `area` when it fits.
///
/// The result is in shuffled order, which callers use as the stacking
/// order. Equal inputs and seed give equal output.
#[must_use]
pub fn scatter(
    pieces: &[(PieceId, f64, f64)],
    area: ScatterArea,
    seed: u64,
) -> Vec<(PieceId, Point)> {
    let mut rng = Pcg32::seed_from_u64(seed);
    let mut order = pieces.to_vec();
    order.shuffle(&mut rng);
    order
        .into_iter()
        .map(|(id, width, height)| {
            let x = area.x + offset(&mut rng, area.width - width);
            let y = area.y + offset(&mut rng, area.height - height);
            (id, Point::new(x, y))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const AREA: ScatterArea = ScatterArea {
        x: 10.0,
        y: 400.0,
        width: 300.0,
        height: 200.0,
    };

    fn sizes(n: usize) -> Vec<(PieceId, f64, f64)> {
        (0..n).map(|i| (PieceId(i), 50.0, 40.0)).collect()
    }

    #[test]
    fn same_seed_same_layout() {
        assert_eq!(scatter(&sizes(9), AREA, 3), scatter(&sizes(9), AREA, 3));
    }

    #[test]
    fn different_seed_different_layout() {
        assert_ne!(scatter(&sizes(9), AREA, 3), scatter(&sizes(9), AREA, 4));
    }

    #[test]
    fn every_piece_placed_once() {
        let mut ids: Vec<_> = scatter(&sizes(12), AREA, 1)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        assert_eq!(ids, (0..12).map(PieceId).collect::<Vec<_>>());
    }

    #[test]
    fn oversized_piece_sits_at_area_origin() {
        let placed = scatter(&[(PieceId(0), 500.0, 500.0)], AREA, 9);
        assert_eq!(placed[0].1, Point::new(AREA.x, AREA.y));
    }

    proptest! {
        #[test]
        fn pieces_stay_inside_area(seed in any::<u64>(), n in 1_usize..30) {
            for (_, p) in scatter(&sizes(n), AREA, seed) {
                prop_assert!(p.x >= AREA.x && p.x + 50.0 <= AREA.x + AREA.width);
                prop_assert!(p.y >= AREA.y && p.y + 40.0 <= AREA.y + AREA.height);
            }
        }
    }
}
