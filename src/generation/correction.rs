//! Anchor-based correction of candidate placements

use crate::core::types::DVec2;
use crate::generation::RegionBounds;

/// Pushed candidates land this fraction beyond the separation radius so the
/// postcondition survives float rounding
const PUSH_SLACK: f64 = 1.000_001;

/// Move `candidate` to the nearest point of `bounds` that is at least
/// `min_separation` from every anchor
///
/// A candidate already clear of every anchor is returned as is. Otherwise
/// the nearest clear point lies on the boundary of the clear set, so it is
/// one of: a radial push off an anchor, an intersection of two separation
/// circles, or a point on the region edge. A candidate sitting exactly on an
/// anchor is pushed along +X.
///
/// Returns `None` only when the anchors leave no clear point in `bounds`.
/// Anchors from `RegionGenerator::anchors_for` always leave one.
pub fn correct(candidate: DVec2, anchors: &[DVec2], min_separation: f64, bounds: &RegionBounds) -> Option<DVec2> {
    let is_clear = |point: DVec2| {
        bounds.contains(point) && anchors.iter().all(|a| a.distance(point) >= min_separation)
    };

    let start = bounds.clamp(candidate);
    if is_clear(start) {
        return Some(start);
    }

    let radius = min_separation * PUSH_SLACK;
    boundary_points(start, anchors, radius, bounds)
        .into_iter()
        .filter(|point| is_clear(*point))
        .min_by(|a, b| a.distance_squared(start).total_cmp(&b.distance_squared(start)))
}

/// Every point where the nearest clear point to `from` can sit
fn boundary_points(from: DVec2, anchors: &[DVec2], radius: f64, bounds: &RegionBounds) -> Vec<DVec2> {
    let mut points = Vec::with_capacity(anchors.len() * (anchors.len() + 8) + 8);

    // Radial pushes come first so ties resolve to them
    for anchor in anchors {
        let offset = from - *anchor;
        let distance = offset.length();
        let direction = if distance > f64::EPSILON {
            offset / distance
        } else {
            DVec2::X
        };
        points.push(*anchor + direction * radius);
    }

    for (i, a) in anchors.iter().enumerate() {
        for b in &anchors[i + 1..] {
            let span = *b - *a;
            let distance = span.length();
            if distance <= f64::EPSILON || distance > 2.0 * radius {
                continue;
            }
            let half = distance / 2.0;
            let rise = (radius * radius - half * half).max(0.0).sqrt();
            let mid = (*a + *b) / 2.0;
            let normal = span.perp() / distance;
            points.push(mid + normal * rise);
            points.push(mid - normal * rise);
        }
    }

    let (min, max) = (bounds.min, bounds.max);
    points.extend([
        DVec2::new(min.x, from.y),
        DVec2::new(max.x, from.y),
        DVec2::new(from.x, min.y),
        DVec2::new(from.x, max.y),
        min,
        max,
        DVec2::new(min.x, max.y),
        DVec2::new(max.x, min.y),
    ]);

    for anchor in anchors {
        for x in [min.x, max.x] {
            let dx = x - anchor.x;
            if dx.abs() <= radius {
                let dy = (radius * radius - dx * dx).sqrt();
                points.push(DVec2::new(x, anchor.y + dy));
                points.push(DVec2::new(x, anchor.y - dy));
            }
        }
        for y in [min.y, max.y] {
            let dy = y - anchor.y;
            if dy.abs() <= radius {
                let dx = (radius * radius - dy * dy).sqrt();
                points.push(DVec2::new(anchor.x + dx, y));
                points.push(DVec2::new(anchor.x - dx, y));
            }
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GenerationConfig;
    use crate::core::types::RegionCoords;
    use crate::generation::RegionGenerator;
    use proptest::prelude::*;

    fn unit_bounds() -> RegionBounds {
        RegionBounds {
            min: DVec2::new(-100.0, -100.0),
            max: DVec2::new(100.0, 100.0),
        }
    }

    #[test]
    fn test_far_candidate_is_untouched() {
        let anchors = [DVec2::ZERO];
        let candidate = DVec2::new(50.0, 0.0);
        assert_eq!(correct(candidate, &anchors, 10.0, &unit_bounds()), Some(candidate));
    }

    #[test]
    fn test_close_candidate_is_pushed_radially() {
        let anchors = [DVec2::ZERO];
        let corrected = correct(DVec2::new(0.0, 3.0), &anchors, 10.0, &unit_bounds()).unwrap();
        assert!(corrected.x.abs() < 1e-9);
        assert!(corrected.y >= 10.0);
    }

    #[test]
    fn test_coincident_candidate_moves_along_x() {
        let anchors = [DVec2::new(5.0, 5.0)];
        let corrected = correct(DVec2::new(5.0, 5.0), &anchors, 10.0, &unit_bounds()).unwrap();
        assert!(corrected.x >= 15.0);
        assert_eq!(corrected.y, 5.0);
    }

    #[test]
    fn test_no_anchors_is_identity() {
        let candidate = DVec2::new(1.0, 2.0);
        assert_eq!(correct(candidate, &[], 10.0, &unit_bounds()), Some(candidate));
    }

    #[test]
    fn test_candidate_between_close_anchors_clears_both() {
        let anchors = [DVec2::ZERO, DVec2::new(15.0, 0.0)];
        let corrected = correct(DVec2::new(7.0, 0.0), &anchors, 10.0, &unit_bounds()).unwrap();

        for anchor in &anchors {
            assert!(corrected.distance(*anchor) >= 10.0);
        }
        // Nearest clear points are where the two separation circles cross
        assert!((corrected.x - 7.5).abs() < 1e-3);
        assert!((corrected.y.abs() - 6.614).abs() < 1e-3);
    }

    #[test]
    fn test_edge_bounds_the_push() {
        let anchors = [DVec2::new(95.0, 0.0)];
        let corrected = correct(DVec2::new(97.0, 0.0), &anchors, 10.0, &unit_bounds()).unwrap();
        assert!(unit_bounds().contains(corrected));
        assert!(corrected.distance(anchors[0]) >= 10.0);
        // Pushing straight out would leave the region; the arc meets the edge instead
        assert_eq!(corrected.x, 100.0);
        assert!(corrected.y.abs() > 8.0);
    }

    #[test]
    fn test_covered_bounds_have_no_clear_point() {
        let anchors = [DVec2::ZERO];
        assert_eq!(correct(DVec2::new(1.0, 1.0), &anchors, 1000.0, &unit_bounds()), None);
    }

    proptest! {
        #[test]
        fn prop_corrected_candidates_keep_separation(
            x in -50i32..50,
            z in -50i32..50,
            seed in any::<u64>(),
            fx in 0.0f64..1.0,
            fz in 0.0f64..1.0,
        ) {
            let config = GenerationConfig { seed, ..GenerationConfig::default() };
            let min_separation = config.min_separation;
            let gen = RegionGenerator::new(config);
            let region = RegionCoords::new(x, z);
            let bounds = gen.bounds(region);
            let anchors = gen.anchors_for(region);

            let candidate = bounds.min + (bounds.max - bounds.min) * DVec2::new(fx, fz);
            let corrected = gen.correct(region, candidate, &anchors).unwrap();

            prop_assert!(bounds.contains(corrected));
            for anchor in &anchors {
                prop_assert!(
                    corrected.distance(*anchor) >= min_separation,
                    "{:?} within {} of {:?}", corrected, min_separation, anchor
                );
            }
        }

        #[test]
        fn prop_generated_candidates_keep_separation(
            x in -1000i32..1000,
            z in -1000i32..1000,
            seed in any::<u64>(),
        ) {
            let config = GenerationConfig { seed, candidate_density: 64, ..GenerationConfig::default() };
            let min_separation = config.min_separation;
            let gen = RegionGenerator::new(config);
            let region = RegionCoords::new(x, z);
            let anchors = gen.anchors_for(region);

            for candidate in gen.candidates_for(region) {
                let corrected = gen.correct(region, candidate, &anchors).unwrap();
                for anchor in &anchors {
                    prop_assert!(corrected.distance(*anchor) >= min_separation);
                }
            }
        }

        #[test]
        fn prop_correction_is_pure(
            cx in -100.0f64..100.0,
            cy in -100.0f64..100.0,
            ax in -100.0f64..100.0,
            ay in -100.0f64..100.0,
        ) {
            let anchors = [DVec2::new(ax, ay)];
            let candidate = DVec2::new(cx, cy);
            let a = correct(candidate, &anchors, 20.0, &unit_bounds());
            let b = correct(candidate, &anchors, 20.0, &unit_bounds());
            prop_assert_eq!(a, b);
            prop_assert!(unit_bounds().contains(a.unwrap()));
        }

        #[test]
        fn prop_arbitrary_anchors_keep_separation(
            anchors in prop::collection::vec((-100.0f64..50.0, -100.0f64..50.0), 1..8),
            cx in -100.0f64..100.0,
            cy in -100.0f64..100.0,
        ) {
            // The corner (100, 100) is at least 50 from every anchor, so a
            // clear point always exists
            let anchors: Vec<DVec2> = anchors.into_iter().map(|(x, y)| DVec2::new(x, y)).collect();
            let candidate = DVec2::new(cx, cy);
            let fallback = unit_bounds().max;

            let corrected = correct(candidate, &anchors, 20.0, &unit_bounds());
            prop_assert!(corrected.is_some());
            let corrected = corrected.unwrap();

            prop_assert!(unit_bounds().contains(corrected));
            for anchor in &anchors {
                prop_assert!(
                    corrected.distance(*anchor) >= 20.0,
                    "{:?} within 20 of {:?}", corrected, anchor
                );
            }
            prop_assert!(corrected.distance(candidate) <= fallback.distance(candidate) + 1e-9);
        }
    }
}
