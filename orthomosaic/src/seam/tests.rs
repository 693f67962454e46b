use common::Buffer2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

fn pair() -> [SeamTile<'static>; 2] {
    [
        SeamTile::new(Placement::new(0, 0, 100, 100)),
        SeamTile::new(Placement::new(80, 0, 100, 100)),
    ]
}

fn is_ramped(v: u8) -> bool {
    v != 0 && v != u8::MAX
}

#[test]
fn test_single_tile_is_fully_owned() {
    let tiles = [SeamTile::new(Placement::new(-3, 7, 12, 9))];
    let masks = generate_ownership_masks(&tiles, &SeamConfig::default()).unwrap();
    assert_eq!(masks.len(), 1);
    assert_eq!(masks[0].size(), (12, 9));
    assert!(masks[0].iter().all(|&v| v == u8::MAX));
}

#[test]
fn test_unusable_pixels_are_excluded() {
    let mut usability = Buffer2::new_filled(10, 10, u8::MAX);
    usability[(2, 3)] = 0;
    usability[(9, 9)] = 0;
    let tiles = [SeamTile::with_usability(Placement::new(0, 0, 10, 10), &usability)];
    let masks = generate_ownership_masks(&tiles, &SeamConfig::default()).unwrap();
    assert_eq!(masks[0][(2, 3)], 0);
    assert_eq!(masks[0][(9, 9)], 0);
    assert_eq!(masks[0][(5, 5)], u8::MAX);
}

#[test]
fn test_zero_margin_splits_on_bisector() {
    let masks = generate_ownership_masks(&pair(), &SeamConfig::with_margin(0.0)).unwrap();
    let (a, b) = (&masks[0], &masks[1]);

    // Centers sit at x = 50 and x = 130, so the bisector is x = 90.
    for y in 0..100 {
        for x in 80..100 {
            let own_a = a[(x, y)];
            let own_b = b[(x - 80, y)];
            assert!(
                (own_a, own_b) == (255, 0) || (own_a, own_b) == (0, 255),
                "pixel ({}, {}) owned by {} and {}",
                x,
                y,
                own_a,
                own_b
            );
            assert_eq!(own_a == 255, x < 90, "pixel ({}, {})", x, y);
        }
        // Outside the overlap each tile is alone.
        assert_eq!(a[(10, y)], 255);
        assert_eq!(b[(90, y)], 255);
    }
}

#[test]
fn test_margin_ramp_is_complementary() {
    let masks = generate_ownership_masks(&pair(), &SeamConfig::with_margin(10.0)).unwrap();
    for y in 0..100 {
        for x in 80..100 {
            let total = masks[0][(x, y)] as u32 + masks[1][(x - 80, y)] as u32;
            assert!((254..=256).contains(&total), "({}, {}) sums to {}", x, y, total);
        }
    }
    // Ownership decreases toward the neighbor.
    let row: Vec<u8> = (80..100).map(|x| masks[0][(x, 50)]).collect();
    assert!(row.windows(2).all(|w| w[0] >= w[1]), "{:?}", row);
    assert!(is_ramped(masks[0][(89, 50)]));
}

#[test]
fn test_larger_margin_widens_ramp() {
    let mut previous = None;
    for margin in [0.0, 2.0, 5.0, 10.0] {
        let masks = generate_ownership_masks(&pair(), &SeamConfig::with_margin(margin)).unwrap();
        let ramped = masks[0].iter().filter(|&&v| is_ramped(v)).count();
        if let Some(previous) = previous {
            assert!(ramped > previous, "margin {} ramps {} pixels", margin, ramped);
        } else {
            assert_eq!(ramped, 0);
        }
        previous = Some(ramped);
    }
}

#[test]
fn test_three_way_overlap_is_not_normalized() {
    let tiles = [
        SeamTile::new(Placement::new(0, 0, 40, 40)),
        SeamTile::new(Placement::new(10, 0, 40, 40)),
        SeamTile::new(Placement::new(5, 10, 40, 40)),
    ];
    let masks = generate_ownership_masks(&tiles, &SeamConfig::with_margin(1000.0)).unwrap();

    let canvas = IVec2::new(20, 20);
    let values: Vec<u8> = tiles
        .iter()
        .zip(&masks)
        .map(|(tile, mask)| {
            let local = canvas - tile.placement.offset;
            mask[(local.x as usize, local.y as usize)]
        })
        .collect();
    assert_eq!(values, vec![128, 127, 127]);
    let total: u32 = values.iter().map(|&v| v as u32).sum();
    assert!(total > 255);
}

#[test]
fn test_excluded_neighbor_cedes_overlap() {
    let mut usability = Buffer2::new_filled(100, 100, u8::MAX);
    for y in 0..100 {
        for x in 0..20 {
            usability[(x, y)] = 0;
        }
    }
    let tiles = [
        SeamTile::new(Placement::new(0, 0, 100, 100)),
        SeamTile::with_usability(Placement::new(80, 0, 100, 100), &usability),
    ];
    let masks = generate_ownership_masks(&tiles, &SeamConfig::with_margin(5.0)).unwrap();
    assert!(masks[0].iter().all(|&v| v == u8::MAX));
    assert!((0..100).all(|y| masks[1][(10, y)] == 0));
    assert!((0..100).all(|y| masks[1][(50, y)] == u8::MAX));
}

#[test]
fn test_identical_tiles_tie_break() {
    let placement = Placement::new(0, 0, 16, 16);
    let tiles = [SeamTile::new(placement), SeamTile::new(placement)];

    let hard = generate_ownership_masks(&tiles, &SeamConfig::with_margin(0.0)).unwrap();
    assert!(hard[0].iter().all(|&v| v == u8::MAX));
    assert!(hard[1].iter().all(|&v| v == 0));

    let soft = generate_ownership_masks(&tiles, &SeamConfig::with_margin(4.0)).unwrap();
    assert!(soft[0].iter().all(|&v| v == 128));
    assert!(soft[1].iter().all(|&v| v == 128));
}

#[test]
fn test_spatial_index_matches_linear_scan() {
    let mut rng = StdRng::seed_from_u64(42);
    let masks: Vec<(Placement, Mask)> = (0..12)
        .map(|_| {
            let width = rng.random_range(20..50);
            let height = rng.random_range(20..50);
            let placement = Placement::new(
                rng.random_range(-10..100),
                rng.random_range(-10..100),
                width,
                height,
            );
            let usability =
                Mask::from_fn(width, height, |_, _| if rng.random_bool(0.9) { 255 } else { 0 });
            (placement, usability)
        })
        .collect();
    let tiles: Vec<SeamTile<'_>> = masks
        .iter()
        .map(|(placement, usability)| SeamTile::with_usability(*placement, usability))
        .collect();

    let indexed = SeamConfig {
        overlap_margin: 6.0,
        use_spatial_index: true,
    };
    let linear = SeamConfig {
        use_spatial_index: false,
        ..indexed
    };
    assert_eq!(
        generate_ownership_masks(&tiles, &indexed).unwrap(),
        generate_ownership_masks(&tiles, &linear).unwrap()
    );
}

#[test]
fn test_rejects_mismatched_usability() {
    let usability = Buffer2::new_filled(10, 9, u8::MAX);
    let tiles = [SeamTile::with_usability(Placement::new(0, 0, 10, 10), &usability)];
    assert!(matches!(
        generate_ownership_masks(&tiles, &SeamConfig::default()),
        Err(Error::DimensionMismatch {
            what: "usability mask",
            ..
        })
    ));
}

#[test]
fn test_rejects_negative_margin() {
    let tiles = pair();
    assert!(matches!(
        generate_ownership_masks(&tiles, &SeamConfig::with_margin(-2.0)),
        Err(Error::InvalidMargin(_))
    ));
}

#[test]
fn test_empty_tile_list() {
    let masks = generate_ownership_masks(&[], &SeamConfig::default()).unwrap();
    assert!(masks.is_empty());
}
