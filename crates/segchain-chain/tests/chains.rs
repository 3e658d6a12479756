use std::sync::Arc;

use approx::assert_relative_eq;
use segchain_chain::{ChainBuilder, ChainParams, ChainPool};
use segchain_core::{AllocBudget, Error, PixelSlice};
use segchain_segment::Segmentation;

/// Image of `n` filled `w x h` boxes; box `k` has its lower-left corner at
/// `(1 + k * dx, 2 + k * dy)`.
fn boxes(n: usize, w: usize, h: usize, dx: usize, dy: usize) -> Arc<Segmentation> {
    let (width, height) = (n * dx + w + 2, n * dy + h + 4);
    let mut data = vec![0u8; width * height];
    for k in 0..n {
        let (x0, y0) = (1 + k * dx, 2 + k * dy);
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                data[y * width + x] = 1;
            }
        }
    }
    let seg = Segmentation::new(PixelSlice::U8(&data), 0, width, height, width, 0.0)
        .expect("segmentation");
    Arc::new(seg)
}

fn chains(seg: &Arc<Segmentation>, params: ChainParams) -> ChainPool {
    ChainBuilder::new(params).build(seg).expect("chains")
}

#[test]
fn five_aligned_boxes_form_one_chain() {
    let seg = boxes(5, 3, 5, 10, 0);
    let pool = chains(&seg, ChainParams::default());
    assert_eq!(pool.lengths(), vec![5]);
    assert_eq!(pool.segments(0).expect("members"), &[1, 2, 3, 4, 5]);
    assert_relative_eq!(pool.vertical_shear(0).expect("vertical"), 0.0, epsilon = 1e-12);
    assert_relative_eq!(pool.horizontal_shear(0).expect("horizontal"), 0.0, epsilon = 1e-12);

    let bbox = pool.chain(0).expect("chain").bbox();
    assert_relative_eq!(bbox.xmin, 1.0);
    assert_relative_eq!(bbox.xmax, 43.0);
    assert_relative_eq!(bbox.ymin, 2.0);
    assert_relative_eq!(bbox.ymax, 6.0);
    assert_eq!(pool.image_width(), seg.image_width());
}

#[test]
fn distant_boxes_give_an_empty_pool() {
    let seg = boxes(5, 3, 5, 10, 0);
    let params = ChainParams {
        drmax: 1.5,
        ..ChainParams::default()
    };
    let pool = chains(&seg, params);
    assert!(pool.is_empty());
    assert!(matches!(pool.chain(0), Err(Error::OutOfRange { .. })));
}

#[test]
fn rising_line_is_straightened() {
    let seg = boxes(5, 3, 5, 10, 1);
    let pool = chains(&seg, ChainParams::default());
    assert_eq!(pool.lengths(), vec![5]);
    let chain = pool.chain(0).expect("chain");
    assert_relative_eq!(chain.vertical_shear(), 0.1, epsilon = 1e-9);
    let [a0, a1, a2, a3] = chain.coefficients();
    assert_relative_eq!(a0, 1.0);
    assert_relative_eq!(a1, -chain.horizontal_shear());
    assert_relative_eq!(a2, -0.1, epsilon = 1e-9);
    assert_relative_eq!(a3, 1.0);
}

#[test]
fn slanted_glyphs_get_a_horizontal_shear() {
    // Parallelograms 2 pixels wide and 8 high, leaning right by half a
    // pixel per row.
    let (width, height) = (60, 12);
    let mut data = vec![0u8; width * height];
    for k in 0..5 {
        for y in 2..10 {
            let x0 = 1 + 12 * k + (y - 2) / 2;
            data[y * width + x0] = 1;
            data[y * width + x0 + 1] = 1;
        }
    }
    let seg = Arc::new(
        Segmentation::new(PixelSlice::U8(&data), 0, width, height, width, 0.0).expect("seg"),
    );
    let pool = chains(&seg, ChainParams::default());
    assert_eq!(pool.lengths(), vec![5]);
    assert_relative_eq!(pool.horizontal_shear(0).expect("shear"), 0.5, epsilon = 1e-12);
    assert_relative_eq!(pool.vertical_shear(0).expect("shear"), 0.0, epsilon = 1e-12);
}

#[test]
fn separate_rows_share_no_segment() {
    let (width, height) = (50, 30);
    let mut data = vec![0u8; width * height];
    for y0 in [2, 20] {
        for k in 0..4 {
            for y in y0..y0 + 5 {
                for x in 1 + 10 * k..4 + 10 * k {
                    data[y * width + x] = 1;
                }
            }
        }
    }
    let seg = Arc::new(
        Segmentation::new(PixelSlice::U8(&data), 0, width, height, width, 0.0).expect("seg"),
    );
    let pool = chains(&seg, ChainParams::default());
    assert_eq!(pool.lengths(), vec![4, 4]);

    let mut rows: Vec<Vec<usize>> = (0..pool.len())
        .map(|j| pool.segments(j).expect("members").to_vec())
        .collect();
    rows.sort();
    assert_eq!(rows, vec![vec![1, 2, 3, 4], vec![5, 6, 7, 8]]);
}

#[test]
fn forked_chains_do_not_share_segments() {
    // Three boxes on a row followed by two stacked boxes of distinct values
    // at the same abscissa, both aligned with the row.
    let (width, height) = (36, 17);
    let mut data = vec![0u8; width * height];
    let mut fill = |x0: usize, y0: usize, value: u8| {
        for y in y0..y0 + 5 {
            for x in x0..x0 + 3 {
                data[y * width + x] = value;
            }
        }
    };
    for x0 in [1, 11, 21] {
        fill(x0, 8, 1);
    }
    fill(31, 5, 1);
    fill(31, 10, 2);
    let seg = Arc::new(
        Segmentation::new(PixelSlice::U8(&data), 0, width, height, width, 0.0).expect("seg"),
    );
    assert_eq!(seg.len(), 6);

    let pool = chains(&seg, ChainParams::default());
    assert_eq!(pool.lengths(), vec![4]);
    let members = pool.segments(0).expect("members");
    assert_eq!(&members[..3], &[2, 3, 4]);
    assert!(members[3] == 1 || members[3] == 5, "{members:?}");

    let mut seen = vec![false; seg.len()];
    for j in 0..pool.len() {
        for &s in pool.segments(j).expect("members") {
            assert!(!seen[s], "segment {s} reported twice");
            seen[s] = true;
        }
    }
}

#[test]
fn length_limits_filter_maximal_chains() {
    let seg = boxes(5, 3, 5, 10, 0);
    let too_long = ChainParams {
        lmax: 4,
        ..ChainParams::default()
    };
    assert!(chains(&seg, too_long).is_empty());

    let too_short = ChainParams {
        lmin: 6,
        lmax: 10,
        ..ChainParams::default()
    };
    assert!(chains(&seg, too_short).is_empty());

    let pair = boxes(2, 3, 5, 10, 0);
    let lmin_two = ChainParams {
        lmin: 2,
        ..ChainParams::default()
    };
    assert_eq!(chains(&pair, lmin_two).lengths(), vec![2]);
}

#[test]
fn failed_build_releases_everything() {
    let seg = boxes(6, 3, 5, 10, 0);
    let params = ChainParams::default();

    let measured = AllocBudget::unlimited();
    let pool = ChainBuilder::new(params.clone())
        .with_budget(&measured)
        .build(&seg)
        .expect("unlimited build");
    assert_eq!(pool.lengths(), vec![6]);
    assert_eq!(measured.in_use(), 0);
    drop(pool);
    assert_eq!(Arc::strong_count(&seg), 1);

    let tight = AllocBudget::with_limit(measured.peak() - 1);
    let err = ChainBuilder::new(params)
        .with_budget(&tight)
        .build(&seg)
        .expect_err("over budget");
    assert!(matches!(err, Error::OutOfMemory { .. }), "{err:?}");
    assert_eq!(tight.in_use(), 0);
    assert_eq!(Arc::strong_count(&seg), 1);
}

#[test]
fn convenience_constructor_matches_builder() {
    let seg = boxes(4, 3, 5, 10, 0);
    let params = ChainParams::default();
    let a = ChainPool::new(&seg, &params).expect("pool");
    let b = chains(&seg, params);
    assert_eq!(a.chains(), b.chains());
    assert_eq!(a.xmins(), b.xmins());
    assert!(Arc::ptr_eq(a.segmentation(), &seg));
}
