use swrast::fixed::flt_s1516;
use swrast::{Attachment, Framebuffer, PixelFormat};

const W: usize = 256;

fn tri(verts: [(f32, f32); 3]) -> Vec<i32> {
    verts
        .iter()
        .flat_map(|&(x, y)| vec![flt_s1516(x), flt_s1516(y), 0, flt_s1516(1.0)])
        .collect()
}

fn coverage(draws: &[Vec<i32>]) -> Vec<bool> {
    let mut fb = Framebuffer::new(W as i32, W as i32);
    fb.clear(0x0000_0000);
    for d in draws {
        fb.draw(d);
    }
    fb.resolve();

    let mut buf = vec![0u8; W * W * 4];
    fb.pack_row_major(Attachment::Color0, 0, 0, W as i32, W as i32, PixelFormat::Rgba8Unorm, &mut buf);
    (0..W * W).map(|i| buf[i * 4 + 3] != 0).collect()
}

// Two triangles splitting the window quadrant [128,256) x [0,128) along its
// diagonal. The top-left fill rule must hand every pixel of the square to
// exactly one of them: no double cover, no seam gap.
#[test]
fn t03_shared_edge_no_overlap_no_gap() {
    let a = tri([(0.0, 1.0), (1.0, 1.0), (0.0, 0.0)]);
    let b = tri([(1.0, 1.0), (1.0, 0.0), (0.0, 0.0)]);

    let cov_a = coverage(&[a.clone()]);
    let cov_b = coverage(&[b.clone()]);
    let cov_union = coverage(&[a, b]);

    let mut n_a = 0;
    let mut n_b = 0;
    for y in 0..W {
        for x in 0..W {
            let i = y * W + x;

            // never both
            assert!(!(cov_a[i] && cov_b[i]), "double cover at {},{}", x, y);

            // the union render covers a pixel iff one of the two does
            assert_eq!(cov_union[i], cov_a[i] || cov_b[i], "at {},{}", x, y);

            // strictly inside the square: exactly one
            if (130..=253).contains(&x) && (2..=125).contains(&y) {
                assert!(cov_a[i] ^ cov_b[i], "seam problem at {},{}", x, y);
            }

            // outside the square: neither
            if x < 127 || y > 129 {
                assert!(!cov_a[i] && !cov_b[i], "stray cover at {},{}", x, y);
            }

            n_a += cov_a[i] as usize;
            n_b += cov_b[i] as usize;
        }
    }

    // each triangle owns about half of the 128x128 square
    let total = n_a + n_b;
    assert!(total > 16000 && total <= 16500, "total {}", total);
    assert!(n_a > 7500 && n_b > 7500, "lopsided split {} / {}", n_a, n_b);
}

// The same invariant on a harder shape: a fan of triangles sharing edges
// both with each other and with the square's border.
#[test]
fn t03_shared_edge_partition_many_splits() {
    // a fan of four triangles around (0.5, 0.5) of the quadrant, all
    // sharing edges pairwise
    let c = (0.5, 0.5);
    let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
    let tris: Vec<Vec<i32>> = (0..4)
        .map(|i| tri([corners[i], corners[(i + 1) % 4], c]))
        .collect();

    let separate: Vec<Vec<bool>> = tris.iter().map(|t| coverage(&[t.clone()])).collect();

    for i in 0..W * W {
        let n = separate.iter().filter(|cov| cov[i]).count();
        assert!(n <= 1, "pixel {} covered by {} fan triangles", i, n);
    }

    // the fan tiles the whole square
    let union = coverage(&[tris.concat()]);
    let n_union = union.iter().filter(|&&c| c).count();
    let n_sum: usize = separate
        .iter()
        .map(|cov| cov.iter().filter(|&&c| c).count())
        .sum();
    assert_eq!(n_union, n_sum);
    assert!(n_union > 16000 && n_union <= 16500, "union {}", n_union);
}
