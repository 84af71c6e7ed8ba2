use swrast::bits::{pdep_u32, pdep_u32_portable};
use swrast::{PIXELS_PER_TILE, TILE_WIDTH_IN_PIXELS, TILE_X_SWIZZLE_MASK, TILE_Y_SWIZZLE_MASK};

#[test]
fn swizzle_masks_partition_the_tile_index() {
    assert_eq!(TILE_X_SWIZZLE_MASK & TILE_Y_SWIZZLE_MASK, 0);
    assert_eq!(
        TILE_X_SWIZZLE_MASK | TILE_Y_SWIZZLE_MASK,
        PIXELS_PER_TILE as u32 - 1
    );
}

// The tile-local index (x,y) -> pdep(x, xmask) | pdep(y, ymask) is a
// bijection from [0,128)^2 onto [0, 128*128).
#[test]
fn swizzle_is_a_bijection() {
    let n = PIXELS_PER_TILE as usize;
    let mut seen = vec![false; n];

    for y in 0..TILE_WIDTH_IN_PIXELS as u32 {
        let ybits = pdep_u32(y, TILE_Y_SWIZZLE_MASK);
        for x in 0..TILE_WIDTH_IN_PIXELS as u32 {
            let i = (pdep_u32(x, TILE_X_SWIZZLE_MASK) | ybits) as usize;
            assert!(i < n, "index {} out of range for ({},{})", i, x, y);
            assert!(!seen[i], "index {} hit twice, at ({},{})", i, x, y);
            seen[i] = true;
        }
    }

    assert!(seen.iter().all(|&s| s));
}

// Hardware and portable pdep must agree bit for bit on every coordinate
// the framebuffer can feed them (absolute pixel coordinates go up to the
// 16384 dimension limit).
#[test]
fn pdep_hardware_portable_parity() {
    for v in 0..16384u32 {
        assert_eq!(
            pdep_u32(v, TILE_X_SWIZZLE_MASK),
            pdep_u32_portable(v, TILE_X_SWIZZLE_MASK),
            "x mask disagreement at {}",
            v
        );
        assert_eq!(
            pdep_u32(v, TILE_Y_SWIZZLE_MASK),
            pdep_u32_portable(v, TILE_Y_SWIZZLE_MASK),
            "y mask disagreement at {}",
            v
        );
    }
}

// The swizzle only looks at a coordinate's low 7 bits: absolute coordinates
// and tile-local offsets produce the same tile-local index.
#[test]
fn swizzle_depends_only_on_tile_local_bits() {
    for coord in 0..16384u32 {
        let local = coord % TILE_WIDTH_IN_PIXELS as u32;
        assert_eq!(
            pdep_u32(coord, TILE_X_SWIZZLE_MASK),
            pdep_u32(local, TILE_X_SWIZZLE_MASK)
        );
        assert_eq!(
            pdep_u32(coord, TILE_Y_SWIZZLE_MASK),
            pdep_u32(local, TILE_Y_SWIZZLE_MASK)
        );
    }
}
