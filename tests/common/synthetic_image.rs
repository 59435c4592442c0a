/// Flat image with every pixel set to `value`.
pub fn uniform_u8(width: usize, height: usize, value: u8) -> Vec<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    vec![value; width * height]
}

/// Uniform `background` with a `size × size` vertical-edge pattern at
/// `(x0, y0)`: dark left half, bright right half.
pub fn edge_pattern_u8(
    width: usize,
    height: usize,
    background: u8,
    (x0, y0): (usize, usize),
    size: usize,
) -> Vec<u8> {
    assert!(x0 + size <= width && y0 + size <= height, "pattern out of bounds");
    let mut img = uniform_u8(width, height, background);
    for y in y0..y0 + size {
        for x in x0..x0 + size {
            img[y * width + x] = if x < x0 + size / 2 { 30 } else { 220 };
        }
    }
    img
}
