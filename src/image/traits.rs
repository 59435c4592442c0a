/// Row access to a single-channel 8-bit frame.
///
/// Everything the integral image needs from a pixel source; rows may be
/// padded in memory but `row` only returns the `width` visible pixels.
pub trait GrayRows {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    fn row(&self, y: usize) -> &[u8];

    fn rows(&self) -> impl Iterator<Item = &[u8]> + '_ {
        (0..self.height()).map(move |y| self.row(y))
    }

    /// Pixel count of the visible area.
    fn pixel_count(&self) -> usize {
        self.width() * self.height()
    }
}
