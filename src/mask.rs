// ============================================================================
// MASK — binary foreground/background raster from the segmentation service
// ============================================================================

/// Binary segmentation mask. `data` is row-major, one byte per cell, strictly
/// 0 or 1. Dimensions are independent of (and typically coarser than) the
/// image it describes — the service emits 256×256 regardless of input size —
/// and are mapped to image space by nearest neighbor at composite time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Mask {
    /// Build from a flat row-major buffer. Any value other than exactly 1 is
    /// normalized to background. `None` when `data` doesn't match the
    /// dimensions or either dimension is zero.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != (width as usize) * (height as usize) {
            return None;
        }
        let data = data.into_iter().map(|v| u8::from(v == 1)).collect();
        Some(Self { width, height, data })
    }

    /// Build from the segmentation service's nested-row payload (a JSON 2-D
    /// array of 0/1 numbers). All rows must share one length.
    pub fn from_rows(rows: &[Vec<u8>]) -> Option<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.len()) as u32;
        if rows.iter().any(|r| r.len() as u32 != width) {
            return None;
        }
        let data = rows.iter().flatten().copied().collect();
        Self::from_raw(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Foreground test. `x`/`y` are mask coordinates; out-of-bounds reads are
    /// background (composite-time coordinates are in-bounds by construction).
    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.data[y as usize * self.width as usize + x as usize] == 1
    }

    /// Width/height ratio, used to warn when a mask plainly belongs to a
    /// different image.
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_normalizes_non_one_values() {
        let m = Mask::from_raw(2, 2, vec![0, 1, 2, 255]).unwrap();
        assert!(!m.is_foreground(0, 0));
        assert!(m.is_foreground(1, 0));
        // 2 and 255 are not foreground: only exactly 1 counts.
        assert!(!m.is_foreground(0, 1));
        assert!(!m.is_foreground(1, 1));
    }

    #[test]
    fn from_raw_rejects_bad_lengths() {
        assert!(Mask::from_raw(2, 2, vec![1; 3]).is_none());
        assert!(Mask::from_raw(0, 2, vec![]).is_none());
    }

    #[test]
    fn from_rows_requires_rectangular_input() {
        assert!(Mask::from_rows(&[vec![1, 0], vec![0, 1]]).is_some());
        assert!(Mask::from_rows(&[vec![1, 0], vec![0]]).is_none());
        assert!(Mask::from_rows(&[]).is_none());
    }

    #[test]
    fn out_of_bounds_is_background() {
        let m = Mask::from_raw(1, 1, vec![1]).unwrap();
        assert!(m.is_foreground(0, 0));
        assert!(!m.is_foreground(1, 0));
        assert!(!m.is_foreground(0, 9));
    }
}
