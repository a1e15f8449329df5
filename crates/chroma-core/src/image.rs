//! Stride-aware image descriptors.
//!
//! Processors consume pixels through a descriptor rather than a concrete
//! buffer type. A descriptor knows the caller's memory layout (interleaved
//! or planar, padded or flipped) and gathers scanlines into RGBA float
//! rows for the kernels, then scatters the results back.
//!
//! # Strides
//!
//! All strides are expressed in **bytes** and must address whole f32
//! elements (multiples of 4). [`AUTO_STRIDE`] in any stride field asks the
//! descriptor to compute the tight value from its siblings:
//!
//! - channel stride = `size_of::<f32>()`
//! - x stride = `num_channels * size_of::<f32>()`
//! - y stride = `width * x_stride`
//!
//! Negative strides are legal and describe flipped images; the walk is
//! anchored so that its lowest-addressed element is the start of the
//! supplied slice.
//!
//! # Alpha
//!
//! Three-channel images read as fully opaque (alpha 1.0) and alpha writes
//! are dropped. Channels beyond the fourth are never touched.

use crate::error::{CoreError, Result};

/// Sentinel stride value meaning "compute the tight stride from siblings".
pub const AUTO_STRIDE: isize = isize::MIN;

const ELEM: isize = size_of::<f32>() as isize;

/// Scanline access contract used by processors.
///
/// `read_row` gathers one scanline as interleaved RGBA floats into `row`
/// (which must hold at least `4 * width` values); `write_row` scatters it
/// back. Rows are indexed top to bottom in the descriptor's logical
/// orientation, independent of stride signs.
pub trait ImageDesc {
    /// Image width in pixels.
    fn width(&self) -> usize;

    /// Image height in pixels.
    fn height(&self) -> usize;

    /// Gathers row `y` into `row` as RGBA floats.
    fn read_row(&self, y: usize, row: &mut [f32]) -> Result<()>;

    /// Scatters `row` (RGBA floats) back into row `y`.
    fn write_row(&mut self, y: usize, row: &[f32]) -> Result<()>;
}

fn check_row_buf(width: usize, got: usize) -> Result<()> {
    let need = width * 4;
    if got < need {
        return Err(CoreError::RowBufferTooSmall { need, got });
    }
    Ok(())
}

fn stride_elems(bytes: isize, what: &str) -> Result<isize> {
    if bytes % ELEM != 0 {
        return Err(CoreError::InvalidStride {
            stride: bytes,
            reason: format!("{what} stride is not a multiple of {ELEM} bytes"),
        });
    }
    Ok(bytes / ELEM)
}

/// Interleaved (packed) image descriptor.
///
/// Describes a buffer where each pixel's channels are contiguous-ish,
/// addressed by a `(channel, x, y)` stride triple. Supports padded rows,
/// swizzled channel orders and flipped images.
///
/// # Example
///
/// ```rust
/// use chroma_core::{AUTO_STRIDE, ImageDesc, PackedImageDesc};
///
/// let mut buf = vec![0.0_f32; 2 * 2 * 4];
/// let desc = PackedImageDesc::with_strides(
///     &mut buf, 2, 2, 4, AUTO_STRIDE, AUTO_STRIDE, AUTO_STRIDE,
/// ).unwrap();
/// assert_eq!(desc.width(), 2);
/// ```
pub struct PackedImageDesc<'a> {
    data: &'a mut [f32],
    width: usize,
    height: usize,
    num_channels: usize,
    chan_stride: isize,
    x_stride: isize,
    y_stride: isize,
    origin: isize,
}

impl<'a> PackedImageDesc<'a> {
    /// Creates a descriptor with tight strides over an interleaved buffer.
    pub fn new(data: &'a mut [f32], width: usize, height: usize, num_channels: usize) -> Result<Self> {
        Self::with_strides(data, width, height, num_channels, AUTO_STRIDE, AUTO_STRIDE, AUTO_STRIDE)
    }

    /// Creates a descriptor with explicit byte strides.
    ///
    /// Any stride may be [`AUTO_STRIDE`]; negative strides flip the
    /// corresponding axis. Fails if the described extent does not fit the
    /// buffer or a stride does not address whole floats.
    pub fn with_strides(
        data: &'a mut [f32],
        width: usize,
        height: usize,
        num_channels: usize,
        chan_stride_bytes: isize,
        x_stride_bytes: isize,
        y_stride_bytes: isize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width,
                height,
                reason: "zero-sized image".into(),
            });
        }
        if num_channels < 3 {
            return Err(CoreError::ChannelCount(num_channels));
        }

        let chan_bytes = if chan_stride_bytes == AUTO_STRIDE {
            ELEM
        } else {
            chan_stride_bytes
        };
        let x_bytes = if x_stride_bytes == AUTO_STRIDE {
            chan_bytes.abs().max(ELEM) * num_channels as isize
        } else {
            x_stride_bytes
        };
        let y_bytes = if y_stride_bytes == AUTO_STRIDE {
            x_bytes.abs().max(ELEM) * width as isize
        } else {
            y_stride_bytes
        };

        let chan_stride = stride_elems(chan_bytes, "channel")?;
        let x_stride = stride_elems(x_bytes, "x")?;
        let y_stride = stride_elems(y_bytes, "y")?;

        // Anchor the walk so its lowest-addressed element is data[0].
        let span = |stride: isize, count: usize| stride * (count as isize - 1);
        let extents = [
            span(chan_stride, num_channels),
            span(x_stride, width),
            span(y_stride, height),
        ];
        let lo: isize = extents.iter().map(|e| (*e).min(0)).sum();
        let hi: isize = extents.iter().map(|e| (*e).max(0)).sum();
        let origin = -lo;
        if hi - lo >= data.len() as isize {
            return Err(CoreError::OutOfBounds {
                index: hi - lo,
                len: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            num_channels,
            chan_stride,
            x_stride,
            y_stride,
            origin,
        })
    }

    /// Channel count of the underlying buffer.
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[inline]
    fn index(&self, x: usize, y: usize, c: usize) -> usize {
        (self.origin + y as isize * self.y_stride + x as isize * self.x_stride + c as isize * self.chan_stride) as usize
    }
}

impl ImageDesc for PackedImageDesc<'_> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    fn read_row(&self, y: usize, row: &mut [f32]) -> Result<()> {
        check_row_buf(self.width, row.len())?;
        let has_alpha = self.num_channels >= 4;
        for x in 0..self.width {
            let px = &mut row[x * 4..x * 4 + 4];
            px[0] = self.data[self.index(x, y, 0)];
            px[1] = self.data[self.index(x, y, 1)];
            px[2] = self.data[self.index(x, y, 2)];
            px[3] = if has_alpha { self.data[self.index(x, y, 3)] } else { 1.0 };
        }
        Ok(())
    }

    fn write_row(&mut self, y: usize, row: &[f32]) -> Result<()> {
        check_row_buf(self.width, row.len())?;
        let store = self.num_channels.min(4);
        for x in 0..self.width {
            let px = &row[x * 4..x * 4 + 4];
            for c in 0..store {
                let i = self.index(x, y, c);
                self.data[i] = px[c];
            }
        }
        Ok(())
    }
}

/// Planar image descriptor.
///
/// Separate R, G, B and optional A planes sharing one y stride. Pixels
/// within a row are contiguous in each plane.
pub struct PlanarImageDesc<'a> {
    r: &'a mut [f32],
    g: &'a mut [f32],
    b: &'a mut [f32],
    a: Option<&'a mut [f32]>,
    width: usize,
    height: usize,
    y_stride: isize,
    origin: isize,
}

impl<'a> PlanarImageDesc<'a> {
    /// Creates a planar descriptor with a tight y stride.
    pub fn new(
        r: &'a mut [f32],
        g: &'a mut [f32],
        b: &'a mut [f32],
        a: Option<&'a mut [f32]>,
        width: usize,
        height: usize,
    ) -> Result<Self> {
        Self::with_y_stride(r, g, b, a, width, height, AUTO_STRIDE)
    }

    /// Creates a planar descriptor with an explicit y stride in bytes.
    pub fn with_y_stride(
        r: &'a mut [f32],
        g: &'a mut [f32],
        b: &'a mut [f32],
        a: Option<&'a mut [f32]>,
        width: usize,
        height: usize,
        y_stride_bytes: isize,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions {
                width,
                height,
                reason: "zero-sized image".into(),
            });
        }
        let y_bytes = if y_stride_bytes == AUTO_STRIDE {
            width as isize * ELEM
        } else {
            y_stride_bytes
        };
        let y_stride = stride_elems(y_bytes, "y")?;

        let row_span = y_stride * (height as isize - 1);
        let lo = row_span.min(0);
        let hi = row_span.max(0) + width as isize - 1;
        let origin = -lo;
        let need = (hi - lo) as usize;
        for plane in [&*r, &*g, &*b].into_iter().chain(a.as_deref()) {
            if need >= plane.len() {
                return Err(CoreError::OutOfBounds {
                    index: hi - lo,
                    len: plane.len(),
                });
            }
        }

        Ok(Self {
            r,
            g,
            b,
            a,
            width,
            height,
            y_stride,
            origin,
        })
    }

    #[inline]
    fn row_start(&self, y: usize) -> usize {
        (self.origin + y as isize * self.y_stride) as usize
    }
}

impl ImageDesc for PlanarImageDesc<'_> {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    fn read_row(&self, y: usize, row: &mut [f32]) -> Result<()> {
        check_row_buf(self.width, row.len())?;
        let start = self.row_start(y);
        for x in 0..self.width {
            let px = &mut row[x * 4..x * 4 + 4];
            px[0] = self.r[start + x];
            px[1] = self.g[start + x];
            px[2] = self.b[start + x];
            px[3] = match &self.a {
                Some(a) => a[start + x],
                None => 1.0,
            };
        }
        Ok(())
    }

    fn write_row(&mut self, y: usize, row: &[f32]) -> Result<()> {
        check_row_buf(self.width, row.len())?;
        let start = self.row_start(y);
        for x in 0..self.width {
            let px = &row[x * 4..x * 4 + 4];
            self.r[start + x] = px[0];
            self.g[start + x] = px[1];
            self.b[start + x] = px[2];
            if let Some(a) = self.a.as_mut() {
                a[start + x] = px[3];
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_strides_rgba() {
        let mut buf: Vec<f32> = (0..2 * 2 * 4).map(|i| i as f32).collect();
        let desc = PackedImageDesc::new(&mut buf, 2, 2, 4).unwrap();

        let mut row = vec![0.0; 8];
        desc.read_row(1, &mut row).unwrap();
        assert_eq!(&row[..4], &[8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_rgb_alpha_defaults_opaque() {
        let mut buf = vec![0.25_f32; 3 * 3 * 3];
        let mut desc = PackedImageDesc::new(&mut buf, 3, 3, 3).unwrap();

        let mut row = vec![0.0; 12];
        desc.read_row(0, &mut row).unwrap();
        assert_eq!(row[3], 1.0);

        // Alpha writes are dropped for 3-channel buffers.
        row[3] = 0.5;
        desc.write_row(0, &row).unwrap();
        assert_eq!(buf[0], 0.25);
    }

    #[test]
    fn test_negative_y_stride_flips() {
        // 2x2 RGBA; with a negative y stride row 0 reads the buffer's last row.
        let mut buf: Vec<f32> = (0..2 * 2 * 4).map(|i| i as f32).collect();
        let desc = PackedImageDesc::with_strides(
            &mut buf,
            2,
            2,
            4,
            AUTO_STRIDE,
            AUTO_STRIDE,
            -32,
        )
        .unwrap();

        let mut row = vec![0.0; 8];
        desc.read_row(0, &mut row).unwrap();
        assert_eq!(row[0], 8.0);
        desc.read_row(1, &mut row).unwrap();
        assert_eq!(row[0], 0.0);
    }

    #[test]
    fn test_padded_rows() {
        // 2 pixels per row, row stride of 3 RGBA pixels.
        let mut buf: Vec<f32> = (0..3 * 2 * 4).map(|i| i as f32).collect();
        let desc =
            PackedImageDesc::with_strides(&mut buf, 2, 2, 4, AUTO_STRIDE, AUTO_STRIDE, 48).unwrap();

        let mut row = vec![0.0; 8];
        desc.read_row(1, &mut row).unwrap();
        assert_eq!(row[0], 12.0);
    }

    #[test]
    fn test_misaligned_stride_rejected() {
        let mut buf = vec![0.0_f32; 64];
        let err = PackedImageDesc::with_strides(&mut buf, 2, 2, 4, AUTO_STRIDE, 13, AUTO_STRIDE);
        assert!(matches!(err, Err(CoreError::InvalidStride { .. })));
    }

    #[test]
    fn test_too_small_buffer_rejected() {
        let mut buf = vec![0.0_f32; 8];
        let err = PackedImageDesc::new(&mut buf, 2, 2, 4);
        assert!(matches!(err, Err(CoreError::OutOfBounds { .. })));
    }

    #[test]
    fn test_planar_roundtrip() {
        let mut r = vec![0.1_f32; 4];
        let mut g = vec![0.2_f32; 4];
        let mut b = vec![0.3_f32; 4];
        let mut a = vec![0.4_f32; 4];
        let mut desc =
            PlanarImageDesc::new(&mut r, &mut g, &mut b, Some(&mut a), 2, 2).unwrap();

        let mut row = vec![0.0; 8];
        desc.read_row(0, &mut row).unwrap();
        assert_eq!(&row[..4], &[0.1, 0.2, 0.3, 0.4]);

        row[0] = 0.9;
        desc.write_row(0, &row).unwrap();
        assert_eq!(r[0], 0.9);
    }

    #[test]
    fn test_planar_no_alpha() {
        let mut r = vec![0.0_f32; 2];
        let mut g = vec![0.0_f32; 2];
        let mut b = vec![0.0_f32; 2];
        let desc = PlanarImageDesc::new(&mut r, &mut g, &mut b, None, 2, 1).unwrap();

        let mut row = vec![0.0; 8];
        desc.read_row(0, &mut row).unwrap();
        assert_eq!(row[3], 1.0);
    }
}
