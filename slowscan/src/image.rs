//! Rasters going into the encoder and the per-channel grid coming out of the
//! decoder.

use image::{
    Rgb,
    RgbImage,
    RgbaImage,
};

use crate::{
    modes::{
        ColorFormat,
        ModeSpecification,
    },
    util::round_to_u8,
};

/// Chroma value meaning "no color difference".
pub const NEUTRAL_CHROMA: u8 = 128;

pub trait FrameBuffer {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Red, green and blue at `(x, y)`. Both must be in bounds.
    fn rgb(&self, x: usize, y: usize) -> [u8; 3];
}

impl<F> FrameBuffer for &F
where
    F: FrameBuffer,
{
    #[inline]
    fn width(&self) -> usize {
        (&**self).width()
    }

    #[inline]
    fn height(&self) -> usize {
        (&**self).height()
    }

    #[inline]
    fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        (&**self).rgb(x, y)
    }
}

impl FrameBuffer for RgbImage {
    #[inline]
    fn width(&self) -> usize {
        RgbImage::width(self) as usize
    }

    #[inline]
    fn height(&self) -> usize {
        RgbImage::height(self) as usize
    }

    #[inline]
    fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        self.get_pixel(x as u32, y as u32).0
    }
}

impl FrameBuffer for RgbaImage {
    #[inline]
    fn width(&self) -> usize {
        RgbaImage::width(self) as usize
    }

    #[inline]
    fn height(&self) -> usize {
        RgbaImage::height(self) as usize
    }

    #[inline]
    fn rgb(&self, x: usize, y: usize) -> [u8; 3] {
        let [red, green, blue, _alpha] = self.get_pixel(x as u32, y as u32).0;
        [red, green, blue]
    }
}

/// Channel values indexed by `[line][channel][pixel]`, as they were scanned.
///
/// Starts out all zero. The decoder writes each cell at most once, in scan
/// order, so a partially decoded image is a prefix of the full one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageGrid {
    num_lines: usize,
    num_channels: usize,
    width: usize,
    data: Vec<u8>,
}

impl ImageGrid {
    pub fn new(num_lines: usize, num_channels: usize, width: usize) -> Self {
        Self {
            num_lines,
            num_channels,
            width,
            data: vec![0; num_lines * num_channels * width],
        }
    }

    pub fn for_mode(mode: &ModeSpecification) -> Self {
        Self::new(mode.num_lines, mode.num_channels, mode.pixels_per_line)
    }

    #[inline]
    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn index(&self, line: usize, channel: usize, x: usize) -> usize {
        assert!(line < self.num_lines && channel < self.num_channels && x < self.width);
        (line * self.num_channels + channel) * self.width + x
    }

    #[inline]
    pub fn get(&self, line: usize, channel: usize, x: usize) -> u8 {
        self.data[self.index(line, channel, x)]
    }

    #[inline]
    pub fn set(&mut self, line: usize, channel: usize, x: usize, value: u8) {
        let index = self.index(line, channel, x);
        self.data[index] = value;
    }

    /// The scan of `channel` on `line`.
    pub fn scan(&self, line: usize, channel: usize) -> &[u8] {
        let start = self.index(line, channel, 0);
        &self.data[start..start + self.width]
    }

    /// Value of a channel that the mode might not have.
    #[inline]
    fn get_or_zero(&self, line: usize, channel: usize, x: usize) -> u8 {
        if channel < self.num_channels {
            self.get(line, channel, x)
        }
        else {
            0
        }
    }
}

/// Rows holding the chroma components for a line of an alternating-chroma
/// scan. `None` means the row would fall outside the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChromaRows {
    pub u: Option<usize>,
    pub v: Option<usize>,
}

/// Even lines carry V and borrow U from the line below. Odd lines carry U and
/// borrow V from the line above.
pub fn chroma_rows(line: usize, num_lines: usize) -> ChromaRows {
    let (u, v) = if line % 2 == 0 {
        (Some(line + 1), Some(line))
    }
    else {
        (Some(line), line.checked_sub(1))
    };
    let in_bounds = |row: &usize| *row < num_lines;
    ChromaRows {
        u: u.filter(in_bounds),
        v: v.filter(in_bounds),
    }
}

/// Full-range YCbCr to RGB.
pub fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = f32::from(y);
    let u = f32::from(u) - 128.0;
    let v = f32::from(v) - 128.0;
    [
        round_to_u8(y + 1.402 * v),
        round_to_u8(y - 0.344136 * u - 0.714136 * v),
        round_to_u8(y + 1.772 * u),
    ]
}

/// Full-range RGB to YCbCr, the inverse of [`yuv_to_rgb`].
pub fn rgb_to_yuv([red, green, blue]: [u8; 3]) -> [u8; 3] {
    let red = f32::from(red);
    let green = f32::from(green);
    let blue = f32::from(blue);
    [
        round_to_u8(0.299 * red + 0.587 * green + 0.114 * blue),
        round_to_u8(128.0 - 0.168736 * red - 0.331264 * green + 0.5 * blue),
        round_to_u8(128.0 + 0.5 * red - 0.418688 * green - 0.081312 * blue),
    ]
}

/// Converts a decoded grid into an RGB image according to the mode's color
/// format.
pub fn compose(grid: &ImageGrid, mode: &ModeSpecification) -> RgbImage {
    tracing::debug!(mode = mode.name, "drawing image data");

    RgbImage::from_fn(grid.width() as u32, grid.num_lines() as u32, |x, y| {
        Rgb(compose_pixel(grid, mode, x as usize, y as usize))
    })
}

fn compose_pixel(grid: &ImageGrid, mode: &ModeSpecification, x: usize, line: usize) -> [u8; 3] {
    let channel = |channel| grid.get_or_zero(line, channel, x);

    match mode.color_format {
        ColorFormat::Gbr => [channel(2), channel(0), channel(1)],
        ColorFormat::Rgb => [channel(0), channel(1), channel(2)],
        ColorFormat::Gray => {
            let value = channel(0);
            [value, value, value]
        }
        ColorFormat::Yuv if mode.has_alternating_scan => {
            let rows = chroma_rows(line, grid.num_lines());
            let chroma = |row: Option<usize>| {
                row.map_or(NEUTRAL_CHROMA, |row| grid.get_or_zero(row, 1, x))
            };
            yuv_to_rgb(channel(0), chroma(rows.u), chroma(rows.v))
        }
        ColorFormat::Yuv => yuv_to_rgb(channel(0), channel(2), channel(1)),
    }
}

#[cfg(test)]
mod tests {
    use image::{
        Rgb,
        Rgba,
        RgbImage,
        RgbaImage,
    };

    use crate::{
        image::{
            ChromaRows,
            FrameBuffer,
            ImageGrid,
            chroma_rows,
            compose,
            rgb_to_yuv,
            yuv_to_rgb,
        },
        modes::{
            ColorFormat,
            ModeSpecification,
            builtin_modes,
        },
    };

    fn filled_grid(mode: &ModeSpecification, value: u8) -> ImageGrid {
        let mut grid = ImageGrid::for_mode(mode);
        for line in 0..grid.num_lines() {
            for channel in 0..grid.num_channels() {
                for x in 0..grid.width() {
                    grid.set(line, channel, x, value);
                }
            }
        }
        grid
    }

    #[test]
    fn neutral_gray_is_a_fixed_point() {
        assert_eq!(yuv_to_rgb(128, 128, 128), [128, 128, 128]);
        for mode in builtin_modes() {
            let image = compose(&filled_grid(mode, 128), mode);
            assert!(
                image.pixels().all(|pixel| pixel.0 == [128, 128, 128]),
                "{}",
                mode.name
            );
        }
    }

    #[test]
    fn rgb_and_gray_formats() {
        let rgb = ModeSpecification {
            color_format: ColorFormat::Rgb,
            ..ModeSpecification::M1
        };
        let image = compose(&filled_grid(&rgb, 128), &rgb);
        assert!(image.pixels().all(|pixel| pixel.0 == [128, 128, 128]));

        let mut grid = ImageGrid::for_mode(&rgb);
        grid.set(5, 0, 9, 10);
        grid.set(5, 1, 9, 20);
        grid.set(5, 2, 9, 30);
        assert_eq!(compose(&grid, &rgb).get_pixel(9, 5).0, [10, 20, 30]);

        // gray only looks at the first channel
        let gray = ModeSpecification {
            color_format: ColorFormat::Gray,
            num_channels: 1,
            ..ModeSpecification::M1
        };
        let mut grid = ImageGrid::for_mode(&gray);
        grid.set(5, 0, 9, 77);
        let image = compose(&grid, &gray);
        assert_eq!(image.get_pixel(9, 5).0, [77, 77, 77]);
        assert_eq!(image.get_pixel(10, 5).0, [0, 0, 0]);

        // extra channels of a gray grid are ignored
        let mut grid = ImageGrid::for_mode(&ModeSpecification::M1);
        grid.set(0, 0, 0, 40);
        grid.set(0, 1, 0, 200);
        grid.set(0, 2, 0, 250);
        assert_eq!(compose(&grid, &gray).get_pixel(0, 0).0, [40, 40, 40]);
    }

    #[test]
    fn gbr_channel_order() {
        let mode = ModeSpecification::M1;
        let mut grid = ImageGrid::for_mode(&mode);
        grid.set(3, 0, 7, 10);
        grid.set(3, 1, 7, 20);
        grid.set(3, 2, 7, 30);
        let image = compose(&grid, &mode);
        assert_eq!(image.get_pixel(7, 3).0, [30, 10, 20]);
        assert_eq!(image.get_pixel(8, 3).0, [0, 0, 0]);
    }

    #[test]
    fn robot_72_chroma_order() {
        let mode = ModeSpecification::R72;
        let mut grid = ImageGrid::for_mode(&mode);
        // pure red: y=76, u=85, v=255
        grid.set(0, 0, 0, 76);
        grid.set(0, 1, 0, 255);
        grid.set(0, 2, 0, 85);
        let [red, green, blue] = compose(&grid, &mode).get_pixel(0, 0).0;
        assert!(red > 240, "{red}");
        assert!(green < 10, "{green}");
        assert!(blue < 10, "{blue}");
    }

    #[test]
    fn alternating_chroma_rows() {
        assert_eq!(
            chroma_rows(0, 240),
            ChromaRows {
                u: Some(1),
                v: Some(0)
            }
        );
        assert_eq!(
            chroma_rows(1, 240),
            ChromaRows {
                u: Some(1),
                v: Some(0)
            }
        );
        assert_eq!(
            chroma_rows(238, 240),
            ChromaRows {
                u: Some(239),
                v: Some(238)
            }
        );
        assert_eq!(
            chroma_rows(239, 240),
            ChromaRows {
                u: Some(239),
                v: Some(238)
            }
        );
        // the last line of an odd-height image has nobody to borrow U from
        assert_eq!(chroma_rows(4, 5), ChromaRows { u: None, v: Some(4) });
    }

    #[test]
    fn alternating_chroma_is_shared_by_line_pairs() {
        let mode = ModeSpecification::R36;
        let mut grid = ImageGrid::for_mode(&mode);
        for line in 0..2 {
            grid.set(line, 0, 0, 128);
        }
        // line 0 carries V, line 1 carries U
        grid.set(0, 1, 0, 200);
        grid.set(1, 1, 0, 128);
        let image = compose(&grid, &mode);
        assert_eq!(image.get_pixel(0, 0), image.get_pixel(0, 1));
        assert_eq!(image.get_pixel(0, 0).0, yuv_to_rgb(128, 128, 200));
    }

    #[test]
    fn color_conversion_round_trips() {
        for rgb in [
            [0, 0, 0],
            [255, 255, 255],
            [255, 0, 0],
            [0, 255, 0],
            [0, 0, 255],
            [12, 200, 99],
        ] {
            let [y, u, v] = rgb_to_yuv(rgb);
            let back = yuv_to_rgb(y, u, v);
            for (a, b) in rgb.iter().zip(&back) {
                assert!(a.abs_diff(*b) <= 2, "{rgb:?} -> {back:?}");
            }
        }
    }

    #[test]
    fn rgba_frame_buffer_drops_alpha() {
        let image = RgbaImage::from_pixel(2, 3, Rgba([1, 2, 3, 4]));
        assert_eq!(FrameBuffer::width(&image), 2);
        assert_eq!(FrameBuffer::height(&image), 3);
        assert_eq!(image.rgb(1, 2), [1, 2, 3]);

        let image = RgbImage::from_pixel(2, 3, Rgb([5, 6, 7]));
        assert_eq!(image.rgb(0, 0), [5, 6, 7]);
    }
}
