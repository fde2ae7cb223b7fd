//! Writes rendered frames to disk using the [`image`] crate.
//!
//! Two outputs are supported: a looping animated GIF and a numbered sequence of PNG files.

use crate::{ExportError, Frame};

use std::{
    borrow::Borrow,
    cell::RefCell,
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
    rc::Rc,
};

use image::{
    codecs::gif::{GifEncoder, Repeat},
    Delay, ImageFormat, RgbaImage,
};
use tracing::{debug, info};

/// Converts a frame into an opaque [`RgbaImage`], as needed by the GIF encoder.
#[must_use]
pub fn to_rgbaimage(frame: &Frame) -> RgbaImage {
    let (width, height) = frame.dimensions();
    RgbaImage::from_fn(width, height, |x, y| {
        let color = frame.pixels()[y as usize * width as usize + x as usize];
        image::Rgba([color.red, color.green, color.blue, u8::MAX])
    })
}

/// The in-memory sink of the GIF encoder.
///
/// The encoder only reports errors while encoding and writes its trailer on drop,
/// so it never touches the file directly. [`GifWriter`] moves the encoded bytes to disk itself.
#[derive(Debug, Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    /// Takes all bytes written so far.
    fn take(&self) -> Vec<u8> {
        self.0.take()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Streams frames into an infinitely looping animated GIF.
///
/// Each frame is written to the file as soon as it is encoded.
/// The file is only complete once [`GifWriter::finish`] returns `Ok`.
///
/// # Examples
/// ```no_run
/// # use kflow::{export::GifWriter, Flow, FlowOptions, ImageRef};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = image::open("some image")?.into_rgb8();
/// let mut flow = Flow::new(ImageRef::try_from(&img)?, FlowOptions::new())?;
///
/// let mut gif = GifWriter::create("flow.gif", 30)?;
/// for frame in flow.frames() {
///     gif.push(&frame)?;
/// }
/// gif.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct GifWriter {
    /// The underlying encoder, writing into `buffer`.
    encoder: GifEncoder<SharedBuffer>,
    /// Encoded bytes not yet written to `file`.
    buffer: SharedBuffer,
    /// The output file.
    file: File,
    /// The display time of each frame.
    delay: Delay,
    /// The number of frames written so far.
    frames: u32,
}

impl GifWriter {
    /// Creates the output file.
    ///
    /// # Errors
    /// Returns an error if `fps` is zero or the file cannot be created.
    pub fn create(path: impl AsRef<Path>, fps: u32) -> Result<Self, ExportError> {
        if fps == 0 {
            return Err(ExportError::ZeroFrameRate);
        }

        let file = File::create(path.as_ref())?;
        let buffer = SharedBuffer::default();
        let mut encoder = GifEncoder::new(buffer.clone());
        encoder.set_repeat(Repeat::Infinite)?;

        Ok(Self {
            encoder,
            buffer,
            file,
            delay: Delay::from_numer_denom_ms(1000, fps),
            frames: 0,
        })
    }

    /// Encodes one more frame and writes it to the file.
    ///
    /// # Errors
    /// Returns an error if encoding or writing fails.
    pub fn push(&mut self, frame: &Frame) -> Result<(), ExportError> {
        let buffer = to_rgbaimage(frame);
        self.encoder
            .encode_frame(image::Frame::from_parts(buffer, 0, 0, self.delay))?;
        self.file.write_all(&self.buffer.take())?;
        self.frames += 1;
        debug!(frame = self.frames, "gif frame encoded");
        Ok(())
    }

    /// Returns the number of frames written so far.
    #[must_use]
    pub const fn len(&self) -> u32 {
        self.frames
    }

    /// Returns whether no frames have been written yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.frames == 0
    }

    /// Writes the GIF trailer and flushes the file.
    ///
    /// # Errors
    /// Returns an error if no frames were pushed or writing fails.
    pub fn finish(self) -> Result<(), ExportError> {
        if self.is_empty() {
            return Err(ExportError::NoFrames);
        }

        let Self { encoder, buffer, mut file, frames, .. } = self;
        // dropping the encoder writes the trailer into the buffer
        drop(encoder);
        file.write_all(&buffer.take())?;
        file.flush()?;

        info!(frames, "gif written");
        Ok(())
    }
}

/// Writes all frames as an infinitely looping animated GIF at the given frame rate.
///
/// # Errors
/// Returns an error if there are no frames, `fps` is zero, or encoding or writing fails.
pub fn write_gif(frames: &[Frame], fps: u32, path: impl AsRef<Path>) -> Result<(), ExportError> {
    if frames.is_empty() {
        return Err(ExportError::NoFrames);
    }

    let mut gif = GifWriter::create(path, fps)?;
    for frame in frames {
        gif.push(frame)?;
    }
    gif.finish()
}

/// Returns the path of the `index`-th frame in a PNG sequence.
#[must_use]
pub fn png_frame_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame{index:04}.png"))
}

/// Writes one PNG file per frame into `dir`, named `frame0000.png`, `frame0001.png`, and so on.
/// The directory is created if it does not exist.
///
/// Frames are written as they are yielded, so a running [`Flow`](crate::Flow) can be
/// passed in directly without collecting it first.
///
/// # Errors
/// Returns an error if there are no frames or a file cannot be written.
pub fn write_png_sequence(
    frames: impl IntoIterator<Item = impl Borrow<Frame>>,
    dir: impl AsRef<Path>,
) -> Result<usize, ExportError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut count = 0;
    for (i, frame) in frames.into_iter().enumerate() {
        let path = png_frame_path(dir, i);
        frame
            .borrow()
            .clone()
            .into_rgbimage()
            .save_with_format(&path, ImageFormat::Png)?;
        debug!(frame = i, "png frame written");
        count += 1;
    }

    if count == 0 {
        return Err(ExportError::NoFrames);
    }

    info!(frames = count, dir = %dir.display(), "png sequence written");
    Ok(count)
}
