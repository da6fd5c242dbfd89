use std::fs::File;
use std::io::Read;
use std::path::Path;

use miette::{Result, WrapErr};

use crate::error;
use crate::runtime::RunState;

/// Where an image landed in memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub orig: u16,
    /// Amount of words written, origin excluded.
    pub len: usize,
}

impl ImageInfo {
    /// Last address written, if any words were loaded.
    pub fn end(&self) -> Option<u16> {
        (self.len > 0).then(|| (self.orig as usize + self.len - 1) as u16)
    }
}

impl RunState {
    /// Copy a big-endian program image into memory.
    ///
    /// The first word is the origin, every following word is stored contiguously from
    /// there. Words past the end of memory and a trailing odd byte are dropped.
    /// Registers are left untouched.
    pub fn load_image(&mut self, mut reader: impl Read) -> Result<ImageInfo> {
        // Read to byte buffer
        let mut buffer = Vec::new();
        reader.read_to_end(&mut buffer).map_err(error::load_read)?;

        let Some((orig, body)) = buffer.split_first_chunk::<2>() else {
            return Err(error::load_no_origin(buffer.len()));
        };
        let orig = u16::from_be_bytes(*orig);

        // Memory past the origin bounds the amount of words taken
        let mem = &mut self.mem_slice_mut()[orig as usize..];
        let mut len = 0;
        for (slot, word) in mem.iter_mut().zip(body.chunks_exact(2)) {
            *slot = u16::from_be_bytes([word[0], word[1]]);
            len += 1;
        }

        Ok(ImageInfo { orig, len })
    }

    /// Open `path` and load it with [`RunState::load_image`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<ImageInfo> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| error::load_open(path, e))?;
        self.load_image(file)
            .wrap_err_with(|| format!("while loading `{}`", path.display()))
    }
}
