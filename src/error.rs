use std::io;
use std::path::Path;

use miette::{miette, Report, Severity};

// Loader errors

pub fn load_open(path: &Path, e: io::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::open",
        help = "check that the path exists and is readable",
        "Could not open image `{}`: {e}",
        path.display(),
    )
}

pub fn load_read(e: io::Error) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::read",
        help = "the image could not be read to the end",
        "Failed while reading image: {e}",
    )
}

pub fn load_no_origin(len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::origin",
        help = "an image must start with a 16-bit big-endian origin address",
        "Image is too short to contain an origin ({len} byte(s))",
    )
}
