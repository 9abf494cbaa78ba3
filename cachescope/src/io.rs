use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use crate::error::TraceError;

/// Owned contents of a trace file, readable as a plain byte slice.
pub struct TraceBytes {
    #[cfg(unix)]
    map: memmap2::Mmap,
    #[cfg(not(unix))]
    buffer: Vec<u8>,
}

impl Deref for TraceBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        #[cfg(unix)]
        {
            &self.map
        }
        #[cfg(not(unix))]
        {
            &self.buffer
        }
    }
}

/// Reads a trace file into memory.
pub fn read_bytes(path: &Path) -> Result<TraceBytes, TraceError> {
    let file = File::open(path)?;
    // Memory map the file for speed on unix systems; trace files for long
    // runs reach hundreds of megabytes.
    #[cfg(unix)]
    {
        use memmap2::{Advice, Mmap};
        unsafe {
            let map = Mmap::map(&file)?;
            map.advise(Advice::Sequential)?;
            Ok(TraceBytes { map })
        }
    }
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::Read;
        let mut buffer = Vec::new();
        std::io::BufReader::new(file).read_to_end(&mut buffer)?;
        Ok(TraceBytes { buffer })
    }
}
