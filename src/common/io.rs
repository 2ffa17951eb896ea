use std::fs::{self, File};
use std::io::{self, BufWriter, Read, StdoutLock, Write};
use std::ops::Deref;
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapOptions};
use tempfile::NamedTempFile;

/// Holds input data — either a read-only mmap or an owned Vec.
/// Dereferences to `&[u8]` so parsed records can borrow from it.
pub enum FileData {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

/// Files below this size are read into a Vec; mmap setup costs more than
/// the copy it saves.
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// Allocate a zeroed buffer of `len` bytes, reporting allocation failure as
/// `ErrorKind::OutOfMemory` instead of aborting.
fn alloc_buffer(len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| io::Error::new(io::ErrorKind::OutOfMemory, e))?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Open `path` for reading. Split out from `read_file` so callers can tell
/// an open failure apart from a read failure.
pub fn open_input(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Load an already-opened file: mmap for large regular files, a single
/// exact-size read otherwise.
pub fn read_file(file: File) -> io::Result<FileData> {
    let metadata = file.metadata()?;
    let len = metadata.len();

    if len == 0 {
        // Empty regular file, or a special file whose size is unknown.
        if metadata.file_type().is_file() {
            return Ok(FileData::Owned(Vec::new()));
        }
        return read_to_end(file).map(FileData::Owned);
    }

    if !metadata.file_type().is_file() {
        return read_to_end(file).map(FileData::Owned);
    }

    if len < MMAP_THRESHOLD {
        let mut buf = alloc_buffer(len as usize)?;
        let n = read_full(&mut &file, &mut buf)?;
        buf.truncate(n);
        return Ok(FileData::Owned(buf));
    }

    // SAFETY: read-only mapping; the file is not modified while we hold it.
    match unsafe { MmapOptions::new().map(&file) } {
        Ok(mmap) => {
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
                let _ = mmap.advise(memmap2::Advice::WillNeed);
            }
            Ok(FileData::Mmap(mmap))
        }
        Err(_) => {
            // mmap failed — fall back to read
            let mut buf = alloc_buffer(len as usize)?;
            let n = read_full(&mut &file, &mut buf)?;
            buf.truncate(n);
            Ok(FileData::Owned(buf))
        }
    }
}

/// Read all of standard input.
pub fn read_stdin() -> io::Result<FileData> {
    read_to_end(io::stdin().lock()).map(FileData::Owned)
}

fn read_to_end(mut reader: impl Read) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(buf)
}

/// Read as many bytes as possible into buf, retrying on partial reads.
/// Stops early only at EOF (the file shrank after fstat).
#[inline]
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => break,
            Ok(n) => total += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(total)
}

/// Output buffer size; output lines are short, so batch them.
const OUTPUT_BUF_SIZE: usize = 256 * 1024;

/// Destination of the compacted hosts file.
///
/// Regular files are never truncated in place: data goes to a temporary
/// file in the target's directory that `commit` renames over the target.
/// The input may be an mmap of that same file, and its pages must stay
/// valid until the last record is written. Dropping an uncommitted output
/// removes the temporary file and leaves the target untouched.
pub enum OutputFile {
    Stdout(BufWriter<StdoutLock<'static>>),
    /// Devices, FIFOs and other non-regular targets are written directly.
    Direct(BufWriter<File>),
    Replace {
        writer: BufWriter<NamedTempFile>,
        target: PathBuf,
    },
}

impl OutputFile {
    pub fn stdout() -> Self {
        OutputFile::Stdout(BufWriter::with_capacity(OUTPUT_BUF_SIZE, io::stdout().lock()))
    }

    /// Prepare to write `path`. Nothing at `path` changes before `commit`,
    /// except for non-regular targets.
    pub fn create(path: &Path) -> io::Result<Self> {
        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return replace_file(path.to_path_buf(), None);
            }
            Err(e) => return Err(e),
        };
        if !meta.is_file() {
            let file = File::create(path)?;
            return Ok(OutputFile::Direct(BufWriter::with_capacity(OUTPUT_BUF_SIZE, file)));
        }
        // Resolve symlinks so the rename replaces the file, not the link.
        replace_file(fs::canonicalize(path)?, Some(meta.permissions()))
    }

    /// Flush everything and, for regular files, move the result into place.
    pub fn commit(self) -> io::Result<()> {
        match self {
            OutputFile::Stdout(mut w) => w.flush(),
            OutputFile::Direct(mut w) => w.flush(),
            OutputFile::Replace { writer, target } => {
                let temp = writer.into_inner().map_err(|e| e.into_error())?;
                temp.persist(&target)?;
                Ok(())
            }
        }
    }
}

fn replace_file(target: PathBuf, permissions: Option<fs::Permissions>) -> io::Result<OutputFile> {
    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp = NamedTempFile::new_in(dir)?;
    // Temporary files are created 0600; keep the target's mode, or use the
    // usual 0644 for a new file.
    match permissions {
        Some(perms) => temp.as_file().set_permissions(perms)?,
        None => {
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                temp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
            }
        }
    }
    Ok(OutputFile::Replace {
        writer: BufWriter::with_capacity(OUTPUT_BUF_SIZE, temp),
        target,
    })
}

impl Write for OutputFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputFile::Stdout(w) => w.write(buf),
            OutputFile::Direct(w) => w.write(buf),
            OutputFile::Replace { writer, .. } => writer.write(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            OutputFile::Stdout(w) => w.write_all(buf),
            OutputFile::Direct(w) => w.write_all(buf),
            OutputFile::Replace { writer, .. } => writer.write_all(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputFile::Stdout(w) => w.flush(),
            OutputFile::Direct(w) => w.flush(),
            OutputFile::Replace { writer, .. } => writer.flush(),
        }
    }
}
