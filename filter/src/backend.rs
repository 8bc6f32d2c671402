//! The concrete [`Filter`]/[`FilterBackend`] this service ships with: a
//! standard (non-counting, non-scalable) Bloom filter over a bit array that
//! is either pure in-memory, memory-mapped, or read fully into a buffer —
//! selected the same way the teacher's local-disk storage backend picks
//! between `memmap2::Mmap` and a plain `read_to_end` buffer (SPEC_FULL §4.10).

use std::{
    fs::{File, OpenOptions},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use bloomd_manager::{
    FILTER_DIR_PREFIX, FilterParams,
    filter::{Filter, FilterBackend, FilterError, Result as FilterResult},
};

use crate::{
    bits,
    error::Error,
    header::{HEADER_LEN, Header},
    sizing::Sizing,
};

const DATA_FILE: &str = "data.bin";

fn boxed(e: Error) -> FilterError {
    Box::new(e)
}

/// Storage backing a filter's bit array.
///
/// `Unmapped` is the state after `close` (§4.4): the header stays resident
/// (it is tiny and immutable for the filter's lifetime) but the bit array
/// itself is dropped, to be lazily reopened by the next `contains`/`add`.
enum Storage {
    /// `params.in_memory == true`: never touches disk, so `close` is a
    /// no-op (there is nothing to offload — see DESIGN.md).
    Memory(Vec<u8>),
    /// Disk-backed, `mmap` feature enabled.
    #[cfg(feature = "mmap")]
    Mapped(memmap2::MmapMut),
    /// Disk-backed, `mmap` feature disabled: the whole bit array is read
    /// into memory and written back wholesale on `flush`/`close`.
    Buffered(Vec<u8>),
    Unmapped,
}

impl Storage {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Storage::Memory(v) | Storage::Buffered(v) => v,
            #[cfg(feature = "mmap")]
            Storage::Mapped(m) => m,
            Storage::Unmapped => unreachable!("ensure_open guarantees a mapped storage"),
        }
    }

    fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Storage::Memory(v) | Storage::Buffered(v) => v,
            #[cfg(feature = "mmap")]
            Storage::Mapped(m) => m,
            Storage::Unmapped => unreachable!("ensure_open guarantees a mapped storage"),
        }
    }
}

/// One on-disk (or pure in-memory) Bloom filter.
///
/// `header` never changes after construction; only `storage` and `count`
/// are mutated, both behind `storage`'s own lock. The manager's handle
/// `RwLock` already serializes `add` against `contains`/`add` on this same
/// filter (§4.2); this crate's internal lock exists only to make the
/// `Unmapped -> Mapped` transition on reopen race-free and to let
/// concurrent `check` batches share read access to the bytes.
pub struct DiskFilter {
    name: String,
    path: Option<PathBuf>,
    header: Header,
    storage: RwLock<Storage>,
    count: AtomicU64,
}

impl DiskFilter {
    fn new_in_memory(name: String, header: Header) -> Self {
        let bytes = vec![0u8; bits::byte_len(header.m_bits)];
        Self {
            name,
            path: None,
            header,
            storage: RwLock::new(Storage::Memory(bytes)),
            count: AtomicU64::new(0),
        }
    }

    fn new_on_disk(name: String, path: PathBuf, header: Header) -> Self {
        Self {
            name,
            path: Some(path),
            header,
            storage: RwLock::new(Storage::Unmapped),
            count: AtomicU64::new(0),
        }
    }

    /// Reopens `storage` if it is `Unmapped`. Pure in-memory filters are
    /// never unmapped in the first place (`close` is a no-op for them).
    fn ensure_open(&self) -> Result<(), Error> {
        if !matches!(*self.storage.read().unwrap_or_else(|p| p.into_inner()), Storage::Unmapped) {
            return Ok(());
        }
        let mut guard = self.storage.write().unwrap_or_else(|p| p.into_inner());
        if !matches!(*guard, Storage::Unmapped) {
            return Ok(());
        }
        let path = self
            .path
            .as_ref()
            .expect("on-disk filter always has a path");
        *guard = open_data_storage(&self.name, path, &self.header)?;
        Ok(())
    }

    fn on_error(&self, e: Error) -> bool {
        tracing::error!("filter {:?}: {e}", self.name);
        let _ = e;
        false
    }
}

impl Filter for DiskFilter {
    fn contains(&self, key: &[u8]) -> bool {
        if let Err(e) = self.ensure_open() {
            return self.on_error(e);
        }
        let guard = self.storage.read().unwrap_or_else(|p| p.into_inner());
        let bytes = guard.as_bytes();
        self.header
            .sizing()
            .positions(key)
            .all(|bit| bits::test_bit(bytes, bit))
    }

    fn add(&self, key: &[u8]) -> bool {
        if let Err(e) = self.ensure_open() {
            self.on_error(e);
            return false;
        }
        let mut guard = self.storage.write().unwrap_or_else(|p| p.into_inner());
        let bytes = guard.as_bytes_mut();
        let mut newly_added = false;
        for bit in self.header.sizing().positions(key) {
            if !bits::set_bit(bytes, bit) {
                newly_added = true;
            }
        }
        if newly_added {
            self.count.fetch_add(1, Ordering::Relaxed);
        }
        newly_added
    }

    fn flush(&self) -> FilterResult<()> {
        let guard = self.storage.read().unwrap_or_else(|p| p.into_inner());
        match &*guard {
            Storage::Memory(_) | Storage::Unmapped => Ok(()),
            #[cfg(feature = "mmap")]
            Storage::Mapped(m) => m.flush().map_err(|source| {
                boxed(Error::Io {
                    name: self.name.clone(),
                    source,
                })
            }),
            Storage::Buffered(bytes) => {
                let path = self.path.as_ref().expect("buffered storage has a path");
                write_bits(&self.name, path, &self.header, bytes)
            }
        }
    }

    fn close(&self) -> FilterResult<()> {
        // Pure in-memory filters have nothing to offload: unmapping would
        // just lose the bits, so it is a deliberate no-op (SPEC_FULL §4.10,
        // DESIGN.md).
        if matches!(
            *self.storage.read().unwrap_or_else(|p| p.into_inner()),
            Storage::Memory(_)
        ) {
            return Ok(());
        }
        self.flush()?;
        *self.storage.write().unwrap_or_else(|p| p.into_inner()) = Storage::Unmapped;
        Ok(())
    }

    fn destroy(&self) -> FilterResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let dir = path.parent().expect("data file always has a parent dir");
        match std::fs::remove_dir_all(dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(boxed(Error::Io {
                name: self.name.clone(),
                source,
            })),
        }
    }
}

/// Creates and reopens on-disk filters rooted at `data_dir`, using the
/// `bloomd.<name>` directory convention discovery and `create` both rely on.
pub struct LocalDiskFilterBackend {
    data_dir: PathBuf,
}

impl LocalDiskFilterBackend {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn filter_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{FILTER_DIR_PREFIX}{name}"))
    }
}

impl FilterBackend for LocalDiskFilterBackend {
    fn init(
        &self,
        name: &str,
        params: &FilterParams,
        create_if_absent: bool,
    ) -> FilterResult<Arc<dyn Filter>> {
        if params.in_memory {
            let sizing = Sizing::compute(params).map_err(boxed)?;
            let header = Header::new(sizing, params.capacity.get(), params.false_positive_rate);
            return Ok(Arc::new(DiskFilter::new_in_memory(name.to_string(), header)));
        }

        let dir = self.filter_dir(name);
        let path = dir.join(DATA_FILE);

        let header = if dir.is_dir() {
            read_header(name, &path)?
        } else {
            if !create_if_absent {
                return Err(boxed(Error::NotFound { name: name.into() }));
            }
            let sizing = Sizing::compute(params).map_err(boxed)?;
            let header = Header::new(sizing, params.capacity.get(), params.false_positive_rate);
            create_data_file(name, &dir, &path, &header)?;
            header
        };

        Ok(Arc::new(DiskFilter::new_on_disk(
            name.to_string(),
            path,
            header,
        )))
    }
}

fn read_header(name: &str, path: &Path) -> Result<Header, FilterError> {
    let mut buf = [0u8; HEADER_LEN];
    let mut file = File::open(path).map_err(|source| {
        boxed(Error::Io {
            name: name.into(),
            source,
        })
    })?;
    file.read_exact(&mut buf).map_err(|source| {
        boxed(Error::Io {
            name: name.into(),
            source,
        })
    })?;
    Header::decode(name, &buf).map_err(boxed)
}

/// Writes a brand-new data file using the same write-temp/`sync_all`/rename
/// discipline the teacher's disk-storage backend uses for newly stored
/// bundles: the file is only visible under its final name once it is
/// complete and durable.
fn create_data_file(
    name: &str,
    dir: &Path,
    path: &Path,
    header: &Header,
) -> Result<(), FilterError> {
    std::fs::create_dir_all(dir).map_err(|source| {
        boxed(Error::Io {
            name: name.into(),
            source,
        })
    })?;

    let tmp_path = path.with_extension("tmp");
    let write = || -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;
        file.write_all(&header.encode())?;
        file.write_all(&vec![0u8; bits::byte_len(header.m_bits)])?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    };
    if let Err(source) = write() {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(boxed(Error::Io {
            name: name.into(),
            source,
        }));
    }
    Ok(())
}

fn write_bits(name: &str, path: &Path, header: &Header, bits: &[u8]) -> FilterResult<()> {
    use std::io::{Seek, SeekFrom};

    let mut file = OpenOptions::new().write(true).open(path).map_err(|source| {
        boxed(Error::Io {
            name: name.into(),
            source,
        })
    })?;
    let write = || -> std::io::Result<()> {
        file.seek(SeekFrom::Start(HEADER_LEN as u64))?;
        file.write_all(bits)?;
        file.sync_all()
    };
    write().map_err(|source| {
        boxed(Error::Io {
            name: name.into(),
            source,
        })
    })?;
    let _ = header;
    Ok(())
}

fn open_data_storage(name: &str, path: &Path, header: &Header) -> Result<Storage, Error> {
    #[cfg(feature = "mmap")]
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::Io {
                name: name.into(),
                source,
            })?;
        let mmap = unsafe {
            memmap2::MmapOptions::new()
                .offset(HEADER_LEN as u64)
                .len(bits::byte_len(header.m_bits))
                .map_mut(&file)
                .map_err(|source| Error::Io {
                    name: name.into(),
                    source,
                })?
        };
        return Ok(Storage::Mapped(mmap));
    }

    #[cfg(not(feature = "mmap"))]
    {
        use std::io::{Seek, SeekFrom};

        let mut file = File::open(path).map_err(|source| Error::Io {
            name: name.into(),
            source,
        })?;
        file.seek(SeekFrom::Start(HEADER_LEN as u64))
            .map_err(|source| Error::Io {
                name: name.into(),
                source,
            })?;
        let mut bytes = Vec::with_capacity(bits::byte_len(header.m_bits));
        file.read_to_end(&mut bytes).map_err(|source| Error::Io {
            name: name.into(),
            source,
        })?;
        bytes.resize(bits::byte_len(header.m_bits), 0);
        Ok(Storage::Buffered(bytes))
    }
}
