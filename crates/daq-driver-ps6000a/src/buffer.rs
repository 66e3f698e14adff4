//! Device-visible sample buffers.
//!
//! A [`Buffer`] is a fixed-length array of raw sample codes that the device
//! writes into directly. The storage is allocated once on the heap and never
//! moves, so the address handed to the driver stays valid for as long as any
//! clone of the buffer is alive. The buffer registry holds one such clone for
//! every registered buffer, which is what keeps registrations valid across
//! acquisitions.
//!
//! Buffers compare and hash by identity: two buffers with identical
//! attributes are still two distinct registry entries.

use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{Ps6000aError, Result};
use crate::types::{BufferRole, Channel, DataType, RatioMode};

/// Registry key: buffers of one class share channel, element type and
/// memory segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferClass {
    /// Source channel
    pub channel: Channel,
    /// Element type
    pub data_type: DataType,
    /// Memory segment (waveform) index
    pub segment: u64,
}

impl BufferClass {
    /// Create a class key.
    pub fn new(channel: Channel, data_type: DataType, segment: u64) -> Self {
        Self {
            channel,
            data_type,
            segment,
        }
    }
}

impl fmt::Display for BufferClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/segment {}",
            self.channel, self.data_type, self.segment
        )
    }
}

enum Storage {
    Int8(Box<[UnsafeCell<i8>]>),
    Int16(Box<[UnsafeCell<i16>]>),
    Int32(Box<[UnsafeCell<i32>]>),
    UInt32(Box<[UnsafeCell<u32>]>),
    Int64(Box<[UnsafeCell<i64>]>),
}

fn zeroed<T: Default>(len: usize) -> Box<[UnsafeCell<T>]> {
    (0..len).map(|_| UnsafeCell::new(T::default())).collect()
}

fn snapshot<T: Copy>(cells: &[UnsafeCell<T>]) -> Vec<T> {
    // SAFETY: the cells are only written by the device between a successful
    // start call and the poll or completion that reports the data; callers
    // read after that point.
    cells.iter().map(|cell| unsafe { *cell.get() }).collect()
}

impl Storage {
    fn allocate(data_type: DataType, len: usize) -> Option<Self> {
        match data_type {
            DataType::Int8 => Some(Self::Int8(zeroed(len))),
            DataType::Int16 => Some(Self::Int16(zeroed(len))),
            DataType::Int32 => Some(Self::Int32(zeroed(len))),
            DataType::UInt32 => Some(Self::UInt32(zeroed(len))),
            DataType::Int64 => Some(Self::Int64(zeroed(len))),
            DataType::Unknown(_) => None,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Int8(s) => s.len(),
            Self::Int16(s) => s.len(),
            Self::Int32(s) => s.len(),
            Self::UInt32(s) => s.len(),
            Self::Int64(s) => s.len(),
        }
    }

    fn as_ptr(&self) -> *mut c_void {
        // UnsafeCell<T> has the same layout as T, and interior mutability
        // makes writing through this pointer sound.
        match self {
            Self::Int8(s) => s.as_ptr() as *mut c_void,
            Self::Int16(s) => s.as_ptr() as *mut c_void,
            Self::Int32(s) => s.as_ptr() as *mut c_void,
            Self::UInt32(s) => s.as_ptr() as *mut c_void,
            Self::Int64(s) => s.as_ptr() as *mut c_void,
        }
    }

    fn read(&self, start: usize, end: usize) -> Samples {
        match self {
            Self::Int8(s) => Samples::Int8(snapshot(&s[start..end])),
            Self::Int16(s) => Samples::Int16(snapshot(&s[start..end])),
            Self::Int32(s) => Samples::Int32(snapshot(&s[start..end])),
            Self::UInt32(s) => Samples::UInt32(snapshot(&s[start..end])),
            Self::Int64(s) => Samples::Int64(snapshot(&s[start..end])),
        }
    }
}

struct BufferInner {
    id: u64,
    class: BufferClass,
    mode: RatioMode,
    role: BufferRole,
    storage: Storage,
}

// SAFETY: the storage is only mutated through the raw pointer handed to the
// device. The session API hands that pointer out only while registering, and
// reads copy values out without forming references into the cells.
unsafe impl Send for BufferInner {}
unsafe impl Sync for BufferInner {}

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// A shared handle to a device-visible sample buffer.
///
/// Cloning is cheap and yields the same buffer (same identity, same storage).
#[derive(Clone)]
pub struct Buffer {
    inner: Arc<BufferInner>,
}

impl Buffer {
    /// Allocate a zeroed buffer of `len` elements.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `len` is zero or exceeds the driver's
    /// 32-bit sample count, or if `data_type` is not a known element type.
    pub fn new(
        class: BufferClass,
        mode: RatioMode,
        role: BufferRole,
        len: usize,
    ) -> Result<Self> {
        if len == 0 || len > i32::MAX as usize {
            return Err(Ps6000aError::validation(format!(
                "buffer length {} out of range 1..={}",
                len,
                i32::MAX
            )));
        }
        let storage = Storage::allocate(class.data_type, len).ok_or_else(|| {
            Ps6000aError::validation(format!(
                "cannot allocate buffer of unknown data type {}",
                class.data_type
            ))
        })?;

        Ok(Self {
            inner: Arc::new(BufferInner {
                id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
                class,
                mode,
                role,
                storage,
            }),
        })
    }

    /// Unique identity of this buffer.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Registry class of this buffer.
    pub fn class(&self) -> BufferClass {
        self.inner.class
    }

    /// Source channel.
    pub fn channel(&self) -> Channel {
        self.inner.class.channel
    }

    /// Element type.
    pub fn data_type(&self) -> DataType {
        self.inner.class.data_type
    }

    /// Memory segment index.
    pub fn segment(&self) -> u64 {
        self.inner.class.segment
    }

    /// Downsampling mode this buffer receives data for.
    pub fn mode(&self) -> RatioMode {
        self.inner.mode
    }

    /// MAX or MIN.
    pub fn role(&self) -> BufferRole {
        self.inner.role
    }

    /// Capacity in elements.
    pub fn len(&self) -> usize {
        self.inner.storage.len()
    }

    /// Always false; zero-length buffers cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Address handed to the device boundary.
    pub(crate) fn as_mut_ptr(&self) -> *mut c_void {
        self.inner.storage.as_ptr()
    }

    /// Copy out the whole buffer.
    pub fn read(&self) -> Samples {
        self.inner.storage.read(0, self.len())
    }

    /// Copy out `len` samples starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the range runs past the end of the buffer.
    pub fn read_range(&self, start: usize, len: usize) -> Result<Samples> {
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.len())
            .ok_or_else(|| {
                Ps6000aError::validation(format!(
                    "range {}+{} exceeds buffer capacity {}",
                    start,
                    len,
                    self.len()
                ))
            })?;
        Ok(self.inner.storage.read(start, end))
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Buffer {}

impl Hash for Buffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.inner.id)
            .field("class", &self.inner.class)
            .field("mode", &self.inner.mode)
            .field("role", &self.inner.role)
            .field("len", &self.len())
            .finish()
    }
}

/// Sample codes copied out of a [`Buffer`].
#[derive(Debug, Clone, PartialEq)]
pub enum Samples {
    /// 8-bit codes
    Int8(Vec<i8>),
    /// 16-bit codes
    Int16(Vec<i16>),
    /// 32-bit codes
    Int32(Vec<i32>),
    /// Unsigned 32-bit codes
    UInt32(Vec<u32>),
    /// 64-bit codes
    Int64(Vec<i64>),
}

impl Samples {
    /// Element type of the copied codes.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int8(_) => DataType::Int8,
            Self::Int16(_) => DataType::Int16,
            Self::Int32(_) => DataType::Int32,
            Self::UInt32(_) => DataType::UInt32,
            Self::Int64(_) => DataType::Int64,
        }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Int8(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::UInt32(v) => v.len(),
            Self::Int64(v) => v.len(),
        }
    }

    /// True when no samples were copied.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Codes widened to `i64`.
    pub fn to_i64(&self) -> Vec<i64> {
        match self {
            Self::Int8(v) => v.iter().map(|&x| i64::from(x)).collect(),
            Self::Int16(v) => v.iter().map(|&x| i64::from(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| i64::from(x)).collect(),
            Self::UInt32(v) => v.iter().map(|&x| i64::from(x)).collect(),
            Self::Int64(v) => v.clone(),
        }
    }

    /// Codes as `f64`, ready for scaling.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::Int8(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int16(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::UInt32(v) => v.iter().map(|&x| f64::from(x)).collect(),
            Self::Int64(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }
}
