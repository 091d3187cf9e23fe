use crate::value::{Scalar, ScalarType};

const BITS: usize = u64::BITS as usize;
pub const WASM_PAGE_SIZE: usize = 65536;

/// One taint bit per byte of a module's linear memory.
///
/// Reads past the end are untainted; writes past the end grow the shadow so it
/// keeps pace with `memory.grow`.
#[derive(Debug, Clone, Default)]
pub struct ShadowMemory {
    words: Vec<u64>,
    len: usize,
}
impl ShadowMemory {
    /// An all-untainted shadow of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(BITS)],
            len,
        }
    }
    pub fn with_pages(pages: usize) -> Self {
        Self::new(pages * WASM_PAGE_SIZE)
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Extends the shadow to at least `len` bytes; never shrinks.
    pub fn grow_to(&mut self, len: usize) {
        if len > self.len {
            self.words.resize(len.div_ceil(BITS), 0);
            self.len = len;
        }
    }
    pub fn grow_pages(&mut self, delta: usize) {
        self.grow_to(self.len + delta * WASM_PAGE_SIZE);
    }

    pub fn is_byte_tainted(&self, addr: usize) -> bool {
        addr < self.len && self.words[addr / BITS] & (1 << (addr % BITS)) != 0
    }
    fn set_byte(&mut self, addr: usize, tainted: bool) {
        let mask = 1 << (addr % BITS);
        if tainted {
            self.words[addr / BITS] |= mask;
        } else {
            self.words[addr / BITS] &= !mask;
        }
    }

    /// Taint of `len` bytes at `addr`: tainted if any byte is.
    pub fn load_bytes(&self, addr: usize, len: usize) -> bool {
        (addr..addr.saturating_add(len)).any(|a| self.is_byte_tainted(a))
    }
    pub fn fill(&mut self, addr: usize, len: usize, tainted: bool) {
        if len == 0 {
            return;
        }
        self.grow_to(addr + len);
        for a in addr..addr + len {
            self.set_byte(a, tainted);
        }
    }

    /// Shadow for a scalar load of type `ty` at `addr`.
    pub fn load(&self, addr: usize, ty: ScalarType) -> bool {
        self.load_bytes(addr, ty.size())
    }
    /// Shadow for a scalar store of type `ty` at `addr`.
    pub fn store(&mut self, addr: usize, ty: ScalarType, tainted: bool) {
        self.fill(addr, ty.size(), tainted);
    }

    /// `memory.copy` semantics, overlapping ranges included.
    pub fn copy(&mut self, dst: usize, src: usize, len: usize) {
        let bits: Vec<bool> = (src..src + len).map(|a| self.is_byte_tainted(a)).collect();
        if len > 0 {
            self.grow_to(dst + len);
        }
        for (i, tainted) in bits.into_iter().enumerate() {
            self.set_byte(dst + i, tainted);
        }
    }

    pub fn tainted_bytes(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

/// Out-of-bounds access to linear memory from a host callback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("memory access of {len} bytes at {addr} is out of bounds (memory is {size} bytes)")]
pub struct OutOfBounds {
    pub addr: usize,
    pub len: usize,
    pub size: usize,
}

/// Linear memory bytes viewed together with their shadow.
pub struct TaintedMemory<'a> {
    bytes: &'a mut [u8],
    shadow: &'a mut ShadowMemory,
}
impl<'a> TaintedMemory<'a> {
    pub fn new(bytes: &'a mut [u8], shadow: &'a mut ShadowMemory) -> Self {
        shadow.grow_to(bytes.len());
        Self { bytes, shadow }
    }

    fn range(&self, addr: usize, len: usize) -> Result<std::ops::Range<usize>, OutOfBounds> {
        let end = addr.checked_add(len).filter(|end| *end <= self.bytes.len());
        end.map(|end| addr..end).ok_or(OutOfBounds {
            addr,
            len,
            size: self.bytes.len(),
        })
    }

    /// Reads a scalar and its taint. Reading never changes the shadow.
    pub fn read(&self, addr: usize, ty: ScalarType) -> Result<(Scalar, bool), OutOfBounds> {
        let range = self.range(addr, ty.size())?;
        let value = Scalar::from_le_bytes(ty, &self.bytes[range]).ok_or(OutOfBounds {
            addr,
            len: ty.size(),
            size: self.bytes.len(),
        })?;
        Ok((value, self.shadow.load(addr, ty)))
    }

    pub fn write(&mut self, addr: usize, value: Scalar, tainted: bool) -> Result<(), OutOfBounds> {
        let range = self.range(addr, value.ty().size())?;
        self.bytes[range].copy_from_slice(&value.to_le_bytes());
        self.shadow.store(addr, value.ty(), tainted);
        Ok(())
    }

    pub fn read_f64(&self, addr: usize) -> Result<(f64, bool), OutOfBounds> {
        let (value, tainted) = self.read(addr, ScalarType::F64)?;
        Ok((value.as_f64(), tainted))
    }
    pub fn read_u32(&self, addr: usize) -> Result<(u32, bool), OutOfBounds> {
        let range = self.range(addr, 4)?;
        let mut le = [0u8; 4];
        le.copy_from_slice(&self.bytes[range]);
        Ok((u32::from_le_bytes(le), self.shadow.load(addr, ScalarType::I32)))
    }
}
