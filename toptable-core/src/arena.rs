//! Double buffered byte arena backing the keys and values of a table.
//!
//! To achieve better performance, we need to avoid `malloc` per row as much as possible.
//!
//! All bytes of the window being accumulated are appended to the `live` buffer. When the
//! window is flushed, the sample of the old window still references the old buffer, so we
//! cannot reset it. Instead we switch to the other buffer, which only holds the sample of
//! the window before, and reset that one. The capacity of both `Vec`s is kept, so after
//! a few windows no allocation happens at all.
//!
//! Values are addressed by `ValueHandle`, never by pointer. Each buffer carries an `epoch`
//! which is bumped every time the buffer is reset, and every handle remembers the epoch it
//! was created in. Reading a handle after its buffer was reset panics.

/// One of the two buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Generation {
    First,
    Second,
}

impl Generation {
    #[inline]
    pub fn other(self) -> Self {
        match self {
            Generation::First => Generation::Second,
            Generation::Second => Generation::First,
        }
    }

    #[inline]
    fn index(self) -> usize {
        match self {
            Generation::First => 0,
            Generation::Second => 1,
        }
    }
}

/// Position of one value in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValueHandle {
    generation: Generation,
    epoch: u64,
    offset: usize,
    len: usize,
}

impl ValueHandle {
    #[inline]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

pub struct ArenaStore {
    /// The two buffers.
    buffers: [Vec<u8>; 2],

    /// Number of resets of each buffer.
    epochs: [u64; 2],

    /// The buffer receiving new values.
    live: Generation,
}

impl ArenaStore {
    pub fn new() -> Self {
        Self {
            buffers: [Vec::new(), Vec::new()],
            epochs: [0, 0],
            live: Generation::First,
        }
    }

    #[inline]
    pub fn live_generation(&self) -> Generation {
        self.live
    }

    /// Make room for `additional` bytes in the live buffer.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.buffers[self.live.index()].reserve(additional);
    }

    /// Append `bytes` to the live buffer.
    pub fn copy(&mut self, bytes: &[u8]) -> ValueHandle {
        let index = self.live.index();
        let buffer = &mut self.buffers[index];

        let offset = buffer.len();
        buffer.extend_from_slice(bytes);

        ValueHandle {
            generation: self.live,
            epoch: self.epochs[index],
            offset,
            len: bytes.len(),
        }
    }

    #[inline]
    fn check(&self, handle: &ValueHandle) -> usize {
        let index = handle.generation.index();

        assert_eq!(
            self.epochs[index], handle.epoch,
            "stale value handle, {:?} buffer was reset",
            handle.generation
        );

        index
    }

    /// Bytes of a stored value.
    #[inline]
    pub fn get(&self, handle: &ValueHandle) -> &[u8] {
        let index = self.check(handle);
        &self.buffers[index][handle.offset..handle.offset + handle.len]
    }

    /// Mutable bytes of a stored value, for in place aggregation.
    #[inline]
    pub fn get_mut(&mut self, handle: &ValueHandle) -> &mut [u8] {
        let index = self.check(handle);
        &mut self.buffers[index][handle.offset..handle.offset + handle.len]
    }

    /// Make the other buffer the live one.
    #[inline]
    pub fn switch_buffers(&mut self) {
        self.live = self.live.other();
    }

    /// Reset the live buffer. All handles into it become stale.
    #[inline]
    pub fn clear(&mut self) {
        let index = self.live.index();
        self.buffers[index].clear();
        self.epochs[index] += 1;
    }

    /// Bytes used in the buffer of `generation`.
    #[inline]
    pub fn used(&self, generation: Generation) -> usize {
        self.buffers[generation.index()].len()
    }
}

impl Default for ArenaStore {
    fn default() -> Self {
        Self::new()
    }
}
