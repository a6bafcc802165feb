//! Pre-sized sample storage with a write cursor.

/// Fixed-stride storage for image and mask samples.
///
/// Slots are handed out in order. A slot only counts once its writer
/// succeeds, so a failed sample leaves no gap: the next sample reuses the
/// slot, and [`finish`](Self::finish) truncates to the committed count.
#[derive(Debug)]
pub struct SampleArena {
    image_stride: usize,
    mask_stride: usize,
    capacity: usize,
    cursor: usize,
    images: Vec<u8>,
    masks: Vec<u8>,
}

impl SampleArena {
    /// Allocate room for `capacity` samples.
    pub fn new(capacity: usize, image_stride: usize, mask_stride: usize) -> Self {
        Self {
            image_stride,
            mask_stride,
            capacity,
            cursor: 0,
            images: vec![0; capacity * image_stride],
            masks: vec![0; capacity * mask_stride],
        }
    }

    /// Number of committed samples.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Let `write` fill the next free slot; commit it only on success.
    ///
    /// Returns the committed slot index.
    pub fn fill_next<F, E>(&mut self, write: F) -> Result<usize, E>
    where
        F: FnOnce(&mut [u8], &mut [u8]) -> Result<(), E>,
    {
        if self.cursor == self.capacity {
            self.capacity += 1;
            self.images.resize(self.capacity * self.image_stride, 0);
            self.masks.resize(self.capacity * self.mask_stride, 0);
        }

        let slot = self.cursor;
        let image = &mut self.images[slot * self.image_stride..(slot + 1) * self.image_stride];
        let mask = &mut self.masks[slot * self.mask_stride..(slot + 1) * self.mask_stride];
        write(image, mask)?;

        self.cursor += 1;
        Ok(slot)
    }

    /// Truncate to the committed samples and return `(images, masks, count)`.
    pub fn finish(mut self) -> (Vec<u8>, Vec<u8>, usize) {
        self.images.truncate(self.cursor * self.image_stride);
        self.masks.truncate(self.cursor * self.mask_stride);
        (self.images, self.masks, self.cursor)
    }
}
