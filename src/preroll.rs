use crate::frame::Frame;
use std::collections::VecDeque;

/// Bounded FIFO buffer of the most recent quiet frames, flushed into the
/// recording sink when motion starts so recordings include a short lead-in.
///
/// Pushing beyond capacity evicts the oldest frame; the buffer never holds
/// more than `capacity` frames.
pub struct PrerollBuffer {
    frames: VecDeque<Frame>,
    capacity: usize,
}

impl PrerollBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "pre-roll capacity must be greater than 0");
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a frame, evicting the oldest when full
    pub fn push(&mut self, frame: Frame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    /// Drain all buffered frames in push order (oldest first), leaving the
    /// buffer empty.
    pub fn flush(&mut self) -> Vec<Frame> {
        self.frames.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    /// Frame tagged with an id in its first pixel
    fn tagged_frame(id: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(2, 2, Rgb([id, 0, 0])))
    }

    fn tag(frame: &Frame) -> u8 {
        frame.image.get_pixel(0, 0).0[0]
    }

    #[test]
    fn test_push_grows_to_capacity() {
        let mut buffer = PrerollBuffer::new(8);
        for i in 1..=5 {
            buffer.push(tagged_frame(i));
            assert_eq!(buffer.len(), i as usize);
        }
    }

    #[test]
    fn test_fifo_eviction_beyond_capacity() {
        let mut buffer = PrerollBuffer::new(8);
        for i in 1..=9 {
            buffer.push(tagged_frame(i));
            assert!(buffer.len() <= 8);
        }

        // After 9 pushes the buffer holds pushes #2..#9 in original order
        let frames = buffer.flush();
        let tags: Vec<u8> = frames.iter().map(tag).collect();
        assert_eq!(tags, vec![2, 3, 4, 5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_flush_preserves_order_and_empties() {
        let mut buffer = PrerollBuffer::new(8);
        for i in 1..=3 {
            buffer.push(tagged_frame(i));
        }

        let frames = buffer.flush();
        assert_eq!(frames.iter().map(tag).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(buffer.is_empty());

        // Flushing an empty buffer yields nothing
        assert!(buffer.flush().is_empty());
    }

    #[test]
    fn test_clear() {
        let mut buffer = PrerollBuffer::new(4);
        buffer.push(tagged_frame(1));
        buffer.push(tagged_frame(2));
        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        PrerollBuffer::new(0);
    }
}
