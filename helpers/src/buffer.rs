use std::collections::VecDeque;

/// RingBuffer keeps the last `capacity` values pushed into it. Older values are dropped.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    capacity: usize,
    values: VecDeque<T>,
}

impl<T> RingBuffer<T>
where
    T: Copy + Into<f64>,
{
    pub fn new(capacity: usize) -> RingBuffer<T> {
        RingBuffer {
            capacity: capacity.max(1),
            values: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// get_avg returns the mean of the stored values, None if the buffer is empty.
    pub fn get_avg(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        let sum: f64 = self.values.iter().map(|&v| v.into()).sum();
        Some(sum / self.values.len() as f64)
    }
}
