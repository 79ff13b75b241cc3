// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bounded FIFO queues between RTI callbacks and the application thread.
//!
//! Callback threads only push; the application thread drains. Every
//! critical section is a single push or a swap of the whole backlog, so a
//! callback never waits behind decoding work.

pub mod item;

pub use item::{AttributeItem, InteractionItem, ParameterItem};

use std::collections::VecDeque;

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Bounded multi-producer FIFO.
pub struct ItemQueue<T> {
    name: &'static str,
    items: Mutex<VecDeque<T>>,
    capacity: usize,
}

impl<T> ItemQueue<T> {
    pub fn new(name: &'static str, capacity: usize) -> Self {
        Self {
            name,
            items: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Append an item; refused with [`Error::QueueFull`] at capacity.
    pub fn push(&self, item: T) -> Result<()> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            log::warn!("[queue] {} full ({} items), dropping item", self.name, self.capacity);
            return Err(Error::QueueFull(self.name.to_string()));
        }
        items.push_back(item);
        Ok(())
    }

    pub fn pop(&self) -> Option<T> {
        self.items.lock().pop_front()
    }

    /// Take the whole backlog in FIFO order.
    pub fn drain(&self) -> VecDeque<T> {
        std::mem::take(&mut *self.items.lock())
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.items.lock().clear();
    }
}

impl<T: Clone> ItemQueue<T> {
    /// Deep copy of the queued items, oldest first.
    pub fn checkpoint(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }

    /// Replace the contents with a checkpoint taken earlier.
    ///
    /// Items beyond capacity are dropped with a warning.
    pub fn restore(&self, items: Vec<T>) {
        let mut queue = self.items.lock();
        queue.clear();
        let total = items.len();
        queue.extend(items.into_iter().take(self.capacity));
        if total > self.capacity {
            log::warn!(
                "[queue] {} restore dropped {} items over capacity",
                self.name,
                total - self.capacity
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rti::{DeliveryInfo, FederateHandle, InteractionClassHandle, ParameterHandle, TransportOrder};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_fifo_order() {
        let queue = ItemQueue::new("test", 8);
        for i in 0..5 {
            queue.push(i).expect("push should succeed");
        }
        assert_eq!(queue.pop(), Some(0));
        let rest: Vec<i32> = queue.drain().into_iter().collect();
        assert_eq!(rest, vec![1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_full_queue_refuses() {
        let queue = ItemQueue::new("bounded", 2);
        queue.push(1).expect("push should succeed");
        queue.push(2).expect("push should succeed");
        let err = queue.push(3).expect_err("queue is full");
        assert!(matches!(err, Error::QueueFull(name) if name == "bounded"));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_checkpoint_is_deep_copy() {
        let queue = ItemQueue::new("interactions", 4);
        let info = DeliveryInfo {
            order: TransportOrder::Receive,
            time: None,
            producer: FederateHandle(1),
        };
        let params = vec![(ParameterHandle(3), vec![1, 2, 3])];
        queue
            .push(InteractionItem::new(InteractionClassHandle(9), &params, b"tag", info))
            .expect("push should succeed");

        let saved = queue.checkpoint();
        queue.clear();
        assert!(queue.is_empty());

        queue.restore(saved.clone());
        let item = queue.pop().expect("restored item");
        assert_eq!(item, saved[0]);
        assert_eq!(item.parameter(ParameterHandle(3)), Some(&[1u8, 2, 3][..]));
        assert_eq!(item.tag, b"tag".to_vec());
    }

    #[test]
    fn test_concurrent_producers() {
        let queue = Arc::new(ItemQueue::new("mpsc", 10_000));
        let producers: Vec<_> = (0..4)
            .map(|p| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || {
                    for i in 0..500 {
                        queue.push(p * 1000 + i).expect("push should succeed");
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().expect("producer thread should succeed");
        }
        let items = queue.drain();
        assert_eq!(items.len(), 2000);
        // Per-producer order is preserved.
        for p in 0..4 {
            let mine: Vec<i32> = items.iter().copied().filter(|v| v / 1000 == p).collect();
            assert!(mine.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
