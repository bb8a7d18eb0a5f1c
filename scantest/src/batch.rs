//! Batch-framed rendezvous channels between pipeline stages.
//!
//! A producer hands its consumer one [`Batch`] per cycle. The outer channel
//! carries the batch handle, the batch's own channel carries the items, and
//! dropping the [`BatchSink`] closes the batch. [`Batches::next_batch`]
//! returning `None` means the producer is gone for good.
//!
//! Every channel has zero capacity: a send blocks until the receiver takes the
//! value, so a slow stage stalls everything upstream of it.

use std::sync::mpsc::{Receiver, SyncSender, sync_channel};

use anyhow::{Result, anyhow};

/// Create a connected writer/reader pair.
pub fn channel<T>() -> (BatchWriter<T>, Batches<T>) {
    let (tx, rx) = sync_channel(0);
    (BatchWriter { tx }, Batches { rx })
}

/// Producer side of a stage link.
#[derive(Debug)]
pub struct BatchWriter<T> {
    tx: SyncSender<Batch<T>>,
}

impl<T> BatchWriter<T> {
    /// Open the next batch. Blocks until the consumer asks for it.
    pub fn begin(&self) -> Result<BatchSink<T>> {
        let (tx, rx) = sync_channel(0);
        self.tx
            .send(Batch { rx })
            .map_err(|_| anyhow!("downstream stage hung up"))?;
        Ok(BatchSink { tx })
    }

    /// Open a batch, push every item, and close it.
    pub fn send_all<I: IntoIterator<Item = T>>(&self, items: I) -> Result<()> {
        let sink = self.begin()?;
        for item in items {
            sink.push(item)?;
        }
        sink.finish();
        Ok(())
    }
}

/// An open batch. Dropping it signals end-of-batch to the consumer.
#[derive(Debug)]
pub struct BatchSink<T> {
    tx: SyncSender<T>,
}

impl<T> BatchSink<T> {
    pub fn push(&self, item: T) -> Result<()> {
        self.tx
            .send(item)
            .map_err(|_| anyhow!("downstream stage abandoned the batch"))
    }

    /// Close the batch explicitly.
    pub fn finish(self) {}
}

/// One cycle's items. Iteration ends when the producer closes the batch.
#[derive(Debug)]
pub struct Batch<T> {
    rx: Receiver<T>,
}

impl<T> Iterator for Batch<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.rx.recv().ok()
    }
}

/// Consumer side of a stage link.
#[derive(Debug)]
pub struct Batches<T> {
    rx: Receiver<Batch<T>>,
}

impl<T> Batches<T> {
    /// Block until the next batch opens. `None` once the producer is dropped.
    pub fn next_batch(&self) -> Option<Batch<T>> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn batches_arrive_in_order_and_close() {
        let (writer, batches) = channel::<u32>();
        let producer = thread::spawn(move || {
            writer.send_all([1, 2, 3]).expect("first batch");
            writer.send_all([]).expect("empty batch");
            writer.send_all([4]).expect("third batch");
        });

        let first: Vec<u32> = batches.next_batch().expect("first").collect();
        let second: Vec<u32> = batches.next_batch().expect("second").collect();
        let third: Vec<u32> = batches.next_batch().expect("third").collect();
        producer.join().expect("producer");

        assert_eq!(first, vec![1, 2, 3]);
        assert!(second.is_empty());
        assert_eq!(third, vec![4]);
        assert!(batches.next_batch().is_none());
    }

    #[test]
    fn begin_fails_once_consumer_is_gone() {
        let (writer, batches) = channel::<u32>();
        drop(batches);
        assert!(writer.begin().is_err());
    }

    #[test]
    fn push_fails_when_batch_is_abandoned() {
        let (writer, batches) = channel::<u32>();
        let consumer = thread::spawn(move || {
            let batch = batches.next_batch().expect("batch");
            drop(batch);
        });

        let sink = writer.begin().expect("begin");
        consumer.join().expect("consumer");
        assert!(sink.push(1).is_err());
    }
}
