//! Merge of two record channels in arrival order.

use tokio::sync::mpsc;
use tracing::trace;

/// An item taken from one side of a [`TwoSourceMerge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Merged<A, B> {
    Left(A),
    Right(B),
}

enum Event<A, B> {
    Item(Merged<A, B>),
    LeftClosed,
    RightClosed,
}

/// Receives from two channels, yielding whichever has an item first.
///
/// A side whose senders have all been dropped is removed from selection;
/// the merge ends once both sides are closed and drained. Each side's own
/// order is preserved, the interleaving between sides is not.
pub struct TwoSourceMerge<A, B> {
    left: Option<mpsc::Receiver<A>>,
    right: Option<mpsc::Receiver<B>>,
}

impl<A, B> TwoSourceMerge<A, B> {
    pub fn new(left: mpsc::Receiver<A>, right: mpsc::Receiver<B>) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
        }
    }

    /// Number of sides still open.
    pub fn open_sources(&self) -> usize {
        usize::from(self.left.is_some()) + usize::from(self.right.is_some())
    }

    /// Wait for the next item from either side.
    ///
    /// Returns `None` once both sides are closed.
    pub async fn next(&mut self) -> Option<Merged<A, B>> {
        loop {
            let event = match (&mut self.left, &mut self.right) {
                (None, None) => return None,
                (Some(left), None) => left
                    .recv()
                    .await
                    .map_or(Event::LeftClosed, |a| Event::Item(Merged::Left(a))),
                (None, Some(right)) => right
                    .recv()
                    .await
                    .map_or(Event::RightClosed, |b| Event::Item(Merged::Right(b))),
                (Some(left), Some(right)) => tokio::select! {
                    a = left.recv() => a.map_or(Event::LeftClosed, |a| Event::Item(Merged::Left(a))),
                    b = right.recv() => b.map_or(Event::RightClosed, |b| Event::Item(Merged::Right(b))),
                },
            };

            match event {
                Event::Item(item) => return Some(item),
                Event::LeftClosed => {
                    trace!("left source closed");
                    self.left = None;
                }
                Event::RightClosed => {
                    trace!("right source closed");
                    self.right = None;
                }
            }
        }
    }
}
