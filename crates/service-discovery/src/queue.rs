//! The client-facing queue of discovery answers
//!
//! Each query owns an unbounded FIFO fed by the provider-facing sink and
//! drained by the caller through [`ServicesQueue`]. Completion travels as a
//! channel-close rather than an in-band value, so the end-of-stream marker
//! is never observable as a match.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_channel::{Receiver, Sender};
use async_io::Timer;
use futures::future::{self, Either};
use futures::pin_mut;
use tracing::{debug, trace};

use crate::error::Error;
use crate::model::ServiceUrl;
use crate::spi::{DiscoveryRequest, DiscoveryResult};

/// The sink side: feeds the channel, collects problems, latches completion.
pub(crate) struct QueueDiscoveryResult {
    completed: Arc<AtomicBool>,
    sender: Sender<ServiceUrl>,
    problems: Arc<Mutex<Vec<Error>>>,
}

impl QueueDiscoveryResult {
    pub(crate) fn new(
        sender: Sender<ServiceUrl>,
        problems: Arc<Mutex<Vec<Error>>>,
        completed: Arc<AtomicBool>,
    ) -> Self {
        QueueDiscoveryResult {
            completed,
            sender,
            problems,
        }
    }
}

impl DiscoveryResult for QueueDiscoveryResult {
    fn add_match(&self, service_url: ServiceUrl) {
        if self.completed.load(Ordering::Acquire) {
            trace!("ignoring service URL match {service_url} after completion");
            return;
        }
        trace!("adding service URL match {service_url}");
        // the channel is unbounded; this only fails once the query completed
        let _ = self.sender.try_send(service_url);
    }

    fn report_problem(&self, problem: Error) {
        if self.completed.load(Ordering::Acquire) {
            return;
        }
        debug!("discovery problem reported: {problem}");
        self.problems
            .lock()
            .expect("problem list lock poisoned")
            .push(problem);
    }

    fn complete(&self) {
        if self
            .completed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            self.sender.close();
            debug!("discovery complete");
        }
    }
}

/// A queue for receiving service query answers.
///
/// Answers arrive in the order providers deliver them; no ordering across
/// providers is implied. Closing the queue (or dropping it) cancels any
/// in-progress discovery, optionally after a grace period.
pub struct ServicesQueue {
    receiver: Receiver<ServiceUrl>,
    problems: Arc<Mutex<Vec<Error>>>,
    request: Option<Box<dyn DiscoveryRequest>>,
    completed: Arc<AtomicBool>,
    cancel_delay: Duration,
    default_timeout: Option<Duration>,
    next: Option<ServiceUrl>,
    done: bool,
}

impl ServicesQueue {
    pub(crate) fn new(
        receiver: Receiver<ServiceUrl>,
        problems: Arc<Mutex<Vec<Error>>>,
        request: Box<dyn DiscoveryRequest>,
        completed: Arc<AtomicBool>,
        cancel_delay: Duration,
        default_timeout: Option<Duration>,
    ) -> Self {
        ServicesQueue {
            receiver,
            problems,
            request: Some(request),
            completed,
            cancel_delay,
            default_timeout,
            next: None,
            done: false,
        }
    }

    /// Wait for a queue entry to become available. When this returns,
    /// [`poll_service`](Self::poll_service) yields a value, or the queue is
    /// finished, or the query's default timeout (if it has one) elapsed.
    pub async fn await_ready(&mut self) {
        match self.default_timeout {
            Some(timeout) => self.await_ready_for(timeout).await,
            None => self.await_unbounded().await,
        }
    }

    async fn await_unbounded(&mut self) {
        if self.done {
            return;
        }
        while self.next.is_none() {
            match self.receiver.recv().await {
                Ok(service_url) => self.next = Some(service_url),
                Err(_) => {
                    self.done = true;
                    return;
                }
            }
        }
    }

    /// Wait for a queue entry to become available, bounded by `timeout`.
    ///
    /// The remaining time is re-checked on every wakeup, so early wakeups
    /// never extend the total wait.
    pub async fn await_ready_for(&mut self, timeout: Duration) {
        let mut remaining = timeout;
        let mut mark = Instant::now();
        while self.next.is_none() && !self.done && !remaining.is_zero() {
            {
                let recv = self.receiver.recv();
                pin_mut!(recv);
                match future::select(recv, Timer::after(remaining)).await {
                    Either::Left((Ok(service_url), _)) => self.next = Some(service_url),
                    Either::Left((Err(_), _)) => self.done = true,
                    Either::Right(_) => return,
                }
            }
            let now = Instant::now();
            remaining = remaining.saturating_sub(now.duration_since(mark));
            mark = now;
        }
    }

    /// Query whether there is a value ready to be read, or the queue is
    /// finished.
    pub fn is_ready(&self) -> bool {
        self.next.is_some() || self.done
    }

    /// Get the next entry without blocking. Returns `None` if no entry is
    /// buffered or the queue is finished; use
    /// [`is_finished`](Self::is_finished) to distinguish.
    pub fn poll_service(&mut self) -> Option<ServiceUrl> {
        self.next.take()
    }

    /// Get the next entry, waiting until one is available. Returns `None`
    /// once the queue is finished.
    pub async fn take_service(&mut self) -> Option<ServiceUrl> {
        self.await_ready().await;
        self.poll_service()
    }

    /// Get the next entry, waiting no longer than `timeout`. Returns `None`
    /// on timeout or once the queue is finished.
    pub async fn take_service_for(&mut self, timeout: Duration) -> Option<ServiceUrl> {
        self.await_ready_for(timeout).await;
        self.poll_service()
    }

    /// Query whether this queue is finished: the provider completed and all
    /// buffered answers have been read.
    pub fn is_finished(&self) -> bool {
        self.next.is_none() && self.done
    }

    /// Get a snapshot of the problems reported so far. Valid at any time,
    /// including before completion.
    pub fn problems(&self) -> Vec<Error> {
        self.problems
            .lock()
            .expect("problem list lock poisoned")
            .clone()
    }

    /// Cancel any in-progress discovery for this queue. Idempotent and
    /// non-blocking: with a nonzero grace period the cancellation request is
    /// issued from a background thread after the delay, and skipped if the
    /// query completes in the meantime.
    pub fn close(&mut self) {
        let Some(request) = self.request.take() else {
            return;
        };
        if self.is_finished() || self.completed.load(Ordering::Acquire) {
            return;
        }
        if self.cancel_delay.is_zero() {
            debug!("cancelling discovery request");
            request.cancel();
            return;
        }
        let completed = self.completed.clone();
        let delay = self.cancel_delay;
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            if !completed.load(Ordering::Acquire) {
                debug!("cancelling discovery request after {delay:?} grace period");
                request.cancel();
            }
        });
    }
}

impl Drop for ServicesQueue {
    fn drop(&mut self) {
        self.close();
    }
}
