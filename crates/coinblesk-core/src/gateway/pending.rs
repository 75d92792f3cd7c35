//! Queue of requests suspended until the user logs in again.

use std::collections::VecDeque;
use std::time::Instant;

use reqwest::Response;
use tokio::sync::oneshot;

use super::request::ApiRequest;
use crate::api::ApiError;

pub(crate) type ReplayResult = Result<Response, ApiError>;

/// A request that failed with 401/403, waiting to be re-issued.
#[derive(Debug)]
pub(crate) struct PendingRequest {
    pub id: u64,
    pub request: ApiRequest,
    pub queued_at: Instant,
    reply: oneshot::Sender<ReplayResult>,
}

impl PendingRequest {
    /// Hand the replay's outcome to the suspended caller.
    pub fn resolve(self, result: ReplayResult) {
        // Caller may have timed out and gone away.
        let _ = self.reply.send(result);
    }
}

/// Outcome of queueing a request.
pub(crate) struct Enqueued {
    pub id: u64,
    pub receiver: oneshot::Receiver<ReplayResult>,
    /// No re-authentication prompt was outstanding when this was queued
    pub opens_prompt: bool,
    pub evicted: Option<PendingRequest>,
}

/// Where the re-authentication prompt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prompt {
    Closed,
    /// A queued request is about to announce it
    Requested,
    Shown,
}

#[derive(Debug)]
pub(crate) struct PendingQueue {
    entries: VecDeque<PendingRequest>,
    next_id: u64,
    capacity: usize,
    prompt: Prompt,
}

impl PendingQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_id: 0,
            capacity: capacity.max(1),
            prompt: Prompt::Closed,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn prompt(&self) -> Prompt {
        self.prompt
    }

    /// Queue a request, evicting the oldest entry when full.
    pub fn push(&mut self, request: ApiRequest) -> Enqueued {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        let (tx, rx) = oneshot::channel();
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push_back(PendingRequest {
            id,
            request,
            queued_at: Instant::now(),
            reply: tx,
        });

        let opens_prompt = self.prompt == Prompt::Closed;
        if opens_prompt {
            self.prompt = Prompt::Requested;
        }

        Enqueued {
            id,
            receiver: rx,
            opens_prompt,
            evicted,
        }
    }

    /// Mark the prompt as shown. Returns false if it already was.
    pub fn show_prompt(&mut self) -> bool {
        std::mem::replace(&mut self.prompt, Prompt::Shown) != Prompt::Shown
    }

    /// Take every entry for replay and close the prompt.
    pub fn drain(&mut self) -> Vec<PendingRequest> {
        self.prompt = Prompt::Closed;
        self.entries.drain(..).collect()
    }

    /// Take every entry without closing the prompt.
    pub fn discard_all(&mut self) -> Vec<PendingRequest> {
        self.entries.drain(..).collect()
    }

    /// Remove one entry whose caller stopped waiting
    pub fn remove(&mut self, id: u64) -> Option<PendingRequest> {
        let index = self.entries.iter().position(|p| p.id == id)?;
        self.entries.remove(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_push_opens_prompt() {
        let mut queue = PendingQueue::new(4);
        let first = queue.push(ApiRequest::get("a"));
        assert!(first.opens_prompt);
        assert_eq!(queue.prompt(), Prompt::Requested);

        let second = queue.push(ApiRequest::get("b"));
        assert!(!second.opens_prompt);

        assert!(queue.show_prompt());
        let third = queue.push(ApiRequest::get("c"));
        assert!(!third.opens_prompt);
        assert!(!queue.show_prompt());
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let mut queue = PendingQueue::new(2);
        let a = queue.push(ApiRequest::get("a"));
        let _b = queue.push(ApiRequest::get("b"));
        let c = queue.push(ApiRequest::get("c"));

        let evicted = c.evicted.unwrap();
        assert_eq!(evicted.id, a.id);
        assert_eq!(evicted.request.path, "a");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_drain_closes_prompt_and_empties() {
        let mut queue = PendingQueue::new(4);
        queue.push(ApiRequest::get("a"));
        queue.show_prompt();

        let drained = queue.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(queue.len(), 0);
        assert_eq!(queue.prompt(), Prompt::Closed);
    }

    #[test]
    fn test_discard_keeps_prompt_open() {
        let mut queue = PendingQueue::new(4);
        let mut enqueued = queue.push(ApiRequest::get("a"));
        queue.show_prompt();

        drop(queue.discard_all());
        assert_eq!(queue.prompt(), Prompt::Shown);
        assert!(enqueued.receiver.try_recv().is_err());
    }

    #[test]
    fn test_remove_by_id() {
        let mut queue = PendingQueue::new(4);
        let a = queue.push(ApiRequest::get("a"));
        queue.push(ApiRequest::get("b"));

        assert!(queue.remove(a.id).is_some());
        assert!(queue.remove(a.id).is_none());
        assert_eq!(queue.len(), 1);
    }
}
