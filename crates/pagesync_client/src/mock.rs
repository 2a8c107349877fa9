//! A scripted transport for testing.
//!
//! Responses are queued ahead of time and every dispatched request is
//! recorded, so tests can assert on both the exchanges made and their
//! order. Cloning shares the script and the recording.

use pagesync_protocol::{HttpClient, HttpRequest, HttpResponse};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Default)]
struct State {
    script: VecDeque<Result<HttpResponse, String>>,
    requests: Vec<HttpRequest>,
}

/// An [`HttpClient`] that replays a scripted sequence of responses.
#[derive(Clone, Default)]
pub struct ScriptedHttp {
    state: Rc<RefCell<State>>,
}

impl ScriptedHttp {
    /// Creates an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for the next unanswered request.
    pub fn push_response(&self, status: u16, body: impl Into<String>) {
        self.state
            .borrow_mut()
            .script
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    /// Queues a transport-level failure for the next request.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.state
            .borrow_mut()
            .script
            .push_back(Err(message.into()));
    }

    /// Returns every request dispatched so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.borrow().requests.clone()
    }
}

impl HttpClient for ScriptedHttp {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, String> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request.clone());
        state
            .script
            .pop_front()
            .unwrap_or_else(|| Err("no scripted response left".into()))
    }
}
