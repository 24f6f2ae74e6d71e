#![allow(dead_code)]

use sparqlclient::{HttpRequest, HttpResponse, Transport};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn fixture(name: &str) -> Vec<u8> {
    let path = Path::new("tests/data").join(name);
    std::fs::read(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()))
}

/// A reader that hands out one byte per `read` call, so every tag and text
/// node of a document arrives split across reads.
pub struct Trickle {
    data: Vec<u8>,
    pos: usize,
}

impl Trickle {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
        }
    }
}

impl Read for Trickle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() || self.pos >= self.data.len() {
            return Ok(0);
        }
        buf[0] = self.data[self.pos];
        self.pos += 1;
        Ok(1)
    }
}

enum Canned {
    Response(u16, Vec<u8>),
    Failure(String),
}

#[derive(Default)]
struct MockState {
    requests: Vec<HttpRequest>,
    responses: VecDeque<Canned>,
    trickle: bool,
}

/// Records every request and answers with queued responses (200 with an
/// empty body once the queue is exhausted). Clones share state, so a test
/// keeps one handle while the connection owns the other.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, status: u16, body: impl Into<Vec<u8>>) -> &Self {
        self.state
            .borrow_mut()
            .responses
            .push_back(Canned::Response(status, body.into()));
        self
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.state
            .borrow_mut()
            .responses
            .push_back(Canned::Failure(message.to_string()));
        self
    }

    pub fn trickle(&self, trickle: bool) {
        self.state.borrow_mut().trickle = trickle;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.borrow().requests.clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.state
            .borrow()
            .requests
            .last()
            .cloned()
            .expect("no request was sent")
    }
}

impl Transport for MockTransport {
    fn send(&self, request: HttpRequest) -> anyhow::Result<HttpResponse> {
        let mut state = self.state.borrow_mut();
        state.requests.push(request);
        let (status, body) = match state.responses.pop_front() {
            Some(Canned::Response(status, body)) => (status, body),
            Some(Canned::Failure(message)) => return Err(anyhow::anyhow!(message)),
            None => (200, Vec::new()),
        };
        let body: Box<dyn Read + Send> = if state.trickle {
            Box::new(Trickle::new(body))
        } else {
            Box::new(io::Cursor::new(body))
        };
        Ok(HttpResponse {
            status,
            body,
            elapsed: Duration::from_millis(1),
        })
    }
}

pub fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Decodes one field of an `application/x-www-form-urlencoded` body.
pub fn form_field(body: &[u8], key: &str) -> Option<Vec<u8>> {
    body.split(|b| *b == b'&').find_map(|pair| {
        let mut parts = pair.splitn(2, |b| *b == b'=');
        let name = parts.next()?;
        let value = parts.next().unwrap_or_default();
        (name == key.as_bytes()).then(|| percent_encoding::percent_decode(value).collect())
    })
}

/// Decodes one parameter of a URL's query string.
pub fn query_param(url: &str, key: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    form_field(query.as_bytes(), key).map(|v| String::from_utf8_lossy(&v).into_owned())
}
