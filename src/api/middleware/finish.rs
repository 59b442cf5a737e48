//! Response-finished notification
//!
//! Wraps a response body so a callback runs once the connection is done with
//! it: after the last frame has been written, or when the body is dropped
//! early. The callback receives the number of body bytes handed out.

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use axum::{
    body::{Body, Bytes},
    response::Response,
};
use http_body::{Body as HttpBody, Frame, SizeHint};
use pin_project::{pin_project, pinned_drop};

type FinishCallback = Box<dyn FnOnce(u64) + Send + 'static>;

#[pin_project(PinnedDrop)]
pub struct FinishBody<B> {
    #[pin]
    inner: B,
    bytes_sent: u64,
    on_finish: Option<FinishCallback>,
}

impl<B> FinishBody<B> {
    pub fn new(inner: B, on_finish: impl FnOnce(u64) + Send + 'static) -> Self {
        Self {
            inner,
            bytes_sent: 0,
            on_finish: Some(Box::new(on_finish)),
        }
    }
}

impl<B> HttpBody for FinishBody<B>
where
    B: HttpBody<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();
        let polled = this.inner.poll_frame(cx);

        if let Poll::Ready(Some(Ok(frame))) = &polled {
            if let Some(data) = frame.data_ref() {
                *this.bytes_sent += data.len() as u64;
            }
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[pinned_drop]
impl<B> PinnedDrop for FinishBody<B> {
    fn drop(self: Pin<&mut Self>) {
        let this = self.project();
        if let Some(on_finish) = this.on_finish.take() {
            on_finish(*this.bytes_sent);
        }
    }
}

/// Attach a completion callback to `response`
pub fn on_finish<F>(response: Response, callback: F) -> Response
where
    F: FnOnce(u64) + Send + 'static,
{
    response.map(|body| Body::new(FinishBody::new(body, callback)))
}
