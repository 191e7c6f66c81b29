//! Browser implementations of the core's host traits.
//!
//! - [`BrowserFetcher`] loads flag images with `window.fetch`
//! - [`BrowserTimer`] sleeps with `window.setTimeout`; a sleep dropped
//!   before it fires (the fetch won the race) clears its timeout
//! - [`CallbackSink`] hands the finished PNG to a JavaScript callback
//!   `(filename, mime, bytes) => void`, which typically creates an
//!   object URL and clicks a download link

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use flagstamp_core::export::{DownloadSink, FetchError, FlagFetcher, Timer};
use futures::future::LocalBoxFuture;
use js_sys::{Function, Promise, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

/// Fetches flag images over HTTP.
pub struct BrowserFetcher;

impl FlagFetcher for BrowserFetcher {
    fn fetch(&self, url: &str) -> LocalBoxFuture<'static, Result<Vec<u8>, FetchError>> {
        let url = url.to_string();
        Box::pin(async move { fetch_bytes(&url).await })
    }
}

async fn fetch_bytes(url: &str) -> Result<Vec<u8>, FetchError> {
    let window =
        web_sys::window().ok_or_else(|| FetchError::Network("no window object".to_string()))?;

    let response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(network_error)?;
    let response: Response = response
        .dyn_into()
        .map_err(|_| FetchError::Network("fetch did not return a Response".to_string()))?;

    if !response.ok() {
        return Err(FetchError::Status(response.status()));
    }

    let buffer = JsFuture::from(response.array_buffer().map_err(network_error)?)
        .await
        .map_err(network_error)?;
    Ok(Uint8Array::new(&buffer).to_vec())
}

fn network_error(value: JsValue) -> FetchError {
    FetchError::Network(value.as_string().unwrap_or_else(|| format!("{:?}", value)))
}

/// Timer backed by `setTimeout`.
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        Box::pin(schedule(duration))
    }
}

fn schedule(duration: Duration) -> Sleep {
    let millis = timeout_millis(duration);
    let mut handle = None;
    let promise = Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window().map(|window| {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
        });
        match scheduled {
            Some(Ok(id)) => handle = Some(id),
            // No timer available: expire right away rather than hang
            _ => {
                let _ = resolve.call0(&JsValue::NULL);
            }
        }
    });
    Sleep {
        fired: JsFuture::from(promise),
        handle,
    }
}

/// A pending `setTimeout`. Dropping it before it fires clears the timeout.
struct Sleep {
    fired: JsFuture,
    handle: Option<i32>,
}

impl Future for Sleep {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        match Pin::new(&mut self.fired).poll(cx) {
            Poll::Ready(_) => {
                self.handle = None;
                Poll::Ready(())
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for Sleep {
    fn drop(&mut self) {
        if let (Some(handle), Some(window)) = (self.handle.take(), web_sys::window()) {
            window.clear_timeout_with_handle(handle);
        }
    }
}

/// Clamp a duration to the range `setTimeout` accepts.
pub(crate) fn timeout_millis(duration: Duration) -> i32 {
    i32::try_from(duration.as_millis()).unwrap_or(i32::MAX)
}

/// Delivers exports to a JavaScript callback.
pub struct CallbackSink {
    callback: Function,
}

impl CallbackSink {
    pub fn new(callback: Function) -> Self {
        Self { callback }
    }
}

impl DownloadSink for CallbackSink {
    fn deliver(&mut self, filename: &str, mime: &str, bytes: &[u8]) {
        let data = Uint8Array::from(bytes);
        if let Err(e) = self.callback.call3(
            &JsValue::NULL,
            &JsValue::from_str(filename),
            &JsValue::from_str(mime),
            &data,
        ) {
            log::error!("download callback failed: {:?}", e);
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_pending_sleep_holds_timeout() {
        let sleep = schedule(Duration::from_secs(60));
        assert!(sleep.handle.is_some());
        // Clears the timeout
        drop(sleep);
    }

    #[wasm_bindgen_test]
    async fn test_fired_sleep_releases_timeout() {
        let mut sleep = schedule(Duration::from_millis(1));
        (&mut sleep).await;
        assert!(sleep.handle.is_none());
    }
}
