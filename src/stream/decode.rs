use futures::{ Stream, StreamExt };
use log::{ debug, warn };
use serde::de::DeserializeOwned;
use std::error::Error as StdError;
use thiserror::Error;

use super::frame::{ parse_frame, FrameDecoder, FrameError, FramePolicy };

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("stream read error: {0}")] Read(#[source] Box<dyn StdError + Send + Sync>),
    #[error(transparent)] Frame(#[from] FrameError),
}

enum LineOutcome<T> {
    Frame(T),
    Skip,
    Stop(FrameError),
}

fn handle_line<T: DeserializeOwned>(line: &str, policy: FramePolicy) -> LineOutcome<T> {
    match parse_frame(line) {
        Ok(value) => LineOutcome::Frame(value),
        Err(e) =>
            match policy {
                FramePolicy::Strict => LineOutcome::Stop(e),
                FramePolicy::Tolerant => {
                    warn!("Skipping bad frame: {}", e);
                    LineOutcome::Skip
                }
            }
    }
}

/// Turns a chunked byte stream carrying JSON Lines into a stream of parsed frames.
///
/// Frames come out in the order they appear on the wire, each as soon as its
/// terminating newline has been read. A read error ends the stream after
/// yielding it. A malformed frame ends it too under [`FramePolicy::Strict`].
pub fn decode_frames<S, B, E, T>(
    byte_stream: S,
    policy: FramePolicy
) -> impl Stream<Item = Result<T, DecodeError>> + Send + 'static
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Into<Box<dyn StdError + Send + Sync>> + Send + 'static,
        T: DeserializeOwned + Send + 'static
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        let mut bytes = std::pin::pin!(byte_stream);
        let mut frames = 0usize;

        loop {
            let (lines, done) = match bytes.next().await {
                Some(Ok(chunk)) => (decoder.decode(chunk.as_ref()), false),
                Some(Err(e)) => {
                    yield Err(DecodeError::Read(e.into()));
                    return;
                }
                None => (decoder.finish(), true),
            };

            for line in lines {
                match handle_line::<T>(&line, policy) {
                    LineOutcome::Frame(value) => {
                        frames += 1;
                        yield Ok(value);
                    }
                    LineOutcome::Skip => {}
                    LineOutcome::Stop(e) => {
                        yield Err(e.into());
                        return;
                    }
                }
            }

            if done {
                break;
            }
        }

        debug!("Frame stream finished after {} frames", frames);
    }
}
