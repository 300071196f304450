/*
    efmfox

    Copyright 2024 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------
*/

//! Drivers that feed an [EfmDecoder] from readers.

use crate::{
    pipeline::{DecodeEvent, DecodeOptions, DecodeReport, EfmDecoder},
    EfmError,
    EfmResult,
};
use std::{
    io::{ErrorKind, Read},
    sync::{atomic::AtomicBool, Arc},
    thread,
};

const READ_CHUNK: usize = 64 * 1024;

/// Decode everything `reader` produces, passing each event to `handler` in stream order.
///
/// An error from `handler` or from the reader aborts the decode. If the input never produced an
/// F3 frame, every event is still delivered and [EfmError::NeverSynchronised] is returned.
pub fn decode_reader<R, F>(
    mut reader: R,
    options: &DecodeOptions,
    cancel: Option<Arc<AtomicBool>>,
    mut handler: F,
) -> EfmResult<DecodeReport>
where
    R: Read,
    F: FnMut(DecodeEvent) -> EfmResult<()>,
{
    let mut decoder = EfmDecoder::new(options.clone());
    if let Some(cancel) = cancel {
        decoder = decoder.with_cancel(cancel);
    }

    let mut buf = vec![0u8; READ_CHUNK];
    loop {
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };

        let pushed = decoder.push_input(&buf[..read]);
        for event in decoder.drain_events() {
            handler(event)?;
        }
        match pushed {
            Ok(()) => {}
            Err(EfmError::Cancelled) => return Ok(decoder.report()),
            Err(e) => return Err(e),
        }
    }

    decoder.finish()?;
    for event in decoder.drain_events() {
        handler(event)?;
    }

    let report = decoder.report();
    if !report.synchronised() {
        return Err(EfmError::NeverSynchronised);
    }
    Ok(report)
}

/// The result of decoding one segment.
#[derive(Debug)]
pub struct SegmentOutput {
    pub events: Vec<DecodeEvent>,
    pub report: EfmResult<DecodeReport>,
}

/// Decode independent input segments in parallel, one pipeline per segment. Results are
/// returned in input order, and events within a segment keep their stream order.
pub fn decode_segments<R>(inputs: Vec<R>, options: &DecodeOptions) -> Vec<SegmentOutput>
where
    R: Read + Send,
{
    thread::scope(|scope| {
        let handles: Vec<_> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                scope.spawn(move || {
                    log::debug!("decode_segments(): decoding segment {}", index);
                    let mut events = Vec::new();
                    let report = decode_reader(input, options, None, |event| {
                        events.push(event);
                        Ok(())
                    });
                    SegmentOutput { events, report }
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{InputFormat, FRAMED_RECORD_BYTES};
    use std::io::Cursor;

    #[test]
    fn test_never_synchronised() {
        let result = decode_reader(Cursor::new(vec![0u8; 10_000]), &DecodeOptions::default(), None, |_| Ok(()));
        assert!(matches!(result, Err(EfmError::NeverSynchronised)));
    }

    #[test]
    fn test_handler_error_aborts() {
        let options = DecodeOptions {
            input_format: InputFormat::FramedF3,
            ..DecodeOptions::default()
        };
        let input = Cursor::new(vec![0u8; FRAMED_RECORD_BYTES * 10]);
        let result = decode_reader(input, &options, None, |_| {
            Err(EfmError::Io(std::io::Error::new(ErrorKind::Other, "disk full")))
        });
        assert!(matches!(result, Err(EfmError::Io(_))));
    }

    #[test]
    fn test_segments_in_order() {
        let options = DecodeOptions {
            input_format: InputFormat::FramedF3,
            ..DecodeOptions::default()
        };
        let inputs = vec![
            Cursor::new(vec![0u8; FRAMED_RECORD_BYTES * 10]),
            Cursor::new(Vec::new()),
            Cursor::new(vec![0u8; FRAMED_RECORD_BYTES * 20]),
        ];
        let outputs = decode_segments(inputs, &options);
        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].report.as_ref().unwrap().f3_frames, 10);
        assert!(matches!(outputs[1].report, Err(EfmError::NeverSynchronised)));
        assert_eq!(outputs[2].report.as_ref().unwrap().f3_frames, 20);
    }
}
