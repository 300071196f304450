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

//! [EfmDecoder] owns a complete pipeline and moves data between its stages.

use crate::{
    circ::{CircDecoder, CodewordCounts},
    efm::{delineator::BitDelineator, demodulator::EfmDemodulator, ChannelFrame},
    metadata::MetadataSink,
    pipeline::{
        splitter::F3Splitter,
        stage::Stage,
        DecodeEvent,
        DecodeOptions,
        DecodeReport,
        FramedF3Record,
        InputFormat,
        FRAMED_RECORD_BYTES,
    },
    sector::{AssembledSector, SectorAssembler},
    subcode::SubcodeAssembler,
    types::{
        enums::DelineatorState,
        frames::{F1Frame, F3Frame},
    },
    EfmError,
    EfmResult,
};
use binrw::BinRead;
use std::{
    collections::VecDeque,
    io::Cursor,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// Receives every F1 frame leaving the CIRC decoder, excluding lead-in frames. This is the hook
/// for consumers of the F1 stream other than the sector assembler, such as audio extraction.
pub trait F1Tap {
    fn frame(&mut self, frame: &F1Frame);
}

impl<F: FnMut(&F1Frame)> F1Tap for F {
    fn frame(&mut self, frame: &F1Frame) {
        self(frame)
    }
}

pub struct EfmDecoder {
    options: DecodeOptions,
    delineator: BitDelineator,
    demodulator: EfmDemodulator,
    splitter: F3Splitter,
    circ: CircDecoder,
    assembler: SectorAssembler,
    subcode: SubcodeAssembler,
    sink: MetadataSink,
    tap: Option<Box<dyn F1Tap>>,
    framed_buf: Vec<u8>,
    events: VecDeque<DecodeEvent>,
    cancel: Arc<AtomicBool>,
    c1_mark: CodewordCounts,
    c2_mark: CodewordCounts,
    report: DecodeReport,
    finished: bool,
}

impl Default for EfmDecoder {
    fn default() -> Self {
        Self::new(DecodeOptions::default())
    }
}

impl EfmDecoder {
    pub fn new(options: DecodeOptions) -> Self {
        Self {
            delineator: BitDelineator::new(options.slip_tolerance, options.sync_window),
            demodulator: EfmDemodulator::new(),
            splitter: F3Splitter::new(),
            circ: CircDecoder::new(),
            assembler: SectorAssembler::new(options.sector_mismatch_limit, options.max_gap),
            subcode: SubcodeAssembler::new(),
            sink: MetadataSink::new(),
            tap: None,
            framed_buf: Vec::new(),
            events: VecDeque::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            c1_mark: CodewordCounts::default(),
            c2_mark: CodewordCounts::default(),
            report: DecodeReport::default(),
            finished: false,
            options,
        }
    }

    /// Attach a tap that receives every F1 frame.
    pub fn with_tap(mut self, tap: Box<dyn F1Tap>) -> Self {
        self.tap = Some(tap);
        self
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Return a handle that cancels decoding when set. The flag is checked between frames.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub fn delineator_state(&self) -> DelineatorState {
        self.delineator.state()
    }

    /// Push input bytes in the configured input format.
    pub fn push_input(&mut self, bytes: &[u8]) -> EfmResult<()> {
        match self.options.input_format {
            InputFormat::ChannelBits => self.push_bytes(bytes),
            InputFormat::FramedF3 => self.push_framed(bytes),
        }
    }

    /// Push channel bits packed MSB-first.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> EfmResult<()> {
        self.check_open()?;
        for &byte in bytes.iter() {
            self.delineator.push_byte(byte);
            self.drain_delineator()?;
        }
        Ok(())
    }

    /// Push a single channel bit.
    pub fn push_bit(&mut self, bit: bool) -> EfmResult<()> {
        self.check_open()?;
        self.delineator.push_bit(bit);
        self.drain_delineator()
    }

    /// Push framed F3 records. A record split across calls is held until it completes.
    pub fn push_framed(&mut self, bytes: &[u8]) -> EfmResult<()> {
        self.check_open()?;
        self.framed_buf.extend_from_slice(bytes);
        let records = self.framed_buf.len() / FRAMED_RECORD_BYTES;
        let consumed = records * FRAMED_RECORD_BYTES;

        let parsed = {
            let mut cursor = Cursor::new(&self.framed_buf[..consumed]);
            (0..records)
                .map(|_| FramedF3Record::read(&mut cursor))
                .collect::<Result<Vec<_>, _>>()?
        };
        self.framed_buf.drain(..consumed);

        for record in parsed {
            self.push_f3(F3Frame::new(record.subcode, record.payload))?;
        }
        Ok(())
    }

    /// Push an F3 frame directly into the splitter.
    pub fn push_f3(&mut self, frame: F3Frame) -> EfmResult<()> {
        self.check_open()?;
        self.process_f3(frame);
        self.check_cancel()
    }

    /// Flush every stage, in pipeline order, and queue the terminal [DecodeEvent::Finished].
    pub fn finish(&mut self) -> EfmResult<()> {
        self.check_open()?;
        self.flush_stages();
        self.finished = true;
        self.events.push_back(DecodeEvent::Finished);
        log::debug!(
            "EfmDecoder::finish(): {} F3 frames, {} sectors",
            self.report.f3_frames,
            self.report.sectors.total()
        );
        Ok(())
    }

    /// Take the next queued event.
    pub fn next_event(&mut self) -> Option<DecodeEvent> {
        self.events.pop_front()
    }

    /// Take every queued event.
    pub fn drain_events(&mut self) -> Vec<DecodeEvent> {
        self.events.drain(..).collect()
    }

    pub fn report(&mut self) -> DecodeReport {
        self.update_report();
        self.report.clone()
    }

    fn update_report(&mut self) {
        self.report.delineator = self.delineator.stats();
        self.report.demodulator = self.demodulator.stats();
        self.report.subcode = self.subcode.stats();
        self.report.assembler = self.assembler.stats();
        self.report.c1 = self.circ.c1_counts();
        self.report.c2 = self.circ.c2_counts();
    }

    fn check_open(&self) -> EfmResult<()> {
        if self.report.cancelled {
            return Err(EfmError::Cancelled);
        }
        if self.finished {
            return Err(EfmError::ParameterError("decoder has already finished".to_string()));
        }
        Ok(())
    }

    /// Flush every stage in pipeline order. Frames held in the CIRC delays come out with the
    /// bytes they are missing erased, and a sector left incomplete is reported as lost.
    fn flush_stages(&mut self) {
        if !self.framed_buf.is_empty() {
            log::warn!(
                "EfmDecoder::flush_stages(): discarding {} trailing bytes of an incomplete framed record",
                self.framed_buf.len()
            );
            self.framed_buf.clear();
        }

        self.delineator.flush();
        while let Some(frame) = self.delineator.pull() {
            self.process_channel_frame(frame);
        }
        self.demodulator.flush();
        self.drain_demodulator();
        self.splitter.flush();
        self.drain_splitter();
        self.subcode.flush();
        self.drain_subcode();
        self.circ.flush();
        self.drain_circ();
        self.assembler.flush();
        self.drain_assembler();

        self.update_report();
    }

    fn check_cancel(&mut self) -> EfmResult<()> {
        if !self.cancel.load(Ordering::Relaxed) {
            return Ok(());
        }
        log::debug!("EfmDecoder: cancelled, flushing");
        self.report.cancelled = true;
        self.flush_stages();
        self.events.push_back(DecodeEvent::Cancelled);
        Err(EfmError::Cancelled)
    }

    fn drain_delineator(&mut self) -> EfmResult<()> {
        while let Some(frame) = self.delineator.pull() {
            self.process_channel_frame(frame);
            self.check_cancel()?;
        }
        Ok(())
    }

    fn process_channel_frame(&mut self, frame: ChannelFrame) {
        self.demodulator.push(frame);
        self.drain_demodulator();
    }

    fn drain_demodulator(&mut self) {
        while let Some(f3) = self.demodulator.pull() {
            self.process_f3(f3);
        }
    }

    fn process_f3(&mut self, frame: F3Frame) {
        self.report.f3_frames += 1;
        self.splitter.push(frame);
        self.drain_splitter();
    }

    fn drain_splitter(&mut self) {
        while let Some(symbol) = self.splitter.pull_subcode() {
            self.subcode.push(symbol);
        }
        self.drain_subcode();
        while let Some(f2) = self.splitter.pull() {
            self.circ.push(f2);
        }
        self.drain_circ();
    }

    fn drain_subcode(&mut self) {
        while let Some(block) = self.subcode.pull() {
            if block.q.crc_ok {
                self.sink.push_q(&block.q);
                self.events.push_back(DecodeEvent::Subcode(block.q));
            }
        }
    }

    fn drain_circ(&mut self) {
        while let Some(f1) = self.circ.pull() {
            if !f1.is_lead_in() {
                if let Some(tap) = self.tap.as_mut() {
                    tap.frame(&f1);
                }
            }
            self.assembler.push(f1);
            self.drain_assembler();
        }
    }

    fn drain_assembler(&mut self) {
        while let Some(assembled) = self.assembler.pull() {
            let c1 = self.circ.c1_counts();
            let c2 = self.circ.c2_counts();
            let meta = self.sink.bind(&assembled, c1.since(&self.c1_mark), c2.since(&self.c2_mark));
            self.c1_mark = c1;
            self.c2_mark = c2;

            self.report.sectors.record(meta.status);
            match assembled {
                AssembledSector::Sector(sector) => {
                    log::trace!("EfmDecoder: sector {}", meta);
                    self.events.push_back(DecodeEvent::Sector(sector, meta));
                }
                AssembledSector::Lost { .. } => {
                    self.events.push_back(DecodeEvent::Lost(meta));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::frames::F3_PAYLOAD_BYTES;
    use std::{cell::RefCell, rc::Rc};

    #[test]
    fn test_zero_framed_input() {
        let mut decoder = EfmDecoder::new(DecodeOptions {
            input_format: InputFormat::FramedF3,
            ..DecodeOptions::default()
        });
        let seen = Rc::new(RefCell::new(0usize));
        let counter = Rc::clone(&seen);
        decoder = decoder.with_tap(Box::new(move |_: &F1Frame| *counter.borrow_mut() += 1));

        // Push in uneven chunks so records straddle calls.
        let bytes = vec![0u8; FRAMED_RECORD_BYTES * 200];
        for chunk in bytes.chunks(50) {
            decoder.push_input(chunk).unwrap();
        }
        decoder.finish().unwrap();

        let events = decoder.drain_events();
        assert!(matches!(events.last(), Some(DecodeEvent::Finished)));
        assert_eq!(*seen.borrow(), 198);
        assert_eq!(decoder.report().f3_frames, 200);
    }

    #[test]
    fn test_cancel() {
        let mut decoder = EfmDecoder::default();
        let cancel = decoder.cancel_handle();
        decoder.push_f3(F3Frame::new(0, [0; F3_PAYLOAD_BYTES])).unwrap();
        cancel.store(true, Ordering::Relaxed);

        let result = decoder.push_f3(F3Frame::new(0, [0; F3_PAYLOAD_BYTES]));
        assert!(matches!(result, Err(EfmError::Cancelled)));
        assert!(matches!(decoder.drain_events().last(), Some(DecodeEvent::Cancelled)));
        assert!(matches!(decoder.finish(), Err(EfmError::Cancelled)));
        assert!(decoder.report().cancelled);
    }

    #[test]
    fn test_never_synchronised() {
        let mut decoder = EfmDecoder::default();
        decoder.push_bytes(&[0u8; 4096]).unwrap();
        decoder.finish().unwrap();
        assert!(!decoder.report().synchronised());
        assert_eq!(decoder.delineator_state(), DelineatorState::Searching);
    }
}
