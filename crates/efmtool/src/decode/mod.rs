/*
    efmtool

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

pub(crate) mod args;

use anyhow::{Context, Error};
use std::{
    fs::File,
    io::{BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use crate::args::GlobalOptions;
use efmfox::{
    decode_reader,
    decode_segments,
    DecodeEvent,
    DecodeOptions,
    DecodeReport,
    EfmError,
    EfmResult,
    InputFormat,
};

/// What the tool reports back to `main` for choosing an exit status.
#[derive(Debug, Default)]
pub(crate) struct DecodeOutcome {
    pub(crate) synchronised: bool,
    pub(crate) bad_sectors: u64,
}

/// The output files requested on the command line.
struct Outputs {
    image: Option<BufWriter<File>>,
    meta: Option<BufWriter<File>>,
    qlog: Option<BufWriter<File>>,
    bad_list: Option<BufWriter<File>>,
}

fn create_output(path: &Option<PathBuf>) -> Result<Option<BufWriter<File>>, Error> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Creating output file {}", path.display()))?;
            Ok(Some(BufWriter::new(file)))
        }
        None => Ok(None),
    }
}

impl Outputs {
    fn create(params: &args::DecodeParams) -> Result<Self, Error> {
        Ok(Outputs {
            image: create_output(&params.output)?,
            meta: create_output(&params.meta)?,
            qlog: create_output(&params.qlog)?,
            bad_list: create_output(&params.bad_list)?,
        })
    }

    fn write_event(&mut self, event: &DecodeEvent) -> std::io::Result<()> {
        match event {
            DecodeEvent::Sector(sector, meta) => {
                if let Some(image) = self.image.as_mut() {
                    image.write_all(sector.as_bytes())?;
                }
                if let Some(out) = self.meta.as_mut() {
                    writeln!(out, "{}", meta.line())?;
                }
                if let Some(out) = self.bad_list.as_mut() {
                    if meta.status.is_bad() {
                        writeln!(out, "{}", meta.address.index())?;
                    }
                }
            }
            DecodeEvent::Lost(meta) => {
                if let Some(out) = self.meta.as_mut() {
                    writeln!(out, "{}", meta.line())?;
                }
                if let Some(out) = self.bad_list.as_mut() {
                    writeln!(out, "{}", meta.address.index())?;
                }
            }
            DecodeEvent::Subcode(q) => {
                if let Some(out) = self.qlog.as_mut() {
                    writeln!(out, "{}", q.log_line())?;
                }
            }
            DecodeEvent::Cancelled | DecodeEvent::Finished => {}
        }
        Ok(())
    }

    fn finish(self) -> std::io::Result<()> {
        for mut out in [self.image, self.meta, self.qlog, self.bad_list].into_iter().flatten() {
            out.flush()?;
        }
        Ok(())
    }
}

fn open_input(path: &Path) -> Result<Box<dyn Read + Send>, Error> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(std::io::stdin()));
    }
    let file = File::open(path).with_context(|| format!("Opening input file {}", path.display()))?;
    Ok(Box::new(std::io::BufReader::new(file)))
}

fn print_report(index: usize, report: &DecodeReport) {
    println!("Segment {}:", index);
    println!("{}", "-".repeat(79));
    println!(
        "  F3 frames: {} ({} predicted, {} resyncs)",
        report.f3_frames, report.delineator.predicted, report.delineator.resyncs
    );
    println!("  C1 passed/corrected/failed: {}", report.c1);
    println!("  C2 passed/corrected/failed: {}", report.c2);
    println!(
        "  Q blocks: {} valid, {} invalid",
        report.subcode.q_valid, report.subcode.q_invalid
    );
    println!(
        "  Sectors: {} ok, {} corrected, {} edc-fail, {} bad, {} lost",
        report.sectors.ok, report.sectors.corrected, report.sectors.edc_fail, report.sectors.bad, report.sectors.lost
    );
}

pub(crate) fn run(global: &GlobalOptions, params: args::DecodeParams) -> Result<DecodeOutcome, Error> {
    let mut options = DecodeOptions {
        input_format: if params.framed {
            InputFormat::FramedF3
        }
        else {
            InputFormat::ChannelBits
        },
        ..DecodeOptions::default()
    };
    if let Some(k) = params.slip_tolerance {
        options.slip_tolerance = k;
    }

    let mut outputs = Outputs::create(&params)?;
    let mut outcome = DecodeOutcome::default();

    let mut account = |index: usize, report: EfmResult<DecodeReport>| -> Result<(), Error> {
        match report {
            Ok(report) => {
                if !global.silent {
                    print_report(index, &report);
                }
                outcome.synchronised = true;
                outcome.bad_sectors += report.bad_sectors();
                Ok(())
            }
            Err(EfmError::NeverSynchronised) => {
                log::warn!("Segment {} never synchronised", index);
                Ok(())
            }
            Err(e) => Err(Error::new(e).context(format!("Decoding segment {}", index))),
        }
    };

    if params.inputs.len() == 1 {
        // A single input is streamed straight to the outputs.
        let input = open_input(&params.inputs[0])?;
        let report = decode_reader(input, &options, None, |event| Ok(outputs.write_event(&event)?));
        account(0, report)?;
    }
    else {
        let inputs = params
            .inputs
            .iter()
            .map(|path| open_input(path))
            .collect::<Result<Vec<_>, _>>()?;

        for (index, segment) in decode_segments(inputs, &options).into_iter().enumerate() {
            for event in segment.events.iter() {
                outputs.write_event(event).context("Writing decoder output")?;
            }
            account(index, segment.report)?;
        }
    }

    outputs.finish().context("Flushing decoder output")?;
    Ok(outcome)
}
