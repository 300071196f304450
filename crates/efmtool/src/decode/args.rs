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

use bpaf::{construct, long, positional, Parser};
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub(crate) struct DecodeParams {
    pub(crate) output: Option<PathBuf>,
    pub(crate) meta: Option<PathBuf>,
    pub(crate) qlog: Option<PathBuf>,
    pub(crate) bad_list: Option<PathBuf>,
    pub(crate) framed: bool,
    pub(crate) max_bad: Option<u64>,
    pub(crate) slip_tolerance: Option<usize>,
    pub(crate) inputs: Vec<PathBuf>,
}

fn output_parser() -> impl Parser<PathBuf> {
    long("output")
        .short('o')
        .argument::<PathBuf>("OUT_FILE")
        .help("Path to write the sector image")
}

fn meta_parser() -> impl Parser<PathBuf> {
    long("meta")
        .argument::<PathBuf>("META_FILE")
        .help("Path to write the per-sector metadata")
}

fn qlog_parser() -> impl Parser<PathBuf> {
    long("qlog")
        .argument::<PathBuf>("QLOG_FILE")
        .help("Path to write the subcode Q log")
}

fn bad_list_parser() -> impl Parser<PathBuf> {
    long("bad-list")
        .argument::<PathBuf>("BAD_LIST")
        .help("Path to write the indices of bad, EDC-failed and lost sectors")
}

fn framed_parser() -> impl Parser<bool> {
    long("framed")
        .help("Input is 33-byte framed F3 records instead of channel bits")
        .switch()
}

fn max_bad_parser() -> impl Parser<u64> {
    long("max-bad")
        .argument::<u64>("N")
        .help("Exit with status 2 if more than N sectors are bad, EDC-failed or lost")
}

fn slip_tolerance_parser() -> impl Parser<usize> {
    long("slip-tolerance")
        .argument::<usize>("K")
        .help("Number of consecutive missing frame syncs tolerated before searching again")
        .guard(|&k| k <= 64, "Slip tolerance must be 64 or less")
}

pub(crate) fn decode_parser() -> impl Parser<DecodeParams> {
    let output = output_parser().optional();
    let meta = meta_parser().optional();
    let qlog = qlog_parser().optional();
    let bad_list = bad_list_parser().optional();
    let framed = framed_parser();
    let max_bad = max_bad_parser().optional();
    let slip_tolerance = slip_tolerance_parser().optional();
    let inputs = positional::<PathBuf>("INPUT")
        .help("Input files, decoded as independent segments. Use - for stdin")
        .some("At least one input is required");

    construct!(DecodeParams {
        output,
        meta,
        qlog,
        bad_list,
        framed,
        max_bad,
        slip_tolerance,
        inputs
    })
}
