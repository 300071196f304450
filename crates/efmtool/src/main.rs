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

pub mod args;
pub mod decode;

use anyhow::Error;
use efmfox::EfmError;

use args::app_parser;

/// Exit status when more sectors than `--max-bad` were bad.
const EXIT_MAX_BAD: i32 = 2;
/// Exit status on an unrecoverable I/O error.
const EXIT_IO: i32 = 3;
/// Exit status when no input ever synchronised.
const EXIT_NEVER_SYNCHRONISED: i32 = 4;

fn exit_code_for(e: &Error) -> i32 {
    for cause in e.chain() {
        if let Some(efm_error) = cause.downcast_ref::<EfmError>() {
            return match efm_error {
                EfmError::NeverSynchronised => EXIT_NEVER_SYNCHRONISED,
                EfmError::Io(_) | EfmError::FramedRecord(_) => EXIT_IO,
                _ => 1,
            };
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return EXIT_IO;
        }
    }
    1
}

fn main() {
    env_logger::init();

    let app_params = app_parser().run();
    let max_bad = app_params.decode.max_bad;

    match decode::run(&app_params.global, app_params.decode) {
        Ok(outcome) => {
            if !outcome.synchronised {
                eprintln!("No input produced a synchronised EFM frame");
                std::process::exit(EXIT_NEVER_SYNCHRONISED);
            }
            if let Some(max_bad) = max_bad {
                if outcome.bad_sectors > max_bad {
                    eprintln!("{} bad sectors exceeds the limit of {}", outcome.bad_sectors, max_bad);
                    std::process::exit(EXIT_MAX_BAD);
                }
            }
        }
        Err(e) => {
            eprintln!("Decode failed: {}", e);
            for cause in e.chain().skip(1) {
                eprintln!("Caused by: {}", cause);
            }
            std::process::exit(exit_code_for(&e));
        }
    }
}
