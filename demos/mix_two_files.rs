//! Mix two raw PCM files into one.
//!
//! Run with: cargo run --example mix_two_files -- \
//!     -r 48000 -c 1 -i first.pcm -r 44100 -c 2 -i second.pcm \
//!     -r 48000 -c 2 -o mixed.pcm
//!
//! `-r` and `-c` set the rate and channel count for the *next* `-i` or
//! `-o` that follows them. Inputs are 16-bit signed little-endian
//! interleaved PCM; the first input is mixed at +5 dB, the second at
//! +15 dB, and the mix ends with the first input.

use std::fs::File;
use std::io::BufWriter;
use std::process::ExitCode;

use mischt::{FrameShape, GraphSpec, Pump, FRAME_LEN, MAX_STREAMS};

struct Params {
    inputs: Vec<(String, FrameShape)>,
    output: Option<(String, FrameShape)>,
}

fn parse_args() -> Result<Params, String> {
    let mut params = Params {
        inputs: Vec::new(),
        output: None,
    };
    let mut sample_rate: u32 = 0;
    let mut channels: usize = 0;

    let mut args = std::env::args().skip(1);
    while let Some(flag) = args.next() {
        let value = args
            .next()
            .ok_or_else(|| format!("missing value after {flag}"))?;
        match flag.as_str() {
            "-r" => {
                sample_rate = value.parse().map_err(|_| format!("bad rate: {value}"))?;
            }
            "-c" => {
                channels = value.parse().map_err(|_| format!("bad channels: {value}"))?;
            }
            "-i" => {
                let shape = FrameShape::s16(sample_rate, channels, FRAME_LEN);
                params.inputs.push((value, shape));
                sample_rate = 0;
                channels = 0;
            }
            "-o" => {
                let shape = FrameShape::s16(sample_rate, channels, FRAME_LEN);
                params.output = Some((value, shape));
                sample_rate = 0;
                channels = 0;
            }
            other => return Err(format!("unknown option: {other}")),
        }
    }

    if params.inputs.len() != MAX_STREAMS {
        return Err(format!("need exactly {MAX_STREAMS} inputs (-i)"));
    }
    if params.output.is_none() {
        return Err("need an output (-o)".into());
    }
    Ok(params)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let params = match parse_args() {
        Ok(params) => params,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    let (out_path, out_shape) = params.output.unwrap();

    for (path, shape) in &params.inputs {
        tracing::info!(%path, %shape, "input");
    }
    tracing::info!(path = %out_path, shape = %out_shape, "output");

    let in_shapes: Vec<FrameShape> = params.inputs.iter().map(|(_, s)| *s).collect();
    let mut graph = match GraphSpec::mix(&in_shapes, &[5.0, 15.0], 3, out_shape).build() {
        Ok(graph) => graph,
        Err(err) => {
            eprintln!("graph build failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut readers = Vec::new();
    for (path, _) in &params.inputs {
        match File::open(path) {
            Ok(file) => readers.push(file),
            Err(err) => {
                eprintln!("open [{path}] failed: {err}");
                return ExitCode::FAILURE;
            }
        }
    }
    let writer = match File::create(&out_path) {
        Ok(file) => BufWriter::new(file),
        Err(err) => {
            eprintln!("create [{out_path}] failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    let report = match Pump::new(&mut graph, readers, writer).and_then(|pump| pump.run()) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("mix failed: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        frames_in = ?report.frames_in,
        frames_out = report.frames_out,
        "mix complete"
    );
    ExitCode::SUCCESS
}
