use std::fs;
use std::time::{Duration, Instant};

use serlink_frame::{Frame, ENVELOPE_LEN};
use serlink_link::{Link, LinkConfig};
use serlink_transport::{SerialConfig, SerialLine};

use crate::cmd::SendArgs;
use crate::exit::{
    frame_error, transport_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let envelope = parse_envelope(&args.envelope)?;
    let text = resolve_text(&args)?;

    let frame =
        Frame::build(&envelope, &text).map_err(|err| frame_error("framing failed", err))?;

    let config = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    let stream = SerialLine::open(&args.device, &config)
        .map_err(|err| transport_error("open failed", err))?;

    // Anything the peer sends back during the transfer window still gets
    // validated and printed.
    let port = args.device.display().to_string();
    let link = Link::over_stream(stream, LinkConfig::default(), move |frame| {
        print_frame(&frame, &port, format);
    })
    .map_err(|err| transport_error("open failed", err))?;

    if !link.send_message(frame.into_bytes()) {
        return Err(CliError::new(FAILURE, "link busy, transfer refused"));
    }

    let deadline = Instant::now() + timeout;
    while link.is_sending() {
        if Instant::now() >= deadline {
            link.interrupt();
            return Err(CliError::new(
                TIMEOUT,
                "transfer window did not close in time",
            ));
        }
        std::thread::sleep(Duration::from_millis(20));
    }

    link.shutdown();
    Ok(SUCCESS)
}

fn parse_envelope(input: &str) -> CliResult<[u8; ENVELOPE_LEN]> {
    <[u8; ENVELOPE_LEN]>::try_from(input.as_bytes()).map_err(|_| {
        CliError::new(
            USAGE,
            format!("envelope must be exactly {ENVELOPE_LEN} characters: {input:?}"),
        )
    })
}

fn resolve_text(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(text) = &args.text {
        return Ok(text.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Ok(Vec::new())
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        _ => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit: {unit}"),
        )),
    }
}
