use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serlink_link::{Link, LinkConfig};
use serlink_transport::{SerialConfig, SerialLine};

use crate::cmd::ListenArgs;
use crate::exit::{transport_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = SerialConfig {
        baud_rate: args.baud,
        ..SerialConfig::default()
    };
    let stream = SerialLine::open(&args.device, &config)
        .map_err(|err| transport_error("open failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let received = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&received);
    let port = args.device.display().to_string();

    let link = Link::over_stream(stream, LinkConfig::default(), move |frame| {
        print_frame(&frame, &port, format);
        counter.fetch_add(1, Ordering::SeqCst);
    })
    .map_err(|err| transport_error("open failed", err))?;

    while running.load(Ordering::SeqCst) {
        if let Some(count) = args.count {
            if received.load(Ordering::SeqCst) >= count {
                break;
            }
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    link.shutdown();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
