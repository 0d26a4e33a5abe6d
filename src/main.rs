use std::fs::File;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use biscuit_sorter::{ImageDirSource, SorterConfig, SortingController, UartActuator};

fn main() -> ExitCode {
    // --- 1. Logging & Configuration ---
    env_logger::init();
    let config = SorterConfig::load();

    // --- 2. Cooperative Stop Flag ---
    // Ctrl-C requests a clean shutdown; the loop observes the flag between
    // cycles and unwinds through its cleanup path.
    let stop_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = stop_flag.clone();
    if let Err(error) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::SeqCst)) {
        log::warn!("could not install interrupt handler: {error}");
    }

    // --- 3. Hardware Acquisition ---
    let transport = match File::options()
        .read(true)
        .write(true)
        .open(&config.serial_device)
    {
        Ok(device) => device,
        Err(error) => {
            log::error!(
                "could not open serial device {}: {error}",
                config.serial_device.display()
            );
            return ExitCode::FAILURE;
        }
    };
    let frames = match ImageDirSource::open(&config.frames_dir) {
        Ok(source) => source,
        Err(error) => {
            log::error!(
                "could not open frame directory {}: {error}",
                config.frames_dir.display()
            );
            return ExitCode::FAILURE;
        }
    };

    // --- 4. Controller Assembly ---
    let mut controller =
        match SortingController::new(&config, frames, UartActuator::new(transport), stop_flag) {
            Ok(controller) => controller,
            Err(error) => {
                log::error!("invalid configuration: {error}");
                return ExitCode::FAILURE;
            }
        };

    // --- 5. Sorting Loop ---
    log::info!("starting vision-based sorting");
    match controller.run() {
        Ok(()) => {
            log::info!("sorting completed");
            ExitCode::SUCCESS
        }
        Err(error) => {
            log::error!("sorting aborted: {error}");
            ExitCode::FAILURE
        }
    }
}
