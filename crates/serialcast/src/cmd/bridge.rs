use std::time::Instant;

use serialcast_frame::{FrameConfig, DEFAULT_DELIMITER};
use serialcast_pipeline::{
    open_bridge, BridgeConfig, CancellationSignal, PipelineConfig, PipelineError,
};
use serialcast_transport::{default_device_path, MulticastConfig, SerialConfig};
use tracing::{error, info, warn};

use crate::cmd::{parse_duration, BridgeArgs};
use crate::exit::{pipeline_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_summary, OutputFormat, SummaryOutput};

pub fn run(args: BridgeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = bridge_config(&args)?;
    let device = config.serial.path.display().to_string();

    let bridge = open_bridge(&config).map_err(|err| pipeline_error("bridge setup failed", err))?;
    install_ctrlc_handler(bridge.signal())?;

    let started = Instant::now();
    let handle = bridge
        .spawn()
        .map_err(|err| pipeline_error("bridge start failed", err))?;
    info!(device = %device, group = %config.multicast.group, "bridging until interrupted");

    handle.wait();
    let stats = match handle.join() {
        Ok(stats) => stats,
        // The panicking loop already cancelled and the other one drained.
        Err(PipelineError::LoopPanicked(role)) => {
            error!(role, "bridge loop panicked, no summary available");
            return Ok(SUCCESS);
        }
        Err(err) => return Err(pipeline_error("bridge failed", err)),
    };

    let summary = SummaryOutput::new(&device, &config.multicast.group, started.elapsed(), &stats);
    print_summary(&summary, format);

    Ok(SUCCESS)
}

fn bridge_config(args: &BridgeArgs) -> CliResult<BridgeConfig> {
    if args.capacity == 0 {
        return Err(CliError::new(USAGE, "capacity must be at least 1"));
    }
    if args.max_frame_size == 0 {
        return Err(CliError::new(USAGE, "max frame size must be at least 1"));
    }

    Ok(BridgeConfig {
        serial: SerialConfig {
            path: args.device.clone().unwrap_or_else(default_device_path),
            baud_rate: args.baud,
            read_timeout: parse_duration(&args.read_timeout)?,
        },
        framing: FrameConfig {
            delimiter: DEFAULT_DELIMITER.into(),
            max_frame_size: args.max_frame_size,
        },
        multicast: MulticastConfig {
            group: args.group.clone(),
            ttl: args.ttl,
            loopback: !args.no_loopback,
            interface: args.interface,
        },
        pipeline: PipelineConfig {
            capacity: args.capacity,
            discard_first_frame: !args.keep_first_frame,
            retry_delay: parse_duration(&args.retry_delay)?,
        },
    })
}

fn install_ctrlc_handler(signal: CancellationSignal) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !signal.cancel() {
            warn!("already shutting down, draining queued frames");
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn args() -> BridgeArgs {
        BridgeArgs {
            device: Some("/dev/ttyUSB3".into()),
            baud: 115_200,
            group: "239.1.2.3:5000".to_string(),
            ttl: 4,
            interface: None,
            no_loopback: true,
            capacity: 8,
            max_frame_size: 512,
            read_timeout: "250ms".to_string(),
            retry_delay: "1s".to_string(),
            keep_first_frame: true,
        }
    }

    #[test]
    fn config_from_args() {
        let config = bridge_config(&args()).unwrap();

        assert_eq!(config.serial.path, std::path::PathBuf::from("/dev/ttyUSB3"));
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(config.serial.read_timeout, Duration::from_millis(250));
        assert_eq!(&config.framing.delimiter[..], DEFAULT_DELIMITER);
        assert_eq!(config.framing.max_frame_size, 512);
        assert_eq!(config.multicast.group, "239.1.2.3:5000");
        assert_eq!(config.multicast.ttl, 4);
        assert!(!config.multicast.loopback);
        assert_eq!(config.pipeline.capacity, 8);
        assert!(!config.pipeline.discard_first_frame);
        assert_eq!(config.pipeline.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn missing_device_uses_platform_default() {
        let mut args = args();
        args.device = None;
        let config = bridge_config(&args).unwrap();
        assert_eq!(config.serial.path, default_device_path());
    }

    #[test]
    fn zero_capacity_is_usage_error() {
        let mut args = args();
        args.capacity = 0;
        assert_eq!(bridge_config(&args).unwrap_err().code, USAGE);
    }

    #[test]
    fn bad_timeout_is_usage_error() {
        let mut args = args();
        args.read_timeout = "soon".to_string();
        assert_eq!(bridge_config(&args).unwrap_err().code, USAGE);
    }
}
