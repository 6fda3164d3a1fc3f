//! End-to-end transfer against a simulated watch.
//!
//! The watch side runs as a task that listens on the in-memory transport for
//! the start request, then plays the announcement, the payload chunks and
//! (optionally) its own end signal into the session registry.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lifelog_frame::{ControlFrame, CATEGORY_LIFELOG, MAX_LENGTH, STEPS_WIDTH};
use lifelog_session::{request_with_config, SessionConfig, SessionRegistry, ShortPayloadPolicy};
use lifelog_transport::{ConnectionId, MemoryTransport, OutboundWrite, Transport};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{frame_error, io_error, session_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_transfer, OutputFormat, TransferReport};

// Time the watch is given to observe the end-of-transfer acknowledgement.
const ACK_GRACE: Duration = Duration::from_millis(250);

struct DevicePlan {
    announce: Vec<u8>,
    end: Vec<u8>,
    start_request: String,
    ack: String,
    payload: Vec<u8>,
    chunk_size: usize,
    chunk_delay: Duration,
    send_end: bool,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout, false)?;
    let chunk_delay = parse_duration(&args.chunk_delay, true)?;
    if args.chunk_size == 0 {
        return Err(CliError::new(USAGE, "--chunk-size must be greater than zero"));
    }
    if args.length > MAX_LENGTH as usize {
        return Err(CliError::new(
            USAGE,
            format!("--length must not exceed {MAX_LENGTH}"),
        ));
    }

    let config = SessionConfig {
        timeout,
        steps_offset: args.steps_offset,
        short_payload: if args.reject_short {
            ShortPayloadPolicy::Reject
        } else {
            ShortPayloadPolicy::Wait
        },
        ..SessionConfig::default()
    };
    let plan = device_plan(&args, chunk_delay)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    let report = runtime.block_on(simulate(ConnectionId::new(args.connection), config, plan))?;

    print_transfer(&report, format);
    Ok(SUCCESS)
}

fn device_plan(args: &SimulateArgs, chunk_delay: Duration) -> CliResult<DevicePlan> {
    let encode = |frame: ControlFrame| {
        frame
            .encode()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| frame_error("encode failed", err))
    };
    let hex = |frame: ControlFrame| {
        frame
            .to_hex_text()
            .map_err(|err| frame_error("encode failed", err))
    };

    Ok(DevicePlan {
        announce: encode(ControlFrame::start(CATEGORY_LIFELOG).with_length(args.length as u32))?,
        end: encode(ControlFrame::end(CATEGORY_LIFELOG))?,
        start_request: hex(ControlFrame::start(CATEGORY_LIFELOG))?,
        ack: hex(ControlFrame::end(CATEGORY_LIFELOG))?,
        payload: build_payload(args.length, args.steps, args.steps_offset),
        chunk_size: args.chunk_size,
        chunk_delay,
        send_end: !args.no_device_end,
    })
}

/// Deterministic filler with `steps` written at `offset` when it fits.
fn build_payload(length: usize, steps: u32, offset: usize) -> Vec<u8> {
    let mut payload: Vec<u8> = (0..length).map(|i| (i % 251) as u8).collect();
    if let Some(field) = offset
        .checked_add(STEPS_WIDTH)
        .and_then(|end| payload.get_mut(offset..end))
    {
        field.copy_from_slice(&steps.to_le_bytes());
    }
    payload
}

async fn simulate(
    id: ConnectionId,
    config: SessionConfig,
    plan: DevicePlan,
) -> CliResult<TransferReport> {
    let registry = Arc::new(SessionRegistry::new());
    let (transport, writes) = MemoryTransport::new(id.clone());
    let payload_len = plan.payload.len();
    let chunks = payload_len.div_ceil(plan.chunk_size);

    let mut device = tokio::spawn(run_device(Arc::clone(&registry), id.clone(), writes, plan));

    let started = Instant::now();
    let transport: Arc<dyn Transport> = Arc::new(transport);
    let outcome = request_with_config(&registry, transport, &config).await;
    let elapsed = started.elapsed();

    let acknowledged = match tokio::time::timeout(ACK_GRACE, &mut device).await {
        Ok(Ok(acknowledged)) => acknowledged,
        Ok(Err(err)) => {
            debug!(%err, "simulated watch task failed");
            false
        }
        Err(_) => {
            device.abort();
            false
        }
    };

    let steps = outcome.map_err(|err| session_error("transfer failed", err))?;
    Ok(TransferReport {
        schema_id: "https://schemas.3leaps.dev/lifelog/cli/v1/transfer-result.schema.json",
        connection: id.to_string(),
        steps,
        payload_len,
        chunks,
        acknowledged,
        elapsed_ms: (elapsed.as_secs_f64() * 1000.0 * 100.0).round() / 100.0,
    })
}

/// Play the watch side. Returns whether the acknowledgement was observed.
async fn run_device(
    registry: Arc<SessionRegistry>,
    id: ConnectionId,
    mut writes: UnboundedReceiver<OutboundWrite>,
    plan: DevicePlan,
) -> bool {
    loop {
        match writes.recv().await {
            Some(write) if write.payload == plan.start_request => break,
            Some(write) => debug!(payload = %write.payload, "watch ignoring write"),
            None => return false,
        }
    }

    registry.on_drsp_received(&id, &plan.announce);
    for chunk in plan.payload.chunks(plan.chunk_size) {
        if !plan.chunk_delay.is_zero() {
            tokio::time::sleep(plan.chunk_delay).await;
        }
        registry.on_convoy_received(&id, chunk);
    }
    if plan.send_end {
        registry.on_drsp_received(&id, &plan.end);
    }

    while let Some(write) = writes.recv().await {
        if write.payload == plan.ack {
            return true;
        }
    }
    false
}
