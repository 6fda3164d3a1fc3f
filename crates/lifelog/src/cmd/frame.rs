use lifelog_frame::channel::{category_name, command_name};
use lifelog_frame::{from_hex_text, ControlFrame};

use crate::cmd::{DecodeArgs, EncodeArgs, FrameKind};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_frame, FrameReport, OutputFormat};

pub fn decode(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = from_hex_text(&args.hex).map_err(|err| frame_error("decode failed", err))?;
    let frame = ControlFrame::parse(&bytes).map_err(|err| frame_error("decode failed", err))?;
    print_frame(&report(&frame)?, format);
    Ok(SUCCESS)
}

pub fn encode(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = match args.kind {
        FrameKind::Start => ControlFrame::start(args.category),
        FrameKind::End => ControlFrame::end(args.category),
    }
    .with_length(args.length);
    print_frame(&report(&frame)?, format);
    Ok(SUCCESS)
}

fn report(frame: &ControlFrame) -> CliResult<FrameReport> {
    let hex = frame
        .to_hex_text()
        .map_err(|err| frame_error("encode failed", err))?;
    Ok(FrameReport {
        schema_id: "https://schemas.3leaps.dev/lifelog/cli/v1/control-frame.schema.json",
        command: frame.command,
        command_name: command_name(frame.command),
        category: frame.category,
        category_name: category_name(frame.category),
        length: frame.length,
        hex,
    })
}
