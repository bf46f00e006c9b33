//! Command line definition and the pending-action state machine.
//!
//! Unit flags are order-sensitive: `-d` sets the device context for the
//! `-r`/`-o` flags after it, and `-s` upgrades the most recent unit flag
//! from a get to a set. clap validates the flags; the original order is
//! reconstructed from `ArgMatches::indices_of` and replayed through a
//! small state machine that finalizes an immutable action list.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command};
use ke24_control::{ActionRequest, Mode, RequestedOp, UnitKind};

/// Build the `ke24` command definition.
pub fn command() -> Command {
    Command::new("ke24")
        .about("Control Ke-USB24R relay/GPIO boards over a serial line")
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only print warnings and errors"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print informational output (default)"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .action(ArgAction::Append)
                .help("Configuration file, searched before the default locations"),
        )
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .value_name("NAME")
                .action(ArgAction::Append)
                .help("Device context for the unit flags that follow"),
        )
        .arg(
            Arg::new("relay")
                .short('r')
                .long("relay")
                .value_name("INDEX|NAME")
                .action(ArgAction::Append)
                .help("Read a relay; combine with --set to switch it"),
        )
        .arg(
            Arg::new("gpio")
                .short('o')
                .long("gpio")
                .value_name("INDEX|NAME")
                .action(ArgAction::Append)
                .help("Read a GPIO line"),
        )
        .arg(
            Arg::new("set")
                .short('s')
                .long("set")
                .value_name("0|1|NAME")
                .action(ArgAction::Append)
                .help("Change the most recent unit flag from get to set"),
        )
}

/// Everything extracted from the command line.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedArgs {
    /// Verbosity override; `None` defers to the configuration.
    pub mode: Option<Mode>,
    /// Configuration files given with `-c`, in order.
    pub configs: Vec<PathBuf>,
    /// Requested actions, in command line order.
    pub actions: Vec<ActionRequest>,
}

/// A usage error in the order-sensitive flags.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    /// `-s` appeared before any `-r`/`-o`.
    #[error("--set requires a preceding --relay or --gpio")]
    SetWithoutUnit,
}

/// One occurrence of an order-sensitive flag.
#[derive(Debug)]
enum FlagEvent {
    Device(String),
    Unit(UnitKind, String),
    Set(String),
}

/// Extract the parsed arguments from validated matches.
pub fn parse(matches: &ArgMatches) -> Result<ParsedArgs, UsageError> {
    let mode = if matches.get_flag("quiet") {
        Some(Mode::Quiet)
    } else if matches.get_flag("verbose") {
        Some(Mode::Verbose)
    } else {
        None
    };

    let configs = matches
        .get_many::<String>("config")
        .unwrap_or_default()
        .map(PathBuf::from)
        .collect();

    Ok(ParsedArgs {
        mode,
        configs,
        actions: actions_in_order(matches)?,
    })
}

/// Rebuild the interleaved flag sequence and run the state machine.
fn actions_in_order(matches: &ArgMatches) -> Result<Vec<ActionRequest>, UsageError> {
    let mut events: Vec<(usize, FlagEvent)> = Vec::new();
    let mut collect = |id: &str, make: fn(String) -> FlagEvent| {
        if let (Some(indices), Some(values)) = (
            matches.indices_of(id),
            matches.get_many::<String>(id),
        ) {
            for (index, value) in indices.zip(values) {
                events.push((index, make(value.clone())));
            }
        }
    };
    collect("device", FlagEvent::Device);
    collect("relay", |v| FlagEvent::Unit(UnitKind::Relay, v));
    collect("gpio", |v| FlagEvent::Unit(UnitKind::Gpio, v));
    collect("set", FlagEvent::Set);
    events.sort_by_key(|(index, _)| *index);

    let mut actions = Vec::new();
    let mut device: Option<String> = None;
    let mut pending: Option<ActionRequest> = None;

    for (_, event) in events {
        match event {
            FlagEvent::Device(name) => device = Some(name),
            FlagEvent::Unit(kind, target) => {
                // A new target-defining flag finalizes the pending action.
                actions.extend(pending.take());
                pending = Some(ActionRequest {
                    device: device.clone(),
                    kind,
                    target,
                    op: RequestedOp::Get,
                });
            }
            FlagEvent::Set(value) => match pending.as_mut() {
                Some(action) => action.op = RequestedOp::Set(value),
                None => return Err(UsageError::SetWithoutUnit),
            },
        }
    }
    actions.extend(pending);

    Ok(actions)
}
