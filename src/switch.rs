//! FreeSWITCH command planning and execution
//!
//! Call setup goes through `fs_cli -x` with a `bgapi originate` API string.
//! Planning (building the API strings) is kept separate from execution so
//! the pipeline can be tested against a recording switch.

use std::str::FromStr;

use async_trait::async_trait;
use tracing::debug;

use crate::{Error, Result};

/// Call setup method, fixed per process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Conference,
    Originate,
}

impl FromStr for DispatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "conference" => Ok(DispatchMode::Conference),
            "originate" => Ok(DispatchMode::Originate),
            other => Err(Error::Configuration(format!(
                "Invalid call method: {}",
                other
            ))),
        }
    }
}

/// API string originating one conference leg: `caller` dials `callee` into
/// the shared room, hanging up when the conference ends.
fn conference_leg(caller: &str, callee: &str, domain: &str, room: &str) -> String {
    format!(
        "bgapi originate {{origination_caller_id_name={caller},\
         origination_caller_id_number={caller}}}\
         user/{callee}@{domain} \
         &conference({room}{{hangup_after_conference=true}})"
    )
}

/// Both legs of a two-party conference, room named `{from}_{to}`
pub fn conference_legs(from_extension: &str, to_extension: &str, domain: &str) -> [String; 2] {
    let room = format!("{}_{}", from_extension, to_extension);
    [
        conference_leg(from_extension, to_extension, domain, &room),
        conference_leg(to_extension, from_extension, domain, &room),
    ]
}

/// Single originate-and-bridge command: dial `to`, bridge it back to `from`
pub fn originate_command(from_extension: &str, to_extension: &str, domain: &str) -> String {
    format!(
        "bgapi originate {{origination_caller_id_name={from_extension},\
         origination_caller_id_number={from_extension}}}\
         user/{to_extension}@{domain} \
         &bridge({from_extension})"
    )
}

/// Command sink for switch API strings.
///
/// `Error::Switch` carries a non-zero exit (the switch rejected the
/// command); `Error::SwitchLaunch` means the sink itself could not be run
/// and is treated as fatal by the driver.
#[async_trait]
pub trait SwitchCli: Send + Sync {
    /// Execute one API string, returning captured stdout on success
    async fn execute(&self, api_command: &str) -> Result<String>;
}

/// The real `fs_cli` binary
pub struct FsCli {
    path: String,
}

impl FsCli {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SwitchCli for FsCli {
    async fn execute(&self, api_command: &str) -> Result<String> {
        debug!(command = %api_command, "Executing switch command");

        let output = tokio::process::Command::new(&self.path)
            .args(["-x", api_command])
            .output()
            .await
            .map_err(Error::SwitchLaunch)?;

        if !output.status.success() {
            return Err(Error::Switch(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
