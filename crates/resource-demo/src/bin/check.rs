//! `check` action for the demonstration resource.
//!
//! Lists new versions of a colour-tagged ref.

use std::process::ExitCode;

use resource_demo::DemoResource;
use resource_sdk::Operation;

fn main() -> ExitCode {
    resource_sdk::main(Operation::Check, DemoResource)
}
