//! `out` action for the demonstration resource.
//!
//! Publishes the ref held in the directory named by the first argument.

use std::process::ExitCode;

use resource_demo::DemoResource;
use resource_sdk::Operation;

fn main() -> ExitCode {
    resource_sdk::main(Operation::Out, DemoResource)
}
