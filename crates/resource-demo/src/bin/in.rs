//! `in` action for the demonstration resource.
//!
//! Fetches a ref into the directory named by the first argument.

use std::process::ExitCode;

use resource_demo::DemoResource;
use resource_sdk::Operation;

fn main() -> ExitCode {
    resource_sdk::main(Operation::In, DemoResource)
}
