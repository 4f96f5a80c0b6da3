//! Crate-level test doubles and BDD tests.

use std::ffi::OsString;
use std::sync::{Arc, Mutex};

use mockall::mock;
use serde::{Deserialize, Serialize};

use crate::archive::{Archive, ArchiveError};
use crate::context::Context;
use crate::error::{BoxError, ExecError};
use crate::fingerprint::FingerprintStrategy;
use crate::protocol::{Metadata, Output};
use crate::resource::Resource;
use crate::testing::SharedBuffer;
use crate::validate::Validate;
use crate::workspace::Workspace;
use crate::{Operation, dispatch};


mock! {
    pub(crate) Backend {}
    impl Archive for Backend {
        fn close(&mut self, ctx: &Context) -> Result<(), ArchiveError>;
        fn history(
            &mut self,
            ctx: &Context,
            latest: Option<Vec<u8>>,
        ) -> Result<Vec<Vec<u8>>, ArchiveError>;
        fn put(&mut self, ctx: &Context, versions: &[Vec<u8>]) -> Result<(), ArchiveError>;
        fn fingerprint(&self) -> FingerprintStrategy;
    }
}

/// Source record; a `uri` of `"invalid"` fails validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Source {
    #[serde(default)]
    pub(crate) uri: String,
}

impl Validate for Source {
    fn validate(&self, _ctx: &Context) -> Result<(), BoxError> {
        if self.uri == "invalid" {
            return Err("uri rejected".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Version {
    pub(crate) id: String,
}

impl Version {
    pub(crate) fn new(id: &str) -> Self {
        Self { id: id.to_owned() }
    }
}

impl Validate for Version {
    fn validate(&self, _ctx: &Context) -> Result<(), BoxError> {
        if self.id.is_empty() {
            return Err("id must not be empty".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub(crate) struct Params {
    #[serde(default)]
    pub(crate) label: String,
}

impl Validate for Params {}

/// How a scripted handler misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fault {
    Fail(&'static str),
    Panic(&'static str),
}

/// Archive backend that misbehaves in one method and records every call.
///
/// Clones share the call log, so a test can keep one after handing the other
/// to a resource.
#[derive(Debug, Clone)]
pub(crate) struct FaultyBackend {
    fault: Fault,
    history: Vec<Vec<u8>>,
    calls: Arc<Mutex<Vec<&'static str>>>,
}

impl FaultyBackend {
    pub(crate) fn new(fault: Fault) -> Self {
        Self {
            fault,
            history: Vec::new(),
            calls: Arc::default(),
        }
    }

    pub(crate) fn with_history(mut self, entries: &[&str]) -> Self {
        self.history = entries.iter().map(|entry| entry.as_bytes().to_vec()).collect();
        self
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().expect("call log").clone()
    }

    fn enter(&self, method: &'static str) -> Result<(), ArchiveError> {
        self.calls.lock().expect("call log").push(method);
        match self.fault {
            Fault::Fail(failing) if failing == method => {
                Err(ArchiveError::backend(format!("{method} went wrong")))
            }
            Fault::Panic(panicking) if panicking == method => panic!("{method} blew up"),
            _ => Ok(()),
        }
    }
}

impl Archive for FaultyBackend {
    fn close(&mut self, _ctx: &Context) -> Result<(), ArchiveError> {
        self.enter("close")
    }

    fn history(
        &mut self,
        _ctx: &Context,
        _latest: Option<Vec<u8>>,
    ) -> Result<Vec<Vec<u8>>, ArchiveError> {
        self.enter("history")?;
        Ok(self.history.clone())
    }

    fn put(&mut self, _ctx: &Context, _versions: &[Vec<u8>]) -> Result<(), ArchiveError> {
        self.enter("put")
    }

    fn fingerprint(&self) -> FingerprintStrategy {
        // No error channel here: only a panic fault has an effect.
        self.enter("fingerprint").ok();
        FingerprintStrategy::default()
    }
}

/// Resource whose handlers replay canned results and record their calls.
#[derive(Default)]
pub(crate) struct Scripted {
    pub(crate) versions: Vec<Version>,
    pub(crate) output: Option<Version>,
    pub(crate) metadata: Vec<Metadata>,
    pub(crate) archive: Option<Box<dyn Archive>>,
    pub(crate) fault: Option<Fault>,
    pub(crate) calls: Vec<&'static str>,
    pub(crate) check_input: Option<Version>,
}

impl Scripted {
    fn enter(&mut self, action: &'static str) -> Result<(), BoxError> {
        self.calls.push(action);
        match self.fault {
            Some(Fault::Fail(failing)) if failing == action => {
                Err(format!("{action} went wrong").into())
            }
            Some(Fault::Panic(panicking)) if panicking == action => {
                panic!("{action} blew up")
            }
            _ => Ok(()),
        }
    }

    fn output(&self) -> Output<Version> {
        let base = self
            .output
            .clone()
            .map_or_else(Output::empty, Output::new);
        self.metadata.iter().fold(base, |output, entry| {
            output.with_metadata(entry.name(), entry.value())
        })
    }
}

impl Resource for Scripted {
    type Source = Source;
    type Version = Version;
    type GetParams = Params;
    type PutParams = Params;

    fn initialize(&mut self, _ctx: &Context, _source: &Source) -> Result<(), BoxError> {
        self.enter("initialize")
    }

    fn archive(
        &mut self,
        _ctx: &Context,
        _source: &Source,
    ) -> Result<Option<Box<dyn Archive>>, BoxError> {
        self.enter("archive")?;
        Ok(self.archive.take())
    }

    fn check(
        &mut self,
        _ctx: &Context,
        _source: &Source,
        version: Option<&Version>,
    ) -> Result<Vec<Version>, BoxError> {
        self.enter("check")?;
        self.check_input = version.cloned();
        Ok(self.versions.clone())
    }

    fn get(
        &mut self,
        _ctx: &Context,
        _source: &Source,
        _version: &Version,
        _workspace: &Workspace,
        _params: &Params,
    ) -> Result<Output<Version>, BoxError> {
        self.enter("in")?;
        Ok(self.output())
    }

    fn put(
        &mut self,
        _ctx: &Context,
        _source: &Source,
        _workspace: &Workspace,
        _params: &Params,
    ) -> Result<Output<Version>, BoxError> {
        self.enter("out")?;
        Ok(self.output())
    }

    fn close(&mut self, _ctx: &Context) -> Result<(), BoxError> {
        self.enter("close")
    }
}

/// What one dispatcher run produced.
#[derive(Debug)]
pub(crate) struct Run {
    pub(crate) result: Result<(), ExecError>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) diagnostics: SharedBuffer,
}

impl Run {
    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub(crate) fn error_text(&self) -> String {
        self.result
            .as_ref()
            .err()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// Runs the dispatcher against `resource` with an in-memory stdin and stdout.
pub(crate) fn run<R: Resource>(
    ctx: &Context,
    diagnostics: SharedBuffer,
    operation: Operation,
    resource: &mut R,
    input: &str,
    args: &[OsString],
) -> Run {
    let mut stdout = Vec::new();
    let result = dispatch::exec(
        ctx,
        operation,
        resource,
        &mut input.as_bytes(),
        &mut stdout,
        args,
    );
    Run {
        result,
        stdout,
        diagnostics,
    }
}
