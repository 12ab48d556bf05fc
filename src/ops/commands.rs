//! Packaging command overrides.
//!
//! Base packaging commands are external programs. The overrides wrap them
//! with a pre-hook instead of replacing them: [`around`] runs the hook and,
//! depending on its [`HookOutcome`], runs the base operation, runs it after
//! a warning, or finishes without it. Each command run moves through
//! [`CommandState`] once.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::sources;
use crate::builder::translator::Translator;
use crate::ops::plan::{write_plan, BuildPlan};
use crate::ops::session::Session;
use crate::util::errors::ExtError;
use crate::util::process::{exit_code, ProcessBuilder};

/// Message shown when an archive is requested outside a checkout.
pub const SDIST_OUTSIDE_CHECKOUT: &str =
    "not on a version-control checkout, can not create source distribution";

/// Environment variable telling the base install command where the plan is.
pub const PLAN_ENV: &str = "EXTBUILD_PLAN";

/// What a pre-hook decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Run the base operation
    Proceed,
    /// Warn, then run the base operation anyway
    Degraded(String),
    /// Finish successfully without the base operation
    Skip(String),
}

/// How a command run finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The base operation ran and exited with this code
    Completed { exit_code: i32 },
    /// The base operation ran after the hook reported a soft failure
    Degraded { exit_code: i32, reason: String },
    /// The hook finished the command early
    Skipped(String),
}

impl Outcome {
    /// Process exit code for this outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Completed { exit_code } | Outcome::Degraded { exit_code, .. } => *exit_code,
            Outcome::Skipped(_) => 0,
        }
    }
}

/// Lifecycle of a single command run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandState {
    NotRun,
    Running,
    Done,
    /// Finished successfully after a soft failure in the hook
    Degraded,
    Failed,
}

/// A deferred command body.
pub type Operation<'a> = Box<dyn FnOnce() -> Result<Outcome> + 'a>;

/// A deferred pre-hook.
pub type Hook<'a> = Box<dyn FnOnce() -> Result<HookOutcome> + 'a>;

/// Wrap `base` so that `hook` decides whether and how it runs.
pub fn around<'a>(base: Operation<'a>, hook: Hook<'a>) -> Operation<'a> {
    Box::new(move || match hook()? {
        HookOutcome::Proceed => base(),
        HookOutcome::Degraded(reason) => {
            tracing::warn!("{}", reason);
            Ok(match base()? {
                Outcome::Completed { exit_code } => Outcome::Degraded { exit_code, reason },
                other => other,
            })
        }
        HookOutcome::Skip(reason) => {
            tracing::info!("{}", reason);
            Ok(Outcome::Skipped(reason))
        }
    })
}

/// One run of a named command.
#[derive(Debug)]
pub struct CommandRun {
    name: String,
    state: CommandState,
}

impl CommandRun {
    pub fn new(name: impl Into<String>) -> Self {
        CommandRun {
            name: name.into(),
            state: CommandState::NotRun,
        }
    }

    pub fn state(&self) -> CommandState {
        self.state
    }

    /// Run the operation. A non-zero exit code from the base operation
    /// leaves the run `Failed` but is returned, not raised. A degraded run
    /// that exits with zero ends `Degraded`.
    pub fn run(&mut self, op: Operation<'_>) -> Result<Outcome> {
        if self.state != CommandState::NotRun {
            bail!("command `{}` has already run", self.name);
        }

        self.state = CommandState::Running;
        tracing::debug!("running `{}`", self.name);
        match op() {
            Ok(outcome) => {
                self.state = match &outcome {
                    _ if outcome.exit_code() != 0 => CommandState::Failed,
                    Outcome::Degraded { .. } => CommandState::Degraded,
                    _ => CommandState::Done,
                };
                Ok(outcome)
            }
            Err(e) => {
                self.state = CommandState::Failed;
                Err(e)
            }
        }
    }
}

/// Operation running an external base command from the project root.
pub fn delegate<'a>(argv: &'a [String], root: &'a Path, env: Vec<(String, String)>) -> Operation<'a> {
    Box::new(move || {
        let Some(mut pb) = ProcessBuilder::from_argv(argv) else {
            bail!("base command is empty");
        };
        pb = pb.cwd(root);
        for (key, value) in &env {
            pb = pb.env(key, value);
        }

        tracing::info!("running {}", pb.display_command());
        let status = pb.status()?;
        Ok(Outcome::Completed {
            exit_code: exit_code(&status),
        })
    })
}

/// Operation used when no base command is configured.
fn finished<'a>(message: &'static str) -> Operation<'a> {
    Box::new(move || {
        tracing::info!("{}", message);
        Ok(Outcome::Completed { exit_code: 0 })
    })
}

/// Pre-hook of the archive build: translate all intermediate sources so
/// the archive ships them pre-generated.
pub fn archive_hook(session: &Session, translator: &dyn Translator) -> Result<HookOutcome> {
    if !session.env().is_checkout() {
        return Ok(HookOutcome::Skip(SDIST_OUTSIDE_CHECKOUT.to_string()));
    }

    if session.config().translator().is_off() {
        return Ok(HookOutcome::Degraded(
            "translator disabled by configuration; the archive will not contain generated sources"
                .to_string(),
        ));
    }

    let translated = translator
        .detect()
        .map_err(anyhow::Error::from)
        .and_then(|_| session.declared_extensions())
        .and_then(|set| {
            sources::translate_all(&set, translator, &session.manifest().sources)
                .map_err(anyhow::Error::from)
        });

    match translated {
        Ok(outputs) => {
            tracing::info!("translated {} source(s) for the archive", outputs.len());
            Ok(HookOutcome::Proceed)
        }
        Err(e) if is_capability_absence(&e) => Ok(HookOutcome::Degraded(format!(
            "{:#}; the archive will not contain generated sources",
            e
        ))),
        Err(e) => Err(e),
    }
}

fn is_capability_absence(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<ExtError>())
        .any(ExtError::is_capability_absence)
}

/// The archive-build command: [`archive_hook`] around the base `sdist`.
pub fn archive_build<'a>(session: &'a Session, translator: &'a dyn Translator) -> Operation<'a> {
    let base = match &session.manifest().commands.sdist {
        Some(argv) => delegate(argv, session.root(), Vec::new()),
        None => finished("no base sdist command configured; generated sources are in place"),
    };
    around(base, Box::new(move || archive_hook(session, translator)))
}

/// The install command: force the extension list and write the plan, then
/// run the base install command with the plan path in its environment.
pub fn install<'a>(session: &'a Session, plan_path: PathBuf) -> Operation<'a> {
    let base = match &session.manifest().commands.install {
        Some(argv) => delegate(
            argv,
            session.root(),
            vec![(PLAN_ENV.to_string(), plan_path.display().to_string())],
        ),
        None => finished("no base install command configured; build plan written"),
    };

    around(
        base,
        Box::new(move || {
            let plan: BuildPlan = session.plan()?;
            write_plan(&plan_path, &plan)?;
            Ok(HookOutcome::Proceed)
        }),
    )
}

/// Arguments for the test runner: the given ones, or the package namespace.
pub fn test_args(session: &Session, args: &[String]) -> Vec<String> {
    if args.is_empty() {
        vec![session.manifest().package.test_namespace().to_string()]
    } else {
        args.to_vec()
    }
}

/// The test-run command: run the external test runner and surface its
/// exit code.
pub fn test_run<'a>(session: &'a Session, args: &[String]) -> Operation<'a> {
    let mut argv = session.manifest().commands.test_runner.clone();
    argv.extend(test_args(session, args));
    let root = session.root();

    Box::new(move || delegate(&argv, root, Vec::new())())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::translator::TranslatorInfo;
    use crate::core::descriptor::Language;
    use crate::core::environment::EnvironmentContext;
    use crate::core::manifest::Manifest;
    use crate::ops::invocation::InvocationKind;
    use crate::util::config::{Config, ToolchainConfig};
    use std::cell::{Cell, RefCell};
    use tempfile::TempDir;

    struct FakeTranslator {
        available: bool,
        fail: bool,
        calls: RefCell<Vec<PathBuf>>,
    }

    impl FakeTranslator {
        fn new(available: bool, fail: bool) -> Self {
            FakeTranslator {
                available,
                fail,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl Translator for FakeTranslator {
        fn program(&self) -> &str {
            "cython"
        }

        fn detect(&self) -> Result<TranslatorInfo, ExtError> {
            if self.available {
                Ok(TranslatorInfo {
                    path: PathBuf::from("cython"),
                    version: None,
                })
            } else {
                Err(ExtError::TranslatorUnavailable {
                    program: "cython".to_string(),
                    reason: "not found on PATH".to_string(),
                })
            }
        }

        fn translate(&self, input: &Path, _: &Path, _: Language) -> Result<(), ExtError> {
            if self.fail {
                return Err(ExtError::TranslationFailed {
                    input: input.to_path_buf(),
                    message: "syntax error".to_string(),
                });
            }
            self.calls.borrow_mut().push(input.to_path_buf());
            Ok(())
        }
    }

    const MANIFEST: &str = r#"
[package]
name = "pkg"
namespace = "pkg.core"

[[extension]]
name = "pkg._ext"
sources = ["pkg/_ext.pyx"]
"#;

    fn session(tmp: &TempDir, content: &str, checkout: bool) -> Session {
        let path = tmp.path().join("Extbuild.toml");
        std::fs::write(&path, content).unwrap();
        Session::from_parts(
            Manifest::load(&path).unwrap(),
            EnvironmentContext::new(tmp.path(), checkout, std::env::consts::OS),
            Config::default(),
            ToolchainConfig::default(),
            InvocationKind::Building,
        )
    }

    fn ok_base<'a>(ran: &'a Cell<bool>) -> Operation<'a> {
        Box::new(move || {
            ran.set(true);
            Ok(Outcome::Completed { exit_code: 0 })
        })
    }

    #[test]
    fn test_around_proceed_runs_base() {
        let ran = Cell::new(false);
        let op = around(ok_base(&ran), Box::new(|| Ok(HookOutcome::Proceed)));
        assert_eq!(op().unwrap(), Outcome::Completed { exit_code: 0 });
        assert!(ran.get());
    }

    #[test]
    fn test_around_degraded_runs_base_and_keeps_reason() {
        let ran = Cell::new(false);
        let op = around(
            ok_base(&ran),
            Box::new(|| Ok(HookOutcome::Degraded("no translator".to_string()))),
        );
        assert_eq!(
            op().unwrap(),
            Outcome::Degraded {
                exit_code: 0,
                reason: "no translator".to_string()
            }
        );
        assert!(ran.get());
    }

    #[test]
    fn test_degraded_run_is_distinct_from_clean_run() {
        let ran = Cell::new(false);
        let mut run = CommandRun::new("sdist");
        let outcome = run
            .run(around(
                ok_base(&ran),
                Box::new(|| Ok(HookOutcome::Degraded("no translator".to_string()))),
            ))
            .unwrap();
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(run.state(), CommandState::Degraded);

        let mut failing = CommandRun::new("sdist");
        failing
            .run(around(
                Box::new(|| Ok(Outcome::Completed { exit_code: 2 })),
                Box::new(|| Ok(HookOutcome::Degraded("no translator".to_string()))),
            ))
            .unwrap();
        assert_eq!(failing.state(), CommandState::Failed);
    }

    #[test]
    fn test_around_skip_does_not_run_base() {
        let ran = Cell::new(false);
        let op = around(
            ok_base(&ran),
            Box::new(|| Ok(HookOutcome::Skip("nothing to do".to_string()))),
        );
        assert_eq!(op().unwrap(), Outcome::Skipped("nothing to do".to_string()));
        assert!(!ran.get());
    }

    #[test]
    fn test_command_run_states() {
        let ran = Cell::new(false);
        let mut run = CommandRun::new("sdist");
        assert_eq!(run.state(), CommandState::NotRun);
        run.run(ok_base(&ran)).unwrap();
        assert_eq!(run.state(), CommandState::Done);
        assert!(run.run(ok_base(&ran)).is_err());

        let mut failing = CommandRun::new("test");
        let outcome = failing
            .run(Box::new(|| Ok(Outcome::Completed { exit_code: 3 })))
            .unwrap();
        assert_eq!(outcome.exit_code(), 3);
        assert_eq!(failing.state(), CommandState::Failed);

        let mut erroring = CommandRun::new("install");
        assert!(erroring.run(Box::new(|| bail!("boom"))).is_err());
        assert_eq!(erroring.state(), CommandState::Failed);
    }

    #[test]
    fn test_archive_outside_checkout_skips_translation() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp, MANIFEST, false);
        let translator = FakeTranslator::new(true, false);

        let outcome = archive_build(&session, &translator)().unwrap();
        assert_eq!(outcome, Outcome::Skipped(SDIST_OUTSIDE_CHECKOUT.to_string()));
        assert_eq!(outcome.exit_code(), 0);
        assert!(translator.calls.borrow().is_empty());
    }

    #[test]
    fn test_archive_on_checkout_translates() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp, MANIFEST, true);
        let translator = FakeTranslator::new(true, false);

        let outcome = archive_build(&session, &translator)().unwrap();
        assert_eq!(outcome, Outcome::Completed { exit_code: 0 });
        assert_eq!(*translator.calls.borrow(), vec![PathBuf::from("pkg/_ext.pyx")]);
    }

    #[test]
    fn test_archive_without_translator_is_degraded() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp, MANIFEST, true);
        let translator = FakeTranslator::new(false, false);

        let hook = archive_hook(&session, &translator).unwrap();
        assert!(matches!(hook, HookOutcome::Degraded(_)));
    }

    #[test]
    fn test_archive_provider_failure_is_degraded() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{}providers = [\"numpy\"]\n\n[providers.numpy]\ncommand = [\"extbuild-no-such-python\"]\n",
            MANIFEST
        );
        let session = session(&tmp, &content, true);
        let translator = FakeTranslator::new(true, false);

        let hook = archive_hook(&session, &translator).unwrap();
        assert!(matches!(hook, HookOutcome::Degraded(_)));

        let mut run = CommandRun::new("sdist");
        run.run(archive_build(&session, &translator)).unwrap();
        assert_eq!(run.state(), CommandState::Degraded);
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_with_broken_provider_output_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{}providers = [\"mdtraj\"]\n\n[providers.mdtraj]\ncommand = [\"echo\", \"not json\"]\noutput = \"json\"\n",
            MANIFEST
        );
        let session = session(&tmp, &content, true);
        let translator = FakeTranslator::new(true, false);

        let err = archive_hook(&session, &translator).unwrap_err();
        assert!(err
            .chain()
            .filter_map(|cause| cause.downcast_ref::<ExtError>())
            .any(|e| matches!(e, ExtError::ProviderOutputInvalid { .. })));
        assert!(translator.calls.borrow().is_empty());
    }

    #[test]
    fn test_archive_translation_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp, MANIFEST, true);
        let translator = FakeTranslator::new(true, true);

        let err = archive_build(&session, &translator)().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExtError>(),
            Some(ExtError::TranslationFailed { .. })
        ));
    }

    #[test]
    fn test_test_args_default_to_namespace() {
        let tmp = TempDir::new().unwrap();
        let session = session(&tmp, MANIFEST, false);
        assert_eq!(test_args(&session, &[]), vec!["pkg.core"]);
        assert_eq!(
            test_args(&session, &["-k".to_string(), "fast".to_string()]),
            vec!["-k", "fast"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_runner_exit_code_is_surfaced() {
        let tmp = TempDir::new().unwrap();
        let content = format!(
            "{}\n[commands]\ntest-runner = [\"sh\", \"-c\", \"exit 3\"]\n",
            MANIFEST
        );
        let session = session(&tmp, &content, false);

        let outcome = test_run(&session, &[])().unwrap();
        assert_eq!(outcome.exit_code(), 3);
    }
}
