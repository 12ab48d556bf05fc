//! One invocation of the orchestrator.
//!
//! A [`Session`] ties the manifest, the environment and the invocation kind
//! together. For building invocations it installs the deferred extension
//! builder; for metadata-only invocations it installs nothing, so no
//! requirement is declared and no provider is ever queried.

use std::cell::OnceCell;
use std::path::Path;
use std::rc::Rc;

use anyhow::{bail, Result};

use crate::builder::lazy::{ExtModules, LazyList};
use crate::builder::pipeline;
use crate::builder::probe::{self, ProbeSettings, ToolchainState};
use crate::builder::toolchain::{detect_toolchain, ParallelFlags};
use crate::builder::translator::CythonTranslator;
use crate::core::descriptor::{DescriptorSet, ExtensionDescriptor};
use crate::core::environment::EnvironmentContext;
use crate::core::manifest::Manifest;
use crate::core::provider::ProviderRegistry;
use crate::core::requirement::Requirement;
use crate::ops::invocation::InvocationKind;
use crate::ops::plan::BuildPlan;
use crate::ops::submodules;
use crate::util::config::{Config, ToolchainConfig};
use crate::util::context::GlobalContext;

/// State of one orchestrator invocation.
pub struct Session {
    manifest: Rc<Manifest>,
    env: EnvironmentContext,
    invocation: InvocationKind,
    config: Config,
    toolchain_config: ToolchainConfig,
    registry: Rc<ProviderRegistry>,
    state: Rc<OnceCell<ToolchainState>>,
    fixed_toolchain: Option<(ToolchainState, ParallelFlags)>,
    extensions: Option<ExtModules>,
}

impl Session {
    /// Open the project containing the context's working directory.
    pub fn open(gctx: &GlobalContext, invocation: InvocationKind) -> Result<Self> {
        let manifest_path = gctx.find_manifest()?;
        let manifest = Manifest::load(&manifest_path)?;
        let root = manifest.manifest_dir.clone();

        let env = EnvironmentContext::detect(&root, &manifest.vcs.marker);
        let config = gctx.load_config(&root);
        let toolchain_config = gctx.load_toolchain_config(&root);

        Ok(Session::from_parts(
            manifest,
            env,
            config,
            toolchain_config,
            invocation,
        ))
    }

    /// Assemble a session from already-loaded pieces. Nothing runs until
    /// [`Session::prepare`].
    pub fn from_parts(
        manifest: Manifest,
        env: EnvironmentContext,
        config: Config,
        toolchain_config: ToolchainConfig,
        invocation: InvocationKind,
    ) -> Self {
        let registry = Rc::new(manifest.provider_registry());
        Session {
            manifest: Rc::new(manifest),
            env,
            invocation,
            config,
            toolchain_config,
            registry,
            state: Rc::new(OnceCell::new()),
            fixed_toolchain: None,
            extensions: None,
        }
    }

    /// Use a known toolchain state instead of probing the host.
    pub fn with_toolchain_state(mut self, state: ToolchainState, flags: ParallelFlags) -> Self {
        self.fixed_toolchain = Some((state, flags));
        self
    }

    /// Prepare the session for its invocation kind.
    ///
    /// Building invocations on a checkout initialise bundled submodules and
    /// every building invocation gets the deferred extension builder.
    pub fn prepare(&mut self) -> Result<()> {
        if self.invocation.is_metadata_only() {
            tracing::debug!("metadata-only invocation; extension list not installed");
            return Ok(());
        }

        if self.env.is_checkout() {
            submodules::init_submodules(self.env.root(), &self.manifest.vcs.submodules)?;
        }

        self.extensions = Some(ExtModules::Lazy(self.lazy_extensions()));
        Ok(())
    }

    fn lazy_extensions(&self) -> LazyList<ExtensionDescriptor> {
        let manifest = Rc::clone(&self.manifest);
        let registry = Rc::clone(&self.registry);
        let state_cell = Rc::clone(&self.state);
        let env = self.env.clone();
        let settings = ProbeSettings::from_config(&self.config, &self.toolchain_config);
        let toolchain_config = self.toolchain_config.clone();
        let fixed = self.fixed_toolchain.clone();

        LazyList::new(move || {
            let translator = CythonTranslator::new(&manifest.translator, env.root());

            let (state, flags) = match fixed {
                Some(fixed) => fixed,
                None => {
                    let toolchain = detect_toolchain(&toolchain_config);
                    let state = probe::probe(&translator, toolchain.as_deref(), &settings);
                    let flags = toolchain
                        .as_deref()
                        .map(|t| t.parallel_flags())
                        .unwrap_or_else(ParallelFlags::gnu);
                    (state, flags)
                }
            };
            let _ = state_cell.set(state);

            let set = pipeline::build_extensions(
                &manifest,
                &env,
                &registry,
                &state,
                &translator,
                &flags,
            )?;
            Ok(set.into_vec())
        })
    }

    /// Requirements to declare for this invocation.
    ///
    /// Metadata-only invocations declare none. Checkouts additionally need
    /// the translator, since they carry no pre-generated sources.
    pub fn build_requirements(&self) -> Vec<Requirement> {
        if self.invocation.is_metadata_only() {
            return Vec::new();
        }

        let mut requires = self.manifest.build_requires.clone();
        if self.env.is_checkout() {
            if let Some(req) = &self.manifest.translator.requirement {
                tracing::debug!("version-control checkout; requiring {}", req);
                requires.push(req.clone());
            }
        }
        requires
    }

    /// The extension list, if this invocation has one.
    pub fn extensions(&self) -> Option<&ExtModules> {
        self.extensions.as_ref()
    }

    /// Force the extension list.
    pub fn force_extensions(&self) -> Result<&[ExtensionDescriptor]> {
        match &self.extensions {
            Some(ext) => ext.resolve(),
            None => bail!("the extension list is not available for metadata-only invocations"),
        }
    }

    /// Build the plan for the forced extension list, declaring this
    /// invocation's build requirements.
    pub fn plan(&self) -> Result<BuildPlan> {
        let extensions = self.force_extensions()?;
        let state = self.state.get().copied().unwrap_or_default();
        Ok(BuildPlan::new(&self.manifest.package.name, state, extensions)
            .with_requires(self.build_requirements()))
    }

    /// Declared descriptors with provider paths, before source resolution.
    pub fn declared_extensions(&self) -> Result<DescriptorSet> {
        pipeline::assemble(&self.manifest, &self.env, &self.registry)
    }

    /// The translator configured for this project.
    pub fn translator(&self) -> CythonTranslator {
        CythonTranslator::new(&self.manifest.translator, self.env.root())
    }

    /// Toolchain state, once the extension list has been forced.
    pub fn toolchain_state(&self) -> Option<ToolchainState> {
        self.state.get().copied()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn env(&self) -> &EnvironmentContext {
        &self.env
    }

    pub fn root(&self) -> &Path {
        self.env.root()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn toolchain_config(&self) -> &ToolchainConfig {
        &self.toolchain_config
    }

    pub fn invocation(&self) -> InvocationKind {
        self.invocation
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }
}
