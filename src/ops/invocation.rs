//! Invocation classification.
//!
//! Some invocations only print metadata or remove files. They must not
//! declare build requirements, probe the toolchain or query capability
//! providers, because none of those may be installed yet.

/// What an invocation needs from the build machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationKind {
    /// Help, version or clean: no extension list is needed
    MetadataOnly,
    /// Anything that may build, install, package or test
    Building,
}

/// First arguments that never need the extension list.
const METADATA_COMMANDS: &[&str] = &[
    "--help-commands",
    "--version",
    "-V",
    "help",
    "version",
    "clean",
];

/// Classify raw arguments (without the program name).
pub fn classify<S: AsRef<str>>(args: &[S]) -> InvocationKind {
    let Some(first) = args.first() else {
        return InvocationKind::MetadataOnly;
    };

    let wants_help = args
        .iter()
        .any(|a| matches!(a.as_ref(), "--help" | "-h"));
    if wants_help || METADATA_COMMANDS.contains(&first.as_ref()) {
        InvocationKind::MetadataOnly
    } else {
        InvocationKind::Building
    }
}

impl InvocationKind {
    pub fn is_metadata_only(self) -> bool {
        self == InvocationKind::MetadataOnly
    }
}
