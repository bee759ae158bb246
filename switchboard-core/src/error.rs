//! Error types for Switchboard.
//!
//! This module provides a structured error hierarchy using `thiserror`:
//!
//! - [`SwitchboardError`] - Top-level error type for all Switchboard operations
//! - [`ResolveError`] - Errors turning declared metadata into descriptors
//! - [`LoadError`] - Errors loading or unloading a module identifier
//! - [`ConfigError`] - Errors reading the settings file

use thiserror::Error;

/// A boxed error type for handler results.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Top-level error type for all Switchboard operations.
#[derive(Error, Debug)]
pub enum SwitchboardError {
    /// Declared metadata could not be resolved.
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    /// A module identifier failed to load or unload.
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    /// The settings could not be read.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A custom error occurred.
    #[error(transparent)]
    Custom(BoxError),
}

/// Errors raised while resolving command, admin-command and listener metadata.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A privilege level token is neither a known name nor an ordinal.
    #[error("unknown privilege level: {0:?}")]
    UnknownLevel(String),

    /// A listener priority token is neither a known name nor an integer.
    #[error("unknown listener priority: {0:?}")]
    UnknownPriority(String),

    /// A listener direction token is not `in`, `out` or `both`.
    #[error("unknown listener direction: {0:?}")]
    UnknownDirection(String),

    /// A `listen` directive has the wrong number of tokens.
    #[error("malformed listen directive: {0:?}")]
    MalformedListen(String),

    /// A command was declared without a name.
    #[error("command name must not be empty")]
    EmptyName,

    /// A text metadata block declared no listener bindings.
    #[error("listener metadata declares no `listen` directive")]
    NoListenDirective,
}

/// Errors raised by registry load, unload and reload.
#[derive(Error, Debug)]
pub enum LoadError {
    /// No module implementation is known under this identifier.
    #[error("unknown module identifier: {0}")]
    UnknownIdentifier(String),

    /// The identifier resolved but provided no modules.
    #[error("module identifier {0} provides no modules")]
    NoModules(String),

    /// A module with the same name is already loaded.
    #[error("module {module} is already loaded")]
    DuplicateModule {
        /// The colliding module name.
        module: String,
    },

    /// A module binds a listener handler that is already bound under the
    /// same key, by a loaded module or by another module of the same
    /// identifier.
    #[error("module {module} binds a listener that is already bound at {key}")]
    DuplicateListener {
        /// The module declaring the second binding.
        module: String,
        /// The `priority/direction/event` key of the binding.
        key: String,
    },

    /// The identifier is already loaded.
    #[error("module identifier {0} is already loaded")]
    AlreadyLoaded(String),

    /// A module declared a standard admin command that does not exist.
    #[error("module {module} cannot load, standard admin command {command} does not exist")]
    UnknownStandardAdminCommand {
        /// The module that declared the command.
        module: String,
        /// The unknown command name.
        command: String,
    },

    /// A module's declared metadata failed to resolve.
    #[error("module {module} cannot load: {source}")]
    Resolve {
        /// The offending module.
        module: String,
        /// The underlying resolve failure.
        #[source]
        source: ResolveError,
    },

    /// A module's `load` hook failed after registration.
    #[error("module {module} failed to initialise: {source}")]
    ModuleInit {
        /// The offending module.
        module: String,
        /// The error returned by the module.
        #[source]
        source: BoxError,
    },

    /// A module's dynamic commands could not be fetched.
    #[error("module {module} failed to load dynamic commands: {source}")]
    Dynamic {
        /// The offending module.
        module: String,
        /// The error returned by the module.
        #[source]
        source: BoxError,
    },

    /// The identifier was never loaded.
    #[error("module identifier {0} is not loaded")]
    NotLoaded(String),

    /// No module with this name is loaded.
    #[error("no module named {0} is loaded")]
    UnknownModule(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The settings file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid TOML for [`Settings`](crate::Settings).
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<BoxError> for SwitchboardError {
    fn from(err: BoxError) -> Self {
        SwitchboardError::Custom(err)
    }
}

impl LoadError {
    /// Short static code for log fields.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownIdentifier(_) => "unknown_identifier",
            Self::NoModules(_) => "no_modules",
            Self::DuplicateModule { .. } => "duplicate_module",
            Self::DuplicateListener { .. } => "duplicate_listener",
            Self::AlreadyLoaded(_) => "already_loaded",
            Self::UnknownStandardAdminCommand { .. } => "unknown_standard_admin_command",
            Self::Resolve { .. } => "resolve",
            Self::ModuleInit { .. } => "module_init",
            Self::Dynamic { .. } => "dynamic",
            Self::NotLoaded(_) => "not_loaded",
            Self::UnknownModule(_) => "unknown_module",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_names_the_module() {
        let err = LoadError::UnknownStandardAdminCommand {
            module: "dice".into(),
            command: "frobnicate".into(),
        };
        assert_eq!(
            err.to_string(),
            "module dice cannot load, standard admin command frobnicate does not exist"
        );
        assert_eq!(err.code(), "unknown_standard_admin_command");
    }

    #[test]
    fn resolve_error_converts_to_top_level() {
        let err: SwitchboardError = ResolveError::UnknownLevel("wizard".into()).into();
        assert!(matches!(err, SwitchboardError::Resolve(_)));
    }
}
