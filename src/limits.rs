// Pool capacity limits
//
// Every pool in the front end is sized up front. The presets mirror the
// memory available on the targets:
// - small: an 8-bit machine with a few kilobytes to spare
// - medium: twice that
// - large: four times that, the default on a host
//
// Any value can be overridden via project.toml

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Size preset for the pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSize {
    Small,
    Medium,
    Large,
}

impl ConfigSize {
    fn factor(self) -> usize {
        match self {
            ConfigSize::Small => 1,
            ConfigSize::Medium => 2,
            ConfigSize::Large => 4,
        }
    }
}

impl std::str::FromStr for ConfigSize {
    type Err = LimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(ConfigSize::Small),
            "medium" => Ok(ConfigSize::Medium),
            "large" => Ok(ConfigSize::Large),
            _ => Err(LimitError {
                message: format!("Unknown size '{}' (expected small, medium or large)", s),
            }),
        }
    }
}

/// Capacities of the parser pools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolLimits {
    pub string_pool_bytes: usize, // Bytes in the string pool, length bytes included
    pub max_expressions: usize,   // Expression slots shared by leaves and compounds
    pub max_expr_nodes: usize,    // Expression-list nodes
    pub max_statements: usize,    // Statement records
    pub max_nesting: usize,       // Nesting frames, root frame included
    pub lex_buffer_size: usize,   // Lexer read-ahead window in bytes
}

// The largest tokenized line is 255 bytes; the window must also hold the
// header of the following line.
const MIN_LEX_BUFFER: usize = 260;
const MAX_HANDLE: usize = u16::MAX as usize;

impl Default for PoolLimits {
    fn default() -> Self {
        Self::for_size(ConfigSize::Large)
    }
}

impl PoolLimits {
    /// Create with default limits
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_size(size: ConfigSize) -> Self {
        let factor = size.factor();
        Self {
            string_pool_bytes: 1024 * factor,
            max_expressions: 256 * factor,
            max_expr_nodes: 255 * factor,
            max_statements: 256 * factor - 1,
            max_nesting: 12,
            lex_buffer_size: 1024,
        }
    }

    pub fn small() -> Self {
        Self::for_size(ConfigSize::Small)
    }

    pub fn medium() -> Self {
        Self::for_size(ConfigSize::Medium)
    }

    pub fn large() -> Self {
        Self::for_size(ConfigSize::Large)
    }

    /// Load limits from project.toml, falling back to defaults
    ///
    /// Returns error only if TOML is malformed, not if file is missing
    pub fn from_project_toml<P: AsRef<Path>>(path: P) -> Result<Self, LimitError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| LimitError {
            message: format!("Failed to read {}: {}", path.display(), e),
        })?;

        Self::from_toml_str(&content).map_err(|e| LimitError {
            message: format!("Failed to parse {}: {}", path.display(), e.message),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LimitError> {
        let config: ProjectConfig = toml::from_str(content).map_err(|e| LimitError {
            message: e.to_string(),
        })?;

        let Some(limits_config) = config.limits else {
            return Ok(Self::default());
        };

        // Start from the preset, then apply individual overrides
        let mut limits = Self::for_size(limits_config.size.unwrap_or(ConfigSize::Large));

        if let Some(v) = limits_config.string_pool_bytes {
            limits.string_pool_bytes = v;
        }
        if let Some(v) = limits_config.max_expressions {
            limits.max_expressions = v;
        }
        if let Some(v) = limits_config.max_expr_nodes {
            limits.max_expr_nodes = v;
        }
        if let Some(v) = limits_config.max_statements {
            limits.max_statements = v;
        }
        if let Some(v) = limits_config.max_nesting {
            limits.max_nesting = v;
        }
        if let Some(v) = limits_config.lex_buffer_size {
            limits.lex_buffer_size = v;
        }

        Ok(limits)
    }

    /// Validate that every pool is usable and addressable by a 16-bit handle
    pub fn validate(&self) -> Result<(), LimitError> {
        if self.string_pool_bytes == 0 || self.string_pool_bytes > MAX_HANDLE {
            return Err(LimitError::invalid("string_pool_bytes", self.string_pool_bytes));
        }

        if self.max_expressions == 0 || self.max_expressions > MAX_HANDLE {
            return Err(LimitError::invalid("max_expressions", self.max_expressions));
        }

        if self.max_expr_nodes == 0 || self.max_expr_nodes > MAX_HANDLE {
            return Err(LimitError::invalid("max_expr_nodes", self.max_expr_nodes));
        }

        if self.max_statements == 0 || self.max_statements > MAX_HANDLE {
            return Err(LimitError::invalid("max_statements", self.max_statements));
        }

        // The root frame always occupies one slot
        if self.max_nesting < 2 || self.max_nesting > 255 {
            return Err(LimitError::invalid("max_nesting", self.max_nesting));
        }

        if self.lex_buffer_size < MIN_LEX_BUFFER || self.lex_buffer_size > MAX_HANDLE {
            return Err(LimitError::invalid("lex_buffer_size", self.lex_buffer_size));
        }

        Ok(())
    }
}

/// TOML configuration structures for deserialization
#[derive(Debug, Deserialize)]
struct ProjectConfig {
    limits: Option<LimitsConfig>,
}

#[derive(Debug, Deserialize)]
struct LimitsConfig {
    size: Option<ConfigSize>,
    string_pool_bytes: Option<usize>,
    max_expressions: Option<usize>,
    max_expr_nodes: Option<usize>,
    max_statements: Option<usize>,
    max_nesting: Option<usize>,
    lex_buffer_size: Option<usize>,
}

/// Error type for limit validation and loading
#[derive(Debug, Clone)]
pub struct LimitError {
    pub message: String,
}

impl LimitError {
    fn invalid(name: &str, value: usize) -> Self {
        Self {
            message: format!(
                "Invalid limit '{}': {} (must be positive and addressable)",
                name, value
            ),
        }
    }
}

impl std::fmt::Display for LimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Limit error: {}", self.message)
    }
}

impl std::error::Error for LimitError {}
